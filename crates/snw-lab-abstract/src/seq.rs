use serde::{Deserialize, Serialize};
use std::fmt;

/// Alternating 1-bit sequence number used by Stop-and-Wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SeqBit {
    #[default]
    Zero,
    One,
}

impl SeqBit {
    pub fn flip(self) -> Self {
        match self {
            SeqBit::Zero => SeqBit::One,
            SeqBit::One => SeqBit::Zero,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            SeqBit::Zero => 0,
            SeqBit::One => 1,
        }
    }
}

impl From<SeqBit> for u8 {
    fn from(bit: SeqBit) -> Self {
        bit.as_u8()
    }
}

impl TryFrom<u8> for SeqBit {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SeqBit::Zero),
            1 => Ok(SeqBit::One),
            other => Err(format!("sequence bit must be 0 or 1, got {other}")),
        }
    }
}

impl fmt::Display for SeqBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
