use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse whitespace-delimited integers. Any token that is not an integer is
/// an error naming its position.
pub fn parse_units(text: &str) -> Result<Vec<i64>> {
    text.split_whitespace()
        .enumerate()
        .map(|(idx, token)| {
            token
                .parse::<i64>()
                .with_context(|| format!("token {} ({token:?}) is not an integer", idx + 1))
        })
        .collect()
}

pub fn load_units(path: &Path) -> Result<Vec<i64>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    parse_units(&content).with_context(|| format!("Failed to parse input file {}", path.display()))
}

/// Interpret an answer to the `[y/n]` prompt. A bare Enter counts as yes.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "" | "y" | "Y" | "Yy")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_whitespace() {
        assert_eq!(parse_units("1 2\n3\t-4\n\n").unwrap(), vec![1, 2, 3, -4]);
        assert!(parse_units("   \n").unwrap().is_empty());
    }

    #[test]
    fn reports_bad_token() {
        let err = parse_units("1 two 3").unwrap_err();
        assert!(format!("{err:#}").contains("token 2"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_units(Path::new("/definitely/not/here.txt")).is_err());
    }

    #[test]
    fn prompt_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("Y"));
        assert!(is_affirmative("\n"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("yes"));
    }
}
