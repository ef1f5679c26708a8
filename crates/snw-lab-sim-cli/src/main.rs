mod input;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use snw_lab_abstract::{ExperimentPlan, SimConfig};
use snw_lab_simulator::{ExperimentSeries, SimulationReport, SweepRunner, simulate_with_config};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stop-and-Wait ARQ simulator")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deliver the integers in a file over a lossy channel and report the rounds used.
    Run {
        /// Whitespace-separated integers to send.
        infile: PathBuf,
        /// Frame corruption probability.
        p1: f64,
        /// ACK corruption probability.
        p2: f64,

        /// Seed the channel for a reproducible run.
        #[arg(long)]
        seed: Option<u64>,

        /// Print the delivered data without asking.
        #[arg(long, conflicts_with = "no_print_data")]
        print_data: bool,

        /// Never print the delivered data and do not ask.
        #[arg(long)]
        no_print_data: bool,

        /// Write a JSON report of the run.
        #[arg(long)]
        trace_out: Option<PathBuf>,
    },
    /// Run the batch experiments (length sweep, frame-loss sweep, matched-loss sweep).
    Experiments {
        /// TOML plan overriding the default sweeps.
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Seed for every trial; overrides the plan's seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads per sweep point (defaults to available parallelism).
        #[arg(long)]
        workers: Option<usize>,

        /// Directory to write one JSON file per series into.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    info!("snw-lab starting…");

    match args.command {
        Command::Run {
            infile,
            p1,
            p2,
            seed,
            print_data,
            no_print_data,
            trace_out,
        } => {
            let print = if print_data {
                Some(true)
            } else if no_print_data {
                Some(false)
            } else {
                None
            };
            let mut config = SimConfig::new(p1, p2);
            config.seed = seed;
            run_single(&infile, &config, print, trace_out.as_deref())
        }
        Command::Experiments {
            plan,
            seed,
            workers,
            out,
        } => run_experiments(plan.as_deref(), seed, workers, out.as_deref()),
    }
}

fn init_logging() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
}

fn run_single(
    infile: &Path,
    config: &SimConfig,
    print: Option<bool>,
    trace_out: Option<&Path>,
) -> Result<()> {
    let data = input::load_units(infile)?;
    let outcome = simulate_with_config(&data, config)?;
    info!(
        "Delivered {} units | frames sent: {} | corrupted frames: {} | corrupted ACKs: {}",
        outcome.delivered.len(),
        outcome.link.frames_sent,
        outcome.link.frames_corrupted,
        outcome.link.acks_corrupted
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Iterations: {}", outcome.rounds)?;

    let print = match print {
        Some(decided) => decided,
        None => ask("Print sent/received data? [y/n]")?,
    };
    if print {
        for unit in &outcome.delivered {
            writeln!(out, "{unit}")?;
        }
    }

    if let Some(path) = trace_out {
        write_json(path, &SimulationReport::new(config, &outcome))?;
    }
    Ok(())
}

fn ask(prompt: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut answer = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer from stdin")?;
    // EOF means nobody is there to answer.
    Ok(read > 0 && input::is_affirmative(&answer))
}

fn run_experiments(
    plan_path: Option<&Path>,
    seed: Option<u64>,
    workers: Option<usize>,
    out_dir: Option<&Path>,
) -> Result<()> {
    let plan = match plan_path {
        Some(path) => load_plan(path)?,
        None => ExperimentPlan::default(),
    };
    let mut resolved = plan.resolve().context("Invalid experiment plan")?;
    if seed.is_some() {
        resolved.seed = seed;
    }

    let mut runner = SweepRunner::new(resolved.seed);
    if let Some(workers) = workers {
        runner = runner.with_workers(workers);
    }

    let series = runner.run_plan(&resolved)?;
    for s in &series {
        log_series(s);
    }

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        for s in &series {
            write_json(&dir.join(format!("{}.json", s.name)), s)?;
        }
    }
    Ok(())
}

fn log_series(series: &ExperimentSeries) {
    info!(
        "{}: {} points ({} vs {})",
        series.name,
        series.points.len(),
        series.y_label,
        series.x_label
    );
    for point in &series.points {
        info!("  {:>8.2} -> {:.2}", point.x, point.y);
    }
}

fn load_plan(path: &Path) -> Result<ExperimentPlan> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    let plan: ExperimentPlan = toml::from_str(&content).context("Failed to parse plan file")?;
    Ok(plan)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value).context("Failed to serialize output")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_run_arguments() {
        let args = Args::try_parse_from(["snw-lab", "run", "data.txt", "0.1", "0.2", "--seed", "3"])
            .unwrap();
        match args.command {
            Command::Run {
                infile, p1, p2, seed, ..
            } => {
                assert_eq!(infile, PathBuf::from("data.txt"));
                assert_eq!(p1, 0.1);
                assert_eq!(p2, 0.2);
                assert_eq!(seed, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn print_flags_conflict() {
        assert!(
            Args::try_parse_from([
                "snw-lab",
                "run",
                "d.txt",
                "0",
                "0",
                "--print-data",
                "--no-print-data"
            ])
            .is_err()
        );
    }
}
