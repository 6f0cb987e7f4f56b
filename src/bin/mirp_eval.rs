//! CLI for running an evaluation batch.
//!
//! Usage:
//!   mirp-eval --dataset qa.json --reference centers.json --answers answers/ \
//!             --model gpt-4o --rq RQ2 --output summary.csv

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mirp_eval::{run_evaluation, EvalConfig};

/// Score recorded VLM answers against image-view and anatomy-view ground truth.
#[derive(Parser)]
#[command(
    name = "mirp-eval",
    version,
    about = "Score recorded VLM answers against image-view and anatomy-view ground truth",
    long_about = r#"
mirp-eval - relative-position benchmark scoring

Consumes the benchmark's persisted JSON artifacts and produces per-run and
aggregated (mean ± std over 3 runs) accuracy and F1, separately for what the
rendered slice shows (image view) and for true patient laterality (anatomy
view).

INPUTS:
  --dataset     question/ground-truth JSON produced at dataset-build time
  --reference   canonical structure centers in standard radiological orientation
  --answers     directory of <base>_run_<n>.json model answer files

EXAMPLE:
  mirp-eval --dataset qa_dots.json --reference centers.json \
            --answers answers/ --rq RQ2 --model gpt-4o --output summary.csv
"#
)]
struct Cli {
    /// Dataset JSON with questions and ground truth
    #[arg(long)]
    dataset: PathBuf,

    /// Standard-orientation reference JSON
    #[arg(long)]
    reference: PathBuf,

    /// Directory holding *_run_<n>.json answer files
    #[arg(long)]
    answers: PathBuf,

    /// Write a CSV summary to this path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Research question label recorded in the report
    #[arg(long, default_value = "RQ1")]
    rq: String,

    /// Evaluated model name recorded in the report
    #[arg(long)]
    model: String,

    /// Runs required per experiment
    #[arg(long, default_value_t = mirp_eval::pipeline::DEFAULT_EXPECTED_RUNS)]
    runs: usize,

    /// Pixel extent of the square slice images
    #[arg(long, default_value_t = mirp_eval::pipeline::DEFAULT_IMAGE_EXTENT)]
    extent: f64,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = EvalConfig::new(cli.dataset, cli.reference, cli.answers);
    config.output = cli.output;
    config.research_question = cli.rq;
    config.model = cli.model;
    config.expected_runs = cli.runs;
    config.image_extent = cli.extent;

    match run_evaluation(&config) {
        Ok(report) => {
            print!("{}", report.to_markdown());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
