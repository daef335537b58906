use crate::demo::{run_demo, DemoArgs};
use crate::digest::{list_sources, run_digest, RunArgs, SourcesArgs};
use clap::{Parser, Subcommand};
use job_digest::config::RunnerConfig;
use job_digest::error::AppError;
use job_digest::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "job-digest",
    about = "Collect new job postings from career sites and send them as a digest",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan every source and deliver the new postings (default command)
    Run(RunArgs),
    /// List the sources a run would scan
    Sources(SourcesArgs),
    /// Run the pipeline twice against canned career sites to show filtering and dedup
    Demo(DemoArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(RunArgs::default()));

    let mut config = RunnerConfig::load()?;
    if let Command::Run(args) = &command {
        args.apply(&mut config);
    }
    telemetry::init(&config.telemetry)?;

    match command {
        Command::Run(args) => run_digest(&config, args),
        Command::Sources(args) => list_sources(&config, args),
        Command::Demo(args) => run_demo(&config, args),
    }
}
