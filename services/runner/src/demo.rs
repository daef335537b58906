use crate::digest::print_run_summary;
use crate::infra::{
    demo_factory, demo_sources, demo_taxonomies, InMemoryHistoryStore, InMemoryMailer,
};
use chrono::Local;
use clap::Args;
use job_digest::config::{RunnerConfig, SearchConfig, DEFAULT_NON_US_MARKERS};
use job_digest::error::AppError;
use job_digest::workflows::digest::{deliver_and_record, Digest};
use job_digest::workflows::discovery::{
    DigestPipeline, EnrichmentScheduler, FilterEngine, HistoryIndex, Taxonomy,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Use the taxonomies from this search config instead of the demo defaults.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Print the rendered HTML digest as well as the text summary.
    #[arg(long)]
    pub(crate) html: bool,
}

pub(crate) fn run_demo(config: &RunnerConfig, args: DemoArgs) -> Result<(), AppError> {
    let filter = match &args.config {
        Some(path) => FilterEngine::from_config(&SearchConfig::from_path(path)?)?,
        None => {
            let (locations, keywords) = demo_taxonomies();
            let markers: Vec<String> = DEFAULT_NON_US_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect();
            FilterEngine::new(
                Taxonomy::from_groups(&locations)?,
                Taxonomy::from_groups(&keywords)?,
                &markers,
            )?
        }
    };

    let pipeline = DigestPipeline::new(Box::new(demo_factory()), filter)
        .with_scheduler(EnrichmentScheduler::new(config.crawl.workers));
    let sources = demo_sources();
    let store = InMemoryHistoryStore::default();
    let mailer = InMemoryMailer::default();
    let recipients = vec!["demo@example.com".to_string()];

    println!("Job digest demo");
    for pass in 1..=2 {
        println!("\nPass {pass}");
        let history = HistoryIndex::load_or_empty(&store);
        let run = pipeline.run(&sources, &history);
        print_run_summary(&run);

        let digest = Digest::new(run.jobs);
        if digest.is_empty() {
            println!("No new jobs to send.");
            continue;
        }
        println!("\n{}", digest.text());
        if args.html {
            println!("{}", digest.html());
        }
        let report = deliver_and_record(
            &digest,
            &recipients,
            &mailer,
            &store,
            Local::now().naive_local(),
        )?;
        println!(
            "Delivered {} message(s); recorded {} job(s) in history.",
            report.messages_sent, report.jobs_recorded
        );
    }

    println!("\nMessages delivered during the demo: {}", mailer.sent().len());
    Ok(())
}
