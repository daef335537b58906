use chrono::Local;
use clap::Args;
use job_digest::config::{RunnerConfig, SearchConfig, SourceDefinition};
use job_digest::error::AppError;
use job_digest::workflows::digest::{
    deliver_and_record, DeliveryError, Digest, DigestMailer, OutboxMailer, SmtpMailer,
};
use job_digest::workflows::discovery::{
    sources, CsvHistoryStore, DigestPipeline, DigestRun, EnrichmentScheduler, FilterEngine,
    HistoryIndex, PaginationDriver, PaginationLimits, WorkdayAdapterFactory,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Search config YAML (overrides DIGEST_CONFIG_PATH)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// History CSV of postings already sent (overrides DIGEST_HISTORY_PATH)
    #[arg(long)]
    pub(crate) history: Option<PathBuf>,
    /// Directory that receives rendered digests (overrides DIGEST_OUTBOX_DIR)
    #[arg(long)]
    pub(crate) outbox: Option<PathBuf>,
    /// Detail-page workers per source (overrides DIGEST_WORKERS)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub(crate) workers: Option<u16>,
    /// Seconds to wait on any single page (overrides DIGEST_WAIT_TIMEOUT_SECS)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) wait_timeout_secs: Option<u64>,
    /// Only scan the named source; repeat to scan several
    #[arg(long = "source")]
    pub(crate) sources: Vec<String>,
    /// Print the digest instead of delivering it and leave history untouched
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Write digests to the outbox even when SMTP credentials are configured
    #[arg(long)]
    pub(crate) no_email: bool,
}

impl RunArgs {
    pub(crate) fn apply(&self, config: &mut RunnerConfig) {
        if let Some(path) = &self.config {
            config.paths.config_path = path.clone();
        }
        if let Some(path) = &self.history {
            config.paths.history_path = path.clone();
        }
        if let Some(dir) = &self.outbox {
            config.paths.outbox_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.crawl.workers = usize::from(workers);
        }
        if let Some(secs) = self.wait_timeout_secs {
            config.crawl.wait_timeout = Duration::from_secs(secs);
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct SourcesArgs {
    /// Search config YAML (overrides DIGEST_CONFIG_PATH)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
}

pub(crate) fn run_digest(config: &RunnerConfig, args: RunArgs) -> Result<(), AppError> {
    let search = SearchConfig::from_path(&config.paths.config_path)?;
    let filter = FilterEngine::from_config(&search)?;
    let selected = select_sources(sources::resolve(&search), &args.sources);

    let store = CsvHistoryStore::new(&config.paths.history_path);
    let history = HistoryIndex::load_or_empty(&store);

    let factory = WorkdayAdapterFactory::new(config.crawl.wait_timeout);
    let pipeline = DigestPipeline::new(Box::new(factory), filter)
        .with_driver(PaginationDriver::new(PaginationLimits {
            max_stalled_pages: config.crawl.max_stalled_pages,
            page_slack: config.crawl.page_slack,
        }))
        .with_scheduler(EnrichmentScheduler::new(config.crawl.workers));
    let run = pipeline.run(&selected, &history);
    print_run_summary(&run);

    let digest = Digest::new(run.jobs);
    if args.dry_run {
        if digest.is_empty() {
            println!("No new jobs to send.");
        } else {
            println!("\n{}", digest.text());
        }
        return Ok(());
    }

    let (mailer, destination) = select_mailer(config, args.no_email)?;
    let report = deliver_and_record(
        &digest,
        &search.email_recipients,
        mailer.as_ref(),
        &store,
        Local::now().naive_local(),
    )?;

    if digest.is_empty() {
        println!("No new jobs to send.");
    } else {
        println!(
            "Sent {} digest(s) via {}. Saved {} jobs to {}.",
            report.messages_sent,
            destination,
            report.jobs_recorded,
            store.path().display()
        );
    }
    Ok(())
}

/// SMTP when credentials are configured, otherwise the outbox directory.
fn select_mailer(
    config: &RunnerConfig,
    no_email: bool,
) -> Result<(Box<dyn DigestMailer>, String), DeliveryError> {
    match &config.smtp {
        Some(smtp) if !no_email => {
            let mailer = SmtpMailer::new(smtp, config.crawl.wait_timeout)?;
            let destination = format!("smtp://{}:{}", mailer.host(), smtp.port);
            let mailer: Box<dyn DigestMailer> = Box::new(mailer);
            Ok((mailer, destination))
        }
        _ => {
            if config.smtp.is_none() {
                info!("EMAIL_ADDR or EMAIL_PASSWORD not set; writing digests to the outbox");
            }
            let mailer = OutboxMailer::new(&config.paths.outbox_dir);
            let destination = mailer.dir().display().to_string();
            let mailer: Box<dyn DigestMailer> = Box::new(mailer);
            Ok((mailer, destination))
        }
    }
}

pub(crate) fn list_sources(config: &RunnerConfig, args: SourcesArgs) -> Result<(), AppError> {
    let path = args
        .config
        .unwrap_or_else(|| config.paths.config_path.clone());
    let configured = if path.exists() {
        sources::resolve(&SearchConfig::from_path(&path)?)
    } else {
        sources::built_in()
    };

    for source in &configured {
        println!("{:<24} {}", source.name, source.endpoint);
    }
    println!("{} source(s)", configured.len());
    Ok(())
}

pub(crate) fn print_run_summary(run: &DigestRun) {
    println!("Sources");
    for report in &run.reports {
        match &report.failure {
            Some(reason) => println!("  {:<24} failed: {}", report.name, reason),
            None => println!(
                "  {:<24} found {:>4}  matched {:>3}  new {:>3}",
                report.name, report.found, report.matched, report.new
            ),
        }
    }
    println!("{}", run.summary());
}

fn select_sources(all: Vec<SourceDefinition>, names: &[String]) -> Vec<SourceDefinition> {
    if names.is_empty() {
        return all;
    }
    for name in names {
        if !all
            .iter()
            .any(|source| source.name.eq_ignore_ascii_case(name))
        {
            warn!(source = %name, "unknown source requested");
        }
    }
    all.into_iter()
        .filter(|source| names.iter().any(|name| source.name.eq_ignore_ascii_case(name)))
        .collect()
}
