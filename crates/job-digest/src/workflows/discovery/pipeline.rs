use std::fmt;

use serde::Serialize;
use tracing::{error, info, info_span};

use super::adapter::{AdapterError, AdapterFactory, AdapterSession};
use super::domain::FilteredJobRecord;
use super::enrichment::EnrichmentScheduler;
use super::filter::FilterEngine;
use super::history::HistoryIndex;
use super::pagination::{PaginatedRecords, PaginationDriver, PaginationError};
use crate::config::SourceDefinition;

/// Failure that ends one source's run. Other sources are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unable to open source: {0}")]
    Open(#[source] AdapterError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

/// What happened to one source during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub found: usize,
    pub extraction_failures: usize,
    pub resolved: usize,
    pub enrichment_failures: usize,
    pub matched: usize,
    pub new: usize,
    pub failure: Option<String>,
}

impl SourceReport {
    fn failed(name: &str, err: &SourceError) -> Self {
        Self {
            name: name.to_string(),
            failure: Some(err.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sources_attempted: usize,
    pub sources_failed: usize,
    pub found: usize,
    pub matched: usize,
    pub new: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} source(s) attempted, {} failed; {} job(s) found, {} matched, {} new",
            self.sources_attempted, self.sources_failed, self.found, self.matched, self.new
        )
    }
}

/// New postings across every source, in source order.
#[derive(Debug, Default)]
pub struct DigestRun {
    pub jobs: Vec<FilteredJobRecord>,
    pub reports: Vec<SourceReport>,
}

impl DigestRun {
    pub fn summary(&self) -> RunSummary {
        self.reports
            .iter()
            .fold(RunSummary::default(), |mut summary, report| {
                summary.sources_attempted += 1;
                if report.failure.is_some() {
                    summary.sources_failed += 1;
                }
                summary.found += report.found;
                summary.matched += report.matched;
                summary.new += report.new;
                summary
            })
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceReport> {
        self.reports
            .iter()
            .filter(|report| report.failure.is_some())
    }
}

/// Pagination, enrichment, filtering and dedup for each source in turn.
pub struct DigestPipeline {
    factory: Box<dyn AdapterFactory>,
    driver: PaginationDriver,
    scheduler: EnrichmentScheduler,
    filter: FilterEngine,
}

impl DigestPipeline {
    pub fn new(factory: Box<dyn AdapterFactory>, filter: FilterEngine) -> Self {
        Self {
            factory,
            driver: PaginationDriver::default(),
            scheduler: EnrichmentScheduler::default(),
            filter,
        }
    }

    pub fn with_driver(mut self, driver: PaginationDriver) -> Self {
        self.driver = driver;
        self
    }

    pub fn with_scheduler(mut self, scheduler: EnrichmentScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn run(&self, sources: &[SourceDefinition], history: &HistoryIndex) -> DigestRun {
        // Postings accepted earlier in this run count as seen for the rest of it.
        let mut seen = history.clone();
        let mut run = DigestRun::default();
        info!(
            sources = sources.len(),
            workers = self.scheduler.concurrency(),
            "starting run"
        );

        for source in sources {
            let span = info_span!("source", source = %source.name);
            let _entered = span.enter();
            info!(endpoint = %source.endpoint, "running source");

            match self.run_source(source, &seen) {
                Ok((jobs, report)) => {
                    info!(
                        found = report.found,
                        matched = report.matched,
                        new = report.new,
                        "source finished"
                    );
                    seen.record(&jobs);
                    run.jobs.extend(jobs);
                    run.reports.push(report);
                }
                Err(err) => {
                    error!(error = %err, "error scraping source; skipping");
                    run.reports.push(SourceReport::failed(&source.name, &err));
                }
            }
        }

        info!(summary = %run.summary(), "run finished");
        run
    }

    fn run_source(
        &self,
        source: &SourceDefinition,
        history: &HistoryIndex,
    ) -> Result<(Vec<FilteredJobRecord>, SourceReport), SourceError> {
        let pages = self.collect(&source.endpoint)?;
        let mut report = SourceReport {
            name: source.name.clone(),
            found: pages.records.len(),
            extraction_failures: pages.stats.extraction_failures,
            ..SourceReport::default()
        };

        let enriched = self
            .scheduler
            .enrich(self.factory.as_ref(), &source.endpoint, pages.records);
        report.resolved = enriched.resolved;
        report.enrichment_failures = enriched.failures.len();

        let matched: Vec<FilteredJobRecord> = enriched
            .records
            .into_iter()
            .filter(|record| self.filter.accepts(record))
            .map(|record| record.with_company(source.name.as_str()))
            .collect();
        report.matched = matched.len();

        let fresh = history.filter_new(matched, &source.name);
        report.new = fresh.len();
        Ok((fresh, report))
    }

    /// Walk every list page on a session that is closed before enrichment starts.
    fn collect(&self, endpoint: &str) -> Result<PaginatedRecords, SourceError> {
        let mut session =
            AdapterSession::open(self.factory.as_ref(), endpoint).map_err(SourceError::Open)?;
        Ok(self.driver.drive(&mut *session)?)
    }
}
