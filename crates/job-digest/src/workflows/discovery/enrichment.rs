use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::{debug, error, info, warn};

use super::adapter::{AdapterError, AdapterFactory, AdapterSession};
use super::domain::{EnrichedJobRecord, RawJobRecord};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Detail fetches per record; only timeouts and transport errors are retried.
const DETAIL_ATTEMPTS: usize = 2;

/// A posting whose detail page could not be resolved. The record keeps its raw location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not resolve locations for {link}: {reason}")]
pub struct EnrichmentFailure {
    pub link: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct EnrichmentOutcome {
    /// Every input record exactly once, in no particular order.
    pub records: Vec<EnrichedJobRecord>,
    pub resolved: usize,
    pub failures: Vec<EnrichmentFailure>,
}

impl EnrichmentOutcome {
    fn absorb(&mut self, group: GroupResult) {
        self.resolved += group.resolved;
        self.records.extend(group.records);
        self.failures.extend(group.failures);
    }

    fn fall_back(&mut self, group: &[RawJobRecord], reason: &str) {
        for record in group {
            self.failures.push(EnrichmentFailure {
                link: record.link.clone(),
                reason: reason.to_string(),
            });
            self.records.push(record.clone().into_unresolved());
        }
    }
}

/// Resolves multi-location postings on a fixed pool of workers, one adapter session each.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentScheduler {
    concurrency: usize,
}

impl Default for EnrichmentScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl EnrichmentScheduler {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn enrich(
        &self,
        factory: &dyn AdapterFactory,
        endpoint: &str,
        records: Vec<RawJobRecord>,
    ) -> EnrichmentOutcome {
        let (pending, ready): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|record| record.location.needs_resolution());

        let mut outcome = EnrichmentOutcome::default();
        if !pending.is_empty() {
            info!(
                pending = pending.len(),
                workers = self.concurrency,
                "resolving multi-location postings"
            );
            let groups = partition_round_robin(pending, self.concurrency);

            thread::scope(|scope| {
                let handles: Vec<_> = groups
                    .iter()
                    .enumerate()
                    .filter(|(_, group)| !group.is_empty())
                    .map(|(worker, group)| {
                        let handle =
                            scope.spawn(move || resolve_group(factory, endpoint, worker, group));
                        (worker, group, handle)
                    })
                    .collect();

                for (worker, group, handle) in handles {
                    match handle.join() {
                        Ok(result) => outcome.absorb(result),
                        Err(_) => {
                            error!(worker, "enrichment worker panicked; keeping raw locations");
                            outcome.fall_back(group, "enrichment worker panicked");
                        }
                    }
                }
            });
        }

        outcome
            .records
            .extend(ready.into_iter().map(RawJobRecord::into_unresolved));
        outcome
    }
}

/// Deal records into `workers` groups by index modulo `workers`.
pub(crate) fn partition_round_robin(
    records: Vec<RawJobRecord>,
    workers: usize,
) -> Vec<Vec<RawJobRecord>> {
    let workers = workers.max(1);
    let mut groups: Vec<Vec<RawJobRecord>> = (0..workers).map(|_| Vec::new()).collect();
    for (index, record) in records.into_iter().enumerate() {
        groups[index % workers].push(record);
    }
    groups
}

#[derive(Debug, Default)]
struct GroupResult {
    records: Vec<EnrichedJobRecord>,
    resolved: usize,
    failures: Vec<EnrichmentFailure>,
}

fn resolve_group(
    factory: &dyn AdapterFactory,
    endpoint: &str,
    worker: usize,
    group: &[RawJobRecord],
) -> GroupResult {
    let mut result = GroupResult::default();

    let mut session = match AdapterSession::open(factory, endpoint) {
        Ok(session) => session,
        Err(err) => {
            warn!(worker, error = %err, "enrichment session unavailable");
            for record in group {
                result.failures.push(EnrichmentFailure {
                    link: record.link.clone(),
                    reason: err.to_string(),
                });
                result.records.push(record.clone().into_unresolved());
            }
            return result;
        }
    };

    for record in group {
        // A panic costs only the record being fetched; earlier results stay resolved.
        let fetched = panic::catch_unwind(AssertUnwindSafe(|| {
            fetch_detail_with_retry(&mut session, worker, &record.link)
        }));
        match fetched {
            Ok(Ok(locations)) if !locations.is_empty() => {
                debug!(worker, link = %record.link, ?locations, "locations resolved");
                result.resolved += 1;
                result.records.push(record.clone().into_resolved(locations));
            }
            Ok(Ok(_)) => {
                warn!(worker, link = %record.link, "detail page listed no locations");
                result.failures.push(EnrichmentFailure {
                    link: record.link.clone(),
                    reason: "detail page listed no locations".to_string(),
                });
                result.records.push(record.clone().into_unresolved());
            }
            Ok(Err(err)) => {
                warn!(worker, link = %record.link, error = %err, "error retrieving locations");
                result.failures.push(EnrichmentFailure {
                    link: record.link.clone(),
                    reason: err.to_string(),
                });
                result.records.push(record.clone().into_unresolved());
            }
            Err(_) => {
                error!(worker, link = %record.link, "detail fetch panicked; keeping raw location");
                result.failures.push(EnrichmentFailure {
                    link: record.link.clone(),
                    reason: "detail fetch panicked".to_string(),
                });
                result.records.push(record.clone().into_unresolved());
            }
        }
    }

    result
}

fn fetch_detail_with_retry(
    session: &mut AdapterSession,
    worker: usize,
    link: &str,
) -> Result<Vec<String>, AdapterError> {
    let mut attempt = 1;
    loop {
        match session.fetch_detail(link) {
            Err(err) if err.is_retryable() && attempt < DETAIL_ATTEMPTS => {
                debug!(worker, link, attempt, error = %err, "retrying detail page");
                attempt += 1;
            }
            result => return result,
        }
    }
}
