use tracing::{debug, info, warn};

use super::adapter::{AdapterError, SiteAdapter};
use super::domain::RawJobRecord;

/// Bounds that keep a misbehaving progress signal from looping forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLimits {
    /// Consecutive pages without forward progress before the source is abandoned.
    pub max_stalled_pages: usize,
    /// Pages allowed beyond `total / page_size`, both taken from the first page.
    pub page_slack: usize,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            max_stalled_pages: 3,
            page_slack: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationStats {
    pub pages: usize,
    pub extracted: usize,
    pub extraction_failures: usize,
    pub reported_total: usize,
}

#[derive(Debug, Default)]
pub struct PaginatedRecords {
    pub records: Vec<RawJobRecord>,
    pub stats: PaginationStats,
}

#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("pagination stalled at {position}/{total} after {pages} page(s)")]
    Stalled {
        pages: usize,
        position: usize,
        total: usize,
    },
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Walks an adapter page by page until the progress signal reaches its total.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginationDriver {
    limits: PaginationLimits,
}

impl PaginationDriver {
    pub fn new(limits: PaginationLimits) -> Self {
        Self { limits }
    }

    pub fn drive(
        &self,
        adapter: &mut dyn SiteAdapter,
    ) -> Result<PaginatedRecords, PaginationError> {
        let mut output = PaginatedRecords::default();
        let mut budget = None;
        let mut last_position = None;
        let mut stalled = 0;

        while let Some(page) = adapter.next_page()? {
            output.stats.pages += 1;
            output.stats.reported_total = page.total;
            // Fixed on the first page so a growing total cannot extend the crawl.
            let page_bound = *budget.get_or_insert_with(|| {
                page.total.div_ceil(page.records.len().max(1)) + self.limits.page_slack
            });

            for entry in page.records {
                match entry {
                    Ok(record) => {
                        output.stats.extracted += 1;
                        output.records.push(record);
                    }
                    Err(err) => {
                        output.stats.extraction_failures += 1;
                        warn!(
                            page = output.stats.pages,
                            error = %err,
                            "skipping unreadable job card"
                        );
                    }
                }
            }

            info!(position = page.position, total = page.total, "jobs seen");

            if page.position >= page.total {
                debug!(pages = output.stats.pages, "reached the last page");
                return Ok(output);
            }

            let advanced = last_position.map_or(true, |previous| page.position > previous);
            if advanced {
                stalled = 0;
                last_position = Some(page.position);
            } else {
                stalled += 1;
                warn!(position = page.position, stalled, "progress signal did not advance");
            }

            if stalled >= self.limits.max_stalled_pages || output.stats.pages >= page_bound {
                return Err(PaginationError::Stalled {
                    pages: output.stats.pages,
                    position: page.position,
                    total: page.total,
                });
            }
        }

        debug!(pages = output.stats.pages, "adapter reported end of pages");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::super::adapter::{ExtractionError, PageBatch};
    use super::super::domain::{LocationState, UNKNOWN_POSITION_TYPE};
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedAdapter {
        pages: VecDeque<PageBatch>,
        repeat_last: Option<(usize, usize)>,
        served: usize,
    }

    impl ScriptedAdapter {
        fn new(pages: Vec<PageBatch>) -> Self {
            Self {
                pages: pages.into(),
                repeat_last: None,
                served: 0,
            }
        }

        fn stuck_at(position: usize, total: usize) -> Self {
            Self {
                pages: VecDeque::new(),
                repeat_last: Some((position, total)),
                served: 0,
            }
        }
    }

    impl SiteAdapter for ScriptedAdapter {
        fn next_page(&mut self) -> Result<Option<PageBatch>, AdapterError> {
            self.served += 1;
            if let Some(page) = self.pages.pop_front() {
                return Ok(Some(page));
            }
            Ok(self.repeat_last.map(|(position, total)| PageBatch {
                records: vec![Ok(job(self.served))],
                position,
                total,
            }))
        }

        fn fetch_detail(&mut self, _link: &str) -> Result<Vec<String>, AdapterError> {
            Ok(Vec::new())
        }
    }

    fn job(n: usize) -> RawJobRecord {
        RawJobRecord {
            title: format!("Engineer {n}"),
            link: format!("https://jobs.example.com/{n}"),
            location: LocationState::Single("Austin, TX".to_string()),
            job_id: None,
            position_type: UNKNOWN_POSITION_TYPE.to_string(),
        }
    }

    fn page(ids: &[usize], failures: usize, position: usize, total: usize) -> PageBatch {
        let mut records: Vec<_> = ids.iter().map(|id| Ok(job(*id))).collect();
        for index in 0..failures {
            records.push(Err(ExtractionError {
                index,
                reason: "missing title".to_string(),
            }));
        }
        PageBatch {
            records,
            position,
            total,
        }
    }

    #[test]
    fn concatenates_pages_until_position_reaches_total() {
        let mut adapter = ScriptedAdapter::new(vec![
            page(&[1, 2], 0, 2, 5),
            page(&[3, 4], 0, 4, 5),
            page(&[5], 0, 5, 5),
            page(&[6], 0, 6, 6),
        ]);

        let output = PaginationDriver::default()
            .drive(&mut adapter)
            .expect("pagination completes");

        assert_eq!(output.records.len(), 5);
        assert_eq!(output.stats.pages, 3);
        assert_eq!(output.records[4].title, "Engineer 5");
    }

    #[test]
    fn extraction_failures_are_counted_not_fatal() {
        let mut adapter = ScriptedAdapter::new(vec![page(&[1, 2], 1, 3, 6), page(&[3], 2, 6, 6)]);

        let output = PaginationDriver::default()
            .drive(&mut adapter)
            .expect("pagination completes");

        let entries_seen = 3 + 3;
        assert_eq!(output.stats.extraction_failures, 3);
        assert_eq!(output.records.len(), entries_seen - 3);
        assert_eq!(output.stats.extracted, output.records.len());
    }

    #[test]
    fn stops_when_adapter_runs_out_of_pages() {
        let mut adapter = ScriptedAdapter::new(vec![page(&[1, 2], 0, 2, 10)]);

        let output = PaginationDriver::default()
            .drive(&mut adapter)
            .expect("end of pages is not an error");
        assert_eq!(output.records.len(), 2);
    }

    #[test]
    fn repeated_position_fails_as_stalled() {
        let mut adapter = ScriptedAdapter::stuck_at(20, 100);
        let driver = PaginationDriver::new(PaginationLimits {
            max_stalled_pages: 3,
            page_slack: 50,
        });

        let error = driver.drive(&mut adapter).expect_err("stall detected");
        match error {
            PaginationError::Stalled {
                pages,
                position,
                total,
            } => {
                assert_eq!(pages, 4);
                assert_eq!((position, total), (20, 100));
            }
            other => panic!("expected stall, got {other:?}"),
        }
        assert_eq!(adapter.served, 4);
    }

    #[test]
    fn slow_progress_is_bounded_by_the_page_budget() {
        let mut adapter = ScriptedAdapter::new(vec![
            page(&[1, 2], 0, 1, 4),
            page(&[3, 4], 0, 2, 4),
            page(&[5, 6], 0, 3, 4),
            page(&[7, 8], 0, 4, 4),
        ]);
        let driver = PaginationDriver::new(PaginationLimits {
            max_stalled_pages: 3,
            page_slack: 0,
        });

        let error = driver.drive(&mut adapter).expect_err("budget exceeded");
        assert!(matches!(error, PaginationError::Stalled { pages: 2, .. }));
        assert_eq!(adapter.served, 2);
    }

    #[test]
    fn growing_total_cannot_extend_the_page_budget() {
        struct Receding {
            served: usize,
        }
        impl SiteAdapter for Receding {
            fn next_page(&mut self) -> Result<Option<PageBatch>, AdapterError> {
                self.served += 1;
                Ok(Some(PageBatch {
                    records: vec![Ok(job(self.served))],
                    position: self.served,
                    total: self.served * 2,
                }))
            }
            fn fetch_detail(&mut self, _link: &str) -> Result<Vec<String>, AdapterError> {
                Ok(Vec::new())
            }
        }

        let mut adapter = Receding { served: 0 };
        let error = PaginationDriver::default()
            .drive(&mut adapter)
            .expect_err("budget from the first page applies");

        // first page: total 2, one record per page, slack 2
        assert!(matches!(error, PaginationError::Stalled { pages: 4, .. }));
        assert_eq!(adapter.served, 4);
    }

    #[test]
    fn adapter_errors_propagate() {
        struct Broken;
        impl SiteAdapter for Broken {
            fn next_page(&mut self) -> Result<Option<PageBatch>, AdapterError> {
                Err(AdapterError::Timeout {
                    operation: "list page".to_string(),
                    after: std::time::Duration::from_secs(10),
                })
            }
            fn fetch_detail(&mut self, _link: &str) -> Result<Vec<String>, AdapterError> {
                Ok(Vec::new())
            }
        }

        let error = PaginationDriver::default()
            .drive(&mut Broken)
            .expect_err("timeout surfaces");
        assert!(matches!(error, PaginationError::Adapter(AdapterError::Timeout { .. })));
    }
}
