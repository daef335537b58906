use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use job_digest::config::{SearchConfig, SourceDefinition};
use job_digest::workflows::discovery::{
    AdapterError, AdapterFactory, DigestPipeline, EnrichmentScheduler, ExtractionError,
    FilterEngine, HistoryIndex, LocationState, PageBatch, PaginationDriver, PaginationLimits,
    RawJobRecord, SiteAdapter,
};

const SEARCH: &str = "\
key_groups:
  engineering: [engineer, developer]
locations:
  texas: [austin, dallas]
  anywhere: [remote]
email_recipients: [me@example.com]
";

#[derive(Clone)]
struct Posting {
    title: &'static str,
    listing: &'static str,
    detail: Option<Vec<&'static str>>,
}

fn posting(title: &'static str, listing: &'static str) -> Posting {
    Posting {
        title,
        listing,
        detail: None,
    }
}

fn multi(title: &'static str, listing: &'static str, detail: &[&'static str]) -> Posting {
    Posting {
        title,
        listing,
        detail: Some(detail.to_vec()),
    }
}

#[derive(Clone, Default)]
struct FakeBoards {
    boards: HashMap<String, Vec<Posting>>,
    broken_cards: HashMap<String, usize>,
    stuck: Vec<String>,
    sessions: Arc<Mutex<Vec<String>>>,
}

impl FakeBoards {
    fn board(mut self, endpoint: &str, postings: Vec<Posting>) -> Self {
        self.boards.insert(endpoint.to_string(), postings);
        self
    }

    fn sessions_for(&self, endpoint: &str) -> usize {
        self.sessions
            .lock()
            .expect("session log")
            .iter()
            .filter(|opened| opened.as_str() == endpoint)
            .count()
    }
}

impl AdapterFactory for FakeBoards {
    fn open(&self, endpoint: &str) -> Result<Box<dyn SiteAdapter>, AdapterError> {
        let postings = self
            .boards
            .get(endpoint)
            .cloned()
            .ok_or_else(|| AdapterError::Open {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_string(),
            })?;
        self.sessions
            .lock()
            .expect("session log")
            .push(endpoint.to_string());
        Ok(Box::new(FakeBoard {
            endpoint: endpoint.to_string(),
            postings,
            broken_cards: self.broken_cards.get(endpoint).copied().unwrap_or(0),
            stuck: self.stuck.iter().any(|stuck| stuck == endpoint),
            offset: 0,
        }))
    }
}

struct FakeBoard {
    endpoint: String,
    postings: Vec<Posting>,
    broken_cards: usize,
    stuck: bool,
    offset: usize,
}

impl SiteAdapter for FakeBoard {
    fn next_page(&mut self) -> Result<Option<PageBatch>, AdapterError> {
        let total = self.postings.len() + self.broken_cards;
        if self.stuck {
            return Ok(Some(PageBatch {
                records: Vec::new(),
                position: 0,
                total: total.max(1),
            }));
        }
        if self.offset >= self.postings.len() {
            return Ok(None);
        }

        let mut records: Vec<Result<RawJobRecord, ExtractionError>> = self
            .postings
            .iter()
            .enumerate()
            .map(|(index, posting)| {
                Ok(RawJobRecord {
                    title: posting.title.to_string(),
                    link: format!("{}/job/{index}", self.endpoint),
                    location: LocationState::from_listing_text(posting.listing),
                    job_id: None,
                    position_type: "unknown".to_string(),
                })
            })
            .collect();
        for index in 0..self.broken_cards {
            records.push(Err(ExtractionError {
                index,
                reason: "card without a title".to_string(),
            }));
        }
        self.offset = self.postings.len();
        Ok(Some(PageBatch {
            records,
            position: total,
            total,
        }))
    }

    fn fetch_detail(&mut self, link: &str) -> Result<Vec<String>, AdapterError> {
        let index: usize = link
            .rsplit('/')
            .next()
            .and_then(|index| index.parse().ok())
            .ok_or_else(|| AdapterError::Malformed(link.to_string()))?;
        match self.postings.get(index).and_then(|posting| posting.detail.clone()) {
            Some(locations) => Ok(locations.into_iter().map(String::from).collect()),
            None => Err(AdapterError::Transport("detail page failed".to_string())),
        }
    }
}

fn search() -> SearchConfig {
    SearchConfig::from_reader(SEARCH.as_bytes()).expect("search config parses")
}

fn sources(names: &[(&str, &str)]) -> Vec<SourceDefinition> {
    names
        .iter()
        .map(|(name, endpoint)| SourceDefinition::new(*name, *endpoint))
        .collect()
}

fn pipeline(boards: FakeBoards) -> DigestPipeline {
    let filter = FilterEngine::from_config(&search()).expect("taxonomies compile");
    DigestPipeline::new(Box::new(boards), filter).with_scheduler(EnrichmentScheduler::new(2))
}

#[test]
fn failing_sources_are_reported_and_skipped() {
    let boards = FakeBoards::default().board(
        "acme",
        vec![
            posting("Backend Engineer", "Austin, TX"),
            posting("Software Engineer", "Remote, India"),
            posting("Sales Lead", "Dallas, TX"),
        ],
    );
    let run = pipeline(boards).run(
        &sources(&[("Broken", "missing"), ("Acme", "acme")]),
        &HistoryIndex::default(),
    );

    assert_eq!(run.jobs.len(), 1);
    assert_eq!(run.jobs[0].company, "Acme");
    assert_eq!(run.jobs[0].title, "Backend Engineer");

    let summary = run.summary();
    assert_eq!(summary.sources_attempted, 2);
    assert_eq!(summary.sources_failed, 1);
    assert_eq!((summary.found, summary.matched, summary.new), (3, 1, 1));
    let failed: Vec<_> = run.failures().map(|report| report.name.as_str()).collect();
    assert_eq!(failed, vec!["Broken"]);
}

#[test]
fn stalled_pagination_fails_only_that_source() {
    let mut boards = FakeBoards::default()
        .board("stuck", vec![posting("Engineer", "Austin, TX")])
        .board("acme", vec![posting("Developer", "Remote")]);
    boards.stuck.push("stuck".to_string());

    let run = pipeline(boards).run(
        &sources(&[("Stuck", "stuck"), ("Acme", "acme")]),
        &HistoryIndex::default(),
    );

    assert_eq!(run.jobs.len(), 1);
    let stuck = &run.reports[0];
    assert!(stuck
        .failure
        .as_deref()
        .is_some_and(|reason| reason.contains("stalled")));
}

#[test]
fn configured_pagination_limits_decide_when_a_source_stalls() {
    let mut boards = FakeBoards::default().board("stuck", vec![posting("Engineer", "Austin, TX")]);
    boards.stuck.push("stuck".to_string());
    let stuck = sources(&[("Stuck", "stuck")]);

    let default_run = pipeline(boards.clone()).run(&stuck, &HistoryIndex::default());
    let strict_run = pipeline(boards)
        .with_driver(PaginationDriver::new(PaginationLimits {
            max_stalled_pages: 1,
            page_slack: 10,
        }))
        .run(&stuck, &HistoryIndex::default());

    assert!(default_run.reports[0]
        .failure
        .as_deref()
        .is_some_and(|reason| reason.contains("after 3 page(s)")));
    assert!(strict_run.reports[0]
        .failure
        .as_deref()
        .is_some_and(|reason| reason.contains("after 2 page(s)")));
}

#[test]
fn multi_location_postings_are_resolved_before_filtering() {
    let boards = FakeBoards::default().board(
        "globex",
        vec![
            multi("Data Engineer", "2 Locations", &["Remote, Brazil", "Dallas, TX"]),
            multi("QA Engineer", "2 Locations", &["Remote, China", "Berlin"]),
            posting("Platform Engineer", "3 Locations"),
        ],
    );
    let factory = boards.clone();

    let run = pipeline(boards).run(&sources(&[("Globex", "globex")]), &HistoryIndex::default());

    let titles: Vec<&str> = run.jobs.iter().map(|job| job.title.as_str()).collect();
    assert_eq!(titles.len(), 1);
    assert!(titles.contains(&"Data Engineer"));
    let report = &run.reports[0];
    assert_eq!(report.resolved, 2);
    assert_eq!(report.enrichment_failures, 1);
    // one listing session plus one per enrichment worker
    assert_eq!(factory.sessions_for("globex"), 3);
}

#[test]
fn extraction_failures_are_counted_per_source() {
    let mut boards = FakeBoards::default().board("acme", vec![posting("Engineer", "Austin, TX")]);
    boards.broken_cards.insert("acme".to_string(), 2);

    let run = pipeline(boards).run(&sources(&[("Acme", "acme")]), &HistoryIndex::default());

    assert_eq!(run.reports[0].found, 1);
    assert_eq!(run.reports[0].extraction_failures, 2);
    assert_eq!(run.jobs.len(), 1);
}

#[test]
fn history_suppresses_postings_already_sent() {
    let boards = FakeBoards::default().board(
        "acme",
        vec![
            posting("Backend Engineer", "Austin, TX"),
            posting("Frontend Developer", "Remote"),
        ],
    );
    let pipeline = pipeline(boards);
    let acme = sources(&[("Acme", "acme")]);

    let first = pipeline.run(&acme, &HistoryIndex::default());
    assert_eq!(first.jobs.len(), 2);

    let mut history = HistoryIndex::default();
    history.record(&first.jobs);
    let second = pipeline.run(&acme, &history);
    assert!(second.jobs.is_empty());
    assert_eq!(second.reports[0].matched, 2);
}

#[test]
fn the_same_board_under_two_names_is_deduplicated_per_source() {
    let boards = FakeBoards::default().board("shared", vec![posting("Engineer", "Austin, TX")]);
    let mut history = HistoryIndex::default();
    history.insert("Salesforce", "shared/job/0", "Engineer");

    let run = pipeline(boards).run(
        &sources(&[("Salesforce", "shared"), ("Slack", "shared")]),
        &history,
    );

    let companies: Vec<&str> = run.jobs.iter().map(|job| job.company.as_str()).collect();
    assert_eq!(companies, vec!["Slack"]);
}

#[test]
fn empty_taxonomies_accept_nothing() {
    let boards = FakeBoards::default().board("acme", vec![posting("Engineer", "Austin, TX")]);
    let filter = FilterEngine::from_config(&SearchConfig {
        key_groups: IndexMap::new(),
        locations: IndexMap::new(),
        ..search()
    })
    .expect("empty taxonomies compile");

    let run = DigestPipeline::new(Box::new(boards), filter)
        .run(&sources(&[("Acme", "acme")]), &HistoryIndex::default());

    assert!(run.jobs.is_empty());
    assert_eq!(run.reports[0].found, 1);
}
