use indexmap::IndexMap;
use job_digest::config::SourceDefinition;
use job_digest::workflows::digest::{DeliveryError, DigestMailer, OutgoingMessage};
use job_digest::workflows::discovery::{
    AdapterError, AdapterFactory, HistoryEntry, HistoryError, HistoryStore, LocationState,
    PageBatch, RawJobRecord, SiteAdapter,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const FIXTURE_PAGE_SIZE: usize = 2;

/// A canned posting: list-card location plus the locations its detail page lists.
#[derive(Debug, Clone)]
pub(crate) struct FixturePosting {
    pub(crate) title: &'static str,
    pub(crate) listing_location: &'static str,
    pub(crate) detail_locations: &'static [&'static str],
}

/// Serves canned career sites from memory, paged like a real board.
#[derive(Debug, Clone, Default)]
pub(crate) struct FixtureAdapterFactory {
    boards: HashMap<String, Vec<FixturePosting>>,
}

impl FixtureAdapterFactory {
    pub(crate) fn with_board(mut self, endpoint: &str, postings: Vec<FixturePosting>) -> Self {
        self.boards.insert(endpoint.to_string(), postings);
        self
    }
}

impl AdapterFactory for FixtureAdapterFactory {
    fn open(&self, endpoint: &str) -> Result<Box<dyn SiteAdapter>, AdapterError> {
        let postings = self
            .boards
            .get(endpoint)
            .cloned()
            .ok_or_else(|| AdapterError::Open {
                endpoint: endpoint.to_string(),
                reason: "no such board".to_string(),
            })?;
        Ok(Box::new(FixtureAdapter {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            postings,
            offset: 0,
        }))
    }
}

struct FixtureAdapter {
    endpoint: String,
    postings: Vec<FixturePosting>,
    offset: usize,
}

impl FixtureAdapter {
    fn link(&self, index: usize) -> String {
        format!("{}/job/{}", self.endpoint, index + 1)
    }
}

impl SiteAdapter for FixtureAdapter {
    fn next_page(&mut self) -> Result<Option<PageBatch>, AdapterError> {
        if self.offset >= self.postings.len() {
            return Ok(None);
        }
        let end = (self.offset + FIXTURE_PAGE_SIZE).min(self.postings.len());
        let records = (self.offset..end)
            .map(|index| {
                let posting = &self.postings[index];
                Ok(RawJobRecord {
                    title: posting.title.to_string(),
                    link: self.link(index),
                    location: LocationState::from_listing_text(posting.listing_location),
                    job_id: Some(format!("FX-{}", index + 1)),
                    position_type: "Full time".to_string(),
                })
            })
            .collect();
        self.offset = end;
        Ok(Some(PageBatch {
            records,
            position: end,
            total: self.postings.len(),
        }))
    }

    fn fetch_detail(&mut self, link: &str) -> Result<Vec<String>, AdapterError> {
        (0..self.postings.len())
            .find(|index| self.link(*index) == link)
            .map(|index| {
                self.postings[index]
                    .detail_locations
                    .iter()
                    .map(|location| location.to_string())
                    .collect()
            })
            .ok_or_else(|| AdapterError::Malformed(format!("unknown posting {link}")))
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryHistoryStore {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl HistoryStore for InMemoryHistoryStore {
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.entries.lock().expect("history mutex poisoned").clone())
    }

    fn append(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let mut guard = self.entries.lock().expect("history mutex poisoned");
        guard.extend_from_slice(entries);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryMailer {
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
}

impl DigestMailer for InMemoryMailer {
    fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        let mut guard = self.sent.lock().expect("mailer mutex poisoned");
        guard.push(message.clone());
        Ok(())
    }
}

impl InMemoryMailer {
    pub(crate) fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

pub(crate) fn demo_sources() -> Vec<SourceDefinition> {
    vec![
        SourceDefinition::new("Acme Robotics", "fixture://acme"),
        SourceDefinition::new("Globex", "fixture://globex"),
        SourceDefinition::new("Initech", "fixture://initech"),
    ]
}

pub(crate) fn demo_factory() -> FixtureAdapterFactory {
    FixtureAdapterFactory::default()
        .with_board(
            "fixture://acme",
            vec![
                FixturePosting {
                    title: "Firmware Engineer",
                    listing_location: "Austin, TX",
                    detail_locations: &[],
                },
                FixturePosting {
                    title: "Robotics Software Engineer",
                    listing_location: "3 Locations",
                    detail_locations: &["Boston, MA", "Remote - USA", "Austin, TX"],
                },
                FixturePosting {
                    title: "Account Executive",
                    listing_location: "Dallas, TX",
                    detail_locations: &[],
                },
            ],
        )
        .with_board(
            "fixture://globex",
            vec![
                FixturePosting {
                    title: "Backend Developer",
                    listing_location: "Remote, India",
                    detail_locations: &[],
                },
                FixturePosting {
                    title: "Data Engineer",
                    listing_location: "2 Locations",
                    detail_locations: &["Remote, Brazil", "Dallas, TX"],
                },
            ],
        )
}

/// Taxonomies used when the demo runs without a search config.
pub(crate) fn demo_taxonomies() -> (IndexMap<String, Vec<String>>, IndexMap<String, Vec<String>>) {
    let locations = IndexMap::from([
        (
            "texas".to_string(),
            vec!["austin".to_string(), "dallas".to_string()],
        ),
        ("anywhere".to_string(), vec!["remote".to_string()]),
    ]);
    let keywords = IndexMap::from([(
        "engineering".to_string(),
        vec!["engineer".to_string(), "developer".to_string()],
    )]);
    (locations, keywords)
}
