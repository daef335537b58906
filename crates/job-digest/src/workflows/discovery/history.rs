use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use super::domain::FilteredJobRecord;

pub const ADDED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A posting that was already delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub company: String,
    pub title: String,
    pub link: String,
    pub locations: Vec<String>,
    pub job_id: Option<String>,
    pub added_date: NaiveDateTime,
}

impl HistoryEntry {
    pub fn from_record(record: &FilteredJobRecord, added_date: NaiveDateTime) -> Self {
        Self {
            company: record.company.clone(),
            title: record.title.clone(),
            link: record.link.clone(),
            locations: record.locations.clone(),
            job_id: record.job_id.clone(),
            added_date,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history file unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("history CSV is invalid: {0}")]
    Csv(#[from] csv::Error),
    #[error("location column is not a JSON list: {0}")]
    Location(#[from] serde_json::Error),
    #[error("added_date '{0}' does not match {ADDED_DATE_FORMAT}")]
    AddedDate(String),
}

/// Append-only storage for delivered postings.
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError>;
    fn append(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError>;
}

/// Delivered postings grouped by company, then link, holding every title seen at that link.
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    companies: HashMap<String, HashMap<String, Vec<String>>>,
    entries: usize,
}

impl HistoryIndex {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a HistoryEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index.insert(&entry.company, &entry.link, &entry.title);
        }
        index
    }

    /// Load the store, treating a missing or unreadable history as empty.
    pub fn load_or_empty(store: &dyn HistoryStore) -> Self {
        match store.load() {
            Ok(entries) => {
                let index = Self::from_entries(&entries);
                info!(entries = index.len(), "loaded previously sent jobs");
                index
            }
            Err(err) => {
                warn!(error = %err, "error loading previous jobs; treating every posting as new");
                Self::default()
            }
        }
    }

    pub fn insert(&mut self, company: &str, link: &str, title: &str) {
        let titles = self
            .companies
            .entry(company.to_string())
            .or_default()
            .entry(link.to_string())
            .or_default();
        let title = title.to_lowercase();
        if !titles.contains(&title) {
            titles.push(title);
            self.entries += 1;
        }
    }

    pub fn record(&mut self, records: &[FilteredJobRecord]) {
        for record in records {
            self.insert(&record.company, &record.link, &record.title);
        }
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// True when `source` already delivered a posting at `link` under the same title.
    pub fn contains(&self, source: &str, link: &str, title: &str) -> bool {
        let title = title.to_lowercase();
        self.companies
            .get(source)
            .and_then(|links| links.get(link))
            .is_some_and(|titles| titles.contains(&title))
    }

    /// Keep the candidates `source` has not delivered before.
    ///
    /// A reused link with a different title counts as new. Location or position type
    /// changes on a delivered link do not. Repeats within `records` are kept once.
    pub fn filter_new(
        &self,
        records: Vec<FilteredJobRecord>,
        source: &str,
    ) -> Vec<FilteredJobRecord> {
        let mut batch = HashSet::new();
        records
            .into_iter()
            .filter(|record| {
                if self.contains(source, &record.link, &record.title) {
                    debug!(title = %record.title, "skipping job that was already sent");
                    return false;
                }
                let first = batch.insert((record.link.clone(), record.title.to_lowercase()));
                if !first {
                    debug!(title = %record.title, "skipping job listed twice in one run");
                }
                first
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryRow {
    company: String,
    title: String,
    link: String,
    location: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    job_id: Option<String>,
    added_date: String,
}

impl HistoryRow {
    fn from_entry(entry: &HistoryEntry) -> Result<Self, HistoryError> {
        Ok(Self {
            company: entry.company.clone(),
            title: entry.title.clone(),
            link: entry.link.clone(),
            location: serde_json::to_string(&entry.locations)?,
            job_id: entry.job_id.clone(),
            added_date: entry.added_date.format(ADDED_DATE_FORMAT).to_string(),
        })
    }

    fn into_entry(self) -> Result<HistoryEntry, HistoryError> {
        let locations: Vec<String> = serde_json::from_str(&self.location)?;
        let added_date = NaiveDateTime::parse_from_str(self.added_date.trim(), ADDED_DATE_FORMAT)
            .map_err(|_| HistoryError::AddedDate(self.added_date.clone()))?;
        Ok(HistoryEntry {
            company: self.company,
            title: self.title,
            link: self.link,
            locations,
            job_id: self.job_id,
            added_date,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Parse history rows, skipping rows that cannot be understood.
pub fn read_entries<R: Read>(reader: R) -> Result<Vec<HistoryEntry>, HistoryError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let mut entries = Vec::new();

    for (line, row) in csv_reader.deserialize::<HistoryRow>().enumerate() {
        match row.map_err(HistoryError::from).and_then(HistoryRow::into_entry) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!(row = line + 1, error = %err, "skipping unreadable history row"),
        }
    }

    Ok(entries)
}

pub fn write_entries<W: Write>(
    writer: W,
    entries: &[HistoryEntry],
    include_header: bool,
) -> Result<(), HistoryError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(include_header)
        .from_writer(writer);
    for entry in entries {
        csv_writer.serialize(HistoryRow::from_entry(entry)?)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// CSV-backed history with columns `company,title,link,location,job_id,added_date`.
#[derive(Debug, Clone)]
pub struct CsvHistoryStore {
    path: PathBuf,
}

impl CsvHistoryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for CsvHistoryStore {
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no history file yet");
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        read_entries(file)
    }

    fn append(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        if entries.is_empty() {
            return Ok(());
        }
        let needs_header = std::fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write_entries(file, entries, needs_header)?;
        info!(count = entries.len(), path = %self.path.display(), "saved jobs to history");
        Ok(())
    }
}
