pub mod adapter;
pub mod domain;
pub mod enrichment;
pub mod filter;
pub mod history;
pub mod pagination;
mod pipeline;
pub mod sources;
pub mod workday;

pub use adapter::{
    AdapterError, AdapterFactory, AdapterSession, ExtractionError, PageBatch, SiteAdapter,
};
pub use domain::{EnrichedJobRecord, FilteredJobRecord, LocationState, RawJobRecord};
pub use enrichment::{EnrichmentFailure, EnrichmentOutcome, EnrichmentScheduler};
pub use filter::{FilterEngine, FilterError, Taxonomy};
pub use history::{CsvHistoryStore, HistoryEntry, HistoryError, HistoryIndex, HistoryStore};
pub use pagination::{PaginationDriver, PaginationError, PaginationLimits};
pub use pipeline::{DigestPipeline, DigestRun, RunSummary, SourceError, SourceReport};
pub use workday::WorkdayAdapterFactory;
