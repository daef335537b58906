use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tracing::debug;

use super::domain::RawJobRecord;

/// One list page: the extracted entries plus the `position/total` progress signal.
#[derive(Debug, Default)]
pub struct PageBatch {
    pub records: Vec<Result<RawJobRecord, ExtractionError>>,
    pub position: usize,
    pub total: usize,
}

/// A live connection to one career site.
///
/// Every wait inside an implementation must be bounded and surface as
/// [`AdapterError::Timeout`] rather than blocking forever.
pub trait SiteAdapter: Send {
    /// Advance to and extract the next list page. `None` means no pages remain.
    fn next_page(&mut self) -> Result<Option<PageBatch>, AdapterError>;

    /// Fetch a posting's detail page and return its full location list.
    fn fetch_detail(&mut self, link: &str) -> Result<Vec<String>, AdapterError>;

    fn close(&mut self) {}
}

/// Opens independent adapter sessions. Sessions are never shared between workers.
pub trait AdapterFactory: Send + Sync {
    fn open(&self, endpoint: &str) -> Result<Box<dyn SiteAdapter>, AdapterError>;
}

/// Owned adapter session that is closed on every exit path.
pub struct AdapterSession {
    adapter: Box<dyn SiteAdapter>,
    endpoint: String,
}

impl AdapterSession {
    pub fn open(factory: &dyn AdapterFactory, endpoint: &str) -> Result<Self, AdapterError> {
        let adapter = factory.open(endpoint)?;
        debug!(endpoint, "adapter session opened");
        Ok(Self {
            adapter,
            endpoint: endpoint.to_string(),
        })
    }
}

impl Deref for AdapterSession {
    type Target = dyn SiteAdapter;

    fn deref(&self) -> &Self::Target {
        self.adapter.as_ref()
    }
}

impl DerefMut for AdapterSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.adapter.as_mut()
    }
}

impl Drop for AdapterSession {
    fn drop(&mut self) {
        self.adapter.close();
        debug!(endpoint = %self.endpoint, "adapter session closed");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("unable to open {endpoint}: {reason}")]
    Open { endpoint: String, reason: String },
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected page structure: {0}")]
    Malformed(String),
}

impl AdapterError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Timeout { .. } | AdapterError::Transport(_))
    }
}

/// A single list entry that could not be parsed. Never fatal to its page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("entry {index} could not be extracted: {reason}")]
pub struct ExtractionError {
    pub index: usize,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingAdapter {
        closed: Arc<AtomicUsize>,
    }

    impl SiteAdapter for CountingAdapter {
        fn next_page(&mut self) -> Result<Option<PageBatch>, AdapterError> {
            Err(AdapterError::Transport("connection reset".to_string()))
        }

        fn fetch_detail(&mut self, _link: &str) -> Result<Vec<String>, AdapterError> {
            Ok(Vec::new())
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingFactory {
        closed: Arc<AtomicUsize>,
    }

    impl AdapterFactory for CountingFactory {
        fn open(&self, _endpoint: &str) -> Result<Box<dyn SiteAdapter>, AdapterError> {
            Ok(Box::new(CountingAdapter {
                closed: self.closed.clone(),
            }))
        }
    }

    fn failing_page(factory: &CountingFactory) -> Result<(), AdapterError> {
        let mut session = AdapterSession::open(factory, "https://jobs.example.com")?;
        session.next_page()?;
        Ok(())
    }

    #[test]
    fn session_closes_when_an_error_propagates() {
        let closed = Arc::new(AtomicUsize::new(0));
        let factory = CountingFactory {
            closed: closed.clone(),
        };

        let error = failing_page(&factory).expect_err("page fails");
        assert!(error.is_retryable());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn malformed_pages_are_not_retryable() {
        assert!(!AdapterError::Malformed("missing total".to_string()).is_retryable());
    }
}
