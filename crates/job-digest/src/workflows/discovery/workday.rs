//! Workday career-site adapter.
//!
//! Workday boards render from a JSON service living next to the public site:
//! `POST /wday/cxs/{tenant}/{site}/jobs` pages through postings and
//! `GET /wday/cxs/{tenant}/{site}{externalPath}` returns one posting's details.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::adapter::{AdapterError, AdapterFactory, ExtractionError, PageBatch, SiteAdapter};
use super::domain::{LocationState, RawJobRecord, UNKNOWN_POSITION_TYPE};

/// Largest page the jobs service accepts.
pub const WORKDAY_PAGE_SIZE: usize = 20;

const USER_AGENT: &str = concat!("job-digest/", env!("CARGO_PKG_VERSION"));

/// Where a Workday board lives, derived from its public career-site URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkdayEndpoint {
    pub origin: String,
    pub tenant: String,
    pub site: String,
    /// Prefix that turns an `externalPath` into a shareable link.
    pub public_base: String,
}

impl WorkdayEndpoint {
    /// Accepts `https://{tenant}.wdN.myworkdayjobs.com/[locale/]{site}[/...]` and
    /// `https://wdN.myworkdaysite.com/[locale/]recruiting/{tenant}/{site}`.
    pub fn parse(raw: &str) -> Result<Self, AdapterError> {
        let invalid = |reason: &str| AdapterError::Open {
            endpoint: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw.trim()).map_err(|err| invalid(&err.to_string()))?;
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let origin = format!("{}://{}", url.scheme(), host);
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|segment| !segment.is_empty() && !is_locale(segment))
                    .collect()
            })
            .unwrap_or_default();

        if host.ends_with(".myworkdaysite.com") {
            match segments.as_slice() {
                ["recruiting", tenant, site, ..] => Ok(Self {
                    public_base: format!("{origin}/recruiting/{tenant}/{site}"),
                    origin,
                    tenant: tenant.to_string(),
                    site: site.to_string(),
                }),
                _ => Err(invalid("expected /recruiting/{tenant}/{site}")),
            }
        } else if host.ends_with(".myworkdayjobs.com") {
            let tenant = host
                .split('.')
                .next()
                .filter(|label| !label.is_empty())
                .ok_or_else(|| invalid("missing tenant"))?;
            let site = segments
                .first()
                .ok_or_else(|| invalid("missing career site name"))?;
            Ok(Self {
                public_base: format!("{origin}/{site}"),
                origin: origin.clone(),
                tenant: tenant.to_string(),
                site: site.to_string(),
            })
        } else {
            Err(invalid("not a Workday career site"))
        }
    }

    pub fn api_base(&self) -> String {
        format!("{}/wday/cxs/{}/{}", self.origin, self.tenant, self.site)
    }

    fn external_path<'a>(&self, link: &'a str) -> Option<&'a str> {
        link.strip_prefix(self.public_base.as_str())
            .filter(|path| path.starts_with('/'))
    }
}

fn is_locale(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 5
        && bytes[2] == b'-'
        && bytes[..2].iter().all(u8::is_ascii_lowercase)
        && bytes[3..].iter().all(u8::is_ascii_uppercase)
}

/// Opens one HTTP client per session; the client timeout bounds every wait.
#[derive(Debug, Clone)]
pub struct WorkdayAdapterFactory {
    wait_timeout: Duration,
    page_size: usize,
}

impl WorkdayAdapterFactory {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            wait_timeout,
            page_size: WORKDAY_PAGE_SIZE,
        }
    }
}

impl AdapterFactory for WorkdayAdapterFactory {
    fn open(&self, endpoint: &str) -> Result<Box<dyn SiteAdapter>, AdapterError> {
        let endpoint = WorkdayEndpoint::parse(endpoint)?;
        let client = Client::builder()
            .timeout(self.wait_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| AdapterError::Open {
                endpoint: endpoint.public_base.clone(),
                reason: err.to_string(),
            })?;

        Ok(Box::new(WorkdayAdapter {
            client,
            endpoint,
            wait_timeout: self.wait_timeout,
            page_size: self.page_size,
            offset: 0,
            total: None,
        }))
    }
}

pub struct WorkdayAdapter {
    client: Client,
    endpoint: WorkdayEndpoint,
    wait_timeout: Duration,
    page_size: usize,
    offset: usize,
    total: Option<usize>,
}

impl WorkdayAdapter {
    fn map_error(&self, operation: &str, err: reqwest::Error) -> AdapterError {
        if err.is_timeout() {
            AdapterError::Timeout {
                operation: operation.to_string(),
                after: self.wait_timeout,
            }
        } else if err.is_decode() {
            AdapterError::Malformed(err.to_string())
        } else {
            AdapterError::Transport(err.to_string())
        }
    }
}

impl SiteAdapter for WorkdayAdapter {
    fn next_page(&mut self) -> Result<Option<PageBatch>, AdapterError> {
        if self.total.is_some_and(|total| self.offset >= total) {
            return Ok(None);
        }

        let url = format!("{}/jobs", self.endpoint.api_base());
        let body = json!({
            "appliedFacets": {},
            "limit": self.page_size,
            "offset": self.offset,
            "searchText": "",
        });
        debug!(%url, offset = self.offset, "requesting job list page");

        let response: JobsResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|err| self.map_error("job list page", err))?;

        // Workday reports the total on the first page only.
        let total = *self.total.get_or_insert(response.total);
        let batch = parse_postings(&self.endpoint, response.job_postings, self.offset, total);
        self.offset = batch.position;
        Ok(Some(batch))
    }

    fn fetch_detail(&mut self, link: &str) -> Result<Vec<String>, AdapterError> {
        let path = self.endpoint.external_path(link).ok_or_else(|| {
            AdapterError::Malformed(format!("{link} is not a posting on this board"))
        })?;
        let url = format!("{}{}", self.endpoint.api_base(), path);

        let detail: DetailResponse = self
            .client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|err| self.map_error("job detail page", err))?;

        Ok(detail.job_posting_info.locations())
    }
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    total: usize,
    #[serde(rename = "jobPostings", default)]
    job_postings: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct JobPosting {
    title: String,
    #[serde(rename = "externalPath")]
    external_path: String,
    #[serde(rename = "locationsText", default)]
    locations_text: Option<String>,
    #[serde(rename = "bulletFields", default)]
    bullet_fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(rename = "jobPostingInfo")]
    job_posting_info: JobPostingInfo,
}

#[derive(Debug, Deserialize)]
struct JobPostingInfo {
    #[serde(default)]
    location: Option<String>,
    #[serde(rename = "additionalLocations", default)]
    additional_locations: Vec<String>,
}

impl JobPostingInfo {
    fn locations(self) -> Vec<String> {
        let mut locations: Vec<String> = Vec::new();
        for location in self.location.into_iter().chain(self.additional_locations) {
            let location = location.trim().to_string();
            if !location.is_empty() && !locations.contains(&location) {
                locations.push(location);
            }
        }
        locations
    }
}

fn parse_postings(
    endpoint: &WorkdayEndpoint,
    postings: Vec<Value>,
    offset: usize,
    total: usize,
) -> PageBatch {
    let seen = postings.len();
    let records: Vec<_> = postings
        .into_iter()
        .enumerate()
        .map(|(index, value)| -> Result<RawJobRecord, ExtractionError> {
            let posting: JobPosting =
                serde_json::from_value(value).map_err(|err| ExtractionError {
                    index,
                    reason: err.to_string(),
                })?;
            Ok(RawJobRecord {
                title: posting.title.trim().to_string(),
                link: format!("{}{}", endpoint.public_base, posting.external_path),
                location: LocationState::from_listing_text(
                    posting.locations_text.as_deref().unwrap_or_default(),
                ),
                job_id: posting
                    .bullet_fields
                    .into_iter()
                    .map(|field| field.trim().to_string())
                    .find(|field| !field.is_empty()),
                position_type: UNKNOWN_POSITION_TYPE.to_string(),
            })
        })
        .collect();

    PageBatch {
        records,
        position: offset + seen,
        total,
    }
}
