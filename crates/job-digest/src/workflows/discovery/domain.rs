use serde::{Deserialize, Serialize};

/// Position type used when a listing card does not expose one.
pub const UNKNOWN_POSITION_TYPE: &str = "unknown";

/// How much an adapter knows about a posting's location from the list page alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationState {
    Single(String),
    /// The card only summarises several locations; `summary` is the text as shown.
    NeedsResolution { summary: String },
}

impl LocationState {
    /// Classify list-card location text. Cards such as "3 Locations" need a detail fetch.
    pub fn from_listing_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed
            .split_whitespace()
            .any(|word| word.eq_ignore_ascii_case("locations"))
        {
            Self::NeedsResolution {
                summary: trimmed.to_string(),
            }
        } else {
            Self::Single(trimmed.to_string())
        }
    }

    pub fn needs_resolution(&self) -> bool {
        matches!(self, Self::NeedsResolution { .. })
    }

    /// The location text exactly as the list page showed it.
    pub fn raw(&self) -> &str {
        match self {
            Self::Single(location) => location,
            Self::NeedsResolution { summary } => summary,
        }
    }
}

/// One list-page entry as produced by a site adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJobRecord {
    pub title: String,
    pub link: String,
    pub location: LocationState,
    pub job_id: Option<String>,
    pub position_type: String,
}

impl RawJobRecord {
    /// Wrap the raw location as the sole entry of a resolved list.
    pub fn into_unresolved(self) -> EnrichedJobRecord {
        let locations = vec![self.location.raw().to_string()];
        EnrichedJobRecord {
            raw: self,
            locations,
        }
    }

    pub fn into_resolved(self, locations: Vec<String>) -> EnrichedJobRecord {
        if locations.is_empty() {
            return self.into_unresolved();
        }
        EnrichedJobRecord {
            raw: self,
            locations,
        }
    }
}

/// A raw record whose location list is final. `locations` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedJobRecord {
    pub raw: RawJobRecord,
    pub locations: Vec<String>,
}

impl EnrichedJobRecord {
    pub fn title(&self) -> &str {
        &self.raw.title
    }

    pub fn link(&self) -> &str {
        &self.raw.link
    }

    pub fn with_company(self, company: impl Into<String>) -> FilteredJobRecord {
        FilteredJobRecord {
            company: company.into(),
            title: self.raw.title,
            link: self.raw.link,
            locations: self.locations,
            job_id: self.raw.job_id,
            position_type: self.raw.position_type,
        }
    }
}

/// A posting that passed filtering, tagged with the source that listed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredJobRecord {
    pub company: String,
    pub title: String,
    pub link: String,
    pub locations: Vec<String>,
    pub job_id: Option<String>,
    pub position_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(location: LocationState) -> RawJobRecord {
        RawJobRecord {
            title: "Firmware Engineer".to_string(),
            link: "https://jobs.example.com/1".to_string(),
            location,
            job_id: Some("JR-1".to_string()),
            position_type: UNKNOWN_POSITION_TYPE.to_string(),
        }
    }

    #[test]
    fn multi_location_cards_need_resolution() {
        let state = LocationState::from_listing_text(" 3 Locations ");
        assert_eq!(
            state,
            LocationState::NeedsResolution {
                summary: "3 Locations".to_string()
            }
        );
        assert!(!LocationState::from_listing_text("Austin, TX").needs_resolution());
    }

    #[test]
    fn empty_resolution_keeps_the_raw_location() {
        let enriched =
            record(LocationState::from_listing_text("2 Locations")).into_resolved(Vec::new());
        assert_eq!(enriched.locations, vec!["2 Locations".to_string()]);
    }

    #[test]
    fn company_tag_carries_every_field() {
        let filtered = record(LocationState::Single("Austin, TX".to_string()))
            .into_unresolved()
            .with_company("Acme");
        assert_eq!(filtered.company, "Acme");
        assert_eq!(filtered.locations, vec!["Austin, TX".to_string()]);
        assert_eq!(filtered.job_id.as_deref(), Some("JR-1"));
    }
}
