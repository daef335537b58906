use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::domain::EnrichedJobRecord;
use crate::config::SearchConfig;

const REMOTE_KEYWORD: &str = "remote";
const NON_US_GROUP: &str = "non_us_markers";

#[derive(Debug, thiserror::Error)]
#[error("keyword '{keyword}' in group '{group}' cannot be compiled")]
pub struct FilterError {
    pub group: String,
    pub keyword: String,
    #[source]
    pub source: regex::Error,
}

#[derive(Debug, Clone)]
struct KeywordRule {
    group: String,
    keyword: String,
    pattern: Regex,
}

/// Named keyword groups compiled to whole-word, case-insensitive matchers.
///
/// Rules are evaluated in group insertion order, then keyword order.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    rules: Vec<KeywordRule>,
}

impl Taxonomy {
    pub fn from_groups(groups: &IndexMap<String, Vec<String>>) -> Result<Self, FilterError> {
        let mut rules = Vec::new();
        for (group, keywords) in groups {
            for keyword in keywords {
                let keyword = keyword.trim().to_lowercase();
                if keyword.is_empty() {
                    continue;
                }
                let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(&keyword)))
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| FilterError {
                        group: group.clone(),
                        keyword: keyword.clone(),
                        source,
                    })?;
                rules.push(KeywordRule {
                    group: group.clone(),
                    keyword,
                    pattern,
                });
            }
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn first_match(&self, text: &str) -> Option<&KeywordRule> {
        self.rules.iter().find(|rule| rule.pattern.is_match(text))
    }
}

/// Which rule admitted a posting's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationMatch {
    pub region: String,
    pub keyword: String,
    pub location: String,
}

/// Decides whether a posting is relevant: location first, then title.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    locations: Taxonomy,
    keywords: Taxonomy,
    non_us_markers: Taxonomy,
}

impl FilterEngine {
    /// Non-US markers match as whole words, like every other keyword.
    pub fn new(
        locations: Taxonomy,
        keywords: Taxonomy,
        non_us_markers: &[String],
    ) -> Result<Self, FilterError> {
        let markers = IndexMap::from([(NON_US_GROUP.to_string(), non_us_markers.to_vec())]);
        Ok(Self {
            locations,
            keywords,
            non_us_markers: Taxonomy::from_groups(&markers)?,
        })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self, FilterError> {
        let engine = Self::new(
            Taxonomy::from_groups(&config.locations)?,
            Taxonomy::from_groups(&config.key_groups)?,
            &config.non_us_markers,
        )?;
        if engine.locations.is_empty() || engine.keywords.is_empty() {
            warn!("location or keyword taxonomy is empty; every posting will be rejected");
        }
        Ok(engine)
    }

    pub fn accepts(&self, record: &EnrichedJobRecord) -> bool {
        let Some(matched) = self.location_match(&record.locations) else {
            debug!(title = record.title(), "no location match");
            return false;
        };
        debug!(
            title = record.title(),
            region = %matched.region,
            keyword = %matched.keyword,
            location = %matched.location,
            "found location match"
        );

        match self.title_match(record.title()) {
            Some(keyword) => {
                debug!(title = record.title(), keyword, "found keyword match");
                true
            }
            None => false,
        }
    }

    pub fn location_match(&self, locations: &[String]) -> Option<LocationMatch> {
        for rule in &self.locations.rules {
            for location in locations {
                if rule.keyword == REMOTE_KEYWORD && self.is_non_us_remote(location) {
                    debug!(location = %location, "skipping remote location outside the US");
                    continue;
                }
                if rule.pattern.is_match(location) {
                    return Some(LocationMatch {
                        region: rule.group.clone(),
                        keyword: rule.keyword.clone(),
                        location: location.clone(),
                    });
                }
            }
        }
        None
    }

    pub fn title_match(&self, title: &str) -> Option<&str> {
        self.keywords
            .first_match(title)
            .map(|rule| rule.keyword.as_str())
    }

    fn is_non_us_remote(&self, location: &str) -> bool {
        location.to_lowercase().contains(REMOTE_KEYWORD)
            && self.non_us_markers.first_match(location).is_some()
    }
}
