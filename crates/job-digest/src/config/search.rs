use super::ConfigError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Countries whose presence next to "remote" marks a posting as remote outside the US.
pub const DEFAULT_NON_US_MARKERS: [&str; 4] = ["india", "china", "philippines", "brazil"];

/// User search preferences loaded once per run.
///
/// Both taxonomies keep document order so filter decisions are reproducible.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub key_groups: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub locations: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub email_recipients: Vec<String>,
    #[serde(default = "default_non_us_markers")]
    pub non_us_markers: Vec<String>,
    /// Replaces the built-in registry when present.
    #[serde(default)]
    pub sources: Option<Vec<SourceDefinition>>,
}

/// A named career site and the endpoint its adapter opens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceDefinition {
    pub name: String,
    pub endpoint: String,
}

impl SourceDefinition {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }
}

impl SearchConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_reader(file).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(reader)
    }
}

fn default_non_us_markers() -> Vec<String> {
    DEFAULT_NON_US_MARKERS
        .iter()
        .map(|marker| marker.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
key_groups:
  engineering: [engineer, developer]
  data: [analyst]
locations:
  texas: [austin, dallas]
  anywhere: [remote]
email_recipients:
  - me@example.com
";

    #[test]
    fn parses_taxonomies_in_document_order() {
        let config = SearchConfig::from_reader(SAMPLE.as_bytes()).expect("yaml parses");
        let groups: Vec<&str> = config.key_groups.keys().map(String::as_str).collect();
        assert_eq!(groups, vec!["engineering", "data"]);
        let regions: Vec<&str> = config.locations.keys().map(String::as_str).collect();
        assert_eq!(regions, vec!["texas", "anywhere"]);
        assert_eq!(config.email_recipients, vec!["me@example.com".to_string()]);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let config = SearchConfig::from_reader(SAMPLE.as_bytes()).expect("yaml parses");
        assert_eq!(config.non_us_markers.len(), DEFAULT_NON_US_MARKERS.len());
        assert!(config.sources.is_none());
    }

    #[test]
    fn reads_custom_source_registry() {
        let yaml = "sources:\n  - name: Acme\n    \
                    endpoint: https://acme.wd1.myworkdayjobs.com/External\n";
        let config = SearchConfig::from_reader(yaml.as_bytes()).expect("yaml parses");
        let sources = config.sources.expect("sources present");
        assert_eq!(
            sources,
            vec![SourceDefinition::new(
                "Acme",
                "https://acme.wd1.myworkdayjobs.com/External"
            )]
        );
        assert!(config.key_groups.is_empty());
    }

    #[test]
    fn from_path_reports_missing_file() {
        let error = SearchConfig::from_path("./does-not-exist.yaml").expect_err("missing file");
        assert!(matches!(error, ConfigError::Read { .. }));
    }
}
