mod search;

pub use search::{SearchConfig, SourceDefinition, DEFAULT_NON_US_MARKERS};

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Process-level settings for a digest run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub paths: PathConfig,
    pub crawl: CrawlConfig,
    pub telemetry: TelemetryConfig,
    /// Present only when both `EMAIL_ADDR` and `EMAIL_PASSWORD` are set.
    pub smtp: Option<SmtpConfig>,
}

impl RunnerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config_path =
            env::var("DIGEST_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let history_path =
            env::var("DIGEST_HISTORY_PATH").unwrap_or_else(|_| "sent_jobs.csv".to_string());
        let outbox_dir = env::var("DIGEST_OUTBOX_DIR").unwrap_or_else(|_| "outbox".to_string());

        let workers = env::var("DIGEST_WORKERS")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<usize>()
            .ok()
            .filter(|workers| *workers > 0)
            .ok_or(ConfigError::InvalidWorkers)?;

        let wait_timeout_secs = env::var("DIGEST_WAIT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let max_stalled_pages = env::var("DIGEST_MAX_STALLED_PAGES")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<usize>()
            .ok()
            .filter(|pages| *pages > 0)
            .ok_or(ConfigError::InvalidPageLimit("DIGEST_MAX_STALLED_PAGES"))?;

        let page_slack = env::var("DIGEST_PAGE_SLACK")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidPageLimit("DIGEST_PAGE_SLACK"))?;

        let log_level = env::var("DIGEST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let smtp = SmtpConfig::from_env()?;

        Ok(Self {
            paths: PathConfig {
                config_path: PathBuf::from(config_path),
                history_path: PathBuf::from(history_path),
                outbox_dir: PathBuf::from(outbox_dir),
            },
            crawl: CrawlConfig {
                workers,
                wait_timeout: Duration::from_secs(wait_timeout_secs),
                max_stalled_pages,
                page_slack,
            },
            telemetry: TelemetryConfig { log_level },
            smtp,
        })
    }
}

/// Files the run reads from and writes to.
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub config_path: PathBuf,
    pub history_path: PathBuf,
    pub outbox_dir: PathBuf,
}

/// Worker pool size, the bound on every adapter wait, and pagination limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlConfig {
    pub workers: usize,
    pub wait_timeout: Duration,
    pub max_stalled_pages: usize,
    pub page_slack: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            wait_timeout: Duration::from_secs(10),
            max_stalled_pages: 3,
            page_slack: 2,
        }
    }
}

/// Mail relay credentials; the username doubles as the sender address.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Ok(username), Ok(password)) = (env::var("EMAIL_ADDR"), env::var("EMAIL_PASSWORD"))
        else {
            return Ok(None);
        };
        if username.trim().is_empty() || password.is_empty() {
            return Ok(None);
        }

        let host = env::var("DIGEST_SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        let port = env::var("DIGEST_SMTP_PORT")
            .unwrap_or_else(|_| "465".to_string())
            .parse::<u16>()
            .ok()
            .filter(|port| *port > 0)
            .ok_or(ConfigError::InvalidSmtpPort)?;

        Ok(Some(Self {
            host,
            port,
            username: username.trim().to_string(),
            password,
        }))
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidWorkers,
    InvalidTimeout,
    InvalidPageLimit(&'static str),
    InvalidSmtpPort,
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidWorkers => {
                write!(f, "DIGEST_WORKERS must be a positive integer")
            }
            ConfigError::InvalidTimeout => write!(
                f,
                "DIGEST_WAIT_TIMEOUT_SECS must be a positive number of seconds"
            ),
            ConfigError::InvalidPageLimit(var) => {
                write!(f, "{var} must be a non-negative integer (at least 1 for stalls)")
            }
            ConfigError::InvalidSmtpPort => {
                write!(f, "DIGEST_SMTP_PORT must be a port number between 1 and 65535")
            }
            ConfigError::Read { path, .. } => {
                write!(f, "unable to read search config {}", path.display())
            }
            ConfigError::Parse { path, .. } => {
                write!(f, "search config {} is not valid YAML", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidWorkers
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidPageLimit(_)
            | ConfigError::InvalidSmtpPort => None,
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}
