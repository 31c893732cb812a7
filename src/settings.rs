use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Report-engine knobs: traversal bounds for malformed referral graphs and the
/// contribution-list page size.
#[derive(Clone, Debug, Deserialize)]
pub struct Report {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for Report {
    fn default() -> Self {
        Report {
            max_depth: default_max_depth(),
            max_nodes: default_max_nodes(),
            page_size: default_page_size(),
        }
    }
}

fn default_max_depth() -> u32 {
    32
}

fn default_max_nodes() -> usize {
    10_000
}

fn default_page_size() -> u32 {
    crate::downline::paginate::DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub postgres: Postgres,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub report: Report,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config.toml"))
            .build()?;

        config.try_deserialize()
    }
}
