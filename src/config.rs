//! Runtime configuration for the ingestion pipeline.
//!
//! Defaults are conservative and every knob can be overridden from the
//! environment, so the same binary works against staging and production:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `CATALOG_BASE_URL` | unset | Admin API root used by [`crate::gateway::HttpGateway`] |
//! | `CATALOG_API_TOKEN` | unset | Bearer token for the admin API |
//! | `CATALOG_CHUNK_SIZE` | 100 | Max items per flat-import unit |
//! | `CATALOG_GROUP_CONCURRENCY` | 3 | Workers draining grouped imports |
//! | `CATALOG_HTTP_TIMEOUT_SECS` | 30 | Per-call gateway timeout |
//! | `CATALOG_REGEX_SIZE_LIMIT` | 1 MiB | Compiled pattern size limit |

use std::env;
use std::time::Duration;

pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_GROUP_CONCURRENCY: usize = 3;
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub chunk_size: usize,
    pub group_concurrency: usize,
    pub http_timeout: Duration,
    pub regex_size_limit: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            group_concurrency: DEFAULT_GROUP_CONCURRENCY,
            http_timeout: Duration::from_secs(30),
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with whatever `CATALOG_*` variables are set.
    /// Unparseable values are ignored rather than rejected.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(url) = env_string("CATALOG_BASE_URL") {
            cfg.base_url = Some(url);
        }
        if let Some(token) = env_string("CATALOG_API_TOKEN") {
            cfg.api_token = Some(token);
        }
        if let Some(n) = env_parse::<usize>("CATALOG_CHUNK_SIZE") {
            cfg = cfg.with_chunk_size(n);
        }
        if let Some(n) = env_parse::<usize>("CATALOG_GROUP_CONCURRENCY") {
            cfg = cfg.with_group_concurrency(n);
        }
        if let Some(secs) = env_parse::<u64>("CATALOG_HTTP_TIMEOUT_SECS") {
            cfg.http_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(n) = env_parse::<usize>("CATALOG_REGEX_SIZE_LIMIT") {
            cfg.regex_size_limit = n.max(1024);
        }
        cfg
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n.max(1);
        self
    }

    pub fn with_group_concurrency(mut self, n: usize) -> Self {
        self.group_concurrency = n.max(1);
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_regex_size_limit(mut self, bytes: usize) -> Self {
        self.regex_size_limit = bytes;
        self
    }
}
