//! Store configuration.

use std::time::Duration;

use crate::error::{StoreError, StoreResult};

/// Default table holding job records.
pub const DEFAULT_TABLE: &str = "processing_jobs";

/// Which backend holds job records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local map
    Memory,
    /// PostgREST endpoint (e.g. Supabase)
    Postgrest { url: String, api_key: String },
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Table name for job records
    pub table: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            table: DEFAULT_TABLE.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// PostgREST configuration for the given endpoint.
    pub fn postgrest(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Postgrest {
                url: url.into().trim_end_matches('/').to_string(),
                api_key: api_key.into(),
            },
            ..Default::default()
        }
    }

    /// Create config from environment variables.
    ///
    /// Uses PostgREST when `SUPABASE_URL` is set, otherwise the in-memory store.
    pub fn from_env() -> StoreResult<Self> {
        let mut config = match std::env::var("SUPABASE_URL").ok().filter(|s| !s.is_empty()) {
            Some(url) => {
                let api_key = std::env::var("SUPABASE_KEY")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| StoreError::config("SUPABASE_KEY must be set when SUPABASE_URL is"))?;
                Self::postgrest(url, api_key)
            }
            None => Self::default(),
        };

        if let Ok(table) = std::env::var("STORE_TABLE") {
            if !table.is_empty() {
                config.table = table;
            }
        }

        if let Some(secs) = std::env::var("STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_memory() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.table, "processing_jobs");
    }

    #[test]
    fn test_postgrest_trims_trailing_slash() {
        let config = StoreConfig::postgrest("https://db.example.com/", "key");
        assert_eq!(
            config.backend,
            StoreBackend::Postgrest {
                url: "https://db.example.com".into(),
                api_key: "key".into()
            }
        );
    }
}
