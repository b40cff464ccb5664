use std::time::Duration;

use serde::Deserialize;

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Connection settings. The dialect is inferred from the URL unless given.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub url: String,
    #[serde(default, alias = "driver")]
    pub dialect: Option<Dialect>,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub min_connections: Option<u32>,
    #[serde(default)]
    pub acquire_timeout_secs: Option<u64>,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dialect: None,
            max_connections: None,
            min_connections: None,
            acquire_timeout_secs: None,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Resolve the dialect, failing on an empty URL or an unknown scheme.
    pub fn resolve_dialect(&self) -> Result<Dialect> {
        if self.url.trim().is_empty() {
            return Err(Error::Configuration("connection url is required".to_owned()));
        }
        match self.dialect {
            Some(dialect) => Ok(dialect),
            None => Dialect::from_url(&self.url),
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_secs.map(Duration::from_secs)
    }
}

/// Migration ledger settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MigrationConfig {
    pub table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            table: "migrations".to_owned(),
        }
    }
}
