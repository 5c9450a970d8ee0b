//! Host-provided console configuration.
//!
//! # Responsibility
//! - Carry page size, notification capacity and export limits into the
//!   console at construction time.
//! - Reject configurations the engine cannot honor before a console exists.
//!
//! # Invariants
//! - A validated config has non-zero sizes and a lowercase export entity.

use crate::export::DEFAULT_EXPORT_ROW_CAP;
use crate::notify::DEFAULT_NOTIFICATION_CAPACITY;
use crate::query::DEFAULT_PAGE_SIZE;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("entity regex must compile"));

/// Tunables for one console instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    pub page_size: u32,
    pub notification_capacity: usize,
    pub export_row_cap: usize,
    /// Entity prefix of export filenames.
    pub export_entity: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            export_row_cap: DEFAULT_EXPORT_ROW_CAP,
            export_entity: "leads".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Parses a JSON document; missing keys take their defaults.
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed JSON or unknown keys.
    /// - Any `validate()` error.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroValue("page_size"));
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::ZeroValue("notification_capacity"));
        }
        if self.export_row_cap == 0 {
            return Err(ConfigError::ZeroValue("export_row_cap"));
        }
        if !ENTITY_RE.is_match(&self.export_entity) {
            return Err(ConfigError::InvalidEntity(self.export_entity.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    ZeroValue(&'static str),
    InvalidEntity(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid console config: {message}"),
            Self::ZeroValue(field) => write!(f, "`{field}` must be greater than zero"),
            Self::InvalidEntity(entity) => write!(
                f,
                "export entity `{entity}` must match [a-z0-9_-]+"
            ),
        }
    }
}

impl Error for ConfigError {}
