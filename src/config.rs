//! Tracer configuration
//!
//! Loaded from TOML. Every field has a default so a file only needs the parts
//! that differ, typically the hook address map and the lookup tables:
//!
//! ```toml
//! section_count = 8
//! retry_policy = "drop"
//! wire_format = "json"
//!
//! [tables]
//! elevator_frames = [0, 30, 60, 90, 120, 150, 180, 210, 240, 270]
//!
//! [[tables.narration]]
//! identifier = 144
//! frames = 50
//!
//! [[hooks]]
//! address = 0x08010000
//! kind = "session_reset"
//!
//! [[hooks]]
//! address = 0x08010200
//! kind = "division_op"
//! signed = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::WireFormat;
use crate::hooks::{HookBinding, HookRegistry};
use crate::modulo::RetryPolicy;
use crate::section::DEFAULT_SECTION_COUNT;
use crate::tables::LookupTables;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("hook address {0:#x} is bound more than once")]
    DuplicateHook(u32),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Section indices accepted per path; anything at or above is unknown
    pub section_count: u8,

    /// Handling of division tallies from retried attempts
    pub retry_policy: RetryPolicy,

    /// Encoding used for reports placed on the outbox
    pub wire_format: WireFormat,

    /// Maximum pending reports on the outbox (unbounded when absent)
    pub outbox_capacity: Option<usize>,

    pub tables: LookupTables,

    pub hooks: Vec<HookBinding>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            section_count: DEFAULT_SECTION_COUNT,
            retry_policy: RetryPolicy::Drop,
            wire_format: WireFormat::Json,
            outbox_capacity: None,
            tables: LookupTables::default(),
            hooks: Vec::new(),
        }
    }
}

impl TraceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.section_count == 0 {
            return Err("section_count must be at least 1".to_string());
        }

        if self.outbox_capacity == Some(0) {
            return Err("outbox_capacity must be at least 1 when set".to_string());
        }

        if let Some(identifier) = self.tables.duplicate_narration() {
            return Err(format!(
                "narration table lists identifier {} more than once",
                identifier
            ));
        }

        Ok(())
    }

    /// Validate and build the hook registry
    pub fn registry(&self) -> Result<HookRegistry, ConfigError> {
        self.validate().map_err(ConfigError::Invalid)?;
        HookRegistry::from_bindings(&self.hooks).map_err(ConfigError::DuplicateHook)
    }
}
