//! Full editor snapshots
//!
//! A backup file carries the editor collections verbatim, ids included, so
//! restoring one reproduces the exact store contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{EditorConfig, Model, Provider};

/// Snapshot format version
pub const SNAPSHOT_VERSION: &str = "1.0.0";

fn default_version() -> String {
    SNAPSHOT_VERSION.to_string()
}

/// Exported editor state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSnapshot {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, alias = "timestamp")]
    pub exported_at: Option<DateTime<Utc>>,
    pub providers: Vec<Provider>,
    pub models: Vec<Model>,
}

impl EditorSnapshot {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            version: default_version(),
            exported_at: Some(Utc::now()),
            providers: config.providers,
            models: config.models,
        }
    }

    /// Parse a snapshot, reporting a missing section as a validation error
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| {
            Error::validation(vec![format!("Invalid configuration file format: {}", e)])
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Suggested file name, dated by export time
    pub fn file_name(&self) -> String {
        let date = self.exported_at.unwrap_or_else(Utc::now).format("%Y-%m-%d");
        format!("modelhub-config-{}.json", date)
    }

    pub fn into_editor_config(self) -> EditorConfig {
        EditorConfig {
            providers: self.providers,
            models: self.models,
        }
    }
}
