//! Runtime settings
//!
//! Compiled defaults, optionally overridden by a TOML file. The CLI layers
//! flags and environment variables on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use credence_core::{ScoreScale, DEFAULT_TIMEOUT_SECS};

use crate::forest::ForestConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub weights_path: PathBuf,
    /// Per external call and per orchestrated sub-task
    pub request_timeout_secs: u64,

    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,

    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub embedding_model: String,
    pub sentiment_model: String,

    /// Primary fact-check source; disabled when unset
    pub factcheck_api_key: Option<String>,
    /// Advisory ledger endpoint; disabled when unset
    pub ledger_url: Option<String>,
    pub reference_claims_path: Option<PathBuf>,

    pub score_scale: ScoreScale,
    /// Batch-mode periodic retraining, 0 = only once at the end
    pub retrain_interval_secs: u64,
    pub forest: ForestConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("credence_history.db"),
            weights_path: PathBuf::from("credence_weights.json"),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            qdrant_url: None,
            qdrant_api_key: None,
            qdrant_collection: "reference_claims".to_string(),
            openai_api_key: None,
            openai_base_url: None,
            embedding_model: "text-embedding-3-small".to_string(),
            sentiment_model: "gpt-4o-mini".to_string(),
            factcheck_api_key: None,
            ledger_url: None,
            reference_claims_path: None,
            score_scale: ScoreScale::Raw,
            retrain_interval_secs: 0,
            forest: ForestConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read a TOML settings file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("Cannot read config {}: {}", path.as_ref().display(), e)
        })?;
        Ok(Self::from_toml_str(&content)?)
    }
}

/// Treat blank strings as unset
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
