use std::path::PathBuf;

use nudge_core::ClientConfig;
use serde::{Deserialize, Serialize};

/// API host used when no config layer sets one
pub const DEFAULT_API_HOST: &str = "http://localhost:3000";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawNudgeConfig {
    #[serde(default)]
    pub client: RawClientSection,

    #[serde(default)]
    pub state: RawStateSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawClientSection {
    pub api_host: Option<String>,
    pub environment_id: Option<String>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStateSection {
    /// Persisted client state snapshot
    pub path: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeConfig {
    pub client: ClientConfig,
    pub state: StateSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSection {
    pub path: PathBuf,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::new(DEFAULT_API_HOST, ""),
            state: StateSection {
                path: nudge_paths::state_file(),
            },
        }
    }
}
