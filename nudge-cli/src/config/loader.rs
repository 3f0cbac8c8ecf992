use super::types::{
    DEFAULT_API_HOST, NudgeConfig, RawClientSection, RawNudgeConfig, RawStateSection, StateSection,
};
use anyhow::{Context, Result};
use nudge_core::ClientConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<NudgeConfig> {
        Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])
    }

    /// Merge the given files in order; later files win, missing files are skipped
    pub fn load_layers(paths: &[PathBuf]) -> Result<NudgeConfig> {
        let mut raw = RawNudgeConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_layer(path)? {
                debug!(path = %path.display(), "Loaded config layer");
                raw = Self::merge_raw(raw, layer);
            }
        }
        Ok(Self::finalize(raw))
    }

    /// User config path (`$XDG_CONFIG_HOME/nudge/config.toml`)
    pub fn user_config_path() -> PathBuf {
        nudge_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with NUDGE_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("NUDGE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".nudge/config.toml")
        }
    }

    fn read_layer(path: &Path) -> Result<Option<RawNudgeConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let layer = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(layer))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawNudgeConfig, overlay: RawNudgeConfig) -> RawNudgeConfig {
        RawNudgeConfig {
            client: RawClientSection {
                api_host: overlay.client.api_host.or(base.client.api_host),
                environment_id: overlay.client.environment_id.or(base.client.environment_id),
                retry_attempts: overlay.client.retry_attempts.or(base.client.retry_attempts),
                retry_delay_ms: overlay.client.retry_delay_ms.or(base.client.retry_delay_ms),
            },
            state: RawStateSection {
                path: overlay.state.path.or(base.state.path),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawNudgeConfig) -> NudgeConfig {
        let mut client = ClientConfig::new(
            raw.client
                .api_host
                .unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            raw.client.environment_id.unwrap_or_default(),
        );
        if let Some(attempts) = raw.client.retry_attempts {
            client.retry_attempts = attempts;
        }
        if let Some(delay) = raw.client.retry_delay_ms {
            client.retry_delay_ms = delay;
        }

        NudgeConfig {
            client,
            state: StateSection {
                path: raw.state.path.unwrap_or_else(nudge_paths::state_file),
            },
        }
    }
}
