//! JSON file adapter for client state

use std::path::Path;

use tokio::fs;

use super::types::ClientState;
use crate::error::StateError;

/// Load a client state written by [`save_snapshot`] or fetched from the API
pub async fn load_snapshot(path: &Path) -> Result<ClientState, StateError> {
    if !fs::try_exists(path).await? {
        return Err(StateError::NotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a client state, creating parent directories as needed
pub async fn save_snapshot(path: &Path, state: &ClientState) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content).await?;
    Ok(())
}
