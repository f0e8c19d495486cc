//! File-based storage implementation

use async_trait::async_trait;
use std::path::PathBuf;

use crate::application::errors::StorageError;
use crate::domain::entities::{Channels, HISTORY_LIMIT};
use crate::domain::traits::Store;

/// JSON file-based store, one `<identity>_<platform>.json` file per identity
pub struct JsonStore {
    base_path: PathBuf,
    platform: String,
}

impl JsonStore {
    pub fn new(base_path: impl Into<PathBuf>, platform: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            platform: platform.into(),
        }
    }

    /// Path of the state file for an identity
    pub fn path_for(&self, identity: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.json", identity, self.platform))
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn load(&self, identity: &str) -> Channels {
        let path = self.path_for(identity);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("No state at {}: {}", path.display(), e);
                return Channels::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(channels) => channels,
            Err(e) => {
                tracing::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                Channels::new()
            }
        }
    }

    async fn save(&self, identity: &str, channels: &mut Channels) -> Result<(), StorageError> {
        for channel in channels.values_mut() {
            channel.trim_history(HISTORY_LIMIT);
        }

        tokio::fs::create_dir_all(&self.base_path).await?;

        let json = serde_json::to_vec(&*channels)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        // Replace the whole file in one rename so readers never see a partial write
        let path = self.path_for(identity);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!("Saved {} channels to {}", channels.len(), path.display());
        Ok(())
    }
}
