use async_trait::async_trait;

use crate::application::errors::StorageError;
use crate::domain::entities::Channels;

/// Store trait - durable channel state, partitioned per identity
#[async_trait]
pub trait Store: Send + Sync {
    /// Load all channels for an identity. Missing or unreadable state is an empty map.
    async fn load(&self, identity: &str) -> Channels;

    /// Trim every channel's history and overwrite the identity's state with `channels`
    async fn save(&self, identity: &str, channels: &mut Channels) -> Result<(), StorageError>;
}
