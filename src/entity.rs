use crate::api::DeviceApi;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Announcement that an entity has new state to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityUpdate {
    pub unique_id: String,
}

/// Device handle shared by all entities of one device
#[derive(Clone)]
pub struct EntityContext {
    api: Arc<dyn DeviceApi>,
    unique_id: String,
    updates: broadcast::Sender<EntityUpdate>,
}

impl EntityContext {
    pub fn new(
        api: Arc<dyn DeviceApi>,
        unique_id: impl Into<String>,
        updates: broadcast::Sender<EntityUpdate>,
    ) -> Self {
        Self {
            api,
            unique_id: unique_id.into(),
            updates,
        }
    }

    pub fn api(&self) -> &dyn DeviceApi {
        self.api.as_ref()
    }

    pub(crate) fn api_handle(&self) -> Arc<dyn DeviceApi> {
        self.api.clone()
    }

    /// Unique id of the device (its serial number)
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Unique id of one of the device's entities
    pub fn entity_unique_id(&self, suffix: &str) -> String {
        format!("{}-{}", self.unique_id, suffix)
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<EntityUpdate> {
        self.updates.subscribe()
    }

    pub(crate) fn write_state(&self, unique_id: &str) {
        let _ = self.updates.send(EntityUpdate {
            unique_id: unique_id.to_string(),
        });
    }
}
