use crate::types::Jid;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Lookup between platform entity ids and device identities
///
/// Media players are registered under the serial number of their JID, so a JID
/// resolves to an entity id and an entity id back to the JID it was configured
/// with.
pub trait EntityRegistry: Send + Sync {
    /// Entity id of the media player whose unique id is `unique_id`
    fn media_player_entity_id(&self, unique_id: &str) -> Option<String>;

    /// Beolink JID configured for the device owning `entity_id`
    fn beolink_jid(&self, entity_id: &str) -> Option<Jid>;

    /// Entity id of the media player for a JID
    fn entity_id_for_jid(&self, jid: &Jid) -> Option<String> {
        self.media_player_entity_id(jid.serial())
    }
}

/// In-memory registry for embedding the adapter without a platform registry
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entries: RwLock<HashMap<String, Jid>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the media player entity of a device
    pub fn register(&self, entity_id: impl Into<String>, jid: Jid) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity_id.into(), jid);
    }

    pub fn unregister(&self, entity_id: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(entity_id);
    }
}

impl EntityRegistry for MemoryRegistry {
    fn media_player_entity_id(&self, unique_id: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(_, jid)| jid.serial() == unique_id)
            .map(|(entity_id, _)| entity_id.clone())
    }

    fn beolink_jid(&self, entity_id: &str) -> Option<Jid> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_directions() {
        let registry = MemoryRegistry::new();
        let jid = Jid::parse("1111.2222222.33333333@products.bang-olufsen.com").unwrap();
        registry.register("media_player.living_room", jid.clone());

        assert_eq!(
            registry.entity_id_for_jid(&jid).as_deref(),
            Some("media_player.living_room")
        );
        assert_eq!(registry.beolink_jid("media_player.living_room"), Some(jid));
        assert!(registry.beolink_jid("media_player.kitchen").is_none());

        registry.unregister("media_player.living_room");
        assert!(registry.media_player_entity_id("33333333").is_none());
    }
}
