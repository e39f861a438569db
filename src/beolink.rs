//! Beolink multi-room coordination
//!
//! Devices in one process reach each other through a [`BeolinkBus`]: every
//! media player registers under its own JID and receives [`BeolinkMessage`]s
//! addressed to it. Delivery is one-way; a sender never learns whether the
//! recipient acted on a message.

use crate::command::PlayerCommand;
use crate::registry::EntityRegistry;
use crate::types::{BeolinkLeader, BeolinkListener, BeolinkPeer, Jid};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Message relayed between members of a Beolink group
#[derive(Debug, Clone, PartialEq)]
pub enum BeolinkMessage {
    /// Run on the leader; a listener receiving it forwards it again
    LeaderCommand(PlayerCommand),
    /// Run locally, sent by a leader to its listeners
    ListenerCommand(PlayerCommand),
    /// Group-wide absolute volume (0.0-1.0)
    Volume(f64),
    /// Group-wide volume offset
    RelativeVolume(f64),
}

/// A message with the JID of the device it is addressed to
#[derive(Debug, Clone, PartialEq)]
pub struct BeolinkEnvelope {
    pub recipient: Jid,
    pub message: BeolinkMessage,
}

impl BeolinkEnvelope {
    pub fn new(recipient: Jid, message: BeolinkMessage) -> Self {
        Self { recipient, message }
    }
}

/// In-process channel between Beolink group members
#[derive(Clone, Default)]
pub struct BeolinkBus {
    routes: Arc<Mutex<HashMap<Jid, mpsc::UnboundedSender<BeolinkMessage>>>>,
}

impl BeolinkBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device and return the inbox for messages addressed to it
    ///
    /// Registering a JID again replaces the previous route.
    pub fn register(&self, jid: Jid) -> BeolinkInbox {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if routes.insert(jid.clone(), tx).is_some() {
            tracing::debug!("Replaced Beolink route for {}", jid);
        }
        BeolinkInbox { jid, rx }
    }

    pub fn unregister(&self, jid: &Jid) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(jid);
    }

    /// Deliver an envelope to its recipient
    ///
    /// Returns `false` when no live device is registered under the recipient JID.
    pub fn send(&self, envelope: BeolinkEnvelope) -> bool {
        let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        match routes.get(&envelope.recipient) {
            Some(tx) => {
                tracing::debug!("Beolink {:?} -> {}", envelope.message, envelope.recipient);
                tx.send(envelope.message).is_ok()
            }
            None => {
                tracing::debug!(
                    "No Beolink route for {}, dropping {:?}",
                    envelope.recipient,
                    envelope.message
                );
                false
            }
        }
    }

    pub fn is_registered(&self, jid: &Jid) -> bool {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(jid)
    }
}

/// Receiving end of a device's Beolink route
pub struct BeolinkInbox {
    jid: Jid,
    rx: mpsc::UnboundedReceiver<BeolinkMessage>,
}

impl BeolinkInbox {
    pub fn jid(&self) -> &Jid {
        &self.jid
    }

    /// Wait for the next message; `None` once the route is gone
    pub async fn recv(&mut self) -> Option<BeolinkMessage> {
        self.rx.recv().await
    }
}

/// Role of a device in a Beolink group
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GroupRole {
    #[default]
    Solo,
    Listener { leader: BeolinkLeader },
    Leader { listeners: Vec<BeolinkListener> },
}

impl GroupRole {
    /// Derive the role from the remote leader and the current listeners
    ///
    /// A remote leader always wins; listeners only make a leader when there is
    /// no remote leader.
    pub fn derive(remote_leader: Option<BeolinkLeader>, listeners: Vec<BeolinkListener>) -> Self {
        match remote_leader {
            Some(leader) => GroupRole::Listener { leader },
            None if !listeners.is_empty() => GroupRole::Leader { listeners },
            None => GroupRole::Solo,
        }
    }

    pub fn leader(&self) -> Option<&BeolinkLeader> {
        match self {
            GroupRole::Listener { leader } => Some(leader),
            _ => None,
        }
    }

    pub fn listeners(&self) -> &[BeolinkListener] {
        match self {
            GroupRole::Leader { listeners } => listeners,
            _ => &[],
        }
    }

    /// Entity ids of the group, leader first
    ///
    /// Members the registry cannot resolve are left out.
    pub fn group_members(&self, own_jid: &Jid, registry: &dyn EntityRegistry) -> Vec<String> {
        let jids: Vec<&Jid> = match self {
            GroupRole::Solo => Vec::new(),
            GroupRole::Listener { leader } => vec![&leader.jid, own_jid],
            GroupRole::Leader { listeners } => std::iter::once(own_jid)
                .chain(listeners.iter().map(|l| &l.jid))
                .collect(),
        };

        jids.into_iter()
            .filter_map(|jid| registry.entity_id_for_jid(jid))
            .collect()
    }
}

/// The `beolink` extra state attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BeolinkAttribute {
    #[serde(rename = "self")]
    pub own: BTreeMap<String, Jid>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub peers: BTreeMap<String, Jid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<BTreeMap<String, Jid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listeners: Option<BTreeMap<String, Jid>>,
}

impl BeolinkAttribute {
    pub fn build(friendly_name: &str, own_jid: &Jid, peers: &[BeolinkPeer], role: &GroupRole) -> Self {
        let own = BTreeMap::from([(friendly_name.to_string(), own_jid.clone())]);
        let peer_names: BTreeMap<String, Jid> = peers
            .iter()
            .map(|p| (p.friendly_name.clone(), p.jid.clone()))
            .collect();

        let (leader, listeners) = match role {
            GroupRole::Solo => (None, None),
            GroupRole::Listener { leader } => (
                Some(BTreeMap::from([(leader.friendly_name.clone(), leader.jid.clone())])),
                None,
            ),
            GroupRole::Leader { listeners } => {
                // Listeners are named after the matching peer
                let named = listeners
                    .iter()
                    .filter_map(|listener| {
                        peers
                            .iter()
                            .find(|p| p.jid == listener.jid)
                            .map(|p| (p.friendly_name.clone(), listener.jid.clone()))
                    })
                    .collect();
                (None, Some(named))
            }
        };

        Self {
            own,
            peers: peer_names,
            leader,
            listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;

    fn jid(serial: &str) -> Jid {
        Jid::parse(format!("1111.2222222.{}@products.bang-olufsen.com", serial)).unwrap()
    }

    fn registry() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry.register("media_player.self", jid("00000001"));
        registry.register("media_player.kitchen", jid("00000002"));
        registry.register("media_player.bedroom", jid("00000003"));
        registry
    }

    #[test]
    fn test_listener_members_are_leader_and_self() {
        let role = GroupRole::derive(
            Some(BeolinkLeader {
                friendly_name: "Kitchen".to_string(),
                jid: jid("00000002"),
            }),
            vec![BeolinkListener { jid: jid("00000003") }],
        );

        assert!(matches!(role, GroupRole::Listener { .. }));
        assert_eq!(
            role.group_members(&jid("00000001"), &registry()),
            vec!["media_player.kitchen", "media_player.self"]
        );
    }

    #[test]
    fn test_solo_has_no_members() {
        let role = GroupRole::derive(None, vec![]);
        assert_eq!(role, GroupRole::Solo);
        assert!(role.group_members(&jid("00000001"), &registry()).is_empty());
    }

    #[test]
    fn test_leader_members_skip_unresolvable() {
        let role = GroupRole::derive(
            None,
            vec![
                BeolinkListener { jid: jid("00000002") },
                BeolinkListener { jid: jid("99999999") },
                BeolinkListener { jid: jid("00000003") },
            ],
        );

        assert_eq!(
            role.group_members(&jid("00000001"), &registry()),
            vec!["media_player.self", "media_player.kitchen", "media_player.bedroom"]
        );
    }

    #[test]
    fn test_attribute_names_listeners_from_peers() {
        let peers = vec![
            BeolinkPeer {
                friendly_name: "Kitchen".to_string(),
                jid: jid("00000002"),
            },
            BeolinkPeer {
                friendly_name: "Bedroom".to_string(),
                jid: jid("00000003"),
            },
        ];
        let role = GroupRole::Leader {
            listeners: vec![BeolinkListener { jid: jid("00000003") }],
        };

        let attribute = BeolinkAttribute::build("Living Room", &jid("00000001"), &peers, &role);
        let value = serde_json::to_value(&attribute).unwrap();

        assert_eq!(value["self"]["Living Room"], jid("00000001").as_str());
        assert_eq!(value["peers"].as_object().unwrap().len(), 2);
        assert_eq!(value["listeners"]["Bedroom"], jid("00000003").as_str());
        assert!(value.get("leader").is_none());
    }

    #[tokio::test]
    async fn test_bus_routes_by_recipient() {
        let bus = BeolinkBus::new();
        let mut kitchen = bus.register(jid("00000002"));

        assert!(bus.send(BeolinkEnvelope::new(jid("00000002"), BeolinkMessage::Volume(0.3))));
        assert!(!bus.send(BeolinkEnvelope::new(jid("00000003"), BeolinkMessage::Volume(0.3))));
        assert_eq!(kitchen.recv().await, Some(BeolinkMessage::Volume(0.3)));

        bus.unregister(kitchen.jid());
        assert!(!bus.is_registered(&jid("00000002")));
    }
}
