use crate::error::Result;
use crate::types::{
    BatteryState, ListeningModeRef, PlaybackContentMetadata, PlaybackError, PlaybackProgress,
    RenderingState, Source, SpeakerGroupOverview, VolumeState,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame sent by the device on its notification WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "eventData", default)]
    pub event_data: Value,
}

/// Event type names used on the wire
pub mod event_type {
    pub const PLAYBACK_METADATA: &str = "WebSocketEventPlaybackMetadata";
    pub const PLAYBACK_ERROR: &str = "WebSocketEventPlaybackError";
    pub const PLAYBACK_PROGRESS: &str = "WebSocketEventPlaybackProgress";
    pub const PLAYBACK_STATE: &str = "WebSocketEventPlaybackState";
    pub const SOURCE_CHANGE: &str = "WebSocketEventSourceChange";
    pub const VOLUME: &str = "WebSocketEventVolume";
    pub const REMOTE_MENU_CHANGED: &str = "WebSocketEventRemoteMenuChanged";
    pub const CONFIGURATION: &str = "WebSocketEventConfiguration";
    pub const BLUETOOTH_DEVICES: &str = "WebSocketEventBluetoothDevices";
    pub const BEOLINK_PEERS: &str = "WebSocketEventBeolinkPeers";
    pub const BEOLINK_LISTENERS: &str = "WebSocketEventBeolinkListeners";
    pub const BEOLINK_AVAILABLE_LISTENERS: &str = "WebSocketEventBeolinkAvailableListeners";
    pub const ACTIVE_LISTENING_MODE: &str = "WebSocketEventActiveListeningMode";
    pub const ACTIVE_SPEAKER_GROUP: &str = "WebSocketEventActiveSpeakerGroup";
    pub const BATTERY: &str = "WebSocketEventBattery";
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigurationData {
    #[serde(alias = "friendlyName")]
    name: String,
}

/// Push notification from a device, one variant per channel
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PlaybackMetadata(PlaybackContentMetadata),
    PlaybackError(PlaybackError),
    PlaybackProgress(PlaybackProgress),
    PlaybackState(RenderingState),
    SourceChange(Source),
    Volume(VolumeState),
    RemoteMenuChanged,
    /// The friendly name of the device changed
    Configuration { name: String },
    BluetoothDevices,
    /// Peers or listeners changed
    Beolink,
    ActiveListeningMode(ListeningModeRef),
    ActiveSpeakerGroup(SpeakerGroupOverview),
    Battery(BatteryState),
    /// Notification connection came up (`true`) or went down (`false`)
    ConnectionState(bool),
}

impl Notification {
    /// Decode a text frame
    ///
    /// Returns `Ok(None)` for event types the adapter does not consume.
    pub fn decode(text: &str) -> Result<Option<Self>> {
        let event: WireEvent = serde_json::from_str(text)?;
        Self::from_wire(event)
    }

    pub fn from_wire(event: WireEvent) -> Result<Option<Self>> {
        use event_type::*;

        let data = event.event_data;
        let notification = match event.event_type.as_str() {
            PLAYBACK_METADATA => Notification::PlaybackMetadata(serde_json::from_value(data)?),
            PLAYBACK_ERROR => Notification::PlaybackError(serde_json::from_value(data)?),
            PLAYBACK_PROGRESS => Notification::PlaybackProgress(serde_json::from_value(data)?),
            PLAYBACK_STATE => Notification::PlaybackState(serde_json::from_value(data)?),
            SOURCE_CHANGE => Notification::SourceChange(serde_json::from_value(data)?),
            VOLUME => Notification::Volume(serde_json::from_value(data)?),
            REMOTE_MENU_CHANGED => Notification::RemoteMenuChanged,
            CONFIGURATION => {
                let config: ConfigurationData = serde_json::from_value(data)?;
                Notification::Configuration { name: config.name }
            }
            BLUETOOTH_DEVICES => Notification::BluetoothDevices,
            BEOLINK_PEERS | BEOLINK_LISTENERS | BEOLINK_AVAILABLE_LISTENERS => Notification::Beolink,
            ACTIVE_LISTENING_MODE => Notification::ActiveListeningMode(serde_json::from_value(data)?),
            ACTIVE_SPEAKER_GROUP => Notification::ActiveSpeakerGroup(serde_json::from_value(data)?),
            BATTERY => Notification::Battery(serde_json::from_value(data)?),
            other => {
                tracing::trace!("Ignoring notification type {}", other);
                return Ok(None);
            }
        };
        Ok(Some(notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_volume() {
        let text = r#"{"eventType": "WebSocketEventVolume", "eventData": {"level": {"level": 35}, "muted": {"muted": false}}}"#;
        let notification = Notification::decode(text).unwrap().unwrap();
        match notification {
            Notification::Volume(volume) => assert_eq!(volume.level(), Some(35)),
            other => panic!("unexpected notification {:?}", other),
        }
    }

    #[test]
    fn test_decode_configuration_and_beolink() {
        let text = r#"{"eventType": "WebSocketEventConfiguration", "eventData": {"friendlyName": "Den"}}"#;
        assert_eq!(
            Notification::decode(text).unwrap(),
            Some(Notification::Configuration {
                name: "Den".to_string()
            })
        );

        let text = r#"{"eventType": "WebSocketEventBeolinkListeners", "eventData": {}}"#;
        assert_eq!(Notification::decode(text).unwrap(), Some(Notification::Beolink));
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let text = r#"{"eventType": "WebSocketEventPowerState", "eventData": {"value": "on"}}"#;
        assert_eq!(Notification::decode(text).unwrap(), None);
    }

    #[test]
    fn test_malformed_frame_is_error() {
        assert!(Notification::decode("not json").is_err());
        let text = r#"{"eventType": "WebSocketEventActiveSpeakerGroup", "eventData": {"id": "x"}}"#;
        assert!(Notification::decode(text).is_err());
    }
}
