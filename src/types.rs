use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of every Beolink JID
pub const JID_LENGTH: usize = 47;

const JID_DOMAIN: &str = "@products.bang-olufsen.com";

/// Beolink JID, the identifier addressing a device inside a Beolink group
///
/// The format is `TTTT.IIIIIII.SSSSSSSS@products.bang-olufsen.com`, where the
/// third segment is the serial number of the product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jid(String);

impl Jid {
    /// Parse and validate a JID
    pub fn parse(jid: impl Into<String>) -> Result<Self> {
        let jid = jid.into();
        if is_valid_jid(&jid) {
            Ok(Self(jid))
        } else {
            Err(Error::InvalidJid(jid))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Serial number segment, used as the unique id of the device's entities
    pub fn serial(&self) -> &str {
        self.0
            .split('.')
            .nth(2)
            .and_then(|s| s.split('@').next())
            .unwrap_or_default()
    }
}

fn is_valid_jid(jid: &str) -> bool {
    if jid.len() != JID_LENGTH {
        return false;
    }
    let Some(prefix) = jid.strip_suffix(JID_DOMAIN) else {
        return false;
    };
    let parts: Vec<&str> = prefix.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .zip([4, 7, 8])
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_digit()))
}

impl TryFrom<String> for Jid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Jid::parse(value)
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.0
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ========== Playback ==========

/// Artwork size class reported by non-radio sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtSize {
    Small,
    Medium,
    Large,
}

/// Artwork for the current content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Art {
    pub url: Option<String>,
    /// Resolution as `"WIDTHxHEIGHT"` (net radio)
    pub key: Option<String>,
    pub size: Option<ArtSize>,
    pub has_local_image: bool,
}

/// Leader of the Beolink session the device is listening to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeolinkLeader {
    pub friendly_name: String,
    pub jid: Jid,
}

/// Listener attached to the device's Beolink session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeolinkListener {
    pub jid: Jid,
}

/// Beolink capable device on the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeolinkPeer {
    pub friendly_name: String,
    pub jid: Jid,
}

/// Metadata of the content currently playing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackContentMetadata {
    pub title: Option<String>,
    pub album_name: Option<String>,
    pub artist_name: Option<String>,
    pub track: Option<u32>,
    pub organization: Option<String>,
    pub total_duration_seconds: Option<u32>,
    pub art: Option<Vec<Art>>,
    pub remote_leader: Option<BeolinkLeader>,
    pub source_internal_id: Option<String>,
    pub encoding: Option<String>,
    pub input_channel_processing: Option<String>,
    pub input_channels: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackProgress {
    /// Seconds into the current track
    pub progress: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackError {
    pub error: Option<String>,
}

/// Rendering state, e.g. `"started"`, `"paused"`, `"idle"`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingState {
    pub value: Option<String>,
}

/// Audio source, both as catalog entry and as source-change notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Source {
    pub id: Option<String>,
    pub name: Option<String>,
    pub is_enabled: Option<bool>,
}

impl Source {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            is_enabled: Some(true),
        }
    }
}

/// Playback part of the product state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSnapshot {
    pub metadata: Option<PlaybackContentMetadata>,
    pub progress: Option<PlaybackProgress>,
    pub source: Option<Source>,
    pub state: Option<RenderingState>,
}

/// Overall product state, fetched once on attach
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductState {
    pub volume: Option<VolumeState>,
    pub playback: Option<PlaybackSnapshot>,
}

/// Low-level transport commands accepted by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackCommand {
    Play,
    Pause,
    Stop,
    Skip,
    Prev,
}

impl PlaybackCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackCommand::Play => "play",
            PlaybackCommand::Pause => "pause",
            PlaybackCommand::Stop => "stop",
            PlaybackCommand::Skip => "skip",
            PlaybackCommand::Prev => "prev",
        }
    }
}

// ========== Volume ==========

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeLevel {
    /// Level in percent (0-100)
    pub level: Option<u8>,
}

impl VolumeLevel {
    pub fn new(level: u8) -> Self {
        Self { level: Some(level) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeMute {
    pub muted: Option<bool>,
}

/// Current volume and mute state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeState {
    pub level: Option<VolumeLevel>,
    pub muted: Option<VolumeMute>,
}

impl VolumeState {
    /// Current level in percent, if the device reported one
    pub fn level(&self) -> Option<u8> {
        self.level.as_ref().and_then(|l| l.level)
    }
}

/// Default and maximum volume stored on the device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSettings {
    pub default: Option<VolumeLevel>,
    pub maximum: Option<VolumeLevel>,
}

// ========== Queue ==========

/// Repeat setting as stored by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatSetting {
    All,
    Track,
    #[serde(rename = "none")]
    Off,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayQueueSettings {
    pub shuffle: Option<bool>,
    pub repeat: Option<RepeatSetting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueItemType {
    Playlist,
    Track,
}

/// Item added to the play queue of a streaming provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayQueueItem {
    pub provider: String,
    pub start_now_from_position: u32,
    #[serde(rename = "type")]
    pub item_type: QueueItemType,
    pub uri: String,
}

// ========== Software, menus and scenes ==========

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftwareUpdateStatus {
    pub software_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteMenuContent {
    pub categories: Option<Vec<String>>,
}

/// Entry of the device's remote menu (video sources live here)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteMenuItem {
    pub available: Option<bool>,
    pub content: Option<RemoteMenuContent>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningMode {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningModeRef {
    pub id: i64,
}

/// Single action of a scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    pub speaker_group_id: Option<i64>,
    pub radio_station_id: Option<String>,
}

impl Action {
    pub fn radio(station_id: impl Into<String>) -> Self {
        Self {
            action_type: Some("radio".to_string()),
            radio_station_id: Some(station_id.into()),
            ..Default::default()
        }
    }
}

/// Vendor preset bundling one or more actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scene {
    pub label: Option<String>,
    pub tags: Option<Vec<String>>,
    pub action_list: Option<Vec<Action>>,
}

/// Ad-hoc scene run without storing it on the device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneProperties {
    pub action_list: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerGroupOverview {
    pub id: i64,
}

// ========== Bluetooth, battery, overlay ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BluetoothDevice {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedRemote {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatteryState {
    pub battery_level: Option<u8>,
    pub is_charging: Option<bool>,
    pub remaining_charging_time_minutes: Option<u32>,
    pub remaining_playing_time_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uri {
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToSpeech {
    pub lang: String,
    pub text: String,
}

/// Audio played on top of whatever is currently playing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPlayRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<Uri>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_to_speech: Option<TextToSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_absolute: Option<u8>,
}
