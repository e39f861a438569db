//! Media player entity of a Mozart device
//!
//! [`MediaPlayer`] keeps the last value of every playback related notification
//! in a [`PlayerState`] and derives the entity properties from it. Commands are
//! passed through to the [`DeviceApi`]; Beolink group commands are relayed to
//! other players over the [`BeolinkBus`].

use crate::api::DeviceApi;
use crate::beolink::{BeolinkAttribute, BeolinkBus, BeolinkEnvelope, BeolinkMessage, GroupRole};
use crate::catalog::{fallback_sources, KnownSource, SourceCatalog, SourceKind};
use crate::command::PlayerCommand;
use crate::config::DeviceConfig;
use crate::entity::EntityContext;
use crate::error::{Error, Result};
use crate::protocol::Notification;
use crate::registry::EntityRegistry;
use crate::services::OverlayAudio;
use crate::types::{
    Action, Art, BeolinkLeader, BeolinkListener, Jid, OverlayPlayRequest, PlayQueueItem,
    PlayQueueSettings, PlaybackCommand, PlaybackContentMetadata, PlaybackProgress, QueueItemType,
    RenderingState, RepeatSetting, SceneProperties, Source, TextToSpeech, Uri, VolumeLevel,
    VolumeSettings, VolumeState,
};
use crate::volume;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

const QUEUE_SETTINGS_TIMEOUT: Duration = Duration::from_secs(5);
const GROUP_CHANGE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_TTS_LANGUAGE: &str = "en-us";

/// Playback state shown by the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaPlayerState {
    Playing,
    Paused,
    Idle,
}

impl MediaPlayerState {
    /// Map a device rendering state
    pub fn from_rendering_state(value: &str) -> Self {
        match value {
            "started" | "buffering" => MediaPlayerState::Playing,
            "paused" | "stopped" | "ended" => MediaPlayerState::Paused,
            _ => MediaPlayerState::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    Off,
    All,
    One,
}

impl From<RepeatSetting> for RepeatMode {
    fn from(setting: RepeatSetting) -> Self {
        match setting {
            RepeatSetting::All => RepeatMode::All,
            RepeatSetting::Track => RepeatMode::One,
            RepeatSetting::Off => RepeatMode::Off,
        }
    }
}

impl From<RepeatMode> for RepeatSetting {
    fn from(mode: RepeatMode) -> Self {
        match mode {
            RepeatMode::All => RepeatSetting::All,
            RepeatMode::One => RepeatSetting::Track,
            RepeatMode::Off => RepeatSetting::Off,
        }
    }
}

/// Media types accepted by [`MediaPlayer::play_media`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Url,
    Music,
    OverlayTts,
    Radio,
    Favourite,
    Deezer,
}

impl MediaType {
    pub const NAMES: &'static [&'static str] =
        &["url", "music", "overlay_tts", "radio", "favourite", "deezer"];

    /// `audio/*` MIME types count as music
    pub fn parse(media_type: &str) -> Option<Self> {
        match media_type {
            "url" => Some(MediaType::Url),
            "music" => Some(MediaType::Music),
            "overlay_tts" => Some(MediaType::OverlayTts),
            "radio" => Some(MediaType::Radio),
            "favourite" => Some(MediaType::Favourite),
            "deezer" => Some(MediaType::Deezer),
            other if other.starts_with("audio/") => Some(MediaType::Music),
            _ => None,
        }
    }
}

/// The `bluetooth` extra state attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BluetoothAttribute {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub remote: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub device: BTreeMap<String, String>,
}

impl BluetoothAttribute {
    pub fn is_empty(&self) -> bool {
        self.remote.is_empty() && self.device.is_empty()
    }
}

/// Everything the media player entity shows
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub available: bool,
    pub friendly_name: String,
    pub software_version: String,
    pub catalog: SourceCatalog,
    pub playback_metadata: PlaybackContentMetadata,
    pub playback_progress: PlaybackProgress,
    pub playback_state: RenderingState,
    pub source_change: Source,
    pub volume: VolumeState,
    pub queue_settings: PlayQueueSettings,
    pub media_image: Option<Art>,
    pub role: GroupRole,
    pub group_members: Vec<String>,
    pub beolink: Option<BeolinkAttribute>,
    pub bluetooth: BluetoothAttribute,
    pub last_update: DateTime<Utc>,
}

impl PlayerState {
    pub fn state(&self) -> MediaPlayerState {
        self.playback_state
            .value
            .as_deref()
            .map_or(MediaPlayerState::Idle, MediaPlayerState::from_rendering_state)
    }

    pub fn volume_level(&self) -> Option<f64> {
        self.volume.level().map(volume::to_fraction)
    }

    pub fn is_volume_muted(&self) -> Option<bool> {
        self.volume.muted.as_ref().and_then(|m| m.muted)
    }

    /// Current source label
    ///
    /// The source-change notification is not trusted on its own; the metadata
    /// overrides it for the cases below.
    pub fn source(&self) -> Option<String> {
        let title = self.playback_metadata.title.as_deref();

        // Title echoes a physical input while the source change still says Chromecast
        for input in [KnownSource::LineIn, KnownSource::Bluetooth] {
            if title == Some(input.name()) {
                return Some(input.name().to_string());
            }
        }

        // A source-change id carrying one of these display names means the
        // metadata is stale and the device is actually casting
        let stale_inputs = [
            KnownSource::Bluetooth.name(),
            KnownSource::LineIn.name(),
            KnownSource::Spdif.name(),
        ];
        if self
            .source_change
            .id
            .as_deref()
            .is_some_and(|id| stale_inputs.contains(&id))
        {
            return Some(KnownSource::ChromeCast.name().to_string());
        }

        // Bluetooth carries metadata but never artwork
        if self.playback_metadata.art.as_ref().is_some_and(Vec::is_empty)
            && self.source_change.name.as_deref() == Some(KnownSource::Bluetooth.name())
        {
            return Some(KnownSource::Bluetooth.name().to_string());
        }

        self.source_change.name.clone()
    }

    pub fn source_list(&self) -> Vec<String> {
        self.catalog.labels()
    }

    pub fn media_content_type(&self) -> &'static str {
        if self.source().as_deref() == Some(KnownSource::UriStreamer.name()) {
            "url"
        } else {
            "music"
        }
    }

    pub fn media_duration(&self) -> Option<u32> {
        self.playback_metadata.total_duration_seconds
    }

    /// Position in seconds, hidden while listening to another device
    pub fn media_position(&self) -> Option<u32> {
        match self.role {
            GroupRole::Listener { .. } => None,
            _ => self.playback_progress.progress,
        }
    }

    pub fn media_position_updated_at(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn media_image_url(&self) -> Option<&str> {
        self.media_image.as_ref().and_then(|art| art.url.as_deref())
    }

    pub fn media_image_remotely_accessible(&self) -> bool {
        self.media_image
            .as_ref()
            .map_or(true, |art| !art.has_local_image)
    }

    pub fn media_title(&self) -> Option<&str> {
        self.playback_metadata.title.as_deref()
    }

    pub fn media_album_name(&self) -> Option<&str> {
        self.playback_metadata.album_name.as_deref()
    }

    pub fn media_album_artist(&self) -> Option<&str> {
        self.playback_metadata.artist_name.as_deref()
    }

    pub fn media_track(&self) -> Option<u32> {
        self.playback_metadata.track
    }

    pub fn media_channel(&self) -> Option<&str> {
        self.playback_metadata.organization.as_deref()
    }

    pub fn shuffle(&self) -> Option<bool> {
        self.queue_settings.shuffle
    }

    pub fn repeat(&self) -> Option<RepeatMode> {
        self.queue_settings.repeat.map(RepeatMode::from)
    }

    /// `beolink` and `bluetooth` attributes, `None` when both are absent
    pub fn extra_state_attributes(&self) -> Option<Map<String, Value>> {
        let mut attributes = Map::new();

        if let Some(beolink) = &self.beolink {
            if let Ok(value) = serde_json::to_value(beolink) {
                attributes.insert("beolink".to_string(), value);
            }
        }
        if !self.bluetooth.is_empty() {
            if let Ok(value) = serde_json::to_value(&self.bluetooth) {
                attributes.insert("bluetooth".to_string(), value);
            }
        }

        (!attributes.is_empty()).then_some(attributes)
    }
}

/// Pick the largest artwork
///
/// Net radio reports a `"WIDTHxHEIGHT"` key, other sources a size class.
pub fn select_artwork(metadata: &PlaybackContentMetadata) -> Option<Art> {
    let images = metadata.art.as_ref().filter(|art| !art.is_empty())?;

    let largest = if images[0].key.is_some() {
        images
            .iter()
            .rev()
            .max_by_key(|art| art.key.as_deref().and_then(key_width).unwrap_or(0))
    } else {
        images.iter().rev().max_by_key(|art| art.size)
    };
    largest.cloned()
}

fn key_width(key: &str) -> Option<u32> {
    key.split('x').next()?.parse().ok()
}

#[derive(Debug, Clone, Copy)]
enum GroupChange {
    Expand,
    Unexpand,
}

/// Media player entity
#[derive(Clone)]
pub struct MediaPlayer {
    ctx: EntityContext,
    config: Arc<DeviceConfig>,
    registry: Arc<dyn EntityRegistry>,
    bus: BeolinkBus,
    state: Arc<Mutex<PlayerState>>,
    relay_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl MediaPlayer {
    pub fn new(
        ctx: EntityContext,
        config: DeviceConfig,
        registry: Arc<dyn EntityRegistry>,
        bus: BeolinkBus,
    ) -> Self {
        Self {
            ctx,
            config: Arc::new(config),
            registry,
            bus,
            state: Arc::new(Mutex::new(PlayerState::default())),
            relay_task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn unique_id(&self) -> &str {
        self.ctx.unique_id()
    }

    pub fn name(&self) -> String {
        self.config.name()
    }

    pub fn beolink_jid(&self) -> &Jid {
        &self.config.beolink_jid
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> PlayerState {
        self.state().clone()
    }

    fn state(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn api(&self) -> &dyn DeviceApi {
        self.ctx.api()
    }

    fn write_state(&self) {
        self.ctx.write_state(self.unique_id());
    }

    // ========== Lifecycle ==========

    /// Load the initial state and join the Beolink bus
    pub async fn attach(&self) -> Result<()> {
        let software = self.api().software_update_status().await?;
        tracing::debug!(
            "Connected to: {} {} running SW {}",
            self.config.model,
            self.unique_id(),
            software.software_version
        );

        let own = self.api().beolink_self().await?;

        self.api()
            .set_volume_settings(VolumeSettings {
                default: Some(VolumeLevel::new(self.config.default_volume)),
                maximum: Some(VolumeLevel::new(self.config.max_volume)),
            })
            .await?;

        let product_state = self.api().product_state().await?;
        {
            let mut state = self.state();
            state.software_version = software.software_version;
            state.friendly_name = own.friendly_name;
            if let Some(volume) = product_state.volume {
                state.volume = volume;
            }
            if let Some(playback) = product_state.playback {
                if let Some(metadata) = playback.metadata {
                    state.playback_metadata = metadata;
                }
                if let Some(progress) = playback.progress {
                    state.playback_progress = progress;
                }
                if let Some(source) = playback.source {
                    state.source_change = source;
                }
                if let Some(rendering) = playback.state {
                    state.playback_state = rendering;
                }
            }
            state.media_image = select_artwork(&state.playback_metadata);
            state.last_update = Utc::now();
            state.available = true;
        }

        self.update_sources().await?;
        self.update_beolink().await?;
        self.update_bluetooth().await?;

        self.start_relay();
        self.write_state();
        Ok(())
    }

    /// Leave the Beolink bus and stop the relay task
    pub fn detach(&self) {
        self.bus.unregister(self.beolink_jid());
        if let Some(handle) = self.relay_task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
    }

    fn start_relay(&self) {
        let mut inbox = self.bus.register(self.beolink_jid().clone());
        let player = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(message) = inbox.recv().await {
                if let Err(e) = player.handle_beolink_message(message).await {
                    tracing::error!("Failed to handle Beolink message: {}", e);
                }
            }
        });

        let previous = self
            .relay_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Poll the queue settings, which are not pushed by the device
    pub async fn update(&self) -> Result<()> {
        if !self.state().available {
            return Ok(());
        }

        let settings = tokio::time::timeout(QUEUE_SETTINGS_TIMEOUT, self.api().queue_settings())
            .await
            .map_err(|_| Error::Timeout)??;
        self.state().queue_settings = settings;
        self.write_state();
        Ok(())
    }

    // ========== Notifications ==========

    pub async fn handle_notification(&self, notification: &Notification) -> Result<()> {
        match notification {
            Notification::PlaybackMetadata(metadata) => {
                {
                    let mut state = self.state();
                    state.playback_metadata = metadata.clone();
                    state.media_image = select_artwork(metadata);
                }
                self.update_beolink().await?;
            }
            Notification::PlaybackError(error) => {
                tracing::error!(
                    "Playback error on {}: {}",
                    self.unique_id(),
                    error.error.as_deref().unwrap_or("unknown")
                );
                return Ok(());
            }
            Notification::PlaybackProgress(progress) => {
                let mut state = self.state();
                state.playback_progress = progress.clone();
                state.last_update = Utc::now();
            }
            Notification::PlaybackState(rendering) => {
                self.state().playback_state = rendering.clone();
            }
            Notification::SourceChange(source) => {
                self.state().source_change = source.clone();
                if source.id.as_deref() == Some(KnownSource::Bluetooth.id()) {
                    self.update_bluetooth().await?;
                }
            }
            Notification::Volume(volume) => {
                self.state().volume = volume.clone();
            }
            Notification::RemoteMenuChanged => {
                self.update_sources().await?;
            }
            Notification::Configuration { name } => {
                self.state().friendly_name = name.clone();
                self.update_beolink().await?;
            }
            Notification::BluetoothDevices => {
                self.update_bluetooth().await?;
            }
            Notification::Beolink => {
                self.update_beolink().await?;
            }
            Notification::ConnectionState(connected) => {
                self.state().available = *connected;
            }
            Notification::ActiveListeningMode(_)
            | Notification::ActiveSpeakerGroup(_)
            | Notification::Battery(_) => return Ok(()),
        }

        self.write_state();
        Ok(())
    }

    async fn update_sources(&self) -> Result<()> {
        let sources = match self.api().available_sources().await {
            Ok(sources) => sources,
            Err(Error::OutdatedApi { detail }) => {
                let version = self.state().software_version.clone();
                tracing::warn!(
                    "The API is outdated compared to the device software version {}: {}. Using fallback sources",
                    version,
                    detail
                );
                fallback_sources()
            }
            Err(e) => return Err(e),
        };
        let menu = self.api().remote_menu().await?;

        self.state().catalog = SourceCatalog::build(&sources, &menu);
        Ok(())
    }

    /// Recompute the group role, members and the `beolink` attribute
    async fn update_beolink(&self) -> Result<()> {
        let peers = self.api().beolink_peers().await?;

        let (remote_leader, friendly_name) = {
            let state = self.state();
            // The device keeps reporting its last leader after switching to these inputs
            let local_input = matches!(
                state.source().as_deref(),
                Some(source) if source == KnownSource::LineIn.name()
                    || source == KnownSource::UriStreamer.name()
            );
            let remote_leader = if local_input {
                None
            } else {
                state.playback_metadata.remote_leader.clone()
            };
            (remote_leader, state.friendly_name.clone())
        };

        let listeners = if remote_leader.is_none() {
            self.api().beolink_listeners().await?
        } else {
            Vec::new()
        };

        let role = GroupRole::derive(remote_leader, listeners);
        let members = role.group_members(self.beolink_jid(), self.registry.as_ref());
        let attribute = BeolinkAttribute::build(&friendly_name, self.beolink_jid(), &peers, &role);

        let mut state = self.state();
        state.role = role;
        state.group_members = members;
        state.beolink = Some(attribute);
        Ok(())
    }

    async fn update_bluetooth(&self) -> Result<()> {
        let remotes = self.api().bluetooth_remotes().await?;
        let devices = self.api().bluetooth_devices().await?;

        let attribute = BluetoothAttribute {
            remote: remotes
                .into_iter()
                .map(|remote| (remote.name, remote.address))
                .collect(),
            device: devices
                .into_iter()
                .filter(|device| device.connected)
                .map(|device| (device.name, device.address))
                .collect(),
        };
        self.state().bluetooth = attribute;
        Ok(())
    }

    // ========== Transport ==========

    pub async fn turn_off(&self) -> Result<()> {
        self.api().standby().await
    }

    pub async fn media_play_pause(&self) -> Result<()> {
        let current = self.state().state();
        match current {
            MediaPlayerState::Playing => self.media_pause().await,
            MediaPlayerState::Paused | MediaPlayerState::Idle => self.media_play().await,
        }
    }

    pub async fn media_pause(&self) -> Result<()> {
        self.api().playback_command(PlaybackCommand::Pause).await
    }

    pub async fn media_play(&self) -> Result<()> {
        self.api().playback_command(PlaybackCommand::Play).await
    }

    pub async fn media_stop(&self) -> Result<()> {
        self.api().playback_command(PlaybackCommand::Stop).await
    }

    pub async fn media_next_track(&self) -> Result<()> {
        self.api().playback_command(PlaybackCommand::Skip).await
    }

    pub async fn media_previous_track(&self) -> Result<()> {
        self.api().playback_command(PlaybackCommand::Prev).await
    }

    /// Seek to `position` seconds; only Deezer supports seeking
    pub async fn media_seek(&self, position: f64) -> Result<()> {
        let source = self.state().source();
        if source.as_deref() != Some(KnownSource::Deezer.name()) {
            tracing::error!("Seeking is currently only supported when using Deezer");
            return Ok(());
        }

        let position = position.max(0.0);
        self.api().seek_to_position((position * 1000.0) as u64).await?;

        {
            let mut state = self.state();
            state.playback_progress.progress = Some(position as u32);
            state.last_update = Utc::now();
        }
        self.write_state();
        Ok(())
    }

    pub async fn clear_playlist(&self) -> Result<()> {
        self.api().clear_queue().await
    }

    pub async fn set_shuffle(&self, shuffle: bool) -> Result<()> {
        self.api()
            .set_queue_settings(PlayQueueSettings {
                shuffle: Some(shuffle),
                repeat: None,
            })
            .await?;
        self.state().queue_settings.shuffle = Some(shuffle);
        self.write_state();
        Ok(())
    }

    pub async fn set_repeat(&self, repeat: RepeatMode) -> Result<()> {
        let setting = RepeatSetting::from(repeat);
        self.api()
            .set_queue_settings(PlayQueueSettings {
                shuffle: None,
                repeat: Some(setting),
            })
            .await?;
        self.state().queue_settings.repeat = Some(setting);
        self.write_state();
        Ok(())
    }

    // ========== Volume ==========

    pub async fn volume_up(&self) -> Result<()> {
        let Some(level) = self.state().volume.level() else {
            tracing::warn!("Error setting volume: current level unknown");
            return Ok(());
        };
        let level = volume::step_up(level, self.config.volume_step, self.config.max_volume);
        self.api().set_volume_level(level).await
    }

    pub async fn volume_down(&self) -> Result<()> {
        let Some(level) = self.state().volume.level() else {
            tracing::warn!("Error setting volume: current level unknown");
            return Ok(());
        };
        let level = volume::step_down(level, self.config.volume_step);
        self.api().set_volume_level(level).await
    }

    /// Set the volume, `volume` being 0.0-1.0
    pub async fn set_volume_level(&self, volume: f64) -> Result<()> {
        self.api().set_volume_level(volume::to_percent(volume)).await
    }

    pub async fn set_relative_volume_level(&self, offset: f64) -> Result<()> {
        let Some(current) = self.state().volume_level() else {
            tracing::warn!("Error setting volume: current level unknown");
            return Ok(());
        };
        self.set_volume_level(volume::relative_level(current, offset)).await
    }

    pub async fn mute_volume(&self, mute: bool) -> Result<()> {
        self.api().set_volume_mute(mute).await
    }

    // ========== Sources and media ==========

    pub async fn select_source(&self, label: &str) -> Result<()> {
        let entry = {
            let state = self.state();
            let entry = state.catalog.resolve(label).cloned();
            entry.ok_or_else(|| state.catalog.labels())
        };

        match entry {
            Ok(entry) => match entry.kind {
                SourceKind::Audio => self.api().activate_source(&entry.key).await,
                SourceKind::Video => self.api().trigger_remote_menu_item(&entry.key).await,
            },
            Err(labels) => {
                tracing::error!("Invalid source: {}. Valid sources are: {:?}", label, labels);
                Ok(())
            }
        }
    }

    /// Play media by type; `extra` carries the Deezer `id` and `start_from`
    pub async fn play_media(
        &self,
        media_type: &str,
        media_id: &str,
        extra: Option<&Value>,
    ) -> Result<()> {
        let Some(kind) = MediaType::parse(media_type) else {
            tracing::error!(
                "{} is an invalid type. Valid values are: {:?}",
                media_type,
                MediaType::NAMES
            );
            return Ok(());
        };

        match kind {
            MediaType::Url | MediaType::Music => self.api().play_uri(media_id).await,
            MediaType::OverlayTts => {
                self.api()
                    .overlay_play(OverlayPlayRequest {
                        uri: Some(Uri {
                            location: media_id.to_string(),
                        }),
                        ..Default::default()
                    })
                    .await
            }
            MediaType::Radio => {
                self.api()
                    .run_provided_scene(SceneProperties {
                        action_list: vec![Action::radio(media_id)],
                    })
                    .await
            }
            MediaType::Favourite => match media_id.parse::<u32>() {
                Ok(preset) => self.api().activate_preset(preset).await,
                Err(_) => {
                    tracing::error!("{} is not a valid favourite number", media_id);
                    Ok(())
                }
            },
            MediaType::Deezer => self.play_deezer(media_id, extra).await,
        }
    }

    async fn play_deezer(&self, media_id: &str, extra: Option<&Value>) -> Result<()> {
        let result = if media_id == "flow" {
            let user_id = extra.and_then(|extra| extra.get("id")).map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            self.api().start_deezer_flow(user_id).await
        } else {
            let (item_type, start_from) =
                if media_id.contains("playlist") || media_id.contains("album") {
                    let start_from = extra
                        .and_then(|extra| extra.get("start_from"))
                        .and_then(Value::as_u64)
                        .and_then(|position| u32::try_from(position).ok())
                        .unwrap_or(0);
                    (QueueItemType::Playlist, start_from)
                } else {
                    (QueueItemType::Track, 0)
                };
            self.api()
                .add_to_queue(PlayQueueItem {
                    provider: KnownSource::Deezer.id().to_string(),
                    start_now_from_position: start_from,
                    item_type,
                    uri: media_id.to_string(),
                })
                .await
        };

        match result {
            Err(Error::Api { detail }) => {
                tracing::error!("Unable to play Deezer content {}: {}", media_id, detail);
                Ok(())
            }
            other => other,
        }
    }

    /// Play a clip or spoken text on top of the current audio
    pub async fn overlay_audio(&self, request: OverlayAudio) -> Result<()> {
        let absolute = request.absolute_volume.filter(|v| *v > 0);
        let offset = request.volume_offset.filter(|v| *v > 0);
        let uri = request.uri.filter(|u| !u.is_empty());
        let tts = request.tts.filter(|t| !t.is_empty());

        if absolute.is_some() && offset.is_some() {
            tracing::error!("Can't define absolute volume and volume offset at the same time");
            return Ok(());
        }
        if uri.is_some() && tts.is_some() {
            tracing::error!("Can't define URI and TTS message at the same time");
            return Ok(());
        }

        let volume_absolute = match (absolute, offset) {
            (Some(level), _) => Some(level.min(volume::MAX_LEVEL)),
            (None, Some(offset)) => {
                let current = self.state().volume.level();
                match current {
                    Some(current) => Some(volume::overlay_level(current, offset)),
                    None => {
                        tracing::warn!("Current volume unknown, ignoring volume offset");
                        None
                    }
                }
            }
            (None, None) => None,
        };

        let request = if let Some(location) = uri {
            OverlayPlayRequest {
                uri: Some(Uri { location }),
                text_to_speech: None,
                volume_absolute,
            }
        } else if let Some(text) = tts {
            OverlayPlayRequest {
                uri: None,
                text_to_speech: Some(TextToSpeech {
                    lang: request
                        .tts_language
                        .unwrap_or_else(|| DEFAULT_TTS_LANGUAGE.to_string()),
                    text,
                }),
                volume_absolute,
            }
        } else {
            return Ok(());
        };

        self.api().overlay_play(request).await
    }

    // ========== Grouping ==========

    /// Join the given players into this player's Beolink session
    ///
    /// No players means joining the latest Beolink experience instead.
    pub async fn join_players(&self, entity_ids: &[String]) -> Result<()> {
        if entity_ids.is_empty() {
            return self.beolink_join(None).await;
        }

        let mut jids = Vec::new();
        for entity_id in entity_ids {
            match self.registry.beolink_jid(entity_id) {
                Some(jid) => jids.push(jid.as_str().to_string()),
                None => tracing::warn!("{} is not a Beolink capable player, skipping", entity_id),
            }
        }

        self.beolink_expand(jids);
        Ok(())
    }

    pub async fn unjoin_player(&self) -> Result<()> {
        self.beolink_leave().await
    }

    pub async fn beolink_join(&self, beolink_jid: Option<&str>) -> Result<()> {
        match beolink_jid {
            None => self.api().join_latest_beolink_experience().await,
            Some(jid) => match Jid::parse(jid) {
                Ok(jid) => self.api().join_beolink_peer(&jid).await,
                Err(e) => {
                    tracing::error!("Unable to join Beolink session: {}", e);
                    Ok(())
                }
            },
        }
    }

    /// Expand the session to each JID, one request per second
    ///
    /// Nothing is sent if any JID is invalid; returns the handle of the task
    /// issuing the requests otherwise.
    pub fn beolink_expand(&self, beolink_jids: Vec<String>) -> Option<JoinHandle<()>> {
        self.spawn_group_change(GroupChange::Expand, beolink_jids)
    }

    pub fn beolink_unexpand(&self, beolink_jids: Vec<String>) -> Option<JoinHandle<()>> {
        self.spawn_group_change(GroupChange::Unexpand, beolink_jids)
    }

    fn spawn_group_change(
        &self,
        change: GroupChange,
        beolink_jids: Vec<String>,
    ) -> Option<JoinHandle<()>> {
        let jids = match beolink_jids
            .into_iter()
            .map(Jid::parse)
            .collect::<Result<Vec<Jid>>>()
        {
            Ok(jids) => jids,
            Err(e) => {
                tracing::error!("Unable to {:?} Beolink session: {}", change, e);
                return None;
            }
        };

        let api = self.ctx.api_handle();
        Some(tokio::spawn(async move {
            for jid in jids {
                let result = match change {
                    GroupChange::Expand => api.beolink_expand(&jid).await,
                    GroupChange::Unexpand => api.beolink_unexpand(&jid).await,
                };
                if let Err(e) = result {
                    tracing::error!("Beolink {:?} to {} failed: {}", change, jid, e);
                }
                tokio::time::sleep(GROUP_CHANGE_DELAY).await;
            }
        }))
    }

    pub async fn beolink_leave(&self) -> Result<()> {
        self.api().beolink_leave().await
    }

    pub async fn beolink_allstandby(&self) -> Result<()> {
        self.api().beolink_all_standby().await
    }

    // ========== Beolink relay ==========

    fn remote_leader(&self) -> Option<BeolinkLeader> {
        self.state().role.leader().cloned()
    }

    fn listeners(&self) -> Vec<BeolinkListener> {
        self.state().role.listeners().to_vec()
    }

    fn relay(&self, recipient: &Jid, message: BeolinkMessage) {
        if !self.bus.send(BeolinkEnvelope::new(recipient.clone(), message)) {
            tracing::warn!("Beolink member {} is not reachable", recipient);
        }
    }

    /// Run a command on the leader of the session
    ///
    /// Invalid commands or parameters are logged and ignored.
    pub async fn beolink_leader_command(&self, command: &str, parameter: Option<&str>) -> Result<()> {
        match PlayerCommand::parse(command, parameter) {
            Ok(command) => self.run_on_leader(command).await,
            Err(e) => {
                tracing::error!("{}", e);
                Ok(())
            }
        }
    }

    async fn run_on_leader(&self, command: PlayerCommand) -> Result<()> {
        match self.remote_leader() {
            Some(leader) => {
                self.relay(&leader.jid, BeolinkMessage::LeaderCommand(command));
                Ok(())
            }
            None => self.execute(&command).await,
        }
    }

    /// Run a command sent by the session leader
    pub async fn beolink_listener_command(&self, command: &PlayerCommand) -> Result<()> {
        self.execute(command).await
    }

    /// Set the volume of every member of the session
    pub async fn beolink_set_volume(&self, volume: f64) -> Result<()> {
        if let Some(leader) = self.remote_leader() {
            self.relay(&leader.jid, BeolinkMessage::Volume(volume));
            return Ok(());
        }

        self.set_volume_level(volume).await?;
        for listener in self.listeners() {
            self.relay(
                &listener.jid,
                BeolinkMessage::ListenerCommand(PlayerCommand::SetVolumeLevel(volume)),
            );
        }
        Ok(())
    }

    /// Move the volume of every member of the session by `offset`
    pub async fn beolink_set_relative_volume(&self, offset: f64) -> Result<()> {
        if let Some(leader) = self.remote_leader() {
            self.relay(&leader.jid, BeolinkMessage::RelativeVolume(offset));
            return Ok(());
        }

        self.set_relative_volume_level(offset).await?;
        for listener in self.listeners() {
            self.relay(
                &listener.jid,
                BeolinkMessage::ListenerCommand(PlayerCommand::SetRelativeVolumeLevel(offset)),
            );
        }
        Ok(())
    }

    async fn handle_beolink_message(&self, message: BeolinkMessage) -> Result<()> {
        match message {
            BeolinkMessage::LeaderCommand(command) => self.run_on_leader(command).await,
            BeolinkMessage::ListenerCommand(command) => {
                self.beolink_listener_command(&command).await
            }
            BeolinkMessage::Volume(volume) => self.beolink_set_volume(volume).await,
            BeolinkMessage::RelativeVolume(offset) => {
                self.beolink_set_relative_volume(offset).await
            }
        }
    }

    /// Run a typed player command
    pub async fn execute(&self, command: &PlayerCommand) -> Result<()> {
        tracing::debug!("Executing {} on {}", command, self.unique_id());
        match command {
            PlayerCommand::SetVolumeLevel(volume) => self.set_volume_level(*volume).await,
            PlayerCommand::MediaSeek(position) => self.media_seek(*position).await,
            PlayerCommand::SetRelativeVolumeLevel(offset) => {
                self.set_relative_volume_level(*offset).await
            }
            PlayerCommand::MuteVolume(mute) => self.mute_volume(*mute).await,
            PlayerCommand::SelectSource(source) => self.select_source(source).await,
            PlayerCommand::VolumeUp => self.volume_up().await,
            PlayerCommand::VolumeDown => self.volume_down().await,
            PlayerCommand::MediaPlayPause => self.media_play_pause().await,
            PlayerCommand::MediaPause => self.media_pause().await,
            PlayerCommand::MediaPlay => self.media_play().await,
            PlayerCommand::MediaStop => self.media_stop().await,
            PlayerCommand::MediaNextTrack => self.media_next_track().await,
            PlayerCommand::MediaPreviousTrack => self.media_previous_track().await,
        }
    }
}
