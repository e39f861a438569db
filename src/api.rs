use crate::error::Result;
use crate::types::{
    BeolinkListener, BeolinkPeer, BluetoothDevice, Jid, ListeningMode, ListeningModeRef,
    OverlayPlayRequest, PairedRemote, PlayQueueItem, PlayQueueSettings, PlaybackCommand,
    ProductState, RemoteMenuItem, Scene, SceneProperties, SoftwareUpdateStatus, Source,
    SpeakerGroupOverview, VolumeSettings,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Request/response surface of a Mozart device
///
/// Entities only talk to the device through this trait. Implementations decide
/// the transport; every call is awaited before the calling handler continues.
///
/// `available_sources` returns [`Error::OutdatedApi`](crate::Error::OutdatedApi)
/// when the device reports sources the models cannot represent.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    // Device information
    async fn software_update_status(&self) -> Result<SoftwareUpdateStatus>;
    async fn beolink_self(&self) -> Result<BeolinkPeer>;
    async fn product_state(&self) -> Result<ProductState>;
    async fn set_volume_settings(&self, settings: VolumeSettings) -> Result<()>;
    async fn standby(&self) -> Result<()>;

    // Sources
    async fn available_sources(&self) -> Result<Vec<Source>>;
    async fn remote_menu(&self) -> Result<BTreeMap<String, RemoteMenuItem>>;
    async fn activate_source(&self, source_id: &str) -> Result<()>;
    async fn trigger_remote_menu_item(&self, item_id: &str) -> Result<()>;

    // Playback
    async fn playback_command(&self, command: PlaybackCommand) -> Result<()>;
    async fn seek_to_position(&self, position_ms: u64) -> Result<()>;
    async fn clear_queue(&self) -> Result<()>;
    async fn queue_settings(&self) -> Result<PlayQueueSettings>;
    async fn set_queue_settings(&self, settings: PlayQueueSettings) -> Result<()>;
    async fn play_uri(&self, location: &str) -> Result<()>;
    async fn overlay_play(&self, request: OverlayPlayRequest) -> Result<()>;
    async fn run_provided_scene(&self, scene: SceneProperties) -> Result<()>;
    async fn activate_preset(&self, preset_id: u32) -> Result<()>;
    async fn start_deezer_flow(&self, user_id: Option<String>) -> Result<()>;
    async fn add_to_queue(&self, item: PlayQueueItem) -> Result<()>;

    // Volume
    async fn set_volume_level(&self, level: u8) -> Result<()>;
    async fn set_volume_mute(&self, muted: bool) -> Result<()>;

    // Beolink
    async fn beolink_peers(&self) -> Result<Vec<BeolinkPeer>>;
    async fn beolink_listeners(&self) -> Result<Vec<BeolinkListener>>;
    async fn join_latest_beolink_experience(&self) -> Result<()>;
    async fn join_beolink_peer(&self, jid: &Jid) -> Result<()>;
    async fn beolink_expand(&self, jid: &Jid) -> Result<()>;
    async fn beolink_unexpand(&self, jid: &Jid) -> Result<()>;
    async fn beolink_leave(&self) -> Result<()>;
    async fn beolink_all_standby(&self) -> Result<()>;

    // Bluetooth
    async fn bluetooth_remotes(&self) -> Result<Vec<PairedRemote>>;
    async fn bluetooth_devices(&self) -> Result<Vec<BluetoothDevice>>;

    // Listening modes and scenes
    async fn listening_modes(&self) -> Result<Vec<ListeningMode>>;
    async fn active_listening_mode(&self) -> Result<ListeningModeRef>;
    async fn activate_listening_mode(&self, mode_id: i64) -> Result<()>;
    async fn scenes(&self) -> Result<BTreeMap<String, Scene>>;
    async fn active_speaker_group(&self) -> Result<SpeakerGroupOverview>;
    async fn trigger_scene(&self, scene_id: &str) -> Result<()>;
}
