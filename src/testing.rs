//! Recording mock of the device API used by the unit tests

use crate::api::DeviceApi;
use crate::error::{Error, Result};
use crate::types::{
    BeolinkListener, BeolinkPeer, BluetoothDevice, Jid, ListeningMode, ListeningModeRef,
    OverlayPlayRequest, PairedRemote, PlayQueueItem, PlayQueueSettings, PlaybackCommand,
    ProductState, RemoteMenuItem, Scene, SceneProperties, SoftwareUpdateStatus, Source,
    SpeakerGroupOverview, VolumeSettings,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;

pub(crate) const JID_SELF: &str = "1111.2222222.00000001@products.bang-olufsen.com";

pub(crate) fn jid(serial: &str) -> Jid {
    Jid::parse(format!("1111.2222222.{}@products.bang-olufsen.com", serial)).unwrap()
}

/// Route log output through the test harness; repeated calls are no-ops
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub(crate) fn set<T>(slot: &Mutex<T>, value: T) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

fn get<T: Clone>(slot: &Mutex<T>) -> T {
    slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Answers every call from its configurable fields and records it as
/// `"<method> <args>"`
pub(crate) struct MockApi {
    calls: Mutex<Vec<(Instant, String)>>,
    pub friendly_name: Mutex<String>,
    pub product_state: Mutex<ProductState>,
    /// `None` makes `available_sources` fail as outdated
    pub sources: Mutex<Option<Vec<Source>>>,
    pub remote_menu: Mutex<BTreeMap<String, RemoteMenuItem>>,
    pub peers: Mutex<Vec<BeolinkPeer>>,
    pub listeners: Mutex<Vec<BeolinkListener>>,
    pub remotes: Mutex<Vec<PairedRemote>>,
    pub bluetooth_devices: Mutex<Vec<BluetoothDevice>>,
    pub queue_settings: Mutex<PlayQueueSettings>,
    pub listening_modes: Mutex<Vec<ListeningMode>>,
    pub active_listening_mode: Mutex<i64>,
    pub scenes: Mutex<BTreeMap<String, Scene>>,
    pub active_speaker_group: Mutex<i64>,
    pub add_to_queue_error: Mutex<Option<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            friendly_name: Mutex::new("Living Room".to_string()),
            product_state: Mutex::new(ProductState::default()),
            sources: Mutex::new(Some(Vec::new())),
            remote_menu: Mutex::new(BTreeMap::new()),
            peers: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            remotes: Mutex::new(Vec::new()),
            bluetooth_devices: Mutex::new(Vec::new()),
            queue_settings: Mutex::new(PlayQueueSettings::default()),
            listening_modes: Mutex::new(Vec::new()),
            active_listening_mode: Mutex::new(0),
            scenes: Mutex::new(BTreeMap::new()),
            active_speaker_group: Mutex::new(0),
            add_to_queue_error: Mutex::new(None),
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Instant::now(), call.into()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.timed_calls().into_iter().map(|(_, call)| call).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, String)> {
        get(&self.calls)
    }

    /// Calls that change something on the device
    pub fn commands(&self) -> Vec<String> {
        const QUERIES: &[&str] = &[
            "software_update_status",
            "beolink_self",
            "product_state",
            "available_sources",
            "remote_menu",
            "queue_settings",
            "beolink_peers",
            "beolink_listeners",
            "bluetooth_remotes",
            "bluetooth_devices",
            "listening_modes",
            "active_listening_mode",
            "scenes",
            "active_speaker_group",
        ];
        self.calls()
            .into_iter()
            .filter(|call| !QUERIES.contains(&call.as_str()))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl DeviceApi for MockApi {
    async fn software_update_status(&self) -> Result<SoftwareUpdateStatus> {
        self.record("software_update_status");
        Ok(SoftwareUpdateStatus {
            software_version: "3.4.1.8".to_string(),
        })
    }

    async fn beolink_self(&self) -> Result<BeolinkPeer> {
        self.record("beolink_self");
        Ok(BeolinkPeer {
            friendly_name: get(&self.friendly_name),
            jid: Jid::parse(JID_SELF)?,
        })
    }

    async fn product_state(&self) -> Result<ProductState> {
        self.record("product_state");
        Ok(get(&self.product_state))
    }

    async fn set_volume_settings(&self, settings: VolumeSettings) -> Result<()> {
        let level = |l: Option<crate::types::VolumeLevel>| l.and_then(|l| l.level);
        self.record(format!(
            "set_volume_settings {:?} {:?}",
            level(settings.default),
            level(settings.maximum)
        ));
        Ok(())
    }

    async fn standby(&self) -> Result<()> {
        self.record("standby");
        Ok(())
    }

    async fn available_sources(&self) -> Result<Vec<Source>> {
        self.record("available_sources");
        get(&self.sources).ok_or_else(|| Error::OutdatedApi {
            detail: "unknown source id".to_string(),
        })
    }

    async fn remote_menu(&self) -> Result<BTreeMap<String, RemoteMenuItem>> {
        self.record("remote_menu");
        Ok(get(&self.remote_menu))
    }

    async fn activate_source(&self, source_id: &str) -> Result<()> {
        self.record(format!("activate_source {}", source_id));
        Ok(())
    }

    async fn trigger_remote_menu_item(&self, item_id: &str) -> Result<()> {
        self.record(format!("trigger_remote_menu_item {}", item_id));
        Ok(())
    }

    async fn playback_command(&self, command: PlaybackCommand) -> Result<()> {
        self.record(format!("playback_command {}", command.as_str()));
        Ok(())
    }

    async fn seek_to_position(&self, position_ms: u64) -> Result<()> {
        self.record(format!("seek_to_position {}", position_ms));
        Ok(())
    }

    async fn clear_queue(&self) -> Result<()> {
        self.record("clear_queue");
        Ok(())
    }

    async fn queue_settings(&self) -> Result<PlayQueueSettings> {
        self.record("queue_settings");
        Ok(get(&self.queue_settings))
    }

    async fn set_queue_settings(&self, settings: PlayQueueSettings) -> Result<()> {
        self.record(format!("set_queue_settings {}", serde_json::to_string(&settings)?));
        Ok(())
    }

    async fn play_uri(&self, location: &str) -> Result<()> {
        self.record(format!("play_uri {}", location));
        Ok(())
    }

    async fn overlay_play(&self, request: OverlayPlayRequest) -> Result<()> {
        self.record(format!("overlay_play {}", serde_json::to_string(&request)?));
        Ok(())
    }

    async fn run_provided_scene(&self, scene: SceneProperties) -> Result<()> {
        self.record(format!("run_provided_scene {}", serde_json::to_string(&scene)?));
        Ok(())
    }

    async fn activate_preset(&self, preset_id: u32) -> Result<()> {
        self.record(format!("activate_preset {}", preset_id));
        Ok(())
    }

    async fn start_deezer_flow(&self, user_id: Option<String>) -> Result<()> {
        self.record(format!("start_deezer_flow {:?}", user_id));
        Ok(())
    }

    async fn add_to_queue(&self, item: PlayQueueItem) -> Result<()> {
        self.record(format!("add_to_queue {}", serde_json::to_string(&item)?));
        match get(&self.add_to_queue_error) {
            Some(detail) => Err(Error::Api { detail }),
            None => Ok(()),
        }
    }

    async fn set_volume_level(&self, level: u8) -> Result<()> {
        self.record(format!("set_volume_level {}", level));
        Ok(())
    }

    async fn set_volume_mute(&self, muted: bool) -> Result<()> {
        self.record(format!("set_volume_mute {}", muted));
        Ok(())
    }

    async fn beolink_peers(&self) -> Result<Vec<BeolinkPeer>> {
        self.record("beolink_peers");
        Ok(get(&self.peers))
    }

    async fn beolink_listeners(&self) -> Result<Vec<BeolinkListener>> {
        self.record("beolink_listeners");
        Ok(get(&self.listeners))
    }

    async fn join_latest_beolink_experience(&self) -> Result<()> {
        self.record("join_latest_beolink_experience");
        Ok(())
    }

    async fn join_beolink_peer(&self, jid: &Jid) -> Result<()> {
        self.record(format!("join_beolink_peer {}", jid.serial()));
        Ok(())
    }

    async fn beolink_expand(&self, jid: &Jid) -> Result<()> {
        self.record(format!("beolink_expand {}", jid.serial()));
        Ok(())
    }

    async fn beolink_unexpand(&self, jid: &Jid) -> Result<()> {
        self.record(format!("beolink_unexpand {}", jid.serial()));
        Ok(())
    }

    async fn beolink_leave(&self) -> Result<()> {
        self.record("beolink_leave");
        Ok(())
    }

    async fn beolink_all_standby(&self) -> Result<()> {
        self.record("beolink_all_standby");
        Ok(())
    }

    async fn bluetooth_remotes(&self) -> Result<Vec<PairedRemote>> {
        self.record("bluetooth_remotes");
        Ok(get(&self.remotes))
    }

    async fn bluetooth_devices(&self) -> Result<Vec<BluetoothDevice>> {
        self.record("bluetooth_devices");
        Ok(get(&self.bluetooth_devices))
    }

    async fn listening_modes(&self) -> Result<Vec<ListeningMode>> {
        self.record("listening_modes");
        Ok(get(&self.listening_modes))
    }

    async fn active_listening_mode(&self) -> Result<ListeningModeRef> {
        self.record("active_listening_mode");
        Ok(ListeningModeRef {
            id: get(&self.active_listening_mode),
        })
    }

    async fn activate_listening_mode(&self, mode_id: i64) -> Result<()> {
        self.record(format!("activate_listening_mode {}", mode_id));
        Ok(())
    }

    async fn scenes(&self) -> Result<BTreeMap<String, Scene>> {
        self.record("scenes");
        Ok(get(&self.scenes))
    }

    async fn active_speaker_group(&self) -> Result<SpeakerGroupOverview> {
        self.record("active_speaker_group");
        Ok(SpeakerGroupOverview {
            id: get(&self.active_speaker_group),
        })
    }

    async fn trigger_scene(&self, scene_id: &str) -> Result<()> {
        self.record(format!("trigger_scene {}", scene_id));
        Ok(())
    }
}
