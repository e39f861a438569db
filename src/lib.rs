//! Rust library exposing Bang & Olufsen Mozart speakers as home-automation entities
//!
//! Each configured device becomes a [`BangOlufsenDevice`] holding:
//!
//! - a [`MediaPlayer`] with transport, volume, source selection, media
//!   playback and Beolink multi-room grouping
//! - a [`SoundModeSelect`] and a [`ListeningPositionSelect`]
//! - [`Sensor`]s for battery, media id and input signal
//!
//! Entities talk to the device through the [`DeviceApi`] trait and are kept up
//! to date by the device's notification WebSocket ([`NotificationListener`]).
//! Every state change is announced as an [`EntityUpdate`].
//!
//! # Quick Start
//!
//! ```no_run
//! use mozart_beolink::{BangOlufsenDevice, BeolinkBus, DeviceApi, DeviceConfig, MemoryRegistry};
//! use std::sync::Arc;
//!
//! async fn run(api: Arc<dyn DeviceApi>) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DeviceConfig::from_json_str(r#"{
//!         "host": "192.168.1.40",
//!         "model": "Beosound Balance",
//!         "jid": "1111.2222222.33333333@products.bang-olufsen.com"
//!     }"#)?;
//!
//!     let device = BangOlufsenDevice::setup(
//!         config,
//!         api,
//!         Arc::new(MemoryRegistry::new()),
//!         BeolinkBus::new(),
//!     )
//!     .await?;
//!
//!     let player = device.media_player();
//!     player.set_volume_level(0.3).await?;
//!     player.select_source("Line-In").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Beolink
//!
//! Players of one process share a [`BeolinkBus`]. A listener forwards group
//! commands to its leader, and the leader fans volume changes out to its
//! listeners:
//!
//! ```no_run
//! # use mozart_beolink::MediaPlayer;
//! # async fn group(player: &MediaPlayer) -> mozart_beolink::Result<()> {
//! player.beolink_set_volume(0.4).await?;
//! player.beolink_leader_command("media_next_track", None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Device**: entity setup and notification routing
//! - **Entities**: media player, selects, sensors
//! - **Beolink**: group roles and the in-process relay bus
//! - **Connection**: notification WebSocket with reconnect
//! - **Protocol**: notification frames
//! - **Api / Types**: the device's request surface and its models

mod api;
mod beolink;
mod catalog;
mod command;
mod config;
mod connection;
mod device;
mod entity;
mod error;
mod media_player;
mod protocol;
mod registry;
mod select;
mod sensor;
mod services;
mod subscription;
#[cfg(test)]
mod testing;
mod types;
pub mod volume;

// Public exports
pub use api::DeviceApi;
pub use beolink::{
    BeolinkAttribute, BeolinkBus, BeolinkEnvelope, BeolinkInbox, BeolinkMessage, GroupRole,
};
pub use catalog::{fallback_sources, CatalogEntry, KnownSource, SourceCatalog, SourceKind};
pub use command::PlayerCommand;
pub use config::{DeviceConfig, NOTIFICATION_PORT};
pub use connection::NotificationListener;
pub use device::BangOlufsenDevice;
pub use entity::{EntityContext, EntityUpdate};
pub use error::{Error, Result};
pub use media_player::{
    select_artwork, BluetoothAttribute, MediaPlayer, MediaPlayerState, MediaType, PlayerState,
    RepeatMode,
};
pub use protocol::{event_type, Notification, WireEvent};
pub use registry::{EntityRegistry, MemoryRegistry};
pub use select::{ListeningPositionSelect, OptionSet, SoundModeSelect};
pub use sensor::{input_signal, Sensor, SensorKind, SensorValue};
pub use services::{OverlayAudio, ServiceCall};
pub use subscription::NotificationReceiver;
pub use types::*;
