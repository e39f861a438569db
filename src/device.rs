use crate::api::DeviceApi;
use crate::beolink::BeolinkBus;
use crate::config::DeviceConfig;
use crate::connection::NotificationListener;
use crate::entity::{EntityContext, EntityUpdate};
use crate::error::{Error, Result};
use crate::media_player::MediaPlayer;
use crate::protocol::Notification;
use crate::registry::EntityRegistry;
use crate::select::{ListeningPositionSelect, SoundModeSelect};
use crate::sensor::Sensor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const UPDATE_CHANNEL_CAPACITY: usize = 100;
const SCAN_INTERVAL: Duration = Duration::from_secs(120);

/// A configured Mozart device and all of its entities
///
/// Owns the notification listener and routes every notification to each
/// entity.
///
/// # Example
///
/// ```no_run
/// use mozart_beolink::{BangOlufsenDevice, BeolinkBus, DeviceApi, DeviceConfig, MemoryRegistry};
/// use std::sync::Arc;
///
/// async fn run(api: Arc<dyn DeviceApi>) -> Result<(), Box<dyn std::error::Error>> {
///     let config = DeviceConfig::from_json_str(r#"{
///         "host": "192.168.1.40",
///         "jid": "1111.2222222.33333333@products.bang-olufsen.com"
///     }"#)?;
///     let registry = Arc::new(MemoryRegistry::new());
///
///     let mut device = BangOlufsenDevice::setup(config, api, registry, BeolinkBus::new()).await?;
///     let mut updates = device.subscribe_updates();
///     while let Ok(update) = updates.recv().await {
///         println!("{} changed", update.unique_id);
///     }
///
///     device.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct BangOlufsenDevice {
    config: DeviceConfig,
    ctx: EntityContext,
    media_player: MediaPlayer,
    sound_mode: SoundModeSelect,
    listening_position: ListeningPositionSelect,
    sensors: Vec<Sensor>,
    listener: NotificationListener,
    router: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
}

impl BangOlufsenDevice {
    /// Build the entities without touching the device
    pub fn new(
        config: DeviceConfig,
        api: Arc<dyn DeviceApi>,
        registry: Arc<dyn EntityRegistry>,
        bus: BeolinkBus,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let ctx = EntityContext::new(api, config.unique_id(), updates);

        Self {
            media_player: MediaPlayer::new(ctx.clone(), config.clone(), registry, bus),
            sound_mode: SoundModeSelect::new(ctx.clone()),
            listening_position: ListeningPositionSelect::new(ctx.clone()),
            sensors: Sensor::all(&ctx),
            listener: NotificationListener::new(config.notification_url()),
            config,
            ctx,
            router: None,
            poller: None,
        }
    }

    /// Validate the configuration, attach all entities and start listening
    pub async fn setup(
        config: DeviceConfig,
        api: Arc<dyn DeviceApi>,
        registry: Arc<dyn EntityRegistry>,
        bus: BeolinkBus,
    ) -> Result<Self> {
        config.validate()?;

        let mut device = Self::new(config, api, registry, bus);
        device.attach().await?;
        device.connect().await;
        Ok(device)
    }

    /// Load the initial state of every entity and start routing notifications
    pub async fn attach(&mut self) -> Result<()> {
        self.media_player.attach().await?;
        self.sound_mode.attach().await?;
        self.listening_position.attach().await?;
        self.start_router();
        self.start_poller();

        tracing::info!("{} ({}) attached", self.config.name(), self.config.host);
        Ok(())
    }

    /// Start the notification listener
    pub async fn connect(&mut self) {
        self.listener.start().await;
    }

    fn start_router(&mut self) {
        let mut receiver = self.listener.subscribe();
        let media_player = self.media_player.clone();
        let sound_mode = self.sound_mode.clone();
        let listening_position = self.listening_position.clone();
        let sensors = self.sensors.clone();

        let handle = tokio::spawn(async move {
            loop {
                let notification = match receiver.recv().await {
                    Ok(notification) => notification,
                    Err(Error::ChannelError(e)) => {
                        tracing::warn!("Notification router: {}", e);
                        continue;
                    }
                    Err(_) => break,
                };

                if let Err(e) = media_player.handle_notification(&notification).await {
                    tracing::error!("Media player failed to handle {:?}: {}", notification, e);
                }
                if let Err(e) = sound_mode.handle_notification(&notification).await {
                    tracing::error!("Sound mode failed to handle {:?}: {}", notification, e);
                }
                if let Err(e) = listening_position.handle_notification(&notification).await {
                    tracing::error!(
                        "Listening position failed to handle {:?}: {}",
                        notification,
                        e
                    );
                }
                for sensor in &sensors {
                    sensor.handle_notification(&notification);
                }
            }
        });

        if let Some(previous) = self.router.replace(handle) {
            previous.abort();
        }
    }

    // Queue settings have no notification of their own
    fn start_poller(&mut self) {
        let media_player = self.media_player.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SCAN_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = media_player.update().await {
                    tracing::error!("Polling {} failed: {}", media_player.unique_id(), e);
                }
            }
        });

        if let Some(previous) = self.poller.replace(handle) {
            previous.abort();
        }
    }

    /// Stop listening and leave the Beolink bus
    pub async fn shutdown(&mut self) {
        self.listener.stop().await;
        for task in [self.router.take(), self.poller.take()].into_iter().flatten() {
            task.abort();
        }
        self.media_player.detach();
        tracing::info!("{} shut down", self.config.name());
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<EntityUpdate> {
        self.ctx.subscribe_updates()
    }

    /// Feed a notification as if it came from the device
    pub fn publish(&self, notification: Notification) {
        self.listener.publish(notification);
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn media_player(&self) -> &MediaPlayer {
        &self.media_player
    }

    pub fn sound_mode(&self) -> &SoundModeSelect {
        &self.sound_mode
    }

    pub fn listening_position(&self) -> &ListeningPositionSelect {
        &self.listening_position
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn listener(&self) -> &NotificationListener {
        &self.listener
    }
}
