use crate::error::Result;
use crate::protocol::Notification;
use crate::subscription::NotificationReceiver;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const MAX_BACKOFF: Duration = Duration::from_secs(60);
const CHANNEL_CAPACITY: usize = 100;

/// Listener for a device's notification WebSocket
///
/// Runs in the background once started, decodes every frame into a
/// [`Notification`] and broadcasts it to all subscribers. Lost connections are
/// retried with exponential backoff, and each connect / disconnect is announced
/// as [`Notification::ConnectionState`].
pub struct NotificationListener {
    url: String,
    notification_tx: broadcast::Sender<Notification>,
    stop_tx: Option<broadcast::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl NotificationListener {
    pub fn new(url: impl Into<String>) -> Self {
        let (notification_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            url: url.into(),
            notification_tx,
            stop_tx: None,
            task_handle: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Subscribe to decoded notifications
    pub fn subscribe(&self) -> NotificationReceiver {
        NotificationReceiver::new(self.notification_tx.subscribe())
    }

    /// Broadcast a notification as if the device had sent it
    pub fn publish(&self, notification: Notification) {
        let _ = self.notification_tx.send(notification);
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start listening
    ///
    /// If the listener is already running, it will be stopped and restarted.
    pub async fn start(&mut self) {
        self.stop().await;

        let (stop_tx, mut stop_rx) = broadcast::channel(1);
        let mut stop_rx_inner = stop_tx.subscribe();
        self.stop_tx = Some(stop_tx);

        let url = self.url.clone();
        let notification_tx = self.notification_tx.clone();

        let handle = tokio::spawn(async move {
            let mut backoff = Duration::from_secs(0);

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => {
                        tracing::info!("Notification listener for {} stopped", url);
                        break;
                    }
                    _ = async {
                        if backoff > Duration::from_secs(0) {
                            tracing::info!("Reconnecting to {} in {:?}", url, backoff);
                            sleep(backoff).await;
                        }

                        let result = run_once(&url, &notification_tx, &mut stop_rx_inner).await;
                        let _ = notification_tx.send(Notification::ConnectionState(false));
                        match result {
                            Ok(_) => {
                                tracing::info!("Notification connection to {} closed", url);
                                backoff = Duration::from_secs(1);
                            }
                            Err(e) => {
                                tracing::error!("Notification connection error: {}", e);
                                // 1s, 2s, 4s ... 60s (max)
                                backoff = if backoff == Duration::from_secs(0) {
                                    Duration::from_secs(1)
                                } else {
                                    (backoff * 2).min(MAX_BACKOFF)
                                };
                            }
                        }
                    } => {}
                }
            }
        });

        self.task_handle = Some(handle);
    }

    /// Stop listening and close the WebSocket
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut handle) = self.task_handle.take() {
            if tokio::time::timeout(Duration::from_millis(500), &mut handle)
                .await
                .is_err()
            {
                tracing::warn!("Notification listener for {} did not stop, aborting", self.url);
                handle.abort();
            }
        }
    }
}

async fn run_once(
    url: &str,
    notification_tx: &broadcast::Sender<Notification>,
    stop_rx: &mut broadcast::Receiver<()>,
) -> Result<()> {
    tracing::info!("Connecting to {}", url);

    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    tracing::info!("Connected to {}", url);
    let _ = notification_tx.send(Notification::ConnectionState(true));

    loop {
        let msg = tokio::select! {
            _ = stop_rx.recv() => {
                let _ = write.close().await;
                return Ok(());
            }
            msg = read.next() => msg,
        };

        match msg {
            Some(Ok(Message::Text(text))) => {
                tracing::debug!("Received: {}", text);
                match Notification::decode(&text) {
                    Ok(Some(notification)) => {
                        let _ = notification_tx.send(notification);
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Failed to decode notification: {}", e),
                }
            }
            Some(Ok(Message::Ping(payload))) => {
                write.send(Message::Pong(payload)).await?;
            }
            Some(Ok(Message::Close(_))) | None => {
                return Ok(());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                let _ = write.close().await;
                return Err(e.into());
            }
        }
    }
}
