//! Typed receiving end of a listener's notification broadcast

use crate::error::{Error, Result};
use crate::protocol::Notification;
use tokio::sync::broadcast;

/// Receiver for device push notifications
pub struct NotificationReceiver {
    rx: broadcast::Receiver<Notification>,
}

impl NotificationReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<Notification>) -> Self {
        Self { rx }
    }

    /// Receive the next notification
    ///
    /// Fails with [`Error::ConnectionClosed`] once the listener is gone.
    pub async fn recv(&mut self) -> Result<Notification> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => Error::ConnectionClosed,
            broadcast::error::RecvError::Lagged(n) => {
                Error::ChannelError(format!("Lagged by {} messages", n))
            }
        })
    }

    /// Try to receive a notification without blocking
    ///
    /// Returns `None` if no message is available.
    pub fn try_recv(&mut self) -> Result<Option<Notification>> {
        match self.rx.try_recv() {
            Ok(notification) => Ok(Some(notification)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(Error::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(Error::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receiver_reports_lag_and_close() {
        let (tx, rx) = broadcast::channel(1);
        let mut receiver = NotificationReceiver::new(rx);

        assert!(receiver.try_recv().unwrap().is_none());

        tx.send(Notification::Beolink).unwrap();
        tx.send(Notification::RemoteMenuChanged).unwrap();
        assert!(matches!(receiver.recv().await, Err(Error::ChannelError(_))));
        assert_eq!(receiver.recv().await.unwrap(), Notification::RemoteMenuChanged);

        drop(tx);
        assert!(matches!(receiver.recv().await, Err(Error::ConnectionClosed)));
    }
}
