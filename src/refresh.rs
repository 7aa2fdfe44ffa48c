//! Background data refresh system
//!
//! Periodically signals the main loop to re-fetch price data using tokio
//! channels. The ticker only signals; the main loop owns the clients and
//! performs the actual fetches, so a slow upstream never stacks refreshes.

use std::time::Duration;
use tokio::sync::mpsc;

/// Messages sent from the background ticker to the main app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMessage {
    /// Price data is due for a refresh
    PricesDue,
    /// The league list is due for a refresh
    LeaguesDue,
}

/// Configuration for refresh intervals
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Interval between price refreshes
    pub prices_interval: Duration,
    /// Interval between league list refreshes
    pub leagues_interval: Duration,
    /// Whether auto-refresh is enabled
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            prices_interval: Duration::from_secs(600), // 10 minutes
            leagues_interval: Duration::from_secs(3600), // 1 hour
            enabled: true,
        }
    }
}

/// Handle for controlling the background refresh ticker
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Creates a new RefreshHandle and spawns the ticker task.
    pub fn spawn(config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(8);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            tokio::spawn(async move {
                let mut prices = tokio::time::interval(config.prices_interval);
                let mut leagues = tokio::time::interval(config.leagues_interval);
                // Skip the immediate first ticks; startup already loads.
                prices.tick().await;
                leagues.tick().await;

                loop {
                    tokio::select! {
                        _ = prices.tick() => {
                            if msg_tx.send(RefreshMessage::PricesDue).await.is_err() {
                                break;
                            }
                        }
                        _ = leagues.tick() => {
                            if msg_tx.send(RefreshMessage::LeaguesDue).await.is_err() {
                                break;
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Shuts down the ticker task.
    #[allow(dead_code)]
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Checks for a pending refresh message without blocking.
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    handle.receiver.try_recv().ok()
}
