use crate::data_sync::store::{CachedTokenStore, LendingTradeStore, TradeStore};
use crate::logic::cache::{LendingTradeCache, TradeCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Poll settings handed to every subscription attempt.
#[derive(Clone, Copy, Debug)]
pub struct WatcherSettings {
    pub max_await: Duration,
    pub batch_size: usize,
    pub reconnect_delay: Duration,
}

/// Spawn the live ingestion loop for the spot trade feed.
///
/// A supervising loop owns the subscription: on any transport error the
/// current subscription is dropped, the error logged, and a fresh
/// subscription opened after `reconnect_delay`. Reconnection retries
/// forever; only the shutdown channel ends the task.
pub fn spawn_trade_watcher(
    store: Arc<dyn TradeStore>,
    cache: Arc<RwLock<TradeCache>>,
    tokens: Arc<CachedTokenStore>,
    settings: WatcherSettings,
) -> (JoinHandle<()>, mpsc::Sender<()>) {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let task = tokio::spawn(async move {
        info!("trade watcher started");
        loop {
            let mut subscription = match store.subscribe(settings.max_await, settings.batch_size).await {
                Ok(subscription) => {
                    info!("trade change feed subscribed");
                    subscription
                }
                Err(err) => {
                    error!(%err, "trade change feed subscribe failed");
                    if wait_or_shutdown(&mut shutdown_rx, settings.reconnect_delay).await {
                        break;
                    }
                    continue;
                }
            };

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("trade watcher stopped");
                        return;
                    }
                    batch = subscription.next_batch() => match batch {
                        Ok(events) => {
                            for event in events {
                                debug!(operation = %event.operation_type, "trade change event");
                                let trade = event.full_document;
                                let volume_by_quote = tokens.quote_value(&trade).await;
                                cache.write().await.apply_trade(&trade, volume_by_quote);
                            }
                        }
                        Err(err) => {
                            error!(%err, "trade change feed failed, resubscribing");
                            break;
                        }
                    }
                }
            }

            if wait_or_shutdown(&mut shutdown_rx, settings.reconnect_delay).await {
                break;
            }
        }
        info!("trade watcher stopped");
    });

    (task, shutdown_tx)
}

/// Spawn the live ingestion loop for the lending trade feed.
pub fn spawn_lending_watcher(
    store: Arc<dyn LendingTradeStore>,
    cache: Arc<RwLock<LendingTradeCache>>,
    settings: WatcherSettings,
) -> (JoinHandle<()>, mpsc::Sender<()>) {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let task = tokio::spawn(async move {
        info!("lending watcher started");
        loop {
            let mut subscription = match store.subscribe(settings.max_await, settings.batch_size).await {
                Ok(subscription) => {
                    info!("lending change feed subscribed");
                    subscription
                }
                Err(err) => {
                    error!(%err, "lending change feed subscribe failed");
                    if wait_or_shutdown(&mut shutdown_rx, settings.reconnect_delay).await {
                        break;
                    }
                    continue;
                }
            };

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("lending watcher stopped");
                        return;
                    }
                    batch = subscription.next_batch() => match batch {
                        Ok(events) => {
                            for event in events {
                                debug!(operation = %event.operation_type, "lending change event");
                                cache.write().await.apply_trade(&event.full_document);
                            }
                        }
                        Err(err) => {
                            error!(%err, "lending change feed failed, resubscribing");
                            break;
                        }
                    }
                }
            }

            if wait_or_shutdown(&mut shutdown_rx, settings.reconnect_delay).await {
                break;
            }
        }
        info!("lending watcher stopped");
    });

    (task, shutdown_tx)
}

/// Sleep between reconnect attempts while staying responsive to shutdown.
/// Returns true when shutdown was requested.
async fn wait_or_shutdown(shutdown_rx: &mut mpsc::Receiver<()>, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown_rx.recv() => true,
        _ = sleep(delay) => false,
    }
}
