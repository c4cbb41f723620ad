use crate::data_sync::config::StatsConfig;
use crate::data_sync::snapshot::{self, LendingSnapshot};
use crate::data_sync::store::LendingTradeStore;
use crate::data_sync::watcher::{self, WatcherSettings};
use crate::logic::cache::LendingTradeCache;
use crate::utils::time;
use alloy_primitives::Address;
use eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lending trade statistics engine: the strict subset of
/// [`TradeStatsService`](crate::data_sync::service::TradeStatsService) that
/// tracks per-relayer participation counts.
pub struct LendingStatsService {
    config: StatsConfig,
    store: Arc<dyn LendingTradeStore>,
    cache: Arc<RwLock<LendingTradeCache>>,
    watcher_task: Option<JoinHandle<()>>,
    flush_task: Option<JoinHandle<()>>,
    watcher_shutdown: Option<mpsc::Sender<()>>,
    flush_shutdown: Option<mpsc::Sender<()>>,
}

impl LendingStatsService {
    pub fn new(config: StatsConfig, store: Arc<dyn LendingTradeStore>) -> Self {
        Self {
            config,
            store,
            cache: Arc::new(RwLock::new(LendingTradeCache::new())),
            watcher_task: None,
            flush_task: None,
            watcher_shutdown: None,
            flush_shutdown: None,
        }
    }

    pub async fn init(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(eyre::eyre!("LendingStatsService already started"));
        }
        info!("lending stats init starting");
        let now = time::unix_now();

        let snapshot_path = PathBuf::from(&self.config.lending_snapshot_path);
        if let Some(snapshot) = snapshot::load::<LendingSnapshot>(&snapshot_path).await {
            let mut cache = self.cache.write().await;
            snapshot.restore(&mut cache);
            info!(last_time = cache.last_time(), "lending snapshot loaded");
        }

        let from = {
            let mut cache = self.cache.write().await;
            if cache.last_time() == 0 {
                cache.set_last_time(now - self.config.backfill_window_secs);
            }
            // resume strictly after the last applied trade; everything at or
            // before the high-water mark is already in the cache
            cache.last_time() + 1
        };
        self.backfill(from, now).await;

        Self::flush_snapshot(&self.cache, &snapshot_path).await;

        let (flush_task, flush_shutdown) = self.spawn_flush_timer(snapshot_path);
        self.flush_task = Some(flush_task);
        self.flush_shutdown = Some(flush_shutdown);

        let settings = WatcherSettings {
            max_await: self.config.feed_max_await(),
            batch_size: self.config.feed_batch_size,
            reconnect_delay: self.config.reconnect_delay(),
        };
        let (watcher_task, watcher_shutdown) =
            watcher::spawn_lending_watcher(Arc::clone(&self.store), Arc::clone(&self.cache), settings);
        self.watcher_task = Some(watcher_task);
        self.watcher_shutdown = Some(watcher_shutdown);

        info!("lending stats init finished");
        Ok(())
    }

    async fn backfill(&self, from: i64, to: i64) {
        let size = self.config.backfill_page_size;
        let mut page = 0usize;
        loop {
            let trades = match self.store.trades_by_time(from, to, page * size, size).await {
                Ok(trades) => trades,
                Err(err) => {
                    warn!(%err, offset = page * size, "lending backfill aborted, keeping applied progress");
                    break;
                }
            };
            if trades.is_empty() {
                break;
            }
            debug!(offset = page * size, count = trades.len(), "lending backfill page");
            let mut cache = self.cache.write().await;
            for trade in &trades {
                cache.apply_trade(trade);
            }
            drop(cache);
            page += 1;
        }
    }

    async fn flush_snapshot(cache: &RwLock<LendingTradeCache>, path: &std::path::Path) {
        let snapshot = LendingSnapshot::from_cache(&*cache.read().await);
        match snapshot::flush(path, &snapshot).await {
            Ok(()) => info!(relayer_user_trades = snapshot.relayer_user_trades.len(), "lending snapshot flushed"),
            Err(err) => warn!(%err, "lending snapshot flush failed"),
        }
    }

    fn spawn_flush_timer(&self, path: PathBuf) -> (JoinHandle<()>, mpsc::Sender<()>) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let cache = Arc::clone(&self.cache);
        let interval = self.config.snapshot_interval();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // the first tick fires immediately
            loop {
                tokio::select! {
                    _ = ticker.tick() => Self::flush_snapshot(&cache, &path).await,
                    _ = shutdown_rx.recv() => {
                        debug!("lending snapshot timer stopped");
                        return;
                    }
                }
            }
        });
        (task, shutdown_tx)
    }

    pub async fn stop(&mut self) -> Result<()> {
        info!("lending stats stopping");
        if let Some(shutdown) = self.watcher_shutdown.take() {
            let _ = shutdown.send(()).await;
        }
        if let Some(shutdown) = self.flush_shutdown.take() {
            let _ = shutdown.send(()).await;
        }
        if let Some(task) = self.watcher_task.take() {
            if let Err(err) = task.await {
                warn!(%err, "lending watcher task error during shutdown");
            }
        }
        if let Some(task) = self.flush_task.take() {
            if let Err(err) = task.await {
                warn!(%err, "lending snapshot task error during shutdown");
            }
        }
        Self::flush_snapshot(&self.cache, std::path::Path::new(&self.config.lending_snapshot_path)).await;
        info!("lending stats stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.watcher_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Apply one lending trade directly, bypassing the feed.
    pub async fn notify_trade(&self, trade: &crate::trade::LendingTrade) {
        self.cache.write().await.apply_trade(trade);
    }

    pub async fn number_traders_by_time(&self, relayer: Address, from: i64, to: i64) -> usize {
        self.cache.read().await.number_traders_by_time(relayer, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::memory_store::MemoryLendingTradeStore;
    use crate::trade::LendingTrade;
    use alloy_primitives::U256;

    fn lending_trade(at: i64) -> LendingTrade {
        LendingTrade {
            investor: Address::repeat_byte(0x01),
            borrower: Address::repeat_byte(0x02),
            investing_relayer: Address::repeat_byte(0xa1),
            borrowing_relayer: Address::repeat_byte(0xa1),
            term: 86400,
            lending_token: Address::repeat_byte(0x10),
            amount: U256::from(100u64),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_notify_and_count() {
        let service = LendingStatsService::new(StatsConfig::default(), Arc::new(MemoryLendingTradeStore::new()));
        service.notify_trade(&lending_trade(3600)).await;

        assert_eq!(service.number_traders_by_time(Address::repeat_byte(0xa1), 0, 0).await, 2);
        assert_eq!(service.number_traders_by_time(Address::repeat_byte(0xff), 0, 0).await, 0);
    }
}
