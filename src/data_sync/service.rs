use crate::data_sync::config::StatsConfig;
use crate::data_sync::snapshot::{self, TradeSnapshot};
use crate::data_sync::store::{CachedTokenStore, TokenStore, TradeStore};
use crate::data_sync::watcher::{self, WatcherSettings};
use crate::logic::cache::TradeCache;
use crate::logic::classifier::TradeClassifier;
use crate::logic::types::{TradeVolume, UserPnL, UserVolume};
use crate::utils::time;
use alloy_primitives::Address;
use eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spot trade statistics engine.
///
/// Owns one aggregation cache behind a reader-writer lock. Writers are the
/// bootstrap backfill, the live watcher task and snapshot flattening;
/// readers are the query methods. The watcher and the flush timer run as
/// independent tasks until `stop` is called.
pub struct TradeStatsService {
    config: StatsConfig,
    store: Arc<dyn TradeStore>,
    tokens: Arc<CachedTokenStore>,
    cache: Arc<RwLock<TradeCache>>,
    watcher_task: Option<JoinHandle<()>>,
    flush_task: Option<JoinHandle<()>>,
    watcher_shutdown: Option<mpsc::Sender<()>>,
    flush_shutdown: Option<mpsc::Sender<()>>,
}

impl TradeStatsService {
    pub fn new(config: StatsConfig, store: Arc<dyn TradeStore>, token_store: Arc<dyn TokenStore>) -> Self {
        let classifier = TradeClassifier::from_lists(&config.wash_pairs, &config.bots);
        let tokens = Arc::new(CachedTokenStore::new(token_store, config.token_cache_ttl()));
        Self {
            config,
            store,
            tokens,
            cache: Arc::new(RwLock::new(TradeCache::new(classifier))),
            watcher_task: None,
            flush_task: None,
            watcher_shutdown: None,
            flush_shutdown: None,
        }
    }

    /// Bootstrap the cache and start the background tasks: snapshot reload,
    /// historical backfill up to now, one initial flush, then the periodic
    /// flush timer and the live ingestion watcher.
    pub async fn init(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(eyre::eyre!("TradeStatsService already started"));
        }
        info!("trade stats init starting");
        let now = time::unix_now();

        let snapshot_path = PathBuf::from(&self.config.trade_snapshot_path);
        if let Some(snapshot) = snapshot::load::<TradeSnapshot>(&snapshot_path).await {
            let mut cache = self.cache.write().await;
            snapshot.restore(&mut cache);
            info!(last_time = cache.last_time(), "trade snapshot loaded");
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
            watcher::spawn_trade_watcher(Arc::clone(&self.store), Arc::clone(&self.cache), Arc::clone(&self.tokens), settings);
        self.watcher_task = Some(watcher_task);
        self.watcher_shutdown = Some(watcher_shutdown);

        info!("trade stats init finished");
        Ok(())
    }

    /// Page through the historical record store and apply every trade.
    /// A transient store error ends the loop; progress made so far stays
    /// applied and moves the high-water mark with it.
    async fn backfill(&self, from: i64, to: i64) {
        let size = self.config.backfill_page_size;
        let mut page = 0usize;
        loop {
            let trades = match self.store.trades_by_time(from, to, page * size, size).await {
                Ok(trades) => trades,
                Err(err) => {
                    warn!(%err, offset = page * size, "backfill aborted, keeping applied progress");
                    break;
                }
            };
            if trades.is_empty() {
                break;
            }
            debug!(offset = page * size, count = trades.len(), "backfill page");

            // resolve token metadata before taking the write lock
            let mut volumes = Vec::with_capacity(trades.len());
            for trade in &trades {
                volumes.push(self.tokens.quote_value(trade).await);
            }
            let mut cache = self.cache.write().await;
            for (trade, volume_by_quote) in trades.iter().zip(volumes) {
                cache.apply_trade(trade, volume_by_quote);
            }
            drop(cache);
            page += 1;
        }
    }

    /// Flatten under the shared lock, serialize and write outside it, so a
    /// slow disk never stalls ingestion. Failures are logged and retried on
    /// the next timer tick.
    async fn flush_snapshot(cache: &RwLock<TradeCache>, path: &std::path::Path) {
        let snapshot = TradeSnapshot::from_cache(&*cache.read().await);
        match snapshot::flush(path, &snapshot).await {
            Ok(()) => info!(
                user_trades = snapshot.user_trades.len(),
                relayer_user_trades = snapshot.relayer_user_trades.len(),
                "trade snapshot flushed"
            ),
            Err(err) => warn!(%err, "trade snapshot flush failed"),
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
                        debug!("trade snapshot timer stopped");
                        return;
                    }
                }
            }
        });
        (task, shutdown_tx)
    }

    /// Stop the background tasks and attempt one final snapshot flush.
    pub async fn stop(&mut self) -> Result<()> {
        info!("trade stats stopping");
        if let Some(shutdown) = self.watcher_shutdown.take() {
            let _ = shutdown.send(()).await;
        }
        if let Some(shutdown) = self.flush_shutdown.take() {
            let _ = shutdown.send(()).await;
        }
        if let Some(task) = self.watcher_task.take() {
            if let Err(err) = task.await {
                warn!(%err, "trade watcher task error during shutdown");
            }
        }
        if let Some(task) = self.flush_task.take() {
            if let Err(err) = task.await {
                warn!(%err, "trade snapshot task error during shutdown");
            }
        }
        Self::flush_snapshot(&self.cache, std::path::Path::new(&self.config.trade_snapshot_path)).await;
        info!("trade stats stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.watcher_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn get_config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn token_cache_stats(&self) -> &crate::utils::token_cache::CacheStats {
        self.tokens.stats()
    }

    /// Apply one trade directly, resolving its quote volume first. The
    /// watcher uses the same path internally; this entry point serves tests
    /// and callers wiring their own delivery.
    pub async fn notify_trade(&self, trade: &crate::trade::Trade) {
        let volume_by_quote = self.tokens.quote_value(trade).await;
        self.cache.write().await.apply_trade(trade, volume_by_quote);
    }

    pub async fn query_volume(
        &self,
        relayer: Address,
        user_address: Address,
        base_tokens: &[Address],
        quote_token: Address,
        from: i64,
        to: i64,
        top: usize,
    ) -> Vec<UserVolume> {
        self.cache.read().await.query_volume(relayer, user_address, base_tokens, quote_token, from, to, top)
    }

    pub async fn query_24h_volume(
        &self,
        relayer: Address,
        user_address: Address,
        base_tokens: &[Address],
        quote_token: Address,
        top: usize,
    ) -> Vec<UserVolume> {
        self.cache.read().await.query_24h_volume(relayer, user_address, base_tokens, quote_token, top)
    }

    pub async fn query_total(
        &self,
        relayer: Address,
        base_tokens: &[Address],
        quote_token: Address,
        from: i64,
        to: i64,
    ) -> TradeVolume {
        self.cache.read().await.query_total(relayer, base_tokens, quote_token, from, to)
    }

    pub async fn top_relayer_user_pnl(
        &self,
        relayer: Address,
        base_token: Address,
        quote_token: Address,
        top: usize,
    ) -> Vec<UserPnL> {
        let base_decimals = self.tokens.token(base_token).await.map(|token| token.get_decimals());
        self.cache.read().await.top_relayer_user_pnl(relayer, base_token, quote_token, top, base_decimals)
    }

    pub async fn top_relayer_user_volume_by_pair(
        &self,
        relayer: Address,
        base_token: Address,
        quote_token: Address,
        from: i64,
        to: i64,
        top: usize,
    ) -> Vec<UserVolume> {
        self.cache.read().await.top_relayer_user_volume_by_pair(relayer, base_token, quote_token, from, to, top)
    }

    pub async fn number_users(&self, relayer: Address) -> usize {
        self.cache.read().await.number_users(relayer)
    }

    pub async fn number_traders_by_time(&self, relayer: Address, from: i64, to: i64, exclude_bots: bool) -> usize {
        self.cache.read().await.number_traders_by_time(relayer, from, to, exclude_bots)
    }
}

/// Builder for TradeStatsService to make wiring more ergonomic
pub struct TradeStatsServiceBuilder {
    config: Option<StatsConfig>,
    store: Option<Arc<dyn TradeStore>>,
    token_store: Option<Arc<dyn TokenStore>>,
}

impl TradeStatsServiceBuilder {
    pub fn new() -> Self {
        Self { config: None, store: None, token_store: None }
    }

    pub fn with_config(mut self, config: StatsConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn TradeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_token_store(mut self, token_store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(token_store);
        self
    }

    pub fn build(self) -> Result<TradeStatsService> {
        let config = self.config.unwrap_or_else(|| StatsConfig::from_env().unwrap_or_default());
        let store = self.store.ok_or_else(|| eyre::eyre!("trade store is required"))?;
        let token_store = self.token_store.ok_or_else(|| eyre::eyre!("token store is required"))?;
        Ok(TradeStatsService::new(config, store, token_store))
    }
}

impl Default for TradeStatsServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
