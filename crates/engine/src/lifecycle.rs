use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use common::{
    EngineState, EngineStatus, Error, IndicatorState, PriceSample, PriceSource, Result, Signal,
    TradeRecord,
};
use risk::PositionManager;
use strategy::{evaluate, IndicatorTracker, StrategyConfig};

use crate::config_store::ConfigStore;
use crate::executor::ExecutionAdapter;
use crate::ledger::Ledger;
use crate::market_data::MarketData;

/// State read by the control surface while a cycle may be in flight.
/// Every access goes through the one `RwLock` around it.
struct Shared {
    config: StrategyConfig,
    status: EngineStatus,
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Fewer than `indicator_window` samples seen; trading skipped.
    Collecting,
    Held(Signal),
    Traded(TradeRecord),
    /// The cycle aborted; prior position state is intact.
    Failed(String),
}

/// Cloneable handle passed to the API layer.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<RwLock<Shared>>,
    store: ConfigStore,
    cancel: CancellationToken,
}

impl EngineHandle {
    pub async fn status(&self) -> EngineStatus {
        self.shared.read().await.status.clone()
    }

    pub async fn config(&self) -> StrategyConfig {
        self.shared.read().await.config.clone()
    }

    /// Validate, persist and apply a candidate config. On any failure the
    /// config in effect is left untouched. Returns non-blocking advisories.
    pub async fn save_config(&self, candidate: StrategyConfig) -> Result<Vec<String>> {
        candidate.validate()?;
        let advisories = candidate.advisories();
        for hint in &advisories {
            warn!(advisory = %hint, "Strategy config advisory");
        }

        let mut shared = self.shared.write().await;
        self.store.save(&candidate).await?;
        info!(config = ?candidate, "Strategy config saved");
        shared.config = candidate;
        Ok(advisories)
    }

    /// Re-read the config store and apply it. Keeps the current config when
    /// nothing has been stored yet.
    pub async fn reload_config(&self) -> Result<StrategyConfig> {
        let mut shared = self.shared.write().await;
        if let Some(config) = self.store.load().await? {
            if config != shared.config {
                info!(config = ?config, "Strategy config reloaded");
            }
            shared.config = config;
        }
        Ok(shared.config.clone())
    }

    /// Request an orderly stop. Takes effect at the next cycle boundary.
    pub fn stop(&self) {
        info!("Stop requested");
        self.cancel.cancel();
    }

    pub fn is_stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Everything the control loop needs, assembled by the binary.
pub struct EngineParts {
    pub symbol: String,
    pub config: StrategyConfig,
    pub positions: PositionManager,
    pub price_source: Arc<dyn PriceSource>,
    pub executor: ExecutionAdapter,
    pub ledger: Ledger,
    pub market_data: MarketData,
    pub store: ConfigStore,
    pub price_timeout: Duration,
}

/// The control loop: owns the indicator tracker and the position manager
/// and runs one cycle at a time until stopped.
pub struct Engine {
    symbol: String,
    shared: Arc<RwLock<Shared>>,
    tracker: IndicatorTracker,
    positions: PositionManager,
    price_source: Arc<dyn PriceSource>,
    executor: ExecutionAdapter,
    ledger: Ledger,
    market_data: MarketData,
    /// Filled trades the ledger has not accepted yet, oldest first.
    unrecorded: VecDeque<TradeRecord>,
    store: ConfigStore,
    cancel: CancellationToken,
    price_timeout: Duration,
}

impl Engine {
    pub fn new(parts: EngineParts) -> (Self, EngineHandle) {
        let status = EngineStatus::new(&parts.symbol, parts.positions.position().clone());
        let shared = Arc::new(RwLock::new(Shared {
            status,
            config: parts.config.clone(),
        }));
        let cancel = CancellationToken::new();

        let handle = EngineHandle {
            shared: shared.clone(),
            store: parts.store.clone(),
            cancel: cancel.clone(),
        };

        let engine = Engine {
            symbol: parts.symbol,
            shared,
            tracker: IndicatorTracker::new(parts.config.indicator_window),
            positions: parts.positions,
            price_source: parts.price_source,
            executor: parts.executor,
            ledger: parts.ledger,
            market_data: parts.market_data,
            unrecorded: VecDeque::new(),
            store: parts.store,
            cancel,
            price_timeout: parts.price_timeout,
        };

        (engine, handle)
    }

    /// Fold the most recent stored samples into the tracker so a restart
    /// does not begin with a full collection period. Returns how many
    /// samples were replayed.
    pub async fn warm_up(&mut self) -> Result<usize> {
        let points = self.market_data.recent(self.tracker.window()).await?;
        let Some(newest) = points.last() else {
            return Ok(0);
        };
        let (newest_price, newest_at) = (newest.price, newest.timestamp);

        let mut state = IndicatorState::default();
        for point in &points {
            state = self.tracker.update(point.price);
        }

        let mut shared = self.shared.write().await;
        shared.status.indicators = state;
        shared.status.collecting = self.tracker.is_collecting();
        shared.status.last_price = Some(newest_price);
        shared.status.unrealized_pnl_pct = self.positions.position().unrealized_pnl_pct(newest_price);
        info!(
            samples = points.len(),
            window = self.tracker.window(),
            newest = %newest_at,
            collecting = shared.status.collecting,
            "Indicators warmed from stored samples"
        );
        Ok(points.len())
    }

    /// Run cycles until stopped. Call from `tokio::spawn`.
    ///
    /// The next cycle starts `loop_interval_secs` after the previous one
    /// finished, so cycles never overlap.
    pub async fn run(mut self) {
        self.shared.write().await.status.status = EngineState::Running;
        info!(symbol = %self.symbol, "Control loop started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if let CycleOutcome::Traded(record) = self.run_cycle().await {
                info!(
                    side = %record.side,
                    price = record.price,
                    qty = record.quantity,
                    notional = record.notional(),
                    reason = %record.reason,
                    "Trade recorded"
                );
            }

            let interval = Duration::from_secs(self.shared.read().await.config.loop_interval_secs);
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        if let Err(e) = self.flush_unrecorded().await {
            error!(
                pending = self.unrecorded.len(),
                records = ?self.unrecorded,
                error = %e,
                "Stopping with executed trades missing from history"
            );
        }

        self.shared.write().await.status.status = EngineState::Stopped;
        info!("Control loop stopped");
    }

    /// Run exactly one cycle. Never panics on a bad cycle: failures are
    /// logged, recorded in `last_error` and returned as `Failed`.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let result = self.cycle().await;
        let backlog = self.unrecorded.len();

        let mut shared = self.shared.write().await;
        let status = &mut shared.status;
        status.cycle_count += 1;
        status.unrecorded_trades = backlog;
        status.updated_at = Some(Utc::now());
        status.position = self.positions.position().clone();
        status.unrealized_pnl_pct = status
            .last_price
            .and_then(|p| self.positions.position().unrealized_pnl_pct(p));

        match result {
            Ok(outcome) => {
                status.last_error = (backlog > 0)
                    .then(|| format!("{backlog} executed trade(s) not yet recorded in history"));
                outcome
            }
            Err(e) => {
                match &e {
                    Error::Transient(_) => warn!(kind = e.kind(), error = %e, "Cycle skipped"),
                    _ => error!(kind = e.kind(), error = %e, "Cycle failed"),
                }
                let message = e.to_string();
                status.last_error = Some(message.clone());
                CycleOutcome::Failed(message)
            }
        }
    }

    async fn cycle(&mut self) -> Result<CycleOutcome> {
        let config = self.refresh_config().await;

        if !self.unrecorded.is_empty() {
            match self.flush_unrecorded().await {
                Ok(()) => info!("Queued trade records written to history"),
                Err(e) => warn!(pending = self.unrecorded.len(), error = %e, "Trade records still not written"),
            }
        }

        let sample = self.fetch_price().await?;
        let price = sample.price;
        let state = self.tracker.update(price);
        let collecting = self.tracker.is_collecting();

        if let Err(e) = self.market_data.append(&sample, &state).await {
            warn!(error = %e, "Could not store price sample");
        }

        {
            let mut shared = self.shared.write().await;
            let status = &mut shared.status;
            status.last_price = Some(price);
            status.indicators = state;
            status.collecting = collecting;
            if collecting {
                status.last_signal = Signal::Hold;
            }
        }

        let signal = if collecting {
            info!(
                samples = state.sample_count,
                window = self.tracker.window(),
                "Collecting price samples"
            );
            Signal::Hold
        } else {
            let signal = evaluate(&state, &config);
            self.shared.write().await.status.last_signal = signal;
            signal
        };

        // Stop-loss and take-profit need only the entry price, so they stay
        // armed while collecting.
        let decision = self.positions.decide(price, signal, &config);
        let Some(side) = decision.side() else {
            return Ok(if collecting {
                CycleOutcome::Collecting
            } else {
                CycleOutcome::Held(signal)
            });
        };

        info!(?decision, price, rsi = ?state.rsi, histogram = ?state.macd_histogram, "Trade decision");
        let fill = self.executor.execute(side, decision.quantity()).await?;
        let record = self
            .positions
            .apply_fill(&fill, decision.reason(), config.trade_size)?;

        self.unrecorded.push_back(record.clone());
        if let Err(e) = self.flush_unrecorded().await {
            error!(
                error = %e,
                side = %record.side,
                price = record.price,
                pending = self.unrecorded.len(),
                "Trade executed but not recorded, will retry next cycle"
            );
            return Err(e);
        }
        Ok(CycleOutcome::Traded(record))
    }

    /// Write queued records oldest first, stopping at the first failure so
    /// history order matches execution order.
    async fn flush_unrecorded(&mut self) -> Result<()> {
        while let Some(record) = self.unrecorded.front() {
            self.ledger.append(record).await?;
            self.unrecorded.pop_front();
        }
        Ok(())
    }

    /// Hot-reload point. Picks up config written to the store by another
    /// process; a store failure keeps the config already in effect.
    async fn refresh_config(&mut self) -> StrategyConfig {
        let mut shared = self.shared.write().await;
        match self.store.load().await {
            Ok(Some(stored)) if stored != shared.config => {
                info!("Strategy config changed in store, applying");
                shared.config = stored;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Could not read stored config, keeping current"),
        }

        let window = shared.config.indicator_window;
        if window != self.tracker.window() {
            info!(
                from = self.tracker.window(),
                to = window,
                "Indicator window changed, restarting collection"
            );
            self.tracker = IndicatorTracker::new(window);
        }
        shared.config.clone()
    }

    async fn fetch_price(&self) -> Result<PriceSample> {
        let price = tokio::time::timeout(
            self.price_timeout,
            self.price_source.latest_price(&self.symbol),
        )
        .await
        .map_err(|_| {
            Error::Transient(format!(
                "price fetch timed out after {}s",
                self.price_timeout.as_secs_f64()
            ))
        })??;

        if !price.is_finite() || price <= 0.0 {
            return Err(Error::Transient(format!("invalid price {price} for {}", self.symbol)));
        }
        let sample = PriceSample::now(price);
        debug!(symbol = %self.symbol, price, at = %sample.timestamp, "Price sample");
        Ok(sample)
    }
}
