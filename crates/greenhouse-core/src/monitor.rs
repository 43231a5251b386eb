use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::MonitorConfig;
use crate::history::Sample;
use crate::normalizer::{Normalizer, ProbeReport};
use crate::snapshot::DashboardSnapshot;
use crate::state::DashboardState;
use crate::transport::{ControllerTransport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Round {
    Data,
    Status,
}

/// Dispatch order of one kind of round. A result is applied only if no round
/// dispatched after it has been applied already.
#[derive(Debug, Default)]
struct RoundOrder {
    dispatched: AtomicU64,
    applied: AtomicU64,
}

impl RoundOrder {
    fn dispatch(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Call only while holding the state write lock.
    fn admit(&self, seq: u64) -> bool {
        if seq < self.applied.load(Ordering::SeqCst) {
            return false;
        }
        self.applied.store(seq, Ordering::SeqCst);
        true
    }
}

struct Shared<T> {
    transport: T,
    normalizer: Normalizer,
    state: RwLock<DashboardState>,
    generation: AtomicU64,
    running: AtomicBool,
    data_order: RoundOrder,
    status_order: RoundOrder,
    request_timeout: Duration,
}

impl<T: ControllerTransport> Shared<T> {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn is_live(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.is_current(generation)
    }

    async fn call<R>(
        &self,
        request: impl Future<Output = Result<R, TransportError>>,
    ) -> Result<R, TransportError> {
        match timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn run(&self, round: Round, generation: u64) {
        match round {
            Round::Data => self.data_round(generation).await,
            Round::Status => self.status_round(generation).await,
        }
    }

    async fn data_round(&self, generation: u64) {
        let seq = self.data_order.dispatch();
        let result = self.call(self.transport.fetch_snapshot()).await;

        let mut state = self.state.write().await;
        if !self.is_current(generation) {
            debug!(generation, "dropping data result from a previous polling session");
            state.record_stale_drop();
            return;
        }
        if !self.data_order.admit(seq) {
            debug!(seq, "dropping data result overtaken by a newer round");
            state.record_stale_drop();
            return;
        }

        match result {
            Ok(raw) => {
                let normalized = self.normalizer.normalize(&raw, Utc::now());
                debug!(
                    nodes = normalized.readings.len(),
                    samples = normalized.samples.len(),
                    connected = normalized.node_seen,
                    "snapshot applied"
                );
                state.apply_snapshot(normalized);
            }
            Err(err) => {
                warn!(error = %err, "data fetch failed");
                state.apply_data_failure();
            }
        }
    }

    async fn status_round(&self, generation: u64) {
        let seq = self.status_order.dispatch();
        let result = self.call(self.transport.fetch_status()).await;

        let mut state = self.state.write().await;
        if !self.is_current(generation) {
            debug!(generation, "dropping status result from a previous polling session");
            state.record_stale_drop();
            return;
        }
        if !self.status_order.admit(seq) {
            debug!(seq, "dropping status result overtaken by a newer round");
            state.record_stale_drop();
            return;
        }

        match result {
            Ok(status) => {
                if status.alarm && !state.link().alarm {
                    warn!("controller raised the alarm flag");
                }
                state.apply_status(&status);
            }
            Err(err) => {
                warn!(error = %err, "status fetch failed, keeping last known status");
                state.record_status_failure();
            }
        }
    }
}

/// Drives the data and status endpoints on independent timers.
///
/// Every `start`/`stop` opens a new generation; a fetch only touches state
/// if the generation it was dispatched under is still current when it
/// completes.
pub struct Poller<T: ControllerTransport> {
    shared: Arc<Shared<T>>,
    config: MonitorConfig,
    timers: Vec<JoinHandle<()>>,
}

impl<T: ControllerTransport> Poller<T> {
    pub fn new(transport: T, catalog: Arc<Catalog>, config: MonitorConfig) -> Self {
        let shared = Shared {
            transport,
            normalizer: Normalizer::new(catalog.clone(), config.node_keys.clone()),
            state: RwLock::new(DashboardState::new(catalog, config.history)),
            generation: AtomicU64::new(0),
            running: AtomicBool::new(false),
            data_order: RoundOrder::default(),
            status_order: RoundOrder::default(),
            request_timeout: config.request_timeout,
        };

        Self {
            shared: Arc::new(shared),
            config,
            timers: Vec::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Restarting while running replaces the existing timers.
    pub fn start(&mut self) {
        self.cancel_timers();
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.running.store(true, Ordering::SeqCst);
        info!(
            generation,
            data_interval_ms = %self.config.data_interval.as_millis(),
            status_interval_ms = %self.config.status_interval.as_millis(),
            "polling started"
        );

        self.timers.push(spawn_timer(
            self.shared.clone(),
            generation,
            self.config.data_interval,
            Round::Data,
        ));
        self.timers.push(spawn_timer(
            self.shared.clone(),
            generation,
            self.config.status_interval,
            Round::Status,
        ));
    }

    /// In-flight fetches run to completion but their results are dropped.
    pub fn stop(&mut self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            info!("polling stopped");
        }
        self.cancel_timers();
    }

    /// One data round and one status round, independent of the timers.
    pub async fn refresh_now(&self) {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        tokio::join!(
            self.shared.run(Round::Data, generation),
            self.shared.run(Round::Status, generation),
        );
    }

    /// A status round only; data and timers are left alone.
    pub async fn refresh_status(&self) {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        self.shared.run(Round::Status, generation).await;
    }

    /// The local alarm flag only clears once a later status payload says so.
    pub async fn reset_alarm(&self) -> Result<(), TransportError> {
        if let Err(err) = self.shared.call(self.shared.transport.reset_alarm()).await {
            warn!(error = %err, "alarm reset rejected");
            return Err(err);
        }
        info!("alarm reset accepted, refreshing status");

        self.refresh_status().await;
        Ok(())
    }

    pub async fn probe(&self) -> Result<ProbeReport, TransportError> {
        let raw = self.shared.call(self.shared.transport.fetch_snapshot()).await?;
        Ok(self.shared.normalizer.probe(&raw))
    }

    pub fn set_base_address(&self, address: &str) {
        self.shared.transport.set_base_address(address);
        info!(controller = %self.shared.transport.base_address(), "controller address changed");
    }

    pub fn controller(&self) -> String {
        self.shared.transport.base_address()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.shared.normalizer.catalog()
    }

    pub async fn state(&self) -> RwLockReadGuard<'_, DashboardState> {
        self.shared.state.read().await
    }

    pub async fn dashboard(&self) -> DashboardSnapshot {
        let controller = self.controller();
        self.shared.state.read().await.snapshot(&controller)
    }

    pub async fn series(&self, node: &str, signal: &str, filter: &str) -> Vec<Sample> {
        self.shared.state.read().await.series(node, signal, filter)
    }

    fn cancel_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}

impl<T: ControllerTransport> Drop for Poller<T> {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

fn spawn_timer<T: ControllerTransport>(
    shared: Arc<Shared<T>>,
    generation: u64,
    period: Duration,
    round: Round,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !shared.is_live(generation) {
                debug!(?round, generation, "timer outlived its session");
                break;
            }

            let shared = shared.clone();
            tokio::spawn(async move {
                shared.run(round, generation).await;
            });
        }
    })
}
