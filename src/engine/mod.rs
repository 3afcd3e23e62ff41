use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::admission::{day_start, AdmissionController};
use crate::broadcast::Broadcaster;
use crate::collector::{MarketCollector, MarketDataProvider};
use crate::detectors::DetectorSet;
use crate::errors::Result;
use crate::models::SystemStats;
use crate::store::{AlertFilter, AlertStore, MetricStore};
use crate::utils::Config;

/// Snapshot of the engine's lifecycle state
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub is_running: bool,
    pub connected_subscribers: usize,
    pub uptime_seconds: u64,
}

struct EngineState {
    running: bool,
    started_at: Option<Instant>,
    tasks: Vec<JoinHandle<()>>,
}

/// Process-wide controller for the alerting pipeline.
///
/// Owns the collection, detection and stats cadences and the start/stop
/// lifecycle. Constructed once by the owning process; every collaborator
/// is injected explicitly so tests can substitute fakes. Two states:
/// Stopped (initial) and Running; `start`/`stop` are idempotent.
#[derive(Clone)]
pub struct AlertEngine {
    config: Config,
    alert_store: Arc<dyn AlertStore>,
    collector: Arc<MarketCollector>,
    detectors: Arc<DetectorSet>,
    admission: Arc<AdmissionController>,
    broadcaster: Broadcaster,
    state: Arc<RwLock<EngineState>>,
}

impl AlertEngine {
    pub fn new(
        config: Config,
        metric_store: Arc<dyn MetricStore>,
        alert_store: Arc<dyn AlertStore>,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Self {
        let collector = Arc::new(MarketCollector::new(
            provider,
            Arc::clone(&metric_store),
            config.collection_timeout(),
            config.top_coins_limit,
        ));
        let detectors = Arc::new(DetectorSet::new(&config, Arc::clone(&metric_store)));
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&alert_store),
            config.cooldown_hours.clone(),
            config.max_alerts_per_symbol_per_day,
            config.max_global_alerts_per_day,
        ));

        Self {
            config,
            alert_store,
            collector,
            detectors,
            admission,
            broadcaster: Broadcaster::new(),
            state: Arc::new(RwLock::new(EngineState {
                running: false,
                started_at: None,
                tasks: Vec::new(),
            })),
        }
    }

    /// Real-time channel endpoint for subscribers
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Start the pipeline: one immediate full pass, then the three
    /// recurring timers. No-op with a warning when already running.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.running {
                warn!("Alert engine already running, ignoring start()");
                return Ok(());
            }

            info!(
                "Starting alert engine (collection {:?}, detection {:?}, stats {:?})",
                self.config.collection_interval(),
                self.config.detection_interval(),
                self.config.stats_interval()
            );

            let collection =
                self.spawn_cycle(self.config.collection_interval(), CycleKind::Collection);
            let detection = self.spawn_cycle(self.config.detection_interval(), CycleKind::Detection);
            let stats = self.spawn_cycle(self.config.stats_interval(), CycleKind::Stats);

            state.tasks = vec![collection, detection, stats];
            state.started_at = Some(Instant::now());
            state.running = true;
        }

        // Immediate first pass; the spawned timers only fire after one
        // full period
        self.run_collection_cycle().await;
        self.run_detection_cycle().await;
        self.run_stats_cycle().await;

        Ok(())
    }

    /// Cancel all timers and return to Stopped. No-op with a warning when
    /// already stopped; there is no automatic restart afterwards.
    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        if !state.running {
            warn!("Alert engine not running, ignoring stop()");
            return;
        }

        for task in state.tasks.drain(..) {
            task.abort();
        }
        state.running = false;
        state.started_at = None;

        info!("Alert engine stopped");
    }

    pub async fn status(&self) -> EngineStatus {
        let state = self.state.read().await;
        EngineStatus {
            is_running: state.running,
            connected_subscribers: self.broadcaster.subscriber_count().await,
            uptime_seconds: state
                .started_at
                .map(|t| t.elapsed().as_secs())
                .unwrap_or(0),
        }
    }

    fn spawn_cycle(&self, period: std::time::Duration, kind: CycleKind) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // An overrunning cycle skips the next occurrence instead of
            // queueing it
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The immediate pass already ran in start(); consume the
            // interval's instant first tick
            interval.tick().await;

            loop {
                interval.tick().await;
                match kind {
                    CycleKind::Collection => engine.run_collection_cycle().await,
                    CycleKind::Detection => engine.run_detection_cycle().await,
                    CycleKind::Stats => engine.run_stats_cycle().await,
                }
            }
        })
    }

    /// Collection cycle: pull fresh snapshots, then push the aggregate
    /// market view. Failure is reflected in the next stats broadcast and
    /// retried only on the next tick.
    async fn run_collection_cycle(&self) {
        match self.collector.collect().await {
            Ok(overview) => self.broadcaster.broadcast_market_snapshot(overview).await,
            Err(e) => error!("Collection cycle failed: {}", e),
        }
    }

    /// Detection cycle: detectors -> admission -> persist -> broadcast
    async fn run_detection_cycle(&self) {
        let candidates = self.detectors.run().await;
        if candidates.is_empty() {
            debug!("Detection cycle produced no candidates");
            return;
        }

        match self.admission.admit(candidates).await {
            Ok(admitted) if !admitted.is_empty() => {
                self.broadcaster.broadcast_alerts(&admitted).await;
            }
            Ok(_) => {}
            // This cycle's candidates are lost; nothing is re-queued
            Err(e) => error!("Admission failed, dropping cycle's candidates: {}", e),
        }
    }

    async fn run_stats_cycle(&self) {
        let stats = match self.system_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Stats cycle failed: {}", e);
                return;
            }
        };

        self.broadcaster.broadcast_system_stats(stats).await;
    }

    pub async fn system_stats(&self) -> Result<SystemStats> {
        let now = Utc::now();
        let alerts_today = self
            .alert_store
            .count(AlertFilter::since(day_start(now)))
            .await?;
        let health = self.collector.health().await;
        let state = self.state.read().await;

        Ok(SystemStats {
            alerts_today,
            data_collection_status: health.status,
            last_collection: health.last_collection,
            connected_subscribers: self.broadcaster.subscriber_count().await,
            uptime_seconds: state
                .started_at
                .map(|t| t.elapsed().as_secs())
                .unwrap_or(0),
            timestamp: now,
        })
    }
}

#[derive(Clone, Copy)]
enum CycleKind {
    Collection,
    Detection,
    Stats,
}
