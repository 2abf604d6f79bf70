//! # Scheduler
//! One cooperative loop driving the three periodic tasks: freshness check,
//! reliability recompute, and report generation. Ticks run sequentially on
//! the loop, so a slow report never overlaps a freshness check — overlap
//! policy is deliberate, not an accident of independent timers.
//!
//! Explicit lifecycle: `start` spawns the loop (idempotent only after a
//! `stop`), `stop` is the only teardown path.

use std::sync::{Arc, Mutex};

use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::completeness::CompletenessMonitor;
use crate::config::SchedulerConfig;
use crate::freshness::FreshnessMonitor;
use crate::notify::{AlertEvent, NotifierMux};
use crate::reliability::ReliabilityScorer;
use crate::report::ReportService;

pub struct Scheduler {
    freshness: Arc<FreshnessMonitor>,
    completeness: Arc<CompletenessMonitor>,
    scorer: Arc<ReliabilityScorer>,
    reporter: Arc<ReportService>,
    notifier: NotifierMux,
    cfg: SchedulerConfig,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        freshness: Arc<FreshnessMonitor>,
        completeness: Arc<CompletenessMonitor>,
        scorer: Arc<ReliabilityScorer>,
        reporter: Arc<ReportService>,
        notifier: NotifierMux,
        cfg: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            freshness,
            completeness,
            scorer,
            reporter,
            notifier,
            cfg,
            handle: Mutex::new(None),
        })
    }

    /// Spawn the scheduling loop. A second `start` without an intervening
    /// `stop` is a logged no-op.
    pub fn start(self: &Arc<Self>) {
        let mut guard = self.lock_handle();
        if guard.is_some() {
            tracing::warn!("scheduler already running, start ignored");
            return;
        }
        let this = Arc::clone(self);
        *guard = Some(tokio::spawn(async move { this.run_loop().await }));
        tracing::info!(
            freshness_secs = self.cfg.freshness_secs,
            reliability_secs = self.cfg.reliability_secs,
            report_secs = self.cfg.report_secs,
            "scheduler started"
        );
    }

    /// Cancel the loop. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(handle) = self.lock_handle().take() {
            handle.abort();
            tracing::info!("scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_handle().is_some()
    }

    async fn run_loop(self: Arc<Self>) {
        let mut freshness = interval(Duration::from_secs(self.cfg.freshness_secs));
        let mut reliability = interval(Duration::from_secs(self.cfg.reliability_secs));
        let mut report = interval(Duration::from_secs(self.cfg.report_secs));
        for t in [&mut freshness, &mut reliability, &mut report] {
            t.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the immediate first tick.
            t.reset();
        }

        loop {
            tokio::select! {
                _ = freshness.tick() => self.tick_freshness().await,
                _ = reliability.tick() => self.tick_reliability(),
                _ = report.tick() => self.tick_report(),
            }
        }
    }

    /// Freshness task: scan sources, forward any staleness anomalies.
    pub async fn tick_freshness(&self) {
        counter!("feedpulse_scheduler_ticks_total", "task" => "freshness").increment(1);
        let raised = self.freshness.check_freshness();
        if !raised.is_empty() {
            tracing::info!(stale = raised.len(), "freshness check flagged sources");
        }
        for anomaly in &raised {
            self.notifier.notify(&AlertEvent::from(anomaly)).await;
        }
    }

    /// Reliability task: refresh completeness scores, then recompute.
    pub fn tick_reliability(&self) {
        counter!("feedpulse_scheduler_ticks_total", "task" => "reliability").increment(1);
        let gaps = self.completeness.sweep();
        if !gaps.is_empty() {
            tracing::info!(gaps = gaps.len(), "completeness sweep found gaps");
        }
        let updated = self.scorer.recompute_all();
        tracing::debug!(sources = updated.len(), "reliability scores recomputed");
    }

    /// Report task: generate and log the periodic summary.
    pub fn tick_report(&self) {
        counter!("feedpulse_scheduler_ticks_total", "task" => "report").increment(1);
        let report = self.reporter.generate();
        gauge!("feedpulse_report_avg_score").set(report.summary.avg_score);
        tracing::info!(
            total_sources = report.summary.total_sources,
            avg_score = report.summary.avg_score,
            total_anomalies = report.total_anomalies,
            "periodic report generated"
        );
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().expect("scheduler handle mutex poisoned")
    }
}
