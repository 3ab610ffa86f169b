// src/scrape/scheduler.rs
//
// Supervises the scrape loop: Stopped/Running lifecycle, an immediate first
// attempt on start, a repeating timer for subsequent attempts, bounded retry
// with a fixed delay, durable run statistics, and observer notifications.
//
// Retry is a plain loop over an attempt counter rather than re-scheduling
// itself, so termination is visible in one screen of code.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::BackendApi;
use crate::scrape::events::{EventKind, EventListener, ListenerRegistry, SchedulerEvent};
use crate::scrape::state::{self, SchedulerState};
use crate::scrape::types::ScrapeCycle;

#[derive(Debug, Clone)]
pub struct SchedulerCfg {
    pub interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub state_path: PathBuf,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30 * 60),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            state_path: PathBuf::from("scraper_state.json"),
        }
    }
}

/// Point-in-time statistics snapshot, also the `/scraper/stats` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub is_running: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub articles_this_cycle: u64,
    pub last_error: Option<String>,
}

pub struct ScraperScheduler {
    runner: Arc<dyn ScrapeCycle>,
    backend: Arc<dyn BackendApi>,
    cfg: SchedulerCfg,
    state: Mutex<SchedulerState>,
    running: AtomicBool,
    listeners: ListenerRegistry,
    // One Notify per armed timer so a stop() issued while no timer exists
    // cannot leave a stale permit behind for the next start().
    shutdown: Mutex<Option<Arc<Notify>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ScraperScheduler {
    pub fn new(runner: Arc<dyn ScrapeCycle>, backend: Arc<dyn BackendApi>, cfg: SchedulerCfg) -> Self {
        let state = state::load(&cfg.state_path);
        Self {
            runner,
            backend,
            cfg,
            state: Mutex::new(state),
            running: AtomicBool::new(false),
            listeners: ListenerRegistry::new(),
            shutdown: Mutex::new(None),
            timer: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Register an observer for one event kind. Delivery is synchronous at
    /// the emission site.
    pub fn on(&self, kind: EventKind, listener: EventListener) {
        self.listeners.on(kind, listener);
    }

    /// Pure read of current statistics.
    pub fn get_stats(&self) -> SchedulerStats {
        let st = self.state.lock().expect("state mutex poisoned");
        self.stats_snapshot(&st)
    }

    /// Transition to Running: one immediate attempt, then the repeating
    /// timer. Calling while already Running is a logged no-op.
    pub async fn start(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("scheduler already running");
            return;
        }
        info!(
            interval_secs = self.cfg.interval.as_secs(),
            "starting scrape scheduler"
        );

        self.execute_scrape().await;
        Self::arm_timer(&self);
        self.push_status().await;
    }

    /// Transition to Stopped. An attempt already in flight completes and its
    /// statistics are recorded; no new attempt starts after this returns.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            info!("scheduler not running");
            return;
        }
        if let Some(notify) = self.shutdown.lock().expect("shutdown mutex poisoned").take() {
            notify.notify_one();
        }
        self.timer.lock().expect("timer mutex poisoned").take();
        info!("scheduler stopped");
        self.push_status().await;
    }

    /// Run one attempt outside the timer cadence. Does not touch the timer
    /// or the Running flag.
    pub async fn trigger_manual_scrape(&self) {
        info!("manual scrape triggered");
        self.execute_scrape().await;
        self.listeners.emit(&SchedulerEvent::ManualTrigger {
            timestamp: Utc::now(),
        });
    }

    fn arm_timer(this: &Arc<Self>) {
        // start() may have been raced by stop() during the first attempt.
        if !this.is_running() {
            return;
        }
        this.record_next_run();

        let notify = Arc::new(Notify::new());
        *this.shutdown.lock().expect("shutdown mutex poisoned") = Some(notify.clone());

        let sched = Arc::clone(this);
        let handle = tokio::spawn(async move {
            let period = sched.cfg.interval;
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !sched.is_running() {
                            break;
                        }
                        sched.execute_scrape().await;
                        if sched.is_running() {
                            sched.record_next_run();
                        }
                    }
                    _ = notify.notified() => break,
                }
            }
            debug!("scrape timer task exited");
        });
        *this.timer.lock().expect("timer mutex poisoned") = Some(handle);
    }

    /// One scrape attempt with bounded retry. Each retry counts as its own
    /// run; per-source fetch failures never reach this level, so the Err arm
    /// is a safety net for unexpected faults.
    async fn execute_scrape(&self) {
        let max_attempts = self.cfg.max_retries.max(1);
        let mut attempt: u32 = 0;
        loop {
            debug!(attempt = attempt + 1, max_attempts, "scrape attempt");
            {
                let mut st = self.state.lock().expect("state mutex poisoned");
                st.last_run = Some(Utc::now());
                st.total_runs += 1;
                state::save(&self.cfg.state_path, &st);
            }

            match self.runner.run_cycle().await {
                Ok(outcome) => {
                    let stats = {
                        let mut st = self.state.lock().expect("state mutex poisoned");
                        st.successful_runs += 1;
                        st.articles_this_cycle = outcome.accepted.len() as u64;
                        st.last_error = None;
                        state::save(&self.cfg.state_path, &st);
                        self.stats_snapshot(&st)
                    };
                    info!(
                        articles = stats.articles_this_cycle,
                        "scrape cycle complete"
                    );
                    let articles_added = stats.articles_this_cycle;
                    let timestamp = stats.last_run.unwrap_or_else(Utc::now);
                    self.listeners.emit(&SchedulerEvent::CycleComplete {
                        articles_added,
                        timestamp,
                        stats,
                    });
                    return;
                }
                Err(e) => {
                    warn!(error = ?e, attempt = attempt + 1, "scrape cycle failed");
                    {
                        let mut st = self.state.lock().expect("state mutex poisoned");
                        st.failed_runs += 1;
                        st.last_error = Some(e.to_string());
                        state::save(&self.cfg.state_path, &st);
                    }
                    if attempt + 1 < max_attempts {
                        attempt += 1;
                        tokio::time::sleep(self.cfg.retry_delay).await;
                        continue;
                    }
                    self.listeners.emit(&SchedulerEvent::Error {
                        error: e.to_string(),
                        retry_count: attempt,
                        timestamp: Utc::now(),
                    });
                    return;
                }
            }
        }
    }

    fn record_next_run(&self) {
        let delta = chrono::Duration::from_std(self.cfg.interval)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let mut st = self.state.lock().expect("state mutex poisoned");
        st.next_run = Some(Utc::now() + delta);
        state::save(&self.cfg.state_path, &st);
    }

    /// Best-effort status report to the backend; failures are logged only.
    async fn push_status(&self) {
        let last_error = {
            let st = self.state.lock().expect("state mutex poisoned");
            st.last_error.clone()
        };
        if let Err(e) = self
            .backend
            .update_status(self.is_running(), last_error.as_deref())
            .await
        {
            warn!(error = ?e, "backend status update failed");
        }
    }

    fn stats_snapshot(&self, st: &SchedulerState) -> SchedulerStats {
        SchedulerStats {
            is_running: self.is_running(),
            last_run: st.last_run,
            next_run: st.next_run,
            total_runs: st.total_runs,
            successful_runs: st.successful_runs,
            failed_runs: st.failed_runs,
            articles_this_cycle: st.articles_this_cycle,
            last_error: st.last_error.clone(),
        }
    }
}
