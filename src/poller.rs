//! Reconciliation poller.
//!
//! Case creation and its appearance in the read-model service are
//! asynchronous: right after a submission the new case is usually not
//! visible on any read path. The poller bridges that gap client-side by
//! re-running the resolution chain on a bounded retry schedule, instead of
//! requiring the backend to offer synchronous consistency.
//!
//! One poller instance serves one dashboard view. Cancellation is
//! cooperative: tearing down the view cancels the token, which aborts any
//! pending retry timer and makes in-flight results land without effect.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, Ordering},
};

use tokio::{
    sync::watch,
    time::{self, Duration, MissedTickBehavior},
};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use crate::{
    config::PollerConfig,
    projection::{self, CaseSummary},
    resolve::CaseResolver,
    session::SessionProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Loading,
    Found,
    Retrying,
    Exhausted,
}

/// What started a load cycle. Only submissions arm the retry schedule:
/// plain navigation or a manual refresh settle after a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTrigger {
    Navigation,
    ManualRefresh,
    Submission { case_id: Option<String> },
}

impl LoadTrigger {
    fn is_submission(&self) -> bool {
        matches!(self, Self::Submission { .. })
    }

    fn case_id(&self) -> Option<&str> {
        match self {
            Self::Submission { case_id } => case_id.as_deref(),
            _ => None,
        }
    }
}

/// Published view state. The embedding UI renders from this and nothing
/// else; it is only ever mutated by the poller that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub phase: PollPhase,
    pub attempt: u32,
    pub application: Option<CaseSummary>,
    /// Success signal after a submission became visible; auto-clears.
    pub submission_visible: bool,
    /// Raised on a 401: the external session layer owns the redirect.
    pub auth_required: bool,
}

impl DashboardSnapshot {
    fn idle() -> Self {
        Self {
            phase: PollPhase::Idle,
            attempt: 0,
            application: None,
            submission_visible: false,
            auth_required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Found,
    Exhausted,
    AuthRequired,
    Cancelled,
    /// Another load was already in flight; this one was dropped, not queued.
    Skipped,
}

enum LoadOutcome {
    Found(Box<CaseSummary>),
    Missing,
    AuthRequired,
}

/// Delay before re-entering `Loading` after a miss: grows linearly from the
/// base and saturates at the cap.
pub fn retry_delay(config: &PollerConfig, attempt: u32) -> Duration {
    let scaled = config
        .retry_base_ms
        .saturating_mul(u64::from(attempt) + 1)
        .min(config.retry_cap_ms);
    Duration::from_millis(scaled)
}

pub struct ReconciliationPoller {
    resolver: CaseResolver,
    session: Arc<dyn SessionProvider>,
    config: PollerConfig,
    cancel: CancellationToken,
    snapshot_tx: Arc<watch::Sender<DashboardSnapshot>>,
    attempt: AtomicU32,
    in_flight: AtomicBool,
}

impl ReconciliationPoller {
    pub fn new(
        resolver: CaseResolver,
        session: Arc<dyn SessionProvider>,
        config: PollerConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(DashboardSnapshot::idle());
        Self {
            resolver,
            session,
            config,
            cancel: CancellationToken::new(),
            snapshot_tx: Arc::new(snapshot_tx),
            attempt: AtomicU32::new(0),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Snapshot changes as a stream, for UI layers that consume streams.
    pub fn snapshots(&self) -> WatchStream<DashboardSnapshot> {
        WatchStream::new(self.snapshot_tx.subscribe())
    }

    /// Cooperative teardown. After this, no state transition is ever
    /// published again and pending retry timers are discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs one load cycle. For submission triggers this loops through the
    /// retry schedule until the case is visible or the budget is spent;
    /// other triggers settle after a single resolution attempt.
    pub async fn run_cycle(&self, trigger: LoadTrigger) -> CycleOutcome {
        if self.cancel.is_cancelled() {
            return CycleOutcome::Cancelled;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!(target: "poller", "load_skipped_already_in_flight");
            return CycleOutcome::Skipped;
        }
        let outcome = self.drive(&trigger).await;
        self.in_flight.store(false, Ordering::SeqCst);
        self.attempt.store(0, Ordering::SeqCst);
        outcome
    }

    async fn drive(&self, trigger: &LoadTrigger) -> CycleOutcome {
        self.attempt.store(0, Ordering::SeqCst);
        loop {
            let attempt = self.attempt.load(Ordering::SeqCst);
            self.publish(|snapshot| {
                snapshot.phase = PollPhase::Loading;
                snapshot.attempt = attempt;
            });

            let loaded = self.load_once(trigger.case_id()).await;
            if self.cancel.is_cancelled() {
                // In-flight result discarded; the view is gone.
                return CycleOutcome::Cancelled;
            }

            match loaded {
                LoadOutcome::Found(summary) => {
                    let signal = trigger.is_submission();
                    self.publish(move |snapshot| {
                        snapshot.phase = PollPhase::Found;
                        snapshot.application = Some(*summary);
                        snapshot.submission_visible = signal;
                    });
                    if signal {
                        self.schedule_signal_clear();
                    }
                    return CycleOutcome::Found;
                }
                LoadOutcome::AuthRequired => {
                    self.publish(|snapshot| {
                        snapshot.phase = PollPhase::Exhausted;
                        snapshot.auth_required = true;
                    });
                    return CycleOutcome::AuthRequired;
                }
                LoadOutcome::Missing => {
                    if trigger.is_submission() && attempt < self.config.max_attempts {
                        let delay = retry_delay(&self.config, attempt);
                        self.attempt.store(attempt + 1, Ordering::SeqCst);
                        self.publish(|snapshot| {
                            snapshot.phase = PollPhase::Retrying;
                            snapshot.attempt = attempt + 1;
                        });
                        tracing::debug!(
                            target: "poller",
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "reconciliation_retry_scheduled"
                        );
                        tokio::select! {
                            () = self.cancel.cancelled() => return CycleOutcome::Cancelled,
                            () = time::sleep(delay) => {}
                        }
                        continue;
                    }

                    // Soft failure: settle into "no application found"
                    // rather than a hard error. Usually just replication
                    // lag; a manual refresh stays available.
                    self.publish(|snapshot| snapshot.phase = PollPhase::Exhausted);
                    return CycleOutcome::Exhausted;
                }
            }
        }
    }

    /// Periodic re-check loop. Runs until cancelled; each tick performs a
    /// single resolution attempt and never arms the retry schedule.
    pub async fn run_background(&self) {
        let interval = Duration::from_millis(self.config.background_interval_ms);
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; consume it
        // so re-checks start one interval after view mount.
        ticker.tick().await;
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            self.background_tick().await;
        }
    }

    /// One background re-check. Skipped outright while a retry cycle is
    /// active or another load is in flight; concurrent loads are dropped,
    /// never queued. Returns whether a record was applied.
    pub async fn background_tick(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if self.attempt.load(Ordering::SeqCst) > 0 {
            tracing::debug!(target: "poller", "background_skip_retry_active");
            return false;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!(target: "poller", "background_skip_load_in_flight");
            return false;
        }

        let loaded = self.load_once(None).await;
        let applied = if self.cancel.is_cancelled() {
            false
        } else {
            match loaded {
                LoadOutcome::Found(summary) => {
                    self.publish(move |snapshot| {
                        snapshot.phase = PollPhase::Found;
                        snapshot.application = Some(*summary);
                    });
                    true
                }
                LoadOutcome::AuthRequired => {
                    self.publish(|snapshot| snapshot.auth_required = true);
                    false
                }
                // No Retrying/Exhausted transitions from the background.
                LoadOutcome::Missing => false,
            }
        };
        self.in_flight.store(false, Ordering::SeqCst);
        applied
    }

    async fn load_once(&self, case_id: Option<&str>) -> LoadOutcome {
        let identity = self.session.current().await;
        let email = (!identity.email.trim().is_empty()).then_some(identity.email.as_str());

        match self.resolver.resolve_case(case_id, email).await {
            Ok(Some(record)) => LoadOutcome::Found(Box::new(projection::project(&record))),
            Ok(None) => LoadOutcome::Missing,
            Err(err) if err.is_authentication() => {
                tracing::warn!(target: "poller", error = %err, "session_rejected");
                LoadOutcome::AuthRequired
            }
            Err(err) => {
                // Unexpected failure: loud in the log, but for retry
                // purposes indistinguishable from "not visible yet".
                tracing::error!(
                    target: "poller",
                    kind = ?err.kind,
                    error = %err,
                    "case_resolution_failed"
                );
                LoadOutcome::Missing
            }
        }
    }

    fn publish(&self, update: impl FnOnce(&mut DashboardSnapshot)) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.snapshot_tx.send_modify(update);
    }

    fn schedule_signal_clear(&self) {
        let snapshot_tx = Arc::clone(&self.snapshot_tx);
        let cancel = self.cancel.clone();
        let visible_for = Duration::from_millis(self.config.success_signal_ms);
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = time::sleep(visible_for) => {
                    snapshot_tx.send_modify(|snapshot| snapshot.submission_visible = false);
                }
            }
        });
    }
}
