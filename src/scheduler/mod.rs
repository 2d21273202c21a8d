//! Poll scheduler - the single-flight live update loop.
//!
//! ```text
//!   Idle ──first subscriber──► Active ──failure──► Backoff ──success──► Active
//!   Active | Backoff ──failures >= threshold──► Stopped ──cooldown──► Active
//!   Active | Backoff | Stopped ──last unsubscribe / shutdown──► Idle
//! ```
//!
//! Each cycle fetches, diffs, emits and only then arms the next delay, so at
//! most one fetch is ever in flight. Every spawned loop and cooldown timer
//! carries the epoch it was started in; bumping the epoch (stop, shutdown,
//! restart) makes stale tasks exit before touching shared state again.

use crate::config::EngineConfig;
use crate::dispatcher::{ConnectionStatus, EngineEvent, EventDispatcher, EventKind};
use crate::entity::MatchUpdate;
use crate::health::{HealthMonitor, HealthStats, TripSignal};
use crate::interval::IntervalPolicy;
use crate::provider::MatchProvider;
use crate::snapshot::SnapshotDiffer;
use crate::visibility::VisibilitySignal;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};


/// Lifecycle state of the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollingState {
    /// No subscribers, loop not running
    Idle,
    /// Loop running at its normal interval
    Active,
    /// Loop running, interval inflated by recent failures
    Backoff,
    /// Circuit breaker tripped, loop suspended until the cooldown elapses
    Stopped,
}

impl fmt::Display for PollingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollingState::Idle => write!(f, "Idle"),
            PollingState::Active => write!(f, "Active"),
            PollingState::Backoff => write!(f, "Backoff"),
            PollingState::Stopped => write!(f, "Stopped"),
        }
    }
}

struct LoopControl {
    state: PollingState,
    poll_task: Option<JoinHandle<()>>,
    rearm_task: Option<JoinHandle<()>>,
}

/// State only the running loop mutates (plus teardown).
struct PollTracker {
    differ: SnapshotDiffer,
    health: HealthMonitor,
    live_count: usize,
    last_latency_ms: u64,
}

enum CycleOutcome {
    Continue(Duration),
    Tripped(TripSignal),
    Cancelled,
}

/// Drives fetch → diff → emit → sleep cycles against a [`MatchProvider`].
pub struct PollScheduler {
    provider: Arc<dyn MatchProvider>,
    dispatcher: Arc<EventDispatcher>,
    policy: IntervalPolicy,
    fetch_timeout: Duration,
    cooldown: Duration,
    visibility: Mutex<Option<VisibilitySignal>>,
    control: Mutex<LoopControl>,
    tracker: Mutex<PollTracker>,
    /// Bumped under the control lock whenever running tasks become stale
    epoch: AtomicU64,
    /// Last connectivity reported through `connectivity` events
    connected: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PollScheduler {
    pub fn new(
        provider: Arc<dyn MatchProvider>,
        dispatcher: Arc<EventDispatcher>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            policy: config.polling.clone(),
            fetch_timeout: config.fetch.timeout(),
            cooldown: config.health.cooldown(),
            visibility: Mutex::new(None),
            control: Mutex::new(LoopControl {
                state: PollingState::Idle,
                poll_task: None,
                rearm_task: None,
            }),
            tracker: Mutex::new(PollTracker {
                differ: SnapshotDiffer::new(config.snapshot.evict_after_cycles),
                health: HealthMonitor::new(config.health.clone()),
                live_count: 0,
                last_latency_ms: 0,
            }),
            epoch: AtomicU64::new(0),
            connected: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> PollingState {
        lock(&self.control).state
    }

    pub fn health_stats(&self) -> HealthStats {
        lock(&self.tracker).health.stats()
    }

    /// Number of entities currently held in the snapshot store
    pub fn tracked_count(&self) -> usize {
        lock(&self.tracker).differ.store().len()
    }

    pub fn set_visibility(&self, signal: Option<VisibilitySignal>) {
        *lock(&self.visibility) = signal;
    }

    fn is_backgrounded(&self) -> bool {
        lock(&self.visibility)
            .as_ref()
            .is_some_and(|signal| signal.is_backgrounded())
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::Acquire) == epoch
    }

    fn has_demand(&self) -> bool {
        self.dispatcher.subscriber_count(EventKind::MatchUpdate) > 0
    }

    /// Starts the loop if it is idle and someone listens for match updates.
    ///
    /// A `Stopped` loop is left alone: the pending cooldown resumes it.
    /// Must be called from within a Tokio runtime.
    pub fn ensure_running(self: &Arc<Self>) {
        let mut control = lock(&self.control);
        if control.state != PollingState::Idle || !self.has_demand() {
            return;
        }
        self.spawn_loop(&mut control);
    }

    /// Returns the loop to `Idle` once no match update subscriber remains.
    pub fn stop_if_unused(&self) {
        let mut control = lock(&self.control);
        if control.state == PollingState::Idle || self.has_demand() {
            return;
        }
        info!("Last match update subscriber removed, stopping live polling");
        self.halt(&mut control);
    }

    /// Cancels every timer and clears the snapshot store and failure counter.
    pub fn shutdown(&self) {
        let mut control = lock(&self.control);
        self.halt(&mut control);
        drop(control);
        self.set_visibility(None);
        info!("Live polling shut down");
    }

    fn spawn_loop(self: &Arc<Self>, control: &mut LoopControl) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        control.state = PollingState::Active;

        let this = Arc::clone(self);
        control.poll_task = Some(tokio::spawn(async move { this.run(epoch).await }));

        info!(provider = %self.provider.name(), epoch = epoch, "Live polling started");
    }

    fn halt(&self, control: &mut LoopControl) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        control.state = PollingState::Idle;

        if let Some(task) = control.poll_task.take() {
            task.abort();
        }
        if let Some(task) = control.rearm_task.take() {
            task.abort();
        }

        let mut tracker = lock(&self.tracker);
        tracker.differ.reset();
        tracker.health.reset();
        tracker.live_count = 0;
        tracker.last_latency_ms = 0;
        drop(tracker);

        self.connected.store(false, Ordering::Release);
    }

    async fn run(self: Arc<Self>, epoch: u64) {
        loop {
            match self.poll_once(epoch).await {
                CycleOutcome::Continue(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "Next live poll scheduled");
                    sleep(delay).await;
                    if !self.is_current(epoch) {
                        return;
                    }
                }
                CycleOutcome::Tripped(signal) => {
                    self.enter_stopped(epoch, signal);
                    return;
                }
                CycleOutcome::Cancelled => return,
            }
        }
    }

    /// One fetch → diff → emit cycle. Returns the delay before the next one.
    async fn poll_once(&self, epoch: u64) -> CycleOutcome {
        let started = Instant::now();
        let result = match timeout(self.fetch_timeout, self.provider.fetch_live()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "live fetch timed out after {}ms",
                self.fetch_timeout.as_millis()
            )),
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(batch) => {
                let updates: Vec<MatchUpdate> = {
                    let mut tracker = lock(&self.tracker);
                    if !self.is_current(epoch) {
                        return CycleOutcome::Cancelled;
                    }
                    let updates: Vec<MatchUpdate> = tracker
                        .differ
                        .diff(&batch)
                        .into_iter()
                        .map(MatchUpdate::from)
                        .collect();
                    tracker.health.record_success();
                    tracker.live_count = batch.iter().filter(|e| e.is_live()).count();
                    tracker.last_latency_ms = latency_ms;
                    updates
                };

                debug!(
                    fetched = batch.len(),
                    changed = updates.len(),
                    latency_ms = latency_ms,
                    "Live poll succeeded"
                );

                for update in updates {
                    if !self.is_current(epoch) {
                        return CycleOutcome::Cancelled;
                    }
                    self.dispatcher
                        .emit_while(&EngineEvent::MatchUpdate(update), || self.is_current(epoch));
                }

                if self.is_current(epoch) && !self.connected.swap(true, Ordering::AcqRel) {
                    info!(provider = %self.provider.name(), "Live provider connected");
                    self.dispatcher.emit_while(
                        &EngineEvent::Connectivity(ConnectionStatus { connected: true }),
                        || self.is_current(epoch),
                    );
                }

                self.set_state(epoch, PollingState::Active);
            }
            Err(e) => {
                let message = format!("{:#}", e);
                let (trip, failures) = {
                    let mut tracker = lock(&self.tracker);
                    if !self.is_current(epoch) {
                        return CycleOutcome::Cancelled;
                    }
                    tracker.last_latency_ms = latency_ms;
                    let trip = tracker.health.record_failure(&message);
                    (trip, tracker.health.consecutive_failures())
                };

                warn!(
                    provider = %self.provider.name(),
                    consecutive_failures = failures,
                    error = %message,
                    "Live fetch failed"
                );

                if let Some(signal) = trip {
                    return CycleOutcome::Tripped(signal);
                }
                self.set_state(epoch, PollingState::Backoff);
            }
        }

        if !self.is_current(epoch) {
            return CycleOutcome::Cancelled;
        }

        let backgrounded = self.is_backgrounded();
        let tracker = lock(&self.tracker);
        CycleOutcome::Continue(self.policy.next_interval(
            tracker.live_count,
            tracker.last_latency_ms,
            tracker.health.consecutive_failures(),
            backgrounded,
        ))
    }

    fn set_state(&self, epoch: u64, state: PollingState) {
        let mut control = lock(&self.control);
        if !self.is_current(epoch) || control.state == state {
            return;
        }
        info!(from = %control.state, to = %state, "Live polling state changed");
        control.state = state;
    }

    fn enter_stopped(self: &Arc<Self>, epoch: u64, signal: TripSignal) {
        let mut control = lock(&self.control);
        if !self.is_current(epoch) {
            return;
        }
        control.state = PollingState::Stopped;
        control.poll_task = None;

        error!(
            provider = %self.provider.name(),
            failure_count = signal.failure_count,
            last_error = %signal.last_error,
            cooldown_secs = self.cooldown.as_secs(),
            "Circuit breaker tripped, live polling suspended"
        );

        let this = Arc::clone(self);
        let cooldown = self.cooldown;
        control.rearm_task = Some(tokio::spawn(async move {
            sleep(cooldown).await;
            this.rearm(epoch);
        }));
        drop(control);

        self.connected.store(false, Ordering::Release);
        self.dispatcher
            .emit(&EngineEvent::Connectivity(ConnectionStatus { connected: false }));
    }

    /// Cooldown elapsed: reset the breaker and resume only if still wanted.
    fn rearm(self: &Arc<Self>, epoch: u64) {
        let mut control = lock(&self.control);
        if !self.is_current(epoch) || control.state != PollingState::Stopped {
            return;
        }
        control.rearm_task = None;
        lock(&self.tracker).health.rearm();

        if self.has_demand() {
            info!("Circuit breaker cooldown elapsed, resuming live polling");
            self.spawn_loop(&mut control);
        } else {
            info!("Circuit breaker cooldown elapsed with no subscribers, staying idle");
            self.halt(&mut control);
        }
    }
}
