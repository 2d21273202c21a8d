//! Public entry point: subscription-driven live update engine.

use crate::config::EngineConfig;
use crate::dispatcher::{
    Callback, ConnectionStatus, EngineEvent, EventDispatcher, EventKind, SubscriptionHandle,
};
use crate::health::HealthStats;
use crate::provider::MatchProvider;
use crate::scheduler::{PollScheduler, PollingState};
use crate::visibility::VisibilitySignal;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Keeps subscribers informed of changing live match state by polling.
///
/// The loop runs only while at least one [`EventKind::MatchUpdate`]
/// subscriber is registered. Construct one engine per provider; nothing is
/// process-global.
///
/// All methods that may start the loop must be called from within a Tokio runtime.
pub struct LiveUpdateEngine {
    provider: Arc<dyn MatchProvider>,
    dispatcher: Arc<EventDispatcher>,
    scheduler: Arc<PollScheduler>,
    fetch_timeout: Duration,
}

impl LiveUpdateEngine {
    pub fn new(provider: Arc<dyn MatchProvider>, config: EngineConfig) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new());
        let scheduler = Arc::new(PollScheduler::new(
            Arc::clone(&provider),
            Arc::clone(&dispatcher),
            &config,
        ));
        Self {
            provider,
            dispatcher,
            scheduler,
            fetch_timeout: config.fetch.timeout(),
        }
    }

    /// Attaches the foreground/background signal consulted for poll delays.
    pub fn with_visibility(self, signal: VisibilitySignal) -> Self {
        self.set_visibility(signal);
        self
    }

    pub fn set_visibility(&self, signal: VisibilitySignal) {
        self.scheduler.set_visibility(Some(signal));
    }

    /// Registers `callback` for `kind`.
    ///
    /// The first [`EventKind::MatchUpdate`] subscriber starts polling.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionHandle
    where
        F: Fn(&EngineEvent) -> Result<()> + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let handle = self.dispatcher.subscribe(kind, callback);
        debug!(event = %kind, subscription = %handle.id, "Subscriber registered");

        if kind == EventKind::MatchUpdate {
            self.scheduler.ensure_running();
        }
        handle
    }

    /// Removes a subscription. Removing the last match update subscriber
    /// stops polling and clears the snapshot store.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let removed = self.dispatcher.unsubscribe(handle);
        if !removed {
            warn!(subscription = %handle.id, "Unsubscribe for unknown subscription");
            return false;
        }
        debug!(event = %handle.kind, subscription = %handle.id, "Subscriber removed");

        if handle.kind == EventKind::MatchUpdate {
            self.scheduler.stop_if_unused();
        }
        true
    }

    /// One-shot provider probe, independent of the polling loop.
    pub async fn check_status(&self) -> ConnectionStatus {
        let connected = match timeout(self.fetch_timeout, self.provider.health_check()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(provider = %self.provider.name(), error = %e, "Status probe failed");
                false
            }
            Err(_) => {
                debug!(provider = %self.provider.name(), "Status probe timed out");
                false
            }
        };
        ConnectionStatus { connected }
    }

    /// Cancels all timers, drops every subscription, clears the snapshot
    /// store and failure counter, and detaches the visibility signal.
    ///
    /// The engine can be reused afterwards by subscribing again.
    pub fn shutdown(&self) {
        self.dispatcher.clear();
        self.scheduler.shutdown();
    }

    pub fn state(&self) -> PollingState {
        self.scheduler.state()
    }

    pub fn health_stats(&self) -> HealthStats {
        self.scheduler.health_stats()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.dispatcher.subscriber_count(kind)
    }

    /// Number of entities with a stored fingerprint
    pub fn tracked_count(&self) -> usize {
        self.scheduler.tracked_count()
    }
}

impl Drop for LiveUpdateEngine {
    fn drop(&mut self) {
        // Spawned tasks hold their own Arc to the scheduler
        self.scheduler.shutdown();
    }
}
