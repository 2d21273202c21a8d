//! Subscription registry and synchronous event fan-out.

use crate::entity::MatchUpdate;
use anyhow::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;


/// Event names consumers can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A tracked match changed score or status
    MatchUpdate,
    /// The polling loop lost or regained the provider
    Connectivity,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MatchUpdate => "match_update",
            EventKind::Connectivity => "connectivity",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connectivity state reported by `check_status` and `connectivity` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
}

/// Payload delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EngineEvent {
    MatchUpdate(MatchUpdate),
    Connectivity(ConnectionStatus),
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::MatchUpdate(_) => EventKind::MatchUpdate,
            EngineEvent::Connectivity(_) => EventKind::Connectivity,
        }
    }
}

/// Subscriber callback. An `Err` or a panic is logged and isolated.
pub type Callback = Arc<dyn Fn(&EngineEvent) -> Result<()> + Send + Sync>;

/// Identifies one registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub id: Uuid,
    pub kind: EventKind,
}

struct Subscriber {
    id: Uuid,
    callback: Callback,
}

/// Subscription registry keyed by event kind.
pub struct EventDispatcher {
    subscribers: DashMap<EventKind, Vec<Subscriber>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Registers `callback` for `kind`. Several callbacks per kind are allowed.
    pub fn subscribe(&self, kind: EventKind, callback: Callback) -> SubscriptionHandle {
        let id = Uuid::new_v4();
        self.subscribers
            .entry(kind)
            .or_default()
            .push(Subscriber { id, callback });
        SubscriptionHandle { id, kind }
    }

    /// Removes a callback. Returns false if the handle was not registered.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let Some(mut subs) = self.subscribers.get_mut(&handle.kind) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.id != handle.id);
        before != subs.len()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map(|subs| subs.len()).unwrap_or(0)
    }

    /// Invokes every callback registered for the event's kind, synchronously.
    ///
    /// Callbacks are snapshotted before invocation, so a callback may
    /// subscribe or unsubscribe without deadlocking. Returns the number of
    /// callbacks that completed successfully.
    pub fn emit(&self, event: &EngineEvent) -> usize {
        self.emit_while(event, || true)
    }

    /// Like [`EventDispatcher::emit`], but consults `valid` after taking the
    /// snapshot and before each callback; delivery stops once it returns false.
    ///
    /// Subscribers registered after the snapshot never see the event.
    pub fn emit_while<V>(&self, event: &EngineEvent, valid: V) -> usize
    where
        V: Fn() -> bool,
    {
        let kind = event.kind();
        let callbacks: Vec<(Uuid, Callback)> = match self.subscribers.get(&kind) {
            Some(subs) => subs
                .iter()
                .map(|s| (s.id, Arc::clone(&s.callback)))
                .collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for (id, callback) in callbacks {
            if !valid() {
                break;
            }
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!(event = %kind, subscription = %id, error = %e, "Subscriber callback failed");
                }
                Err(_) => {
                    error!(event = %kind, subscription = %id, "Subscriber callback panicked");
                }
            }
        }
        delivered
    }

    /// Drops every subscription.
    pub fn clear(&self) {
        self.subscribers.clear();
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
