//! Adaptive live-update polling engine.
//!
//! Keeps consumers informed of changing live match state without a push
//! channel: decides when to poll, detects what changed, notifies only
//! interested subscribers, and suspends itself under sustained failure.
//!
//! ```text
//!   subscribe ──► EventDispatcher ──► PollScheduler ──► MatchProvider
//!                       ▲                  │
//!                       │          SnapshotDiffer (changed only)
//!                       └── emit ◄─────────┤
//!                                          ├─ HealthMonitor (circuit breaker)
//!                                          └─ IntervalPolicy (+ VisibilitySignal)
//! ```

// Configuration loading
pub mod config;

// Tracked entities and change payloads
pub mod entity;

// Snapshot store and differ
pub mod snapshot;

// Poll delay calculation
pub mod interval;

// Circuit breaker
pub mod health;

// Subscription registry
pub mod dispatcher;

// Remote data provider seam
pub mod provider;

// Foreground/background signal
pub mod visibility;

// Polling loop
pub mod scheduler;

// Public facade
pub mod engine;

pub use config::{load_config, EngineConfig, FetchConfig};
pub use dispatcher::{ConnectionStatus, EngineEvent, EventKind, SubscriptionHandle};
pub use engine::LiveUpdateEngine;
pub use entity::{MatchUpdate, TrackedEntity};
pub use health::{HealthConfig, HealthMonitor, HealthStats, TripSignal};
pub use interval::IntervalPolicy;
pub use provider::MatchProvider;
pub use scheduler::PollingState;
pub use visibility::VisibilitySignal;
