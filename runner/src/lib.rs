//! HTTP provider and settings for running a [`livepoll::LiveUpdateEngine`]
//! against a remote live-match endpoint.
//!
//! # Architecture
//!
//! ```text
//! Remote endpoint (JSON)
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       HttpMatchProvider                  │
//! │  - GET the live feed                     │
//! │  - Map records to TrackedEntity          │
//! └─────────────────────────────────────────┘
//!          ↓
//!   LiveUpdateEngine (livepoll)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use livepoll::{EngineConfig, EventKind, LiveUpdateEngine};
//! use livepoll_runner::HttpMatchProvider;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let provider = HttpMatchProvider::new("https://scores.example.com/live".to_string(), None)?;
//! let engine = LiveUpdateEngine::new(Arc::new(provider), EngineConfig::default());
//! engine.subscribe(EventKind::MatchUpdate, |event| {
//!     println!("{:?}", event);
//!     Ok(())
//! });
//! # Ok(())
//! # }
//! ```

pub mod provider;
pub mod settings;

pub use provider::{ApiKey, HttpMatchProvider};
pub use settings::RunnerSettings;
