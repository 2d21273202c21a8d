use crate::entity::TrackedEntity;
use anyhow::Result;
use async_trait::async_trait;

/// Remote match data provider.
///
/// Implementations are stateless request/response adapters; scheduling,
/// timeouts and retry are handled by the engine.
///
/// # Example
/// ```no_run
/// use livepoll::{MatchProvider, TrackedEntity};
/// use async_trait::async_trait;
/// use anyhow::Result;
///
/// struct StaticProvider;
///
/// #[async_trait]
/// impl MatchProvider for StaticProvider {
///     fn name(&self) -> &str {
///         "static"
///     }
///
///     async fn fetch_live(&self) -> Result<Vec<TrackedEntity>> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait MatchProvider: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Returns the current batch of tracked matches.
    ///
    /// Network failures, non-2xx responses and malformed payloads are errors.
    async fn fetch_live(&self) -> Result<Vec<TrackedEntity>>;

    /// One-shot connectivity probe.
    ///
    /// Defaults to a full fetch; providers with a cheaper status endpoint
    /// should override it.
    async fn health_check(&self) -> Result<()> {
        self.fetch_live().await.map(|_| ())
    }
}
