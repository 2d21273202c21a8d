use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Foreground/background flag pushed in by the embedding environment.
///
/// Clones share the same flag. The engine only reads it when computing the
/// next poll delay.
#[derive(Clone, Debug)]
pub struct VisibilitySignal {
    backgrounded: Arc<AtomicBool>,
}

impl VisibilitySignal {
    /// New signal in the foreground state
    pub fn new() -> Self {
        Self::with_state(false)
    }

    pub fn with_state(backgrounded: bool) -> Self {
        Self {
            backgrounded: Arc::new(AtomicBool::new(backgrounded)),
        }
    }

    pub fn set_backgrounded(&self, backgrounded: bool) {
        self.backgrounded.store(backgrounded, Ordering::Release);
    }

    pub fn is_backgrounded(&self) -> bool {
        self.backgrounded.load(Ordering::Acquire)
    }
}

impl Default for VisibilitySignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let signal = VisibilitySignal::new();
        let observer = signal.clone();
        assert!(!observer.is_backgrounded());

        signal.set_backgrounded(true);
        assert!(observer.is_backgrounded());
    }
}
