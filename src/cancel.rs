use crate::error::{HarnessError, HarnessResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between the pipeline and whoever
/// wants to stop it (an outer test timeout, a signal handler).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if cancellation was requested before `stage`.
    pub fn check(&self, stage: &'static str) -> HarnessResult<()> {
        if self.is_cancelled() {
            tracing::warn!(stage, "run cancelled");
            return Err(HarnessError::Cancelled { stage });
        }
        Ok(())
    }
}
