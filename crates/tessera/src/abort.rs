//! Cooperative cancellation for a running build

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Result, bail};

/// Shared flag the host sets when the encompassing build is aborted
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Fail when the build has been aborted
    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            bail!("Build aborted");
        }
        Ok(())
    }
}
