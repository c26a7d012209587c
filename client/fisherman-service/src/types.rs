use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::OwnedSemaphorePermit;

use crate::handler::LOG_TARGET;

/// Notification sent to the scheduler's event loop when a batch-deletion semaphore permit is
/// released (dropped).
#[derive(Debug, Clone, Copy)]
pub struct BatchDeletionPermitReleased {
    /// Whether the completed batch attempted at least one target. If `false`, the scheduler
    /// backs off towards the idle poll interval instead of the regular cooldown (§4.2).
    pub did_work: bool,
}

/// RAII wrapper around a batch-processing permit: notifies the event loop on drop, whether the
/// batch cycle it guards succeeded, partially failed, or panicked.
#[derive(Debug)]
pub struct BatchDeletionPermitGuard {
    _permit: OwnedSemaphorePermit,
    release_notifier: UnboundedSender<BatchDeletionPermitReleased>,
    did_work: AtomicBool,
}

impl BatchDeletionPermitGuard {
    pub fn new(
        permit: OwnedSemaphorePermit,
        release_notifier: UnboundedSender<BatchDeletionPermitReleased>,
    ) -> Self {
        Self {
            _permit: permit,
            release_notifier,
            did_work: AtomicBool::new(false),
        }
    }

    pub fn mark_did_work(&self) {
        self.did_work.store(true, Ordering::Relaxed);
    }
}

impl Drop for BatchDeletionPermitGuard {
    fn drop(&mut self) {
        let did_work = self.did_work.load(Ordering::Relaxed);
        if self
            .release_notifier
            .send(BatchDeletionPermitReleased { did_work })
            .is_err()
        {
            warn!(target: LOG_TARGET, "batch deletion permit release notification dropped, receiver gone");
        }
    }
}
