//! Dwell timer
//!
//! One outstanding timer per display. Every `schedule` aborts the
//! previous timer before spawning the next, and every tick carries the
//! generation it was scheduled under; a tick whose generation is no
//! longer current is dropped by `accept`, so a timer that had already
//! fired when it was replaced can never advance the sequencer.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Dwell expiry delivered to the display task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellTick {
    pub generation: u64,
}

/// Cancel-before-replace timer feeding `DwellTick`s into a channel
pub struct DwellScheduler {
    tx: mpsc::UnboundedSender<DwellTick>,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl DwellScheduler {
    pub fn new(tx: mpsc::UnboundedSender<DwellTick>) -> Self {
        Self {
            tx,
            generation: 0,
            pending: None,
        }
    }

    /// Replace any pending timer with one firing after `after`
    ///
    /// Returns the generation of the new timer.
    pub fn schedule(&mut self, after: Duration) -> u64 {
        self.abort_pending();
        self.generation += 1;
        let tick = DwellTick {
            generation: self.generation,
        };
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Receiver gone means the display stopped
            let _ = tx.send(tick);
        }));
        trace!("Dwell timer {} scheduled for {:?}", self.generation, after);
        self.generation
    }

    /// Cancel the pending timer; ticks already in flight become stale
    pub fn cancel(&mut self) {
        self.abort_pending();
        self.generation += 1;
    }

    /// Whether `tick` belongs to the current timer
    ///
    /// Consumes the current timer: a second delivery of the same
    /// generation is not possible, and the pending slot is cleared.
    pub fn accept(&mut self, tick: DwellTick) -> bool {
        if tick.generation != self.generation || self.pending.is_none() {
            trace!(
                "Ignoring stale dwell tick {} (current {})",
                tick.generation,
                self.generation
            );
            return false;
        }
        self.pending = None;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for DwellScheduler {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
