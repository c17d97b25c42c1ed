use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use crate::protocol::{ClientReport, DataCategory, DiscardReason, DiscardedEvent};

/// A shared counter of discarded envelope items.
///
/// The recorder is owned by the [`Client`](crate::Client) and handed to the
/// transport, so both the capture pipeline (sampling, callbacks, processors)
/// and the transport (queue overflow, rate limits, send failures) feed the
/// same set of counters.  [`flush`](OutcomeRecorder::flush) drains the
/// counters into a [`ClientReport`] for the transport to send along.
///
/// Recording an outcome never fails and never blocks on I/O.
#[derive(Debug, Default, Clone)]
pub struct OutcomeRecorder {
    counters: Arc<Mutex<BTreeMap<(DiscardReason, DataCategory), u32>>>,
}

impl OutcomeRecorder {
    /// Creates a new empty recorder.
    pub fn new() -> OutcomeRecorder {
        Default::default()
    }

    /// Counts one discarded item of the given category.
    pub fn record(&self, reason: DiscardReason, category: DataCategory) {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *counters.entry((reason, category)).or_insert(0) += 1;
        faultline_debug!("[OutcomeRecorder] recorded {reason:?} for {category:?}");
    }

    /// Counts `quantity` discarded items at once.
    pub fn record_many(&self, reason: DiscardReason, category: DataCategory, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *counters.entry((reason, category)).or_insert(0) += quantity;
    }

    /// Drains all accumulated outcomes into a client report.
    ///
    /// Returns `None` if nothing was discarded since the last flush.
    pub fn flush(&self) -> Option<ClientReport> {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if counters.is_empty() {
            return None;
        }
        let discarded_events = std::mem::take(&mut *counters)
            .into_iter()
            .map(|((reason, category), quantity)| DiscardedEvent {
                reason,
                category,
                quantity,
            })
            .collect();
        Some(ClientReport {
            timestamp: SystemTime::now(),
            discarded_events,
        })
    }

    /// Returns whether any outcomes are waiting to be flushed.
    pub fn is_empty(&self) -> bool {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
