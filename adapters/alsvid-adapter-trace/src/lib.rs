//! Alsvid resource-estimation backend
//!
//! A tracing engine: it carries no simulated state at all, only cost
//! accounting. Realizing an identifier adds it to the live set and updates
//! the maximum simultaneous width; retiring always succeeds with a clean
//! verdict. The resulting [`TraceReport`] answers the question a resource
//! estimator asks of a program: how many qubits did it actually need, and
//! how much allocation churn did it cause?
//!
//! True borrows never reach the hook, so borrowing shows up in the report
//! exactly as intended — as reuse that does not inflate the width.
//!
//! ```
//! use alsvid_adapter_trace::TraceBackend;
//! use alsvid_qubits::{QubitError, QubitManager};
//!
//! let mut qm = QubitManager::new(TraceBackend::new());
//! let qs = qm.allocate_many(4)?;
//! qm.release_many(&qs)?;
//! assert_eq!(qm.backend().report().max_width, 4);
//! # Ok::<(), QubitError>(())
//! ```

use alsvid_qubits::{BackendError, ManagerTag, Qubit, QubitBackend, QubitId, RetireVerdict};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Cost summary accumulated by a [`TraceBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceReport {
    /// Largest number of simultaneously realized qubits.
    pub max_width: usize,
    /// Qubits realized at the time of the report.
    pub live: usize,
    /// Total realize calls over the run.
    pub total_realized: u64,
    /// Total retire calls over the run.
    pub total_retired: u64,
    /// Handles constructed, borrows included.
    pub handles_constructed: u64,
}

/// Backend that estimates qubit resource usage instead of simulating.
#[derive(Debug, Default)]
pub struct TraceBackend {
    live: FxHashSet<QubitId>,
    max_width: usize,
    total_realized: u64,
    total_retired: u64,
    handles_constructed: u64,
}

impl TraceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the accumulated costs.
    pub fn report(&self) -> TraceReport {
        TraceReport {
            max_width: self.max_width,
            live: self.live.len(),
            total_realized: self.total_realized,
            total_retired: self.total_retired,
            handles_constructed: self.handles_constructed,
        }
    }
}

impl QubitBackend for TraceBackend {
    fn realize(&mut self, id: QubitId) -> Result<(), BackendError> {
        self.live.insert(id);
        self.total_realized += 1;
        if self.live.len() > self.max_width {
            self.max_width = self.live.len();
            trace!(max_width = self.max_width, "new peak width");
        }
        Ok(())
    }

    fn retire(&mut self, id: QubitId) -> RetireVerdict {
        self.live.remove(&id);
        self.total_retired += 1;
        RetireVerdict::Ok
    }

    fn construct(&mut self, id: QubitId, owner: ManagerTag) -> Qubit {
        self.handles_constructed += 1;
        Qubit::new(id, owner)
    }
}
