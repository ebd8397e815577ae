//! Alsvid Toffoli-class register backend
//!
//! A reduced engine in the Toffoli-simulator tradition: each qubit is a
//! single classical bit, which is enough for reversible/classical circuits
//! and makes the hook contract easy to see end to end. Realizing an
//! identifier grows the register and zeroes the slot; retiring one reports
//! [`RetireVerdict::NotZero`] when the bit is still set — the classical
//! analogue of releasing a qubit that was not returned to |0⟩.
//!
//! No gate set lives here. Tests and callers flip bits directly through
//! [`ToffoliBackend::set`] to stand in for gate application.
//!
//! ```
//! use alsvid_adapter_toffoli::ToffoliBackend;
//! use alsvid_qubits::{QubitError, QubitManager};
//!
//! let mut qm = QubitManager::new(ToffoliBackend::new());
//! let q = qm.allocate()?;
//! qm.backend().is_set(q.id()); // freshly realized slots read 0
//! qm.release(q)?;
//! # Ok::<(), QubitError>(())
//! ```

use alsvid_qubits::{BackendError, QubitBackend, QubitId, RetireVerdict};
use tracing::trace;

/// Growable register of classical bits, indexed by qubit id.
#[derive(Debug, Default, Clone)]
pub struct ToffoliBackend {
    bits: Vec<bool>,
}

impl ToffoliBackend {
    /// Create an empty register; it grows as identifiers are realized.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the bit for `id`. Unrealized slots read as 0.
    pub fn is_set(&self, id: QubitId) -> bool {
        self.bits.get(id.index()).copied().unwrap_or(false)
    }

    /// Write the bit for `id` — the stand-in for applying an X chain.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never realized; manipulating a qubit the engine
    /// has no storage for is a caller bug.
    pub fn set(&mut self, id: QubitId, value: bool) {
        self.bits[id.index()] = value;
    }

    /// Number of register slots ever realized.
    pub fn width(&self) -> usize {
        self.bits.len()
    }
}

impl QubitBackend for ToffoliBackend {
    fn realize(&mut self, id: QubitId) -> Result<(), BackendError> {
        if id.index() >= self.bits.len() {
            self.bits.resize(id.index() + 1, false);
        }
        self.bits[id.index()] = false;
        trace!(%id, width = self.bits.len(), "realized register slot");
        Ok(())
    }

    fn retire(&mut self, id: QubitId) -> RetireVerdict {
        let verdict = if self.bits[id.index()] {
            RetireVerdict::NotZero
        } else {
            RetireVerdict::Ok
        };
        // Clear the slot either way; the id may be reused immediately.
        self.bits[id.index()] = false;
        verdict
    }
}
