//! Backend hook: the capability a simulation engine supplies.
//!
//! The manager never inspects simulated amplitudes. Its only view of the
//! engine is this three-operation contract:
//!
//! | Method | Direction | Purpose |
//! |--------|-----------|---------|
//! | `realize` | manager → engine | prepare storage for a new identifier |
//! | `retire` | manager → engine | tear down storage, report a physical verdict |
//! | `construct` | manager → engine | build the caller-visible handle |
//!
//! All methods are synchronous: one execution context issues manager calls
//! strictly sequentially and nothing here suspends. The engine must not
//! retain ownership of the manager's identifier space; it only reports a
//! per-call result.

use crate::handle::{ManagerTag, Qubit, QubitId};
use thiserror::Error;

/// Failure reported by [`QubitBackend::realize`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    /// Create a realize failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        BackendError(message.into())
    }
}

/// Physical-consistency verdict from [`QubitBackend::retire`].
///
/// The hook reports; the manager decides. `NotZero` is fatal only when the
/// manager is configured to enforce zero-state release; `Entangled` is
/// always fatal. Either way the identifier goes back to the free pool —
/// the id is not responsible for the physical inconsistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireVerdict {
    /// The qubit was in the zero state; release is physically clean.
    Ok,
    /// The qubit's simulated state was not |0⟩.
    NotZero,
    /// The qubit was still entangled with other live qubits.
    Entangled,
}

/// Capability contract a simulation engine implements to back a
/// [`QubitManager`](crate::manager::QubitManager).
pub trait QubitBackend {
    /// Physically prepare resources for `id` (grow a register, initialize
    /// amplitude storage at that index).
    ///
    /// Must tolerate an immediate [`retire`](Self::retire) of the same id:
    /// when a multi-qubit allocation fails partway, the manager retires the
    /// already-realized ids to undo the partial work.
    fn realize(&mut self, id: QubitId) -> Result<(), BackendError>;

    /// Physically tear down resources for `id`, reporting whether its
    /// simulated state was consistent with release.
    ///
    /// Never fails for physical-consistency conditions; it reports them
    /// through the verdict and leaves policy to the manager.
    fn retire(&mut self, id: QubitId) -> RetireVerdict;

    /// Build the opaque handle exposed to callers.
    ///
    /// Engines needing per-qubit metadata (an engine-local slot index
    /// distinct from the logical id, say) record it here. The default
    /// builds the plain handle.
    fn construct(&mut self, id: QubitId, owner: ManagerTag) -> Qubit {
        Qubit::new(id, owner)
    }
}

/// Backend that realizes everything and retires everything cleanly.
///
/// Useful for tests and for callers that want identifier bookkeeping with
/// no physical effect at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl QubitBackend for NullBackend {
    fn realize(&mut self, _id: QubitId) -> Result<(), BackendError> {
        Ok(())
    }

    fn retire(&mut self, _id: QubitId) -> RetireVerdict {
        RetireVerdict::Ok
    }
}
