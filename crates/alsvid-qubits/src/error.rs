//! Error types for qubit lifecycle operations.

use crate::backend::BackendError;
use crate::handle::QubitId;
use crate::scope::FrameId;
use thiserror::Error;

/// Errors raised by the qubit manager and its pool.
///
/// No variant is retried internally: every error is local to the call that
/// raised it. The internal-consistency variants (`FrameMismatch`,
/// `QubitLeak`, `InternalConsistency`) signal a manager-usage bug rather
/// than bad user data and deliberately fail loudly instead of self-healing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QubitError {
    /// The pool is exhausted and capacity growth is disallowed.
    #[error("not enough qubits: requested {requested}, available {available}")]
    NotEnoughQubits {
        /// Number of qubits the failing call asked for.
        requested: usize,
        /// Number of free qubits at the time of failure.
        available: usize,
    },

    /// A single operation named the same qubit twice.
    #[error("operation arguments are not distinct: {0} appears more than once")]
    NotDistinctQubits(QubitId),

    /// A released qubit's simulated state was not |0⟩.
    #[error("released qubits are not in zero state")]
    ReleasedQubitsAreNotInZeroState,

    /// A released qubit was still entangled with live qubits.
    #[error("released qubits are entangled with qubits still in use")]
    ReleasedQubitsAreEntangled,

    /// Handle belongs to a different manager instance.
    #[error("handle for {0} belongs to a different qubit manager")]
    ForeignHandle(QubitId),

    /// Release of an id that is not currently allocated.
    #[error("{0} is not currently allocated")]
    NotAllocated(QubitId),

    /// Borrowed-return of an id the current frame did not lend.
    #[error("{0} was not borrowed in the current scope")]
    NotBorrowed(QubitId),

    /// The backend hook failed to realize an identifier.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A borrow frame was closed with qubits still lent out.
    #[error("borrow frame {frame:?} closed with {count} qubit(s) still lent")]
    QubitLeak {
        /// The frame being closed.
        frame: FrameId,
        /// How many ids were still lent or fallback-allocated.
        count: usize,
    },

    /// A frame other than the innermost one was closed.
    #[error("borrow frame close out of order: expected {expected:?}, got {got:?}")]
    FrameMismatch {
        /// The innermost open frame.
        expected: FrameId,
        /// The frame the caller tried to close.
        got: FrameId,
    },

    /// The identifier space reached an inconsistent state.
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),
}

/// Result type for qubit lifecycle operations.
pub type QubitResult<T> = Result<T, QubitError>;
