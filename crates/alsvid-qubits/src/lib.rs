//! Alsvid qubit resource manager
//!
//! This crate owns the finite, identity-sensitive resource every quantum
//! simulation backend shares: the space of qubit identifiers. It
//! implements allocation with LIFO free-list reuse and capacity doubling,
//! nested-scope borrowing of currently-free identifiers, and the safety
//! checks the physics imposes — no duplicate qubits in one operation, no
//! releasing a qubit whose simulated state says it is still in use.
//!
//! # Overview
//!
//! - [`QubitManager`] — the facade: allocate / release / borrow / return,
//!   distinctness validation, borrow-frame scoping.
//! - [`QubitBackend`] — the hook a simulation engine implements to
//!   physically realize and retire identifiers. The manager never inspects
//!   amplitudes; it only dispatches ids and reads back
//!   [`RetireVerdict`]s.
//! - [`Qubit`] — the opaque handle callers hold: an identifier plus the
//!   owning manager's tag, so handles from two managers never mix.
//!
//! # Example
//!
//! ```
//! use alsvid_qubits::{NullBackend, QubitManager, QubitManagerConfig};
//!
//! let config = QubitManagerConfig::default().with_initial_capacity(8);
//! let mut qm = QubitManager::with_config(NullBackend, config);
//!
//! let register = qm.allocate_many(3)?;
//! qm.validate_distinct(&register)?;
//!
//! // Borrow scratch qubits inside a scoped frame; the frame closes on
//! // every exit path and reports a leak if something is not returned.
//! qm.with_borrow_frame(|qm| {
//!     let scratch = qm.borrow_many(2)?;
//!     // ... use scratch without disturbing its state ...
//!     qm.return_borrowed(&scratch)
//! })?;
//!
//! qm.release_many(&register)?;
//! # Ok::<(), alsvid_qubits::QubitError>(())
//! ```
//!
//! # Concurrency model
//!
//! One logical thread of control per manager: calls are issued strictly
//! sequentially and nothing suspends, so there is no internal locking.
//! Concurrent simulation runs each own an independent manager; instances
//! share no mutable state.

pub mod backend;
pub mod error;
pub mod handle;
pub mod manager;
pub mod pool;
pub mod scope;

pub use backend::{BackendError, NullBackend, QubitBackend, RetireVerdict};
pub use error::{QubitError, QubitResult};
pub use handle::{ManagerTag, Qubit, QubitId};
pub use manager::{QubitManager, QubitManagerConfig};
pub use pool::QubitState;
pub use scope::FrameId;
