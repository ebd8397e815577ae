//! Qubit manager facade.
//!
//! One manager per backend instance, one execution context per manager.
//! All calls are synchronous and run to completion; an allocate or release
//! either completes or fails atomically — partial allocation is never
//! observable to the caller.

use crate::backend::{QubitBackend, RetireVerdict};
use crate::error::{QubitError, QubitResult};
use crate::handle::{ManagerTag, Qubit, QubitId};
use crate::pool::{IdPool, QubitState};
use crate::scope::{BorrowStack, FrameId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Constructor-time options for a [`QubitManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QubitManagerConfig {
    /// Starting size of the identifier space (clamped to a minimum of 8).
    pub initial_capacity: u32,
    /// Permit capacity growth beyond the initial value on exhaustion.
    pub may_extend_capacity: bool,
    /// Force every borrow request to degrade to allocation.
    pub disable_borrowing: bool,
    /// Treat a `NotZero` retire verdict as fatal.
    pub enforce_zero_state_on_release: bool,
}

impl Default for QubitManagerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 32,
            may_extend_capacity: true,
            disable_borrowing: false,
            enforce_zero_state_on_release: true,
        }
    }
}

impl QubitManagerConfig {
    /// Set the starting identifier-space size.
    pub fn with_initial_capacity(mut self, capacity: u32) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Permit or forbid capacity growth.
    pub fn with_may_extend_capacity(mut self, may_extend: bool) -> Self {
        self.may_extend_capacity = may_extend;
        self
    }

    /// Enable or disable borrowing.
    pub fn with_disable_borrowing(mut self, disable: bool) -> Self {
        self.disable_borrowing = disable;
        self
    }

    /// Enable or disable zero-state enforcement on release.
    pub fn with_enforce_zero_state(mut self, enforce: bool) -> Self {
        self.enforce_zero_state_on_release = enforce;
        self
    }
}

/// Manages allocation, release, borrowing and return of qubit identifiers
/// for one simulation run, delegating the physical effect to a
/// [`QubitBackend`].
///
/// Allocation and release are O(1); borrowing scans the free range and is
/// O(capacity). Identifier reuse is LIFO and stable, but callers must not
/// depend on reuse order for correctness.
#[derive(Debug)]
pub struct QubitManager<B: QubitBackend> {
    backend: B,
    pool: IdPool,
    scopes: BorrowStack,
    tag: ManagerTag,
    disable_borrowing: bool,
    enforce_zero_state: bool,
}

impl<B: QubitBackend> QubitManager<B> {
    /// Create a manager with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, QubitManagerConfig::default())
    }

    /// Create a manager with explicit configuration.
    pub fn with_config(backend: B, config: QubitManagerConfig) -> Self {
        Self {
            backend,
            pool: IdPool::new(config.initial_capacity, config.may_extend_capacity),
            scopes: BorrowStack::new(),
            tag: ManagerTag::mint(),
            disable_borrowing: config.disable_borrowing,
            enforce_zero_state: config.enforce_zero_state_on_release,
        }
    }

    /// Allocate a single qubit.
    pub fn allocate(&mut self) -> QubitResult<Qubit> {
        let mut qubits = self.allocate_many(1)?;
        Ok(qubits.pop().expect("allocate_many(1) yields one handle"))
    }

    /// Allocate `count` qubits.
    ///
    /// On any failure — pool exhaustion or a backend realize error — every
    /// id taken so far is retired and returned to the pool before the error
    /// surfaces; the caller never observes a partial allocation.
    pub fn allocate_many(&mut self, count: usize) -> QubitResult<Vec<Qubit>> {
        let mut taken: Vec<QubitId> = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(id) = self.pool.take_free(false) else {
                self.unwind_allocation(&taken);
                return Err(QubitError::NotEnoughQubits {
                    requested: count,
                    available: self.pool.free_count(),
                });
            };
            if let Err(e) = self.backend.realize(id) {
                // The failing id was never realized; it goes straight back.
                let _ = self.pool.give_back(id);
                self.unwind_allocation(&taken);
                return Err(e.into());
            }
            taken.push(id);
        }
        trace!(count, "allocated qubits");
        Ok(taken
            .into_iter()
            .map(|id| self.backend.construct(id, self.tag))
            .collect())
    }

    /// Release a single qubit.
    pub fn release(&mut self, qubit: Qubit) -> QubitResult<()> {
        self.release_many(&[qubit])
    }

    /// Release allocated qubits.
    ///
    /// Handles are validated first: a foreign handle, a duplicate, or an id
    /// that is not currently allocated fails before any state changes. Each
    /// id then goes through the backend's retire hook and returns to the
    /// free pool whether or not the physical check passed; a bad verdict
    /// surfaces afterwards as an error in the calling program.
    pub fn release_many(&mut self, qubits: &[Qubit]) -> QubitResult<()> {
        self.validate_distinct(qubits)?;
        for q in qubits {
            if self.pool.state_of(q.id()) != Some(QubitState::Allocated) {
                return Err(QubitError::NotAllocated(q.id()));
            }
        }
        let mut not_zero = false;
        let mut entangled = false;
        for q in qubits.iter().rev() {
            match self.backend.retire(q.id()) {
                RetireVerdict::Ok => {}
                RetireVerdict::NotZero => not_zero = true,
                RetireVerdict::Entangled => entangled = true,
            }
            self.pool.give_back(q.id())?;
        }
        trace!(count = qubits.len(), "released qubits");
        if entangled {
            return Err(QubitError::ReleasedQubitsAreEntangled);
        }
        if not_zero {
            if self.enforce_zero_state {
                return Err(QubitError::ReleasedQubitsAreNotInZeroState);
            }
            warn!("released qubit(s) were not in zero state; enforcement is disabled");
        }
        Ok(())
    }

    /// Borrow a single qubit in the current frame.
    pub fn borrow(&mut self) -> QubitResult<Qubit> {
        let mut qubits = self.borrow_many(1)?;
        Ok(qubits.pop().expect("borrow_many(1) yields one handle"))
    }

    /// Borrow `count` qubits in the currently open frame.
    ///
    /// True borrows take the smallest free ids and never touch the backend
    /// hook. When borrowing is disabled or too few free ids remain, the
    /// remainder is allocated instead — borrowing degrades gracefully, it
    /// is a reuse optimization and never a correctness requirement.
    pub fn borrow_many(&mut self, count: usize) -> QubitResult<Vec<Qubit>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut lent: Vec<QubitId> = Vec::new();
        if !self.disable_borrowing {
            lent = self.pool.free_ids_ascending().take(count).collect();
            for &id in &lent {
                self.pool.mark_borrowed(id)?;
                self.scopes.current().lend(id);
            }
        }
        let mut fallback: Vec<QubitId> = Vec::new();
        while lent.len() + fallback.len() < count {
            let Some(id) = self.pool.take_free(true) else {
                self.unwind_borrow(&lent, &fallback);
                return Err(QubitError::NotEnoughQubits {
                    requested: count,
                    available: self.pool.free_count(),
                });
            };
            if let Err(e) = self.backend.realize(id) {
                let _ = self.pool.give_back(id);
                self.unwind_borrow(&lent, &fallback);
                return Err(e.into());
            }
            self.scopes.current().record_fallback(id);
            fallback.push(id);
        }
        trace!(
            count,
            lent = lent.len(),
            fallback = fallback.len(),
            "borrowed qubits"
        );
        Ok(lent
            .into_iter()
            .chain(fallback)
            .map(|id| self.backend.construct(id, self.tag))
            .collect())
    }

    /// Return borrowed qubits to the current frame.
    ///
    /// True borrows go back to the free state with no retire check — the
    /// borrower is responsible for leaving the qubit as found. Ids that
    /// were allocated as borrow fallback were realized by the hook, so they
    /// are retired (verdict ignored) and returned to the pool.
    pub fn return_borrowed(&mut self, qubits: &[Qubit]) -> QubitResult<()> {
        self.validate_distinct(qubits)?;
        for q in qubits {
            let frame = self.scopes.current();
            if !frame.holds_lent(q.id()) && !frame.holds_fallback(q.id()) {
                return Err(QubitError::NotBorrowed(q.id()));
            }
        }
        for q in qubits.iter().rev() {
            if self.scopes.current().unlend(q.id()) {
                self.pool.unmark_borrowed(q.id())?;
            } else {
                self.scopes.current().remove_fallback(q.id());
                let _ = self.backend.retire(q.id());
                self.pool.give_back(q.id())?;
            }
        }
        trace!(count = qubits.len(), "returned borrowed qubits");
        Ok(())
    }

    /// Open a nested borrow frame.
    pub fn open_borrow_frame(&mut self) -> FrameId {
        self.scopes.open_frame()
    }

    /// Close a borrow frame.
    ///
    /// Fails if `frame` is not the innermost open frame or if qubits
    /// borrowed in it were never returned (a leak across a scope boundary).
    pub fn close_borrow_frame(&mut self, frame: FrameId) -> QubitResult<()> {
        self.scopes.close_frame(frame)
    }

    /// Run `body` inside its own borrow frame, closing the frame on every
    /// exit path.
    ///
    /// If `body` fails with qubits still borrowed, its error takes
    /// precedence and the leak is logged; otherwise a leaky close surfaces
    /// as [`QubitError::QubitLeak`].
    pub fn with_borrow_frame<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> QubitResult<T>,
    ) -> QubitResult<T> {
        let frame = self.open_borrow_frame();
        let out = body(self);
        let closed = self.close_borrow_frame(frame);
        match out {
            Ok(value) => closed.map(|_| value),
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "borrow frame left dirty by failing scope");
                }
                Err(e)
            }
        }
    }

    /// Check that every handle belongs to this manager and no identifier
    /// appears twice.
    ///
    /// Every multi-qubit gate operation must run this before use: an
    /// operation's qubit arguments must name distinct physical qubits.
    pub fn validate_distinct(&self, qubits: &[Qubit]) -> QubitResult<()> {
        let mut seen = FxHashSet::default();
        for q in qubits {
            if q.owner() != self.tag {
                return Err(QubitError::ForeignHandle(q.id()));
            }
            if !seen.insert(q.id()) {
                return Err(QubitError::NotDistinctQubits(q.id()));
            }
        }
        Ok(())
    }

    /// Current size of the identifier space. Monotonic.
    pub fn capacity(&self) -> u32 {
        self.pool.capacity()
    }

    /// Number of free identifiers.
    pub fn free_count(&self) -> usize {
        self.pool.free_count()
    }

    /// Number of allocated identifiers, borrow fallbacks included.
    pub fn allocated_count(&self) -> usize {
        self.pool.allocated_count()
    }

    /// Number of identifiers currently lent to borrow frames.
    pub fn borrowed_count(&self) -> usize {
        self.pool.borrowed_count()
    }

    /// Number of qubits a borrow request could satisfy without allocating.
    pub fn borrowable_count(&self) -> usize {
        if self.disable_borrowing {
            0
        } else {
            self.pool.free_count()
        }
    }

    /// Max identifier ever handed out, plus one. Backends use this to size
    /// growable per-qubit storage.
    pub fn high_water_mark(&self) -> u32 {
        self.pool.high_water_mark()
    }

    /// Lifecycle state of an identifier, `None` past the capacity bound.
    pub fn state_of(&self, id: QubitId) -> Option<QubitState> {
        self.pool.state_of(id)
    }

    /// Whether `qubit` was handed out by this manager.
    pub fn owns(&self, qubit: &Qubit) -> bool {
        qubit.owner() == self.tag
    }

    /// Whether `qubit` is one of this manager's currently allocated qubits.
    pub fn is_allocated(&self, qubit: &Qubit) -> bool {
        self.owns(qubit) && self.pool.state_of(qubit.id()) == Some(QubitState::Allocated)
    }

    /// Shared access to the backend hook.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend hook, for gate application and other
    /// engine-side effects between manager calls.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consume the manager, recovering the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn unwind_allocation(&mut self, taken: &[QubitId]) {
        for &id in taken.iter().rev() {
            let _ = self.backend.retire(id);
            let _ = self.pool.give_back(id);
        }
    }

    fn unwind_borrow(&mut self, lent: &[QubitId], fallback: &[QubitId]) {
        for &id in fallback.iter().rev() {
            self.scopes.current().remove_fallback(id);
            let _ = self.backend.retire(id);
            let _ = self.pool.give_back(id);
        }
        for &id in lent.iter().rev() {
            self.scopes.current().unlend(id);
            let _ = self.pool.unmark_borrowed(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;

    fn manager() -> QubitManager<NullBackend> {
        QubitManager::new(NullBackend)
    }

    #[test]
    fn test_allocate_release_cycle() {
        let mut qm = manager();
        let q = qm.allocate().unwrap();
        assert_eq!(q.id(), QubitId(0));
        assert!(qm.is_allocated(&q));
        qm.release(q).unwrap();
        assert_eq!(qm.allocated_count(), 0);
        assert_eq!(qm.state_of(QubitId(0)), Some(QubitState::Free));
    }

    #[test]
    fn test_multi_allocation_is_sequential() {
        let mut qm = manager();
        let qs = qm.allocate_many(4).unwrap();
        let ids: Vec<u32> = qs.iter().map(|q| q.id().0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(qm.high_water_mark(), 4);
    }

    #[test]
    fn test_double_release_rejected() {
        let mut qm = manager();
        let q = qm.allocate().unwrap();
        qm.release(q).unwrap();
        assert!(matches!(qm.release(q), Err(QubitError::NotAllocated(_))));
    }

    #[test]
    fn test_release_of_duplicate_handles_rejected() {
        let mut qm = manager();
        let q = qm.allocate().unwrap();
        let err = qm.release_many(&[q, q]).unwrap_err();
        assert!(matches!(err, QubitError::NotDistinctQubits(id) if id == q.id()));
        // Validation happens before any state change.
        assert!(qm.is_allocated(&q));
    }

    #[test]
    fn test_validate_distinct() {
        let mut qm = manager();
        let qs = qm.allocate_many(2).unwrap();
        qm.validate_distinct(&qs).unwrap();
        let err = qm.validate_distinct(&[qs[1], qs[0], qs[1]]).unwrap_err();
        assert!(matches!(err, QubitError::NotDistinctQubits(id) if id == qs[1].id()));
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut qm_a = manager();
        let mut qm_b = manager();
        let q = qm_b.allocate().unwrap();
        assert!(qm_b.owns(&q));
        assert!(!qm_a.owns(&q));
        assert!(matches!(
            qm_a.validate_distinct(&[q]),
            Err(QubitError::ForeignHandle(_))
        ));
        assert!(matches!(qm_a.release(q), Err(QubitError::ForeignHandle(_))));
        qm_b.release(q).unwrap();
    }

    #[test]
    fn test_borrow_prefers_smallest_free_ids() {
        let mut qm = manager();
        let qs = qm.allocate_many(3).unwrap(); // 0, 1, 2
        qm.release(qs[1]).unwrap(); // 1 free
        let b = qm.borrow_many(2).unwrap();
        let ids: Vec<u32> = b.iter().map(|q| q.id().0).collect();
        assert_eq!(ids, vec![1, 3]);
        qm.return_borrowed(&b).unwrap();
    }

    #[test]
    fn test_borrow_never_touches_backend_for_true_borrows() {
        // Borrowed ids must not alias allocation while lent.
        let mut qm = manager();
        let b = qm.borrow().unwrap();
        let a = qm.allocate_many(7).unwrap();
        assert!(a.iter().all(|q| q.id() != b.id()));
        qm.return_borrowed(&[b]).unwrap();
        qm.release_many(&a).unwrap();
    }

    #[test]
    fn test_disabled_borrowing_degrades_to_allocation() {
        let cfg = QubitManagerConfig::default().with_disable_borrowing(true);
        let mut qm = QubitManager::with_config(NullBackend, cfg);
        assert_eq!(qm.borrowable_count(), 0);
        let b = qm.borrow_many(2).unwrap();
        assert_eq!(qm.allocated_count(), 2);
        assert_eq!(qm.borrowed_count(), 0);
        qm.return_borrowed(&b).unwrap();
        assert_eq!(qm.allocated_count(), 0);
    }

    #[test]
    fn test_return_of_unborrowed_qubit_rejected() {
        let mut qm = manager();
        let q = qm.allocate().unwrap();
        assert!(matches!(
            qm.return_borrowed(&[q]),
            Err(QubitError::NotBorrowed(_))
        ));
        qm.release(q).unwrap();
    }

    #[test]
    fn test_with_borrow_frame_closes_on_success() {
        let mut qm = manager();
        let width = qm
            .with_borrow_frame(|qm| {
                let b = qm.borrow_many(3)?;
                let width = b.len();
                qm.return_borrowed(&b)?;
                Ok(width)
            })
            .unwrap();
        assert_eq!(width, 3);
        assert_eq!(qm.borrowed_count(), 0);
    }

    #[test]
    fn test_with_borrow_frame_reports_leak() {
        let mut qm = manager();
        let err = qm
            .with_borrow_frame(|qm| {
                let _leaked = qm.borrow()?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, QubitError::QubitLeak { count: 1, .. }));
    }

    #[test]
    fn test_config_builder() {
        let cfg = QubitManagerConfig::default()
            .with_initial_capacity(64)
            .with_may_extend_capacity(false)
            .with_enforce_zero_state(false);
        assert_eq!(cfg.initial_capacity, 64);
        assert!(!cfg.may_extend_capacity);
        assert!(!cfg.enforce_zero_state_on_release);
    }
}
