//! Identifier pool: the space of qubit ids `[0, capacity)`.
//!
//! Reuse order is LIFO — the most recently freed id is handed out next,
//! which keeps the active id range small and improves locality for the
//! numeric backend. Capacity grows by doubling when exhaustion is permitted
//! to extend it, and never shrinks.

use crate::error::{QubitError, QubitResult};
use crate::handle::QubitId;
use tracing::debug;

/// Smallest identifier space a pool will manage.
pub const MIN_CAPACITY: u32 = 8;

/// Lifecycle state of one identifier slot.
///
/// Every id in `[0, capacity)` is in exactly one state at any time.
/// `BorrowAllocated` marks ids allocated only to satisfy a borrow request
/// that found no free disjoint id; they are freed by the borrow-return
/// path, never by `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QubitState {
    /// Not allocated and not lent to any borrow frame.
    Free,
    /// Allocated to the calling program.
    Allocated,
    /// Lent to an open borrow frame.
    Borrowed,
    /// Allocated as borrow fallback, owned by an open borrow frame.
    BorrowAllocated,
}

/// Owns the identifier space: state table, LIFO free stack, growth policy,
/// and the high-water mark backends use for sizing.
#[derive(Debug)]
pub(crate) struct IdPool {
    states: Vec<QubitState>,
    /// Free stack, top = next id to hand out. Seeded high-to-low so a
    /// fresh pool yields 0, 1, 2, …
    free: Vec<QubitId>,
    may_extend: bool,
    high_water: u32,
    allocated: usize,
    borrowed: usize,
}

impl IdPool {
    pub(crate) fn new(initial_capacity: u32, may_extend: bool) -> Self {
        let capacity = initial_capacity.max(MIN_CAPACITY);
        Self {
            states: vec![QubitState::Free; capacity as usize],
            free: (0..capacity).rev().map(QubitId).collect(),
            may_extend,
            high_water: 0,
            allocated: 0,
            borrowed: 0,
        }
    }

    /// Pop a free id, growing capacity if exhausted and permitted.
    ///
    /// `None` means exhaustion with growth disallowed; the facade turns
    /// that into `NotEnoughQubits` with its own requested count.
    pub(crate) fn take_free(&mut self, for_borrow: bool) -> Option<QubitId> {
        if self.free.is_empty() {
            if !self.may_extend {
                return None;
            }
            self.grow();
        }
        let id = self.free.pop()?;
        self.states[id.index()] = if for_borrow {
            QubitState::BorrowAllocated
        } else {
            QubitState::Allocated
        };
        self.allocated += 1;
        self.high_water = self.high_water.max(id.0 + 1);
        Some(id)
    }

    /// Return an allocated id to the free stack.
    pub(crate) fn give_back(&mut self, id: QubitId) -> QubitResult<()> {
        match self.state_of(id) {
            Some(QubitState::Allocated) | Some(QubitState::BorrowAllocated) => {
                self.states[id.index()] = QubitState::Free;
                self.free.push(id);
                self.allocated -= 1;
                Ok(())
            }
            other => Err(QubitError::InternalConsistency(format!(
                "give_back of {id} in state {other:?}"
            ))),
        }
    }

    /// Move a free id into the borrowed state, out of the free stack.
    pub(crate) fn mark_borrowed(&mut self, id: QubitId) -> QubitResult<()> {
        if self.state_of(id) != Some(QubitState::Free) {
            return Err(QubitError::InternalConsistency(format!(
                "borrow of non-free id {id}"
            )));
        }
        let pos = self
            .free
            .iter()
            .position(|&f| f == id)
            .ok_or_else(|| QubitError::InternalConsistency(format!("{id} missing from free stack")))?;
        self.free.remove(pos);
        self.states[id.index()] = QubitState::Borrowed;
        self.borrowed += 1;
        self.high_water = self.high_water.max(id.0 + 1);
        Ok(())
    }

    /// Move a borrowed id back to free, reusable LIFO-next.
    pub(crate) fn unmark_borrowed(&mut self, id: QubitId) -> QubitResult<()> {
        if self.state_of(id) != Some(QubitState::Borrowed) {
            return Err(QubitError::InternalConsistency(format!(
                "borrow-return of non-borrowed id {id}"
            )));
        }
        self.states[id.index()] = QubitState::Free;
        self.free.push(id);
        self.borrowed -= 1;
        Ok(())
    }

    /// Free ids, smallest first — the borrow selection order.
    pub(crate) fn free_ids_ascending(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == QubitState::Free)
            .map(|(i, _)| QubitId::from(i))
    }

    fn grow(&mut self) {
        let old = self.states.len() as u32;
        let new = old * 2;
        debug!(old_capacity = old, new_capacity = new, "extending qubit capacity");
        self.states.resize(new as usize, QubitState::Free);
        // Lowest new id comes off the stack first.
        self.free.extend((old..new).rev().map(QubitId));
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.states.len() as u32
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn allocated_count(&self) -> usize {
        self.allocated
    }

    pub(crate) fn borrowed_count(&self) -> usize {
        self.borrowed
    }

    /// Max id ever handed out, plus one. Zero for a virgin pool.
    pub(crate) fn high_water_mark(&self) -> u32 {
        self.high_water
    }

    pub(crate) fn state_of(&self, id: QubitId) -> Option<QubitState> {
        self.states.get(id.index()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_pool_hands_out_ascending_ids() {
        let mut pool = IdPool::new(8, false);
        for expected in 0..8 {
            assert_eq!(pool.take_free(false), Some(QubitId(expected)));
        }
        assert_eq!(pool.take_free(false), None);
    }

    #[test]
    fn test_lifo_reuse() {
        let mut pool = IdPool::new(8, false);
        let a = pool.take_free(false).unwrap();
        let b = pool.take_free(false).unwrap();
        pool.give_back(a).unwrap();
        pool.give_back(b).unwrap();
        // Most recently freed first.
        assert_eq!(pool.take_free(false), Some(b));
        assert_eq!(pool.take_free(false), Some(a));
    }

    #[test]
    fn test_capacity_doubles_on_exhaustion() {
        let mut pool = IdPool::new(8, true);
        for _ in 0..8 {
            pool.take_free(false).unwrap();
        }
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.take_free(false), Some(QubitId(8)));
        assert_eq!(pool.capacity(), 16);
        assert_eq!(pool.high_water_mark(), 9);
    }

    #[test]
    fn test_minimum_capacity_applies() {
        let pool = IdPool::new(2, false);
        assert_eq!(pool.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn test_give_back_of_free_id_is_consistency_error() {
        let mut pool = IdPool::new(8, false);
        let err = pool.give_back(QubitId(0)).unwrap_err();
        assert!(matches!(err, QubitError::InternalConsistency(_)));
    }

    #[test]
    fn test_borrow_marking_removes_from_free_stack() {
        let mut pool = IdPool::new(8, false);
        pool.mark_borrowed(QubitId(0)).unwrap();
        assert_eq!(pool.state_of(QubitId(0)), Some(QubitState::Borrowed));
        // 0 is lent; allocation must skip it.
        for _ in 0..7 {
            assert_ne!(pool.take_free(false), Some(QubitId(0)));
        }
        assert_eq!(pool.take_free(false), None);
        pool.unmark_borrowed(QubitId(0)).unwrap();
        assert_eq!(pool.take_free(false), Some(QubitId(0)));
    }

    #[test]
    fn test_free_ids_ascending_skips_taken() {
        let mut pool = IdPool::new(8, false);
        pool.take_free(false).unwrap(); // 0
        pool.mark_borrowed(QubitId(2)).unwrap();
        let free: Vec<u32> = pool.free_ids_ascending().map(|q| q.0).collect();
        assert_eq!(free, vec![1, 3, 4, 5, 6, 7]);
    }
}
