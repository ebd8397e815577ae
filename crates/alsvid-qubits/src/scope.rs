//! Nested borrow scopes.
//!
//! Each open scope is one frame on a stack the manager owns. A frame
//! records the ids lent into its scope and the ids allocated as borrow
//! fallback. Because lending moves an id out of the free state, a new
//! frame's lent set can never intersect an ancestor's — the disjointness
//! invariant is structural, not checked after the fact.
//!
//! A root frame is open from construction and never closes; borrows issued
//! outside any explicit scope land there.

use crate::error::{QubitError, QubitResult};
use crate::handle::QubitId;
use rustc_hash::FxHashSet;

/// Handle to one open borrow frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

#[derive(Debug)]
pub(crate) struct BorrowFrame {
    id: FrameId,
    /// Ids truly borrowed (free ids lent into this scope).
    lent: FxHashSet<QubitId>,
    /// Ids allocated because no free disjoint id was available.
    fallback: FxHashSet<QubitId>,
}

impl BorrowFrame {
    fn new(id: FrameId) -> Self {
        Self {
            id,
            lent: FxHashSet::default(),
            fallback: FxHashSet::default(),
        }
    }

    pub(crate) fn lend(&mut self, id: QubitId) {
        self.lent.insert(id);
    }

    pub(crate) fn record_fallback(&mut self, id: QubitId) {
        self.fallback.insert(id);
    }

    pub(crate) fn unlend(&mut self, id: QubitId) -> bool {
        self.lent.remove(&id)
    }

    pub(crate) fn remove_fallback(&mut self, id: QubitId) -> bool {
        self.fallback.remove(&id)
    }

    pub(crate) fn holds_lent(&self, id: QubitId) -> bool {
        self.lent.contains(&id)
    }

    pub(crate) fn holds_fallback(&self, id: QubitId) -> bool {
        self.fallback.contains(&id)
    }

    /// Ids this frame still owes back.
    pub(crate) fn outstanding(&self) -> usize {
        self.lent.len() + self.fallback.len()
    }
}

/// Stack of open borrow frames; index 0 is the root frame.
#[derive(Debug)]
pub(crate) struct BorrowStack {
    frames: Vec<BorrowFrame>,
    next: u64,
}

impl BorrowStack {
    pub(crate) fn new() -> Self {
        Self {
            frames: vec![BorrowFrame::new(FrameId(0))],
            next: 1,
        }
    }

    pub(crate) fn open_frame(&mut self) -> FrameId {
        let id = FrameId(self.next);
        self.next += 1;
        self.frames.push(BorrowFrame::new(id));
        id
    }

    /// Close the innermost frame.
    ///
    /// Closing any other frame, the root frame, or a frame with qubits
    /// still lent is a manager-usage bug and fails loudly: masking it
    /// would corrupt the identifier space for the rest of the run.
    pub(crate) fn close_frame(&mut self, frame: FrameId) -> QubitResult<()> {
        let top = self.frames.last().expect("borrow stack never empty");
        if top.id != frame {
            return Err(QubitError::FrameMismatch {
                expected: top.id,
                got: frame,
            });
        }
        if self.frames.len() == 1 {
            return Err(QubitError::InternalConsistency(
                "root borrow frame cannot be closed".into(),
            ));
        }
        if top.outstanding() > 0 {
            return Err(QubitError::QubitLeak {
                frame,
                count: top.outstanding(),
            });
        }
        self.frames.pop();
        Ok(())
    }

    pub(crate) fn current(&mut self) -> &mut BorrowFrame {
        self.frames.last_mut().expect("borrow stack never empty")
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }
}
