//! Qubit identifiers and caller-visible handles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a qubit resource slot within one manager instance.
///
/// Identifiers are recycled: a released qubit's id is reused by a later
/// allocation. They are unique only while allocated or borrowed, and only
/// within the manager that handed them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    /// The slot index this id names, for backends indexing growable storage.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

impl From<usize> for QubitId {
    fn from(id: usize) -> Self {
        QubitId(u32::try_from(id).expect("QubitId overflow: exceeds u32::MAX"))
    }
}

/// Tag identifying one manager instance.
///
/// Minted from a process-wide counter so handles from two managers, even
/// managers with overlapping id spaces, never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagerTag(u64);

static NEXT_TAG: AtomicU64 = AtomicU64::new(0);

impl ManagerTag {
    pub(crate) fn mint() -> Self {
        ManagerTag(NEXT_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

/// Opaque handle to an allocated or borrowed qubit.
///
/// Handles originate from [`QubitBackend::construct`] during allocation or
/// borrowing; there is no other lawful way to obtain one. Equality and
/// hashing cover both the identifier and the owning manager's tag.
///
/// [`QubitBackend::construct`]: crate::backend::QubitBackend::construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Qubit {
    id: QubitId,
    owner: ManagerTag,
}

impl Qubit {
    /// Build a handle for `id` owned by the manager tagged `owner`.
    ///
    /// For use from [`QubitBackend::construct`] implementations only.
    /// Handles built outside an allocation or borrow path reference no
    /// live slot and are rejected by every manager operation.
    ///
    /// [`QubitBackend::construct`]: crate::backend::QubitBackend::construct
    pub fn new(id: QubitId, owner: ManagerTag) -> Self {
        Self { id, owner }
    }

    /// The identifier this handle references.
    pub fn id(&self) -> QubitId {
        self.id
    }

    /// The tag of the manager that owns this handle.
    pub fn owner(&self) -> ManagerTag {
        self.owner
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
