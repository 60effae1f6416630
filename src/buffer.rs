//! Bounded access record stores
//!
//! Each store is an arena reserved once, up front, and filled through a
//! monotonically advancing cursor (the vector length). Capacity is the
//! caller's precondition: the collaborator checks [`AccessBuffer::is_full`]
//! before every recorded access, so the append itself carries no
//! release-mode bound check.

use crate::registry::UnitHandle;

/// One recorded memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    /// Owning attribution unit
    pub unit: UnitHandle,
    /// Raw accessed address
    pub addr: u64,
}

/// Fixed-capacity, append-only store of access records
#[derive(Debug)]
pub struct AccessBuffer {
    records: Vec<AccessRecord>,
    capacity: usize,
}

impl AccessBuffer {
    /// Reserve a store for `capacity` records.
    ///
    /// The reservation is address space, not resident memory; pages commit
    /// as the cursor advances, so the 256 Mi default stays cheap for short
    /// runs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one record at the cursor.
    ///
    /// Precondition: `!self.is_full()`. The caller enforces this by polling
    /// capacity before every access.
    #[inline]
    pub fn push(&mut self, unit: UnitHandle, addr: u64) {
        debug_assert!(
            self.records.len() < self.capacity,
            "access store overflow: capacity must be checked before push"
        );
        self.records.push(AccessRecord { unit, addr });
    }

    /// Cursor position, equal to the number of records stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True once the cursor has reached the reserved capacity.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records stored so far, in intake order.
    pub fn records(&self) -> &[AccessRecord] {
        &self.records
    }
}
