//! Capacity ceilings and the early-exit predicate
//!
//! The limits never gate intake themselves. The collaborator evaluates
//! [`CapacityLimits::reached`] before every recorded access; the first true
//! answer triggers early termination, so the stores never grow past their
//! bound and the instruction ceiling takes effect at the next guarded
//! access.

/// Default capacity of each access record store (256 Mi records).
pub const DEFAULT_MAX_RECORDS: usize = 256 * 1024 * 1024;

/// Default global instruction ceiling.
pub const DEFAULT_MAX_INSTRUCTIONS: u64 = 4_000_000_000;

/// Hard ceilings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityLimits {
    /// Capacity of each access record store
    pub max_records: usize,
    /// Global instruction ceiling
    pub max_instructions: u64,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
        }
    }
}

impl CapacityLimits {
    /// True once the instruction counter or either store cursor has reached
    /// its ceiling.
    ///
    /// Comparison is `>=`, not `==`: a block-sized instruction delta can
    /// step over the ceiling without ever equaling it, and the predicate
    /// must still fire.
    #[inline]
    pub fn reached(&self, instructions: u64, read_cursor: usize, write_cursor: usize) -> bool {
        instructions >= self.max_instructions
            || read_cursor >= self.max_records
            || write_cursor >= self.max_records
    }
}
