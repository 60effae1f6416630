//! Attribution unit registry
//!
//! Owns every attribution unit (routine) observed during a run. Units are
//! appended on first observation, keep their counters for the whole run,
//! and are never removed before the final report.

use fnv::FnvHashSet;

use crate::cacheline::LineKey;

/// Stable handle to a registered attribution unit.
///
/// Valid for the rest of the run it was issued in. The registry does not
/// deduplicate: callers register each unit once and cache the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitHandle(u32);

impl UnitHandle {
    /// Registry slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-unit memory footprint counters, filled by the aggregation pass
#[derive(Debug, Default)]
pub struct MemCounters {
    /// Raw count of recorded reads
    pub reads: u64,
    /// Raw count of recorded writes
    pub writes: u64,
    /// Unique cache lines read
    pub unique_reads: FnvHashSet<LineKey>,
    /// Unique cache lines written
    pub unique_writes: FnvHashSet<LineKey>,
    /// Unique cache lines touched by reads or writes
    pub unique_accesses: FnvHashSet<LineKey>,
}

/// One attribution unit: a routine name/start-address pair plus counters
#[derive(Debug)]
pub struct UnitRecord {
    /// Routine name, display only; names may repeat across units
    pub name: String,
    /// Routine start address
    pub addr: u64,
    /// Instructions executed while this unit was current
    pub instructions: u64,
    /// Times control entered this unit
    pub calls: u64,
    /// Memory footprint counters
    pub counters: MemCounters,
}

impl UnitRecord {
    fn new(name: String, addr: u64) -> Self {
        Self {
            name,
            addr,
            instructions: 0,
            calls: 0,
            counters: MemCounters::default(),
        }
    }
}

/// All attribution units of a run, in registration order
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<UnitRecord>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit with zeroed counters and return its handle.
    ///
    /// Registering the same address twice yields two independent units;
    /// single registration is the caller's obligation.
    pub fn register(&mut self, name: &str, addr: u64) -> UnitHandle {
        let handle = UnitHandle(self.units.len() as u32);
        self.units.push(UnitRecord::new(name.to_string(), addr));
        handle
    }

    /// Panics on a handle this registry never issued.
    #[inline]
    pub fn get(&self, handle: UnitHandle) -> &UnitRecord {
        &self.units[handle.index()]
    }

    /// Panics on a handle this registry never issued.
    #[inline]
    pub fn get_mut(&mut self, handle: UnitHandle) -> &mut UnitRecord {
        &mut self.units[handle.index()]
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitRecord> {
        self.units.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut UnitRecord> {
        self.units.iter_mut()
    }
}
