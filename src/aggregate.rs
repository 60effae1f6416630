//! Aggregation pass: fold raw access records into per-unit footprints
//!
//! Runs once, at finalization. Deduplication is exact set membership by
//! cache-line key, so results are independent of record order and of how
//! intake was interleaved across units.

use fnv::FnvHashSet;

use crate::buffer::AccessRecord;
use crate::cacheline::{LineGeometry, LineKey};
use crate::registry::{MemCounters, UnitRegistry};

/// Fold both stores into the registry's per-unit counters, then derive
/// each unit's combined line set as the union of its read and write sets.
///
/// Units with no recorded accesses keep their empty sets; they still get a
/// report row.
pub fn aggregate(
    registry: &mut UnitRegistry,
    reads: &[AccessRecord],
    writes: &[AccessRecord],
    geometry: LineGeometry,
) {
    for record in reads {
        let counters = &mut registry.get_mut(record.unit).counters;
        counters.reads += 1;
        counters.unique_reads.insert(geometry.key(record.addr));
    }
    for record in writes {
        let counters = &mut registry.get_mut(record.unit).counters;
        counters.writes += 1;
        counters.unique_writes.insert(geometry.key(record.addr));
    }
    for unit in registry.iter_mut() {
        let MemCounters {
            unique_reads,
            unique_writes,
            unique_accesses,
            ..
        } = &mut unit.counters;
        unique_accesses.extend(unique_reads.iter().copied());
        unique_accesses.extend(unique_writes.iter().copied());
    }
}

/// Program-wide working set: the union of every unit's combined line set.
pub fn global_working_set(registry: &UnitRegistry) -> usize {
    let mut lines: FnvHashSet<LineKey> = FnvHashSet::default();
    for unit in registry.iter() {
        lines.extend(unit.counters.unique_accesses.iter().copied());
    }
    lines.len()
}
