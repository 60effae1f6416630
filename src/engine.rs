//! Working set estimation engine
//!
//! One [`WssEngine`] owns the attribution registry, both access record
//! stores, the capacity limits and the run state machine for a single run.
//! The embedding collaborator drives it through three phases: explicit
//! construction, event intake under the check-then-call contract, and
//! exactly one finalization hook that aggregates and yields the report.
//!
//! The engine is single-threaded: exactly one logical thread of control
//! delivers events, so no locking is performed and none is needed.

use thiserror::Error;

use crate::aggregate;
use crate::buffer::AccessBuffer;
use crate::cacheline::{GeometryError, LineGeometry, DEFAULT_LINE_BYTES};
use crate::capacity::{CapacityLimits, DEFAULT_MAX_INSTRUCTIONS, DEFAULT_MAX_RECORDS};
use crate::registry::{UnitHandle, UnitRegistry};
use crate::report::{ReportRow, WssReport};

/// Errors from engine construction and finalization
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("run already finished ({0:?}); finalization hooks are one-shot")]
    AlreadyFinished(RunState),
}

/// Run lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Collecting events
    Running,
    /// A capacity ceiling fired; finalization in progress
    EarlyExit,
    /// The run ended normally; finalization in progress
    Completed,
    /// Report produced; no further intake is valid
    Terminated,
}

/// Engine construction knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Cache line size in bytes; must be a power of two
    pub line_bytes: u64,
    /// Capacity of each access record store
    pub max_records: usize,
    /// Global instruction ceiling
    pub max_instructions: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            line_bytes: DEFAULT_LINE_BYTES,
            max_records: DEFAULT_MAX_RECORDS,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
        }
    }
}

/// Working set estimation engine for one run
#[derive(Debug)]
pub struct WssEngine {
    registry: UnitRegistry,
    reads: AccessBuffer,
    writes: AccessBuffer,
    instructions: u64,
    limits: CapacityLimits,
    geometry: LineGeometry,
    state: RunState,
}

impl WssEngine {
    /// Build an engine and reserve both stores up front.
    ///
    /// Fails on a non-power-of-two line size before any collection can
    /// start.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let geometry = LineGeometry::new(config.line_bytes)?;
        tracing::debug!(
            "engine initialized: line_bytes={} max_records={} max_instructions={}",
            config.line_bytes,
            config.max_records,
            config.max_instructions
        );
        Ok(Self {
            registry: UnitRegistry::new(),
            reads: AccessBuffer::with_capacity(config.max_records),
            writes: AccessBuffer::with_capacity(config.max_records),
            instructions: 0,
            limits: CapacityLimits {
                max_records: config.max_records,
                max_instructions: config.max_instructions,
            },
            geometry,
            state: RunState::Running,
        })
    }

    /// Register a newly observed attribution unit.
    ///
    /// Call once per unit and cache the handle; the engine does not
    /// deduplicate registrations.
    pub fn register_unit(&mut self, name: &str, addr: u64) -> UnitHandle {
        tracing::trace!("unit registered: {name} at {addr:#x}");
        self.registry.register(name, addr)
    }

    /// Record a read access.
    ///
    /// Precondition: `!self.at_capacity()`, checked by the caller before
    /// this call.
    #[inline]
    pub fn record_read(&mut self, unit: UnitHandle, addr: u64) {
        self.reads.push(unit, addr);
    }

    /// Record a write access. Same precondition as [`Self::record_read`].
    #[inline]
    pub fn record_write(&mut self, unit: UnitHandle, addr: u64) {
        self.writes.push(unit, addr);
    }

    /// Add one retired basic block's instruction count to the run total.
    #[inline]
    pub fn count_block_instructions(&mut self, count: u64) {
        self.instructions += count;
    }

    /// Count one entry into `unit`.
    #[inline]
    pub fn count_unit_entry(&mut self, unit: UnitHandle) {
        self.registry.get_mut(unit).calls += 1;
    }

    /// Count one instruction retired while `unit` was current.
    #[inline]
    pub fn count_unit_instruction(&mut self, unit: UnitHandle) {
        self.registry.get_mut(unit).instructions += 1;
    }

    /// True once any hard ceiling is reached.
    ///
    /// The caller polls this before every `record_read`/`record_write`;
    /// the first true answer must route to [`Self::on_early_exit`] instead
    /// of another record.
    #[inline]
    pub fn at_capacity(&self) -> bool {
        self.limits
            .reached(self.instructions, self.reads.len(), self.writes.len())
    }

    /// Finalize after a capacity ceiling fired.
    ///
    /// Aggregates everything collected so far and returns the report with
    /// the early-exit reason set. One-shot, mutually exclusive with
    /// [`Self::on_normal_exit`].
    pub fn on_early_exit(&mut self) -> Result<WssReport, EngineError> {
        if self.state != RunState::Running {
            return Err(EngineError::AlreadyFinished(self.state));
        }
        self.state = RunState::EarlyExit;
        tracing::debug!(
            "capacity reached: instructions={} reads={} writes={}",
            self.instructions,
            self.reads.len(),
            self.writes.len()
        );
        Ok(self.finish(Some("early exit")))
    }

    /// Finalize after the run ended normally.
    ///
    /// Identical to [`Self::on_early_exit`] except that the report carries
    /// no reason line. One-shot.
    pub fn on_normal_exit(&mut self) -> Result<WssReport, EngineError> {
        if self.state != RunState::Running {
            return Err(EngineError::AlreadyFinished(self.state));
        }
        self.state = RunState::Completed;
        Ok(self.finish(None))
    }

    fn finish(&mut self, reason: Option<&str>) -> WssReport {
        aggregate::aggregate(
            &mut self.registry,
            self.reads.records(),
            self.writes.records(),
            self.geometry,
        );
        let rows = self
            .registry
            .iter()
            .map(|unit| ReportRow {
                name: unit.name.clone(),
                addr: unit.addr,
                read_lines: unit.counters.unique_reads.len() as u64,
                write_lines: unit.counters.unique_writes.len() as u64,
                combined_lines: unit.counters.unique_accesses.len() as u64,
                reads: unit.counters.reads,
                writes: unit.counters.writes,
                calls: unit.calls,
                instructions: unit.instructions,
            })
            .collect();
        let report = WssReport {
            reason: reason.map(String::from),
            instructions: self.instructions,
            reads: self.reads.len() as u64,
            writes: self.writes.len() as u64,
            wss_lines: aggregate::global_working_set(&self.registry) as u64,
            line_bytes: self.geometry.line_bytes(),
            rows,
        };
        tracing::debug!(
            "aggregation complete: units={} wss_lines={}",
            report.rows.len(),
            report.wss_lines
        );
        self.state = RunState::Terminated;
        report
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Global instruction count so far.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Read records stored so far.
    pub fn recorded_reads(&self) -> usize {
        self.reads.len()
    }

    /// Write records stored so far.
    pub fn recorded_writes(&self) -> usize {
        self.writes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_engine(max_records: usize, max_instructions: u64) -> WssEngine {
        WssEngine::new(EngineConfig {
            line_bytes: 64,
            max_records,
            max_instructions,
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_line_size() {
        let err = WssEngine::new(EngineConfig {
            line_bytes: 48,
            ..EngineConfig::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Geometry(GeometryError::NotPowerOfTwo(48))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.line_bytes, 64);
        assert_eq!(config.max_records, DEFAULT_MAX_RECORDS);
        assert_eq!(config.max_instructions, DEFAULT_MAX_INSTRUCTIONS);
    }

    #[test]
    fn test_normal_exit_reaches_terminated() {
        let mut engine = small_engine(16, 1000);
        assert_eq!(engine.state(), RunState::Running);
        let report = engine.on_normal_exit().unwrap();
        assert_eq!(engine.state(), RunState::Terminated);
        assert!(report.reason.is_none());
    }

    #[test]
    fn test_early_exit_sets_reason() {
        let mut engine = small_engine(16, 1000);
        let report = engine.on_early_exit().unwrap();
        assert_eq!(engine.state(), RunState::Terminated);
        assert_eq!(report.reason.as_deref(), Some("early exit"));
    }

    #[test]
    fn test_finalization_hooks_are_one_shot() {
        let mut engine = small_engine(16, 1000);
        engine.on_normal_exit().unwrap();
        assert!(matches!(
            engine.on_normal_exit(),
            Err(EngineError::AlreadyFinished(RunState::Terminated))
        ));
        assert!(matches!(
            engine.on_early_exit(),
            Err(EngineError::AlreadyFinished(RunState::Terminated))
        ));
    }

    #[test]
    fn test_at_capacity_tracks_record_ceiling() {
        let mut engine = small_engine(2, u64::MAX);
        let unit = engine.register_unit("u", 0x1000);
        assert!(!engine.at_capacity());
        engine.record_read(unit, 0x10);
        assert!(!engine.at_capacity());
        engine.record_read(unit, 0x20);
        assert!(engine.at_capacity());
    }

    #[test]
    fn test_at_capacity_tracks_instruction_ceiling() {
        let mut engine = small_engine(16, 100);
        engine.count_block_instructions(99);
        assert!(!engine.at_capacity());
        engine.count_block_instructions(7);
        assert!(engine.at_capacity());
        assert_eq!(engine.instructions(), 106);
    }

    #[test]
    fn test_write_cursor_triggers_capacity_independently() {
        let mut engine = small_engine(1, u64::MAX);
        let unit = engine.register_unit("u", 0x1000);
        engine.record_write(unit, 0x10);
        assert!(engine.at_capacity());
        assert_eq!(engine.recorded_reads(), 0);
        assert_eq!(engine.recorded_writes(), 1);
    }

    #[test]
    fn test_report_rows_carry_per_unit_totals() {
        let mut engine = small_engine(16, 1000);
        let alpha = engine.register_unit("alpha", 0x1000);
        let beta = engine.register_unit("beta", 0x2000);
        engine.count_unit_entry(alpha);
        engine.count_unit_entry(alpha);
        engine.count_unit_instruction(alpha);
        engine.count_block_instructions(5);
        // alpha reads one line twice, beta writes two lines
        engine.record_read(alpha, 0x100);
        engine.record_read(alpha, 0x104);
        engine.record_write(beta, 0x200);
        engine.record_write(beta, 0x280);
        let report = engine.on_normal_exit().unwrap();

        assert_eq!(report.instructions, 5);
        assert_eq!(report.reads, 2);
        assert_eq!(report.writes, 2);
        assert_eq!(report.wss_lines, 3);
        assert_eq!(report.line_bytes, 64);
        assert_eq!(report.rows.len(), 2);

        let a = &report.rows[0];
        assert_eq!(a.name, "alpha");
        assert_eq!(a.calls, 2);
        assert_eq!(a.instructions, 1);
        assert_eq!(a.read_lines, 1);
        assert_eq!(a.write_lines, 0);
        assert_eq!(a.combined_lines, 1);
        assert_eq!(a.reads, 2);

        let b = &report.rows[1];
        assert_eq!(b.name, "beta");
        assert_eq!(b.calls, 0);
        assert_eq!(b.write_lines, 2);
        assert_eq!(b.combined_lines, 2);
        assert_eq!(b.writes, 2);
    }

    #[test]
    fn test_registered_but_idle_unit_gets_zero_row() {
        let mut engine = small_engine(16, 1000);
        engine.register_unit("idle", 0x3000);
        let report = engine.on_normal_exit().unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].combined_lines, 0);
        assert_eq!(report.rows[0].calls, 0);
    }

    #[test]
    fn test_empty_run_report() {
        let mut engine = small_engine(16, 1000);
        let report = engine.on_normal_exit().unwrap();
        assert_eq!(report.instructions, 0);
        assert_eq!(report.wss_lines, 0);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn test_early_exit_keeps_partial_data() {
        let mut engine = small_engine(2, u64::MAX);
        let unit = engine.register_unit("u", 0x1000);
        engine.record_read(unit, 0x0);
        engine.record_read(unit, 0x40);
        assert!(engine.at_capacity());
        let report = engine.on_early_exit().unwrap();
        assert_eq!(report.reads, 2);
        assert_eq!(report.rows[0].read_lines, 2);
    }
}
