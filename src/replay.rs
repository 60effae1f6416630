//! Address-trace replay: the event-producing side of the engine contract
//!
//! Replays a line-oriented trace against a [`WssEngine`] under the same
//! check-then-call discipline an instrumentation host uses: the capacity
//! predicate is polled before every recorded access, and the first true
//! answer abandons the rest of the trace and finalizes early.
//!
//! # Trace format
//!
//! One event per line; `#` starts a comment; blank lines are ignored.
//!
//! ```text
//! unit <hex-addr> <name...>    declare a routine (name = rest of line)
//! call <hex-addr>              routine entry; becomes the current unit
//! block <count>                a basic block retired <count> instructions
//! r <hex-addr>                 memory read at address
//! w <hex-addr>                 memory write at address
//! ```
//!
//! Addresses are hexadecimal, `0x` prefix optional.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::engine::WssEngine;
use crate::registry::UnitHandle;
use crate::report::WssReport;

/// Name given to the single attribution unit in flat mode.
pub const FLAT_UNIT_NAME: &str = "<program>";

/// One parsed trace event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// Routine declaration
    Unit { addr: u64, name: String },
    /// Routine entry
    Call { addr: u64 },
    /// Basic block retirement with an instruction count
    Block { count: u64 },
    /// Memory read
    Read { addr: u64 },
    /// Memory write
    Write { addr: u64 },
}

/// Parse one trace line. Returns `None` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<TraceEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let Some(kind) = parts.next() else {
        return Ok(None);
    };
    let payload = parts.next().unwrap_or("").trim();

    let event = match kind {
        "unit" => {
            let mut fields = payload.splitn(2, char::is_whitespace);
            let addr = parse_addr(fields.next().unwrap_or(""))?;
            let name = fields.next().unwrap_or("").trim();
            if name.is_empty() {
                bail!("unit record is missing a name");
            }
            TraceEvent::Unit {
                addr,
                name: name.to_string(),
            }
        }
        "call" => TraceEvent::Call {
            addr: parse_addr(payload)?,
        },
        "block" => TraceEvent::Block {
            count: payload
                .parse::<u64>()
                .with_context(|| format!("Invalid instruction count: '{payload}'"))?,
        },
        "r" => TraceEvent::Read {
            addr: parse_addr(payload)?,
        },
        "w" => TraceEvent::Write {
            addr: parse_addr(payload)?,
        },
        other => bail!("unknown event kind '{other}'"),
    };
    Ok(Some(event))
}

fn parse_addr(field: &str) -> Result<u64> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid address: '{field}'"))
}

/// Replay a trace file, memory-mapped so large traces need no read loop.
pub fn replay_path(path: &Path, engine: WssEngine, flat: bool) -> Result<WssReport> {
    let file =
        File::open(path).with_context(|| format!("Failed to open trace: {}", path.display()))?;
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .with_context(|| format!("Failed to memory-map trace: {}", path.display()))?;
    replay_bytes(&mmap, engine, flat)
}

/// Replay a trace read from standard input.
pub fn replay_stdin(engine: WssEngine, flat: bool) -> Result<WssReport> {
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .context("Failed to read trace from stdin")?;
    replay_bytes(&buf, engine, flat)
}

/// Drive `engine` with every event in `bytes` and finalize it.
///
/// Capacity exhaustion is not an error: the remaining trace is abandoned
/// and the early-exit report is returned. Malformed lines, reads or writes
/// before any `call`, and calls into undeclared routines fail with a
/// line-numbered diagnostic.
pub fn replay_bytes(bytes: &[u8], mut engine: WssEngine, flat: bool) -> Result<WssReport> {
    let mut units: HashMap<u64, UnitHandle> = HashMap::new();
    let flat_unit = flat.then(|| engine.register_unit(FLAT_UNIT_NAME, 0));
    let mut current: Option<UnitHandle> = flat_unit;

    for (index, raw) in bytes.split(|&b| b == b'\n').enumerate() {
        let lineno = index + 1;
        let line = std::str::from_utf8(raw)
            .with_context(|| format!("trace line {lineno}: not valid UTF-8"))?;
        let Some(event) = parse_line(line).with_context(|| format!("trace line {lineno}"))?
        else {
            continue;
        };

        match event {
            TraceEvent::Unit { addr, name } => {
                // Flat mode attributes everything to one unit; routine
                // declarations carry no information there.
                if !flat {
                    units
                        .entry(addr)
                        .or_insert_with(|| engine.register_unit(&name, addr));
                }
            }
            TraceEvent::Call { addr } => match flat_unit {
                Some(unit) => engine.count_unit_entry(unit),
                None => match units.get(&addr) {
                    Some(&unit) => {
                        current = Some(unit);
                        engine.count_unit_entry(unit);
                    }
                    None => bail!("trace line {lineno}: call into undeclared routine {addr:#x}"),
                },
            },
            TraceEvent::Block { count } => {
                engine.count_block_instructions(count);
                // One per-unit count per retired instruction, as a host
                // with an instruction hook would deliver them.
                if let Some(unit) = current {
                    for _ in 0..count {
                        engine.count_unit_instruction(unit);
                    }
                }
            }
            TraceEvent::Read { addr } => {
                if engine.at_capacity() {
                    tracing::debug!("capacity reached at trace line {lineno}, abandoning replay");
                    return Ok(engine.on_early_exit()?);
                }
                let unit = current_unit(current, lineno)?;
                engine.record_read(unit, addr);
            }
            TraceEvent::Write { addr } => {
                if engine.at_capacity() {
                    tracing::debug!("capacity reached at trace line {lineno}, abandoning replay");
                    return Ok(engine.on_early_exit()?);
                }
                let unit = current_unit(current, lineno)?;
                engine.record_write(unit, addr);
            }
        }
    }

    Ok(engine.on_normal_exit()?)
}

fn current_unit(current: Option<UnitHandle>, lineno: usize) -> Result<UnitHandle> {
    current.with_context(|| format!("trace line {lineno}: memory access before any call record"))
}
