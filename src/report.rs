//! Report rendering and the report sink
//!
//! Rendering happens once, after aggregation: an optional reason line, the
//! whole-run summary block, a blank line, then the per-unit table sorted by
//! the ranking key. The rendered text leaves the process in a single
//! buffered write to either a file or a standard-output descriptor
//! duplicated at startup.

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::AsFd;
use std::path::Path;

use crate::cli::RankBy;
use crate::filter::UnitFilter;

const COLUMN_WIDTH: usize = 13;
const NAME_GUTTER: &str = "      ";

/// Everything the reporter needs, snapshotted at finalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WssReport {
    /// Early-exit reason; absent on normal completion
    pub reason: Option<String>,
    /// Global instruction count
    pub instructions: u64,
    /// Raw recorded read count
    pub reads: u64,
    /// Raw recorded write count
    pub writes: u64,
    /// Program-wide unique cache lines, the union across all units
    pub wss_lines: u64,
    /// Cache line size used to scale footprints to bytes
    pub line_bytes: u64,
    /// One row per registered unit, in registration order
    pub rows: Vec<ReportRow>,
}

/// Per-unit report row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub name: String,
    /// Start address; sort tie-break only, never displayed
    pub addr: u64,
    pub read_lines: u64,
    pub write_lines: u64,
    pub combined_lines: u64,
    pub reads: u64,
    pub writes: u64,
    pub calls: u64,
    pub instructions: u64,
}

impl ReportRow {
    /// Raw access count, the alternative ranking key.
    fn accesses(&self) -> u64 {
        self.reads + self.writes
    }
}

/// Scale a byte count for display: plain bytes under 10 KiB, then KiB, MiB
/// and GiB with integer truncation at each boundary.
pub fn format_bytes(bytes: u64) -> String {
    const KIBI: u64 = 1024;
    const MIBI: u64 = 1024 * 1024;
    const GIBI: u64 = 1024 * 1024 * 1024;

    if bytes < 10 * KIBI {
        format!("{bytes} B")
    } else if bytes < 10 * MIBI {
        format!("{} KiB", bytes / KIBI)
    } else if bytes < 10 * GIBI {
        format!("{} MiB", bytes / MIBI)
    } else {
        format!("{} GiB", bytes / GIBI)
    }
}

/// Render the full report text.
///
/// The early-exit and normal paths share this algorithm; only the presence
/// of the reason line differs. Rows are sorted descending by the ranking
/// key, ties broken by ascending unit start address so equal-footprint
/// units render in a stable order.
pub fn render(report: &WssReport, rank_by: RankBy, filter: &UnitFilter) -> String {
    let mut out = String::new();

    if let Some(reason) = &report.reason {
        out.push_str(reason);
        out.push('\n');
    }
    out.push_str(&format!("{} instructions\n", report.instructions));
    out.push_str(&format!("{} accesses\n", report.reads + report.writes));
    out.push_str(&format!("{} reads\n", report.reads));
    out.push_str(&format!("{} writes\n", report.writes));
    out.push_str(&format!(
        "WSS {}\n",
        format_bytes(report.wss_lines * report.line_bytes)
    ));
    out.push('\n');

    out.push_str(&format!(
        "{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{}function\n",
        "WSS (R)",
        "WSS (W)",
        "WSS",
        "calls",
        "insn",
        NAME_GUTTER,
        w = COLUMN_WIDTH
    ));

    let mut rows: Vec<&ReportRow> = report
        .rows
        .iter()
        .filter(|row| filter.should_report(&row.name))
        .collect();
    rows.sort_by(|lhs, rhs| {
        let key = match rank_by {
            RankBy::Wss => rhs.combined_lines.cmp(&lhs.combined_lines),
            RankBy::Accesses => rhs.accesses().cmp(&lhs.accesses()),
        };
        key.then_with(|| lhs.addr.cmp(&rhs.addr))
    });

    for row in rows {
        out.push_str(&format!(
            "{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{}{}\n",
            format_bytes(row.read_lines * report.line_bytes),
            format_bytes(row.write_lines * report.line_bytes),
            format_bytes(row.combined_lines * report.line_bytes),
            row.calls,
            row.instructions,
            NAME_GUTTER,
            row.name,
            w = COLUMN_WIDTH
        ));
    }

    out
}

/// Report destination, opened before collection starts so that destination
/// failures abort the run up front.
#[derive(Debug)]
pub struct ReportSink {
    dest: File,
}

impl ReportSink {
    /// Duplicate the standard-output descriptor.
    ///
    /// The duplicate keeps the report deliverable even if the embedding
    /// tool later redirects or closes fd 1.
    pub fn stdout() -> io::Result<Self> {
        let fd = io::stdout().as_fd().try_clone_to_owned()?;
        Ok(Self {
            dest: File::from(fd),
        })
    }

    /// Create (or truncate) a report file.
    pub fn file(path: &Path) -> io::Result<Self> {
        Ok(Self {
            dest: File::create(path)?,
        })
    }

    /// Write the rendered report once and flush.
    ///
    /// No partial-output guarantee on failure.
    pub fn write_report(mut self, text: &str) -> io::Result<()> {
        self.dest.write_all(text.as_bytes())?;
        self.dest.flush()
    }
}
