//! Cache-line geometry and address-to-line-key derivation
//!
//! Two addresses alias to the same [`LineKey`] iff they fall in the same
//! cache line. The line size must be a power of two so the mask clears
//! exactly the intra-line bits; anything else is rejected at construction
//! time, before any address can be mis-masked.

use thiserror::Error;

/// Default cache line size in bytes.
pub const DEFAULT_LINE_BYTES: u64 = 64;

/// Errors for malformed cache-line configuration
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("cache line size must be a non-zero power of two, got {0}")]
    NotPowerOfTwo(u64),
}

/// A cache-line key: an accessed address with the intra-line bits cleared.
///
/// Value equality only; two accesses share a key iff they fall in the same
/// line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey(pub u64);

/// Validated cache-line geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineGeometry {
    line_bytes: u64,
    mask: u64,
}

impl LineGeometry {
    /// Build a geometry for the given line size.
    ///
    /// Fails unless `line_bytes` is a non-zero power of two.
    pub fn new(line_bytes: u64) -> Result<Self, GeometryError> {
        if !line_bytes.is_power_of_two() {
            return Err(GeometryError::NotPowerOfTwo(line_bytes));
        }
        Ok(Self {
            line_bytes,
            mask: !(line_bytes - 1),
        })
    }

    /// Line size in bytes.
    pub fn line_bytes(&self) -> u64 {
        self.line_bytes
    }

    /// Map an address to its cache-line key.
    #[inline]
    pub fn key(&self, addr: u64) -> LineKey {
        LineKey(addr & self.mask)
    }
}

impl Default for LineGeometry {
    fn default() -> Self {
        Self {
            line_bytes: DEFAULT_LINE_BYTES,
            mask: !(DEFAULT_LINE_BYTES - 1),
        }
    }
}
