//! Report row filtering for --filter expressions
//!
//! Filtering narrows the report table to matching function names. It is
//! applied at render time only; collection always records every unit so
//! the run summary stays exact.

use anyhow::{Context, Result};
use regex::Regex;

/// Unit-name filter applied to report rows
#[derive(Debug, Clone)]
pub struct UnitFilter {
    /// Pattern a name must match to be reported (None = report all)
    pattern: Option<Regex>,
}

impl UnitFilter {
    /// Create a filter that reports every unit
    pub fn all() -> Self {
        Self { pattern: None }
    }

    /// Compile a name pattern like "^alloc" or "memcpy|memmove"
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("Invalid filter pattern: {pattern}"))?;
        Ok(Self {
            pattern: Some(regex),
        })
    }

    /// Check if a unit with this name should appear in the report
    pub fn should_report(&self, name: &str) -> bool {
        match &self.pattern {
            None => true,
            Some(regex) => regex.is_match(name),
        }
    }
}

impl Default for UnitFilter {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_all_reports_everything() {
        let filter = UnitFilter::all();
        assert!(filter.should_report("main"));
        assert!(filter.should_report("memcpy"));
        assert!(filter.should_report("anything"));
    }

    #[test]
    fn test_filter_anchored_prefix() {
        let filter = UnitFilter::from_pattern("^alloc").unwrap();
        assert!(filter.should_report("alloc_buffer"));
        assert!(filter.should_report("allocate"));
        assert!(!filter.should_report("my_alloc"));
    }

    #[test]
    fn test_filter_alternation() {
        let filter = UnitFilter::from_pattern("memcpy|memmove").unwrap();
        assert!(filter.should_report("memcpy"));
        assert!(filter.should_report("__memmove_avx"));
        assert!(!filter.should_report("memset"));
    }

    #[test]
    fn test_filter_unanchored_matches_substring() {
        let filter = UnitFilter::from_pattern("hash").unwrap();
        assert!(filter.should_report("rehash_table"));
        assert!(!filter.should_report("main"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = UnitFilter::from_pattern("(unclosed");
        assert!(result.is_err());
    }
}
