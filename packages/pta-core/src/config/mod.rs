//! Analysis configuration
//!
//! Options are validated up front, before any solving begins; an
//! unrecognized context-sensitivity variant is a fatal configuration
//! error, never a silent fallback.
//!
//! The context-sensitivity variant is given as a string of the pattern
//! `k-kind`, where `k` is the context length limit and `kind` is the kind
//! of context element (`call`, `obj`, or `type`), e.g. `"2-obj"`.
//! `"ci"` selects context insensitivity.

use crate::errors::{AnalysisError, Result};
use crate::features::solver::work_list::Scheduling;
use serde::{Deserialize, Serialize};

/// Parsed context-sensitivity variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsVariant {
    /// Context-insensitive (baseline)
    Insensitive,

    /// k-limiting call-site sensitivity
    KCallSite(u32),

    /// k-limiting object sensitivity (receiver allocation sites)
    KObject(u32),

    /// k-limiting type sensitivity (receiver container types)
    KType(u32),
}

impl CsVariant {
    /// Parse a variant string (`"ci"` or `"k-kind"`).
    pub fn parse(cs: &str) -> Result<CsVariant> {
        if cs == "ci" {
            return Ok(CsVariant::Insensitive);
        }
        let mut splits = cs.splitn(2, '-');
        let k = splits
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|k| *k >= 1);
        let kind = splits.next();
        match (k, kind) {
            (Some(k), Some("call")) => Ok(CsVariant::KCallSite(k)),
            (Some(k), Some("obj")) => Ok(CsVariant::KObject(k)),
            (Some(k), Some("type")) => Ok(CsVariant::KType(k)),
            _ => Err(AnalysisError::Config(format!(
                "unknown context-sensitivity variant: '{cs}' \
                 (expected 'ci' or 'k-call', 'k-obj', 'k-type')"
            ))),
        }
    }

    /// Context length limit for this variant (0 for insensitive).
    pub fn limit(&self) -> u32 {
        match self {
            CsVariant::Insensitive => 0,
            CsVariant::KCallSite(k) | CsVariant::KObject(k) | CsVariant::KType(k) => *k,
        }
    }
}

/// Options controlling a single analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Context-sensitivity variant string, e.g. `"ci"`, `"2-obj"`
    pub context_sensitivity: String,

    /// Heap-context length limit; defaults to `k - 1` of the variant
    pub heap_k: Option<u32>,

    /// Merge all string-literal constants into one representative
    pub merge_string_constants: bool,

    /// Merge all mutable string-buffer objects by type
    pub merge_string_builders: bool,

    /// Merge all throwable objects by type
    pub merge_exception_objects: bool,

    /// Abort with a timeout after this many work-list steps
    pub step_budget: Option<u64>,

    /// Work-list pop order; a performance knob with no effect on the
    /// final fixed point
    pub scheduling: Scheduling,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            context_sensitivity: "ci".to_string(),
            heap_k: None,
            merge_string_constants: false,
            merge_string_builders: false,
            merge_exception_objects: false,
            step_budget: None,
            scheduling: Scheduling::Fifo,
        }
    }
}

impl AnalysisOptions {
    /// Parse and validate the configured variant.
    pub fn variant(&self) -> Result<CsVariant> {
        let variant = CsVariant::parse(&self.context_sensitivity)?;
        if let Some(heap_k) = self.heap_k {
            if heap_k > variant.limit() {
                return Err(AnalysisError::Config(format!(
                    "heap-k ({heap_k}) must not exceed the context limit ({})",
                    variant.limit()
                )));
            }
        }
        Ok(variant)
    }

    /// Effective heap-context limit: configured, or `k - 1`.
    pub fn effective_heap_k(&self) -> Result<u32> {
        let variant = self.variant()?;
        Ok(self.heap_k.unwrap_or_else(|| variant.limit().saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ci() {
        assert_eq!(CsVariant::parse("ci").unwrap(), CsVariant::Insensitive);
    }

    #[test]
    fn test_parse_k_variants() {
        assert_eq!(CsVariant::parse("2-call").unwrap(), CsVariant::KCallSite(2));
        assert_eq!(CsVariant::parse("2-obj").unwrap(), CsVariant::KObject(2));
        assert_eq!(CsVariant::parse("1-type").unwrap(), CsVariant::KType(1));
    }

    #[test]
    fn test_parse_unknown_is_fatal() {
        assert!(CsVariant::parse("3-frobnicate").is_err());
        assert!(CsVariant::parse("obj-2").is_err());
        assert!(CsVariant::parse("0-obj").is_err());
        assert!(CsVariant::parse("").is_err());
    }

    #[test]
    fn test_heap_k_defaults_to_k_minus_one() {
        let opts = AnalysisOptions {
            context_sensitivity: "2-obj".to_string(),
            ..Default::default()
        };
        assert_eq!(opts.effective_heap_k().unwrap(), 1);
    }

    #[test]
    fn test_heap_k_exceeding_limit_rejected() {
        let opts = AnalysisOptions {
            context_sensitivity: "2-obj".to_string(),
            heap_k: Some(3),
            ..Default::default()
        };
        assert!(opts.variant().is_err());
    }
}
