//! Transport length budgets
//!
//! Every emitted URL form has a hard cap; exceeding a form's cap forces
//! fallback to the fragment form or further segmentation. The defaults
//! mirror real transport limits: path tokens must survive copy/paste and
//! proxies, fragments must survive browser URL handling.

/// Protocol version carried in the `v` key of fragment URLs and path
/// tokens.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum archive recursion depth before the builder degrades to a
/// root-only segment.
pub const MAX_ARCHIVE_DEPTH: usize = 64;

/// Length budgets for the serialized URL forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBudget {
    /// Hard cap for a fragment-form URL, in characters.
    pub fragment_hard_cap: usize,
    /// Soft budget for a path token; exceeding it is logged but allowed.
    pub path_soft_cap: usize,
    /// Hard cap for a path token; exceeding it forces fragment form.
    pub path_hard_cap: usize,
    /// Per-file cap for inlined attachment bytes.
    pub inline_file_cap: usize,
}

impl Default for SegmentBudget {
    fn default() -> Self {
        Self {
            fragment_hard_cap: 120_000,
            path_soft_cap: 1_800,
            path_hard_cap: 3_500,
            inline_file_cap: 6_000,
        }
    }
}

impl SegmentBudget {
    /// A budget with a custom fragment cap (used when segmenting against
    /// tighter transports).
    pub fn with_fragment_cap(cap: usize) -> Self {
        Self {
            fragment_hard_cap: cap,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let b = SegmentBudget::default();
        assert_eq!(b.fragment_hard_cap, 120_000);
        assert_eq!(b.path_soft_cap, 1_800);
        assert_eq!(b.path_hard_cap, 3_500);
        assert_eq!(b.inline_file_cap, 6_000);
        assert!(b.path_soft_cap < b.path_hard_cap);
    }

    #[test]
    fn test_with_fragment_cap() {
        let b = SegmentBudget::with_fragment_cap(3_500);
        assert_eq!(b.fragment_hard_cap, 3_500);
        assert_eq!(b.inline_file_cap, 6_000);
    }
}
