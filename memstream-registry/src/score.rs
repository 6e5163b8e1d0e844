//! URL scoring
//!
//! A stored URL is only ever replaced by a strictly better one. "Better"
//! means: a deeper embedded witness chain first (more of the thread is
//! reconstructible from the URL alone), then a shorter URL as tiebreak.

use std::cmp::Ordering;

/// Score of a candidate URL for a content key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlScore {
    /// Number of witness-chain entries embedded in the URL.
    pub depth: usize,
    /// Serialized length in characters.
    pub len: usize,
}

impl UrlScore {
    /// Score a URL: witness depth from its `add` entries, length as is.
    pub fn of(url: &str) -> Self {
        UrlScore {
            depth: witness_depth(url),
            len: url.len(),
        }
    }
}

impl Ord for UrlScore {
    fn cmp(&self, other: &Self) -> Ordering {
        // Deeper chain wins; among equals, the shorter URL wins.
        self.depth
            .cmp(&other.depth)
            .then_with(|| other.len.cmp(&self.len))
    }
}

impl PartialOrd for UrlScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Count the `add` entries embedded in a URL's fragment (preferred) or
/// query.
pub fn witness_depth(url: &str) -> usize {
    let params = match url.split_once('#') {
        Some((_, fragment)) if !fragment.is_empty() => fragment,
        _ => match url.split_once('?') {
            Some((_, query)) => query.split('#').next().unwrap_or(""),
            None => return 0,
        },
    };
    params
        .split('&')
        .filter(|pair| {
            matches!(pair.split_once('='), Some(("add", v)) if !v.is_empty())
        })
        .count()
}
