//! Stream selector
//!
//! Picks one candidate by index. Out-of-range indexes clamp to the last
//! candidate so a cast is always attempted when anything was found.

use thiserror::Error;
use tracing::debug;

use crate::models::{AggregateResult, CandidateStream};

/// Selection failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No playable streams found ({total} candidate(s), {placeholders} placeholder(s) skipped)")]
    NoCandidates { total: usize, placeholders: usize },
}

/// Index-based stream picker with placeholder filtering
#[derive(Debug, Clone, Default)]
pub struct StreamSelector {
    placeholder_prefixes: Vec<String>,
}

impl StreamSelector {
    /// Selector that skips URLs starting with any of `prefixes`
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            placeholder_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `url` is a placeholder/sample stream
    pub fn is_placeholder(&self, url: &str) -> bool {
        self.placeholder_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }

    /// Candidates that may be cast, in aggregate order
    pub fn eligible<'a>(&self, aggregate: &'a AggregateResult) -> Vec<&'a CandidateStream> {
        aggregate
            .candidates
            .iter()
            .filter(|c| !self.is_placeholder(c.url()))
            .collect()
    }

    /// Pick the candidate at `index`, clamping out-of-range values
    /// (negative or past the end) to the last eligible candidate
    pub fn select<'a>(
        &self,
        aggregate: &'a AggregateResult,
        index: i64,
    ) -> Result<&'a CandidateStream, SelectionError> {
        let eligible = self.eligible(aggregate);

        let Some(position) = clamp_index(index, eligible.len()) else {
            return Err(SelectionError::NoCandidates {
                total: aggregate.total_streams(),
                placeholders: aggregate.total_streams() - eligible.len(),
            });
        };

        if position as i64 != index {
            debug!(requested = index, selected = position, "Stream index clamped");
        }

        Ok(eligible[position])
    }
}

/// Clamp `index` into `0..len`; out of range goes to the last index.
/// `None` when `len` is zero.
pub fn clamp_index(index: i64, len: usize) -> Option<usize> {
    let last = len.checked_sub(1)?;
    match usize::try_from(index) {
        Ok(i) if i <= last => Some(i),
        _ => Some(last),
    }
}
