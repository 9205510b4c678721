//! Candidate patterns and their occurrence tallies.

use std::collections::HashMap;

use crate::als::PatternKind;

/// Bytes a reference costs in the body (`_N` with a one-digit id).
pub const REFERENCE_COST: usize = 2;

/// A repeated substructure considered for the dictionary.
///
/// `text` is the exact dictionary entry text of the pattern, which is also
/// the key its occurrences are counted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Kind of substructure
    pub kind: PatternKind,
    /// Dictionary entry text
    pub text: String,
    /// Number of times the pattern occurs in the model
    pub occurrences: usize,
    /// Pattern length used for the minimum-length filter
    /// (bytes for literals and segments, nodes for key sets and subtrees)
    pub units: usize,
    /// Body bytes one reference replaces
    pub span: usize,
}

impl Candidate {
    /// Estimated savings used for ranking.
    ///
    /// `(occurrences - 1) * (span - REFERENCE_COST)`: every occurrence after
    /// the first is replaced by a reference.
    pub fn savings(&self) -> i64 {
        (self.occurrences as i64 - 1) * (self.span as i64 - REFERENCE_COST as i64)
    }

    /// Savings net of the dictionary entry itself.
    ///
    /// Every occurrence becomes a reference and the entry is paid for once,
    /// including its `|` separator.
    pub fn net_savings(&self) -> i64 {
        self.occurrences as i64 * (self.span as i64 - REFERENCE_COST as i64)
            - self.entry_cost() as i64
    }

    /// Bytes the entry adds to the dictionary line.
    pub fn entry_cost(&self) -> usize {
        self.text.len() + 1
    }
}

#[derive(Debug, Clone, Copy)]
struct Count {
    kind: PatternKind,
    units: usize,
    span: usize,
    occurrences: usize,
}

/// Occurrence counts keyed by entry text.
///
/// One tally is filled per partition; tallies are summed with [`Tally::merge`].
/// Because counts are keyed by content and summation is commutative, the
/// merged result does not depend on how the input was partitioned.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    min_units: usize,
    counts: HashMap<String, Count>,
}

impl Tally {
    /// Create an empty tally that ignores patterns shorter than `min_units`.
    pub fn new(min_units: usize) -> Self {
        Self {
            min_units,
            counts: HashMap::new(),
        }
    }

    /// Record one occurrence of a pattern.
    pub fn record(&mut self, kind: PatternKind, text: &str, units: usize, span: usize) {
        if units < self.min_units {
            return;
        }
        if let Some(count) = self.counts.get_mut(text) {
            count.occurrences += 1;
            return;
        }
        self.counts.insert(
            text.to_string(),
            Count {
                kind,
                units,
                span,
                occurrences: 1,
            },
        );
    }

    /// Add the counts of another tally into this one.
    pub fn merge(&mut self, other: Tally) {
        for (text, count) in other.counts {
            self.counts
                .entry(text)
                .and_modify(|c| c.occurrences += count.occurrences)
                .or_insert(count);
        }
    }

    /// Number of distinct patterns seen.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Occurrences recorded for an entry text.
    pub fn occurrences(&self, text: &str) -> usize {
        self.counts.get(text).map_or(0, |c| c.occurrences)
    }

    /// Keep profitable repeated patterns, in canonical order.
    ///
    /// A pattern survives when it occurs at least twice and its net savings
    /// are positive. Survivors are sorted by savings descending, then entry
    /// text ascending, so ties break the same way on every run.
    pub fn into_ranked(self) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .counts
            .into_iter()
            .filter(|(_, count)| count.occurrences >= 2)
            .map(|(text, count)| Candidate {
                kind: count.kind,
                text,
                occurrences: count.occurrences,
                units: count.units,
                span: count.span,
            })
            .filter(|candidate| candidate.net_savings() > 0)
            .collect();

        candidates.sort_by(|a, b| {
            b.savings()
                .cmp(&a.savings())
                .then_with(|| a.text.cmp(&b.text))
        });
        candidates
    }
}
