//! Scanner trait shared by the table and tree scanners.

use super::candidate::Tally;

/// Counts candidate patterns in one partition of a structural model.
///
/// Scanners are stateless apart from configuration and are shared by
/// reference across discovery workers, hence the `Sync` bound.
pub trait StructureScanner<T: Sync>: Sync {
    /// Record every candidate occurrence found in `items` into `tally`.
    fn scan(&self, items: &[T], tally: &mut Tally);
}
