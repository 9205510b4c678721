//! Pattern discovery engine for ALS compression.
//!
//! This module finds repeated substructures in a [`StructuralModel`] and
//! ranks them by estimated byte savings:
//!
//! - literal scalars repeated down table columns or across a tree
//! - row segments, runs of adjacent cells repeated across table rows
//! - key sets, ordered key lists shared by several objects
//! - subtrees, whole arrays or objects repeated verbatim
//!
//! Column runs (repeats, alternations and integer ranges down one table
//! column) are planned separately by [`RunPlan`] on the whole table.
//!
//! The model is split into partitions (row ranges for tables, top-level
//! entries for trees) that are scanned independently, possibly on several
//! threads. Partial tallies are summed by entry text and the survivors are
//! sorted canonically, so the candidate list is identical for every worker
//! count.

mod candidate;
mod runs;
mod scanner;
mod table;
mod tree;

pub use candidate::{Candidate, Tally, REFERENCE_COST};
pub use runs::{longest_run, RunPlan};
pub use scanner::StructureScanner;
pub use table::{TableScanner, MAX_SEGMENT_CELLS};
pub use tree::TreeScanner;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::CompressorConfig;
use crate::convert::{StructuralModel, Tree};
use crate::error::Result;

/// Smallest number of rows or top-level entries given to one partition.
const MIN_PARTITION_ITEMS: usize = 64;

/// Result of pattern discovery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Profitable candidates in canonical order (savings descending, then
    /// entry text ascending)
    pub candidates: Vec<Candidate>,
    /// Number of partitions the model was scanned in
    pub partitions: usize,
}

/// Main pattern discovery engine.
///
/// The `PatternEngine` owns a validated configuration and is immutable, so a
/// single engine can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct PatternEngine {
    config: CompressorConfig,
    table_scanner: TableScanner,
    tree_scanner: TreeScanner,
}

impl PatternEngine {
    /// Create a new pattern engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(CompressorConfig::default())
    }

    /// Create a new pattern engine with the given configuration.
    pub fn with_config(config: CompressorConfig) -> Self {
        Self {
            config,
            table_scanner: TableScanner::new(),
            tree_scanner: TreeScanner::new(),
        }
    }

    /// Get the minimum pattern length configuration.
    pub fn min_pattern_length(&self) -> usize {
        self.config.min_pattern_length
    }

    /// Discover profitable repeated patterns in a model.
    ///
    /// # Errors
    ///
    /// Returns [`AlsError::Internal`](crate::AlsError::Internal) if a worker
    /// pool cannot be created.
    ///
    /// # Examples
    ///
    /// ```
    /// use als_codec::pattern::PatternEngine;
    /// use als_codec::{SourceKind, StructuralModel};
    ///
    /// let model = StructuralModel::parse(
    ///     SourceKind::Csv,
    ///     "id,name\n1,Alice\n2,Alice\n3,Alice",
    /// ).unwrap();
    /// let discovery = PatternEngine::new().discover(&model).unwrap();
    /// assert_eq!(discovery.candidates[0].text, "Alice");
    /// ```
    pub fn discover(&self, model: &StructuralModel) -> Result<Discovery> {
        let (tally, partitions) = match model {
            StructuralModel::Table(table) => self.scan_partitioned(table.rows(), &self.table_scanner)?,
            StructuralModel::Tree(root) => {
                let children: Vec<&Tree> = match root {
                    Tree::Array(items) => items.iter().collect(),
                    Tree::Object(entries) => entries.iter().map(|(_, value)| value).collect(),
                    _ => Vec::new(),
                };
                let (mut tally, partitions) =
                    self.scan_partitioned(&children, &self.tree_scanner)?;
                let mut root_tally = self.new_tally();
                self.tree_scanner.scan_root(root, &mut root_tally);
                tally.merge(root_tally);
                (tally, partitions)
            }
        };

        let distinct = tally.len();
        let candidates = tally.into_ranked();
        log::debug!(
            "pattern discovery: {} partitions, {} distinct patterns, {} candidates",
            partitions,
            distinct,
            candidates.len()
        );
        Ok(Discovery {
            candidates,
            partitions,
        })
    }

    fn new_tally(&self) -> Tally {
        Tally::new(self.config.min_pattern_length)
    }

    /// Items per partition for `len` items.
    fn partition_size(&self, len: usize) -> usize {
        let workers = self.config.worker_count().max(1);
        len.div_ceil(workers).max(MIN_PARTITION_ITEMS)
    }

    /// Scan `items` in partitions and sum the partial tallies.
    fn scan_partitioned<T, S>(&self, items: &[T], scanner: &S) -> Result<(Tally, usize)>
    where
        T: Sync,
        S: StructureScanner<T>,
    {
        let chunks: Vec<&[T]> = items.chunks(self.partition_size(items.len())).collect();
        let partials = self.scan_chunks(&chunks, scanner)?;
        let partitions = partials.len();

        let mut merged = self.new_tally();
        for partial in partials {
            merged.merge(partial);
        }
        Ok((merged, partitions))
    }

    #[cfg(feature = "parallel")]
    fn scan_chunks<T, S>(&self, chunks: &[&[T]], scanner: &S) -> Result<Vec<Tally>>
    where
        T: Sync,
        S: StructureScanner<T>,
    {
        let scan = |chunk: &&[T]| {
            let mut tally = self.new_tally();
            scanner.scan(chunk, &mut tally);
            tally
        };

        if chunks.len() < 2 || self.config.parallelism == 1 {
            return Ok(chunks.iter().map(scan).collect());
        }

        if self.config.parallelism > 1 {
            // Use a custom thread pool with the configured number of threads
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.parallelism)
                .build()
                .map_err(|e| {
                    crate::error::AlsError::Internal(format!("failed to create thread pool: {}", e))
                })?;
            Ok(pool.install(|| chunks.par_iter().map(scan).collect()))
        } else {
            // Use default Rayon thread pool (auto-detect cores)
            Ok(chunks.par_iter().map(scan).collect())
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn scan_chunks<T, S>(&self, chunks: &[&[T]], scanner: &S) -> Result<Vec<Tally>>
    where
        T: Sync,
        S: StructureScanner<T>,
    {
        Ok(chunks
            .iter()
            .map(|chunk| {
                let mut tally = self.new_tally();
                scanner.scan(chunk, &mut tally);
                tally
            })
            .collect())
    }
}

impl Default for PatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::als::PatternKind;
    use crate::convert::SourceKind;

    fn csv(input: &str) -> StructuralModel {
        StructuralModel::parse(SourceKind::Csv, input).unwrap()
    }

    fn json(input: &str) -> StructuralModel {
        StructuralModel::parse(SourceKind::Json, input).unwrap()
    }

    fn texts(discovery: &Discovery) -> Vec<&str> {
        discovery.candidates.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_pattern_engine_new() {
        let engine = PatternEngine::new();
        assert_eq!(engine.min_pattern_length(), 3);
    }

    #[test]
    fn test_repeated_name() {
        let discovery = PatternEngine::new()
            .discover(&csv("id,name\n1,Alice\n2,Alice\n3,Alice"))
            .unwrap();
        assert_eq!(texts(&discovery), vec!["Alice"]);
        assert_eq!(discovery.candidates[0].occurrences, 3);
        assert_eq!(discovery.candidates[0].kind, PatternKind::Literal);
        assert_eq!(discovery.partitions, 1);
    }

    #[test]
    fn test_row_segment_outranks_its_cells() {
        let mut input = String::from("id,city,country\n");
        for i in 0..20 {
            input.push_str(&format!("{},New York,United States\n", i));
        }
        let discovery = PatternEngine::new().discover(&csv(&input)).unwrap();
        let top = &discovery.candidates[0];
        assert_eq!(top.kind, PatternKind::RowSegment);
        assert_eq!(top.text, "+ New\\ York United\\ States");
        assert_eq!(top.occurrences, 20);
    }

    #[test]
    fn test_unique_values_yield_nothing() {
        let discovery = PatternEngine::new()
            .discover(&csv("id,name\n1,Alice\n2,Bob\n3,Carol"))
            .unwrap();
        assert!(discovery.candidates.is_empty());
    }

    #[test]
    fn test_empty_models() {
        let engine = PatternEngine::new();
        assert!(engine.discover(&csv("id,name")).unwrap().candidates.is_empty());
        assert!(engine.discover(&json("[]")).unwrap().candidates.is_empty());
        assert!(engine.discover(&json("42")).unwrap().candidates.is_empty());
    }

    #[test]
    fn test_json_key_sets() {
        let input = r#"[
            {"user_id": 1, "status": "active"},
            {"user_id": 2, "status": "active"},
            {"user_id": 3, "status": "active"},
            {"user_id": 4, "status": "active"}
        ]"#;
        let discovery = PatternEngine::new().discover(&json(input)).unwrap();
        let kinds: Vec<PatternKind> = discovery.candidates.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&PatternKind::KeySet));
        assert!(texts(&discovery).contains(&": user_id status"));
        assert!(texts(&discovery).contains(&"active"));
    }

    #[test]
    fn test_repeated_subtree() {
        let input = r#"{"a": {"x": [1, 2, 3]}, "b": {"x": [1, 2, 3]}, "c": {"x": [1, 2, 3]}}"#;
        let discovery = PatternEngine::new().discover(&json(input)).unwrap();
        assert_eq!(discovery.candidates[0].text, "{ x [ =1 =2 =3 ] }");
        assert_eq!(discovery.candidates[0].kind, PatternKind::Subtree);
    }

    #[test]
    fn test_candidates_are_identical_across_worker_counts() {
        let mut input = String::from("id,region,tier,flag\n");
        for i in 0..1000 {
            input.push_str(&format!(
                "{},region-{},tier-{},{}\n",
                i,
                i % 7,
                i % 3,
                i % 2 == 0
            ));
        }
        let model = csv(&input);
        let sequential = PatternEngine::with_config(CompressorConfig::new().with_parallelism(1))
            .discover(&model)
            .unwrap();
        for workers in [2, 3, 8] {
            let parallel =
                PatternEngine::with_config(CompressorConfig::new().with_parallelism(workers))
                    .discover(&model)
                    .unwrap();
            assert_eq!(parallel.candidates, sequential.candidates);
        }
    }

    #[test]
    fn test_partitions_follow_worker_count() {
        let mut input = String::from("id,v\n");
        for i in 0..1000 {
            input.push_str(&format!("{},x\n", i));
        }
        let model = csv(&input);
        let engine = PatternEngine::with_config(CompressorConfig::new().with_parallelism(4));
        assert_eq!(engine.discover(&model).unwrap().partitions, 4);

        let engine = PatternEngine::with_config(CompressorConfig::new().with_parallelism(1));
        assert_eq!(engine.discover(&model).unwrap().partitions, 1);
    }
}
