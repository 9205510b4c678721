//! Configuration types for the ALS codec.
//!
//! [`CompressorConfig`] controls the adaptive fallback cutoff, pattern
//! discovery, parallelism, and the fallback compressor. A compressor validates
//! its configuration once at construction and never mutates it afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{AlsError, Result};

/// Highest zstd level accepted for the fallback compressor.
const MAX_FALLBACK_LEVEL: i32 = 22;

/// Configuration for the ALS compressor.
///
/// Every field has a default, so a partial JSON document such as
/// `{"parallelism": 4}` deserializes into a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorConfig {
    /// Minimum structural compression ratio before falling back to the
    /// generic compressor.
    ///
    /// The ratio is `baseline_size / structural_payload_size`. A value of
    /// 1.0 keeps the structural body whenever it is no larger than the
    /// literal token stream. The baseline counts a table's CSV header row
    /// but the payload leaves out the schema line, see
    /// [`AlsCompressor`](crate::AlsCompressor#adaptive-fallback).
    ///
    /// Default: 1.2
    pub ctx_fallback_threshold: f64,

    /// Minimum pattern length to consider for the dictionary.
    ///
    /// Measured in bytes for literal tokens and row segments, and in nodes
    /// for JSON key sets and subtrees.
    ///
    /// Default: 3
    pub min_pattern_length: usize,

    /// Fewest cells a column run may cover.
    ///
    /// A run replaces a vertical stretch of one table column (a repeated
    /// value, two alternating values, or an integer range) with a single
    /// marker. 0 disables runs; 1 is rejected.
    ///
    /// Default: 4
    pub min_run_length: usize,

    /// Number of worker threads used for pattern discovery.
    ///
    /// - 0: let the engine choose, bounded by available cores
    /// - 1: scan in the calling thread
    /// - N: scan with N workers
    ///
    /// Output is byte-identical for every value.
    ///
    /// Default: 0 (auto)
    pub parallelism: usize,

    /// Maximum number of entries in a structural dictionary.
    ///
    /// A structural attempt that needs more entries is abandoned in favour of
    /// the fallback compressor.
    ///
    /// Default: 65,536 entries
    pub max_dictionary_entries: usize,

    /// zstd level used by the fallback compressor (1-22).
    ///
    /// Default: 3
    pub fallback_level: i32,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            ctx_fallback_threshold: 1.2,
            min_pattern_length: 3,
            min_run_length: 4,
            parallelism: 0, // auto-detect
            max_dictionary_entries: 65_536,
            fallback_level: 3,
        }
    }
}

impl CompressorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback threshold.
    ///
    /// The value is checked by [`CompressorConfig::validate`], not here.
    pub fn with_ctx_fallback_threshold(mut self, threshold: f64) -> Self {
        self.ctx_fallback_threshold = threshold;
        self
    }

    /// Set the minimum pattern length.
    pub fn with_min_pattern_length(mut self, length: usize) -> Self {
        self.min_pattern_length = length;
        self
    }

    /// Set the minimum column run length (0 disables runs).
    pub fn with_min_run_length(mut self, length: usize) -> Self {
        self.min_run_length = length;
        self
    }

    /// Set the parallelism level.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set the maximum dictionary entries limit.
    pub fn with_max_dictionary_entries(mut self, max: usize) -> Self {
        self.max_dictionary_entries = max;
        self
    }

    /// Set the zstd level of the fallback compressor.
    pub fn with_fallback_level(mut self, level: i32) -> Self {
        self.fallback_level = level;
        self
    }

    /// Check that every field is in range.
    ///
    /// # Errors
    ///
    /// Returns [`AlsError::InvalidConfig`] if the threshold is below 1.0 or
    /// not finite, if `min_pattern_length` or `max_dictionary_entries` is
    /// zero, if `min_run_length` is 1, or if the fallback level is outside
    /// 1-22.
    pub fn validate(&self) -> Result<()> {
        if !self.ctx_fallback_threshold.is_finite() || self.ctx_fallback_threshold < 1.0 {
            return Err(AlsError::InvalidConfig(format!(
                "ctx_fallback_threshold must be a finite value >= 1.0, got {}",
                self.ctx_fallback_threshold
            )));
        }
        if self.min_pattern_length == 0 {
            return Err(AlsError::InvalidConfig(
                "min_pattern_length must be at least 1".to_string(),
            ));
        }
        if self.min_run_length == 1 {
            return Err(AlsError::InvalidConfig(
                "min_run_length must be 0 (disabled) or at least 2".to_string(),
            ));
        }
        if self.max_dictionary_entries == 0 {
            return Err(AlsError::InvalidConfig(
                "max_dictionary_entries must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_FALLBACK_LEVEL).contains(&self.fallback_level) {
            return Err(AlsError::InvalidConfig(format!(
                "fallback_level must be within 1..={}, got {}",
                MAX_FALLBACK_LEVEL, self.fallback_level
            )));
        }
        Ok(())
    }

    /// Number of scan workers this configuration resolves to.
    pub fn worker_count(&self) -> usize {
        match self.parallelism {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressor_config_default() {
        let config = CompressorConfig::default();
        assert_eq!(config.ctx_fallback_threshold, 1.2);
        assert_eq!(config.min_pattern_length, 3);
        assert_eq!(config.min_run_length, 4);
        assert_eq!(config.parallelism, 0);
        assert_eq!(config.max_dictionary_entries, 65_536);
        assert_eq!(config.fallback_level, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_compressor_config_builder() {
        let config = CompressorConfig::new()
            .with_ctx_fallback_threshold(1.5)
            .with_min_pattern_length(5)
            .with_min_run_length(8)
            .with_parallelism(4)
            .with_max_dictionary_entries(1000)
            .with_fallback_level(9);

        assert_eq!(config.ctx_fallback_threshold, 1.5);
        assert_eq!(config.min_pattern_length, 5);
        assert_eq!(config.min_run_length, 8);
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.max_dictionary_entries, 1000);
        assert_eq!(config.fallback_level, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_below_one_is_rejected() {
        let config = CompressorConfig::new().with_ctx_fallback_threshold(0.5);
        assert!(matches!(config.validate(), Err(AlsError::InvalidConfig(_))));

        let config = CompressorConfig::new().with_ctx_fallback_threshold(f64::NAN);
        assert!(matches!(config.validate(), Err(AlsError::InvalidConfig(_))));
    }

    #[test]
    fn test_threshold_of_exactly_one_is_accepted() {
        let config = CompressorConfig::new().with_ctx_fallback_threshold(1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_min_pattern_length_is_rejected() {
        let config = CompressorConfig::new().with_min_pattern_length(0);
        assert!(matches!(config.validate(), Err(AlsError::InvalidConfig(_))));
    }

    #[test]
    fn test_min_run_length() {
        assert!(CompressorConfig::new().with_min_run_length(0).validate().is_ok());
        assert!(CompressorConfig::new().with_min_run_length(2).validate().is_ok());
        let config = CompressorConfig::new().with_min_run_length(1);
        assert!(matches!(config.validate(), Err(AlsError::InvalidConfig(_))));
    }

    #[test]
    fn test_fallback_level_out_of_range() {
        let config = CompressorConfig::new().with_fallback_level(0);
        assert!(config.validate().is_err());
        let config = CompressorConfig::new().with_fallback_level(23);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(CompressorConfig::new().with_parallelism(3).worker_count(), 3);
        assert!(CompressorConfig::new().worker_count() >= 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CompressorConfig = serde_json::from_str(r#"{"parallelism": 2}"#).unwrap();
        assert_eq!(config.parallelism, 2);
        assert_eq!(config.ctx_fallback_threshold, 1.2);
        assert_eq!(config.min_pattern_length, 3);
    }

    #[test]
    fn test_config_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompressorConfig>();
    }
}
