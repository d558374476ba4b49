//! # Succinct Mapped
//!
//! Compact read-only indexes over bits and integers, with a fixed binary
//! layout that can be frozen to a file and memory-mapped back without
//! copying.
//!
//! ## Module Organization
//!
//! - [`bits`] - Bit vectors, rank/select, dense-array select, Elias-Fano
//! - [`trees`] - Balanced parentheses with range min-excess, cartesian trees
//! - [`coding`] - Gamma and Elias-Fano coded integer vectors
//! - [`binary`] - Freeze / map / sizeof over one field visitor
//!
//! ## Quick Start
//!
//! ```
//! use succinct_mapped::bits::{BitVector, RsBitVector};
//! use succinct_mapped::RankSelect;
//!
//! let bits = BitVector::from_bits((0..512).map(|i| i % 2 == 1));
//! let rs = RsBitVector::new(bits, true, false);
//!
//! // Count of 1-bits in [0, i)
//! assert_eq!(rs.rank1(8), 4);
//!
//! // Position of the k-th 1-bit
//! assert_eq!(rs.select1(0), Some(1));
//! ```
//!
//! ## Features
//!
//! - `mmap` (default) - [`binary::mmap::MappedFile`] over `memmap2`
//! - `serde` - Serialization of [`Config`]
//! - `cli` - The `succinct` command line tool

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// =============================================================================
// Modules
// =============================================================================

/// Bit vectors with rank and select support.
pub mod bits;

/// Succinct tree representations.
pub mod trees;

/// Compressed integer vectors.
pub mod coding;

/// Zero-copy binary persistence.
pub mod binary;

/// Error type.
pub mod error;

/// Word-level bit tricks.
pub mod util;

// =============================================================================
// Public re-exports
// =============================================================================

pub use binary::{Mappable, MappableVector, MapFlags, Visitor};
pub use bits::{BitVector, BitVectorBuilder, DArray0, DArray1, EliasFano, RsBitVector};
pub use coding::{EliasFanoCompressedList, EliasFanoList, GammaVector};
pub use error::{Error, Result};
pub use trees::{BpVector, CartesianTree};
pub use util::select_in_word;

// =============================================================================
// Core traits
// =============================================================================

/// Trait for rank/select operations on bitvectors.
///
/// Rank and select are fundamental operations for succinct data structures:
/// - `rank1(i)`: Count 1-bits in positions `[0, i)`
/// - `select1(k)`: Find position of the k-th 1-bit (0-indexed)
pub trait RankSelect {
    /// Count 1-bits in positions `[0, i)`.
    ///
    /// Returns 0 if `i == 0`.
    fn rank1(&self, i: usize) -> usize;

    /// Count 0-bits in positions `[0, i)`.
    ///
    /// Default implementation: `i - rank1(i)`
    #[inline]
    fn rank0(&self, i: usize) -> usize {
        i - self.rank1(i)
    }

    /// Find position of the k-th 1-bit (0-indexed).
    ///
    /// Returns `None` if fewer than `k+1` ones exist.
    fn select1(&self, k: usize) -> Option<usize>;

    /// Find position of the k-th 0-bit (0-indexed).
    ///
    /// Returns `None` if fewer than `k+1` zeros exist.
    fn select0(&self, k: usize) -> Option<usize>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for building rank/select indices.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Spacing of select hints in matching bits (default: 1024)
    pub select_sample_rate: u32,
    /// Build hints for `select` over ones (default: false)
    pub select1_hints: bool,
    /// Build hints for `select0` over zeros (default: false)
    pub select0_hints: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            select_sample_rate: bits::DEFAULT_SELECT_SAMPLE_RATE as u32,
            select1_hints: false,
            select0_hints: false,
        }
    }
}

impl Config {
    /// Set the select hint spacing.
    pub fn with_select_sample_rate(mut self, rate: u32) -> Self {
        self.select_sample_rate = rate;
        self
    }

    /// Enable or disable hints for `select`.
    pub fn with_select1_hints(mut self, enabled: bool) -> Self {
        self.select1_hints = enabled;
        self
    }

    /// Enable or disable hints for `select0`.
    pub fn with_select0_hints(mut self, enabled: bool) -> Self {
        self.select0_hints = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = Config::default()
            .with_select_sample_rate(64)
            .with_select0_hints(true);
        assert_eq!(config.select_sample_rate, 64);
        assert!(!config.select1_hints);
        assert!(config.select0_hints);
    }

    #[test]
    fn test_rank0_default() {
        let rs = RsBitVector::new(BitVector::from_bits([true, false, false, true]), false, false);
        assert_eq!(RankSelect::rank0(&rs, 4), 2);
        assert_eq!(RankSelect::select0(&rs, 1), Some(2));
        assert_eq!(RankSelect::select0(&rs, 2), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serde() {
        let config = Config::default().with_select1_hints(true);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"select_sample_rate":1024,"select1_hints":true,"select0_hints":false}"#
        );
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
