//! Internal utilities for bit manipulation.
//!
//! This module contains the word-level toolkit used by the succinct data
//! structures. Most users should not need to use these directly.
//!
//! - [`broadword`] - popcount, bit scans, byte-parallel compare and select

pub mod broadword;
pub(crate) mod table;

pub use broadword::select_in_word;

/// Number of 64-bit words needed to hold `bits` bits.
#[inline]
pub(crate) fn words_for(bits: u64) -> usize {
    bits.div_ceil(64) as usize
}
