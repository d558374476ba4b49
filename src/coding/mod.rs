//! Compressed integer vectors.
//!
//! - [`GammaVector`] - gamma codes with select-indexed length markers
//! - [`EliasFanoCompressedList`] - variable-width values with Elias-Fano offsets
//! - [`EliasFanoList`] - values stored as Elias-Fano prefix sums

mod compressed_list;
mod gamma;

pub use compressed_list::{CompressedListIter, EliasFanoCompressedList, EliasFanoList};
pub use gamma::{GammaIter, GammaVector};
