//! Bit vectors, rank/select indexes and Elias-Fano sequences.
//!
//! - [`BitVectorBuilder`] - growable buffer, consumed into a [`BitVector`]
//! - [`BitVector`] - immutable bits with word access and enumerators
//! - [`RsBitVector`] - rank in O(1), select with optional sampled hints
//! - [`DArray1`] / [`DArray0`] - O(1) select for ones or zeros
//! - [`EliasFano`] - monotone sequences with select, rank and iteration

mod bit_vector;
mod builder;
mod darray;
mod elias_fano;
mod rs_bit_vector;

pub use bit_vector::{BitEnumerator, BitVector, UnaryEnumerator};
pub use builder::BitVectorBuilder;
pub(crate) use builder::low_mask;
pub use darray::{DArray, DArray0, DArray1, Ones, WordGetter, Zeros};
pub use elias_fano::{EliasFano, EliasFanoBuilder, EliasFanoIter};
pub use rs_bit_vector::{RsBitVector, DEFAULT_SELECT_SAMPLE_RATE};
