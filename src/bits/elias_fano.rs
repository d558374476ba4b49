//! Elias-Fano encoding of monotone integer sequences.
//!
//! Each value `v` in `[0, universe]` is split at `l = floor(log2(universe /
//! count))` bits. The low `l` bits are stored verbatim in `low_bits`; the
//! high part is stored in unary in `high_bits`, by setting bit
//! `(v >> l) + i` for the `i`-th value. A select over the high bits recovers
//! the high part, so `select(i)` costs one darray lookup plus one bounded
//! read.
//!
//! Space is about `count * (2 + l)` bits.

use super::bit_vector::{BitVector, UnaryEnumerator};
use super::builder::{low_mask, BitVectorBuilder};
use super::darray::{DArray0, DArray1};
use crate::binary::{Mappable, Visitor};
use crate::error::Result;
use crate::util::broadword::msb;

/// Incremental builder for [`EliasFano`].
#[derive(Clone, Debug)]
pub struct EliasFanoBuilder {
    universe: u64,
    count: u64,
    pos: u64,
    last: u64,
    l: u32,
    high_bits: BitVectorBuilder,
    low_bits: BitVectorBuilder,
}

impl EliasFanoBuilder {
    /// Prepare to encode `count` non-decreasing values no larger than
    /// `universe`.
    pub fn new(universe: u64, count: u64) -> Self {
        let l = if count > 0 && universe / count > 0 {
            msb(universe / count)
        } else {
            0
        };
        let mut low_bits = BitVectorBuilder::new();
        low_bits.reserve(count * l as u64);
        Self {
            universe,
            count,
            pos: 0,
            last: 0,
            l,
            high_bits: BitVectorBuilder::with_len((count + 1) + (universe >> l) + 1, false),
            low_bits,
        }
    }

    /// Append the next value.
    pub fn push(&mut self, v: u64) {
        debug_assert!(v >= self.last, "values must be non-decreasing: {} after {}", v, self.last);
        debug_assert!(v <= self.universe, "value {} exceeds universe {}", v, self.universe);
        debug_assert!(self.pos < self.count, "more than {} values pushed", self.count);
        self.last = v;
        if self.l > 0 {
            self.low_bits.append_bits(v & low_mask(self.l), self.l);
        }
        self.high_bits.set((v >> self.l) + self.pos, true);
        self.pos += 1;
    }

    /// Number of low bits per value.
    pub fn low_width(&self) -> u32 {
        self.l
    }

    /// Finish, building the zero-side index used by `rank`.
    pub fn build(self) -> EliasFano<'static> {
        self.build_with_rank(true)
    }

    /// Finish; `with_rank` controls whether `rank` and its derived queries
    /// are supported.
    pub fn build_with_rank(self, with_rank: bool) -> EliasFano<'static> {
        debug_assert_eq!(self.pos, self.count, "expected {} values", self.count);
        let high_bits = self.high_bits.build();
        let high_bits_d1 = DArray1::new(&high_bits);
        let high_bits_d0 = if with_rank {
            DArray0::new(&high_bits)
        } else {
            DArray0::default()
        };
        tracing::trace!(
            universe = self.universe,
            count = self.count,
            l = self.l,
            high_bits = high_bits.size(),
            "built elias-fano sequence"
        );
        EliasFano {
            size: self.universe,
            l: u64::from(self.l),
            high_bits,
            low_bits: self.low_bits.build(),
            high_bits_d1,
            high_bits_d0,
        }
    }
}

/// Elias-Fano coded monotone sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EliasFano<'a> {
    size: u64,
    l: u64,
    high_bits: BitVector<'a>,
    low_bits: BitVector<'a>,
    high_bits_d1: DArray1<'a>,
    high_bits_d0: DArray0<'a>,
}

impl<'a> EliasFano<'a> {
    /// Encode `values` (non-decreasing, each at most `universe`).
    pub fn from_sorted<I>(values: I, universe: u64) -> EliasFano<'static>
    where
        I: IntoIterator<Item = u64>,
        I::IntoIter: ExactSizeIterator,
    {
        let values = values.into_iter();
        let mut builder = EliasFanoBuilder::new(universe, values.len() as u64);
        for v in values {
            builder.push(v);
        }
        builder.build()
    }

    /// Universe bound: every value is at most `size()`.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of encoded values.
    #[inline]
    pub fn num_ones(&self) -> u64 {
        self.high_bits_d1.num_positions()
    }

    /// Number of low bits per value.
    #[inline]
    pub fn low_width(&self) -> u32 {
        self.l as u32
    }

    /// Returns true if `rank` and derived queries are available.
    #[inline]
    pub fn has_rank(&self) -> bool {
        self.high_bits_d0.num_positions() > 0
    }

    #[inline]
    fn low(&self, idx: u64) -> u64 {
        let l = self.l as u32;
        if l == 0 {
            0
        } else {
            self.low_bits.get_bits(idx * self.l, l)
        }
    }

    /// The `n`-th (0-indexed) value.
    #[inline]
    pub fn select(&self, n: u64) -> u64 {
        let high = self.high_bits_d1.select(&self.high_bits, n);
        ((high - n) << self.l) | self.low(n)
    }

    /// The `n`-th and `n + 1`-th values; `n + 1 < num_ones()`.
    #[inline]
    pub fn select_range(&self, n: u64) -> (u64, u64) {
        debug_assert!(n + 1 < self.num_ones());
        let high_n = self.high_bits_d1.select(&self.high_bits, n);
        let high_np1 = self.high_bits.successor1(high_n + 1);
        (
            ((high_n - n) << self.l) | self.low(n),
            ((high_np1 - n - 1) << self.l) | self.low(n + 1),
        )
    }

    /// Number of values strictly less than `pos`.
    ///
    /// A value may equal `size()`, so `rank(size())` can be below
    /// `num_ones()`; any `pos > size()` counts every value.
    pub fn rank(&self, pos: u64) -> u64 {
        debug_assert!(self.has_rank(), "built without rank support");
        if pos > self.size {
            return self.num_ones();
        }
        let h_rank = pos >> self.l;
        let mut h_pos = self.high_bits_d0.select(&self.high_bits, h_rank);
        let mut rank = h_pos - h_rank;
        let l_pos = pos & low_mask(self.l as u32);
        while h_pos > 0 && self.high_bits.get(h_pos - 1) && self.low(rank - 1) >= l_pos {
            rank -= 1;
            h_pos -= 1;
        }
        rank
    }

    /// Largest value at or below `pos`. One must exist.
    pub fn predecessor1(&self, pos: u64) -> u64 {
        self.select(self.rank(pos.saturating_add(1)) - 1)
    }

    /// Smallest value at or above `pos`. One must exist.
    pub fn successor1(&self, pos: u64) -> u64 {
        self.select(self.rank(pos))
    }

    /// Forward iterator starting at the `idx`-th value.
    pub fn iter_from(&self, idx: u64) -> EliasFanoIter<'_, 'a> {
        EliasFanoIter::new(self, idx)
    }

    /// Forward iterator over all values.
    pub fn iter(&self) -> EliasFanoIter<'_, 'a> {
        self.iter_from(0)
    }
}

impl<'a> Mappable<'a> for EliasFano<'a> {
    fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
        v.scalar("size", &mut self.size)?;
        v.scalar("l", &mut self.l)?;
        v.nested("high_bits", &mut self.high_bits)?;
        v.nested("low_bits", &mut self.low_bits)?;
        v.nested("high_bits_d1", &mut self.high_bits_d1)?;
        v.nested("high_bits_d0", &mut self.high_bits_d0)
    }
}

/// Sequential decoder over an [`EliasFano`] sequence.
pub struct EliasFanoIter<'b, 'a> {
    ef: &'b EliasFano<'a>,
    idx: u64,
    high: UnaryEnumerator<'b>,
}

impl<'b, 'a> EliasFanoIter<'b, 'a> {
    fn new(ef: &'b EliasFano<'a>, idx: u64) -> Self {
        let start = if idx < ef.num_ones() {
            ef.high_bits_d1.select(&ef.high_bits, idx)
        } else {
            0
        };
        Self {
            ef,
            idx,
            high: ef.high_bits.unary_enumerator(start),
        }
    }

    /// Index of the value the next call returns.
    pub fn position(&self) -> u64 {
        self.idx
    }
}

impl Iterator for EliasFanoIter<'_, '_> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        if self.idx >= self.ef.num_ones() {
            return None;
        }
        let high = self.high.next();
        let value = ((high - self.idx) << self.ef.l) | self.ef.low(self.idx);
        self.idx += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.ef.num_ones().saturating_sub(self.idx) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for EliasFanoIter<'_, '_> {}
