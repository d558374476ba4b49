//! Integer lists indexed by an Elias-Fano sequence of offsets.
//!
//! [`EliasFanoCompressedList`] stores each value in `msb(v + 1)` bits and
//! keeps the running bit offsets in an [`EliasFano`] sequence, so the
//! boundaries of value `i` come from one `select_range`.
//! [`EliasFanoList`] stores the prefix sums of the values directly.

use crate::binary::{Mappable, Visitor};
use crate::bits::{low_mask, BitVector, BitVectorBuilder, EliasFano, EliasFanoBuilder, EliasFanoIter};
use crate::error::Result;
use crate::util::broadword::msb;

/// Variable-width integers with O(1) access through offset markers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EliasFanoCompressedList<'a> {
    ef: EliasFano<'a>,
    bits: BitVector<'a>,
}

impl EliasFanoCompressedList<'static> {
    /// Encode `values`. Each value must be below `u64::MAX`.
    pub fn new<I: IntoIterator<Item = u64>>(values: I) -> Self {
        let mut bits = BitVectorBuilder::new();
        let mut offsets = vec![0u64];
        for v in values {
            debug_assert!(v < u64::MAX, "value {} cannot be encoded", v);
            let x = v + 1;
            let l = msb(x);
            bits.append_bits(x & low_mask(l), l);
            offsets.push(bits.len());
        }

        let mut ef = EliasFanoBuilder::new(bits.len(), offsets.len() as u64);
        for &offset in &offsets {
            ef.push(offset);
        }
        tracing::debug!(
            values = offsets.len() - 1,
            payload_bits = bits.len(),
            "built compressed list"
        );
        Self {
            ef: ef.build_with_rank(false),
            bits: bits.build(),
        }
    }
}

impl<'a> EliasFanoCompressedList<'a> {
    /// Number of values.
    #[inline]
    pub fn len(&self) -> u64 {
        self.ef.num_ones().saturating_sub(1)
    }

    /// Returns true if no values are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `idx`-th value.
    pub fn get(&self, idx: u64) -> u64 {
        debug_assert!(idx < self.len(), "index {} out of range for {} values", idx, self.len());
        let (from, to) = self.ef.select_range(idx);
        self.decode(from, to)
    }

    #[inline]
    fn decode(&self, from: u64, to: u64) -> u64 {
        let l = (to - from) as u32;
        ((1u64 << l) | self.bits.get_bits(from, l)) - 1
    }

    /// Sequential decoder starting at value `idx` (`idx <= len()`).
    pub fn iter_from(&self, idx: u64) -> CompressedListIter<'_, 'a> {
        debug_assert!(idx <= self.len());
        let mut offsets = self.ef.iter_from(idx);
        let prev = offsets.next().unwrap_or(0);
        CompressedListIter {
            list: self,
            offsets,
            prev,
        }
    }

    /// Sequential decoder over all values.
    pub fn iter(&self) -> CompressedListIter<'_, 'a> {
        self.iter_from(0)
    }
}

impl<'a> Mappable<'a> for EliasFanoCompressedList<'a> {
    fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
        v.nested("ef", &mut self.ef)?;
        v.nested("bits", &mut self.bits)
    }
}

/// Forward decoder over an [`EliasFanoCompressedList`].
pub struct CompressedListIter<'b, 'a> {
    list: &'b EliasFanoCompressedList<'a>,
    offsets: EliasFanoIter<'b, 'a>,
    prev: u64,
}

impl Iterator for CompressedListIter<'_, '_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let next = self.offsets.next()?;
        let value = self.list.decode(self.prev, next);
        self.prev = next;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.offsets.size_hint()
    }
}

impl ExactSizeIterator for CompressedListIter<'_, '_> {}

/// Unsigned integers stored as the prefix sums of an [`EliasFano`] sequence.
///
/// Suited to lists whose sum is small relative to `len * 64`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EliasFanoList<'a> {
    ef: EliasFano<'a>,
}

impl EliasFanoList<'static> {
    /// Encode `values`. The sum of all values must fit in a `u64`.
    pub fn new<I: IntoIterator<Item = u64>>(values: I) -> Self {
        let mut sums = vec![0u64];
        let mut sum = 0u64;
        for v in values {
            debug_assert!(sum.checked_add(v).is_some(), "prefix sum overflows");
            sum = sum.wrapping_add(v);
            sums.push(sum);
        }
        let mut ef = EliasFanoBuilder::new(sum, sums.len() as u64);
        for &s in &sums {
            ef.push(s);
        }
        tracing::debug!(values = sums.len() - 1, sum, "built prefix-sum list");
        Self {
            ef: ef.build_with_rank(false),
        }
    }
}

impl<'a> EliasFanoList<'a> {
    /// Number of values.
    #[inline]
    pub fn len(&self) -> u64 {
        self.ef.num_ones().saturating_sub(1)
    }

    /// Returns true if no values are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `idx`-th value.
    pub fn get(&self, idx: u64) -> u64 {
        debug_assert!(idx < self.len(), "index {} out of range for {} values", idx, self.len());
        let (from, to) = self.ef.select_range(idx);
        to - from
    }

    /// Sum of the first `idx` values (`idx <= len()`).
    pub fn prefix_sum(&self, idx: u64) -> u64 {
        debug_assert!(idx <= self.len());
        self.ef.select(idx)
    }

    /// Sum of all values.
    pub fn total(&self) -> u64 {
        self.ef.size()
    }

    /// Sequential decoder over all values.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        let mut sums = self.ef.iter();
        let mut prev = sums.next().unwrap_or(0);
        sums.map(move |s| {
            let value = s - prev;
            prev = s;
            value
        })
    }
}

impl<'a> Mappable<'a> for EliasFanoList<'a> {
    fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
        v.nested("ef", &mut self.ef)
    }
}
