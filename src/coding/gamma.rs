//! Gamma coded vector with random access.
//!
//! Each value `v` is stored as `x = v + 1`, split at `l = msb(x)`: the
//! length marker `1 0^l` goes to `high_bits` and the `l` bits of `x` below
//! its leading one go to `low_bits`. A final `1` terminates the last
//! marker. The `i`-th one in `high_bits` sits at `i + (sum of previous l)`,
//! so the low bits of value `i` start at `select1(i) - i`.

use crate::binary::{Mappable, Visitor};
use crate::bits::{low_mask, BitVector, BitVectorBuilder, DArray1, UnaryEnumerator};
use crate::error::Result;
use crate::util::broadword::msb;

/// Variable-length coded integers with O(1) access.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GammaVector<'a> {
    high_bits: BitVector<'a>,
    high_bits_d1: DArray1<'a>,
    low_bits: BitVector<'a>,
}

impl GammaVector<'static> {
    /// Encode `values`. Each value must be below `u64::MAX`.
    pub fn new<I: IntoIterator<Item = u64>>(values: I) -> Self {
        let mut high_bits = BitVectorBuilder::new();
        let mut low_bits = BitVectorBuilder::new();
        let mut count = 0u64;
        for v in values {
            debug_assert!(v < u64::MAX, "value {} cannot be gamma coded", v);
            let x = v + 1;
            let l = msb(x);
            low_bits.append_bits(x & low_mask(l), l);
            high_bits.push_back(true);
            high_bits.zero_extend(u64::from(l));
            count += 1;
        }
        high_bits.push_back(true);

        let high_bits = high_bits.build();
        let high_bits_d1 = DArray1::new(&high_bits);
        tracing::debug!(
            values = count,
            high_bits = high_bits.size(),
            low_bits = low_bits.len(),
            "built gamma vector"
        );
        Self {
            high_bits,
            high_bits_d1,
            low_bits: low_bits.build(),
        }
    }
}

impl<'a> GammaVector<'a> {
    /// Number of values.
    #[inline]
    pub fn len(&self) -> u64 {
        self.high_bits_d1.num_positions().saturating_sub(1)
    }

    /// Returns true if no values are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `idx`-th value.
    pub fn get(&self, idx: u64) -> u64 {
        debug_assert!(idx < self.len(), "index {} out of range for {} values", idx, self.len());
        let pos = self.high_bits_d1.select(&self.high_bits, idx);
        let l = self.high_bits.successor1(pos + 1) - pos - 1;
        self.decode(pos - idx, l as u32)
    }

    #[inline]
    fn decode(&self, low_pos: u64, l: u32) -> u64 {
        let chunk = self.low_bits.get_bits(low_pos, l);
        ((1u64 << l) | chunk) - 1
    }

    /// Sequential decoder starting at value `idx` (`idx <= len()`).
    pub fn iter_from(&self, idx: u64) -> GammaIter<'_, 'a> {
        debug_assert!(idx <= self.len());
        GammaIter::new(self, idx)
    }

    /// Sequential decoder over all values.
    pub fn iter(&self) -> GammaIter<'_, 'a> {
        self.iter_from(0)
    }
}

impl<'a> Mappable<'a> for GammaVector<'a> {
    fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
        v.nested("high_bits", &mut self.high_bits)?;
        v.nested("high_bits_d1", &mut self.high_bits_d1)?;
        v.nested("low_bits", &mut self.low_bits)
    }
}

/// Forward decoder over a [`GammaVector`].
pub struct GammaIter<'b, 'a> {
    vector: &'b GammaVector<'a>,
    idx: u64,
    high_pos: u64,
    low_pos: u64,
    high: UnaryEnumerator<'b>,
}

impl<'b, 'a> GammaIter<'b, 'a> {
    fn new(vector: &'b GammaVector<'a>, idx: u64) -> Self {
        let (high_pos, low_pos) = if idx < vector.len() {
            let pos = vector.high_bits_d1.select(&vector.high_bits, idx);
            (pos, pos - idx)
        } else {
            (0, 0)
        };
        Self {
            vector,
            idx,
            high_pos,
            low_pos,
            high: vector.high_bits.unary_enumerator(high_pos + 1),
        }
    }

    /// Index of the value the next call returns.
    pub fn position(&self) -> u64 {
        self.idx
    }
}

impl Iterator for GammaIter<'_, '_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.idx >= self.vector.len() {
            return None;
        }
        let next_pos = self.high.next();
        let l = (next_pos - self.high_pos - 1) as u32;
        let value = self.vector.decode(self.low_pos, l);
        self.low_pos += u64::from(l);
        self.high_pos = next_pos;
        self.idx += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.len().saturating_sub(self.idx) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GammaIter<'_, '_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn sample() -> Vec<u64> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        (0..5000)
            .map(|i| match i % 4 {
                0 => 0,
                1 => rng.gen_range(0..16),
                2 => rng.gen_range(0..1 << 20),
                _ => rng.gen::<u64>() >> rng.gen_range(1..64),
            })
            .collect()
    }

    #[test]
    fn test_get() {
        let values = sample();
        let gv = GammaVector::new(values.iter().copied());
        assert_eq!(gv.len(), values.len() as u64);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(gv.get(i as u64), v, "i={}", i);
        }
    }

    #[test]
    fn test_iter_from() {
        let values = sample();
        let gv = GammaVector::new(values.iter().copied());
        assert_eq!(gv.iter().collect::<Vec<_>>(), values);
        for k in [1usize, 2, 63, 64, 999, 4999, 5000] {
            assert_eq!(gv.iter_from(k as u64).collect::<Vec<_>>(), values[k..], "from {}", k);
        }
    }

    #[test]
    fn test_extremes() {
        let values = [u64::MAX - 1, 0, 1, 1 << 63, 2];
        let gv = GammaVector::new(values);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(gv.get(i as u64), v);
        }
        assert_eq!(gv.iter().len(), 5);
    }

    #[test]
    fn test_empty() {
        let gv = GammaVector::new(std::iter::empty());
        assert!(gv.is_empty());
        assert_eq!(gv.iter().next(), None);
    }
}
