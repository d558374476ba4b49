//! Immutable bit vector with word-level access and enumerators.

use super::builder::{low_mask, BitVectorBuilder};
use crate::binary::{Mappable, MappableVector, Visitor};
use crate::error::{Error, Result};
use crate::util::broadword::{lsb, msb, popcount, select_in_word};

/// Fixed-size bit array, either built in memory or mapped from a region.
///
/// Bits are stored LSB-first in 64-bit words. Padding bits past `size()`
/// are zero for built vectors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitVector<'a> {
    size: u64,
    bits: MappableVector<'a, u64>,
}

impl<'a> BitVector<'a> {
    /// Take ownership of a builder's bits.
    pub fn from_builder(builder: BitVectorBuilder) -> BitVector<'static> {
        let (bits, size) = builder.into_parts();
        BitVector {
            size,
            bits: bits.into(),
        }
    }

    /// Build from a sequence of booleans.
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> BitVector<'static> {
        Self::from_builder(bits.into_iter().collect())
    }

    /// Build from raw words holding `size` bits. Bits past `size` are cleared.
    pub fn from_words(mut words: Vec<u64>, size: u64) -> BitVector<'static> {
        words.resize(size.div_ceil(64) as usize, 0);
        if size % 64 != 0 {
            if let Some(last) = words.last_mut() {
                *last &= low_mask((size % 64) as u32);
            }
        }
        BitVector {
            size,
            bits: words.into(),
        }
    }

    /// Number of bits.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns true if the vector holds no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The backing words.
    #[inline]
    pub fn data(&self) -> &[u64] {
        &self.bits
    }

    /// Number of backing words.
    #[inline]
    pub fn num_words(&self) -> usize {
        self.bits.len()
    }

    /// Returns the bit at `pos`.
    #[inline]
    pub fn get(&self, pos: u64) -> bool {
        debug_assert!(pos < self.size, "position {} out of range {}", pos, self.size);
        (self.bits[(pos / 64) as usize] >> (pos % 64)) & 1 == 1
    }

    /// Read `len` (at most 64) bits starting at `pos`, LSB first.
    #[inline]
    pub fn get_bits(&self, pos: u64, len: u32) -> u64 {
        debug_assert!(len <= 64);
        debug_assert!(pos + len as u64 <= self.size);
        if len == 0 {
            return 0;
        }
        let block = (pos / 64) as usize;
        let shift = (pos % 64) as u32;
        let mask = low_mask(len);
        if shift + len <= 64 {
            (self.bits[block] >> shift) & mask
        } else {
            ((self.bits[block] >> shift) | (self.bits[block + 1] << (64 - shift))) & mask
        }
    }

    /// Read the 64 bits starting at `pos`, padded with zeros past the end.
    #[inline]
    pub fn get_word(&self, pos: u64) -> u64 {
        let block = (pos / 64) as usize;
        let shift = (pos % 64) as u32;
        let Some(&first) = self.bits.get(block) else {
            return 0;
        };
        let mut word = first >> shift;
        if shift != 0 {
            if let Some(&next) = self.bits.get(block + 1) {
                word |= next << (64 - shift);
            }
        }
        word
    }

    /// Position of the first set bit at or after `pos`.
    ///
    /// A set bit must exist at or after `pos`.
    pub fn successor1(&self, pos: u64) -> u64 {
        let mut block = (pos / 64) as usize;
        let mut word = self.bits[block] & (u64::MAX << (pos % 64));
        while word == 0 {
            block += 1;
            word = self.bits[block];
        }
        block as u64 * 64 + lsb(word) as u64
    }

    /// Position of the first unset bit at or after `pos`.
    ///
    /// An unset bit must exist at or after `pos` within `size()`.
    pub fn successor0(&self, pos: u64) -> u64 {
        let mut block = (pos / 64) as usize;
        let mut word = !self.bits[block] & (u64::MAX << (pos % 64));
        while word == 0 {
            block += 1;
            word = !self.bits[block];
        }
        block as u64 * 64 + lsb(word) as u64
    }

    /// Position of the last set bit at or before `pos`.
    ///
    /// A set bit must exist at or before `pos`.
    pub fn predecessor1(&self, pos: u64) -> u64 {
        let mut block = (pos / 64) as usize;
        let shift = 63 - (pos % 64);
        let mut word = (self.bits[block] << shift) >> shift;
        while word == 0 {
            block -= 1;
            word = self.bits[block];
        }
        block as u64 * 64 + msb(word) as u64
    }

    /// Position of the last unset bit at or before `pos`.
    ///
    /// An unset bit must exist at or before `pos`.
    pub fn predecessor0(&self, pos: u64) -> u64 {
        let mut block = (pos / 64) as usize;
        let shift = 63 - (pos % 64);
        let mut word = (!self.bits[block] << shift) >> shift;
        while word == 0 {
            block -= 1;
            word = !self.bits[block];
        }
        block as u64 * 64 + msb(word) as u64
    }

    /// Number of set bits, by popcount over every word.
    pub fn count_ones(&self) -> u64 {
        self.bits.iter().map(|&w| popcount(w)).sum()
    }

    /// Sequential enumerator starting at `pos`.
    pub fn enumerator(&self, pos: u64) -> BitEnumerator<'_, 'a> {
        BitEnumerator::new(self, pos)
    }

    /// Enumerator over set-bit positions starting at `pos`.
    pub fn unary_enumerator(&self, pos: u64) -> UnaryEnumerator<'_> {
        UnaryEnumerator::new(self, pos)
    }

    /// Iterator over all bits.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.size).map(move |i| self.get(i))
    }

    /// Copy into an owned vector with no borrowed storage.
    pub fn to_owned_vector(&self) -> BitVector<'static> {
        BitVector {
            size: self.size,
            bits: self.bits.to_vec().into(),
        }
    }
}

impl<'a> Mappable<'a> for BitVector<'a> {
    fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
        v.scalar("size", &mut self.size)?;
        v.vector("bits", &mut self.bits)?;
        if self.size.div_ceil(64) > self.bits.len() as u64 {
            return Err(Error::Corrupt { field: "size" });
        }
        Ok(())
    }
}

impl From<BitVectorBuilder> for BitVector<'static> {
    fn from(builder: BitVectorBuilder) -> Self {
        BitVector::from_builder(builder)
    }
}

// =============================================================================
// Enumerators
// =============================================================================

/// Sequential reader of bits and bit fields.
pub struct BitEnumerator<'b, 'a> {
    bv: &'b BitVector<'a>,
    pos: u64,
    buf: u64,
    avail: u32,
}

#[allow(clippy::should_implement_trait)]
impl<'b, 'a> BitEnumerator<'b, 'a> {
    fn new(bv: &'b BitVector<'a>, pos: u64) -> Self {
        Self {
            bv,
            pos,
            buf: 0,
            avail: 0,
        }
    }

    /// Current position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Read one bit.
    #[inline]
    pub fn next(&mut self) -> bool {
        if self.avail == 0 {
            self.fill_buf();
        }
        let b = self.buf & 1 == 1;
        self.buf >>= 1;
        self.avail -= 1;
        self.pos += 1;
        b
    }

    /// Read `len` (at most 64) bits as an integer, LSB first.
    #[inline]
    pub fn take(&mut self, len: u32) -> u64 {
        debug_assert!(len <= 64);
        if self.avail < len {
            self.fill_buf();
        }
        let val = if len == 64 {
            let val = self.buf;
            self.buf = 0;
            val
        } else {
            let val = self.buf & low_mask(len);
            self.buf >>= len;
            val
        };
        self.avail -= len;
        self.pos += len as u64;
        val
    }

    /// Skip a run of zeros and the one that ends it, returning the number of
    /// zeros skipped.
    ///
    /// A set bit must exist at or after the current position.
    pub fn skip_zeros(&mut self) -> u64 {
        let mut zeros = 0;
        while self.buf == 0 {
            debug_assert!(self.pos < self.bv.size(), "no set bit after position");
            self.pos += self.avail as u64;
            zeros += self.avail as u64;
            self.avail = 0;
            self.fill_buf();
        }
        let l = lsb(self.buf);
        self.buf >>= l;
        self.buf >>= 1;
        self.avail -= l + 1;
        self.pos += l as u64 + 1;
        zeros + l as u64
    }

    #[inline]
    fn fill_buf(&mut self) {
        self.buf = self.bv.get_word(self.pos);
        self.avail = 64;
    }
}

/// Enumerator over the positions of set bits.
///
/// Whole words without a match are skipped by a single comparison or
/// popcount, which makes it efficient on sparse vectors.
pub struct UnaryEnumerator<'b> {
    data: &'b [u64],
    position: u64,
    buf: u64,
}

#[allow(clippy::should_implement_trait)]
impl<'b> UnaryEnumerator<'b> {
    fn new(bv: &'b BitVector<'_>, pos: u64) -> Self {
        let data = bv.data();
        let buf = data
            .get((pos / 64) as usize)
            .map_or(0, |&w| w & (u64::MAX << (pos % 64)));
        Self {
            data,
            position: pos,
            buf,
        }
    }

    /// Current position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Position of the next set bit. One must exist.
    #[inline]
    pub fn next(&mut self) -> u64 {
        let mut buf = self.buf;
        while buf == 0 {
            self.position += 64;
            buf = self.data[(self.position / 64) as usize];
        }
        let pos_in_word = lsb(buf) as u64;
        self.buf = buf & (buf - 1);
        self.position = (self.position & !63) + pos_in_word;
        self.position
    }

    /// Advance to the `k`-th (0-indexed) set bit not yet returned, so that
    /// the following [`next`](Self::next) returns it.
    pub fn skip(&mut self, k: u64) {
        let mut skipped = 0;
        let mut buf = self.buf;
        loop {
            let w = popcount(buf);
            if skipped + w > k {
                break;
            }
            skipped += w;
            self.position += 64;
            buf = self.data[(self.position / 64) as usize];
        }
        let pos_in_word = select_in_word(buf, k - skipped);
        self.buf = buf & (u64::MAX << pos_in_word);
        self.position = (self.position & !63) + pos_in_word;
    }

    /// Advance to the `k`-th (0-indexed) unset bit at or after the current
    /// position.
    pub fn skip0(&mut self, k: u64) {
        let mut skipped = 0;
        let mut word_idx = (self.position / 64) as usize;
        let mut buf = !self.data[word_idx] & (u64::MAX << (self.position % 64));
        loop {
            let w = popcount(buf);
            if skipped + w > k {
                break;
            }
            skipped += w;
            word_idx += 1;
            buf = !self.data[word_idx];
        }
        let pos_in_word = select_in_word(buf, k - skipped);
        self.buf = self.data[word_idx] & (u64::MAX << pos_in_word);
        self.position = word_idx as u64 * 64 + pos_in_word;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(n: u64) -> Vec<bool> {
        (0..n).map(|i| (i * 13 + 5) % 11 < 3).collect()
    }

    #[test]
    fn test_get() {
        let bits = pattern(300);
        let bv = BitVector::from_bits(bits.iter().copied());
        assert_eq!(bv.size(), 300);
        assert_eq!(bv.num_words(), 5);
        for (i, &b) in bits.iter().enumerate() {
            assert_eq!(bv.get(i as u64), b, "i={}", i);
        }
        assert_eq!(bv.count_ones(), bits.iter().filter(|&&b| b).count() as u64);
    }

    #[test]
    fn test_get_bits_and_word() {
        let bv = BitVector::from_words(vec![0xDEAD_BEEF_0123_4567, 0xFFFF_0000_FFFF_0000], 128);
        assert_eq!(bv.get_bits(0, 16), 0x4567);
        assert_eq!(bv.get_bits(60, 8), 0x0D);
        assert_eq!(bv.get_bits(0, 64), 0xDEAD_BEEF_0123_4567);
        assert_eq!(bv.get_bits(64, 64), 0xFFFF_0000_FFFF_0000);
        assert_eq!(bv.get_word(0), 0xDEAD_BEEF_0123_4567);
        assert_eq!(bv.get_word(64 + 16), 0xFFFF_0000_FFFF);
        assert_eq!(bv.get_word(4), (0xDEAD_BEEF_0123_4567 >> 4) | (0xFFFF_0000_FFFF_0000 << 60));
        assert_eq!(bv.get_word(200), 0);
    }

    #[test]
    fn test_from_words_clears_padding() {
        let bv = BitVector::from_words(vec![u64::MAX, u64::MAX], 70);
        assert_eq!(bv.data(), &[u64::MAX, 0b11_1111]);
    }

    #[test]
    fn test_successor_predecessor() {
        let bits = pattern(500);
        let bv = BitVector::from_bits(bits.iter().copied());
        for pos in 0..500u64 {
            if let Some(next) = (pos..500).find(|&i| bits[i as usize]) {
                assert_eq!(bv.successor1(pos), next, "pos={}", pos);
            }
            if let Some(next) = (pos..500).find(|&i| !bits[i as usize]) {
                assert_eq!(bv.successor0(pos), next, "pos={}", pos);
            }
            if let Some(prev) = (0..=pos).rev().find(|&i| bits[i as usize]) {
                assert_eq!(bv.predecessor1(pos), prev, "pos={}", pos);
            }
            if let Some(prev) = (0..=pos).rev().find(|&i| !bits[i as usize]) {
                assert_eq!(bv.predecessor0(pos), prev, "pos={}", pos);
            }
        }
    }

    #[test]
    fn test_bit_enumerator() {
        let bits = pattern(400);
        let bv = BitVector::from_bits(bits.iter().copied());
        let mut e = bv.enumerator(0);
        for (i, &b) in bits.iter().enumerate() {
            assert_eq!(e.next(), b, "i={}", i);
        }

        let mut e = bv.enumerator(3);
        let mut pos = 3;
        for len in [1u32, 7, 64, 13, 64, 33] {
            assert_eq!(e.take(len), bv.get_bits(pos, len), "pos={}", pos);
            pos += len as u64;
            assert_eq!(e.position(), pos);
        }
    }

    #[test]
    fn test_skip_zeros() {
        let mut builder = BitVectorBuilder::new();
        for gap in [0u64, 3, 70, 200, 1] {
            builder.zero_extend(gap);
            builder.push_back(true);
        }
        let bv = builder.build();
        let mut e = bv.enumerator(0);
        for gap in [0u64, 3, 70, 200, 1] {
            assert_eq!(e.skip_zeros(), gap);
        }
        assert_eq!(e.position(), bv.size());
    }

    #[test]
    fn test_unary_enumerator() {
        let bits = pattern(1000);
        let ones: Vec<u64> = (0..1000).filter(|&i| bits[i as usize]).collect();
        let bv = BitVector::from_bits(bits.iter().copied());

        let mut e = bv.unary_enumerator(0);
        for &p in &ones {
            assert_eq!(e.next(), p);
        }

        let mut e = bv.unary_enumerator(0);
        e.skip(10);
        assert_eq!(e.next(), ones[10]);
        e.skip(5);
        assert_eq!(e.next(), ones[16]);

        let start = ones[3] + 1;
        let mut e = bv.unary_enumerator(start);
        assert_eq!(e.next(), ones[4]);
    }

    #[test]
    fn test_unary_skip0() {
        let bits = pattern(600);
        let zeros: Vec<u64> = (0..600).filter(|&i| !bits[i as usize]).collect();
        let bv = BitVector::from_bits(bits.iter().copied());
        for k in [0usize, 1, 50, 200, 350] {
            let mut e = bv.unary_enumerator(0);
            e.skip0(k as u64);
            assert_eq!(e.position(), zeros[k], "k={}", k);
            let next_one = (zeros[k]..600).find(|&i| bits[i as usize]);
            if let Some(p) = next_one {
                assert_eq!(e.next(), p);
            }
        }
    }
}
