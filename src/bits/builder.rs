//! Growable bit buffer used to build immutable bit vectors.

use crate::util::broadword::reverse_bits;
use crate::util::words_for;

/// Append-only bit buffer.
///
/// Bits are stored LSB-first in 64-bit words. Padding bits past `len()` are
/// always zero. Consume the builder with [`BitVector::from_builder`] or
/// [`BitVectorBuilder::build`].
///
/// [`BitVector::from_builder`]: super::BitVector::from_builder
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitVectorBuilder {
    bits: Vec<u64>,
    size: u64,
}

impl BitVectorBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder of `len` bits, all set to `init`.
    pub fn with_len(len: u64, init: bool) -> Self {
        let fill = if init { u64::MAX } else { 0 };
        let mut bits = vec![fill; words_for(len)];
        if init && len % 64 != 0 {
            if let Some(last) = bits.last_mut() {
                *last = (1u64 << (len % 64)) - 1;
            }
        }
        Self { bits, size: len }
    }

    /// Reserve capacity for at least `additional` more bits.
    pub fn reserve(&mut self, additional: u64) {
        let needed = words_for(self.size + additional);
        self.bits.reserve(needed.saturating_sub(self.bits.len()));
    }

    /// Number of bits appended so far.
    #[inline]
    pub fn len(&self) -> u64 {
        self.size
    }

    /// Returns true if no bits have been appended.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The backing words.
    #[inline]
    pub fn bits(&self) -> &[u64] {
        &self.bits
    }

    /// Read back the bit at `pos`.
    #[inline]
    pub fn get(&self, pos: u64) -> bool {
        debug_assert!(pos < self.size);
        (self.bits[(pos / 64) as usize] >> (pos % 64)) & 1 == 1
    }

    /// Append one bit.
    #[inline]
    pub fn push_back(&mut self, b: bool) {
        let pos_in_word = self.size % 64;
        if pos_in_word == 0 {
            self.bits.push(b as u64);
        } else if b {
            if let Some(cur) = self.bits.last_mut() {
                *cur |= 1u64 << pos_in_word;
            }
        }
        self.size += 1;
    }

    /// Overwrite the bit at `pos`, which must be below `len()`.
    #[inline]
    pub fn set(&mut self, pos: u64, b: bool) {
        debug_assert!(pos < self.size);
        let word = (pos / 64) as usize;
        let mask = 1u64 << (pos % 64);
        if b {
            self.bits[word] |= mask;
        } else {
            self.bits[word] &= !mask;
        }
    }

    /// Overwrite `len` bits starting at `pos` with the low bits of `bits`.
    ///
    /// `pos + len` must not exceed `len()`, and `bits` must have no set bits
    /// at or above `len`.
    pub fn set_bits(&mut self, pos: u64, bits: u64, len: u32) {
        debug_assert!(pos + len as u64 <= self.size);
        debug_assert!(len == 64 || bits >> len == 0, "spurious high bits");
        if len == 0 {
            return;
        }
        let mask = low_mask(len);
        let word = (pos / 64) as usize;
        let shift = (pos % 64) as u32;
        self.bits[word] &= !(mask << shift);
        self.bits[word] |= bits << shift;

        let stored = 64 - shift;
        if stored < len {
            self.bits[word + 1] &= !(mask >> stored);
            self.bits[word + 1] |= bits >> stored;
        }
    }

    /// Append the low `len` bits of `bits`, LSB first.
    ///
    /// `bits` must have no set bits at or above `len`.
    pub fn append_bits(&mut self, bits: u64, len: u32) {
        debug_assert!(len <= 64);
        debug_assert!(len == 64 || bits >> len == 0, "spurious high bits");
        if len == 0 {
            return;
        }
        let pos_in_word = (self.size % 64) as u32;
        self.size += len as u64;
        if pos_in_word == 0 {
            self.bits.push(bits);
        } else {
            if let Some(cur) = self.bits.last_mut() {
                *cur |= bits << pos_in_word;
            }
            if len > 64 - pos_in_word {
                self.bits.push(bits >> (64 - pos_in_word));
            }
        }
    }

    /// Append `n` zero bits.
    pub fn zero_extend(&mut self, n: u64) {
        self.size += n;
        let needed = words_for(self.size);
        if needed > self.bits.len() {
            self.bits.resize(needed, 0);
        }
    }

    /// Append `n` one bits.
    pub fn one_extend(&mut self, mut n: u64) {
        while n >= 64 {
            self.append_bits(u64::MAX, 64);
            n -= 64;
        }
        if n > 0 {
            self.append_bits(low_mask(n as u32), n as u32);
        }
    }

    /// Append all bits of `other`.
    pub fn append(&mut self, other: &BitVectorBuilder) {
        if other.size == 0 {
            return;
        }
        let pos_in_word = self.size % 64;
        if pos_in_word == 0 {
            self.bits.extend_from_slice(&other.bits);
            self.size += other.size;
            return;
        }
        let full_words = (other.size / 64) as usize;
        for &word in &other.bits[..full_words] {
            self.append_bits(word, 64);
        }
        let tail = (other.size % 64) as u32;
        if tail > 0 {
            self.append_bits(other.bits[full_words], tail);
        }
    }

    /// Reverse the bit order in place.
    pub fn reverse(&mut self) {
        if self.size == 0 {
            return;
        }
        let shift = (64 - self.size % 64) % 64;
        if shift != 0 {
            // Move the logical bits to the top of the array so that reversing
            // every word puts bit `size - 1` at position 0.
            let mut carry = 0u64;
            for word in self.bits.iter_mut() {
                let next_carry = *word >> (64 - shift);
                *word = (*word << shift) | carry;
                carry = next_carry;
            }
        }
        for word in self.bits.iter_mut() {
            *word = reverse_bits(*word);
        }
        self.bits.reverse();
    }

    /// Consume the builder, returning the backing words and bit length.
    pub fn into_parts(self) -> (Vec<u64>, u64) {
        (self.bits, self.size)
    }

    /// Finish building.
    pub fn build(self) -> super::BitVector<'static> {
        super::BitVector::from_builder(self)
    }
}

/// Mask of the low `len` bits; `len` may be 64.
#[inline]
pub(crate) fn low_mask(len: u32) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

impl Extend<bool> for BitVectorBuilder {
    fn extend<I: IntoIterator<Item = bool>>(&mut self, iter: I) {
        for b in iter {
            self.push_back(b);
        }
    }
}

impl FromIterator<bool> for BitVectorBuilder {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut builder = Self::new();
        builder.extend(iter);
        builder
    }
}
