//! Rank/select index over a [`BitVector`].
//!
//! # Structure
//!
//! - **Blocks**: 8 words (512 bits). For each block, `block_rank_pairs`
//!   stores two words: the absolute number of ones before the block, and the
//!   seven 9-bit counts of ones before words 1..7 of the block, packed at
//!   bits `9 * (k - 1)`.
//! - **Sentinel**: one extra pair after the last block holding the total, so
//!   `rank(size())` and `rank_at_word(num_words())` need no special case.
//! - **Select hints** (optional): the block index of every
//!   `select_sample_rate`-th one (resp. zero), followed by the block count.
//!   They bound the binary search over block ranks.
//!
//! # Query
//!
//! `rank(pos)` = block rank + packed sub-block count + one popcount.
//! `select(k)` = binary search over blocks, a scan of the seven packed
//! counts, then [`select_in_word`].

use super::bit_vector::BitVector;
use crate::binary::{Mappable, MappableVector, Visitor};
use crate::error::{Error, Result};
use crate::util::broadword::{popcount, select_in_word};
use crate::{Config, RankSelect};

/// Words per block.
const BLOCK_WORDS: usize = 8;

/// Bits per block.
const BLOCK_BITS: u64 = 512;

/// Width of a packed sub-block count.
const SUBRANK_BITS: u64 = 9;

const SUBRANK_MASK: u64 = (1 << SUBRANK_BITS) - 1;

/// Default spacing of select hints.
pub const DEFAULT_SELECT_SAMPLE_RATE: u64 = 1024;

/// Bit vector with constant-time rank and hint-accelerated select.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsBitVector<'a> {
    bits: BitVector<'a>,
    block_rank_pairs: MappableVector<'a, u64>,
    select_sample_rate: u64,
    select1_hints: MappableVector<'a, u64>,
    select0_hints: MappableVector<'a, u64>,
}

impl Default for RsBitVector<'_> {
    fn default() -> Self {
        RsBitVector::new(BitVector::default(), false, false)
    }
}

impl<'a> RsBitVector<'a> {
    /// Build the rank index, and optionally select hints for ones and zeros.
    pub fn new(bits: BitVector<'a>, select1_hints: bool, select0_hints: bool) -> Self {
        let config = Config::default()
            .with_select1_hints(select1_hints)
            .with_select0_hints(select0_hints);
        Self::with_config(bits, &config)
    }

    /// Build using the hint settings in `config`.
    pub fn with_config(bits: BitVector<'a>, config: &Config) -> Self {
        let mut rs = Self {
            bits,
            block_rank_pairs: MappableVector::new(),
            select_sample_rate: u64::from(config.select_sample_rate.max(1)),
            select1_hints: MappableVector::new(),
            select0_hints: MappableVector::new(),
        };
        rs.build_rank();
        if config.select1_hints {
            rs.select1_hints = rs.build_hints(false).into();
        }
        if config.select0_hints {
            rs.select0_hints = rs.build_hints(true).into();
        }
        tracing::trace!(
            bits = rs.size(),
            ones = rs.num_ones(),
            blocks = rs.num_blocks(),
            select1_hints = rs.select1_hints.len(),
            select0_hints = rs.select0_hints.len(),
            "built rank/select index"
        );
        rs
    }

    fn build_rank(&mut self) {
        let words = self.bits.data();
        let num_blocks = words.len().div_ceil(BLOCK_WORDS);
        let mut pairs = Vec::with_capacity(2 * (num_blocks + 1));
        let mut total = 0u64;
        for block in 0..num_blocks {
            let start = block * BLOCK_WORDS;
            let mut subranks = 0u64;
            let mut in_block = 0u64;
            for k in 0..BLOCK_WORDS {
                if k > 0 {
                    subranks |= in_block << (SUBRANK_BITS * (k as u64 - 1));
                }
                in_block += words.get(start + k).map_or(0, |&w| popcount(w));
            }
            pairs.push(total);
            pairs.push(subranks);
            total += in_block;
        }
        pairs.push(total);
        pairs.push(0);
        self.block_rank_pairs = pairs.into();
    }

    fn build_hints(&self, zeros: bool) -> Vec<u64> {
        let rate = self.select_sample_rate;
        let num_blocks = self.num_blocks();
        let mut hints = Vec::new();
        let mut threshold = 0u64;
        for block in 0..num_blocks {
            let next = if zeros {
                self.block_rank0(block + 1)
            } else {
                self.block_rank(block + 1)
            };
            while threshold < next {
                hints.push(block as u64);
                threshold += rate;
            }
        }
        hints.push(num_blocks as u64);
        hints
    }

    /// The underlying bits.
    #[inline]
    pub fn bits(&self) -> &BitVector<'a> {
        &self.bits
    }

    /// Number of bits.
    #[inline]
    pub fn size(&self) -> u64 {
        self.bits.size()
    }

    /// Returns true if the vector holds no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The backing words.
    #[inline]
    pub fn data(&self) -> &[u64] {
        self.bits.data()
    }

    /// Returns the bit at `pos`.
    #[inline]
    pub fn get(&self, pos: u64) -> bool {
        self.bits.get(pos)
    }

    /// Total number of ones.
    #[inline]
    pub fn num_ones(&self) -> u64 {
        self.block_rank(self.num_blocks())
    }

    /// Total number of zeros.
    #[inline]
    pub fn num_zeros(&self) -> u64 {
        self.size() - self.num_ones()
    }

    /// Spacing of the select hints.
    pub fn select_sample_rate(&self) -> u64 {
        self.select_sample_rate
    }

    #[inline]
    fn num_blocks(&self) -> usize {
        self.block_rank_pairs.len() / 2 - 1
    }

    #[inline]
    fn block_rank(&self, block: usize) -> u64 {
        self.block_rank_pairs[2 * block]
    }

    #[inline]
    fn block_rank0(&self, block: usize) -> u64 {
        block as u64 * BLOCK_BITS - self.block_rank(block)
    }

    #[inline]
    fn sub_rank(&self, block: usize, k: usize) -> u64 {
        if k == 0 {
            0
        } else {
            (self.block_rank_pairs[2 * block + 1] >> (SUBRANK_BITS * (k as u64 - 1))) & SUBRANK_MASK
        }
    }

    /// Number of ones in words `[0, word)`; `word` may equal the word count.
    #[inline]
    pub fn rank_at_word(&self, word: usize) -> u64 {
        let block = word / BLOCK_WORDS;
        self.block_rank(block) + self.sub_rank(block, word % BLOCK_WORDS)
    }

    /// Number of ones in `[0, pos)`, for `pos <= size()`.
    #[inline]
    pub fn rank(&self, pos: u64) -> u64 {
        debug_assert!(pos <= self.size(), "rank position {} past size {}", pos, self.size());
        let word = (pos / 64) as usize;
        let shift = pos % 64;
        let mut r = self.rank_at_word(word);
        if shift != 0 {
            r += popcount(self.data()[word] & ((1u64 << shift) - 1));
        }
        r
    }

    /// Number of zeros in `[0, pos)`, for `pos <= size()`.
    #[inline]
    pub fn rank0(&self, pos: u64) -> u64 {
        pos - self.rank(pos)
    }

    /// Position of the `k`-th (0-indexed) one; `k < num_ones()`.
    pub fn select(&self, k: u64) -> u64 {
        debug_assert!(k < self.num_ones(), "select({}) with {} ones", k, self.num_ones());
        let (lo, hi) = self.hint_range(&self.select1_hints, k);
        let block = self.search_block(lo, hi, k, |b| self.block_rank(b));
        let r = k - self.block_rank(block);

        let mut word = 0;
        for sub in 1..BLOCK_WORDS {
            if self.sub_rank(block, sub) > r {
                break;
            }
            word = sub;
        }
        let r = r - self.sub_rank(block, word);
        let word_idx = block * BLOCK_WORDS + word;
        word_idx as u64 * 64 + select_in_word(self.data()[word_idx], r)
    }

    /// Position of the `k`-th (0-indexed) zero; `k < num_zeros()`.
    pub fn select0(&self, k: u64) -> u64 {
        debug_assert!(k < self.num_zeros(), "select0({}) with {} zeros", k, self.num_zeros());
        let (lo, hi) = self.hint_range(&self.select0_hints, k);
        let block = self.search_block(lo, hi, k, |b| self.block_rank0(b));
        let r = k - self.block_rank0(block);

        let sub_rank0 = |sub: usize| sub as u64 * 64 - self.sub_rank(block, sub);
        let mut word = 0;
        for sub in 1..BLOCK_WORDS {
            if sub_rank0(sub) > r {
                break;
            }
            word = sub;
        }
        let r = r - sub_rank0(word);
        let word_idx = block * BLOCK_WORDS + word;
        word_idx as u64 * 64 + select_in_word(!self.data()[word_idx], r)
    }

    /// Block range `[lo, hi]` that must contain the `k`-th match.
    #[inline]
    fn hint_range(&self, hints: &[u64], k: u64) -> (usize, usize) {
        if hints.is_empty() {
            return (0, self.num_blocks());
        }
        let i = (k / self.select_sample_rate) as usize;
        (hints[i] as usize, hints[i + 1] as usize)
    }

    /// Last block `b` in `[lo, hi]` with `rank_of(b) <= k`.
    #[inline]
    fn search_block(&self, mut lo: usize, hi: usize, k: u64, rank_of: impl Fn(usize) -> u64) -> usize {
        let mut hi = hi + 1;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if rank_of(mid) <= k {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Position of the first one at or after `pos`.
    #[inline]
    pub fn successor1(&self, pos: u64) -> u64 {
        self.bits.successor1(pos)
    }

    /// Position of the first zero at or after `pos`.
    #[inline]
    pub fn successor0(&self, pos: u64) -> u64 {
        self.bits.successor0(pos)
    }

    /// Position of the last one at or before `pos`.
    #[inline]
    pub fn predecessor1(&self, pos: u64) -> u64 {
        self.bits.predecessor1(pos)
    }

    /// Position of the last zero at or before `pos`.
    #[inline]
    pub fn predecessor0(&self, pos: u64) -> u64 {
        self.bits.predecessor0(pos)
    }
}

impl RankSelect for RsBitVector<'_> {
    #[inline]
    fn rank1(&self, i: usize) -> usize {
        self.rank(i as u64) as usize
    }

    fn select1(&self, k: usize) -> Option<usize> {
        if (k as u64) < self.num_ones() {
            Some(self.select(k as u64) as usize)
        } else {
            None
        }
    }

    fn select0(&self, k: usize) -> Option<usize> {
        if (k as u64) < self.num_zeros() {
            Some(RsBitVector::select0(self, k as u64) as usize)
        } else {
            None
        }
    }
}

impl<'a> Mappable<'a> for RsBitVector<'a> {
    fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
        v.nested("bits", &mut self.bits)?;
        v.vector("block_rank_pairs", &mut self.block_rank_pairs)?;
        v.scalar("select_sample_rate", &mut self.select_sample_rate)?;
        v.vector("select1_hints", &mut self.select1_hints)?;
        v.vector("select0_hints", &mut self.select0_hints)?;
        let num_blocks = self.bits.data().len().div_ceil(BLOCK_WORDS);
        if self.block_rank_pairs.len() != 2 * (num_blocks + 1) {
            return Err(Error::Corrupt { field: "block_rank_pairs" });
        }
        if self.select_sample_rate == 0 {
            return Err(Error::Corrupt { field: "select_sample_rate" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_bits(n: usize, density: f64, seed: u64) -> Vec<bool> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_bool(density)).collect()
    }

    fn check(bits: &[bool], rs: &RsBitVector<'_>) {
        let mut ones = 0u64;
        let mut zeros = 0u64;
        for (i, &b) in bits.iter().enumerate() {
            assert_eq!(rs.rank(i as u64), ones, "rank({})", i);
            if b {
                assert_eq!(rs.select(ones), i as u64, "select({})", ones);
                ones += 1;
            } else {
                assert_eq!(rs.select0(zeros), i as u64, "select0({})", zeros);
                zeros += 1;
            }
        }
        assert_eq!(rs.rank(bits.len() as u64), ones);
        assert_eq!(rs.num_ones(), ones);
        assert_eq!(rs.num_zeros(), zeros);
    }

    #[test]
    fn test_empty() {
        let rs = RsBitVector::new(BitVector::default(), true, true);
        assert_eq!(rs.size(), 0);
        assert_eq!(rs.rank(0), 0);
        assert_eq!(rs.num_ones(), 0);
        assert_eq!(rs.select1(0), None);
        assert_eq!(RankSelect::select0(&rs, 0), None);
    }

    #[test]
    fn test_all_ones() {
        let bits = vec![true; 1500];
        let rs = RsBitVector::new(BitVector::from_bits(bits.iter().copied()), true, true);
        check(&bits, &rs);
    }

    #[test]
    fn test_rank_at_word() {
        let words = vec![u64::MAX; 20];
        let rs = RsBitVector::new(BitVector::from_words(words, 20 * 64), false, false);
        for w in 0..=20 {
            assert_eq!(rs.rank_at_word(w), w as u64 * 64);
        }
    }

    #[test]
    fn test_random_with_and_without_hints() {
        for (n, density, seed) in [(1usize, 0.5, 1u64), (511, 0.5, 2), (513, 0.1, 3), (5000, 0.02, 4), (20000, 0.9, 5)] {
            let bits = random_bits(n, density, seed);
            for (h1, h0) in [(false, false), (true, true)] {
                let rs = RsBitVector::new(BitVector::from_bits(bits.iter().copied()), h1, h0);
                check(&bits, &rs);
            }
        }
    }

    #[test]
    fn test_small_sample_rate() {
        let bits = random_bits(10_000, 0.3, 9);
        let config = Config::default()
            .with_select_sample_rate(7)
            .with_select1_hints(true)
            .with_select0_hints(true);
        let rs = RsBitVector::with_config(BitVector::from_bits(bits.iter().copied()), &config);
        assert_eq!(rs.select_sample_rate(), 7);
        check(&bits, &rs);
    }

    #[test]
    fn test_sparse_select() {
        let mut bits = vec![false; 10_000];
        bits[9000] = true;
        bits[9999] = true;
        let rs = RsBitVector::new(BitVector::from_bits(bits.iter().copied()), true, false);
        assert_eq!(rs.select(0), 9000);
        assert_eq!(rs.select(1), 9999);
        assert_eq!(rs.select1(2), None);
        assert_eq!(rs.rank(9999), 1);
        assert_eq!(rs.rank(10_000), 2);
    }
}
