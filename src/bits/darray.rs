//! Dense-array select index.
//!
//! Matching positions are grouped into blocks of [`BLOCK_SIZE`]. A block whose
//! span is below [`MAX_IN_BLOCK_DISTANCE`] is stored compactly: its first
//! position in `block_inventory` plus a 16-bit offset for every
//! [`SUBBLOCK_SIZE`]-th position in `subblock_inventory`. A wider block is an
//! overflow block: every position is copied to `overflow_positions` and the
//! block inventory holds `-(overflow_index) - 1`.
//!
//! `select(k)` reads the block entry, then either returns an overflow
//! position directly or scans forward from the subblock start, at most
//! [`SUBBLOCK_SIZE`] matches away.

use std::marker::PhantomData;

use super::bit_vector::BitVector;
use crate::binary::{Mappable, MappableVector, Visitor};
use crate::error::Result;
use crate::util::broadword::{lsb, popcount, select_in_word};

/// Positions per block.
pub const BLOCK_SIZE: usize = 1024;

/// Positions per subblock.
pub const SUBBLOCK_SIZE: usize = 32;

/// Maximum span of a compact block.
pub const MAX_IN_BLOCK_DISTANCE: u64 = 1 << 16;

const SUBBLOCK_OVERFLOW: u16 = u16::MAX;

/// Selects which bits of a word count as matches.
pub trait WordGetter {
    /// Return word `idx` of `data` with the matching bits set.
    fn word(data: &[u64], idx: usize) -> u64;
}

/// Matches set bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ones;

/// Matches unset bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Zeros;

impl WordGetter for Ones {
    #[inline]
    fn word(data: &[u64], idx: usize) -> u64 {
        data[idx]
    }
}

impl WordGetter for Zeros {
    #[inline]
    fn word(data: &[u64], idx: usize) -> u64 {
        !data[idx]
    }
}

/// Select index over the positions matched by `G`.
///
/// The index does not own the bit vector; pass the same vector to
/// [`select`](DArray::select) that the index was built from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DArray<'a, G> {
    positions: u64,
    block_inventory: MappableVector<'a, i64>,
    overflow_positions: MappableVector<'a, u64>,
    subblock_inventory: MappableVector<'a, u16>,
    _getter: PhantomData<G>,
}

/// Select over set bits.
pub type DArray1<'a> = DArray<'a, Ones>;

/// Select over unset bits.
pub type DArray0<'a> = DArray<'a, Zeros>;

impl<'a, G: WordGetter> DArray<'a, G> {
    /// Index every match in `bv`.
    pub fn new(bv: &BitVector<'_>) -> Self {
        let size = bv.size();
        let data = bv.data();
        let matches = (0..data.len()).flat_map(move |word_idx| {
            let mut word = G::word(data, word_idx);
            let base = word_idx as u64 * 64;
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let pos = base + lsb(word) as u64;
                word &= word - 1;
                Some(pos)
            })
        });
        Self::from_positions(matches.take_while(move |&pos| pos < size))
    }

    /// Index an increasing sequence of positions.
    pub fn from_positions<I: IntoIterator<Item = u64>>(positions: I) -> Self {
        let mut inventory = Inventory::default();
        let mut cur_block = Vec::with_capacity(BLOCK_SIZE);
        let mut count = 0u64;
        for pos in positions {
            debug_assert!(cur_block.last().map_or(true, |&last| last < pos), "positions must increase");
            cur_block.push(pos);
            count += 1;
            if cur_block.len() == BLOCK_SIZE {
                inventory.flush(&mut cur_block);
            }
        }
        if !cur_block.is_empty() {
            inventory.flush(&mut cur_block);
        }
        // Keep the byte length a multiple of 8 so fields frozen after this
        // index stay 8-byte aligned.
        while inventory.subblocks.len() % 4 != 0 {
            inventory.subblocks.push(0);
        }
        tracing::trace!(
            positions = count,
            blocks = inventory.blocks.len(),
            overflow = inventory.overflow.len(),
            "built darray"
        );
        Self {
            positions: count,
            block_inventory: inventory.blocks.into(),
            overflow_positions: inventory.overflow.into(),
            subblock_inventory: inventory.subblocks.into(),
            _getter: PhantomData,
        }
    }

    /// Number of indexed positions.
    #[inline]
    pub fn num_positions(&self) -> u64 {
        self.positions
    }

    /// Position of the `idx`-th (0-indexed) match in `bv`.
    #[inline]
    pub fn select(&self, bv: &BitVector<'_>, idx: u64) -> u64 {
        debug_assert!(idx < self.positions, "select({}) with {} positions", idx, self.positions);
        let idx = idx as usize;
        let block = idx / BLOCK_SIZE;
        let block_pos = self.block_inventory[block];
        if block_pos < 0 {
            let overflow_pos = (-block_pos - 1) as usize;
            return self.overflow_positions[overflow_pos + idx % BLOCK_SIZE];
        }

        let subblock = idx / SUBBLOCK_SIZE;
        let start_pos = block_pos as u64 + u64::from(self.subblock_inventory[subblock]);
        let mut remainder = (idx % SUBBLOCK_SIZE) as u64;
        if remainder == 0 {
            return start_pos;
        }

        let data = bv.data();
        let mut word_idx = (start_pos / 64) as usize;
        let mut word = G::word(data, word_idx) & (u64::MAX << (start_pos % 64));
        loop {
            let popcnt = popcount(word);
            if remainder < popcnt {
                break;
            }
            remainder -= popcnt;
            word_idx += 1;
            word = G::word(data, word_idx);
        }
        word_idx as u64 * 64 + select_in_word(word, remainder)
    }
}

#[derive(Default)]
struct Inventory {
    blocks: Vec<i64>,
    subblocks: Vec<u16>,
    overflow: Vec<u64>,
}

impl Inventory {
    fn flush(&mut self, cur_block: &mut Vec<u64>) {
        let (Some(&first), Some(&last)) = (cur_block.first(), cur_block.last()) else {
            return;
        };
        if last - first < MAX_IN_BLOCK_DISTANCE {
            self.blocks.push(first as i64);
            self.subblocks.extend(
                cur_block
                    .iter()
                    .step_by(SUBBLOCK_SIZE)
                    .map(|&pos| (pos - first) as u16),
            );
        } else {
            self.blocks.push(-(self.overflow.len() as i64) - 1);
            self.overflow.extend_from_slice(cur_block);
            self.subblocks
                .extend(std::iter::repeat(SUBBLOCK_OVERFLOW).take(cur_block.len().div_ceil(SUBBLOCK_SIZE)));
        }
        cur_block.clear();
    }
}

impl<'a, G> Mappable<'a> for DArray<'a, G> {
    fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
        v.scalar("positions", &mut self.positions)?;
        v.vector("block_inventory", &mut self.block_inventory)?;
        v.vector("overflow_positions", &mut self.overflow_positions)?;
        v.vector("subblock_inventory", &mut self.subblock_inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVectorBuilder;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn check(bits: &[bool]) {
        let bv = BitVector::from_bits(bits.iter().copied());
        let d1 = DArray1::new(&bv);
        let d0 = DArray0::new(&bv);
        let ones: Vec<u64> = (0..bits.len() as u64).filter(|&i| bits[i as usize]).collect();
        let zeros: Vec<u64> = (0..bits.len() as u64).filter(|&i| !bits[i as usize]).collect();
        assert_eq!(d1.num_positions(), ones.len() as u64);
        assert_eq!(d0.num_positions(), zeros.len() as u64);
        for (k, &p) in ones.iter().enumerate() {
            assert_eq!(d1.select(&bv, k as u64), p, "select1({})", k);
        }
        for (k, &p) in zeros.iter().enumerate() {
            assert_eq!(d0.select(&bv, k as u64), p, "select0({})", k);
        }
    }

    #[test]
    fn test_empty() {
        let bv = BitVector::default();
        assert_eq!(DArray1::new(&bv).num_positions(), 0);
        assert_eq!(DArray0::new(&bv).num_positions(), 0);
    }

    #[test]
    fn test_sparse_two_ones() {
        let mut builder = BitVectorBuilder::with_len(10_000, false);
        builder.set(9000, true);
        builder.set(9999, true);
        let bv = builder.build();
        let d1 = DArray1::new(&bv);
        assert_eq!(d1.num_positions(), 2);
        assert_eq!(d1.select(&bv, 0), 9000);
        assert_eq!(d1.select(&bv, 1), 9999);
    }

    #[test]
    fn test_zeros_ignore_padding() {
        let bits = vec![true; 70];
        let bv = BitVector::from_bits(bits.iter().copied());
        assert_eq!(DArray0::new(&bv).num_positions(), 0);
    }

    #[test]
    fn test_dense_and_random() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for density in [0.01, 0.5, 0.99] {
            let bits: Vec<bool> = (0..50_000).map(|_| rng.gen_bool(density)).collect();
            check(&bits);
        }
    }

    #[test]
    fn test_overflow_blocks() {
        // Ones 100 apart: a block of 1024 spans ~100k bits, past the compact bound.
        let positions: Vec<u64> = (0..3000).map(|i| i * 100).collect();
        let mut builder = BitVectorBuilder::with_len(300_000, false);
        for &p in &positions {
            builder.set(p, true);
        }
        let bv = builder.build();
        let d1 = DArray1::new(&bv);
        assert!(d1.block_inventory.iter().all(|&b| b < 0));
        for (k, &p) in positions.iter().enumerate() {
            assert_eq!(d1.select(&bv, k as u64), p);
        }
    }

    #[test]
    fn test_from_positions_matches_scan() {
        let bits: Vec<bool> = (0..5000).map(|i| i % 7 == 3 || i % 13 == 0).collect();
        let bv = BitVector::from_bits(bits.iter().copied());
        let positions = (0..5000u64).filter(|&i| bits[i as usize]);
        assert_eq!(DArray1::from_positions(positions), DArray1::new(&bv));
    }

    #[test]
    fn test_subblock_inventory_padded() {
        let bits = vec![true; 33];
        let bv = BitVector::from_bits(bits.iter().copied());
        let d1 = DArray1::new(&bv);
        assert_eq!(d1.subblock_inventory.len() % 4, 0);
        check(&bits);
    }
}
