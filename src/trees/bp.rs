//! Balanced parentheses vector with a range min-excess index.
//!
//! In BP encoding `1` is an open parenthesis and `0` a close parenthesis.
//! Bit positions are indexed from LSB (position 0) to MSB (position 63).
//!
//! # Index
//!
//! | Level | Granularity | Stored |
//! |-------|-------------|--------|
//! | block | 4 words (256 bits) | `i16` minimum excess, relative to the superblock start |
//! | superblock | 32 blocks (8192 bits) | `i64` absolute minimum excess, as the leaves of a flat binary tree |
//!
//! The superblock tree is an implicit complete binary tree in one array: the
//! `internal_nodes` internal nodes come first (node 0 unused, node `k` has
//! children `2k` and `2k + 1`), followed by one leaf per superblock. Internal
//! nodes start out as `size()`, which acts as a sentinel for subtrees without
//! leaves, and are filled bottom-up.
//!
//! # Key Operations
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | `find_close(i)` | Position of `)` matching `(` at position `i` |
//! | `find_open(i)` | Position of `(` matching `)` at position `i` |
//! | `enclose(i)` | Position of the `(` enclosing the open at position `i` |
//! | `excess_rmq(a, b)` | Leftmost position of minimum excess in `[a, b]` |
//!
//! Matching searches first try the rest of the current word with byte
//! tables, then the rest of the block, then jump through the tree to the
//! first block whose minimum can contain the answer.

use crate::binary::{Mappable, MappableVector, Visitor};
use crate::bits::{BitVector, RsBitVector};
use crate::error::Result;
use crate::util::broadword::{byte_counts, bytes_sum, find_lsb, leq_step_8, reverse_bytes, ONES_STEP_8};
use crate::{Config, RankSelect};

/// Words per block.
const BLOCK_WORDS: usize = 4;

/// Blocks per superblock.
const SUPERBLOCK_BLOCKS: usize = 32;

// ============================================================================
// Byte lookup tables
// ============================================================================

struct ExcessTables {
    /// Total excess of each byte.
    fwd_exc: [i8; 256],
    /// `fwd_pos[b][e]`: 1 + index of the bit after which the running excess,
    /// scanning from bit 0, first reaches `-e`; 0 if it never does.
    fwd_pos: [[u8; 9]; 256],
    /// `bwd_pos[b][e]`: 1 + index (counted from bit 7 downwards) after which
    /// the running excess, scanning from bit 7, first reaches `e`.
    bwd_pos: [[u8; 9]; 256],
    /// Maximum running excess scanning from bit 7 downwards.
    bwd_min: [u8; 256],
    /// Negated minimum running excess scanning from bit 0.
    fwd_min: [u8; 256],
    /// 1 + index of the bit after which `fwd_min` is first reached.
    fwd_min_idx: [u8; 256],
}

static TABLES: ExcessTables = {
    let mut t = ExcessTables {
        fwd_exc: [0; 256],
        fwd_pos: [[0; 9]; 256],
        bwd_pos: [[0; 9]; 256],
        bwd_min: [0; 256],
        fwd_min: [0; 256],
        fwd_min_idx: [0; 256],
    };
    let mut c = 0usize;
    while c < 256 {
        let mut excess: i32 = 0;
        let mut i = 0;
        while i < 8 {
            if (c >> i) & 1 == 1 {
                excess += 1;
            } else {
                excess -= 1;
                if excess < 0 && t.fwd_pos[c][(-excess) as usize] == 0 {
                    t.fwd_pos[c][(-excess) as usize] = (i + 1) as u8;
                }
            }
            if -excess > t.fwd_min[c] as i32 {
                t.fwd_min[c] = (-excess) as u8;
                t.fwd_min_idx[c] = (i + 1) as u8;
            }
            i += 1;
        }
        t.fwd_exc[c] = excess as i8;

        excess = 0;
        i = 0;
        while i < 8 {
            if (c << i) & 128 != 0 {
                excess += 1;
                if excess > 0 && t.bwd_pos[c][excess as usize] == 0 {
                    t.bwd_pos[c][excess as usize] = (i + 1) as u8;
                }
            } else {
                excess -= 1;
            }
            if excess > t.bwd_min[c] as i32 {
                t.bwd_min[c] = excess as u8;
            }
            i += 1;
        }
        c += 1;
    }
    t
};

#[inline]
fn byte_at(word: u64, shift: u32) -> usize {
    ((word >> shift) & 0xFF) as usize
}

/// Find the close that brings the excess down by `cur_exc` within `word`.
///
/// Returns the bit offset of that close.
#[inline]
fn find_close_in_word(word: u64, byte_counts: u64, cur_exc: i64) -> Option<u64> {
    debug_assert!(cur_exc > 0 && cur_exc <= 64);
    let cum_exc_step_8 = (cur_exc as u64)
        .wrapping_add((2 * byte_counts).wrapping_sub(8 * ONES_STEP_8) << 8)
        .wrapping_mul(ONES_STEP_8);

    let mut min_exc_step_8 = 0u64;
    for i in 0..8 {
        let shift = i * 8;
        min_exc_step_8 |= (TABLES.fwd_min[byte_at(word, shift)] as u64) << shift;
    }

    let has_result = leq_step_8(cum_exc_step_8, min_exc_step_8);
    find_lsb(has_result).map(|shift| {
        let bit_pos = TABLES.fwd_pos[byte_at(word, shift)][byte_at(cum_exc_step_8, shift)];
        debug_assert!(bit_pos > 0);
        shift as u64 + bit_pos as u64 - 1
    })
}

/// Find, scanning from bit 63 downwards, the open that brings the excess up
/// by `cur_exc`. Returns its bit offset.
#[inline]
fn find_open_in_word(word: u64, byte_counts: u64, cur_exc: i64) -> Option<u64> {
    debug_assert!(cur_exc > 0 && cur_exc <= 64);
    let rev_byte_counts = reverse_bytes(byte_counts);
    let cum_exc_step_8 = (cur_exc as u64)
        .wrapping_sub((2 * rev_byte_counts).wrapping_sub(8 * ONES_STEP_8) << 8)
        .wrapping_mul(ONES_STEP_8);

    let mut max_exc_step_8 = 0u64;
    for i in 0..8 {
        let shift = i * 8;
        max_exc_step_8 |= (TABLES.bwd_min[byte_at(word, 64 - shift - 8)] as u64) << shift;
    }

    let has_result = leq_step_8(cum_exc_step_8, max_exc_step_8);
    find_lsb(has_result).map(|shift| {
        let bit_pos = TABLES.bwd_pos[byte_at(word, 64 - shift - 8)][byte_at(cum_exc_step_8, shift)];
        debug_assert!(bit_pos > 0);
        64 - (shift as u64 + bit_pos as u64)
    })
}

/// Update the running minimum with the excess after every bit of `word`.
#[inline]
fn excess_rmq_in_word(word: u64, exc: &mut i64, word_start: u64, min_exc: &mut i64, min_exc_idx: &mut u64) {
    let mut min_byte_exc = *min_exc;
    let mut min_byte_idx = 0u32;

    for i in 0..8 {
        let byte = byte_at(word, i * 8);
        let cur_min = *exc - TABLES.fwd_min[byte] as i64;
        if cur_min < min_byte_exc {
            min_byte_idx = i;
            min_byte_exc = cur_min;
        }
        *exc += TABLES.fwd_exc[byte] as i64;
    }

    if min_byte_exc < *min_exc {
        *min_exc = min_byte_exc;
        let shift = min_byte_idx * 8;
        *min_exc_idx = word_start + shift as u64 + TABLES.fwd_min_idx[byte_at(word, shift)] as u64;
    }
}

// ============================================================================
// BpVector
// ============================================================================

/// Balanced parentheses over a rank/select bit vector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BpVector<'a> {
    rs: RsBitVector<'a>,
    superblock_excess_min: MappableVector<'a, i64>,
    block_excess_min: MappableVector<'a, i16>,
    internal_nodes: u64,
}

impl<'a> BpVector<'a> {
    /// Index `bits` as a parenthesis sequence, with optional select hints.
    pub fn new(bits: BitVector<'a>, select1_hints: bool, select0_hints: bool) -> Self {
        let config = Config::default()
            .with_select1_hints(select1_hints)
            .with_select0_hints(select0_hints);
        Self::with_config(bits, &config)
    }

    /// Index `bits` using the hint settings in `config`.
    pub fn with_config(bits: BitVector<'a>, config: &Config) -> Self {
        let mut bp = Self {
            rs: RsBitVector::with_config(bits, config),
            superblock_excess_min: MappableVector::new(),
            block_excess_min: MappableVector::new(),
            internal_nodes: 0,
        };
        bp.build_min_tree();
        tracing::debug!(
            bits = bp.size(),
            blocks = bp.num_blocks(),
            tree_nodes = bp.superblock_excess_min.len(),
            "built balanced parentheses index"
        );
        bp
    }

    /// Build from a sequence of booleans, `true` being an open parenthesis.
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> BpVector<'static> {
        BpVector::new(BitVector::from_bits(bits), false, false)
    }

    fn build_min_tree(&mut self) {
        let size = self.size();
        if size == 0 {
            return;
        }
        let data = self.rs.data();
        let mut block_excess_min: Vec<i16> = Vec::with_capacity(data.len().div_ceil(BLOCK_WORDS) + 3);
        let mut cur_block_min: i64 = 0;
        let mut cur_superblock_excess: i64 = 0;
        for (sub_block, &word) in data.iter().enumerate() {
            if sub_block % BLOCK_WORDS == 0 {
                if sub_block % (BLOCK_WORDS * SUPERBLOCK_BLOCKS) == 0 {
                    cur_superblock_excess = 0;
                }
                if sub_block != 0 {
                    block_excess_min.push(cur_block_min as i16);
                    cur_block_min = cur_superblock_excess;
                }
            }
            // The last word stops at the logical end.
            let n_bits = if sub_block == data.len() - 1 && size % 64 != 0 {
                size % 64
            } else {
                64
            };
            for i in 0..n_bits {
                cur_superblock_excess += if (word >> i) & 1 == 1 { 1 } else { -1 };
                cur_block_min = cur_block_min.min(cur_superblock_excess);
            }
        }
        block_excess_min.push(cur_block_min as i16);

        let n_blocks = data.len().div_ceil(BLOCK_WORDS);
        debug_assert_eq!(n_blocks, block_excess_min.len());
        let n_superblocks = n_blocks.div_ceil(SUPERBLOCK_BLOCKS);
        let internal_nodes = n_superblocks.next_power_of_two();
        let tree_size = internal_nodes + n_superblocks;

        let mut tree = vec![size as i64; tree_size];
        for superblock in 0..n_superblocks {
            let superblock_excess = self.get_block_excess(superblock * SUPERBLOCK_BLOCKS);
            let end = ((superblock + 1) * SUPERBLOCK_BLOCKS).min(n_blocks);
            let cur_super_min = block_excess_min[superblock * SUPERBLOCK_BLOCKS..end]
                .iter()
                .map(|&m| superblock_excess + m as i64)
                .fold(size as i64, i64::min);
            debug_assert!(cur_super_min >= 0 && cur_super_min < size as i64);
            tree[internal_nodes + superblock] = cur_super_min;
        }
        for node in (2..tree_size).rev() {
            let parent = node / 2;
            tree[parent] = tree[parent].min(tree[node]);
        }

        // Keep the byte length a multiple of 8 so fields frozen after this
        // index stay 8-byte aligned.
        while block_excess_min.len() % 4 != 0 {
            block_excess_min.push(0);
        }

        self.block_excess_min = block_excess_min.into();
        self.superblock_excess_min = tree.into();
        self.internal_nodes = internal_nodes as u64;
    }

    /// The underlying rank/select vector.
    #[inline]
    pub fn rs(&self) -> &RsBitVector<'a> {
        &self.rs
    }

    /// Number of parentheses.
    #[inline]
    pub fn size(&self) -> u64 {
        self.rs.size()
    }

    /// Returns true if there are no parentheses.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rs.is_empty()
    }

    /// Returns the bit at `pos`.
    #[inline]
    pub fn get(&self, pos: u64) -> bool {
        self.rs.get(pos)
    }

    /// Returns true if `pos` holds an open parenthesis.
    #[inline]
    pub fn is_open(&self, pos: u64) -> bool {
        self.rs.get(pos)
    }

    /// Number of opens in `[0, pos)`.
    #[inline]
    pub fn rank(&self, pos: u64) -> u64 {
        self.rs.rank(pos)
    }

    /// Number of closes in `[0, pos)`.
    #[inline]
    pub fn rank0(&self, pos: u64) -> u64 {
        self.rs.rank0(pos)
    }

    /// Position of the `k`-th open.
    #[inline]
    pub fn select(&self, k: u64) -> u64 {
        self.rs.select(k)
    }

    /// Position of the `k`-th close.
    #[inline]
    pub fn select0(&self, k: u64) -> u64 {
        self.rs.select0(k)
    }

    /// Opens minus closes in `[0, pos)`.
    #[inline]
    pub fn excess(&self, pos: u64) -> i64 {
        2 * self.rs.rank(pos) as i64 - pos as i64
    }

    #[inline]
    fn num_blocks(&self) -> usize {
        self.rs.data().len().div_ceil(BLOCK_WORDS)
    }

    /// Absolute excess at the start of `block`.
    #[inline]
    fn get_block_excess(&self, block: usize) -> i64 {
        let word = block * BLOCK_WORDS;
        2 * self.rs.rank_at_word(word) as i64 - (word * 64) as i64
    }

    #[inline]
    fn in_node_range(&self, node: usize, excess: i64) -> bool {
        self.superblock_excess_min
            .get(node)
            .map_or(false, |&node_min| excess >= node_min)
    }

    fn find_close_in_block(&self, block_offset: usize, mut excess: i64, start: usize) -> Option<u64> {
        if excess > ((BLOCK_WORDS - start) * 64) as i64 {
            return None;
        }
        let data = self.rs.data();
        let end = (block_offset + BLOCK_WORDS).min(data.len());
        for sub_block in block_offset + start..end {
            debug_assert!(excess > 0);
            let word = data[sub_block];
            let counts = byte_counts(word);
            if excess <= 64 {
                if let Some(ret) = find_close_in_word(word, counts, excess) {
                    return Some(ret + sub_block as u64 * 64);
                }
            }
            excess += 2 * bytes_sum(counts) as i64 - 64;
        }
        None
    }

    fn find_open_in_block(&self, block_offset: usize, mut excess: i64, start: usize) -> Option<u64> {
        if excess > (start * 64) as i64 {
            return None;
        }
        let data = self.rs.data();
        for sub_block in (block_offset..block_offset + start).rev() {
            debug_assert!(excess > 0);
            let word = data[sub_block];
            let counts = byte_counts(word);
            if excess <= 64 {
                if let Some(ret) = find_open_in_word(word, counts, excess) {
                    return Some(ret + sub_block as u64 * 64);
                }
            }
            excess -= 2 * bytes_sum(counts) as i64 - 64;
        }
        None
    }

    /// Position of the close matching the open at `pos`.
    pub fn find_close(&self, pos: u64) -> u64 {
        debug_assert!(self.get(pos), "no open parenthesis at {}", pos);
        let data = self.rs.data();

        // Search in the current word, padding the consumed bits with opens.
        let word_pos = ((pos + 1) / 64) as usize;
        let shift = (pos + 1) % 64;
        let shifted_word = data[word_pos] >> shift;
        let padded_word = if shift != 0 {
            shifted_word | (u64::MAX << (64 - shift))
        } else {
            shifted_word
        };
        let counts = byte_counts(padded_word);
        if let Some(ret) = find_close_in_word(padded_word, counts, 1) {
            return ret + pos + 1;
        }

        // Then in the rest of the block.
        let block = word_pos / BLOCK_WORDS;
        let block_offset = block * BLOCK_WORDS;
        let sub_block = word_pos % BLOCK_WORDS;
        let local_rank = bytes_sum(counts) - shift;
        let local_excess = 2 * local_rank as i64 - (64 - shift) as i64;
        if let Some(ret) = self.find_close_in_block(block_offset, local_excess + 1, sub_block + 1) {
            return ret;
        }

        // Then in the first block that can reach back to our excess.
        let pos_excess = self.excess(pos);
        let found_block = self.search_min_tree::<true>(block + 1, pos_excess);
        let found_block_excess = self.get_block_excess(found_block);
        let found = self.find_close_in_block(found_block * BLOCK_WORDS, found_block_excess - pos_excess, 0);
        debug_assert!(found.is_some(), "unmatched open parenthesis at {}", pos);
        found.unwrap_or(self.size())
    }

    /// Position of the open matching the close at `pos`.
    pub fn find_open(&self, pos: u64) -> u64 {
        debug_assert!(pos > 0);
        let data = self.rs.data();

        // Search in the current word; bits from `pos` on are padded with closes.
        let word_pos = (pos / 64) as usize;
        let len = pos % 64;
        let shifted_word = if len != 0 {
            data[word_pos] << (64 - len)
        } else {
            0
        };
        let counts = byte_counts(shifted_word);
        if let Some(ret) = find_open_in_word(shifted_word, counts, 1) {
            return pos + ret - 64;
        }

        // Then in the preceding words of the block.
        let block = word_pos / BLOCK_WORDS;
        let block_offset = block * BLOCK_WORDS;
        let sub_block = word_pos % BLOCK_WORDS;
        let local_rank = bytes_sum(counts);
        let local_excess = -(2 * local_rank as i64 - len as i64);
        if let Some(ret) = self.find_open_in_block(block_offset, local_excess + 1, sub_block) {
            return ret;
        }

        // Then in the last preceding block that can reach our excess.
        let pos_excess = self.excess(pos) - 1;
        let found_block = self.search_min_tree::<false>(block.saturating_sub(1), pos_excess);
        // The search runs backwards, so start from the end of the found block.
        let found_block_excess = self.get_block_excess(found_block + 1);
        let found = self.find_open_in_block(
            found_block * BLOCK_WORDS,
            found_block_excess - pos_excess,
            BLOCK_WORDS,
        );
        debug_assert!(found.is_some(), "unmatched close parenthesis at {}", pos);
        found.unwrap_or(0)
    }

    /// Position of the open enclosing the open at `pos`.
    pub fn enclose(&self, pos: u64) -> u64 {
        debug_assert!(self.get(pos));
        self.find_open(pos)
    }

    fn search_block_in_superblock<const FORWARD: bool>(&self, block: usize, excess: i64) -> Option<usize> {
        let superblock = block / SUPERBLOCK_BLOCKS;
        let superblock_excess = self.get_block_excess(superblock * SUPERBLOCK_BLOCKS);
        let reaches = |b: &usize| excess >= superblock_excess + self.block_excess_min[*b] as i64;
        if FORWARD {
            let end = ((superblock + 1) * SUPERBLOCK_BLOCKS).min(self.num_blocks());
            (block..end).find(reaches)
        } else {
            (superblock * SUPERBLOCK_BLOCKS..=block).rev().find(reaches)
        }
    }

    fn search_min_tree<const FORWARD: bool>(&self, block: usize, excess: i64) -> usize {
        if let Some(found) = self.search_block_in_superblock::<FORWARD>(block, excess) {
            return found;
        }

        let internal_nodes = self.internal_nodes as usize;
        let mut cur_node = internal_nodes + block / SUPERBLOCK_BLOCKS;
        // Climb until a sibling on the search side can reach `excess`.
        while cur_node > 1 {
            let going_back = (cur_node & 1 == 1) == FORWARD;
            if !going_back {
                let next_node = if FORWARD { cur_node + 1 } else { cur_node - 1 };
                if self.in_node_range(next_node, excess) {
                    cur_node = next_node;
                    break;
                }
            }
            cur_node /= 2;
        }
        debug_assert!(cur_node > 1, "no block reaches excess {}", excess);

        // Descend, preferring the child nearest to the starting block.
        while cur_node < internal_nodes {
            let next_node = cur_node * 2 + usize::from(!FORWARD);
            cur_node = if self.in_node_range(next_node, excess) {
                next_node
            } else if FORWARD {
                next_node + 1
            } else {
                next_node - 1
            };
        }

        let superblock = cur_node - internal_nodes;
        let start = superblock * SUPERBLOCK_BLOCKS + if FORWARD { 0 } else { SUPERBLOCK_BLOCKS - 1 };
        let found = self.search_block_in_superblock::<FORWARD>(start, excess);
        debug_assert!(found.is_some());
        found.unwrap_or(start)
    }

    fn excess_rmq_in_block(&self, start: usize, end: usize, exc: &mut i64, min_exc: &mut i64, min_exc_idx: &mut u64) {
        debug_assert!(start <= end);
        let data = self.rs.data();
        for w in start..end {
            excess_rmq_in_word(data[w], exc, w as u64 * 64, min_exc, min_exc_idx);
        }
    }

    fn excess_rmq_in_superblock(&self, block_start: usize, block_end: usize, block_min_exc: &mut i64, block_min_idx: &mut usize) {
        debug_assert!(block_start <= block_end);
        if block_start == block_end {
            return;
        }
        let superblock = block_start / SUPERBLOCK_BLOCKS;
        debug_assert_eq!(superblock, (block_end - 1) / SUPERBLOCK_BLOCKS);
        let superblock_excess = self.get_block_excess(superblock * SUPERBLOCK_BLOCKS);
        for block in block_start..block_end {
            let block_min = superblock_excess + self.block_excess_min[block] as i64;
            if block_min < *block_min_exc {
                *block_min_exc = block_min;
                *block_min_idx = block;
            }
        }
    }

    /// Leftmost superblock in `[superblock_start, superblock_end)` whose
    /// minimum is below `superblock_min_exc`, found through the tree.
    fn find_min_superblock(
        &self,
        superblock_start: usize,
        superblock_end: usize,
        superblock_min_exc: &mut i64,
        superblock_min_idx: &mut usize,
    ) {
        if superblock_start == superblock_end {
            return;
        }
        let tree = &self.superblock_excess_min;
        let internal_nodes = self.internal_nodes as usize;

        let mut cur_node = internal_nodes + superblock_start;
        let mut rightmost_span = superblock_start;
        let mut node_min_exc = tree[cur_node];
        let mut node_min_idx = cur_node;

        // The climb below needs a right turn on the leaf-to-root path.
        if superblock_end - superblock_start == 1 {
            if node_min_exc < *superblock_min_exc {
                *superblock_min_exc = node_min_exc;
                *superblock_min_idx = superblock_start;
            }
            return;
        }

        // Climb to the lowest node spanning the whole range, collecting right
        // siblings inside it.
        let mut h = 0u32;
        loop {
            debug_assert!(cur_node > 0);
            if cur_node & 1 == 0 {
                let right_sibling = cur_node + 1;
                rightmost_span += 1 << h;
                if rightmost_span < superblock_end && tree[right_sibling] < node_min_exc {
                    node_min_exc = tree[right_sibling];
                    node_min_idx = right_sibling;
                }
                if rightmost_span >= superblock_end - 1 {
                    cur_node += 1;
                    break;
                }
            }
            cur_node /= 2;
            h += 1;
        }

        // Descend towards `superblock_end - 1`, collecting left children.
        while rightmost_span > superblock_end - 1 {
            debug_assert!(h > 0);
            h -= 1;
            let left_child = cur_node * 2;
            let right_child_span = 1usize << h;
            if rightmost_span - right_child_span >= superblock_end - 1 {
                rightmost_span -= right_child_span;
                cur_node = left_child;
            } else {
                if tree[left_child] < node_min_exc {
                    node_min_exc = tree[left_child];
                    node_min_idx = left_child;
                }
                cur_node = left_child + 1;
            }
        }

        if rightmost_span < superblock_end && tree[cur_node] < node_min_exc {
            node_min_exc = tree[cur_node];
            node_min_idx = cur_node;
        }
        debug_assert_eq!(rightmost_span, superblock_end - 1);

        // Reach the leftmost minimal leaf of the chosen subtree.
        if node_min_exc < *superblock_min_exc {
            cur_node = node_min_idx;
            while cur_node < internal_nodes {
                cur_node *= 2;
                // Missing right subtrees hold the `size()` sentinel.
                if tree.get(cur_node + 1).map_or(false, |&right| right < tree[cur_node]) {
                    cur_node += 1;
                }
            }
            debug_assert_eq!(tree[cur_node], node_min_exc);
            *superblock_min_exc = node_min_exc;
            *superblock_min_idx = cur_node - internal_nodes;
            debug_assert!(*superblock_min_idx >= superblock_start);
            debug_assert!(*superblock_min_idx < superblock_end);
        }
    }

    /// Leftmost position `i` in `[a, b]` minimizing `excess(i)`, with that
    /// minimum.
    pub fn excess_rmq(&self, a: u64, b: u64) -> (u64, i64) {
        debug_assert!(a <= b && b <= self.size());
        let data = self.rs.data();

        let mut cur_exc = self.excess(a);
        let mut min_exc = cur_exc;
        let mut min_exc_idx = a;
        if a == b {
            return (min_exc_idx, min_exc);
        }

        let range_len = b - a;
        let word_a_idx = (a / 64) as usize;
        let word_b_idx = ((b - 1) / 64) as usize;

        // Word of `a`, padded with opens past the range.
        let shift_a = a % 64;
        let shifted_word_a = data[word_a_idx] >> shift_a;
        let subword_len_a = (64 - shift_a).min(range_len);
        let padded_word_a = if subword_len_a == 64 {
            shifted_word_a
        } else {
            shifted_word_a | (u64::MAX << subword_len_a)
        };
        excess_rmq_in_word(padded_word_a, &mut cur_exc, a, &mut min_exc, &mut min_exc_idx);

        if word_a_idx == word_b_idx {
            return (min_exc_idx, min_exc);
        }

        let block_a = word_a_idx / BLOCK_WORDS;
        let block_b = word_b_idx / BLOCK_WORDS;

        // Remove the padding.
        cur_exc -= 64 - subword_len_a as i64;

        if block_a == block_b {
            self.excess_rmq_in_block(word_a_idx + 1, word_b_idx, &mut cur_exc, &mut min_exc, &mut min_exc_idx);
        } else {
            self.excess_rmq_in_block(
                word_a_idx + 1,
                (block_a + 1) * BLOCK_WORDS,
                &mut cur_exc,
                &mut min_exc,
                &mut min_exc_idx,
            );

            let mut block_min_exc = min_exc;
            let mut block_min_idx = usize::MAX;

            let superblock_a = (block_a + 1) / SUPERBLOCK_BLOCKS;
            let superblock_b = block_b / SUPERBLOCK_BLOCKS;

            if superblock_a == superblock_b {
                self.excess_rmq_in_superblock(block_a + 1, block_b, &mut block_min_exc, &mut block_min_idx);
            } else {
                self.excess_rmq_in_superblock(
                    block_a + 1,
                    (superblock_a + 1) * SUPERBLOCK_BLOCKS,
                    &mut block_min_exc,
                    &mut block_min_idx,
                );

                let mut superblock_min_exc = min_exc;
                let mut superblock_min_idx = usize::MAX;
                self.find_min_superblock(
                    superblock_a + 1,
                    superblock_b,
                    &mut superblock_min_exc,
                    &mut superblock_min_idx,
                );
                if superblock_min_exc < min_exc {
                    self.excess_rmq_in_superblock(
                        superblock_min_idx * SUPERBLOCK_BLOCKS,
                        (superblock_min_idx + 1) * SUPERBLOCK_BLOCKS,
                        &mut block_min_exc,
                        &mut block_min_idx,
                    );
                }

                self.excess_rmq_in_superblock(
                    superblock_b * SUPERBLOCK_BLOCKS,
                    block_b,
                    &mut block_min_exc,
                    &mut block_min_idx,
                );
            }

            if block_min_exc < min_exc {
                cur_exc = self.get_block_excess(block_min_idx);
                self.excess_rmq_in_block(
                    block_min_idx * BLOCK_WORDS,
                    (block_min_idx + 1) * BLOCK_WORDS,
                    &mut cur_exc,
                    &mut min_exc,
                    &mut min_exc_idx,
                );
                debug_assert_eq!(min_exc, block_min_exc);
            }

            cur_exc = self.get_block_excess(block_b);
            self.excess_rmq_in_block(block_b * BLOCK_WORDS, word_b_idx, &mut cur_exc, &mut min_exc, &mut min_exc_idx);
        }

        // Word of `b`, padded with opens from `b` on.
        let word_b = data[word_b_idx];
        let offset_b = b % 64;
        let padded_word_b = if offset_b == 0 {
            word_b
        } else {
            word_b | (u64::MAX << offset_b)
        };
        excess_rmq_in_word(padded_word_b, &mut cur_exc, word_b_idx as u64 * 64, &mut min_exc, &mut min_exc_idx);

        debug_assert!(min_exc_idx >= a);
        debug_assert_eq!(min_exc, self.excess(min_exc_idx));
        (min_exc_idx, min_exc)
    }
}

impl RankSelect for BpVector<'_> {
    #[inline]
    fn rank1(&self, i: usize) -> usize {
        self.rs.rank1(i)
    }

    fn select1(&self, k: usize) -> Option<usize> {
        self.rs.select1(k)
    }

    fn select0(&self, k: usize) -> Option<usize> {
        RankSelect::select0(&self.rs, k)
    }
}

impl<'a> Mappable<'a> for BpVector<'a> {
    fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
        v.nested("rs", &mut self.rs)?;
        v.vector("superblock_excess_min", &mut self.superblock_excess_min)?;
        v.vector("block_excess_min", &mut self.block_excess_min)?;
        v.scalar("internal_nodes", &mut self.internal_nodes)
    }
}
