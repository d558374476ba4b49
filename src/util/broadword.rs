//! Broadword (SWAR) algorithms for bit manipulation.
//!
//! These algorithms operate on 64-bit words using SIMD-within-a-register
//! techniques. Every higher-level query in the crate locates a word through a
//! block index and then resolves the exact bit with one of these functions.

use crate::util::table::select_in_byte;

/// Constant with 1 in each nibble's LSB position.
pub const ONES_STEP_4: u64 = 0x1111_1111_1111_1111;

/// Constant with 1 in each byte's LSB position.
pub const ONES_STEP_8: u64 = 0x0101_0101_0101_0101;

/// Constant with 1 in each byte's MSB position.
pub const MSBS_STEP_8: u64 = 0x80 * ONES_STEP_8;

/// Population count of a word.
#[inline]
pub fn popcount(x: u64) -> u64 {
    x.count_ones() as u64
}

/// Per-byte population counts, packed in the corresponding bytes.
#[inline]
pub fn byte_counts(x: u64) -> u64 {
    let x = x - ((x & (0xA * ONES_STEP_4)) >> 1);
    let x = (x & (3 * ONES_STEP_4)) + ((x >> 2) & (3 * ONES_STEP_4));
    (x + (x >> 4)) & (0x0F * ONES_STEP_8)
}

/// Horizontal sum of the bytes of `x`.
///
/// Exact as long as the sum fits in a byte, which holds for the output of
/// [`byte_counts`].
#[inline]
pub fn bytes_sum(x: u64) -> u64 {
    x.wrapping_mul(ONES_STEP_8) >> 56
}

/// Index of the highest set bit. `x` must be non-zero.
#[inline]
pub fn msb(x: u64) -> u32 {
    debug_assert!(x != 0, "msb of zero is undefined");
    63 - x.leading_zeros()
}

/// Index of the lowest set bit. `x` must be non-zero.
#[inline]
pub fn lsb(x: u64) -> u32 {
    debug_assert!(x != 0, "lsb of zero is undefined");
    x.trailing_zeros()
}

/// Index of the highest set bit, or `None` for zero.
#[inline]
pub fn find_msb(x: u64) -> Option<u32> {
    if x == 0 {
        None
    } else {
        Some(63 - x.leading_zeros())
    }
}

/// Index of the lowest set bit, or `None` for zero.
#[inline]
pub fn find_lsb(x: u64) -> Option<u32> {
    if x == 0 {
        None
    } else {
        Some(x.trailing_zeros())
    }
}

/// Reverse the byte order of a word.
#[inline]
pub fn reverse_bytes(x: u64) -> u64 {
    x.swap_bytes()
}

/// Reverse the bit order of a word.
#[inline]
pub fn reverse_bits(x: u64) -> u64 {
    x.reverse_bits()
}

/// Byte-wise `x <= y`: returns 1 in the LSB of each byte where the byte of
/// `x` is less than or equal to the byte of `y`.
///
/// Both operands must have every byte below 128.
#[inline]
pub fn leq_step_8(x: u64, y: u64) -> u64 {
    ((((y | MSBS_STEP_8).wrapping_sub(x & !MSBS_STEP_8)) ^ (x ^ y)) & MSBS_STEP_8) >> 7
}

/// Select the k-th set bit (0-indexed) in a 64-bit word.
///
/// Uses per-byte prefix sums and a branchless comparison mask to find the
/// byte, then the select-in-byte table for the final bit. `k` must be less
/// than `popcount(x)`.
#[inline]
pub fn select_in_word(x: u64, k: u64) -> u64 {
    debug_assert!(k < popcount(x), "k={} out of range for word {:#x}", k, x);
    let byte_sums = byte_counts(x).wrapping_mul(ONES_STEP_8);
    let k_step_8 = k * ONES_STEP_8;
    let geq_k_step_8 = (k_step_8 | MSBS_STEP_8).wrapping_sub(byte_sums) & MSBS_STEP_8;
    let place = popcount(geq_k_step_8) * 8;
    let byte_rank = k - (((byte_sums << 8) >> place) & 0xFF);
    place + select_in_byte(((x >> place) & 0xFF) as u8, byte_rank)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_select(x: u64, k: u64) -> u64 {
        let mut seen = 0;
        for i in 0..64 {
            if (x >> i) & 1 == 1 {
                if seen == k {
                    return i;
                }
                seen += 1;
            }
        }
        64
    }

    #[test]
    fn test_byte_counts() {
        let x = 0xFF00_0F01_0300_8001u64;
        let counts = byte_counts(x);
        let expected = [1u64, 1, 0, 2, 1, 4, 0, 8];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!((counts >> (i * 8)) & 0xFF, e, "byte {}", i);
        }
        assert_eq!(bytes_sum(counts), x.count_ones() as u64);
        assert_eq!(bytes_sum(byte_counts(u64::MAX)), 64);
    }

    #[test]
    fn test_msb_lsb() {
        assert_eq!(msb(1), 0);
        assert_eq!(msb(1 << 63), 63);
        assert_eq!(msb(0b1011_0000), 7);
        assert_eq!(lsb(0b1011_0000), 4);
        assert_eq!(find_msb(0), None);
        assert_eq!(find_lsb(0), None);
        assert_eq!(find_lsb(1 << 40), Some(40));
    }

    #[test]
    fn test_reverse() {
        assert_eq!(reverse_bytes(0x0102_0304_0506_0708), 0x0807_0605_0403_0201);
        assert_eq!(reverse_bits(1), 1 << 63);
        assert_eq!(reverse_bits(0b1101), 0b1011 << 60);
    }

    #[test]
    fn test_leq_step_8() {
        let x = 0x0102_0304_0506_0708u64;
        let y = 0x0202_0202_0909_0909u64;
        // bytes (LSB first): x = 8,7,6,5,4,3,2,1 ; y = 9,9,9,9,2,2,2,2
        let r = leq_step_8(x, y);
        let expected = [1u64, 1, 1, 1, 0, 0, 1, 1];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!((r >> (i * 8)) & 0xFF, e, "byte {}", i);
        }
    }

    #[test]
    fn test_select_in_word_multiple() {
        let word = 0b1010_1010u64;
        assert_eq!(select_in_word(word, 0), 1);
        assert_eq!(select_in_word(word, 1), 3);
        assert_eq!(select_in_word(word, 2), 5);
        assert_eq!(select_in_word(word, 3), 7);
    }

    #[test]
    fn test_select_in_word_all_ones() {
        for k in 0..64 {
            assert_eq!(select_in_word(u64::MAX, k), k, "k={}", k);
        }
    }

    #[test]
    fn test_select_in_word_matches_naive() {
        for &word in &[
            1u64,
            0xFF,
            0x8000_0000_0000_0000,
            0xAAAA_AAAA_AAAA_AAAA,
            0x1234_5678_9ABC_DEF0,
            0x8000_0000_0000_0001,
            0x0100_0000_0000_0000,
        ] {
            for k in 0..popcount(word) {
                assert_eq!(
                    select_in_word(word, k),
                    naive_select(word, k),
                    "word={:#x}, k={}",
                    word,
                    k
                );
            }
        }
    }

    #[test]
    fn test_select_in_word_exhaustive_small() {
        for word in 1u64..=0xFFFF {
            let spread = word | (word << 40);
            for k in 0..popcount(spread) {
                assert_eq!(select_in_word(spread, k), naive_select(spread, k));
            }
        }
    }
}
