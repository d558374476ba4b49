//! Precomputed lookup tables for word-level select.
//!
//! The tables are const-evaluated, so they live in read-only memory for the
//! whole process and need no initialization.

/// Lookup table for select-in-byte operation.
///
/// For a byte value `b` and rank `k`, `SELECT_IN_BYTE_TABLE[b * 8 + k]` gives
/// the position (0-7) of the k-th set bit in `b`, or 8 if there are fewer than
/// k+1 set bits.
///
/// Table size: 256 bytes × 8 positions = 2048 bytes
pub static SELECT_IN_BYTE_TABLE: [u8; 2048] = {
    let mut table = [8u8; 2048];
    let mut byte = 0u16;
    while byte < 256 {
        let mut pos = 0u8;
        let mut count = 0u8;
        while pos < 8 {
            if (byte >> pos) & 1 == 1 {
                table[(byte as usize) * 8 + count as usize] = pos;
                count += 1;
            }
            pos += 1;
        }
        byte += 1;
    }
    table
};

/// Select the k-th set bit (0-indexed) in a byte.
///
/// Returns the bit position (0-7), or 8 if there are fewer than k+1 set bits.
#[inline]
pub fn select_in_byte(byte: u8, k: u64) -> u64 {
    if k >= 8 {
        return 8;
    }
    SELECT_IN_BYTE_TABLE[(byte as usize) * 8 + k as usize] as u64
}
