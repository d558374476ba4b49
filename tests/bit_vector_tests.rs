//! Integration tests for bit vectors and their select indexes.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use succinct_mapped::bits::{BitVector, BitVectorBuilder, DArray0, DArray1, RsBitVector};
use succinct_mapped::{Config, RankSelect};

fn random_bits(n: usize, density: f64, seed: u64) -> Vec<bool> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_bool(density)).collect()
}

fn min_width(v: u64) -> u32 {
    64 - v.leading_zeros().min(63)
}

// ============================================================================
// Builder and bit vector
// ============================================================================

#[test]
fn test_append_bits_mixed_lengths() {
    let values = [
        0xFFFF_FFFF_FFFF_FFFFu64,
        1 << 63,
        1,
        1,
        1,
        3,
        5,
        7,
        0xFFF,
        0xF0F,
        1,
        0xFF_FFFF,
        0x12_3456,
        1 << 63,
        0xFFFF_FFFF_FFFF_FFFF,
    ];
    let mut builder = BitVectorBuilder::new();
    let mut offsets = Vec::new();
    for &v in &values {
        offsets.push(builder.len());
        builder.append_bits(v, min_width(v));
    }
    let bv = builder.build();
    for (&v, &offset) in values.iter().zip(&offsets) {
        assert_eq!(bv.get_bits(offset, min_width(v)), v, "value {:#x} at {}", v, offset);
    }
}

#[test]
fn test_from_bits_matches_input() {
    for n in [0usize, 1, 63, 64, 65, 1000, 4097] {
        let bits = random_bits(n, 0.5, n as u64);
        let bv = BitVector::from_bits(bits.iter().copied());
        assert_eq!(bv.size(), n as u64);
        for (i, &b) in bits.iter().enumerate() {
            assert_eq!(bv.get(i as u64), b);
        }
    }
}

#[test]
fn test_builder_append_and_reverse() {
    let a = random_bits(100, 0.4, 1);
    let b = random_bits(77, 0.6, 2);
    let mut left: BitVectorBuilder = a.iter().copied().collect();
    let right: BitVectorBuilder = b.iter().copied().collect();
    left.append(&right);
    left.reverse();
    let bv = left.build();
    let mut expected: Vec<bool> = a.iter().chain(&b).copied().collect();
    expected.reverse();
    assert_eq!(bv.iter().collect::<Vec<_>>(), expected);
}

#[test]
fn test_unary_enumerator_visits_every_one() {
    let bits = random_bits(5000, 0.02, 3);
    let bv = BitVector::from_bits(bits.iter().copied());
    let ones: Vec<u64> = (0..5000u64).filter(|&i| bits[i as usize]).collect();
    let mut e = bv.unary_enumerator(0);
    for &p in &ones {
        assert_eq!(e.next(), p);
    }
}

// ============================================================================
// Rank / select
// ============================================================================

#[test]
fn test_rank_select_consistency() {
    for density in [0.01, 0.5, 0.97] {
        let bits = random_bits(40_000, density, 4);
        let rs = RsBitVector::with_config(
            BitVector::from_bits(bits.iter().copied()),
            &Config::default()
                .with_select_sample_rate(64)
                .with_select1_hints(true)
                .with_select0_hints(true),
        );
        let ones = bits.iter().filter(|&&b| b).count() as u64;
        assert_eq!(rs.rank(rs.size()), ones);
        for k in 0..rs.num_ones() {
            let pos = rs.select(k);
            assert!(rs.get(pos));
            assert_eq!(rs.rank(pos), k);
            assert_eq!(rs.select(rs.rank(pos)), pos);
        }
        for k in (0..rs.num_zeros()).step_by(3) {
            let pos = rs.select0(k);
            assert!(!rs.get(pos));
            assert_eq!(rs.rank0(pos), k);
        }
    }
}

#[test]
fn test_rank_select_trait() {
    let bits = random_bits(3000, 0.3, 5);
    let rs = RsBitVector::new(BitVector::from_bits(bits.iter().copied()), false, false);
    let ones = rs.num_ones() as usize;
    assert_eq!(rs.select1(ones), None);
    assert_eq!(rs.select1(0), bits.iter().position(|&b| b));
    assert_eq!(RankSelect::select0(&rs, 0), bits.iter().position(|&b| !b));
    assert_eq!(rs.rank1(3000) + RankSelect::rank0(&rs, 3000), 3000);
}

// ============================================================================
// Dense-array select
// ============================================================================

#[test]
fn test_darray_two_distant_ones() {
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
fn test_darray_matches_rank_select() {
    let bits = random_bits(100_000, 0.1, 6);
    let bv = BitVector::from_bits(bits.iter().copied());
    let d1 = DArray1::new(&bv);
    let d0 = DArray0::new(&bv);
    let rs = RsBitVector::new(bv.clone(), false, false);
    for k in (0..d1.num_positions()).step_by(7) {
        assert_eq!(d1.select(&bv, k), rs.select(k));
    }
    for k in (0..d0.num_positions()).step_by(101) {
        assert_eq!(d0.select(&bv, k), rs.select0(k));
    }
}

#[cfg(feature = "large-tests")]
#[test]
fn test_large_rank_select() {
    let n = 100_000_000usize;
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let words: Vec<u64> = (0..n / 64).map(|_| rng.gen()).collect();
    let bv = BitVector::from_words(words, n as u64);
    let rs = RsBitVector::new(bv, true, true);
    for _ in 0..10_000 {
        let k = rng.gen_range(0..rs.num_ones());
        assert_eq!(rs.rank(rs.select(k)), k);
    }
}
