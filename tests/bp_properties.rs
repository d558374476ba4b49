//! Property-based tests for the balanced parentheses index.

use proptest::prelude::*;
use succinct_mapped::trees::BpVector;

/// Turn arbitrary choices into a balanced sequence wrapped in `nest` opens.
fn balanced(choices: &[bool], nest: usize) -> Vec<bool> {
    let mut bits = vec![true; nest];
    let mut depth = 0usize;
    for &open in choices {
        if open || depth == 0 {
            bits.push(true);
            depth += 1;
        } else {
            bits.push(false);
            depth -= 1;
        }
    }
    bits.extend(std::iter::repeat(false).take(depth + nest));
    bits
}

fn matching(bits: &[bool]) -> Vec<Option<u64>> {
    let mut stack = Vec::new();
    let mut result = vec![None; bits.len()];
    for (i, &b) in bits.iter().enumerate() {
        if b {
            stack.push(i);
        } else if let Some(open) = stack.pop() {
            result[open] = Some(i as u64);
            result[i] = Some(open as u64);
        }
    }
    result
}

fn naive_excess(bits: &[bool], pos: usize) -> i64 {
    bits[..pos].iter().map(|&b| if b { 1 } else { -1 }).sum()
}

fn naive_rmq(bits: &[bool], a: usize, b: usize) -> (u64, i64) {
    let mut exc = naive_excess(bits, a);
    let mut best = (a as u64, exc);
    for i in a..b {
        exc += if bits[i] { 1 } else { -1 };
        if exc < best.1 {
            best = ((i + 1) as u64, exc);
        }
    }
    best
}

fn sequence() -> impl Strategy<Value = Vec<bool>> {
    (prop::collection::vec(any::<bool>(), 0..3000), 0usize..12_000)
        .prop_map(|(choices, nest)| balanced(&choices, nest))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn find_close_and_open_match(bits in sequence()) {
        let bp = BpVector::from_bits(bits.iter().copied());
        let pairs = matching(&bits);
        for (p, &m) in pairs.iter().enumerate() {
            let m = m.expect("sequence is balanced");
            let p = p as u64;
            if bits[p as usize] {
                let close = bp.find_close(p);
                prop_assert_eq!(close, m);
                prop_assert!(!bp.get(close));
                prop_assert_eq!(bp.excess(close + 1), bp.excess(p));
                prop_assert_eq!(bp.find_open(close), p);
            } else {
                prop_assert_eq!(bp.find_open(p), m);
            }
        }
    }

    #[test]
    fn enclose_is_parent(bits in sequence(), picks in prop::collection::vec(any::<prop::sample::Index>(), 1..40)) {
        prop_assume!(!bits.is_empty());
        let bp = BpVector::from_bits(bits.iter().copied());
        let pairs = matching(&bits);
        // Parent of an open = nearest open before it whose close is after it.
        for pick in picks {
            let p = pick.index(bits.len());
            if !bits[p] || p == 0 {
                continue;
            }
            let parent = (0..p).rev().find(|&q| bits[q] && pairs[q].map_or(false, |c| c as usize > p));
            if let Some(parent) = parent {
                prop_assert_eq!(bp.enclose(p as u64), parent as u64);
            }
        }
    }

    #[test]
    fn excess_rmq_is_leftmost_min(
        bits in sequence(),
        ranges in prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 1..30),
    ) {
        let bp = BpVector::from_bits(bits.iter().copied());
        let n = bits.len() + 1;
        for (x, y) in ranges {
            let (a, b) = {
                let (x, y) = (x.index(n), y.index(n));
                (x.min(y), x.max(y))
            };
            prop_assert_eq!(bp.excess_rmq(a as u64, b as u64), naive_rmq(&bits, a, b));
        }
    }

    #[test]
    fn excess_matches_rank(bits in sequence(), pick in any::<prop::sample::Index>()) {
        let bp = BpVector::from_bits(bits.iter().copied());
        let pos = pick.index(bits.len() + 1);
        prop_assert_eq!(bp.excess(pos as u64), naive_excess(&bits, pos));
        prop_assert_eq!(bp.excess(bits.len() as u64), 0);
    }
}
