//! Cartesian tree for range minimum queries.
//!
//! The tree of running minima is stored as a DFUDS-like parenthesis
//! sequence. Construction streams the values through a monotone stack,
//! emitting a `0` for every push and a `1` for every pop, starting with a
//! super-root push and flushing the stack at the end. The buffer is then
//! reversed, which turns it into a balanced sequence of `2n + 2` bits where
//! value `i` owns the `(n - 1 - i)`-th zero.
//!
//! The depth of the stack just before value `m` is pushed is the minimum
//! depth seen while streaming `a..=b` when `m` is the leftmost minimum of
//! that range, and it is the last time that depth occurs. After reversal the
//! last occurrence becomes the first, so one leftmost `excess_rmq` answers
//! the query.

use std::cmp::Ordering;

use super::bp::BpVector;
use crate::binary::{Mappable, Visitor};
use crate::bits::BitVectorBuilder;
use crate::error::Result;

/// Range minimum queries over a sequence, in `2n + O(n)` bits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CartesianTree<'a> {
    bp: BpVector<'a>,
}

impl CartesianTree<'static> {
    /// Build over `values`; ties resolve to the leftmost index.
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Ord,
    {
        Self::with_less(values, |a, b| a.cmp(b) == Ordering::Less)
    }

    /// Build over `values` ordered by the strict comparator `less`.
    pub fn with_less<I, F>(values: I, mut less: F) -> Self
    where
        I: IntoIterator,
        F: FnMut(&I::Item, &I::Item) -> bool,
    {
        let iter = values.into_iter();
        let mut builder = BitVectorBuilder::new();
        builder.reserve(2 * (iter.size_hint().0 as u64 + 1));
        let mut stack: Vec<I::Item> = Vec::new();

        builder.push_back(false);
        for value in iter {
            while stack.last().map_or(false, |top| less(&value, top)) {
                stack.pop();
                builder.push_back(true);
            }
            stack.push(value);
            builder.push_back(false);
        }
        // Close what is left on the stack, then the super-root.
        builder.one_extend(stack.len() as u64 + 1);
        builder.reverse();

        tracing::debug!(values = (builder.len() - 2) / 2, "built cartesian tree");
        Self {
            bp: BpVector::new(builder.build(), false, true),
        }
    }
}

impl<'a> CartesianTree<'a> {
    /// Number of values.
    #[inline]
    pub fn size(&self) -> u64 {
        self.bp.size().saturating_sub(2) / 2
    }

    /// Returns true if the tree holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The underlying parenthesis vector.
    #[inline]
    pub fn bp(&self) -> &BpVector<'a> {
        &self.bp
    }

    /// Index of the leftmost minimum in `values[a..=b]`.
    pub fn rmq(&self, a: u64, b: u64) -> u64 {
        let n = self.size();
        debug_assert!(a <= b && b < n, "rmq({}, {}) over {} values", a, b, n);
        if a == b {
            return a;
        }
        let x = self.bp.select0(n - 1 - b) + 1;
        let y = self.bp.select0(n - 1 - a) + 1;
        let (w, _) = self.bp.excess_rmq(x, y);
        debug_assert!(w > 0 && !self.bp.get(w - 1));
        n - 1 - self.bp.rank0(w - 1)
    }
}

impl<'a> Mappable<'a> for CartesianTree<'a> {
    fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
        v.nested("bp", &mut self.bp)
    }
}
