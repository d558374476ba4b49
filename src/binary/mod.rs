//! Zero-copy persistence: freeze structures to bytes and map them back.
//!
//! Every persistable structure implements [`Mappable`], which forwards its
//! fields in a fixed order to a [`Visitor`]. Three visitors replay the same
//! traversal:
//!
//! - [`Freezer`] writes the fields to an [`std::io::Write`] sink
//! - [`Mapper`] reads them back from a byte region, binding vectors as
//!   borrowed views into the region whenever alignment allows
//! - [`Sizer`] computes the byte length `freeze` would produce, optionally as
//!   a per-field [`SizeNode`] tree
//!
//! # Layout
//!
//! ```text
//! u64 flags header
//! per scalar:  raw native bytes, zero padding to a 4-byte boundary
//! per vector:  u64 element count, raw element bytes, zero padding to 4
//! nested:      the nested structure's fields, no separator
//! ```
//!
//! The format carries no schema or version: the field order of `visit` *is*
//! the layout, so it must never change for files that are already written.
//! Bytes are native-endian.
//!
//! # Example
//!
//! ```
//! use succinct_mapped::binary::{self, MapFlags};
//! use succinct_mapped::bits::BitVector;
//!
//! let mut bv = BitVector::from_bits([true, false, true, true]);
//! let mut bytes = Vec::new();
//! let written = binary::freeze(&mut bv, &mut bytes, 0).unwrap();
//! assert_eq!(written, binary::size_of(&mut bv));
//!
//! let mapped: BitVector<'_> = binary::map(&bytes, MapFlags::NONE).unwrap();
//! assert_eq!(mapped.size(), 4);
//! assert!(mapped.get(3));
//! ```

#[cfg(feature = "mmap")]
pub mod mmap;

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::{BitOr, Deref};
use std::path::Path;

use bytemuck::{Pod, PodCastError};

use crate::error::{Error, Result};

/// Size of the flags header at the start of every frozen region.
pub const HEADER_SIZE: usize = 8;

/// Alignment of every field boundary in the frozen layout.
const FIELD_ALIGN: usize = 4;

#[inline]
fn padding_for(len: usize) -> usize {
    (FIELD_ALIGN - len % FIELD_ALIGN) % FIELD_ALIGN
}

// =============================================================================
// MappableVector
// =============================================================================

/// A vector that either owns its elements or borrows them from a mapped
/// region.
///
/// Built structures hold `Owned` vectors. [`map`] produces `Mapped` views
/// that point directly into the region, so the region must outlive every
/// structure mapped from it; the lifetime `'a` enforces this.
pub enum MappableVector<'a, T: Pod> {
    /// Heap storage produced by a builder.
    Owned(Vec<T>),
    /// Borrowed view into a mapped region.
    Mapped(&'a [T]),
}

impl<'a, T: Pod> MappableVector<'a, T> {
    /// Create an empty owned vector.
    pub fn new() -> Self {
        MappableVector::Owned(Vec::new())
    }

    /// Returns the elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match self {
            MappableVector::Owned(v) => v,
            MappableVector::Mapped(s) => s,
        }
    }

    /// Returns true if the elements live in a mapped region.
    pub fn is_mapped(&self) -> bool {
        matches!(self, MappableVector::Mapped(_))
    }

    /// Convert into an owned vector, copying mapped elements.
    pub fn into_owned(self) -> Vec<T> {
        match self {
            MappableVector::Owned(v) => v,
            MappableVector::Mapped(s) => s.to_vec(),
        }
    }

    /// Payload size in bytes, excluding the length prefix.
    pub fn payload_bytes(&self) -> usize {
        std::mem::size_of_val(self.as_slice())
    }
}

impl<T: Pod> Default for MappableVector<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> Deref for MappableVector<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod> From<Vec<T>> for MappableVector<'_, T> {
    fn from(v: Vec<T>) -> Self {
        MappableVector::Owned(v)
    }
}

impl<'a, T: Pod> From<&'a [T]> for MappableVector<'a, T> {
    fn from(s: &'a [T]) -> Self {
        MappableVector::Mapped(s)
    }
}

impl<T: Pod> Clone for MappableVector<'_, T> {
    fn clone(&self) -> Self {
        match self {
            MappableVector::Owned(v) => MappableVector::Owned(v.clone()),
            MappableVector::Mapped(s) => MappableVector::Mapped(s),
        }
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for MappableVector<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_mapped() { "Mapped" } else { "Owned" };
        f.debug_struct(kind).field("len", &self.len()).finish()
    }
}

impl<T: Pod + PartialEq> PartialEq for MappableVector<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Pod + Eq> Eq for MappableVector<'_, T> {}

// =============================================================================
// Protocol
// =============================================================================

/// A structure that can describe its fields to a [`Visitor`].
///
/// The order of the calls made in `visit` defines the binary layout. It is
/// shared by freeze, map and sizeof, so an implementation must make the same
/// calls regardless of which visitor it is given.
///
/// `visit` takes `&mut self` because [`Mapper`] fills the fields in place.
/// [`Freezer`] and [`Sizer`] leave them untouched.
pub trait Mappable<'a> {
    /// Forward every persisted field to `visitor`, in layout order.
    fn visit<V: Visitor<'a>>(&mut self, visitor: &mut V) -> Result<()>;
}

/// Receives the fields of a [`Mappable`] structure.
pub trait Visitor<'a>: Sized {
    /// Visit a plain-old-data scalar.
    fn scalar<T: Pod>(&mut self, name: &'static str, value: &mut T) -> Result<()>;

    /// Visit a vector of plain-old-data elements.
    fn vector<T: Pod>(&mut self, name: &'static str, value: &mut MappableVector<'a, T>)
        -> Result<()>;

    /// Visit a nested structure. The default recurses into its fields.
    fn nested<M: Mappable<'a>>(&mut self, name: &'static str, value: &mut M) -> Result<()> {
        let _ = name;
        value.visit(self)
    }
}

/// Flags controlling [`map`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MapFlags(u32);

impl MapFlags {
    /// No special behavior.
    pub const NONE: MapFlags = MapFlags(0);

    /// Sequentially read the whole region before mapping, so that later
    /// queries do not page-fault.
    pub const WARMUP: MapFlags = MapFlags(1);

    /// Returns true if every flag in `other` is set in `self`.
    #[inline]
    pub fn contains(self, other: MapFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw flag bits.
    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for MapFlags {
    type Output = MapFlags;

    fn bitor(self, rhs: MapFlags) -> MapFlags {
        MapFlags(self.0 | rhs.0)
    }
}

// =============================================================================
// Freezer
// =============================================================================

/// Visitor that writes fields to a byte sink.
pub struct Freezer<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> Freezer<W> {
    /// Create a freezer and write the flags header.
    pub fn new(mut writer: W, flags: u64) -> Result<Self> {
        writer.write_all(&flags.to_ne_bytes())?;
        Ok(Self {
            writer,
            written: HEADER_SIZE,
        })
    }

    /// Number of bytes written so far, header included.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_padded(&mut self, bytes: &[u8]) -> Result<()> {
        const ZEROS: [u8; FIELD_ALIGN] = [0; FIELD_ALIGN];
        self.writer.write_all(bytes)?;
        let pad = padding_for(bytes.len());
        self.writer.write_all(&ZEROS[..pad])?;
        self.written += bytes.len() + pad;
        Ok(())
    }
}

impl<'a, W: Write> Visitor<'a> for Freezer<W> {
    fn scalar<T: Pod>(&mut self, _name: &'static str, value: &mut T) -> Result<()> {
        self.write_padded(bytemuck::bytes_of(value))
    }

    fn vector<T: Pod>(
        &mut self,
        _name: &'static str,
        value: &mut MappableVector<'a, T>,
    ) -> Result<()> {
        let count = value.len() as u64;
        self.writer.write_all(&count.to_ne_bytes())?;
        self.written += 8;
        self.write_padded(bytemuck::cast_slice(value.as_slice()))
    }
}

// =============================================================================
// Mapper
// =============================================================================

/// Visitor that fills fields from a byte region.
///
/// Vectors whose payload is suitably aligned in memory are bound as borrowed
/// views. A misaligned payload (for example a `Vec<u8>` buffer that happens
/// to start at an odd address) is copied into an owned vector instead.
pub struct Mapper<'a> {
    data: &'a [u8],
    offset: usize,
    copied: usize,
}

impl<'a> Mapper<'a> {
    /// Create a mapper over `data` and consume the flags header.
    pub fn new(data: &'a [u8]) -> Result<(Self, u64)> {
        let mut mapper = Self {
            data,
            offset: 0,
            copied: 0,
        };
        let header = mapper.take(HEADER_SIZE)?;
        let flags: u64 = bytemuck::pod_read_unaligned(header);
        Ok((mapper, flags))
    }

    /// Cursor position in bytes from the start of the region.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of vectors that had to be copied because of misalignment.
    pub fn copied_vectors(&self) -> usize {
        self.copied
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(needed)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::Truncated {
                offset: self.offset,
                needed,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn take_padded(&mut self, needed: usize) -> Result<&'a [u8]> {
        let bytes = self.take(needed)?;
        self.take(padding_for(needed))?;
        Ok(bytes)
    }
}

impl<'a> Visitor<'a> for Mapper<'a> {
    fn scalar<T: Pod>(&mut self, _name: &'static str, value: &mut T) -> Result<()> {
        let bytes = self.take_padded(std::mem::size_of::<T>())?;
        *value = bytemuck::pod_read_unaligned(bytes);
        Ok(())
    }

    fn vector<T: Pod>(
        &mut self,
        name: &'static str,
        value: &mut MappableVector<'a, T>,
    ) -> Result<()> {
        let count: u64 = bytemuck::pod_read_unaligned(self.take(8)?);
        let needed = usize::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(std::mem::size_of::<T>()))
            .ok_or(Error::LengthOverflow { field: name, count })?;
        let bytes = self.take_padded(needed)?;

        *value = match bytemuck::try_cast_slice::<u8, T>(bytes) {
            Ok(slice) => MappableVector::Mapped(slice),
            Err(PodCastError::TargetAlignmentGreaterAndInputNotAligned) => {
                if count > 0 {
                    tracing::debug!(
                        field = name,
                        offset = self.offset - needed - padding_for(needed),
                        "misaligned vector payload, copying"
                    );
                    self.copied += 1;
                }
                MappableVector::Owned(bytemuck::pod_collect_to_vec(bytes))
            }
            // Length is an exact multiple of the element size, so alignment
            // is the only cast failure that can occur.
            Err(_) => MappableVector::Owned(bytemuck::pod_collect_to_vec(bytes)),
        };
        Ok(())
    }
}

// =============================================================================
// Sizer
// =============================================================================

/// A named node in a size breakdown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SizeNode {
    /// Field name, or the caller-supplied name for the root.
    pub name: String,
    /// Total bytes of this field including its children.
    pub size: usize,
    /// Breakdown of vectors and nested structures.
    pub children: Vec<SizeNode>,
}

impl SizeNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            size: 0,
            children: Vec::new(),
        }
    }

    /// Render the tree, one field per line, indented by depth.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        use std::fmt::Write as _;
        let _ = writeln!(out, "{:indent$}{}: {} bytes", "", self.name, self.size, indent = depth * 2);
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

/// Visitor that computes the frozen size of a structure.
pub struct Sizer {
    track: bool,
    stack: Vec<SizeNode>,
}

impl Sizer {
    /// Create a sizer; `track` enables the per-field breakdown.
    pub fn new(track: bool) -> Self {
        let mut root = SizeNode::new("");
        root.size = HEADER_SIZE;
        Self {
            track,
            stack: vec![root],
        }
    }

    /// Total bytes accounted so far, header included.
    pub fn total(&self) -> usize {
        self.stack.iter().map(|n| n.size).sum()
    }

    fn add(&mut self, name: &'static str, size: usize, leaf: bool) {
        if let Some(top) = self.stack.last_mut() {
            top.size += size;
            if self.track && leaf {
                top.children.push(SizeNode {
                    name: name.to_string(),
                    size,
                    children: Vec::new(),
                });
            }
        }
    }

    fn into_root(mut self) -> SizeNode {
        while self.stack.len() > 1 {
            self.pop_nested();
        }
        self.stack.pop().unwrap_or_default()
    }

    fn pop_nested(&mut self) {
        if let Some(node) = self.stack.pop() {
            if let Some(parent) = self.stack.last_mut() {
                parent.size += node.size;
                if self.track {
                    parent.children.push(node);
                }
            }
        }
    }
}

impl<'a> Visitor<'a> for Sizer {
    fn scalar<T: Pod>(&mut self, _name: &'static str, _value: &mut T) -> Result<()> {
        let n = std::mem::size_of::<T>();
        self.add("", n + padding_for(n), false);
        Ok(())
    }

    fn vector<T: Pod>(
        &mut self,
        name: &'static str,
        value: &mut MappableVector<'a, T>,
    ) -> Result<()> {
        let n = value.payload_bytes();
        self.add(name, 8 + n + padding_for(n), true);
        Ok(())
    }

    fn nested<M: Mappable<'a>>(&mut self, name: &'static str, value: &mut M) -> Result<()> {
        self.stack.push(SizeNode::new(name));
        let result = value.visit(self);
        self.pop_nested();
        result
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Write `value` to `writer`, returning the number of bytes written.
///
/// `flags` is stored verbatim in the header; it is reserved and normally 0.
pub fn freeze<'a, T, W>(value: &mut T, writer: W, flags: u64) -> Result<usize>
where
    T: Mappable<'a>,
    W: Write,
{
    let mut freezer = Freezer::new(writer, flags)?;
    value.visit(&mut freezer)?;
    let written = freezer.written();
    freezer.finish()?;
    tracing::debug!(bytes = written, "froze structure");
    Ok(written)
}

/// Freeze `value` into a new file at `path`.
///
/// A failed freeze leaves a partial file behind.
pub fn freeze_to_file<'a, T, P>(value: &mut T, path: P, flags: u64) -> Result<usize>
where
    T: Mappable<'a>,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let written = freeze(value, BufWriter::new(file), flags)?;
    tracing::debug!(path = %path.as_ref().display(), bytes = written, "wrote frozen file");
    Ok(written)
}

/// Map a structure from a frozen region.
///
/// The returned value borrows from `data`. Trailing bytes after the last
/// field are ignored.
pub fn map<'a, T>(data: &'a [u8], flags: MapFlags) -> Result<T>
where
    T: Mappable<'a> + Default,
{
    if flags.contains(MapFlags::WARMUP) {
        warmup(data);
    }
    let (mut mapper, header) = Mapper::new(data)?;
    let mut value = T::default();
    value.visit(&mut mapper)?;
    tracing::debug!(
        bytes = mapper.offset(),
        region = data.len(),
        header,
        copied = mapper.copied_vectors(),
        "mapped structure"
    );
    Ok(value)
}

/// Number of bytes [`freeze`] would write for `value`.
pub fn size_of<'a, T: Mappable<'a>>(value: &mut T) -> usize {
    let mut sizer = Sizer::new(false);
    // Sizer never fails; only a custom visit body could.
    let _ = value.visit(&mut sizer);
    sizer.total()
}

/// Size breakdown of `value`, rooted at a node called `name`.
pub fn size_tree<'a, T: Mappable<'a>>(value: &mut T, name: &str) -> SizeNode {
    let mut sizer = Sizer::new(true);
    let _ = value.visit(&mut sizer);
    let mut root = sizer.into_root();
    root.name = name.to_string();
    root
}

const WARMUP_STRIDE: usize = 4096;

/// Touch every page of `data` in order.
fn warmup(data: &[u8]) {
    let mut acc = 0u8;
    for chunk in data.chunks(WARMUP_STRIDE) {
        acc ^= chunk[0];
    }
    std::hint::black_box(acc);
    tracing::debug!(bytes = data.len(), "warmed up region");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Pair<'a> {
        tag: u8,
        count: u64,
        words: MappableVector<'a, u64>,
        shorts: MappableVector<'a, u16>,
    }

    impl<'a> Mappable<'a> for Pair<'a> {
        fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
            v.scalar("tag", &mut self.tag)?;
            v.scalar("count", &mut self.count)?;
            v.vector("words", &mut self.words)?;
            v.vector("shorts", &mut self.shorts)
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Outer<'a> {
        inner: Pair<'a>,
        tail: MappableVector<'a, u32>,
    }

    impl<'a> Mappable<'a> for Outer<'a> {
        fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
            v.nested("inner", &mut self.inner)?;
            v.vector("tail", &mut self.tail)
        }
    }

    fn sample() -> Outer<'static> {
        Outer {
            inner: Pair {
                tag: 7,
                count: 3,
                words: vec![1, u64::MAX, 42].into(),
                shorts: vec![5, 6, 7].into(),
            },
            tail: vec![9, 10].into(),
        }
    }

    fn aligned(bytes: &[u8]) -> Vec<u64> {
        let mut words = vec![0u64; bytes.len().div_ceil(8)];
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..bytes.len()].copy_from_slice(bytes);
        words
    }

    #[test]
    fn test_layout() {
        let mut value = sample();
        let mut bytes = Vec::new();
        let written = freeze(&mut value, &mut bytes, 0).unwrap();
        // header 8, tag 1+3, count 8, words 8+24, shorts 8+6+2, tail 8+8
        assert_eq!(written, 8 + 4 + 8 + 32 + 16 + 16);
        assert_eq!(bytes.len(), written);
        assert_eq!(&bytes[8..12], &[7, 0, 0, 0]);
        assert_eq!(size_of(&mut value), written);
        assert_eq!(size_of(&mut value), written);
    }

    #[test]
    fn test_round_trip_aligned_region() {
        let mut value = sample();
        let mut bytes = Vec::new();
        freeze(&mut value, &mut bytes, 0).unwrap();
        let words = aligned(&bytes);
        let region = &bytemuck::cast_slice::<u64, u8>(&words)[..bytes.len()];

        let mapped: Outer<'_> = map(region, MapFlags::WARMUP).unwrap();
        assert_eq!(mapped, value);
        assert!(mapped.inner.shorts.is_mapped());
        assert!(mapped.tail.is_mapped());

        // The u8 tag is padded to 4 bytes, which leaves `words` at offset 28.
        let (mut mapper, _) = Mapper::new(region).unwrap();
        let mut mapped = Outer::default();
        mapped.visit(&mut mapper).unwrap();
        assert!(!mapped.inner.words.is_mapped());
        assert_eq!(mapper.copied_vectors(), 1);
        assert_eq!(mapped.inner.words.as_slice(), &[1, u64::MAX, 42]);
    }

    #[test]
    fn test_u64_scalars_keep_vectors_mapped() {
        #[derive(Default, Debug, PartialEq)]
        struct Wide<'a> {
            tag: u64,
            words: MappableVector<'a, u64>,
            shorts: MappableVector<'a, u16>,
            more: MappableVector<'a, u64>,
        }

        impl<'a> Mappable<'a> for Wide<'a> {
            fn visit<V: Visitor<'a>>(&mut self, v: &mut V) -> Result<()> {
                v.scalar("tag", &mut self.tag)?;
                v.vector("words", &mut self.words)?;
                v.vector("shorts", &mut self.shorts)?;
                v.vector("more", &mut self.more)
            }
        }

        let mut value = Wide {
            tag: 7,
            words: vec![1, 2, 3].into(),
            shorts: vec![4, 5, 6, 7].into(),
            more: vec![u64::MAX].into(),
        };
        let mut bytes = Vec::new();
        freeze(&mut value, &mut bytes, 0).unwrap();
        let words = aligned(&bytes);
        let region = &bytemuck::cast_slice::<u64, u8>(&words)[..bytes.len()];

        let (mut mapper, _) = Mapper::new(region).unwrap();
        let mut mapped = Wide::default();
        mapped.visit(&mut mapper).unwrap();
        assert_eq!(mapped, value);
        assert_eq!(mapper.copied_vectors(), 0);
        assert!(mapped.words.is_mapped());
        assert!(mapped.more.is_mapped());
    }

    #[test]
    fn test_misaligned_copies() {
        let mut value = sample();
        let mut bytes = Vec::new();
        freeze(&mut value, &mut bytes, 0).unwrap();
        let words = aligned(&[&[0u8][..], &bytes[..]].concat());
        let region = &bytemuck::cast_slice::<u64, u8>(&words)[1..bytes.len() + 1];

        let mapped: Outer<'_> = map(region, MapFlags::NONE).unwrap();
        assert_eq!(mapped, value);
        assert!(!mapped.inner.words.is_mapped());
    }

    #[test]
    fn test_truncated() {
        let mut value = sample();
        let mut bytes = Vec::new();
        freeze(&mut value, &mut bytes, 0).unwrap();
        for cut in [0, 4, 12, bytes.len() - 1] {
            let err = map::<Outer<'_>>(&bytes[..cut], MapFlags::NONE).unwrap_err();
            assert!(matches!(err, Error::Truncated { .. }), "cut={}", cut);
        }
    }

    #[test]
    fn test_size_tree() {
        let mut value = sample();
        let tree = size_tree(&mut value, "outer");
        assert_eq!(tree.name, "outer");
        assert_eq!(tree.size, size_of(&mut value));
        let names: Vec<_> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["inner", "tail"]);
        assert_eq!(tree.children[0].size, 4 + 8 + 32 + 16);
        assert_eq!(tree.children[0].children.len(), 2);
        assert!(tree.render().contains("words: 32 bytes"));
    }

    #[test]
    fn test_map_flags() {
        let both = MapFlags::NONE | MapFlags::WARMUP;
        assert!(both.contains(MapFlags::WARMUP));
        assert!(!MapFlags::NONE.contains(MapFlags::WARMUP));
    }
}
