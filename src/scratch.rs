#![forbid(unsafe_code)]

//! A bump arena for the temporary buffers of one decode call.
//!
//! Regions are handed out as [`Span`]s (offset and length) rather than
//! references, so several regions can be tracked at once without fighting the
//! borrow checker. Everything is released together when the [`Scratch`] drops.

use std::io::{Read, Seek};

use crate::{ImageResult, StreamReader};

/// A region of a [`Scratch`] arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Span {
  pub offset: usize,
  pub len: usize,
}
impl Span {
  #[inline]
  pub const fn end(self) -> usize {
    self.offset + self.len
  }

  /// Merges with a span that starts right where this one ends.
  #[inline]
  pub fn join(self, next: Span) -> Span {
    debug_assert_eq!(self.end(), next.offset);
    Span { offset: self.offset, len: self.len + next.len }
  }
}

#[derive(Debug, Default)]
pub(crate) struct Scratch {
  bytes: Vec<u8>,
}
impl Scratch {
  #[inline]
  pub fn new() -> Self {
    Self::default()
  }

  /// Reserves `len` zeroed bytes at the end of the arena.
  pub fn alloc(&mut self, len: usize) -> ImageResult<Span> {
    let offset = self.bytes.len();
    self.bytes.try_reserve(len)?;
    self.bytes.resize(offset + len, 0);
    Ok(Span { offset, len })
  }

  /// Reads `len` bytes from `reader` onto the end of the arena.
  pub fn read_from<R: Read + Seek>(&mut self, reader: &mut StreamReader<R>, len: usize) -> ImageResult<Span> {
    let offset = self.bytes.len();
    reader.read_to_vec(len, &mut self.bytes)?;
    Ok(Span { offset, len })
  }

  #[inline]
  pub fn get(&self, span: Span) -> &[u8] {
    &self.bytes[span.offset..span.end()]
  }

  #[inline]
  pub fn get_mut(&mut self, span: Span) -> &mut [u8] {
    &mut self.bytes[span.offset..span.end()]
  }

  /// Borrows one region for reading and another for writing. The spans must
  /// not overlap, `dst` coming after `src`.
  pub fn split(&mut self, src: Span, dst: Span) -> (&[u8], &mut [u8]) {
    assert!(src.end() <= dst.offset, "scratch spans overlap");
    let (low, high) = self.bytes.split_at_mut(dst.offset);
    (&low[src.offset..src.end()], &mut high[..dst.len])
  }
}

#[test]
fn test_scratch_spans() {
  let mut s = Scratch::new();
  let mut r = StreamReader::new(std::io::Cursor::new(b"abcde"), crate::Endian::Big).unwrap();
  let a = s.read_from(&mut r, 3).unwrap();
  let a = a.join(s.read_from(&mut r, 2).unwrap());
  assert!(s.read_from(&mut r, 1).is_err());
  let b = s.alloc(4).unwrap();
  assert_eq!(s.get(a), b"abcde");
  assert_eq!(s.get(b), &[0; 4]);
  let (src, dst) = s.split(a, b);
  dst.copy_from_slice(&src[1..]);
  assert_eq!(s.get(b), b"bcde");
  s.get_mut(a)[0] = b'z';
  assert_eq!(s.get(a)[0], b'z');
}
