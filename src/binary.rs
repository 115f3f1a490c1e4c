#![forbid(unsafe_code)]

//! Endian-aware sequential readers and writers.
//!
//! Two readers share the [`DataReader`] trait:
//!
//! * [`SliceReader`] walks a cursor over an in-memory byte slice.
//! * [`StreamReader`] wraps any `Read + Seek` and tracks the absolute byte
//!   position so that it can seek back to an offset it saw earlier.
//!
//! Both fail with [`ImageError::UnexpectedEnd`] when a read would go past the
//! end of the data. Nothing is ever silently truncated.

use std::io::{Read, Seek, SeekFrom, Write};

use bytemuck::{Pod, Zeroable};

use crate::{ImageError, ImageResult};

/// Byte order of multi-byte values in a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
  /// Most significant byte first (PNG, JPEG).
  Big,
  /// Least significant byte first (EXR).
  Little,
}
impl Endian {
  /// The byte order of the machine running this code.
  #[cfg(target_endian = "little")]
  pub const NATIVE: Self = Self::Little;
  /// The byte order of the machine running this code.
  #[cfg(target_endian = "big")]
  pub const NATIVE: Self = Self::Big;
}

macro_rules! impl_read_int {
  ($($(#[$m:meta])* $f:ident -> $t:ty),* $(,)?) => {
    $(
      $(#[$m])*
      #[inline]
      fn $f(&mut self) -> ImageResult<$t> {
        let bytes = self.read_array()?;
        Ok(match self.endian() {
          Endian::Big => <$t>::from_be_bytes(bytes),
          Endian::Little => <$t>::from_le_bytes(bytes),
        })
      }
    )*
  };
}

/// Sequential reads of primitive values.
///
/// Implementors supply the raw [`read`](DataReader::read), everything else is
/// built on top of it.
pub trait DataReader {
  /// Byte order that multi-byte reads assume.
  fn endian(&self) -> Endian;

  /// Number of bytes consumed so far (stream readers report the absolute
  /// position in the stream).
  fn position(&self) -> u64;

  /// Fills all of `buf`, or fails with `UnexpectedEnd`.
  fn read(&mut self, buf: &mut [u8]) -> ImageResult<()>;

  /// Reads exactly `N` bytes.
  #[inline]
  fn read_array<const N: usize>(&mut self) -> ImageResult<[u8; N]> {
    let mut a = [0_u8; N];
    self.read(&mut a)?;
    Ok(a)
  }

  /// Reads one plain-old-data value byte for byte.
  ///
  /// No byte swapping happens: use the [`U16BE`]/[`U32BE`] newtypes for
  /// fields that have a fixed byte order.
  #[inline]
  fn read_pod<T: Pod>(&mut self) -> ImageResult<T> {
    let mut t = T::zeroed();
    self.read(bytemuck::bytes_of_mut(&mut t))?;
    Ok(t)
  }

  /// Reads one byte.
  #[inline]
  fn read_u8(&mut self) -> ImageResult<u8> {
    let [b] = self.read_array()?;
    Ok(b)
  }

  /// Reads one signed byte.
  #[inline]
  fn read_i8(&mut self) -> ImageResult<i8> {
    let [b] = self.read_array()?;
    Ok(b as i8)
  }

  /// Reads one byte as a Latin-1 character.
  #[inline]
  fn read_char(&mut self) -> ImageResult<char> {
    self.read_u8().map(char::from)
  }

  impl_read_int! {
    /// Reads a `u16` in the source byte order.
    read_u16 -> u16,
    /// Reads a `u32` in the source byte order.
    read_u32 -> u32,
    /// Reads a `u64` in the source byte order.
    read_u64 -> u64,
    /// Reads an `i16` in the source byte order.
    read_i16 -> i16,
    /// Reads an `i32` in the source byte order.
    read_i32 -> i32,
    /// Reads an `i64` in the source byte order.
    read_i64 -> i64,
  }

  /// Reads an IEEE half float.
  #[inline]
  fn read_f16(&mut self) -> ImageResult<half::f16> {
    self.read_u16().map(half::f16::from_bits)
  }

  /// Reads an IEEE single float.
  #[inline]
  fn read_f32(&mut self) -> ImageResult<f32> {
    self.read_u32().map(f32::from_bits)
  }

  /// Reads an IEEE double float.
  #[inline]
  fn read_f64(&mut self) -> ImageResult<f64> {
    self.read_u64().map(f64::from_bits)
  }
}

/// A reader over an in-memory byte slice.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
  bytes: &'a [u8],
  cursor: usize,
  endian: Endian,
}
impl<'a> SliceReader<'a> {
  /// Makes a reader positioned at the start of `bytes`.
  #[inline]
  #[must_use]
  pub const fn new(bytes: &'a [u8], endian: Endian) -> Self {
    Self { bytes, cursor: 0, endian }
  }

  /// Bytes not yet consumed.
  #[inline]
  #[must_use]
  pub fn remaining(&self) -> usize {
    self.bytes.len() - self.cursor
  }

  /// If every byte has been consumed.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.remaining() == 0
  }

  /// The unconsumed bytes, without advancing.
  #[inline]
  #[must_use]
  pub fn rest(&self) -> &'a [u8] {
    &self.bytes[self.cursor..]
  }

  /// Borrows the next `n` bytes and advances past them.
  #[inline]
  pub fn take(&mut self, n: usize) -> ImageResult<&'a [u8]> {
    if n > self.remaining() {
      return Err(ImageError::UnexpectedEnd { offset: self.bytes.len() as u64 });
    }
    let out = &self.bytes[self.cursor..self.cursor + n];
    self.cursor += n;
    Ok(out)
  }

  /// Advances `n` bytes.
  #[inline]
  pub fn skip(&mut self, n: usize) -> ImageResult<()> {
    self.take(n).map(|_| ())
  }

  /// Reads up to (not including) `terminator`, then consumes the terminator.
  pub fn read_until(&mut self, terminator: u8) -> ImageResult<&'a [u8]> {
    match self.rest().iter().position(|&b| b == terminator) {
      Some(len) => {
        let out = self.take(len)?;
        self.cursor += 1;
        Ok(out)
      }
      None => Err(ImageError::UnexpectedEnd { offset: self.bytes.len() as u64 }),
    }
  }
}
impl DataReader for SliceReader<'_> {
  #[inline]
  fn endian(&self) -> Endian {
    self.endian
  }
  #[inline]
  fn position(&self) -> u64 {
    self.cursor as u64
  }
  #[inline]
  fn read(&mut self, buf: &mut [u8]) -> ImageResult<()> {
    buf.copy_from_slice(self.take(buf.len())?);
    Ok(())
  }
}

/// A reader over a seekable stream.
#[derive(Debug)]
pub struct StreamReader<R> {
  inner: R,
  position: u64,
  endian: Endian,
}
impl<R: Read + Seek> StreamReader<R> {
  /// Wraps `inner`, starting from whatever position it is already at.
  pub fn new(mut inner: R, endian: Endian) -> ImageResult<Self> {
    let position = inner.stream_position()?;
    Ok(Self { inner, position, endian })
  }

  /// Moves to an absolute byte offset.
  pub fn seek(&mut self, offset: u64) -> ImageResult<()> {
    self.position = self.inner.seek(SeekFrom::Start(offset))?;
    Ok(())
  }

  /// Moves forward `n` bytes without reading them.
  pub fn skip(&mut self, n: u64) -> ImageResult<()> {
    let delta = i64::try_from(n)?;
    self.position = self.inner.seek(SeekFrom::Current(delta))?;
    Ok(())
  }

  /// Appends bytes to `buf` up to (not including) `terminator`, consuming the
  /// terminator. Gives the number of bytes appended.
  pub fn read_until(&mut self, terminator: u8, buf: &mut Vec<u8>) -> ImageResult<usize> {
    let start = buf.len();
    loop {
      let b = self.read_u8()?;
      if b == terminator {
        return Ok(buf.len() - start);
      }
      buf.push(b);
    }
  }

  /// Reads everything left in the stream.
  pub fn read_to_end(&mut self, buf: &mut Vec<u8>) -> ImageResult<usize> {
    let n = self.inner.read_to_end(buf)?;
    self.position += n as u64;
    Ok(n)
  }

  /// Appends exactly `len` bytes to `buf`. The buffer only grows by what the
  /// stream actually delivers, so a bogus length can't force a big
  /// allocation up front.
  pub fn read_to_vec(&mut self, len: usize, buf: &mut Vec<u8>) -> ImageResult<()> {
    let n = (&mut self.inner).take(len as u64).read_to_end(buf)?;
    self.position += n as u64;
    if n < len {
      return Err(ImageError::UnexpectedEnd { offset: self.position });
    }
    Ok(())
  }

  /// Unwraps the inner stream.
  #[inline]
  pub fn into_inner(self) -> R {
    self.inner
  }
}
impl<R: Read + Seek> DataReader for StreamReader<R> {
  #[inline]
  fn endian(&self) -> Endian {
    self.endian
  }
  #[inline]
  fn position(&self) -> u64 {
    self.position
  }
  fn read(&mut self, buf: &mut [u8]) -> ImageResult<()> {
    match self.inner.read_exact(buf) {
      Ok(()) => {
        self.position += buf.len() as u64;
        Ok(())
      }
      Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
        Err(ImageError::UnexpectedEnd { offset: self.position })
      }
      Err(e) => Err(ImageError::Io(e)),
    }
  }
}

/// Endian-aware sequential writes.
#[derive(Debug)]
pub struct ByteWriter<W> {
  inner: W,
  written: u64,
  endian: Endian,
}
impl<W: Write> ByteWriter<W> {
  /// Wraps `inner`.
  #[inline]
  pub const fn new(inner: W, endian: Endian) -> Self {
    Self { inner, written: 0, endian }
  }

  /// Bytes written so far.
  #[inline]
  #[must_use]
  pub const fn written(&self) -> u64 {
    self.written
  }

  /// Writes raw bytes.
  pub fn write_bytes(&mut self, bytes: &[u8]) -> ImageResult<()> {
    self.inner.write_all(bytes)?;
    self.written += bytes.len() as u64;
    Ok(())
  }

  /// Writes one byte.
  #[inline]
  pub fn write_u8(&mut self, v: u8) -> ImageResult<()> {
    self.write_bytes(&[v])
  }

  /// Writes a `u16` in the configured byte order.
  #[inline]
  pub fn write_u16(&mut self, v: u16) -> ImageResult<()> {
    match self.endian {
      Endian::Big => self.write_bytes(&v.to_be_bytes()),
      Endian::Little => self.write_bytes(&v.to_le_bytes()),
    }
  }

  /// Writes a `u32` in the configured byte order.
  #[inline]
  pub fn write_u32(&mut self, v: u32) -> ImageResult<()> {
    match self.endian {
      Endian::Big => self.write_bytes(&v.to_be_bytes()),
      Endian::Little => self.write_bytes(&v.to_le_bytes()),
    }
  }

  /// Writes a `u64` in the configured byte order.
  #[inline]
  pub fn write_u64(&mut self, v: u64) -> ImageResult<()> {
    match self.endian {
      Endian::Big => self.write_bytes(&v.to_be_bytes()),
      Endian::Little => self.write_bytes(&v.to_le_bytes()),
    }
  }

  /// Writes an IEEE single float in the configured byte order.
  #[inline]
  pub fn write_f32(&mut self, v: f32) -> ImageResult<()> {
    self.write_u32(v.to_bits())
  }

  /// Flushes and unwraps the inner writer.
  pub fn into_inner(mut self) -> ImageResult<W> {
    self.inner.flush()?;
    Ok(self.inner)
  }
}

/// A `u16` stored big-endian, usable inside `Pod` header structs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Zeroable, Pod)]
#[repr(transparent)]
pub struct U16BE(pub [u8; 2]);
impl U16BE {
  /// Wraps a native value.
  #[inline]
  #[must_use]
  pub const fn new(v: u16) -> Self {
    Self(v.to_be_bytes())
  }
  /// The native value.
  #[inline]
  #[must_use]
  pub const fn get(self) -> u16 {
    u16::from_be_bytes(self.0)
  }
}

/// A `u32` stored big-endian, usable inside `Pod` header structs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Zeroable, Pod)]
#[repr(transparent)]
pub struct U32BE(pub [u8; 4]);
impl U32BE {
  /// Wraps a native value.
  #[inline]
  #[must_use]
  pub const fn new(v: u32) -> Self {
    Self(v.to_be_bytes())
  }
  /// The native value.
  #[inline]
  #[must_use]
  pub const fn get(self) -> u32 {
    u32::from_be_bytes(self.0)
  }
}
