//! Errors shared by every codec in the crate.

use std::collections::TryReserveError;
use std::num::TryFromIntError;

use thiserror::Error;

use crate::{AsciiArray, ScalarKind};

/// Result alias used throughout the crate.
pub type ImageResult<T> = Result<T, ImageError>;

/// Coarse classification of an [`ImageError`].
///
/// Callers wanting graceful feature detection can match on this instead of
/// every individual variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  /// The input bytes are not a valid file of the expected format.
  Malformed,
  /// The input is valid but uses a feature this crate does not implement.
  Unsupported,
  /// A destination was too small, or an index was out of range.
  Capacity,
  /// No codec is registered for the requested file extension.
  UnknownFormat,
  /// The underlying reader or writer failed.
  Io,
}

/// An error from the `imagelib` crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImageError {
  /// The data ended before a complete value could be read.
  #[error("unexpected end of data at byte {offset}")]
  UnexpectedEnd {
    /// Position of the read that failed.
    offset: u64,
  },

  /// The leading magic bytes did not match the format.
  #[error("bad {format} signature")]
  BadSignature {
    /// Name of the format that was expected.
    format: &'static str,
  },

  /// A PNG chunk had an invalid layout or payload.
  #[error("bad {chunk} chunk: {reason}")]
  BadChunk {
    /// The chunk type tag.
    chunk: AsciiArray<4>,
    /// What was wrong with it.
    reason: &'static str,
  },

  /// A chunk's stored CRC did not match the CRC of its type and payload.
  #[error("crc mismatch in {chunk} chunk: stored {stored:#010X}, computed {computed:#010X}")]
  CrcMismatch {
    /// The chunk type tag.
    chunk: AsciiArray<4>,
    /// CRC stored in the file.
    stored: u32,
    /// CRC computed from the bytes read.
    computed: u32,
  },

  /// A JPEG marker segment had an invalid layout or payload.
  #[error("bad marker 0xFF{marker:02X} at byte {offset}: {reason}")]
  BadMarker {
    /// Second byte of the marker.
    marker: u8,
    /// Offset of the marker within the source.
    offset: u64,
    /// What was wrong with it.
    reason: &'static str,
  },

  /// Entropy coded data contained a bit sequence with no Huffman code.
  #[error("invalid huffman code in entropy data")]
  InvalidHuffmanCode,

  /// Any other structural problem with the input.
  #[error("malformed {format} data: {reason}")]
  Malformed {
    /// Name of the format being decoded.
    format: &'static str,
    /// What was wrong with it.
    reason: &'static str,
  },

  /// The compressed stream could not be inflated.
  #[error("decompression failed: {0}")]
  Decompression(&'static str),

  /// The declared width and/or height of this image is 0.
  #[error("image width or height is zero")]
  WidthOrHeightZero,

  /// The input uses a feature this crate does not implement.
  #[error("unsupported: {0}")]
  Unsupported(&'static str),

  /// Conversion between integer and float channels was requested.
  #[error("cannot convert {from:?} channels to {to:?} channels")]
  ScalarMismatch {
    /// Scalar kind of the source.
    from: ScalarKind,
    /// Scalar kind of the destination.
    to: ScalarKind,
  },

  /// The destination image is smaller than the decoded image.
  #[error("destination is {got_width}x{got_height}, need at least {width}x{height}")]
  DestinationTooSmall {
    /// Width of the decoded image.
    width: u32,
    /// Height of the decoded image.
    height: u32,
    /// Width of the destination.
    got_width: u32,
    /// Height of the destination.
    got_height: u32,
  },

  /// The destination's channels hold fewer bits than the source's.
  #[error("destination bit depth {destination_bits} is lower than source bit depth {source_bits}")]
  BitDepthTooLow {
    /// Bits per channel in the source.
    source_bits: u8,
    /// Bits per channel in the destination.
    destination_bits: u8,
  },

  /// A byte buffer was too short for the requested operation.
  #[error("buffer holds {got} bytes, need {needed}")]
  BufferTooSmall {
    /// Bytes required.
    needed: usize,
    /// Bytes available.
    got: usize,
  },

  /// A coordinate or rectangle fell outside of an image view.
  #[error("{width}x{height} at ({x},{y}) is out of bounds of a {bound_width}x{bound_height} view")]
  OutOfBounds {
    /// Requested x.
    x: u32,
    /// Requested y.
    y: u32,
    /// Requested width.
    width: u32,
    /// Requested height.
    height: u32,
    /// Width of the view that was indexed.
    bound_width: u32,
    /// Height of the view that was indexed.
    bound_height: u32,
  },

  /// The image is larger than the configured [`Limits`](crate::Limits).
  #[error("image of {width}x{height} exceeds the decoding limits")]
  DimensionsTooLarge {
    /// Declared width.
    width: u32,
    /// Declared height.
    height: u32,
  },

  /// The allocator couldn't give us enough space.
  #[error("allocation failed")]
  Alloc,

  /// A checked math operation failed.
  #[error("arithmetic overflow in size calculation")]
  CheckedMath,

  /// No codec is registered for this file extension.
  #[error("no image format registered for extension {0:?}")]
  UnknownFormat(String),

  /// The underlying reader or writer failed.
  #[error(transparent)]
  Io(std::io::Error),
}

impl ImageError {
  /// Classifies this error.
  #[must_use]
  pub const fn kind(&self) -> ErrorKind {
    match self {
      Self::UnexpectedEnd { .. }
      | Self::BadSignature { .. }
      | Self::BadChunk { .. }
      | Self::CrcMismatch { .. }
      | Self::BadMarker { .. }
      | Self::InvalidHuffmanCode
      | Self::Malformed { .. }
      | Self::Decompression(_)
      | Self::WidthOrHeightZero => ErrorKind::Malformed,
      Self::Unsupported(_) | Self::ScalarMismatch { .. } => ErrorKind::Unsupported,
      Self::DestinationTooSmall { .. }
      | Self::BitDepthTooLow { .. }
      | Self::BufferTooSmall { .. }
      | Self::OutOfBounds { .. }
      | Self::DimensionsTooLarge { .. }
      | Self::Alloc
      | Self::CheckedMath => ErrorKind::Capacity,
      Self::UnknownFormat(_) => ErrorKind::UnknownFormat,
      Self::Io(_) => ErrorKind::Io,
    }
  }

  #[inline]
  pub(crate) const fn malformed(format: &'static str, reason: &'static str) -> Self {
    Self::Malformed { format, reason }
  }
}

impl From<std::io::Error> for ImageError {
  #[inline]
  fn from(e: std::io::Error) -> Self {
    // Offsets are filled in by the readers, which know their position.
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
      Self::UnexpectedEnd { offset: 0 }
    } else {
      Self::Io(e)
    }
  }
}
impl From<TryReserveError> for ImageError {
  #[inline]
  fn from(_: TryReserveError) -> Self {
    Self::Alloc
  }
}
impl From<TryFromIntError> for ImageError {
  #[inline]
  fn from(_: TryFromIntError) -> Self {
    Self::CheckedMath
  }
}

#[test]
fn test_error_kinds() {
  assert_eq!(ImageError::Unsupported("interlacing").kind(), ErrorKind::Unsupported);
  assert_eq!(ImageError::UnknownFormat(".gif".into()).kind(), ErrorKind::UnknownFormat);
  let chunk = AsciiArray(*b"IDAT");
  assert_eq!(ImageError::CrcMismatch { chunk, stored: 0, computed: 1 }.kind(), ErrorKind::Malformed);
  let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
  assert!(matches!(ImageError::from(eof), ImageError::UnexpectedEnd { .. }));
}
