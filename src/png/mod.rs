#![forbid(unsafe_code)]

//! Portable Network Graphics.
//!
//! * [Spec](https://www.w3.org/TR/png/)
//!
//! A PNG is an 8 byte signature followed by a series of chunks. Each chunk is
//! a big-endian `u32` length, a four letter ascii type tag, `length` bytes of
//! payload, and a CRC32 of the tag and payload. Every chunk's CRC is checked
//! during decoding, including chunks that are otherwise skipped.
//!
//! * `IHDR` must come first and describes the image.
//! * `IDAT` chunks, concatenated, form one zlib stream of *filtered*
//!   scanlines: each row starts with a filter type byte ([`PngFilter`]).
//! * `sRGB` and `iCCP` are read and reported in [`PngInfo`], but their color
//!   space information is not applied to the pixels.
//! * `IEND` ends the image. Unknown chunks are skipped.
//!
//! Interlaced images and palette images are rejected as
//! [`Unsupported`](crate::ErrorKind::Unsupported). Grayscale samples are
//! copied to all three of the red, green, and blue channels when decoding.
//! Grayscale at 1, 2, or 4 bits per sample is widened to 8 bits by bit
//! replication.
//!
//! Encoding writes `IHDR`, `sRGB`, a single `IDAT`, and `IEND`.

use std::io::{Read, Seek, Write};

use log::{debug, trace, warn};

use crate::{
  check_destination, read_pixel, write_pixel, AsciiArray, ByteWriter, Codec, DataReader, Endian, FormatConfig,
  ImageError, ImageMetadata, ImageResult, ImageView, ImageViewMut, Pixel, PixelFormat, ScalarKind, SliceReader,
  SrgbIntent, StreamReader, U32BE,
};
use crate::scratch::{Scratch, Span};
use crate::zlib::Zlib;

mod crc32;
pub(crate) use crc32::*;

mod chunk;
pub use chunk::*;

mod ihdr;
pub use ihdr::*;

mod filter;
pub use filter::*;

mod decode;
mod encode;

#[cfg(test)]
mod tests;

/// The first eight bytes of every PNG.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// An embedded ICC color profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IccProfile {
  /// Profile name (Latin-1).
  pub name: String,
  /// The decompressed profile bytes.
  pub data: Vec<u8>,
}

/// What a PNG declares about itself, beyond its pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngInfo {
  /// The image header.
  pub ihdr: Ihdr,
  /// Rendering intent from an `sRGB` chunk.
  pub srgb: Option<SrgbIntent>,
  /// Profile from an `iCCP` chunk.
  pub icc_profile: Option<IccProfile>,
}

/// How the encoder picks a filter for each row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterStrategy {
  /// `Sub` for the first row and `Paeth` for every other row.
  #[default]
  SubThenPaeth,
  /// The same filter on every row.
  Uniform(PngFilter),
}
impl FilterStrategy {
  /// The filter used on row `y`.
  #[inline]
  #[must_use]
  pub const fn filter_for_row(self, y: usize) -> PngFilter {
    match self {
      Self::SubThenPaeth if y == 0 => PngFilter::Sub,
      Self::SubThenPaeth => PngFilter::Paeth,
      Self::Uniform(f) => f,
    }
  }
}

/// PNG encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PngConfig {
  /// Bits per sample: 8 or 16.
  pub bit_depth: u8,
  /// Samples to store. Grayscale stores the red channel.
  pub color_type: PngColorType,
  /// zlib level, `0..=10`.
  pub compression_level: u8,
  /// Row filter selection.
  pub filter: FilterStrategy,
  /// Intent written to the `sRGB` chunk.
  pub srgb_intent: SrgbIntent,
}
impl Default for PngConfig {
  #[inline]
  fn default() -> Self {
    Self {
      bit_depth: 8,
      color_type: PngColorType::RGBA,
      compression_level: 6,
      filter: FilterStrategy::default(),
      srgb_intent: SrgbIntent::Perceptual,
    }
  }
}
impl FormatConfig for PngConfig {
  fn from_pixel_format(format: PixelFormat) -> ImageResult<Self> {
    if format.scalar != ScalarKind::Integer {
      return Err(ImageError::ScalarMismatch { from: format.scalar, to: ScalarKind::Integer });
    }
    let bit_depth = match format.bytes_per_channel {
      1 => 8,
      2 => 16,
      _ => return Err(ImageError::Unsupported("PNG channels must be 8 or 16 bits")),
    };
    let color_type = PngColorType::from_channel_count(format.channels)
      .ok_or(ImageError::Unsupported("PNG pixels have 1 to 4 channels"))?;
    Ok(Self { bit_depth, color_type, ..Self::default() })
  }
}
impl PngConfig {
  fn validate(&self) -> ImageResult<()> {
    if self.color_type == PngColorType::Index {
      return Err(ImageError::Unsupported("indexed color PNG"));
    }
    if !matches!(self.bit_depth, 8 | 16) || !self.color_type.allows_bit_depth(self.bit_depth) {
      return Err(ImageError::Unsupported("PNG encoding supports 8 and 16 bit samples"));
    }
    Ok(())
  }
}

pub(crate) const fn srgb_intent_from_byte(b: u8) -> Option<SrgbIntent> {
  Some(match b {
    0 => SrgbIntent::Perceptual,
    1 => SrgbIntent::RelativeColorimetric,
    2 => SrgbIntent::Saturation,
    3 => SrgbIntent::AbsoluteColorimetric,
    _ => return None,
  })
}

pub(crate) const fn srgb_intent_to_byte(intent: SrgbIntent) -> u8 {
  match intent {
    SrgbIntent::Perceptual => 0,
    SrgbIntent::RelativeColorimetric => 1,
    SrgbIntent::Saturation => 2,
    SrgbIntent::AbsoluteColorimetric => 3,
  }
}

/// The PNG codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;
impl PngCodec {
  /// Reads every chunk before the image data and reports what it declares.
  pub fn read_info<R: Read + Seek>(&self, source: &mut R) -> ImageResult<PngInfo> {
    let mut reader = StreamReader::new(source, Endian::Big)?;
    let stream = decode::read_chunks(&mut reader, &mut Scratch::new(), decode::ReadUntil::ImageData)?;
    stream.into_info()
  }
}
impl Codec for PngCodec {
  type Config = PngConfig;

  fn metadata<R: Read + Seek>(&self, source: &mut R) -> ImageResult<ImageMetadata> {
    let mut reader = StreamReader::new(source, Endian::Big)?;
    let stream = decode::read_chunks(&mut reader, &mut Scratch::new(), decode::ReadUntil::Header)?;
    Ok(stream.into_info()?.ihdr.metadata())
  }

  fn decode<R: Read + Seek, P: Pixel>(&self, source: &mut R, dst: &mut ImageViewMut<'_, P>) -> ImageResult<()> {
    decode::decode_png(source, dst).map(|_| ())
  }

  fn encode<W: Write, P: Pixel>(&self, sink: &mut W, src: &ImageView<'_, P>, config: &PngConfig) -> ImageResult<()> {
    encode::encode_png(sink, src, config)
  }
}
