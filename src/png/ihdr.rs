use bytemuck::{Pod, Zeroable};

use super::*;

/// Pixel layout of a PNG, as declared in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Grayscale.
  Y = 0,
  /// Red, green, blue.
  RGB = 2,
  /// Palette indexes.
  Index = 3,
  /// Grayscale and alpha.
  YA = 4,
  /// Red, green, blue, alpha.
  RGBA = 6,
}
impl PngColorType {
  /// Samples per pixel.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> u8 {
    match self {
      Self::Y | Self::Index => 1,
      Self::YA => 2,
      Self::RGB => 3,
      Self::RGBA => 4,
    }
  }

  /// The color type that stores `channels` samples per pixel (palettes never
  /// are picked).
  #[inline]
  #[must_use]
  pub const fn from_channel_count(channels: u8) -> Option<Self> {
    match channels {
      1 => Some(Self::Y),
      2 => Some(Self::YA),
      3 => Some(Self::RGB),
      4 => Some(Self::RGBA),
      _ => None,
    }
  }

  /// If `bit_depth` is legal for this color type.
  #[inline]
  #[must_use]
  pub const fn allows_bit_depth(self, bit_depth: u8) -> bool {
    match self {
      Self::Y => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
      Self::Index => matches!(bit_depth, 1 | 2 | 4 | 8),
      Self::RGB | Self::YA | Self::RGBA => matches!(bit_depth, 8 | 16),
    }
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = ImageError;
  #[inline]
  fn try_from(value: u8) -> ImageResult<Self> {
    Ok(match value {
      0 => Self::Y,
      2 => Self::RGB,
      3 => Self::Index,
      4 => Self::YA,
      6 => Self::RGBA,
      _ => return Err(ImageError::BadChunk { chunk: IHDR, reason: "unknown color type" }),
    })
  }
}

/// The 13 byte `IHDR` payload, exactly as stored.
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
#[repr(C)]
pub(crate) struct RawIhdr {
  width: U32BE,
  height: U32BE,
  bit_depth: u8,
  color_type: u8,
  compression_method: u8,
  filter_method: u8,
  interlace_method: u8,
}

/// Image header: the facts needed to decode the pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ihdr {
  /// Width in pixels.
  pub width: u32,
  /// Height in pixels.
  pub height: u32,
  /// Bits per sample.
  pub bit_depth: u8,
  /// Pixel layout.
  pub color_type: PngColorType,
}
impl Ihdr {
  /// Parses and validates an `IHDR` payload.
  pub fn parse(payload: &[u8]) -> ImageResult<Self> {
    if payload.len() != core::mem::size_of::<RawIhdr>() {
      return Err(ImageError::BadChunk { chunk: IHDR, reason: "length must be 13" });
    }
    let raw: RawIhdr = SliceReader::new(payload, Endian::Big).read_pod()?;
    let (width, height) = (raw.width.get(), raw.height.get());
    if width == 0 || height == 0 {
      return Err(ImageError::WidthOrHeightZero);
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
      return Err(ImageError::BadChunk { chunk: IHDR, reason: "dimension exceeds 2^31-1" });
    }
    let color_type = PngColorType::try_from(raw.color_type)?;
    if !color_type.allows_bit_depth(raw.bit_depth) {
      return Err(ImageError::BadChunk { chunk: IHDR, reason: "illegal color type and bit depth combination" });
    }
    if color_type == PngColorType::Index {
      return Err(ImageError::Unsupported("indexed color PNG"));
    }
    if raw.compression_method != 0 {
      return Err(ImageError::BadChunk { chunk: IHDR, reason: "unknown compression method" });
    }
    if raw.filter_method != 0 {
      return Err(ImageError::BadChunk { chunk: IHDR, reason: "unknown filter method" });
    }
    match raw.interlace_method {
      0 => (),
      1 => return Err(ImageError::Unsupported("interlaced PNG")),
      _ => return Err(ImageError::BadChunk { chunk: IHDR, reason: "unknown interlace method" }),
    }
    Ok(Self { width, height, bit_depth: raw.bit_depth, color_type })
  }

  /// The payload bytes for this header (never interlaced).
  #[must_use]
  pub(crate) fn to_raw(self) -> RawIhdr {
    RawIhdr {
      width: U32BE::new(self.width),
      height: U32BE::new(self.height),
      bit_depth: self.bit_depth,
      color_type: self.color_type as u8,
      compression_method: 0,
      filter_method: 0,
      interlace_method: 0,
    }
  }

  /// Bits used by one pixel.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(self) -> usize {
    self.color_type.channel_count() as usize * self.bit_depth as usize
  }

  /// Byte distance to the "left" neighbour while filtering.
  #[inline]
  #[must_use]
  pub const fn filter_bpp(self) -> usize {
    let bytes = self.bits_per_pixel() / 8;
    if bytes == 0 {
      1
    } else {
      bytes
    }
  }

  /// Bytes in one row, not counting the filter type byte.
  #[inline]
  #[must_use]
  pub const fn row_bytes(self) -> usize {
    (self.width as usize * self.bits_per_pixel() + 7) / 8
  }

  /// Bytes of filtered data the zlib stream must inflate to.
  pub fn filtered_len(self) -> ImageResult<usize> {
    (self.row_bytes() + 1).checked_mul(self.height as usize).ok_or(ImageError::CheckedMath)
  }

  /// Bits per channel once sub-byte samples are widened to 8.
  #[inline]
  #[must_use]
  pub const fn decoded_bit_depth(self) -> u8 {
    if self.bit_depth < 8 {
      8
    } else {
      self.bit_depth
    }
  }

  /// Metadata for this header.
  #[inline]
  #[must_use]
  pub const fn metadata(self) -> ImageMetadata {
    ImageMetadata {
      channels: self.color_type.channel_count(),
      bit_depth: self.bit_depth,
      width: self.width,
      height: self.height,
      depth: 1,
    }
  }
}

const MAX_DIMENSION: u32 = i32::MAX as u32;

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  fn raw(width: u32, height: u32, bit_depth: u8, color_type: u8, interlace: u8) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&width.to_be_bytes());
    v.extend_from_slice(&height.to_be_bytes());
    v.extend_from_slice(&[bit_depth, color_type, 0, 0, interlace]);
    v
  }

  #[test]
  fn test_ihdr_parse() {
    let h = Ihdr::parse(&raw(3, 2, 8, 6, 0)).unwrap();
    assert_eq!(h, Ihdr { width: 3, height: 2, bit_depth: 8, color_type: PngColorType::RGBA });
    assert_eq!(h.filter_bpp(), 4);
    assert_eq!(h.row_bytes(), 12);
    assert_eq!(h.filtered_len().unwrap(), 26);
    let bytes = bytemuck::bytes_of(&h.to_raw()).to_vec();
    assert_eq!(bytes, raw(3, 2, 8, 6, 0));

    let g = Ihdr::parse(&raw(5, 1, 2, 0, 0)).unwrap();
    assert_eq!(g.filter_bpp(), 1);
    assert_eq!(g.row_bytes(), 2);
    assert_eq!(g.decoded_bit_depth(), 8);
  }

  #[test]
  fn test_ihdr_rejects() {
    let kind = |v: &[u8]| Ihdr::parse(v).unwrap_err().kind();
    assert_eq!(kind(&raw(1, 1, 8, 2, 1)), ErrorKind::Unsupported);
    assert_eq!(kind(&raw(1, 1, 8, 3, 0)), ErrorKind::Unsupported);
    assert_eq!(kind(&raw(1, 1, 4, 2, 0)), ErrorKind::Malformed);
    assert_eq!(kind(&raw(1, 1, 8, 5, 0)), ErrorKind::Malformed);
    assert_eq!(kind(&raw(0, 1, 8, 2, 0)), ErrorKind::Malformed);
    assert_eq!(kind(&raw(1, 1, 8, 2, 0)[..12]), ErrorKind::Malformed);
    assert_eq!(kind(&raw(u32::MAX, 1, 8, 2, 0)), ErrorKind::Malformed);
  }
}
