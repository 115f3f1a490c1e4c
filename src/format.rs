#![forbid(unsafe_code)]

//! The contract every image format implements.

use std::io::{Read, Seek, Write};

use crate::{ImageError, ImageResult, ImageView, ImageViewMut, Pixel, PixelFormat};

/// Basic facts about an encoded image, available without decoding pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ImageMetadata {
  /// Channels stored in the file (1 for gray, 3 for RGB, and so on).
  pub channels: u8,
  /// Bits per channel stored in the file.
  pub bit_depth: u8,
  /// Width in pixels.
  pub width: u32,
  /// Height in pixels.
  pub height: u32,
  /// Layers or slices. Always 1 for the formats in this crate.
  pub depth: u32,
}

/// The file formats this crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
  /// Portable Network Graphics.
  Png,
  /// Baseline JPEG.
  Jpeg,
  /// Radiance RGBE.
  Hdr,
  /// OpenEXR.
  Exr,
  /// JPEG XL.
  Jxl,
}
impl ImageFormat {
  /// A short display name.
  #[inline]
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::Png => "PNG",
      Self::Jpeg => "JPEG",
      Self::Hdr => "HDR",
      Self::Exr => "EXR",
      Self::Jxl => "JXL",
    }
  }
}

/// Encode-time settings for one format.
pub trait FormatConfig: Default + Clone + core::fmt::Debug {
  /// Picks settings that store `format` pixels with as little loss as the
  /// format allows.
  fn from_pixel_format(format: PixelFormat) -> ImageResult<Self>;
}

/// Settings for formats that have nothing to configure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoConfig;
impl FormatConfig for NoConfig {
  #[inline]
  fn from_pixel_format(_: PixelFormat) -> ImageResult<Self> {
    Ok(Self)
  }
}

/// Reading and writing one image format.
///
/// Decoding writes into a caller-supplied view, which must be at least as
/// large as the image. Query [`metadata`](Codec::metadata) first to size it.
pub trait Codec {
  /// Encode-time settings.
  type Config: FormatConfig;

  /// Reads only as much of `source` as needed to describe the image.
  fn metadata<R: Read + Seek>(&self, source: &mut R) -> ImageResult<ImageMetadata>;

  /// Decodes the image in `source` into the top-left of `dst`.
  fn decode<R: Read + Seek, P: Pixel>(&self, source: &mut R, dst: &mut ImageViewMut<'_, P>) -> ImageResult<()>;

  /// Encodes `src` to `sink`.
  fn encode<W: Write, P: Pixel>(&self, sink: &mut W, src: &ImageView<'_, P>, config: &Self::Config) -> ImageResult<()>;

  /// Encodes `src` with settings derived from its pixel type.
  fn encode_default<W: Write, P: Pixel>(&self, sink: &mut W, src: &ImageView<'_, P>) -> ImageResult<()> {
    let config = Self::Config::from_pixel_format(P::FORMAT)?;
    self.encode(sink, src, &config)
  }
}

/// Size caps checked before a [`FormatRegistry`](crate::FormatRegistry)
/// allocates an image for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limits {
  /// Widest image accepted.
  pub max_width: u32,
  /// Tallest image accepted.
  pub max_height: u32,
  /// Most pixels accepted.
  pub max_pixels: u64,
}
impl Default for Limits {
  #[inline]
  fn default() -> Self {
    Self { max_width: 16_384, max_height: 16_384, max_pixels: 1 << 28 }
  }
}
impl Limits {
  /// No limits at all.
  pub const NONE: Self = Self { max_width: u32::MAX, max_height: u32::MAX, max_pixels: u64::MAX };

  /// Checks declared dimensions against these limits.
  pub fn check(&self, meta: &ImageMetadata) -> ImageResult<()> {
    let pixels = u64::from(meta.width) * u64::from(meta.height);
    if meta.width > self.max_width || meta.height > self.max_height || pixels > self.max_pixels {
      Err(ImageError::DimensionsTooLarge { width: meta.width, height: meta.height })
    } else {
      Ok(())
    }
  }
}

/// Checks that a decode destination can hold a `width * height` image.
pub(crate) fn check_destination<P: Pixel>(dst: &ImageViewMut<'_, P>, width: u32, height: u32) -> ImageResult<()> {
  if dst.width() < width || dst.height() < height {
    Err(ImageError::DestinationTooSmall { width, height, got_width: dst.width(), got_height: dst.height() })
  } else {
    Ok(())
  }
}

#[test]
fn test_limits() {
  let meta = ImageMetadata { channels: 3, bit_depth: 8, width: 20_000, height: 1, depth: 1 };
  assert!(matches!(Limits::default().check(&meta), Err(ImageError::DimensionsTooLarge { .. })));
  assert!(Limits::NONE.check(&meta).is_ok());
  let square = ImageMetadata { width: 16_384, height: 16_384, ..meta };
  assert!(Limits::default().check(&square).is_ok());
  let tight = Limits { max_pixels: 100, ..Limits::default() };
  assert!(tight.check(&ImageMetadata { width: 11, height: 10, ..meta }).is_err());
}
