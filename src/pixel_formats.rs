#![forbid(unsafe_code)]

//! Byte-level pixel layouts and conversion between them.
//!
//! A [`PixelFormat`] names how one pixel is laid out in a byte buffer: a
//! scalar kind, a channel count, and a byte width per channel. Channels are
//! always big-endian in these buffers, matching how PNG stores them.
//!
//! ## Conversion rules
//! * Identical formats are copied byte for byte.
//! * Integer to integer: the first `min(channels)` channels are copied, each
//!   rescaled by a power of 256 when the widths differ (see
//!   [`bit_depth_changes`](crate::bit_depth_changes)).
//! * Float to float: the first `min(channels)` channels are copied, changing
//!   the float width as needed.
//! * Integer to float (or back) is an error.
//!
//! Extra source channels are dropped. Extra destination channels are *not
//! written*, so whatever was in the destination stays there.

use crate::{
  read_float_channel, rescale_int_channel, write_float_channel, Channel, ImageError, ImageResult,
  Pixel, ScalarKind,
};

/// The layout of one pixel in a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
  /// Integer or float channels.
  pub scalar: ScalarKind,
  /// Number of channels.
  pub channels: u8,
  /// Byte width of every channel.
  pub bytes_per_channel: u8,
}
impl PixelFormat {
  /// Makes a format.
  #[inline]
  #[must_use]
  pub const fn new(scalar: ScalarKind, channels: u8, bytes_per_channel: u8) -> Self {
    Self { scalar, channels, bytes_per_channel }
  }

  /// Bytes per pixel.
  #[inline]
  #[must_use]
  pub const fn bytes_per_pixel(self) -> usize {
    self.channels as usize * self.bytes_per_channel as usize
  }

  /// Bits per channel.
  #[inline]
  #[must_use]
  pub const fn bit_depth(self) -> u32 {
    self.bytes_per_channel as u32 * 8
  }

  /// If this format can be converted into `other`.
  #[inline]
  #[must_use]
  pub fn converts_to(self, other: Self) -> bool {
    self.scalar == other.scalar
  }

  /// If the channel width is one this crate can read: any non-zero width for
  /// integers, 2, 4, or 8 bytes for floats.
  #[inline]
  #[must_use]
  pub const fn is_valid(self) -> bool {
    self.channels > 0
      && match self.scalar {
        ScalarKind::Integer => self.bytes_per_channel > 0,
        ScalarKind::Float => matches!(self.bytes_per_channel, 2 | 4 | 8),
      }
  }

  /// Checks that a conversion from `self` to `other` is possible.
  #[inline]
  pub fn check_conversion(self, other: Self) -> ImageResult<()> {
    if !self.is_valid() || !other.is_valid() {
      Err(ImageError::Unsupported("pixel format channel width"))
    } else if self.converts_to(other) {
      Ok(())
    } else {
      Err(ImageError::ScalarMismatch { from: self.scalar, to: other.scalar })
    }
  }
}

/// Converts one pixel from `src` bytes in `src_format` to `dst` bytes in
/// `dst_format`.
///
/// Both slices must be at least one pixel long in their format.
pub fn convert_pixel_bytes(
  src_format: PixelFormat, src: &[u8], dst_format: PixelFormat, dst: &mut [u8],
) -> ImageResult<()> {
  let src_bpp = src_format.bytes_per_pixel();
  let dst_bpp = dst_format.bytes_per_pixel();
  if src.len() < src_bpp {
    return Err(ImageError::BufferTooSmall { needed: src_bpp, got: src.len() });
  }
  if dst.len() < dst_bpp {
    return Err(ImageError::BufferTooSmall { needed: dst_bpp, got: dst.len() });
  }
  src_format.check_conversion(dst_format)?;
  if src_format == dst_format {
    dst[..dst_bpp].copy_from_slice(&src[..src_bpp]);
    return Ok(());
  }
  let src_w = usize::from(src_format.bytes_per_channel);
  let dst_w = usize::from(dst_format.bytes_per_channel);
  let shared = usize::from(src_format.channels.min(dst_format.channels));
  let src_channels = src.chunks_exact(src_w).take(shared);
  let dst_channels = dst.chunks_exact_mut(dst_w).take(shared);
  match src_format.scalar {
    ScalarKind::Integer => {
      src_channels.zip(dst_channels).for_each(|(s, d)| rescale_int_channel(s, d));
    }
    ScalarKind::Float => {
      src_channels.zip(dst_channels).for_each(|(s, d)| write_float_channel(read_float_channel(s), d));
    }
  }
  Ok(())
}

/// Converts a run of packed pixels, stopping at whichever buffer runs out of
/// whole pixels first. Gives the number of pixels converted.
pub fn convert_pixel_run(
  src_format: PixelFormat, src: &[u8], dst_format: PixelFormat, dst: &mut [u8],
) -> ImageResult<usize> {
  src_format.check_conversion(dst_format)?;
  let mut count = 0;
  for (s, d) in src
    .chunks_exact(src_format.bytes_per_pixel())
    .zip(dst.chunks_exact_mut(dst_format.bytes_per_pixel()))
  {
    convert_pixel_bytes(src_format, s, dst_format, d)?;
    count += 1;
  }
  Ok(count)
}

/// Serializes `pixel` into `out` using `format`.
pub fn write_pixel<P: Pixel>(pixel: &P, format: PixelFormat, out: &mut [u8]) -> ImageResult<()> {
  let mut native = [0_u8; MAX_PIXEL_BYTES];
  pixel_to_native(pixel, &mut native);
  convert_pixel_bytes(P::FORMAT, &native, format, out)
}

/// Deserializes `pixel` from `bytes` laid out in `format`.
///
/// Channels that `format` doesn't have keep their current value in `pixel`.
pub fn read_pixel<P: Pixel>(pixel: &mut P, format: PixelFormat, bytes: &[u8]) -> ImageResult<()> {
  let mut native = [0_u8; MAX_PIXEL_BYTES];
  pixel_to_native(pixel, &mut native);
  convert_pixel_bytes(format, bytes, P::FORMAT, &mut native)?;
  let w = <P::Channel as Channel>::BYTES;
  for (i, c) in native.chunks_exact(w).take(P::CHANNELS).enumerate() {
    pixel.set_channel(i, <P::Channel as Channel>::read_be(c));
  }
  Ok(())
}

/// Four channels of `f64`.
const MAX_PIXEL_BYTES: usize = 32;

fn pixel_to_native<P: Pixel>(pixel: &P, out: &mut [u8; MAX_PIXEL_BYTES]) {
  let w = <P::Channel as Channel>::BYTES;
  for (i, c) in out.chunks_exact_mut(w).take(P::CHANNELS).enumerate() {
    pixel.channel(i).write_be(c);
  }
}
