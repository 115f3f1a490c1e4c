//! Generic RGB and RGBA pixel values.
//!
//! A pixel shape ([`Rgb`] or [`Rgba`]) is instantiated over one channel
//! scalar type. Everything that depends on the scalar (its maximum, its byte
//! width, how it is serialized) comes from the [`Channel`] bound on that
//! scalar, so there is no separate arithmetic parameter.

use bytemuck::Zeroable;

use crate::{ImageResult, PixelFormat};

/// Whether a channel stores an integer or a floating point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
  /// Unsigned integer channels.
  Integer,
  /// IEEE float channels.
  Float,
}

/// A scalar type usable as one color channel.
pub trait Channel:
  Copy + Default + PartialEq + PartialOrd + core::fmt::Debug + Zeroable + 'static
{
  /// Integer or float.
  const KIND: ScalarKind;
  /// Byte width of one value.
  const BYTES: usize;
  /// The zero value.
  const ZERO: Self;
  /// The largest "full intensity" value: the type's max for integers, `1.0`
  /// for floats.
  const MAX: Self;

  /// Writes `BYTES` big-endian bytes to the start of `out`.
  fn write_be(self, out: &mut [u8]);
  /// Reads `BYTES` big-endian bytes from the start of `bytes`.
  fn read_be(bytes: &[u8]) -> Self;
}

macro_rules! impl_channel {
  ($t:ty, $kind:ident, $zero:expr, $max:expr) => {
    impl Channel for $t {
      const KIND: ScalarKind = ScalarKind::$kind;
      const BYTES: usize = core::mem::size_of::<$t>();
      const ZERO: Self = $zero;
      const MAX: Self = $max;
      #[inline]
      fn write_be(self, out: &mut [u8]) {
        out[..Self::BYTES].copy_from_slice(&self.to_be_bytes());
      }
      #[inline]
      fn read_be(bytes: &[u8]) -> Self {
        let mut a = [0; core::mem::size_of::<$t>()];
        a.copy_from_slice(&bytes[..Self::BYTES]);
        <$t>::from_be_bytes(a)
      }
    }
  };
}
impl_channel!(u8, Integer, 0, u8::MAX);
impl_channel!(u16, Integer, 0, u16::MAX);
impl_channel!(f32, Float, 0.0, 1.0);
impl_channel!(f64, Float, 0.0, 1.0);

/// A value with a fixed number of channels of one scalar type.
pub trait Pixel: Copy + Default + PartialEq + core::fmt::Debug + Zeroable + 'static {
  /// The scalar type of every channel.
  type Channel: Channel;
  /// How many channels this pixel has.
  const CHANNELS: usize;
  /// The byte layout this pixel serializes to.
  const FORMAT: PixelFormat = PixelFormat::new(
    <Self::Channel as Channel>::KIND,
    Self::CHANNELS as u8,
    <Self::Channel as Channel>::BYTES as u8,
  );

  /// Channel `i`, in `r, g, b, a` order.
  ///
  /// ## Panics
  /// If `i >= CHANNELS`.
  fn channel(&self, i: usize) -> Self::Channel;

  /// Sets channel `i`, in `r, g, b, a` order.
  ///
  /// ## Panics
  /// If `i >= CHANNELS`.
  fn set_channel(&mut self, i: usize, v: Self::Channel);

  /// Serializes this pixel into `out` laid out as `format`.
  #[inline]
  fn to_bytes(&self, format: PixelFormat, out: &mut [u8]) -> ImageResult<()> {
    crate::write_pixel(self, format, out)
  }

  /// Deserializes a pixel from `bytes` laid out as `format`. Channels that
  /// `format` lacks are zero.
  #[inline]
  fn from_bytes(format: PixelFormat, bytes: &[u8]) -> ImageResult<Self> {
    let mut p = Self::zeroed();
    crate::read_pixel(&mut p, format, bytes)?;
    Ok(p)
  }
}

/// Red, green, and blue channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Hash)]
#[repr(C)]
#[allow(missing_docs)]
pub struct Rgb<T> {
  pub r: T,
  pub g: T,
  pub b: T,
}
// Safety: every field is a `T` and `T: Zeroable`.
unsafe impl<T: Zeroable> Zeroable for Rgb<T> {}

impl<T> Rgb<T> {
  /// Makes a pixel from its channels.
  #[inline]
  #[must_use]
  pub const fn new(r: T, g: T, b: T) -> Self {
    Self { r, g, b }
  }
}
impl<T: Channel> Pixel for Rgb<T> {
  type Channel = T;
  const CHANNELS: usize = 3;
  #[inline]
  #[track_caller]
  fn channel(&self, i: usize) -> T {
    match i {
      0 => self.r,
      1 => self.g,
      2 => self.b,
      _ => panic!("channel index {i} out of range for Rgb"),
    }
  }
  #[inline]
  #[track_caller]
  fn set_channel(&mut self, i: usize, v: T) {
    match i {
      0 => self.r = v,
      1 => self.g = v,
      2 => self.b = v,
      _ => panic!("channel index {i} out of range for Rgb"),
    }
  }
}

/// Red, green, blue, and alpha channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Hash)]
#[repr(C)]
#[allow(missing_docs)]
pub struct Rgba<T> {
  pub r: T,
  pub g: T,
  pub b: T,
  pub a: T,
}
// Safety: every field is a `T` and `T: Zeroable`.
unsafe impl<T: Zeroable> Zeroable for Rgba<T> {}

impl<T> Rgba<T> {
  /// Makes a pixel from its channels.
  #[inline]
  #[must_use]
  pub const fn new(r: T, g: T, b: T, a: T) -> Self {
    Self { r, g, b, a }
  }
}
impl<T: Channel> Rgba<T> {
  /// A fully opaque pixel.
  #[inline]
  #[must_use]
  pub const fn opaque(r: T, g: T, b: T) -> Self {
    Self { r, g, b, a: T::MAX }
  }
}
impl<T: Channel> Pixel for Rgba<T> {
  type Channel = T;
  const CHANNELS: usize = 4;
  #[inline]
  #[track_caller]
  fn channel(&self, i: usize) -> T {
    match i {
      0 => self.r,
      1 => self.g,
      2 => self.b,
      3 => self.a,
      _ => panic!("channel index {i} out of range for Rgba"),
    }
  }
  #[inline]
  #[track_caller]
  fn set_channel(&mut self, i: usize, v: T) {
    match i {
      0 => self.r = v,
      1 => self.g = v,
      2 => self.b = v,
      3 => self.a = v,
      _ => panic!("channel index {i} out of range for Rgba"),
    }
  }
}

impl<T: Channel> From<Rgb<T>> for Rgba<T> {
  #[inline]
  fn from(Rgb { r, g, b }: Rgb<T>) -> Self {
    Self::opaque(r, g, b)
  }
}

/// 8 bits per channel RGB.
pub type Rgb24 = Rgb<u8>;
/// 16 bits per channel RGB.
pub type Rgb48 = Rgb<u16>;
/// `f32` RGB.
pub type Rgbf = Rgb<f32>;
/// `f64` RGB.
pub type Rgbd = Rgb<f64>;
/// 8 bits per channel RGBA.
pub type Rgba32 = Rgba<u8>;
/// 16 bits per channel RGBA.
pub type Rgba64 = Rgba<u16>;
/// `f32` RGBA.
pub type Rgbaf = Rgba<f32>;
/// `f64` RGBA.
pub type Rgbad = Rgba<f64>;

#[test]
fn test_pixel_formats_match_layout() {
  assert_eq!(Rgba32::FORMAT, PixelFormat::new(ScalarKind::Integer, 4, 1));
  assert_eq!(Rgb48::FORMAT, PixelFormat::new(ScalarKind::Integer, 3, 2));
  assert_eq!(Rgbaf::FORMAT, PixelFormat::new(ScalarKind::Float, 4, 4));
  assert_eq!(Rgbd::FORMAT, PixelFormat::new(ScalarKind::Float, 3, 8));
  assert_eq!(Rgba64::FORMAT.bytes_per_pixel(), core::mem::size_of::<Rgba64>());
  assert_eq!(Rgbf::FORMAT.bytes_per_pixel(), core::mem::size_of::<Rgbf>());
}

#[test]
fn test_channel_access() {
  let mut p = Rgba32::new(1, 2, 3, 4);
  assert_eq!((0..4).map(|i| p.channel(i)).collect::<Vec<_>>(), [1, 2, 3, 4]);
  p.set_channel(3, 9);
  assert_eq!(p.a, 9);
  assert_eq!(Rgba::from(Rgb48::new(5, 6, 7)), Rgba64::new(5, 6, 7, u16::MAX));
}

#[test]
fn test_pixel_bytes() {
  let mut buf = [0_u8; 6];
  Rgb24::new(0x12, 0x34, 0x56).to_bytes(Rgb48::FORMAT, &mut buf).unwrap();
  assert_eq!(buf, [0x12, 0, 0x34, 0, 0x56, 0]);
  let p = Rgba64::from_bytes(Rgb48::FORMAT, &buf).unwrap();
  assert_eq!(p, Rgba64::new(0x1200, 0x3400, 0x5600, 0));
}
