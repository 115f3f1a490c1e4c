#![forbid(unsafe_code)]

//! Changing the byte width of one channel value.
//!
//! Integer channels change depth by whole bytes: widening multiplies by a
//! power of 256, narrowing divides by one. An 8-bit `0xFF` widens to the 16-bit
//! `0xFF00` (not `0xFFFF`), and narrowing `0xFF00` gives back `0xFF`. On
//! big-endian bytes that is just "copy the leading bytes, zero the rest".
//!
//! Float channels change between `f16`, `f32`, and `f64` representations of
//! the same value.

use half::f16;

/// Rescales one big-endian unsigned integer channel from `src.len()` bytes to
/// `dst.len()` bytes.
///
/// ## Panics
/// * If either slice is empty.
#[inline]
pub fn rescale_int_channel(src: &[u8], dst: &mut [u8]) {
  assert!(!src.is_empty() && !dst.is_empty());
  let kept = src.len().min(dst.len());
  dst[..kept].copy_from_slice(&src[..kept]);
  dst[kept..].fill(0);
}

/// Widens an 8-bit channel to 16 bits.
#[inline]
#[must_use]
pub const fn u8_to_u16_depth(v: u8) -> u16 {
  (v as u16) << 8
}

/// Narrows a 16-bit channel to 8 bits.
#[inline]
#[must_use]
pub const fn u16_to_u8_depth(v: u16) -> u8 {
  (v >> 8) as u8
}

/// Reads a big-endian float channel of 2, 4, or 8 bytes.
///
/// ## Panics
/// * If the slice length is not 2, 4, or 8.
#[inline]
#[must_use]
#[track_caller]
pub fn read_float_channel(bytes: &[u8]) -> f64 {
  match *bytes {
    [a, b] => f16::from_be_bytes([a, b]).to_f64(),
    [a, b, c, d] => f64::from(f32::from_be_bytes([a, b, c, d])),
    [a, b, c, d, e, f, g, h] => f64::from_be_bytes([a, b, c, d, e, f, g, h]),
    _ => panic!("float channels must be 2, 4, or 8 bytes, got {}", bytes.len()),
  }
}

/// Writes `v` as a big-endian float channel filling all of `out` (2, 4, or 8
/// bytes), rounding to the nearest representable value when narrowing.
///
/// ## Panics
/// * If the slice length is not 2, 4, or 8.
#[inline]
#[track_caller]
pub fn write_float_channel(v: f64, out: &mut [u8]) {
  match out.len() {
    2 => out.copy_from_slice(&f16::from_f64(v).to_be_bytes()),
    4 => out.copy_from_slice(&(v as f32).to_be_bytes()),
    8 => out.copy_from_slice(&v.to_be_bytes()),
    n => panic!("float channels must be 2, 4, or 8 bytes, got {n}"),
  }
}

#[test]
fn test_rescale_int_is_power_of_256() {
  let mut wide = [0_u8; 2];
  rescale_int_channel(&[0xFF], &mut wide);
  assert_eq!(u16::from_be_bytes(wide), 0xFF00);
  let mut narrow = [0_u8; 1];
  rescale_int_channel(&0xFF00_u16.to_be_bytes(), &mut narrow);
  assert_eq!(narrow[0], 0xFF);
  rescale_int_channel(&0x12FF_u16.to_be_bytes(), &mut narrow);
  assert_eq!(narrow[0], 0x12);
  let mut same = [0_u8; 2];
  rescale_int_channel(&[0xAB, 0xCD], &mut same);
  assert_eq!(same, [0xAB, 0xCD]);

  assert_eq!(u8_to_u16_depth(0xFF), 0xFF00);
  assert_eq!(u16_to_u8_depth(0xFF00), 0xFF);
}

#[test]
fn test_float_channel_widths() {
  let mut h = [0_u8; 2];
  write_float_channel(0.25, &mut h);
  assert_eq!(read_float_channel(&h), 0.25);
  let mut s = [0_u8; 4];
  write_float_channel(1.5, &mut s);
  assert_eq!(read_float_channel(&s), 1.5);
  let mut d = [0_u8; 8];
  write_float_channel(-3.0, &mut d);
  assert_eq!(read_float_channel(&d), -3.0);
}
