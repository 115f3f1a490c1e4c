//! Centered YCbCr samples to 8-bit RGB.

#[inline]
fn to_u8(v: f32) -> u8 {
  (v + 128.0).clamp(0.0, 255.0) as u8
}

/// Converts one pixel. All three inputs are centered on zero, as the IDCT
/// produces them.
#[inline]
#[must_use]
pub(crate) fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> [u8; 3] {
  let r = cr * (2.0 - 2.0 * 0.299) + y;
  let b = cb * (2.0 - 2.0 * 0.114) + y;
  let g = (y - 0.114 * b - 0.299 * r) / 0.587;
  [to_u8(r), to_u8(g), to_u8(b)]
}

/// Grayscale goes to all three channels.
#[inline]
#[must_use]
pub(crate) fn gray_to_rgb(y: f32) -> [u8; 3] {
  let v = to_u8(y);
  [v, v, v]
}

#[test]
fn test_color_conversion() {
  assert_eq!(gray_to_rgb(20.0), [148; 3]);
  assert_eq!(gray_to_rgb(-500.0), [0; 3]);
  assert_eq!(ycbcr_to_rgb(0.0, 0.0, 0.0), [128; 3]);
  assert!(ycbcr_to_rgb(127.0, 0.0, 0.0).iter().all(|&c| c >= 254));
  let [r, g, b] = ycbcr_to_rgb(20.0, 20.0, 0.0);
  assert_eq!((r, g, b), (148, 141, 183));
  // strong red
  let [r, g, b] = ycbcr_to_rgb(-52.0, -43.0, 127.0);
  assert!(r > 240 && g < 20 && b < 20, "{r} {g} {b}");
}
