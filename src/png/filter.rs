//! Scanline filters.
//!
//! Every filter works per byte: "left" is the byte one whole pixel earlier in
//! the same row (`bpp` bytes back, at least 1), "above" is the byte in the
//! same column of the previous row. Neighbours outside the image are 0.

use crate::{ImageError, ImageResult};

/// The five PNG filter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PngFilter {
  /// No prediction.
  None = 0,
  /// Predict from the left byte.
  Sub = 1,
  /// Predict from the byte above.
  Up = 2,
  /// Predict from the floor-average of left and above.
  Average = 3,
  /// Predict with [`paeth_predict`].
  Paeth = 4,
}
impl PngFilter {
  /// All filters, in type byte order.
  pub const ALL: [Self; 5] = [Self::None, Self::Sub, Self::Up, Self::Average, Self::Paeth];
}
impl TryFrom<u8> for PngFilter {
  type Error = ImageError;
  #[inline]
  fn try_from(value: u8) -> ImageResult<Self> {
    Self::ALL
      .get(usize::from(value))
      .copied()
      .ok_or(ImageError::malformed("PNG", "unknown scanline filter type"))
  }
}

/// The Paeth predictor of left (`a`), above (`b`), and upper left (`c`).
#[inline]
#[must_use]
pub const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // ties go to a, then b. The order of these tests is fixed by the format.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

#[inline]
fn predict(filter: PngFilter, a: u8, b: u8, c: u8) -> u8 {
  match filter {
    PngFilter::None => 0,
    PngFilter::Sub => a,
    PngFilter::Up => b,
    PngFilter::Average => ((u16::from(a) + u16::from(b)) / 2) as u8,
    PngFilter::Paeth => paeth_predict(a, b, c),
  }
}

/// Undoes `filter` on `row` in place. `prev` is the already reconstructed row
/// above, or empty for the first row.
pub fn unfilter_row(filter: PngFilter, bpp: usize, prev: &[u8], row: &mut [u8]) {
  if filter == PngFilter::None {
    return;
  }
  for i in 0..row.len() {
    let a = if i >= bpp { row[i - bpp] } else { 0 };
    let b = prev.get(i).copied().unwrap_or(0);
    let c = if i >= bpp { prev.get(i - bpp).copied().unwrap_or(0) } else { 0 };
    row[i] = row[i].wrapping_add(predict(filter, a, b, c));
  }
}

/// Applies `filter` to `raw`, writing the filtered bytes to `out`. `prev` is
/// the raw (unfiltered) row above, or empty for the first row.
pub fn filter_row(filter: PngFilter, bpp: usize, prev: &[u8], raw: &[u8], out: &mut [u8]) {
  for (i, (&x, out)) in raw.iter().zip(out.iter_mut()).enumerate() {
    let a = if i >= bpp { raw[i - bpp] } else { 0 };
    let b = prev.get(i).copied().unwrap_or(0);
    let c = if i >= bpp { prev.get(i - bpp).copied().unwrap_or(0) } else { 0 };
    *out = x.wrapping_sub(predict(filter, a, b, c));
  }
}

#[test]
fn test_paeth_tie_order() {
  // all equal distances pick a
  assert_eq!(paeth_predict(10, 10, 10), 10);
  // p = 5 + 9 - 7 = 7, pa = 2, pb = 2, pc = 0
  assert_eq!(paeth_predict(5, 9, 7), 7);
  // p = 3, pa = 0
  assert_eq!(paeth_predict(3, 8, 8), 3);
  // p = 1 + 5 - 1 = 5, pb = 0
  assert_eq!(paeth_predict(1, 5, 1), 5);
}

#[test]
fn test_filter_round_trip_all_types() {
  let rows: [&[u8]; 3] = [&[1, 2, 3, 250, 251, 252], &[9, 0, 255, 17, 18, 200], &[0, 0, 0, 128, 64, 32]];
  for filter in PngFilter::ALL {
    for bpp in [1, 3] {
      let mut prev: &[u8] = &[];
      let mut rebuilt_prev = Vec::new();
      for raw in rows {
        let mut filtered = vec![0; raw.len()];
        filter_row(filter, bpp, prev, raw, &mut filtered);
        unfilter_row(filter, bpp, &rebuilt_prev, &mut filtered);
        assert_eq!(filtered, raw, "{filter:?} bpp {bpp}");
        rebuilt_prev = filtered;
        prev = raw;
      }
    }
  }
  assert!(PngFilter::try_from(5).is_err());
  assert_eq!(PngFilter::try_from(3).unwrap(), PngFilter::Average);
}
