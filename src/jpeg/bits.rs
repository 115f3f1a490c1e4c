//! Entropy coded data: byte unstuffing, restart splitting, and bit reads.

use super::*;

/// Reads bits most significant first from unstuffed entropy data.
#[derive(Debug, Clone)]
pub(crate) struct BitReader<'a> {
  data: &'a [u8],
  pos: usize,
  acc: u8,
  count: u32,
}
impl<'a> BitReader<'a> {
  #[inline]
  pub const fn new(data: &'a [u8]) -> Self {
    Self { data, pos: 0, acc: 0, count: 0 }
  }

  #[inline]
  pub fn read_bit(&mut self) -> ImageResult<bool> {
    if self.count == 0 {
      self.acc =
        *self.data.get(self.pos).ok_or(ImageError::malformed("JPEG", "entropy coded data ended early"))?;
      self.pos += 1;
      self.count = 8;
    }
    self.count -= 1;
    Ok((self.acc >> self.count) & 1 == 1)
  }

  /// Reads `n` bits (at most 16) as an unsigned value.
  pub fn read_bits(&mut self, n: u8) -> ImageResult<u16> {
    debug_assert!(n <= 16);
    let mut v = 0_u16;
    for _ in 0..n {
      v = (v << 1) | u16::from(self.read_bit()?);
    }
    Ok(v)
  }

  /// Reads the `category` extra bits after a Huffman symbol and gives the
  /// signed value they encode.
  pub fn receive(&mut self, category: u8) -> ImageResult<i32> {
    if category > 16 {
      return Err(ImageError::malformed("JPEG", "magnitude category above 16"));
    }
    let bits = self.read_bits(category)?;
    Ok(decode_number(category, bits))
  }
}

/// Turns the `category` raw bits that follow a Huffman symbol into a signed
/// coefficient value.
///
/// Values with a leading 0 bit are negative: `bits - (2^category - 1)`.
#[inline]
#[must_use]
pub fn decode_number(category: u8, bits: u16) -> i32 {
  if category == 0 {
    return 0;
  }
  let bits = i32::from(bits);
  if bits < 1 << (category - 1) {
    bits - ((1 << category) - 1)
  } else {
    bits
  }
}

/// Copies `src` to `dst` with every stuffed `FF 00` turned back into `FF`.
/// Gives the number of bytes written.
pub(crate) fn unstuff(src: &[u8], dst: &mut [u8]) -> usize {
  let mut written = 0;
  let mut i = 0;
  while i < src.len() {
    let b = src[i];
    dst[written] = b;
    written += 1;
    i += if b == 0xFF && src.get(i + 1) == Some(&0x00) { 2 } else { 1 };
  }
  written
}

/// Length of the entropy coded data at the start of `data`: everything up
/// to the first marker that isn't a stuffed zero or a restart marker.
pub(crate) fn entropy_len(data: &[u8]) -> usize {
  data
    .windows(2)
    .position(|w| w[0] == 0xFF && !matches!(w[1], 0x00 | RST0..=RST7))
    .unwrap_or(data.len())
}

/// Splits entropy coded data at its restart markers.
pub(crate) fn restart_segments(data: &[u8]) -> Vec<&[u8]> {
  let mut out = Vec::new();
  let mut start = 0;
  let mut i = 0;
  while i + 1 < data.len() {
    if data[i] == 0xFF && matches!(data[i + 1], RST0..=RST7) {
      out.push(&data[start..i]);
      i += 2;
      start = i;
    } else {
      i += 1;
    }
  }
  out.push(&data[start..]);
  out
}
