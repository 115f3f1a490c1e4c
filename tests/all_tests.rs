#![allow(bad_style)]

mod image;
mod jpeg;
mod png;
mod registry;

fn rand_bytes(count: usize) -> Vec<u8> {
  let mut buffer = vec![0; count];
  getrandom::getrandom(&mut buffer).unwrap();
  buffer
}

/// An 8x8 grayscale baseline JPEG whose every pixel is 148.
fn gray_jpeg() -> Vec<u8> {
  let mut v = vec![0xFF, 0xD8];
  // quant table 0: DC step 16, everything else 1
  v.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00, 0x10]);
  v.extend_from_slice(&[1; 63]);
  // DC table 0: the one-bit code 0 is category 4
  v.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x14, 0x00, 1]);
  v.extend_from_slice(&[0; 15]);
  v.push(4);
  // AC table 0: the one-bit code 0 ends the block
  v.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x14, 0x10, 1]);
  v.extend_from_slice(&[0; 15]);
  v.push(0x00);
  v.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 8, 0, 8, 0, 8, 1, 1, 0x11, 0]);
  v.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 1, 1, 0x00, 0, 63, 0]);
  v.push(0b0101_0011);
  v.extend_from_slice(&[0xFF, 0xD9]);
  v
}
