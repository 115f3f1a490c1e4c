#![forbid(unsafe_code)]

//! The zlib (DEFLATE) stream used by PNG.
//!
//! A [`Zlib`] holds its own inflate state, so it must not be shared between
//! concurrent decodes. Codecs make one per call.

use miniz_oxide::{
  deflate::compress_to_vec_zlib,
  inflate::{
    core::{
      decompress,
      inflate_flags::{TINFL_FLAG_PARSE_ZLIB_HEADER, TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF},
      DecompressorOxide,
    },
    decompress_to_vec_zlib_with_limit, TINFLStatus,
  },
};

use crate::{ImageError, ImageResult};

/// Highest level accepted by [`Zlib::deflate`].
pub const MAX_COMPRESSION_LEVEL: u8 = 10;

/// A zlib compressor/decompressor.
#[derive(Default)]
pub struct Zlib {
  inflater: Box<DecompressorOxide>,
}
impl core::fmt::Debug for Zlib {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Zlib").finish_non_exhaustive()
  }
}
impl Zlib {
  /// Makes a fresh stream.
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Forgets any partially inflated stream.
  #[inline]
  pub fn reset(&mut self) {
    *self.inflater = DecompressorOxide::new();
  }

  /// Compresses all of `input` as one complete zlib stream appended to
  /// `output`, giving the number of bytes written.
  ///
  /// `level` is clamped to `0..=10`.
  pub fn deflate(&mut self, input: &[u8], output: &mut Vec<u8>, level: u8) -> ImageResult<usize> {
    let compressed = compress_to_vec_zlib(input, level.min(MAX_COMPRESSION_LEVEL));
    output.try_reserve(compressed.len())?;
    output.extend_from_slice(&compressed);
    Ok(compressed.len())
  }

  /// Inflates one complete zlib stream from `input` into `output`, giving the
  /// number of bytes written.
  ///
  /// The Adler-32 checksum is verified. An `output` too small for the whole
  /// stream is an error.
  pub fn inflate(&mut self, input: &[u8], output: &mut [u8]) -> ImageResult<usize> {
    self.reset();
    let flags = TINFL_FLAG_PARSE_ZLIB_HEADER | TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF;
    let (status, _input_read, bytes_written) = decompress(&mut self.inflater, input, output, 0, flags);
    match status {
      TINFLStatus::Done => Ok(bytes_written),
      TINFLStatus::Adler32Mismatch => Err(ImageError::Decompression("adler32 mismatch")),
      TINFLStatus::HasMoreOutput => Err(ImageError::Decompression("output buffer overflow")),
      TINFLStatus::NeedsMoreInput | TINFLStatus::FailedCannotMakeProgress => {
        Err(ImageError::Decompression("truncated stream"))
      }
      _ => Err(ImageError::Decompression("invalid stream")),
    }
  }

  /// Inflates one complete zlib stream of unknown size, refusing to produce
  /// more than `limit` bytes.
  pub fn inflate_to_vec(&mut self, input: &[u8], limit: usize) -> ImageResult<Vec<u8>> {
    decompress_to_vec_zlib_with_limit(input, limit).map_err(|e| match e.status {
      TINFLStatus::HasMoreOutput => ImageError::Decompression("output exceeds limit"),
      TINFLStatus::Adler32Mismatch => ImageError::Decompression("adler32 mismatch"),
      _ => ImageError::Decompression("invalid stream"),
    })
  }
}

#[test]
fn test_zlib_round_trip() {
  let input: Vec<u8> = (0..2000_u32).map(|i| (i % 7) as u8).collect();
  let mut z = Zlib::new();
  let mut packed = Vec::new();
  let n = z.deflate(&input, &mut packed, 6).unwrap();
  assert_eq!(n, packed.len());
  assert!(packed.len() < input.len());
  let mut out = vec![0; input.len()];
  assert_eq!(z.inflate(&packed, &mut out).unwrap(), input.len());
  assert_eq!(out, input);
  // reused after a reset
  out.fill(0);
  assert_eq!(z.inflate(&packed, &mut out).unwrap(), input.len());

  let mut short = vec![0; 10];
  assert!(z.inflate(&packed, &mut short).is_err());
  assert_eq!(z.inflate_to_vec(&packed, 4096).unwrap(), input);
  assert!(z.inflate_to_vec(&packed, 100).is_err());
  let last = packed.len() - 1;
  packed[last] ^= 0xFF;
  assert!(z.inflate(&packed, &mut out).is_err());
}
