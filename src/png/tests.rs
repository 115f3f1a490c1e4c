use std::io::Cursor;

use super::*;
use crate::{ErrorKind, Image, Rgb24, Rgba32, Rgba64, Rgbaf};

fn encode<P: Pixel>(img: &Image<P>, config: &PngConfig) -> Vec<u8> {
  let mut out = Vec::new();
  PngCodec.encode(&mut out, &img.view(), config).unwrap();
  out
}

fn decode<P: Pixel>(bytes: &[u8]) -> ImageResult<Image<P>> {
  let meta = PngCodec.metadata(&mut Cursor::new(bytes))?;
  let mut img = Image::try_new(meta.width, meta.height)?;
  PngCodec.decode(&mut Cursor::new(bytes), &mut img.view_mut())?;
  Ok(img)
}

fn ihdr_payload(width: u32, height: u32, bit_depth: u8, color_type: u8, interlace: u8) -> Vec<u8> {
  let mut v = Vec::new();
  v.extend_from_slice(&width.to_be_bytes());
  v.extend_from_slice(&height.to_be_bytes());
  v.extend_from_slice(&[bit_depth, color_type, 0, 0, interlace]);
  v
}

/// Assembles a PNG from raw chunks.
fn build_png(chunks: &[(AsciiArray<4>, &[u8])]) -> Vec<u8> {
  let mut w = ByteWriter::new(Vec::new(), Endian::Big);
  w.write_bytes(&PNG_SIGNATURE).unwrap();
  for (ty, payload) in chunks {
    write_chunk(&mut w, *ty, payload).unwrap();
  }
  w.into_inner().unwrap()
}

fn zlib(filtered: &[u8]) -> Vec<u8> {
  let mut out = Vec::new();
  Zlib::new().deflate(filtered, &mut out, 6).unwrap();
  out
}

fn find(haystack: &[u8], needle: &[u8]) -> usize {
  haystack.windows(needle.len()).position(|w| w == needle).unwrap()
}

fn test_image<P: Pixel>(width: u32, height: u32, f: impl Fn(u32, u32) -> P) -> Image<P> {
  let pixels = (0..height).flat_map(|y| (0..width).map(move |x| (x, y))).map(|(x, y)| f(x, y)).collect();
  Image::from_pixels(width, height, pixels).unwrap()
}

#[test]
fn test_two_by_two_rgba_round_trip() {
  let pixels = vec![
    Rgba32::new(255, 0, 255, 0),
    Rgba32::new(0, 0, 0, 255),
    Rgba32::new(128, 128, 128, 255),
    Rgba32::new(0, 255, 0, 0),
  ];
  let img = Image::from_pixels(2, 2, pixels.clone()).unwrap();
  let bytes = encode(&img, &PngConfig::default());
  assert_eq!(bytes[..8], PNG_SIGNATURE);
  let meta = PngCodec.metadata(&mut Cursor::new(&bytes)).unwrap();
  assert_eq!(meta, ImageMetadata { channels: 4, bit_depth: 8, width: 2, height: 2, depth: 1 });
  let back: Image<Rgba32> = decode(&bytes).unwrap();
  assert_eq!(back.pixels(), &pixels[..]);
}

#[test]
fn test_every_filter_round_trips() {
  let rgb = test_image(7, 5, |x, y| Rgb24::new((x * 37 + y) as u8, (y * 51) as u8, (x ^ y) as u8 * 13));
  let wide = test_image(5, 4, |x, y| Rgba64::new((x * 9000) as u16, (y * 7777) as u16, (x * y * 123) as u16, 0xFFFF - x as u16));
  let strategies = PngFilter::ALL.map(FilterStrategy::Uniform);
  for filter in strategies.into_iter().chain([FilterStrategy::SubThenPaeth]) {
    let config = PngConfig { color_type: PngColorType::RGB, filter, ..PngConfig::default() };
    let back: Image<Rgb24> = decode(&encode(&rgb, &config)).unwrap();
    assert_eq!(back.pixels(), rgb.pixels(), "{filter:?}");

    let config = PngConfig { bit_depth: 16, filter, compression_level: 0, ..PngConfig::default() };
    let back: Image<Rgba64> = decode(&encode(&wide, &config)).unwrap();
    assert_eq!(back.pixels(), wide.pixels(), "{filter:?}");
  }
}

#[test]
fn test_encode_default_picks_format_from_pixel() {
  let img = test_image(3, 3, |x, y| Rgb24::new(x as u8, y as u8, 200));
  let mut bytes = Vec::new();
  PngCodec.encode_default(&mut bytes, &img.view()).unwrap();
  let meta = PngCodec.metadata(&mut Cursor::new(&bytes)).unwrap();
  assert_eq!((meta.channels, meta.bit_depth), (3, 8));

  // stored without alpha, so alpha comes from the destination
  let back: Image<Rgba32> = decode(&bytes).unwrap();
  assert_eq!(*back.get(2, 1).unwrap(), Rgba32::new(2, 1, 200, 0));

  // an rgb source stored as rgba is opaque
  let rgba = encode(&img, &PngConfig::default());
  let back: Image<Rgba32> = decode(&rgba).unwrap();
  assert!(back.pixels().iter().all(|p| p.a == 255));
}

#[test]
fn test_crc_mismatch_is_detected() {
  let img = test_image(4, 4, |x, y| Rgba32::new(x as u8, y as u8, 0, 255));
  let good = encode(&img, &PngConfig::default());
  let ihdr_payload_at = 16;
  let idat_payload_at = find(&good, b"IDAT") + 4;
  let srgb_payload_at = find(&good, b"sRGB") + 4;
  for at in [ihdr_payload_at + 5, idat_payload_at + 2, srgb_payload_at] {
    for bit in [0, 3, 7] {
      let mut bad = good.clone();
      bad[at] ^= 1 << bit;
      let err = decode::<Rgba32>(&bad).unwrap_err();
      assert!(matches!(err, ImageError::CrcMismatch { .. }), "byte {at} bit {bit}: {err:?}");
    }
  }
}

#[test]
fn test_one_bit_grayscale() {
  let filtered = [0, 0b1011_0001, 0b1100_0000, 1, 0b1000_0000, 0];
  let compressed = zlib(&filtered);
  let ihdr = ihdr_payload(10, 2, 1, 0, 0);
  let bytes = build_png(&[(IHDR, &ihdr), (IDAT, &compressed), (IEND, &[])]);
  let meta = PngCodec.metadata(&mut Cursor::new(&bytes)).unwrap();
  assert_eq!((meta.channels, meta.bit_depth), (1, 1));
  let img: Image<Rgb24> = decode(&bytes).unwrap();
  let row0: Vec<u8> = img.view().row(0).unwrap().iter().map(|p| p.r).collect();
  assert_eq!(row0, [255, 0, 255, 255, 0, 0, 0, 255, 255, 255]);
  // Sub filter on a 1 bpp row carries the first byte forward
  let row1: Vec<u8> = img.view().row(1).unwrap().iter().map(|p| p.g).collect();
  assert_eq!(row1, [255, 0, 0, 0, 0, 0, 0, 0, 255, 0]);
  assert!(img.pixels().iter().all(|p| p.r == p.g && p.g == p.b));
}

#[test]
fn test_two_bit_grayscale_replicates() {
  let filtered = [0, 0b00_01_10_11];
  let compressed = zlib(&filtered);
  let ihdr = ihdr_payload(4, 1, 2, 0, 0);
  let bytes = build_png(&[(IHDR, &ihdr), (IDAT, &compressed), (IEND, &[])]);
  let img: Image<Rgb24> = decode(&bytes).unwrap();
  let row: Vec<u8> = img.pixels().iter().map(|p| p.b).collect();
  assert_eq!(row, [0x00, 0x55, 0xAA, 0xFF]);
}

#[test]
fn test_gray_alpha_expands_to_rgb() {
  let filtered = [0, 10, 200, 20, 100];
  let compressed = zlib(&filtered);
  let ihdr = ihdr_payload(2, 1, 8, 4, 0);
  let bytes = build_png(&[(IHDR, &ihdr), (IDAT, &compressed), (IEND, &[])]);
  let img: Image<Rgba32> = decode(&bytes).unwrap();
  assert_eq!(img.pixels(), &[Rgba32::new(10, 10, 10, 200), Rgba32::new(20, 20, 20, 100)]);

  let gray = test_image(3, 2, |x, y| Rgba32::new((x * 40 + y) as u8, 0, 0, (y * 90) as u8));
  let config = PngConfig { color_type: PngColorType::YA, ..PngConfig::default() };
  let back: Image<Rgba32> = decode(&encode(&gray, &config)).unwrap();
  for (a, b) in gray.pixels().iter().zip(back.pixels()) {
    assert_eq!(*b, Rgba32::new(a.r, a.r, a.r, a.a));
  }
}

#[test]
fn test_destination_errors() {
  let img = test_image(2, 2, |x, y| Rgba64::new(x as u16, y as u16, 0, 0));
  let bytes = encode(&img, &PngConfig { bit_depth: 16, ..PngConfig::default() });

  let mut small = Image::<Rgba64>::try_new(1, 2).unwrap();
  let err = PngCodec.decode(&mut Cursor::new(&bytes), &mut small.view_mut()).unwrap_err();
  assert!(matches!(err, ImageError::DestinationTooSmall { width: 2, height: 2, got_width: 1, got_height: 2 }));

  let err = decode::<Rgba32>(&bytes).unwrap_err();
  assert!(matches!(err, ImageError::BitDepthTooLow { source_bits: 16, destination_bits: 8 }));

  let err = decode::<Rgbaf>(&bytes).unwrap_err();
  assert!(matches!(err, ImageError::ScalarMismatch { from: ScalarKind::Integer, to: ScalarKind::Float }));

  let err = PngCodec.encode(&mut Vec::new(), &Image::<Rgbaf>::try_new(1, 1).unwrap().view(), &PngConfig::default());
  assert_eq!(err.unwrap_err().kind(), ErrorKind::Unsupported);
}

#[test]
fn test_malformed_files() {
  let ihdr = ihdr_payload(1, 1, 8, 0, 0);
  let good_idat = zlib(&[0, 7]);

  let missing = build_png(&[(IHDR, &ihdr), (IEND, &[])]);
  assert!(matches!(decode::<Rgb24>(&missing), Err(ImageError::Malformed { .. })));

  let srgb_first = build_png(&[(SRGB, &[0]), (IHDR, &ihdr), (IDAT, &good_idat), (IEND, &[])]);
  assert!(matches!(decode::<Rgb24>(&srgb_first), Err(ImageError::BadChunk { .. })));

  let twice = build_png(&[(IHDR, &ihdr), (IHDR, &ihdr), (IDAT, &good_idat), (IEND, &[])]);
  assert!(matches!(decode::<Rgb24>(&twice), Err(ImageError::BadChunk { .. })));

  let bad_filter = build_png(&[(IHDR, &ihdr), (IDAT, &zlib(&[5, 7])), (IEND, &[])]);
  assert_eq!(decode::<Rgb24>(&bad_filter).unwrap_err().kind(), ErrorKind::Malformed);

  let short = build_png(&[(IHDR, &ihdr), (IDAT, &zlib(&[0])), (IEND, &[])]);
  assert!(matches!(decode::<Rgb24>(&short), Err(ImageError::Malformed { .. })));

  let interlaced = build_png(&[(IHDR, &ihdr_payload(1, 1, 8, 0, 1)), (IDAT, &good_idat), (IEND, &[])]);
  assert_eq!(decode::<Rgb24>(&interlaced).unwrap_err().kind(), ErrorKind::Unsupported);

  let mut bad_sig = build_png(&[(IHDR, &ihdr), (IDAT, &good_idat), (IEND, &[])]);
  bad_sig[1] = b'J';
  assert!(matches!(decode::<Rgb24>(&bad_sig), Err(ImageError::BadSignature { .. })));

  let full = build_png(&[(IHDR, &ihdr), (IDAT, &good_idat), (IEND, &[])]);
  let truncated = &full[..full.len() - 6];
  assert!(matches!(decode::<Rgb24>(truncated), Err(ImageError::UnexpectedEnd { .. })));

  let mut trailing = full.clone();
  trailing.extend_from_slice(b"junk");
  let img: Image<Rgb24> = decode(&trailing).unwrap();
  assert_eq!(img.pixels(), &[Rgb24::new(7, 7, 7)]);
}

#[test]
fn test_oversized_chunk_length() {
  let ihdr = ihdr_payload(1, 1, 8, 0, 0);
  for ty in [IDAT, AsciiArray(*b"tEXt")] {
    let mut bytes = build_png(&[(IHDR, &ihdr)]);
    bytes.extend_from_slice(&0x7FFF_FFFF_u32.to_be_bytes());
    bytes.extend_from_slice(&ty.0);
    assert_eq!(bytes.len(), 41);
    let mut img = Image::<Rgb24>::try_new(1, 1).unwrap();
    let err = PngCodec.decode(&mut Cursor::new(&bytes), &mut img.view_mut()).unwrap_err();
    assert!(matches!(err, ImageError::UnexpectedEnd { offset: 41 }), "{ty}: {err:?}");
  }
}

#[test]
fn test_split_idat_and_unknown_chunks() {
  let filtered = [0, 1, 2, 3, 2, 4, 5, 6];
  let compressed = zlib(&filtered);
  let (a, b) = compressed.split_at(compressed.len() / 2);
  let ihdr = ihdr_payload(1, 2, 8, 2, 0);
  let text: &[u8] = b"Comment\0hello";
  let bytes = build_png(&[(IHDR, &ihdr), (AsciiArray(*b"tEXt"), text), (IDAT, a), (IDAT, b), (IEND, &[])]);
  let img: Image<Rgb24> = decode(&bytes).unwrap();
  // the second row is Up filtered
  assert_eq!(img.pixels(), &[Rgb24::new(1, 2, 3), Rgb24::new(5, 7, 9)]);
}

#[test]
fn test_read_info() {
  let img = test_image(2, 1, |x, _| Rgba32::new(x as u8, 0, 0, 0));
  let config = PngConfig { srgb_intent: SrgbIntent::Saturation, ..PngConfig::default() };
  let info = PngCodec.read_info(&mut Cursor::new(encode(&img, &config))).unwrap();
  assert_eq!(info.srgb, Some(SrgbIntent::Saturation));
  assert_eq!(info.icc_profile, None);
  assert_eq!(info.ihdr.width, 2);

  let profile = b"not really an icc profile".to_vec();
  let mut iccp = b"Built-in\0\0".to_vec();
  iccp.extend_from_slice(&zlib(&profile));
  let ihdr = ihdr_payload(1, 1, 8, 0, 0);
  let bytes = build_png(&[(IHDR, &ihdr), (ICCP, &iccp), (IDAT, &zlib(&[0, 0])), (IEND, &[])]);
  let info = PngCodec.read_info(&mut Cursor::new(&bytes)).unwrap();
  assert_eq!(info.icc_profile, Some(IccProfile { name: "Built-in".into(), data: profile }));

  let bad = build_png(&[(IHDR, &ihdr), (SRGB, &[4]), (IDAT, &zlib(&[0, 0])), (IEND, &[])]);
  assert!(matches!(PngCodec.read_info(&mut Cursor::new(&bad)), Err(ImageError::BadChunk { .. })));
}

#[test]
fn test_config_from_pixel_format() {
  let c = PngConfig::from_pixel_format(Rgba64::FORMAT).unwrap();
  assert_eq!((c.bit_depth, c.color_type), (16, PngColorType::RGBA));
  let c = PngConfig::from_pixel_format(Rgb24::FORMAT).unwrap();
  assert_eq!((c.bit_depth, c.color_type), (8, PngColorType::RGB));
  assert!(PngConfig::from_pixel_format(Rgbaf::FORMAT).is_err());
  let bad = PngConfig { bit_depth: 4, ..PngConfig::default() };
  assert!(bad.validate().is_err());
  assert!(PngConfig { color_type: PngColorType::Index, ..PngConfig::default() }.validate().is_err());
}
