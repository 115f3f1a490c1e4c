use std::io::Cursor;

use imagelib::{
  png::{FilterStrategy, PngCodec, PngColorType, PngConfig, PngFilter, PNG_SIGNATURE},
  Codec, ErrorKind, FormatRegistry, Image, ImageFormat, Rgb24, Rgba32, Rgba64,
};
use walkdir::WalkDir;

fn random_image(width: u32, height: u32) -> Image<Rgba32> {
  let bytes = super::rand_bytes((width * height * 4) as usize);
  let pixels = bytes.chunks_exact(4).map(|c| Rgba32::new(c[0], c[1], c[2], c[3])).collect();
  Image::from_pixels(width, height, pixels).unwrap()
}

fn decode<P: imagelib::Pixel>(bytes: &[u8]) -> Image<P> {
  FormatRegistry::default().load_from(ImageFormat::Png, &mut Cursor::new(bytes)).unwrap()
}

#[test]
fn test_decoders_no_panics() {
  let registry = FormatRegistry::default();
  let formats = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Hdr, ImageFormat::Exr, ImageFormat::Jxl];
  let mut img = Image::<Rgba64>::try_new(64, 64).unwrap();
  let mut try_all = |v: &[u8]| {
    for format in formats {
      let _ = registry.metadata(format, &mut Cursor::new(v));
      let _ = registry.decode(format, &mut Cursor::new(v), &mut img.view_mut());
    }
  };
  // iter ALL files in the test folder, none of them should panic a decoder.
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    println!("{}", entry.path().display());
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(e) => {
        println!("Error reading file: {e:?}");
        continue;
      }
    };
    try_all(&v);
  }
  // even totally random data should never panic them!
  for _ in 0..10 {
    try_all(&super::rand_bytes(1024));
  }
  // nor should random data behind a real signature
  for _ in 0..10 {
    let mut v = PNG_SIGNATURE.to_vec();
    v.extend_from_slice(&super::rand_bytes(256));
    try_all(&v);
    let mut v = super::gray_jpeg();
    v.truncate(100);
    v.extend_from_slice(&super::rand_bytes(256));
    try_all(&v);
  }
}

#[test]
fn test_round_trip_every_filter() {
  let img = random_image(13, 7);
  for filter in PngFilter::ALL {
    let config = PngConfig { filter: FilterStrategy::Uniform(filter), ..PngConfig::default() };
    let mut bytes = Vec::new();
    PngCodec.encode(&mut bytes, &img.view(), &config).unwrap();
    assert!(bytes.starts_with(&PNG_SIGNATURE));
    let back: Image<Rgba32> = decode(&bytes);
    assert_eq!(back.pixels(), img.pixels(), "{filter:?}");
  }
}

#[test]
fn test_round_trip_sixteen_bit() {
  let pixels = (0..20_u16).map(|i| Rgba64::new(i * 3000, 0x1234, 0xFFFF - i, 0x8000)).collect();
  let img = Image::from_pixels(5, 4, pixels).unwrap();
  let mut bytes = Vec::new();
  PngCodec.encode_default(&mut bytes, &img.view()).unwrap();
  let info = PngCodec.read_info(&mut Cursor::new(&bytes)).unwrap();
  assert_eq!(info.ihdr.bit_depth, 16);
  assert_eq!(info.ihdr.color_type, PngColorType::RGBA);
  let back: Image<Rgba64> = decode(&bytes);
  assert_eq!(back.pixels(), img.pixels());
  // 8-bit pixels can't hold 16-bit samples
  let mut narrow = Image::<Rgba32>::try_new(5, 4).unwrap();
  let err = PngCodec.decode(&mut Cursor::new(&bytes), &mut narrow.view_mut()).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Capacity);
}

#[test]
fn test_gray_stores_red() {
  let img = random_image(6, 6);
  let config = PngConfig { color_type: PngColorType::Y, ..PngConfig::default() };
  let mut bytes = Vec::new();
  PngCodec.encode(&mut bytes, &img.view(), &config).unwrap();
  let back: Image<Rgb24> = decode(&bytes);
  for (a, b) in img.pixels().iter().zip(back.pixels()) {
    assert_eq!(*b, Rgb24::new(a.r, a.r, a.r));
  }
}

#[test]
fn test_compression_levels() {
  let img = Image::from_pixels(32, 32, vec![Rgba32::new(1, 2, 3, 4); 32 * 32]).unwrap();
  for compression_level in [0, 1, 6, 10] {
    let config = PngConfig { compression_level, ..PngConfig::default() };
    let mut bytes = Vec::new();
    PngCodec.encode(&mut bytes, &img.view(), &config).unwrap();
    let back: Image<Rgba32> = decode(&bytes);
    assert_eq!(back.pixels(), img.pixels(), "level {compression_level}");
  }
}

#[test]
fn test_truncated_file() {
  let img = random_image(8, 8);
  let mut bytes = Vec::new();
  PngCodec.encode_default(&mut bytes, &img.view()).unwrap();
  for len in [0, 4, 8, 20, bytes.len() / 2, bytes.len() - 12] {
    let mut dst = Image::<Rgba32>::try_new(8, 8).unwrap();
    let result = PngCodec.decode(&mut Cursor::new(&bytes[..len]), &mut dst.view_mut());
    assert!(result.is_err(), "len {len}");
  }
  let err = PngCodec.metadata(&mut Cursor::new(b"GIF89a")).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Malformed);
}
