use std::io::Cursor;

use imagelib::{ErrorKind, FormatRegistry, Image, ImageFormat, Limits, Rgb24, Rgba32, Rgbf};

fn temp_path(name: &str) -> std::path::PathBuf {
  let tag: String = super::rand_bytes(4).iter().map(|b| format!("{b:02x}")).collect();
  std::env::temp_dir().join(format!("imagelib_{tag}_{name}"))
}

#[test]
fn test_save_then_load() {
  let pixels = super::rand_bytes(5 * 3 * 4).chunks_exact(4).map(|c| Rgba32::new(c[0], c[1], c[2], c[3])).collect();
  let img = Image::from_pixels(5, 3, pixels).unwrap();
  let registry = FormatRegistry::default();
  let path = temp_path("round_trip.PNG");
  registry.save(&path, &img.view()).unwrap();
  let back: Image<Rgba32> = registry.load(&path).unwrap();
  assert_eq!(back.pixels(), img.pixels());

  let mut bigger = Image::<Rgba32>::try_new(6, 6).unwrap();
  registry.load_into(&path, &mut bigger.view_mut()).unwrap();
  assert_eq!(bigger.get(4, 2).unwrap(), img.get(4, 2).unwrap());
  assert_eq!(*bigger.get(5, 5).unwrap(), Rgba32::default());
  let _ = std::fs::remove_file(&path);
}

#[test]
fn test_lookup_errors() {
  let registry = FormatRegistry::default();
  let img = Image::<Rgb24>::try_new(1, 1).unwrap();
  assert_eq!(registry.load::<Rgb24>("picture.gif").unwrap_err().kind(), ErrorKind::UnknownFormat);
  assert_eq!(registry.load::<Rgb24>("no_extension").unwrap_err().kind(), ErrorKind::UnknownFormat);
  assert_eq!(registry.load::<Rgb24>(temp_path("missing.png")).unwrap_err().kind(), ErrorKind::Io);
  let path = temp_path("never_written.jpg");
  assert_eq!(registry.save(&path, &img.view()).unwrap_err().kind(), ErrorKind::Unsupported);
  let _ = std::fs::remove_file(&path);
}

#[test]
fn test_custom_table() {
  let mut registry = FormatRegistry::new();
  assert!(registry.format_for_extension("png").is_err());
  assert_eq!(registry.register(".JPE", ImageFormat::Jpeg), None);
  assert_eq!(registry.format_for_path("dir/photo.jpe").unwrap(), ImageFormat::Jpeg);
  let bytes = super::gray_jpeg();
  let format = registry.format_for_extension("jpe").unwrap();
  let img: Image<Rgb24> = registry.load_from(format, &mut Cursor::new(&bytes)).unwrap();
  assert_eq!((img.width(), img.height()), (8, 8));
  assert_eq!(registry.unregister("jpe"), Some(ImageFormat::Jpeg));
  assert!(registry.format_for_path("photo.jpe").is_err());
}

#[test]
fn test_limits() {
  let bytes = super::gray_jpeg();
  let registry = FormatRegistry::default().with_limits(Limits { max_width: 4, ..Limits::default() });
  let err = registry.load_from::<_, Rgb24>(ImageFormat::Jpeg, &mut Cursor::new(&bytes)).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Capacity);
  let registry = FormatRegistry::default().with_limits(Limits::NONE);
  assert!(registry.load_from::<_, Rgb24>(ImageFormat::Jpeg, &mut Cursor::new(&bytes)).is_ok());
}

#[test]
fn test_load_hdr() {
  let mut bytes = b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 2\n".to_vec();
  bytes.extend_from_slice(&[128, 64, 32, 129, 0, 0, 0, 0]);
  let registry = FormatRegistry::default();
  let meta = registry.metadata(ImageFormat::Hdr, &mut Cursor::new(&bytes)).unwrap();
  assert_eq!((meta.width, meta.height, meta.channels), (2, 1, 3));
  let img: Image<Rgbf> = registry.load_from(ImageFormat::Hdr, &mut Cursor::new(&bytes)).unwrap();
  assert_eq!(*img.get(0, 0).unwrap(), Rgbf::new(1.0, 0.5, 0.25));
  assert_eq!(*img.get(1, 0).unwrap(), Rgbf::new(0.0, 0.0, 0.0));
  // integer pixels can't hold HDR values
  let err = registry.load_from::<_, Rgb24>(ImageFormat::Hdr, &mut Cursor::new(&bytes)).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_header_only_formats() {
  let registry = FormatRegistry::default();
  let jxl = [0xFF, 0x0A, 0x00, 0x00];
  let err = registry.load_from::<_, Rgbf>(ImageFormat::Jxl, &mut Cursor::new(&jxl)).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unsupported);
  let err = registry.load_from::<_, Rgbf>(ImageFormat::Exr, &mut Cursor::new(b"not an exr file")).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Malformed);
}
