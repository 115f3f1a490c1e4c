use std::io::Cursor;

use imagelib::{jpeg::JpegCodec, Codec, ErrorKind, FormatRegistry, Image, ImageFormat, Rgb24, Rgbaf};

#[test]
fn test_load_gray_jpeg() {
  let bytes = super::gray_jpeg();
  let meta = JpegCodec.metadata(&mut Cursor::new(&bytes)).unwrap();
  assert_eq!((meta.width, meta.height, meta.channels, meta.bit_depth), (8, 8, 1, 8));
  let img: Image<Rgb24> = FormatRegistry::default().load_from(ImageFormat::Jpeg, &mut Cursor::new(&bytes)).unwrap();
  for p in img.pixels() {
    assert!(p.r.abs_diff(148) <= 1, "{p:?}");
    assert_eq!((p.r, p.r), (p.g, p.b));
  }
}

#[test]
fn test_decode_into_sub_view() {
  let bytes = super::gray_jpeg();
  let mut canvas = Image::<Rgb24>::try_new(20, 20).unwrap();
  let mut view = canvas.view_mut();
  let mut region = view.slice_mut(10, 10, 5, 6).unwrap();
  JpegCodec.decode(&mut Cursor::new(&bytes), &mut region).unwrap();
  assert_eq!(*canvas.get(4, 6).unwrap(), Rgb24::default());
  assert_ne!(*canvas.get(5, 6).unwrap(), Rgb24::default());
  assert_ne!(*canvas.get(12, 13).unwrap(), Rgb24::default());
  // the sub-view was larger than the image
  assert_eq!(*canvas.get(13, 14).unwrap(), Rgb24::default());
}

#[test]
fn test_float_destination_rejected() {
  let bytes = super::gray_jpeg();
  let mut img = Image::<Rgbaf>::try_new(8, 8).unwrap();
  let err = JpegCodec.decode(&mut Cursor::new(&bytes), &mut img.view_mut()).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_truncated_jpeg() {
  let bytes = super::gray_jpeg();
  for len in [0, 1, 2, 10, 50, bytes.len() - 3] {
    let mut img = Image::<Rgb24>::try_new(8, 8).unwrap();
    let result = JpegCodec.decode(&mut Cursor::new(&bytes[..len]), &mut img.view_mut());
    assert!(result.is_err(), "len {len}");
  }
}
