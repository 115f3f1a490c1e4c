use imagelib::{mip_chain_width, ErrorKind, Image, PixelFormat, Rgb24, Rgba32, Rgba64, ScalarKind};

fn checker(width: u32, height: u32) -> Image<Rgba32> {
  let pixels = (0..height)
    .flat_map(|y| (0..width).map(move |x| if (x + y) % 2 == 0 { Rgba32::new(255, 255, 255, 255) } else { Rgba32::default() }))
    .collect();
  Image::from_pixels(width, height, pixels).unwrap()
}

#[test]
fn test_wrong_pixel_count() {
  let err = Image::from_pixels(3, 3, vec![Rgb24::default(); 8]).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Capacity);
}

#[test]
fn test_view_bounds() {
  let img = checker(4, 4);
  let view = img.view();
  assert!(view.slice(2, 2, 2, 2).is_ok());
  assert_eq!(view.slice(3, 2, 2, 2).unwrap_err().kind(), ErrorKind::Capacity);
  assert_eq!(view.get(4, 0).unwrap_err().kind(), ErrorKind::Capacity);
  let inner = view.slice(2, 2, 1, 1).unwrap();
  assert_eq!(inner.get(0, 0).unwrap(), img.get(1, 1).unwrap());
  assert_eq!(inner.get(1, 0).unwrap(), img.get(2, 1).unwrap());
}

#[test]
fn test_split_rows_and_fill() {
  let mut img = Image::<Rgb24>::try_new(3, 4).unwrap();
  let (mut top, mut bottom) = img.view_mut().split_at_row(1).unwrap();
  top.fill(Rgb24::new(1, 1, 1));
  bottom.fill(Rgb24::new(2, 2, 2));
  assert_eq!(*img.get(2, 0).unwrap(), Rgb24::new(1, 1, 1));
  assert_eq!(*img.get(0, 1).unwrap(), Rgb24::new(2, 2, 2));
  assert_eq!(*img.get(2, 3).unwrap(), Rgb24::new(2, 2, 2));
}

#[test]
fn test_mipmap_chain() {
  let img = checker(8, 4);
  assert_eq!(mip_chain_width(8, 4), 8 + 4 + 2);
  let mut dst = Image::<Rgba32>::try_new(mip_chain_width(8, 4), 4).unwrap();
  let levels = img.view().mipmap(&mut dst.view_mut()).unwrap();
  assert_eq!(levels, 3);
  assert_eq!(dst.get(1, 0).unwrap(), img.get(1, 0).unwrap());
  // level 1 is 4x2 at x=8, sampling every other source pixel
  assert_eq!(dst.get(8, 0).unwrap(), img.get(0, 0).unwrap());
  assert_eq!(dst.get(9, 1).unwrap(), img.get(2, 2).unwrap());
  // level 2 is 2x1 at x=12
  assert_eq!(dst.get(13, 0).unwrap(), img.get(4, 0).unwrap());
  // too narrow
  let mut small = Image::<Rgba32>::try_new(12, 4).unwrap();
  assert_eq!(img.view().mipmap(&mut small.view_mut()).unwrap_err().kind(), ErrorKind::Capacity);
}

#[test]
fn test_copy_to_bytes() {
  let img = Image::from_pixels(2, 1, vec![Rgba64::new(0x1234, 0x5678, 0x9ABC, 0xDEF0); 2]).unwrap();
  let mut bytes = [0_u8; 6];
  img.view().copy_to_bytes(PixelFormat::new(ScalarKind::Integer, 3, 1), &mut bytes).unwrap();
  assert_eq!(bytes, [0x12, 0x56, 0x9A, 0x12, 0x56, 0x9A]);
  let err = img.view().copy_to_bytes(PixelFormat::new(ScalarKind::Float, 3, 4), &mut [0; 24]).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unsupported);
  let err = img.view().copy_to_bytes(PixelFormat::new(ScalarKind::Integer, 4, 2), &mut [0; 15]).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Capacity);
}
