use super::*;

/// Which of the `r, g, b, a` channels a color type stores.
fn stored_channels(color_type: PngColorType) -> ImageResult<&'static [usize]> {
  Ok(match color_type {
    PngColorType::Y => &[0],
    PngColorType::YA => &[0, 3],
    PngColorType::RGB => &[0, 1, 2],
    PngColorType::RGBA => &[0, 1, 2, 3],
    PngColorType::Index => return Err(ImageError::Unsupported("indexed color PNG")),
  })
}

/// Encodes `src` as a complete PNG.
pub(crate) fn encode_png<W: Write, P: Pixel>(
  sink: &mut W, src: &ImageView<'_, P>, config: &PngConfig,
) -> ImageResult<()> {
  config.validate()?;
  if P::FORMAT.scalar != ScalarKind::Integer {
    return Err(ImageError::ScalarMismatch { from: P::FORMAT.scalar, to: ScalarKind::Integer });
  }
  if src.width() == 0 || src.height() == 0 {
    return Err(ImageError::WidthOrHeightZero);
  }
  let ihdr = Ihdr { width: src.width(), height: src.height(), bit_depth: config.bit_depth, color_type: config.color_type };
  let picks = stored_channels(config.color_type)?;
  let bpc = usize::from(config.bit_depth / 8);
  // every pixel goes through a four channel layout first, so a missing alpha
  // comes out fully opaque
  let full = PixelFormat::new(ScalarKind::Integer, 4, bpc as u8);
  let row_len = ihdr.row_bytes();
  let bpp = ihdr.filter_bpp();

  let mut filtered: Vec<u8> = Vec::new();
  filtered.try_reserve(ihdr.filtered_len()?)?;
  let mut raw: Vec<u8> = Vec::new();
  raw.try_reserve(row_len)?;
  let mut prev: Vec<u8> = Vec::new();
  prev.try_reserve(row_len)?;
  let mut out_row = Vec::new();
  out_row.try_reserve(row_len)?;
  out_row.resize(row_len, 0);

  for (y, row) in src.rows().enumerate() {
    raw.clear();
    for p in row {
      let mut px = [0xFF_u8; 8];
      write_pixel(p, full, &mut px)?;
      for &c in picks {
        raw.extend_from_slice(&px[c * bpc..(c + 1) * bpc]);
      }
    }
    let filter = config.filter.filter_for_row(y);
    filter_row(filter, bpp, &prev, &raw, &mut out_row);
    filtered.push(filter as u8);
    filtered.extend_from_slice(&out_row);
    core::mem::swap(&mut prev, &mut raw);
  }

  let mut compressed = Vec::new();
  Zlib::new().deflate(&filtered, &mut compressed, config.compression_level)?;

  let mut writer = ByteWriter::new(sink, Endian::Big);
  writer.write_bytes(&PNG_SIGNATURE)?;
  write_chunk(&mut writer, IHDR, bytemuck::bytes_of(&ihdr.to_raw()))?;
  write_chunk(&mut writer, SRGB, &[srgb_intent_to_byte(config.srgb_intent)])?;
  write_chunk(&mut writer, IDAT, &compressed)?;
  write_chunk(&mut writer, IEND, &[])?;
  let written = writer.written();
  writer.into_inner()?;
  debug!(
    "encoded {}x{} PNG ({:?}, {} bit), {written} bytes",
    ihdr.width, ihdr.height, ihdr.color_type, ihdr.bit_depth
  );
  Ok(())
}
