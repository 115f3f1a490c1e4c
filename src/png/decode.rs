use bitfrob::u8_replicate_bits;

use super::*;

/// How far into the chunk stream [`read_chunks`] goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadUntil {
  /// Stop right after `IHDR`.
  Header,
  /// Stop at the first `IDAT` header, without reading its payload.
  ImageData,
  /// Read everything through `IEND`.
  End,
}

/// Everything gathered while walking the chunks.
#[derive(Debug, Default)]
pub(crate) struct ChunkStream {
  pub ihdr: Option<Ihdr>,
  pub srgb: Option<SrgbIntent>,
  pub icc_profile: Option<IccProfile>,
  /// All `IDAT` payloads, back to back in the scratch arena.
  pub idat: Option<Span>,
}
impl ChunkStream {
  pub fn into_info(self) -> ImageResult<PngInfo> {
    let ihdr = self.ihdr.ok_or(ImageError::malformed("PNG", "missing IHDR"))?;
    Ok(PngInfo { ihdr, srgb: self.srgb, icc_profile: self.icc_profile })
  }
}

/// Largest ICC profile we'll inflate.
const MAX_ICC_PROFILE: usize = 16 * 1024 * 1024;

/// Walks the chunks after the signature. `IDAT` payloads are appended to
/// `scratch`, everything else is parsed or dropped as it goes by.
pub(crate) fn read_chunks<R: Read + Seek>(
  reader: &mut StreamReader<R>, scratch: &mut Scratch, until: ReadUntil,
) -> ImageResult<ChunkStream> {
  let signature: [u8; 8] = reader.read_array()?;
  if signature != PNG_SIGNATURE {
    return Err(ImageError::BadSignature { format: "PNG" });
  }
  let mut stream = ChunkStream::default();
  let mut payload = Vec::new();
  loop {
    let header = ChunkHeader::read(reader)?;
    if stream.ihdr.is_none() && header.ty != IHDR {
      return Err(ImageError::BadChunk { chunk: header.ty, reason: "IHDR must be the first chunk" });
    }
    if header.ty == IDAT {
      if until == ReadUntil::ImageData {
        return Ok(stream);
      }
      let span = scratch.read_from(reader, header.len)?;
      verify_crc(reader, header.ty, scratch.get(span))?;
      stream.idat = Some(match stream.idat {
        Some(prev) => prev.join(span),
        None => span,
      });
      continue;
    }

    payload.clear();
    reader.read_to_vec(header.len, &mut payload)?;
    verify_crc(reader, header.ty, &payload)?;
    match header.ty {
      IHDR => {
        if stream.ihdr.is_some() {
          return Err(ImageError::BadChunk { chunk: IHDR, reason: "duplicate IHDR" });
        }
        let ihdr = Ihdr::parse(&payload)?;
        trace!("PNG {ihdr:?}");
        stream.ihdr = Some(ihdr);
        if until == ReadUntil::Header {
          return Ok(stream);
        }
      }
      SRGB => stream.srgb = Some(parse_srgb(&payload)?),
      ICCP => stream.icc_profile = Some(parse_iccp(&payload)?),
      IEND => {
        if !payload.is_empty() {
          return Err(ImageError::BadChunk { chunk: IEND, reason: "IEND must be empty" });
        }
        return Ok(stream);
      }
      ty if header.is_critical() => trace!("skipping unknown critical chunk {ty}"),
      ty => trace!("skipping ancillary chunk {ty}"),
    }
  }
}

fn parse_srgb(payload: &[u8]) -> ImageResult<SrgbIntent> {
  match *payload {
    [b] => srgb_intent_from_byte(b).ok_or(ImageError::BadChunk { chunk: SRGB, reason: "unknown rendering intent" }),
    _ => Err(ImageError::BadChunk { chunk: SRGB, reason: "length must be 1" }),
  }
}

fn parse_iccp(payload: &[u8]) -> ImageResult<IccProfile> {
  let mut r = SliceReader::new(payload, Endian::Big);
  let name = r.read_until(0).map_err(|_| ImageError::BadChunk { chunk: ICCP, reason: "unterminated name" })?;
  if name.is_empty() || name.len() > 79 {
    return Err(ImageError::BadChunk { chunk: ICCP, reason: "name must be 1 to 79 bytes" });
  }
  if r.read_u8()? != 0 {
    return Err(ImageError::BadChunk { chunk: ICCP, reason: "unknown compression method" });
  }
  let data = Zlib::new().inflate_to_vec(r.rest(), MAX_ICC_PROFILE)?;
  Ok(IccProfile { name: name.iter().map(|&b| char::from(b)).collect(), data })
}

/// Checks that `P` can hold the samples described by `ihdr` without loss.
fn check_pixel_depth<P: Pixel>(ihdr: Ihdr) -> ImageResult<()> {
  let dst = P::FORMAT;
  if dst.scalar != ScalarKind::Integer {
    return Err(ImageError::ScalarMismatch { from: ScalarKind::Integer, to: dst.scalar });
  }
  if dst.bit_depth() < u32::from(ihdr.decoded_bit_depth()) {
    return Err(ImageError::BitDepthTooLow { source_bits: ihdr.bit_depth, destination_bits: dst.bit_depth() as u8 });
  }
  Ok(())
}

/// Decodes a whole PNG into `dst`.
pub(crate) fn decode_png<R: Read + Seek, P: Pixel>(
  source: &mut R, dst: &mut ImageViewMut<'_, P>,
) -> ImageResult<PngInfo> {
  let mut reader = StreamReader::new(source, Endian::Big)?;
  let mut scratch = Scratch::new();
  let mut stream = read_chunks(&mut reader, &mut scratch, ReadUntil::End)?;
  if reader.read_u8().is_ok() {
    warn!("ignoring data after the PNG IEND chunk");
  }
  let idat = stream.idat.take();
  let info = stream.into_info()?;
  let ihdr = info.ihdr;
  check_destination(dst, ihdr.width, ihdr.height)?;
  check_pixel_depth::<P>(ihdr)?;
  let idat = idat.ok_or(ImageError::malformed("PNG", "missing IDAT"))?;

  let filtered = scratch.alloc(ihdr.filtered_len()?)?;
  let (compressed, out) = scratch.split(idat, filtered);
  let written = Zlib::new().inflate(compressed, out)?;
  if written < filtered.len {
    return Err(ImageError::malformed("PNG", "IDAT data is too short for the image"));
  }
  let data = scratch.get_mut(filtered);
  unfilter_image(ihdr, data)?;
  write_rows(ihdr, data, dst)?;
  debug!("decoded {}x{} PNG ({:?}, {} bit)", ihdr.width, ihdr.height, ihdr.color_type, ihdr.bit_depth);
  Ok(info)
}

/// Reconstructs every scanline in place.
fn unfilter_image(ihdr: Ihdr, data: &mut [u8]) -> ImageResult<()> {
  let line = ihdr.row_bytes() + 1;
  let bpp = ihdr.filter_bpp();
  for y in 0..ihdr.height as usize {
    let (above, rest) = data.split_at_mut(y * line);
    let prev = if y == 0 { &[][..] } else { &above[above.len() - line + 1..] };
    let (filter_byte, row) = rest[..line].split_at_mut(1);
    let filter = PngFilter::try_from(filter_byte[0])?;
    unfilter_row(filter, bpp, prev, row);
  }
  Ok(())
}

/// Sample `x` of a row packed at `bit_depth` bits per sample (1, 2, or 4).
#[inline]
fn packed_sample(row: &[u8], x: usize, bit_depth: u8) -> u8 {
  let per_byte = 8 / usize::from(bit_depth);
  let shift = 8 - usize::from(bit_depth) * (x % per_byte + 1);
  let mask = (1_u8 << bit_depth) - 1;
  (row[x / per_byte] >> shift) & mask
}

/// Converts reconstructed scanlines into pixels.
fn write_rows<P: Pixel>(ihdr: Ihdr, data: &[u8], dst: &mut ImageViewMut<'_, P>) -> ImageResult<()> {
  let color_type = ihdr.color_type;
  let gray = matches!(color_type, PngColorType::Y | PngColorType::YA);
  let bpc = usize::from(ihdr.decoded_bit_depth() / 8);
  let channels = color_type.channel_count() + if gray { 2 } else { 0 };
  let format = PixelFormat::new(ScalarKind::Integer, channels, bpc as u8);
  let width = ihdr.width as usize;
  let mut expanded = Vec::new();
  if gray {
    expanded.try_reserve(width * format.bytes_per_pixel())?;
  }
  for (y, line) in data.chunks_exact(ihdr.row_bytes() + 1).enumerate() {
    let row = &line[1..];
    let samples: &[u8] = if ihdr.bit_depth < 8 {
      expanded.clear();
      for x in 0..width {
        let v = u8_replicate_bits(u32::from(ihdr.bit_depth), packed_sample(row, x, ihdr.bit_depth));
        expanded.extend_from_slice(&[v, v, v]);
      }
      &expanded
    } else if gray {
      expanded.clear();
      let stride = usize::from(color_type.channel_count()) * bpc;
      for px in row.chunks_exact(stride) {
        let (luma, alpha) = px.split_at(bpc);
        for _ in 0..3 {
          expanded.extend_from_slice(luma);
        }
        expanded.extend_from_slice(alpha);
      }
      &expanded
    } else {
      row
    };
    let dst_row = dst.row_mut(y as u32)?;
    for (p, bytes) in dst_row.iter_mut().zip(samples.chunks_exact(format.bytes_per_pixel())) {
      read_pixel(p, format, bytes)?;
    }
  }
  Ok(())
}

#[test]
fn test_packed_sample() {
  let row = [0b1011_0001, 0b1100_0000];
  let bits: Vec<u8> = (0..10).map(|x| packed_sample(&row, x, 1)).collect();
  assert_eq!(bits, [1, 0, 1, 1, 0, 0, 0, 1, 1, 1]);
  let pairs: Vec<u8> = (0..4).map(|x| packed_sample(&row, x, 2)).collect();
  assert_eq!(pairs, [0b10, 0b11, 0b00, 0b01]);
  assert_eq!(packed_sample(&row, 1, 4), 0b0001);
  assert_eq!(u8_replicate_bits(2, 0b10), 0b1010_1010);
}
