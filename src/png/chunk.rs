use super::*;

/// Image header.
pub const IHDR: AsciiArray<4> = AsciiArray(*b"IHDR");
/// Image data.
pub const IDAT: AsciiArray<4> = AsciiArray(*b"IDAT");
/// Image end.
pub const IEND: AsciiArray<4> = AsciiArray(*b"IEND");
/// Standard RGB colour space.
pub const SRGB: AsciiArray<4> = AsciiArray(*b"sRGB");
/// Embedded ICC profile.
pub const ICCP: AsciiArray<4> = AsciiArray(*b"iCCP");

/// Chunk lengths above this are illegal.
const MAX_CHUNK_LEN: u32 = i32::MAX as u32;

/// The length and type that start every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChunkHeader {
  pub len: usize,
  pub ty: AsciiArray<4>,
  /// Stream offset of the length field.
  pub offset: u64,
}
impl ChunkHeader {
  pub fn read<R: DataReader>(reader: &mut R) -> ImageResult<Self> {
    let offset = reader.position();
    let len = reader.read_u32()?;
    let ty = AsciiArray(reader.read_array()?);
    if len > MAX_CHUNK_LEN {
      return Err(ImageError::BadChunk { chunk: ty, reason: "length exceeds 2^31-1" });
    }
    if !ty.is_alphabetic() {
      return Err(ImageError::BadChunk { chunk: ty, reason: "type must be ascii letters" });
    }
    trace!("PNG chunk {ty} len {len} at {offset}");
    Ok(Self { len: len as usize, ty, offset })
  }

  /// Ancillary chunks have a lowercase first letter.
  #[inline]
  pub fn is_critical(&self) -> bool {
    self.ty.0[0].is_ascii_uppercase()
  }
}

/// Reads the stored CRC that follows `payload` and checks it.
pub(crate) fn verify_crc<R: DataReader>(reader: &mut R, ty: AsciiArray<4>, payload: &[u8]) -> ImageResult<()> {
  let stored = reader.read_u32()?;
  let computed = chunk_crc(&ty.0, payload);
  if stored == computed {
    Ok(())
  } else {
    Err(ImageError::CrcMismatch { chunk: ty, stored, computed })
  }
}

/// Writes one complete chunk: length, type, payload, CRC.
pub(crate) fn write_chunk<W: Write>(writer: &mut ByteWriter<W>, ty: AsciiArray<4>, payload: &[u8]) -> ImageResult<()> {
  let len = u32::try_from(payload.len())?;
  if len > MAX_CHUNK_LEN {
    return Err(ImageError::CheckedMath);
  }
  writer.write_u32(len)?;
  writer.write_bytes(&ty.0)?;
  writer.write_bytes(payload)?;
  writer.write_u32(chunk_crc(&ty.0, payload))
}

#[test]
fn test_chunk_write_then_read() {
  let mut w = ByteWriter::new(Vec::new(), Endian::Big);
  write_chunk(&mut w, SRGB, &[0]).unwrap();
  let bytes = w.into_inner().unwrap();
  assert_eq!(bytes, [0, 0, 0, 1, b's', b'R', b'G', b'B', 0, 0xAE, 0xCE, 0x1C, 0xE9]);

  let mut r = SliceReader::new(&bytes, Endian::Big);
  let header = ChunkHeader::read(&mut r).unwrap();
  assert_eq!(header.ty, SRGB);
  assert!(!header.is_critical());
  let payload = r.take(header.len).unwrap();
  verify_crc(&mut r, header.ty, payload).unwrap();

  let mut r = SliceReader::new(&bytes, Endian::Big);
  let header = ChunkHeader::read(&mut r).unwrap();
  r.skip(header.len).unwrap();
  assert!(matches!(verify_crc(&mut r, header.ty, &[1]), Err(ImageError::CrcMismatch { .. })));
}
