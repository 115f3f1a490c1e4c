#![forbid(unsafe_code)]

//! OpenEXR headers.
//!
//! * [File layout](https://openexr.com/en/latest/OpenEXRFileLayout.html)
//!
//! Only the header is understood: the magic number, the version word, the
//! header attributes, and the offset table that follows them. That is enough
//! for [`metadata`](Codec::metadata). Decoding pixels fails as
//! [`Unsupported`](crate::ErrorKind::Unsupported) once the offset table has
//! been read, as do multi-part and deep data files.
//!
//! Everything in an EXR file is little-endian.

use std::io::{Read, Seek, Write};

use log::{debug, trace, warn};

use crate::{
  check_destination, Codec, DataReader, Endian, ImageError, ImageMetadata, ImageResult, ImageView, ImageViewMut,
  NoConfig, Pixel, StreamReader,
};

/// The first four bytes of every EXR.
pub const EXR_MAGIC: [u8; 4] = [0x76, 0x2F, 0x31, 0x01];

/// The version word after the magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExrVersion(pub u32);
impl ExrVersion {
  /// The file format version, currently always 2.
  #[inline]
  #[must_use]
  pub const fn number(self) -> u8 {
    self.0 as u8
  }
  /// A single tiled part.
  #[inline]
  #[must_use]
  pub const fn is_tiled(self) -> bool {
    self.0 & 0x200 != 0
  }
  /// Attribute and channel names may be up to 255 bytes instead of 31.
  #[inline]
  #[must_use]
  pub const fn has_long_names(self) -> bool {
    self.0 & 0x400 != 0
  }
  /// At least one part holds deep data.
  #[inline]
  #[must_use]
  pub const fn is_deep(self) -> bool {
    self.0 & 0x800 != 0
  }
  /// More than one part.
  #[inline]
  #[must_use]
  pub const fn is_multipart(self) -> bool {
    self.0 & 0x1000 != 0
  }
}

/// Pixel data compression schemes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ExrCompression {
  #[default]
  None,
  Rle,
  Zips,
  Zip,
  Piz,
  Pxr24,
  B44,
  B44a,
  Dwaa,
  Dwab,
}
impl ExrCompression {
  /// Parses the byte stored in the `compression` attribute.
  #[inline]
  #[must_use]
  pub const fn from_u8(b: u8) -> Option<Self> {
    Some(match b {
      0 => Self::None,
      1 => Self::Rle,
      2 => Self::Zips,
      3 => Self::Zip,
      4 => Self::Piz,
      5 => Self::Pxr24,
      6 => Self::B44,
      7 => Self::B44a,
      8 => Self::Dwaa,
      9 => Self::Dwab,
      _ => return None,
    })
  }

  /// Scanlines stored together in one chunk.
  #[inline]
  #[must_use]
  pub const fn scanlines_per_chunk(self) -> u32 {
    match self {
      Self::None | Self::Rle | Self::Zips => 1,
      Self::Zip | Self::Pxr24 => 16,
      Self::Piz | Self::B44 | Self::B44a | Self::Dwaa => 32,
      Self::Dwab => 256,
    }
  }
}

/// Storage type of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExrPixelType {
  /// `u32`
  Uint,
  /// `f16`
  Half,
  /// `f32`
  Float,
}
impl ExrPixelType {
  /// Bits per sample.
  #[inline]
  #[must_use]
  pub const fn bits(self) -> u8 {
    match self {
      Self::Half => 16,
      Self::Uint | Self::Float => 32,
    }
  }
}

/// Order that scanline chunks are stored in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ExrLineOrder {
  #[default]
  IncreasingY,
  DecreasingY,
  RandomY,
}

/// One entry of the `channels` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExrChannel {
  /// Channel name, such as `R` or `diffuse.A`.
  pub name: String,
  /// Sample storage.
  pub pixel_type: ExrPixelType,
  /// Hint that the samples are perceptually linear.
  pub linear: bool,
  /// Horizontal subsampling.
  pub x_sampling: i32,
  /// Vertical subsampling.
  pub y_sampling: i32,
}

/// An inclusive integer rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct Box2i {
  pub x_min: i32,
  pub y_min: i32,
  pub x_max: i32,
  pub y_max: i32,
}
impl Box2i {
  fn read<R: DataReader>(reader: &mut R) -> ImageResult<Self> {
    Ok(Self { x_min: reader.read_i32()?, y_min: reader.read_i32()?, x_max: reader.read_i32()?, y_max: reader.read_i32()? })
  }

  /// Width and height, which are zero for an empty box.
  pub fn size(self) -> ImageResult<(u32, u32)> {
    let w = i64::from(self.x_max) - i64::from(self.x_min) + 1;
    let h = i64::from(self.y_max) - i64::from(self.y_min) + 1;
    Ok((u32::try_from(w.max(0))?, u32::try_from(h.max(0))?))
  }
}

/// The attributes of a single part header.
#[derive(Debug, Clone, PartialEq)]
pub struct ExrHeader {
  /// The version word.
  pub version: ExrVersion,
  /// Channels, sorted by name as the file stores them.
  pub channels: Vec<ExrChannel>,
  /// Pixel compression.
  pub compression: ExrCompression,
  /// Pixels actually stored.
  pub data_window: Box2i,
  /// The intended display area.
  pub display_window: Box2i,
  /// Chunk order.
  pub line_order: ExrLineOrder,
  /// `pixelAspectRatio`, when present.
  pub pixel_aspect_ratio: Option<f32>,
}
impl ExrHeader {
  /// Metadata for the data window.
  pub fn metadata(&self) -> ImageResult<ImageMetadata> {
    let (width, height) = self.data_window.size()?;
    Ok(ImageMetadata {
      channels: u8::try_from(self.channels.len())?,
      bit_depth: self.channels.iter().map(|c| c.pixel_type.bits()).max().unwrap_or(0),
      width,
      height,
      depth: 1,
    })
  }

  /// Number of entries in the offset table.
  pub fn chunk_count(&self) -> ImageResult<u32> {
    let (_, height) = self.data_window.size()?;
    Ok(height.div_ceil(self.compression.scanlines_per_chunk()))
  }
}

/// Reads a null terminated name.
fn read_name<R: Read + Seek>(reader: &mut StreamReader<R>, max: usize) -> ImageResult<String> {
  let mut bytes = Vec::new();
  reader.read_until(0, &mut bytes)?;
  if bytes.len() > max {
    return Err(ImageError::malformed("EXR", "name is too long"));
  }
  Ok(bytes.iter().map(|&b| char::from(b)).collect())
}

fn expect_size(name: &str, size: usize, expected: usize) -> ImageResult<()> {
  if size == expected {
    Ok(())
  } else {
    trace!("EXR attribute {name} has size {size}, expected {expected}");
    Err(ImageError::malformed("EXR", "attribute size does not match its type"))
  }
}

fn read_channels<R: Read + Seek>(reader: &mut StreamReader<R>, size: usize, max: usize) -> ImageResult<Vec<ExrChannel>> {
  let end = reader.position() + size as u64;
  let mut channels = Vec::new();
  loop {
    let name = read_name(reader, max)?;
    if name.is_empty() {
      break;
    }
    let pixel_type = match reader.read_i32()? {
      0 => ExrPixelType::Uint,
      1 => ExrPixelType::Half,
      2 => ExrPixelType::Float,
      _ => return Err(ImageError::malformed("EXR", "unknown channel pixel type")),
    };
    let linear = reader.read_u8()? != 0;
    if reader.read_array::<3>()? != [0; 3] {
      return Err(ImageError::malformed("EXR", "channel reserved bytes must be zero"));
    }
    let x_sampling = reader.read_i32()?;
    let y_sampling = reader.read_i32()?;
    channels.push(ExrChannel { name, pixel_type, linear, x_sampling, y_sampling });
  }
  if reader.position() != end {
    return Err(ImageError::malformed("EXR", "channel list size does not match its contents"));
  }
  Ok(channels)
}

/// Reads the magic number, version, and header attributes.
fn read_header<R: Read + Seek>(reader: &mut StreamReader<R>) -> ImageResult<ExrHeader> {
  let magic: [u8; 4] = reader.read_array().map_err(|_| ImageError::BadSignature { format: "EXR" })?;
  if magic != EXR_MAGIC {
    return Err(ImageError::BadSignature { format: "EXR" });
  }
  let version = ExrVersion(reader.read_u32()?);
  if version.number() != 2 {
    return Err(ImageError::Unsupported("EXR version other than 2"));
  }
  if version.is_multipart() {
    return Err(ImageError::Unsupported("multi-part EXR"));
  }
  if version.is_deep() {
    return Err(ImageError::Unsupported("deep data EXR"));
  }
  let max_name = if version.has_long_names() { 255 } else { 31 };

  let mut channels = None;
  let mut compression = None;
  let mut data_window = None;
  let mut display_window = None;
  let mut line_order = None;
  let mut pixel_aspect_ratio = None;
  loop {
    let name = read_name(reader, max_name)?;
    if name.is_empty() {
      break;
    }
    let ty = read_name(reader, max_name)?;
    let size = usize::try_from(reader.read_i32()?)?;
    trace!("EXR attribute {name}: {ty} ({size} bytes)");
    match (name.as_str(), ty.as_str()) {
      ("channels", "chlist") => channels = Some(read_channels(reader, size, max_name)?),
      ("compression", "compression") => {
        expect_size(&name, size, 1)?;
        let b = reader.read_u8()?;
        compression =
          Some(ExrCompression::from_u8(b).ok_or(ImageError::malformed("EXR", "unknown compression method"))?);
      }
      ("dataWindow", "box2i") => {
        expect_size(&name, size, 16)?;
        data_window = Some(Box2i::read(reader)?);
      }
      ("displayWindow", "box2i") => {
        expect_size(&name, size, 16)?;
        display_window = Some(Box2i::read(reader)?);
      }
      ("lineOrder", "lineOrder") => {
        expect_size(&name, size, 1)?;
        line_order = Some(match reader.read_u8()? {
          0 => ExrLineOrder::IncreasingY,
          1 => ExrLineOrder::DecreasingY,
          2 => ExrLineOrder::RandomY,
          _ => return Err(ImageError::malformed("EXR", "unknown line order")),
        });
      }
      ("pixelAspectRatio", "float") => {
        expect_size(&name, size, 4)?;
        pixel_aspect_ratio = Some(reader.read_f32()?);
      }
      _ => {
        warn!("skipping EXR attribute {name} of type {ty}");
        reader.skip(size as u64)?;
      }
    }
  }

  let missing = |what| ImageError::malformed("EXR", what);
  let header = ExrHeader {
    version,
    channels: channels.ok_or_else(|| missing("missing channels attribute"))?,
    compression: compression.ok_or_else(|| missing("missing compression attribute"))?,
    data_window: data_window.ok_or_else(|| missing("missing dataWindow attribute"))?,
    display_window: display_window.ok_or_else(|| missing("missing displayWindow attribute"))?,
    line_order: line_order.ok_or_else(|| missing("missing lineOrder attribute"))?,
    pixel_aspect_ratio,
  };
  let (width, height) = header.data_window.size()?;
  if width == 0 || height == 0 {
    return Err(ImageError::WidthOrHeightZero);
  }
  Ok(header)
}

/// Reads the chunk offset table that follows a scanline header.
fn read_offsets<R: Read + Seek>(reader: &mut StreamReader<R>, header: &ExrHeader) -> ImageResult<Vec<u64>> {
  let count = header.chunk_count()? as usize;
  let mut offsets = Vec::new();
  offsets.try_reserve(count)?;
  for _ in 0..count {
    offsets.push(reader.read_u64()?);
  }
  // the smallest possible first chunk starts right after the table
  let table_end = reader.position();
  if offsets.iter().any(|&o| o < table_end) {
    return Err(ImageError::malformed("EXR", "chunk offset points into the header"));
  }
  Ok(offsets)
}

/// The OpenEXR codec. Header and metadata only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExrCodec;
impl ExrCodec {
  /// Reads the header attributes.
  pub fn read_header<R: Read + Seek>(&self, source: &mut R) -> ImageResult<ExrHeader> {
    read_header(&mut StreamReader::new(source, Endian::Little)?)
  }

  /// Reads the header and the chunk offset table of a scanline file.
  pub fn read_offset_table<R: Read + Seek>(&self, source: &mut R) -> ImageResult<(ExrHeader, Vec<u64>)> {
    let mut reader = StreamReader::new(source, Endian::Little)?;
    let header = read_header(&mut reader)?;
    if header.version.is_tiled() {
      return Err(ImageError::Unsupported("tiled EXR"));
    }
    let offsets = read_offsets(&mut reader, &header)?;
    Ok((header, offsets))
  }
}
impl Codec for ExrCodec {
  type Config = NoConfig;

  fn metadata<R: Read + Seek>(&self, source: &mut R) -> ImageResult<ImageMetadata> {
    self.read_header(source)?.metadata()
  }

  fn decode<R: Read + Seek, P: Pixel>(&self, source: &mut R, dst: &mut ImageViewMut<'_, P>) -> ImageResult<()> {
    let (header, offsets) = self.read_offset_table(source)?;
    let meta = header.metadata()?;
    check_destination(dst, meta.width, meta.height)?;
    debug!("EXR {}x{} with {} chunks, {:?} compression", meta.width, meta.height, offsets.len(), header.compression);
    Err(ImageError::Unsupported("EXR pixel decoding"))
  }

  fn encode<W: Write, P: Pixel>(&self, _: &mut W, _: &ImageView<'_, P>, _: &NoConfig) -> ImageResult<()> {
    Err(ImageError::Unsupported("EXR encoding"))
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;
  use crate::{ErrorKind, Image, Rgbaf};

  fn attribute(out: &mut Vec<u8>, name: &str, ty: &str, payload: &[u8]) {
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    out.extend_from_slice(ty.as_bytes());
    out.push(0);
    out.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    out.extend_from_slice(payload);
  }

  fn box2i(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Vec<u8> {
    [x_min, y_min, x_max, y_max].iter().flat_map(|v| v.to_le_bytes()).collect()
  }

  fn chlist(channels: &[(&str, i32)]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(name, ty) in channels {
      out.extend_from_slice(name.as_bytes());
      out.push(0);
      out.extend_from_slice(&ty.to_le_bytes());
      out.extend_from_slice(&[0, 0, 0, 0]);
      out.extend_from_slice(&1_i32.to_le_bytes());
      out.extend_from_slice(&1_i32.to_le_bytes());
    }
    out.push(0);
    out
  }

  /// A 10x5 scanline file with ZIP compression: one chunk.
  fn sample(version: u32, skip: &str) -> Vec<u8> {
    let mut out = EXR_MAGIC.to_vec();
    out.extend_from_slice(&version.to_le_bytes());
    let attrs: [(&str, &str, Vec<u8>); 7] = [
      ("channels", "chlist", chlist(&[("A", 2), ("B", 1), ("G", 1), ("R", 1)])),
      ("compression", "compression", vec![3]),
      ("dataWindow", "box2i", box2i(-2, 10, 7, 14)),
      ("displayWindow", "box2i", box2i(0, 0, 9, 19)),
      ("lineOrder", "lineOrder", vec![0]),
      ("owner", "string", b"somebody".to_vec()),
      ("pixelAspectRatio", "float", 1.5_f32.to_le_bytes().to_vec()),
    ];
    for (name, ty, payload) in attrs.iter().filter(|(name, ..)| *name != skip) {
      attribute(&mut out, name, ty, payload);
    }
    out.push(0);
    let table_end = out.len() as u64 + 8;
    out.extend_from_slice(&table_end.to_le_bytes());
    out
  }

  #[test]
  fn test_header_and_metadata() {
    let bytes = sample(2, "");
    let header = ExrCodec.read_header(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(header.channels.len(), 4);
    assert_eq!(header.channels[1].name, "B");
    assert_eq!(header.channels[0].pixel_type, ExrPixelType::Float);
    assert_eq!(header.compression, ExrCompression::Zip);
    assert_eq!(header.data_window.size().unwrap(), (10, 5));
    assert_eq!(header.display_window.size().unwrap(), (10, 20));
    assert_eq!(header.pixel_aspect_ratio, Some(1.5));
    assert_eq!(header.chunk_count().unwrap(), 1);

    let meta = ExrCodec.metadata(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(meta, ImageMetadata { channels: 4, bit_depth: 32, width: 10, height: 5, depth: 1 });

    let (_, offsets) = ExrCodec.read_offset_table(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(offsets, [bytes.len() as u64]);
  }

  #[test]
  fn test_decode_stops_at_pixels() {
    let bytes = sample(2, "");
    let mut img = Image::<Rgbaf>::try_new(10, 5).unwrap();
    let err = ExrCodec.decode(&mut Cursor::new(&bytes), &mut img.view_mut()).unwrap_err();
    assert!(matches!(err, ImageError::Unsupported("EXR pixel decoding")));

    let mut small = Image::<Rgbaf>::try_new(4, 4).unwrap();
    let err = ExrCodec.decode(&mut Cursor::new(&bytes), &mut small.view_mut()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capacity);

    let tiled = sample(2 | 0x200, "");
    assert!(ExrCodec.metadata(&mut Cursor::new(&tiled)).is_ok());
    let err = ExrCodec.decode(&mut Cursor::new(&tiled), &mut img.view_mut()).unwrap_err();
    assert!(matches!(err, ImageError::Unsupported("tiled EXR")));
  }

  #[test]
  fn test_rejects() {
    let meta = |bytes: &[u8]| ExrCodec.metadata(&mut Cursor::new(bytes));
    assert!(matches!(meta(b"\x89PNG\r\n\x1a\n"), Err(ImageError::BadSignature { format: "EXR" })));
    assert_eq!(meta(&sample(2 | 0x1000, "")).unwrap_err().kind(), ErrorKind::Unsupported);
    assert_eq!(meta(&sample(2 | 0x800, "")).unwrap_err().kind(), ErrorKind::Unsupported);
    assert_eq!(meta(&sample(1, "")).unwrap_err().kind(), ErrorKind::Unsupported);
    assert!(matches!(
      meta(&sample(2, "dataWindow")),
      Err(ImageError::Malformed { reason: "missing dataWindow attribute", .. })
    ));
    let mut truncated = sample(2, "");
    truncated.truncate(40);
    assert!(matches!(meta(&truncated), Err(ImageError::UnexpectedEnd { .. })));

    let mut bad_offset = sample(2, "");
    let n = bad_offset.len();
    bad_offset[n - 8..].copy_from_slice(&4_u64.to_le_bytes());
    let err = ExrCodec.read_offset_table(&mut Cursor::new(&bad_offset)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
  }
}
