use super::*;

/// Start of image.
pub const SOI: u8 = 0xD8;
/// End of image.
pub const EOI: u8 = 0xD9;
/// Baseline DCT frame.
pub const SOF0: u8 = 0xC0;
/// Extended sequential DCT frame.
pub const SOF1: u8 = 0xC1;
/// Progressive DCT frame.
pub const SOF2: u8 = 0xC2;
/// Define Huffman tables.
pub const DHT: u8 = 0xC4;
/// Define quantization tables.
pub const DQT: u8 = 0xDB;
/// Define restart interval.
pub const DRI: u8 = 0xDD;
/// Start of scan.
pub const SOS: u8 = 0xDA;
/// First restart marker.
pub const RST0: u8 = 0xD0;
/// Last restart marker.
pub const RST7: u8 = 0xD7;

/// If `marker` stands alone, without a length and payload.
#[inline]
#[must_use]
pub const fn is_standalone(marker: u8) -> bool {
  matches!(marker, SOI | EOI | RST0..=RST7 | 0x01)
}

/// Reads the next marker, skipping any `0xFF` fill bytes. Gives the marker
/// byte and the offset of its leading `0xFF`.
pub(crate) fn read_marker<R: DataReader>(reader: &mut R) -> ImageResult<(u8, u64)> {
  let offset = reader.position();
  let first = reader.read_u8()?;
  if first != 0xFF {
    return Err(ImageError::BadMarker { marker: first, offset, reason: "expected a marker" });
  }
  let mut marker = reader.read_u8()?;
  while marker == 0xFF {
    marker = reader.read_u8()?;
  }
  if marker == 0x00 {
    return Err(ImageError::BadMarker { marker, offset, reason: "stuffed zero outside of entropy data" });
  }
  Ok((marker, offset))
}

/// Reads a segment's length and payload into `payload`.
pub(crate) fn read_segment<R: DataReader>(
  reader: &mut R, marker: u8, offset: u64, payload: &mut Vec<u8>,
) -> ImageResult<()> {
  let len = usize::from(reader.read_u16()?);
  if len < 2 {
    return Err(ImageError::BadMarker { marker, offset, reason: "segment length below 2" });
  }
  payload.clear();
  payload.resize(len - 2, 0);
  reader.read(payload)?;
  trace!("JPEG marker 0xFF{marker:02X} len {len} at {offset}");
  Ok(())
}

/// Flavors of frame this crate recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
  /// `SOF0`
  Baseline,
  /// `SOF1`
  ExtendedSequential,
  /// `SOF2`
  Progressive,
}

/// One component of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameComponent {
  /// Identifier referenced by scans.
  pub id: u8,
  /// Horizontal sampling factor, `1..=4`.
  pub h: u8,
  /// Vertical sampling factor, `1..=4`.
  pub v: u8,
  /// Quantization table slot, `0..=3`.
  pub quant: u8,
}

/// The frame header from a `SOFn` segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameHeader {
  /// Which `SOFn` marker declared the frame.
  pub kind: FrameKind,
  /// Bits per sample.
  pub precision: u8,
  /// Width in pixels.
  pub width: u16,
  /// Height in pixels.
  pub height: u16,
  /// The components, in frame order.
  pub components: Vec<FrameComponent>,
}
impl FrameHeader {
  pub(crate) fn parse(marker: u8, offset: u64, payload: &[u8]) -> ImageResult<Self> {
    let kind = match marker {
      SOF0 => FrameKind::Baseline,
      SOF1 => FrameKind::ExtendedSequential,
      SOF2 => FrameKind::Progressive,
      _ => return Err(ImageError::Unsupported("lossless, hierarchical, or arithmetic coded JPEG")),
    };
    let mut r = SliceReader::new(payload, Endian::Big);
    let precision = r.read_u8()?;
    let height = r.read_u16()?;
    let width = r.read_u16()?;
    let count = r.read_u8()?;
    if r.remaining() != usize::from(count) * 3 {
      return Err(ImageError::BadMarker { marker, offset, reason: "frame length does not match component count" });
    }
    let mut components = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
      let id = r.read_u8()?;
      let sampling = r.read_u8()?;
      let quant = r.read_u8()?;
      let (h, v) = (sampling >> 4, sampling & 0x0F);
      if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
        return Err(ImageError::BadMarker { marker, offset, reason: "sampling factor outside 1 to 4" });
      }
      if quant > 3 {
        return Err(ImageError::BadMarker { marker, offset, reason: "quantization table slot above 3" });
      }
      components.push(FrameComponent { id, h, v, quant });
    }
    if width == 0 || height == 0 {
      return Err(ImageError::WidthOrHeightZero);
    }
    Ok(Self { kind, precision, width, height, components })
  }

  /// Largest horizontal sampling factor.
  #[inline]
  #[must_use]
  pub fn max_h(&self) -> u8 {
    self.components.iter().map(|c| c.h).max().unwrap_or(1)
  }

  /// Largest vertical sampling factor.
  #[inline]
  #[must_use]
  pub fn max_v(&self) -> u8 {
    self.components.iter().map(|c| c.v).max().unwrap_or(1)
  }

  /// MCU columns and rows covering the image.
  #[inline]
  #[must_use]
  pub fn mcu_grid(&self) -> (usize, usize) {
    let mcu_w = 8 * usize::from(self.max_h());
    let mcu_h = 8 * usize::from(self.max_v());
    (usize::from(self.width).div_ceil(mcu_w), usize::from(self.height).div_ceil(mcu_h))
  }

  /// Block columns and rows of component `i` that hold image data (what a
  /// scan of that component alone covers).
  #[must_use]
  pub fn component_blocks(&self, i: usize) -> (usize, usize) {
    let c = self.components[i];
    let w = (usize::from(self.width) * usize::from(c.h)).div_ceil(usize::from(self.max_h()));
    let h = (usize::from(self.height) * usize::from(c.v)).div_ceil(usize::from(self.max_v()));
    (w.div_ceil(8), h.div_ceil(8))
  }

  /// Metadata for this frame.
  #[must_use]
  pub fn metadata(&self) -> ImageMetadata {
    ImageMetadata {
      channels: self.components.len() as u8,
      bit_depth: self.precision,
      width: u32::from(self.width),
      height: u32::from(self.height),
      depth: 1,
    }
  }
}

/// One component of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanComponent {
  /// Index into the frame's components.
  pub index: usize,
  pub dc_table: usize,
  pub ac_table: usize,
}

/// The scan header from a `SOS` segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanHeader {
  pub components: Vec<ScanComponent>,
  /// Spectral selection start and end, ignored by sequential decoding.
  pub spectral: (u8, u8),
  /// Successive approximation high and low nibbles, also ignored.
  pub approximation: u8,
}
impl ScanHeader {
  pub fn parse(offset: u64, payload: &[u8], frame: &FrameHeader) -> ImageResult<Self> {
    let bad = |reason| ImageError::BadMarker { marker: SOS, offset, reason };
    let mut r = SliceReader::new(payload, Endian::Big);
    let count = r.read_u8()?;
    if !(1..=4).contains(&count) || r.remaining() != usize::from(count) * 2 + 3 {
      return Err(bad("scan length does not match component count"));
    }
    let mut components = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
      let id = r.read_u8()?;
      let tables = r.read_u8()?;
      let index = frame.components.iter().position(|c| c.id == id).ok_or(bad("scan names an unknown component"))?;
      let (dc_table, ac_table) = (usize::from(tables >> 4), usize::from(tables & 0x0F));
      if dc_table > 3 || ac_table > 3 {
        return Err(bad("Huffman table slot above 3"));
      }
      components.push(ScanComponent { index, dc_table, ac_table });
    }
    let spectral = (r.read_u8()?, r.read_u8()?);
    let approximation = r.read_u8()?;
    Ok(Self { components, spectral, approximation })
  }
}

/// Quantization tables, in zig-zag order.
pub(crate) type QuantTables = [Option<[u16; 64]>; 4];

/// Huffman tables for one class (DC or AC).
pub(crate) type HuffmanTables = [Option<HuffmanTree>; 4];

pub(crate) fn parse_dqt(offset: u64, payload: &[u8], tables: &mut QuantTables) -> ImageResult<()> {
  let mut r = SliceReader::new(payload, Endian::Big);
  while !r.is_empty() {
    let info = r.read_u8()?;
    let (precision, slot) = (info >> 4, usize::from(info & 0x0F));
    if slot > 3 {
      return Err(ImageError::BadMarker { marker: DQT, offset, reason: "quantization table slot above 3" });
    }
    let mut table = [0_u16; 64];
    for q in table.iter_mut() {
      *q = match precision {
        0 => u16::from(r.read_u8()?),
        1 => r.read_u16()?,
        _ => return Err(ImageError::BadMarker { marker: DQT, offset, reason: "unknown table precision" }),
      };
    }
    tables[slot] = Some(table);
  }
  Ok(())
}

pub(crate) fn parse_dht(
  offset: u64, payload: &[u8], dc: &mut HuffmanTables, ac: &mut HuffmanTables,
) -> ImageResult<()> {
  let mut r = SliceReader::new(payload, Endian::Big);
  while !r.is_empty() {
    let info = r.read_u8()?;
    let (class, slot) = (info >> 4, usize::from(info & 0x0F));
    if slot > 3 {
      return Err(ImageError::BadMarker { marker: DHT, offset, reason: "Huffman table slot above 3" });
    }
    let counts: [u8; 16] = r.read_array()?;
    let total = counts.iter().map(|&c| usize::from(c)).sum();
    let symbols = r.take(total)?;
    let tree = HuffmanTree::from_dht(&counts, symbols)?;
    match class {
      0 => dc[slot] = Some(tree),
      1 => ac[slot] = Some(tree),
      _ => return Err(ImageError::BadMarker { marker: DHT, offset, reason: "unknown table class" }),
    }
  }
  Ok(())
}

pub(crate) fn parse_dri(offset: u64, payload: &[u8]) -> ImageResult<u16> {
  match *payload {
    [hi, lo] => Ok(u16::from_be_bytes([hi, lo])),
    _ => Err(ImageError::BadMarker { marker: DRI, offset, reason: "length must be 4" }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_read_marker_skips_fill() {
    let bytes = [0xFF, 0xFF, 0xFF, 0xDB, 0x00, 0x02, 0x12];
    let mut r = SliceReader::new(&bytes, Endian::Big);
    assert_eq!(read_marker(&mut r).unwrap(), (DQT, 0));
    let mut payload = vec![9; 3];
    read_segment(&mut r, DQT, 0, &mut payload).unwrap();
    assert!(payload.is_empty());
    assert!(matches!(read_marker(&mut r), Err(ImageError::BadMarker { marker: 0x12, offset: 6, .. })));
    assert!(is_standalone(RST0 + 3));
    assert!(!is_standalone(SOS));
  }

  #[test]
  fn test_frame_header() {
    let payload = [8, 0, 17, 0, 33, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1];
    let f = FrameHeader::parse(SOF0, 0, &payload).unwrap();
    assert_eq!((f.width, f.height, f.precision), (33, 17, 8));
    assert_eq!((f.max_h(), f.max_v()), (2, 2));
    assert_eq!(f.mcu_grid(), (3, 2));
    assert_eq!(f.component_blocks(0), (5, 3));
    assert_eq!(f.component_blocks(1), (3, 2));
    assert_eq!(f.metadata().channels, 3);

    let mut bad = payload;
    bad[7] = 0x52;
    assert!(FrameHeader::parse(SOF0, 0, &bad).is_err());
    assert_eq!(FrameHeader::parse(0xC9, 0, &payload).unwrap_err().kind(), crate::ErrorKind::Unsupported);
    assert!(FrameHeader::parse(SOF0, 0, &payload[..14]).is_err());
  }

  #[test]
  fn test_dqt_and_dri() {
    let mut payload = vec![0x01];
    payload.extend((1..=64_u16).flat_map(|v| (v * 300).to_be_bytes()));
    let mut tables = QuantTables::default();
    parse_dqt(0, &payload, &mut tables).unwrap();
    assert!(tables[0].is_none());
    assert_eq!(tables[1].unwrap()[63], 64 * 300);
    assert!(parse_dqt(0, &payload[..100], &mut tables).is_err());
    assert_eq!(parse_dri(0, &[0x01, 0x02]).unwrap(), 0x0102);
    assert!(parse_dri(0, &[1]).is_err());
  }
}
