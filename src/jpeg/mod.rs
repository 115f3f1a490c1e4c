#![forbid(unsafe_code)]

//! Baseline JPEG decoding.
//!
//! * [Spec (ITU T.81)](https://www.w3.org/Graphics/JPEG/itu-t81.pdf)
//!
//! A JPEG is a series of marker segments. Each marker is `0xFF` and a type
//! byte, and most are followed by a big-endian `u16` length (which counts
//! itself) and a payload. Tables (`DQT`, `DHT`, `DRI`) and the frame header
//! (`SOFn`) come first. Each `SOS` segment is followed by entropy coded data,
//! in which any literal `0xFF` byte is stuffed as `FF 00`.
//!
//! Supported: Huffman coded sequential frames (`SOF0` and `SOF1`) with 8 bit
//! samples, one (gray) or three (YCbCr) components, any sampling factors,
//! and restart intervals. Progressive frames (`SOF2`) report their metadata
//! but fail to decode as [`Unsupported`](crate::ErrorKind::Unsupported).
//!
//! Output is always RGB: gray samples go to all of red, green, and blue.
//! Encoding is not supported.

use std::io::{Read, Seek, Write};

use log::{debug, trace, warn};

use crate::scratch::Scratch;
use crate::{
  check_destination, read_pixel, Codec, DataReader, Endian, ImageError, ImageMetadata, ImageResult, ImageView,
  ImageViewMut, NoConfig, Pixel, PixelFormat, ScalarKind, SliceReader, StreamReader,
};

mod markers;
pub use markers::*;

mod huffman;
pub use huffman::*;

mod bits;
use bits::*;
pub use bits::decode_number;

mod idct;
use idct::*;

mod color;
use color::*;


/// If `marker` starts a frame: `SOF0` through `SOF15`, except the three
/// markers that share that range.
#[inline]
#[must_use]
pub const fn is_sof(marker: u8) -> bool {
  matches!(marker, 0xC0..=0xCF) && !matches!(marker, DHT | 0xC8 | 0xCC)
}

/// Reads the `SOI` marker.
fn read_soi<R: DataReader>(reader: &mut R) -> ImageResult<()> {
  match reader.read_array() {
    Ok([0xFF, SOI]) => Ok(()),
    _ => Err(ImageError::BadSignature { format: "JPEG" }),
  }
}

/// Walks the markers up to the frame header, skipping everything else.
/// Huffman tables are not built.
fn read_frame_header<R: DataReader>(reader: &mut R) -> ImageResult<FrameHeader> {
  read_soi(reader)?;
  let mut payload = Vec::new();
  loop {
    let (marker, offset) = read_marker(reader)?;
    if is_standalone(marker) {
      if marker == EOI {
        return Err(ImageError::malformed("JPEG", "no frame header before EOI"));
      }
      continue;
    }
    read_segment(reader, marker, offset, &mut payload)?;
    if is_sof(marker) {
      return FrameHeader::parse(marker, offset, &payload);
    }
    if marker == SOS {
      return Err(ImageError::malformed("JPEG", "scan before frame header"));
    }
  }
}

/// Rejects frames this decoder can't reconstruct.
fn check_frame(frame: &FrameHeader) -> ImageResult<()> {
  if frame.kind == FrameKind::Progressive {
    return Err(ImageError::Unsupported("progressive JPEG"));
  }
  if frame.precision != 8 {
    return Err(ImageError::Unsupported("JPEG sample precision other than 8 bits"));
  }
  if !matches!(frame.components.len(), 1 | 3) {
    return Err(ImageError::Unsupported("JPEG with other than 1 or 3 components"));
  }
  Ok(())
}

/// Decoded samples of one component, covering whole MCUs.
#[derive(Debug, Clone)]
struct Plane {
  width: usize,
  height: usize,
  /// Centered samples, row major.
  samples: Vec<f32>,
}
impl Plane {
  fn new(frame: &FrameHeader, i: usize) -> ImageResult<Self> {
    let c = frame.components[i];
    let (mcus_x, mcus_y) = frame.mcu_grid();
    let width = mcus_x * usize::from(c.h) * 8;
    let height = mcus_y * usize::from(c.v) * 8;
    let len = width.checked_mul(height).ok_or(ImageError::CheckedMath)?;
    let mut samples = Vec::new();
    samples.try_reserve(len)?;
    samples.resize(len, 0.0);
    Ok(Self { width, height, samples })
  }

  fn store_block(&mut self, bx: usize, by: usize, block: &[f32; 64]) {
    for (y, row) in block.chunks_exact(8).enumerate() {
      let start = (by * 8 + y) * self.width + bx * 8;
      self.samples[start..start + 8].copy_from_slice(row);
    }
  }

  #[inline]
  fn at(&self, x: usize, y: usize) -> f32 {
    self.samples[y.min(self.height - 1) * self.width + x.min(self.width - 1)]
  }
}

/// Everything the table segments have defined so far.
#[derive(Debug, Default)]
struct Tables {
  quant: QuantTables,
  dc: HuffmanTables,
  ac: HuffmanTables,
  restart_interval: u16,
}

/// One scan component with its tables resolved.
struct ScanPart<'t> {
  index: usize,
  dc: &'t HuffmanTree,
  ac: &'t HuffmanTree,
  quant: &'t [u16; 64],
}

/// Decodes one block's coefficients and transforms them.
fn decode_block(
  bits: &mut BitReader<'_>, part: &ScanPart<'_>, prediction: &mut i32, idct: &Idct, out: &mut [f32; 64],
) -> ImageResult<()> {
  let mut zigzag = [0_i32; 64];
  let category = part.dc.decode(bits)?;
  if category > 11 {
    return Err(ImageError::malformed("JPEG", "DC category above 11"));
  }
  *prediction = prediction.wrapping_add(bits.receive(category)?);
  zigzag[0] = prediction.wrapping_mul(i32::from(part.quant[0]));
  let mut k = 1;
  while k < 64 {
    let symbol = part.ac.decode(bits)?;
    let (run, category) = (usize::from(symbol >> 4), symbol & 0x0F);
    if category == 0 {
      if run == 15 {
        k += 16;
        continue;
      }
      // end of block
      break;
    }
    k += run;
    if k > 63 {
      return Err(ImageError::malformed("JPEG", "AC coefficients run past the end of the block"));
    }
    zigzag[k] = bits.receive(category)?.wrapping_mul(i32::from(part.quant[k]));
    k += 1;
  }
  let mut natural = [0_i32; 64];
  for (&z, &c) in ZIGZAG.iter().zip(zigzag.iter()) {
    natural[z] = c;
  }
  idct.transform(&natural, out);
  Ok(())
}

/// Decodes the entropy coded data of one scan into `planes`.
fn decode_scan(
  frame: &FrameHeader, scan: &ScanHeader, tables: &Tables, entropy: &[u8], planes: &mut [Plane],
  scratch: &mut Scratch,
) -> ImageResult<()> {
  let undefined_huffman = || ImageError::malformed("JPEG", "scan uses an undefined Huffman table");
  let mut parts = Vec::with_capacity(scan.components.len());
  for sc in scan.components.iter() {
    let quant_slot = usize::from(frame.components[sc.index].quant);
    parts.push(ScanPart {
      index: sc.index,
      dc: tables.dc[sc.dc_table].as_ref().ok_or_else(undefined_huffman)?,
      ac: tables.ac[sc.ac_table].as_ref().ok_or_else(undefined_huffman)?,
      quant: tables.quant[quant_slot]
        .as_ref()
        .ok_or(ImageError::malformed("JPEG", "component uses an undefined quantization table"))?,
    });
  }

  // a lone component is coded in its own block order, not by MCU
  let (units_x, units_y) = match parts.as_slice() {
    [only] => frame.component_blocks(only.index),
    _ => frame.mcu_grid(),
  };
  let total = units_x * units_y;
  let interval = match tables.restart_interval {
    0 => total,
    n => usize::from(n),
  };

  let idct = Idct::new();
  let mut block = [0.0_f32; 64];
  let mut predictions = vec![0_i32; parts.len()];
  let buffer = scratch.alloc(entropy.len())?;
  let mut unit = 0;
  for segment in restart_segments(entropy) {
    if unit >= total {
      if !segment.is_empty() {
        warn!("ignoring JPEG entropy data past the last MCU");
      }
      break;
    }
    let len = unstuff(segment, scratch.get_mut(buffer));
    let mut bits = BitReader::new(&scratch.get(buffer)[..len]);
    predictions.iter_mut().for_each(|p| *p = 0);
    let end = (unit + interval).min(total);
    while unit < end {
      let (ux, uy) = (unit % units_x, unit / units_x);
      if let [only] = parts.as_slice() {
        decode_block(&mut bits, only, &mut predictions[0], &idct, &mut block)?;
        planes[only.index].store_block(ux, uy, &block);
      } else {
        for (part, prediction) in parts.iter().zip(predictions.iter_mut()) {
          let c = frame.components[part.index];
          for by in 0..usize::from(c.v) {
            for bx in 0..usize::from(c.h) {
              decode_block(&mut bits, part, prediction, &idct, &mut block)?;
              let (px, py) = (ux * usize::from(c.h) + bx, uy * usize::from(c.v) + by);
              planes[part.index].store_block(px, py, &block);
            }
          }
        }
      }
      unit += 1;
    }
  }
  if unit < total {
    return Err(ImageError::malformed("JPEG", "entropy coded data ended early"));
  }
  trace!("JPEG scan of {} component(s), {total} units", parts.len());
  Ok(())
}

/// Upsamples, color converts, and writes the planes into `dst`.
fn write_pixels<P: Pixel>(frame: &FrameHeader, planes: &[Plane], dst: &mut ImageViewMut<'_, P>) -> ImageResult<()> {
  let format = PixelFormat::new(ScalarKind::Integer, 3, 1);
  let (max_h, max_v) = (usize::from(frame.max_h()), usize::from(frame.max_v()));
  let sample = |i: usize, x: usize, y: usize| {
    let c = frame.components[i];
    planes[i].at(x * usize::from(c.h) / max_h, y * usize::from(c.v) / max_v)
  };
  for y in 0..usize::from(frame.height) {
    let row = dst.row_mut(y as u32)?;
    for (x, p) in row.iter_mut().take(usize::from(frame.width)).enumerate() {
      let rgb = match planes.len() {
        1 => gray_to_rgb(sample(0, x, y)),
        _ => ycbcr_to_rgb(sample(0, x, y), sample(1, x, y), sample(2, x, y)),
      };
      read_pixel(p, format, &rgb)?;
    }
  }
  Ok(())
}

/// Decodes a whole JPEG held in memory into `dst`.
pub(crate) fn decode_jpeg<P: Pixel>(data: &[u8], dst: &mut ImageViewMut<'_, P>) -> ImageResult<FrameHeader> {
  if P::FORMAT.scalar != ScalarKind::Integer {
    return Err(ImageError::ScalarMismatch { from: ScalarKind::Integer, to: P::FORMAT.scalar });
  }
  let mut reader = SliceReader::new(data, Endian::Big);
  read_soi(&mut reader)?;
  let mut tables = Tables::default();
  let mut frame: Option<FrameHeader> = None;
  let mut planes = Vec::new();
  let mut scratch = Scratch::new();
  let mut payload = Vec::new();
  let mut scans = 0;
  loop {
    let (marker, offset) = read_marker(&mut reader)?;
    if marker == EOI {
      break;
    }
    if is_standalone(marker) {
      trace!("skipping stray JPEG marker 0xFF{marker:02X} at {offset}");
      continue;
    }
    read_segment(&mut reader, marker, offset, &mut payload)?;
    match marker {
      DQT => parse_dqt(offset, &payload, &mut tables.quant)?,
      DHT => parse_dht(offset, &payload, &mut tables.dc, &mut tables.ac)?,
      DRI => tables.restart_interval = parse_dri(offset, &payload)?,
      SOS => {
        let f = frame.as_ref().ok_or(ImageError::malformed("JPEG", "scan before frame header"))?;
        let scan = ScanHeader::parse(offset, &payload, f)?;
        let len = entropy_len(reader.rest());
        let entropy = reader.take(len)?;
        decode_scan(f, &scan, &tables, entropy, &mut planes, &mut scratch)?;
        scans += 1;
      }
      m if is_sof(m) => {
        if frame.is_some() {
          return Err(ImageError::BadMarker { marker, offset, reason: "second frame header" });
        }
        let f = FrameHeader::parse(marker, offset, &payload)?;
        check_frame(&f)?;
        check_destination(dst, u32::from(f.width), u32::from(f.height))?;
        planes = (0..f.components.len()).map(|i| Plane::new(&f, i)).collect::<ImageResult<_>>()?;
        frame = Some(f);
      }
      m => trace!("skipping JPEG segment 0xFF{m:02X}"),
    }
  }
  let frame = frame.ok_or(ImageError::malformed("JPEG", "no frame header before EOI"))?;
  if scans == 0 {
    return Err(ImageError::malformed("JPEG", "no scan before EOI"));
  }
  write_pixels(&frame, &planes, dst)?;
  debug!(
    "decoded {}x{} JPEG ({} component(s), {} scan(s))",
    frame.width,
    frame.height,
    frame.components.len(),
    scans
  );
  Ok(frame)
}

/// The baseline JPEG codec. Decode only.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;
impl Codec for JpegCodec {
  type Config = NoConfig;

  fn metadata<R: Read + Seek>(&self, source: &mut R) -> ImageResult<ImageMetadata> {
    let mut reader = StreamReader::new(source, Endian::Big)?;
    Ok(read_frame_header(&mut reader)?.metadata())
  }

  fn decode<R: Read + Seek, P: Pixel>(&self, source: &mut R, dst: &mut ImageViewMut<'_, P>) -> ImageResult<()> {
    let mut reader = StreamReader::new(source, Endian::Big)?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode_jpeg(&data, dst).map(|_| ())
  }

  fn encode<W: Write, P: Pixel>(&self, _: &mut W, _: &ImageView<'_, P>, _: &NoConfig) -> ImageResult<()> {
    Err(ImageError::Unsupported("JPEG encoding"))
  }
}
