#![forbid(unsafe_code)]

//! Radiance RGBE (`.hdr`) decoding.
//!
//! * [Format notes](https://www.graphics.cornell.edu/~bjw/rgbe.html)
//!
//! The file starts with a text header: a `#?RADIANCE` (or `#?RGBE`) line,
//! then `KEY=VALUE` lines up to a blank line, then a resolution line such as
//! `-Y 480 +X 640`. Pixels follow, one scanline at a time, as four bytes
//! each: a red, green, and blue mantissa sharing the exponent byte.
//!
//! Scanlines between 8 and 32767 pixels wide are usually run length coded one
//! channel at a time. Anything else is read as flat RGBE.
//!
//! Pixels decode as three `f32` channels, so the destination must have float
//! channels. Encoding is not supported.

use std::io::{Read, Seek, Write};

use log::{debug, trace};

use crate::{
  check_destination, read_pixel, Codec, DataReader, Endian, ImageError, ImageMetadata, ImageResult, ImageView,
  ImageViewMut, NoConfig, Pixel, PixelFormat, ScalarKind, SliceReader, StreamReader,
};

/// The only pixel format we decode.
const RGBE_FORMAT: &str = "32-bit_rle_rgbe";

/// Scanlines in this width range may be run length coded.
const RLE_WIDTHS: core::ops::RangeInclusive<u32> = 8..=0x7FFF;

/// The text header of an HDR file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HdrHeader {
  /// Width in pixels.
  pub width: u32,
  /// Height in pixels.
  pub height: u32,
  /// `EXPOSURE` multiplier, if the header gave one. Not applied.
  pub exposure: Option<f32>,
  /// `GAMMA`, if the header gave one. Not applied.
  pub gamma: Option<f32>,
}
impl HdrHeader {
  /// Metadata for this header.
  #[inline]
  #[must_use]
  pub const fn metadata(&self) -> ImageMetadata {
    ImageMetadata { channels: 3, bit_depth: 32, width: self.width, height: self.height, depth: 1 }
  }
}

fn read_line<R: Read + Seek>(reader: &mut StreamReader<R>, line: &mut Vec<u8>) -> ImageResult<()> {
  line.clear();
  reader.read_until(b'\n', line)?;
  Ok(())
}

fn parse_number<T: core::str::FromStr>(text: &str) -> ImageResult<T> {
  text.trim().parse().map_err(|_| ImageError::malformed("HDR", "bad number in header"))
}

/// Reads the header, leaving `reader` at the first scanline.
fn read_header<R: Read + Seek>(reader: &mut StreamReader<R>) -> ImageResult<HdrHeader> {
  let mut line = Vec::new();
  let magic: [u8; 2] = reader.read_array().map_err(|_| ImageError::BadSignature { format: "HDR" })?;
  if &magic != b"#?" {
    return Err(ImageError::BadSignature { format: "HDR" });
  }
  read_line(reader, &mut line)?;
  if !matches!(line.as_slice(), b"RADIANCE" | b"RGBE") {
    return Err(ImageError::BadSignature { format: "HDR" });
  }

  let mut header = HdrHeader::default();
  let mut format_seen = false;
  loop {
    read_line(reader, &mut line)?;
    if line.is_empty() {
      break;
    }
    let text = String::from_utf8_lossy(&line);
    if text.starts_with('#') {
      continue;
    }
    match text.split_once('=') {
      Some(("FORMAT", value)) => {
        if value.trim() != RGBE_FORMAT {
          return Err(ImageError::Unsupported("HDR pixel format other than 32-bit_rle_rgbe"));
        }
        format_seen = true;
      }
      Some(("EXPOSURE", value)) => header.exposure = Some(parse_number(value)?),
      Some(("GAMMA", value)) => header.gamma = Some(parse_number(value)?),
      _ => trace!("skipping HDR header line {text:?}"),
    }
  }
  if !format_seen {
    return Err(ImageError::malformed("HDR", "no FORMAT line in header"));
  }

  read_line(reader, &mut line)?;
  let text = String::from_utf8_lossy(&line);
  let fields: Vec<&str> = text.split_ascii_whitespace().collect();
  match fields.as_slice() {
    ["-Y", h, "+X", w] => {
      header.height = parse_number(h)?;
      header.width = parse_number(w)?;
    }
    [_, _, _, _] => return Err(ImageError::Unsupported("HDR orientation other than -Y +X")),
    _ => return Err(ImageError::malformed("HDR", "bad resolution line")),
  }
  if header.width == 0 || header.height == 0 {
    return Err(ImageError::WidthOrHeightZero);
  }
  trace!("HDR {header:?}");
  Ok(header)
}

/// Decodes one run length coded channel into every fourth byte of `rgbe`.
fn read_rle_channel(reader: &mut SliceReader<'_>, rgbe: &mut [u8], channel: usize) -> ImageResult<()> {
  let width = rgbe.len() / 4;
  let mut x = 0;
  while x < width {
    let count = reader.read_u8()?;
    let (run, len) = if count > 128 { (true, usize::from(count - 128)) } else { (false, usize::from(count)) };
    if len == 0 || len > width - x {
      return Err(ImageError::malformed("HDR", "scanline run overflows the row"));
    }
    if run {
      let v = reader.read_u8()?;
      for px in rgbe[x * 4..(x + len) * 4].chunks_exact_mut(4) {
        px[channel] = v;
      }
    } else {
      let literal = reader.take(len)?;
      for (px, &v) in rgbe[x * 4..(x + len) * 4].chunks_exact_mut(4).zip(literal) {
        px[channel] = v;
      }
    }
    x += len;
  }
  Ok(())
}

/// Reads one scanline of RGBE bytes, run length coded or flat.
fn read_scanline(reader: &mut SliceReader<'_>, rgbe: &mut [u8]) -> ImageResult<()> {
  let width = (rgbe.len() / 4) as u32;
  let rle = match *reader.rest() {
    [2, 2, hi, lo, ..] if RLE_WIDTHS.contains(&width) && hi & 0x80 == 0 => {
      if u32::from(u16::from_be_bytes([hi, lo])) != width {
        return Err(ImageError::malformed("HDR", "scanline width does not match header"));
      }
      true
    }
    _ => false,
  };
  if rle {
    reader.skip(4)?;
    for channel in 0..4 {
      read_rle_channel(reader, rgbe, channel)?;
    }
    Ok(())
  } else {
    reader.read(rgbe)
  }
}

/// Turns shared exponent bytes into linear floats.
#[inline]
#[must_use]
pub fn rgbe_to_rgb([r, g, b, e]: [u8; 4]) -> [f32; 3] {
  if e == 0 {
    return [0.0; 3];
  }
  let f = 2.0_f64.powi(i32::from(e) - 136);
  [(f64::from(r) * f) as f32, (f64::from(g) * f) as f32, (f64::from(b) * f) as f32]
}

/// The Radiance RGBE codec. Decode only.
#[derive(Debug, Clone, Copy, Default)]
pub struct HdrCodec;
impl HdrCodec {
  /// Reads the text header.
  pub fn read_header<R: Read + Seek>(&self, source: &mut R) -> ImageResult<HdrHeader> {
    read_header(&mut StreamReader::new(source, Endian::Big)?)
  }
}
impl Codec for HdrCodec {
  type Config = NoConfig;

  fn metadata<R: Read + Seek>(&self, source: &mut R) -> ImageResult<ImageMetadata> {
    Ok(self.read_header(source)?.metadata())
  }

  fn decode<R: Read + Seek, P: Pixel>(&self, source: &mut R, dst: &mut ImageViewMut<'_, P>) -> ImageResult<()> {
    let mut reader = StreamReader::new(source, Endian::Big)?;
    let header = read_header(&mut reader)?;
    check_destination(dst, header.width, header.height)?;
    if P::FORMAT.scalar != ScalarKind::Float {
      return Err(ImageError::ScalarMismatch { from: ScalarKind::Float, to: P::FORMAT.scalar });
    }
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    let mut pixels = SliceReader::new(&data, Endian::Big);

    let width = header.width as usize;
    let mut rgbe = Vec::new();
    rgbe.try_reserve(width * 4)?;
    rgbe.resize(width * 4, 0);
    let format = PixelFormat::new(ScalarKind::Float, 3, 4);
    let mut bytes = [0_u8; 12];
    for y in 0..header.height {
      read_scanline(&mut pixels, &mut rgbe)?;
      let row = dst.row_mut(y)?;
      for (p, px) in row.iter_mut().zip(rgbe.chunks_exact(4)) {
        let rgb = rgbe_to_rgb([px[0], px[1], px[2], px[3]]);
        for (out, c) in bytes.chunks_exact_mut(4).zip(rgb) {
          out.copy_from_slice(&c.to_be_bytes());
        }
        read_pixel(p, format, &bytes)?;
      }
    }
    debug!("decoded {}x{} HDR", header.width, header.height);
    Ok(())
  }

  fn encode<W: Write, P: Pixel>(&self, _: &mut W, _: &ImageView<'_, P>, _: &NoConfig) -> ImageResult<()> {
    Err(ImageError::Unsupported("HDR encoding"))
  }
}
