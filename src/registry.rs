#![forbid(unsafe_code)]

//! Picking a codec by file extension.
//!
//! A [`FormatRegistry`] is an ordinary value: build one at startup (usually
//! with [`FormatRegistry::default`]) and pass it to whatever loads images.
//! Lookups lowercase the extension first, so `"PNG"` and `".png"` both find
//! the PNG codec.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::{
  Codec, Image, ImageError, ImageFormat, ImageMetadata, ImageResult, ImageView, ImageViewMut, Limits, Pixel,
};

/// Runs `$body` with `$codec` bound to the codec for `$format`.
macro_rules! with_codec {
  ($format:expr, |$codec:ident| $body:expr) => {
    match $format {
      #[cfg(feature = "png")]
      ImageFormat::Png => {
        let $codec = crate::png::PngCodec;
        $body
      }
      #[cfg(feature = "jpeg")]
      ImageFormat::Jpeg => {
        let $codec = crate::jpeg::JpegCodec;
        $body
      }
      #[cfg(feature = "hdr")]
      ImageFormat::Hdr => {
        let $codec = crate::hdr::HdrCodec;
        $body
      }
      #[cfg(feature = "exr")]
      ImageFormat::Exr => {
        let $codec = crate::exr::ExrCodec;
        $body
      }
      ImageFormat::Jxl => {
        let $codec = crate::jxl::JxlCodec;
        $body
      }
      #[allow(unreachable_patterns)]
      _ => Err(ImageError::Unsupported("format support not compiled in")),
    }
  };
}

/// Maps file extensions to image formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRegistry {
  table: Vec<(String, ImageFormat)>,
  limits: Limits,
}
impl Default for FormatRegistry {
  /// `png`, `jpg`, `jpeg`, `hdr`, `exr`, and `jxl`, with default [`Limits`].
  fn default() -> Self {
    let mut r = Self::new();
    for (ext, format) in [
      ("png", ImageFormat::Png),
      ("jpg", ImageFormat::Jpeg),
      ("jpeg", ImageFormat::Jpeg),
      ("hdr", ImageFormat::Hdr),
      ("exr", ImageFormat::Exr),
      ("jxl", ImageFormat::Jxl),
    ] {
      r.register(ext, format);
    }
    r
  }
}
impl FormatRegistry {
  /// A registry that knows no extensions.
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self { table: Vec::new(), limits: Limits::default() }
  }

  /// Replaces the size limits checked by [`load`](Self::load).
  #[inline]
  #[must_use]
  pub fn with_limits(self, limits: Limits) -> Self {
    Self { limits, ..self }
  }

  /// The size limits checked before allocating.
  #[inline]
  #[must_use]
  pub fn limits(&self) -> Limits {
    self.limits
  }

  /// Maps `ext` (with or without a leading dot, any case) to `format`,
  /// giving the format it was mapped to before, if any.
  pub fn register(&mut self, ext: &str, format: ImageFormat) -> Option<ImageFormat> {
    let ext = normalize(ext);
    match self.table.iter_mut().find(|(e, _)| *e == ext) {
      Some((_, f)) => Some(core::mem::replace(f, format)),
      None => {
        self.table.push((ext, format));
        None
      }
    }
  }

  /// Forgets `ext`, giving the format it was mapped to.
  pub fn unregister(&mut self, ext: &str) -> Option<ImageFormat> {
    let ext = normalize(ext);
    let i = self.table.iter().position(|(e, _)| *e == ext)?;
    Some(self.table.remove(i).1)
  }

  /// The format for a file extension.
  pub fn format_for_extension(&self, ext: &str) -> ImageResult<ImageFormat> {
    let ext = normalize(ext);
    self.table.iter().find(|(e, _)| *e == ext).map(|(_, f)| *f).ok_or(ImageError::UnknownFormat(ext))
  }

  /// The format for a path, by its extension.
  pub fn format_for_path(&self, path: impl AsRef<Path>) -> ImageResult<ImageFormat> {
    match path.as_ref().extension() {
      Some(ext) => self.format_for_extension(&ext.to_string_lossy()),
      None => Err(ImageError::UnknownFormat(String::new())),
    }
  }

  /// Reads the metadata of a `format` image.
  pub fn metadata<R: Read + Seek>(&self, format: ImageFormat, source: &mut R) -> ImageResult<ImageMetadata> {
    with_codec!(format, |codec| codec.metadata(source))
  }

  /// Decodes a `format` image into `dst`.
  pub fn decode<R: Read + Seek, P: Pixel>(
    &self, format: ImageFormat, source: &mut R, dst: &mut ImageViewMut<'_, P>,
  ) -> ImageResult<()> {
    with_codec!(format, |codec| codec.decode(source, dst))
  }

  /// Encodes `src` as `format`, with settings derived from `P`.
  pub fn encode<W: Write, P: Pixel>(&self, format: ImageFormat, sink: &mut W, src: &ImageView<'_, P>) -> ImageResult<()> {
    with_codec!(format, |codec| codec.encode_default(sink, src))
  }

  /// Decodes a `format` image into a new buffer of exactly its size.
  ///
  /// The source is read twice: once for the metadata, then again from the
  /// same starting position for the pixels.
  pub fn load_from<R: Read + Seek, P: Pixel>(&self, format: ImageFormat, source: &mut R) -> ImageResult<Image<P>> {
    let start = source.stream_position()?;
    let meta = self.metadata(format, source)?;
    self.limits.check(&meta)?;
    let mut img = Image::try_new(meta.width, meta.height)?;
    source.seek(SeekFrom::Start(start))?;
    self.decode(format, source, &mut img.view_mut())?;
    debug!("loaded {}x{} {} image", meta.width, meta.height, format.name());
    Ok(img)
  }

  /// Loads the image file at `path`.
  pub fn load<P: Pixel>(&self, path: impl AsRef<Path>) -> ImageResult<Image<P>> {
    let format = self.format_for_path(&path)?;
    let mut source = BufReader::new(File::open(path)?);
    self.load_from(format, &mut source)
  }

  /// Decodes the image file at `path` into `dst`.
  pub fn load_into<P: Pixel>(&self, path: impl AsRef<Path>, dst: &mut ImageViewMut<'_, P>) -> ImageResult<()> {
    let format = self.format_for_path(&path)?;
    let mut source = BufReader::new(File::open(path)?);
    self.decode(format, &mut source, dst)
  }

  /// Writes `src` to a file at `path`, in the format its extension names.
  pub fn save<P: Pixel>(&self, path: impl AsRef<Path>, src: &ImageView<'_, P>) -> ImageResult<()> {
    let format = self.format_for_path(&path)?;
    let mut sink = BufWriter::new(File::create(path)?);
    self.encode(format, &mut sink, src)?;
    sink.flush()?;
    Ok(())
  }
}

fn normalize(ext: &str) -> String {
  ext.strip_prefix('.').unwrap_or(ext).to_ascii_lowercase()
}
