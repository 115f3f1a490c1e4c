#![cfg_attr(docs_rs, feature(doc_cfg))]
#![warn(missing_docs)]

//! A crate for decoding and encoding raster images.
//!
//! Every format decodes into the same generic pixel buffers: [`Image`] owns
//! the pixels, while [`ImageView`] and [`ImageViewMut`] borrow rectangles of
//! them. Pixels are [`Rgb`] or [`Rgba`] over `u8`, `u16`, `f32`, or `f64`
//! channels, and the [`pixel_formats`] engine converts between any file's
//! layout and the pixel type you asked for.
//!
//! * [`png`]: decode and encode (feature `png`).
//! * [`jpeg`]: baseline decode (feature `jpeg`).
//! * [`hdr`]: Radiance RGBE decode (feature `hdr`).
//! * [`exr`]: OpenEXR header and metadata (feature `exr`).
//! * [`jxl`]: JPEG XL signature recognition only.
//!
//! Use a [`FormatRegistry`] to pick the codec by file extension:
//!
//! ```no_run
//! # fn main() -> imagelib::ImageResult<()> {
//! use imagelib::{FormatRegistry, Rgba32};
//! let registry = FormatRegistry::default();
//! let img = registry.load::<Rgba32>("picture.png")?;
//! registry.save("copy.png", &img.view())?;
//! # Ok(())
//! # }
//! ```
//!
//! Log messages go through the [`log`] facade. No logger is installed.

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

pub mod error;
pub use error::*;

pub mod binary;
pub use binary::*;

pub mod ascii_array;
pub use ascii_array::*;

pub mod pixel;
pub use pixel::*;

pub mod bit_depth_changes;
pub use bit_depth_changes::*;

pub mod pixel_formats;
pub use pixel_formats::*;

pub mod image;
pub use image::*;

pub mod format;
pub use format::*;

pub mod registry;
pub use registry::*;

pub(crate) mod scratch;

#[cfg(feature = "png")]
#[cfg_attr(docs_rs, doc(cfg(feature = "png")))]
pub mod zlib;

#[cfg(feature = "png")]
#[cfg_attr(docs_rs, doc(cfg(feature = "png")))]
pub mod png;

#[cfg(feature = "jpeg")]
#[cfg_attr(docs_rs, doc(cfg(feature = "jpeg")))]
pub mod jpeg;

#[cfg(feature = "hdr")]
#[cfg_attr(docs_rs, doc(cfg(feature = "hdr")))]
pub mod hdr;

#[cfg(feature = "exr")]
#[cfg_attr(docs_rs, doc(cfg(feature = "exr")))]
pub mod exr;

pub mod jxl;

/// Used by various image formats that support sRGB colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
// No byte conversions here: each format encodes these options differently.
pub enum SrgbIntent {
  /// for images preferring good adaptation to the output device gamut at the
  /// expense of colorimetric accuracy, such as photographs.
  Perceptual,
  /// for images requiring colour appearance matching (relative to the output
  /// device white point), such as logos.
  RelativeColorimetric,
  /// for images preferring preservation of saturation at the expense of hue and
  /// lightness, such as charts and graphs.
  Saturation,
  /// for images requiring preservation of absolute colorimetry, such as
  /// previews of images destined for a different output device (proofs).
  AbsoluteColorimetric,
}
