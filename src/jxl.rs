#![forbid(unsafe_code)]

//! JPEG XL recognition.
//!
//! Nothing past the signature is parsed. Every [`Codec`] operation checks the
//! signature, so a file that isn't JPEG XL at all fails as malformed, and a
//! real JPEG XL file fails as [`Unsupported`](crate::ErrorKind::Unsupported).

use std::io::{Read, Seek, Write};

use crate::{
  Codec, DataReader, Endian, ImageError, ImageMetadata, ImageResult, ImageView, ImageViewMut, NoConfig, Pixel,
  StreamReader,
};

/// Signature of a bare JPEG XL codestream.
pub const JXL_CODESTREAM_SIGNATURE: [u8; 2] = [0xFF, 0x0A];

/// Signature of a JPEG XL file in the ISO BMFF container.
pub const JXL_CONTAINER_SIGNATURE: [u8; 12] =
  [0x00, 0x00, 0x00, 0x0C, b'J', b'X', b'L', b' ', 0x0D, 0x0A, 0x87, 0x0A];

/// How a JPEG XL file is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JxlKind {
  /// A bare codestream.
  Codestream,
  /// Boxes, one of which holds the codestream.
  Container,
}

/// Checks the leading bytes of `bytes`.
#[must_use]
pub fn detect(bytes: &[u8]) -> Option<JxlKind> {
  if bytes.starts_with(&JXL_CODESTREAM_SIGNATURE) {
    Some(JxlKind::Codestream)
  } else if bytes.starts_with(&JXL_CONTAINER_SIGNATURE) {
    Some(JxlKind::Container)
  } else {
    None
  }
}

/// The JPEG XL codec, which only recognises files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JxlCodec;
impl JxlCodec {
  /// Reads the signature.
  pub fn read_kind<R: Read + Seek>(&self, source: &mut R) -> ImageResult<JxlKind> {
    let mut reader = StreamReader::new(source, Endian::Big)?;
    let mut head = [0_u8; 12];
    // a codestream can be shorter than the container signature
    reader.read(&mut head[..2]).map_err(|_| ImageError::BadSignature { format: "JXL" })?;
    if head[..2] != JXL_CODESTREAM_SIGNATURE {
      reader.read(&mut head[2..]).map_err(|_| ImageError::BadSignature { format: "JXL" })?;
    }
    detect(&head).ok_or(ImageError::BadSignature { format: "JXL" })
  }
}
impl Codec for JxlCodec {
  type Config = NoConfig;

  fn metadata<R: Read + Seek>(&self, source: &mut R) -> ImageResult<ImageMetadata> {
    self.read_kind(source)?;
    Err(ImageError::Unsupported("JPEG XL"))
  }

  fn decode<R: Read + Seek, P: Pixel>(&self, source: &mut R, _: &mut ImageViewMut<'_, P>) -> ImageResult<()> {
    self.read_kind(source)?;
    Err(ImageError::Unsupported("JPEG XL"))
  }

  fn encode<W: Write, P: Pixel>(&self, _: &mut W, _: &ImageView<'_, P>, _: &NoConfig) -> ImageResult<()> {
    Err(ImageError::Unsupported("JPEG XL encoding"))
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;
  use crate::{ErrorKind, Image, Rgb24};

  #[test]
  fn test_detect() {
    assert_eq!(detect(&[0xFF, 0x0A, 0xFA]), Some(JxlKind::Codestream));
    assert_eq!(detect(&JXL_CONTAINER_SIGNATURE), Some(JxlKind::Container));
    assert_eq!(detect(&[0xFF, 0xD8]), None);
    assert_eq!(detect(&[]), None);
  }

  #[test]
  fn test_codec_reports_unsupported() {
    let mut img = Image::<Rgb24>::try_new(1, 1).unwrap();
    for bytes in [&[0xFF, 0x0A][..], &JXL_CONTAINER_SIGNATURE[..]] {
      assert!(JxlCodec.read_kind(&mut Cursor::new(bytes)).is_ok());
      let err = JxlCodec.metadata(&mut Cursor::new(bytes)).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Unsupported);
      let err = JxlCodec.decode(&mut Cursor::new(bytes), &mut img.view_mut()).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
    for bytes in [&b"GIF89a"[..], &[0xFF][..], &[0x00, 0x00, 0x00, 0x0C, b'f', b't'][..]] {
      let err = JxlCodec.metadata(&mut Cursor::new(bytes)).unwrap_err();
      assert!(matches!(err, ImageError::BadSignature { format: "JXL" }));
    }
    assert_eq!(JxlCodec.encode_default(&mut Vec::new(), &img.view()).unwrap_err().kind(), ErrorKind::Unsupported);
  }
}
