#![forbid(unsafe_code)]

use core::fmt::Write;

/// An array of bytes expected to contain ascii data, such as a PNG chunk tag.
///
/// Nothing enforces the encoding. The `Debug` and `Display` impls just `as`
/// cast each byte to a `char`, which is exactly right for ascii and still
/// harmless for anything else.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct AsciiArray<const N: usize>(pub [u8; N]);

impl<const N: usize> AsciiArray<N> {
  /// The raw bytes.
  #[inline]
  #[must_use]
  pub const fn as_bytes(&self) -> &[u8; N] {
    &self.0
  }

  /// If every byte is an ascii letter.
  #[inline]
  #[must_use]
  pub fn is_alphabetic(&self) -> bool {
    self.0.iter().all(u8::is_ascii_alphabetic)
  }
}

impl<const N: usize> Default for AsciiArray<N> {
  #[inline]
  #[must_use]
  fn default() -> Self {
    Self([0; N])
  }
}

impl<const N: usize> core::fmt::Debug for AsciiArray<N> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_char('\"')?;
    core::fmt::Display::fmt(self, f)?;
    f.write_char('\"')
  }
}
impl<const N: usize> core::fmt::Display for AsciiArray<N> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for ch in self.0.iter().copied().map(|u| u as char) {
      f.write_char(ch)?;
    }
    Ok(())
  }
}

impl<const N: usize> From<[u8; N]> for AsciiArray<N> {
  #[inline]
  #[must_use]
  fn from(array: [u8; N]) -> Self {
    Self(array)
  }
}

impl<const N: usize> PartialEq<[u8; N]> for AsciiArray<N> {
  #[inline]
  fn eq(&self, other: &[u8; N]) -> bool {
    &self.0 == other
  }
}

#[test]
fn test_ascii_array_fmt() {
  let tag = AsciiArray(*b"IHDR");
  assert_eq!(format!("{tag}"), "IHDR");
  assert_eq!(format!("{tag:?}"), "\"IHDR\"");
  assert!(tag.is_alphabetic());
  assert!(!AsciiArray(*b"IH1R").is_alphabetic());
}
