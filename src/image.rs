#![forbid(unsafe_code)]

//! Owned images and borrowed rectangular views into them.
//!
//! [`Image`] owns a row-major `Vec` of exactly `width * height` pixels.
//! [`ImageView`] and [`ImageViewMut`] borrow a pixel slice and describe a
//! rectangle inside it with an origin offset and a row stride, so sub-views
//! never copy. Every coordinate is checked; out of range access is an
//! [`ImageError::OutOfBounds`], never a clamp.

use crate::{write_pixel, ImageError, ImageResult, Pixel, PixelFormat};

/// Converts an `(x,y)` position into a linear index for rows that are
/// `stride` pixels apart.
#[inline]
#[must_use]
pub const fn xy_stride_to_index(x: u32, y: u32, stride: u32) -> usize {
  y as usize * stride as usize + x as usize
}

/// Where a view sits inside its backing slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
  offset_x: u32,
  offset_y: u32,
  width: u32,
  height: u32,
  stride: u32,
}
impl Window {
  const fn full(width: u32, height: u32) -> Self {
    Self { offset_x: 0, offset_y: 0, width, height, stride: width }
  }

  fn out_of_bounds(&self, x: u32, y: u32, width: u32, height: u32) -> ImageError {
    ImageError::OutOfBounds {
      x,
      y,
      width,
      height,
      bound_width: self.width,
      bound_height: self.height,
    }
  }

  /// A sub-rectangle, relative to this window.
  fn sub(&self, width: u32, height: u32, x: u32, y: u32) -> ImageResult<Self> {
    let fits_x = x.checked_add(width).map_or(false, |r| r <= self.width);
    let fits_y = y.checked_add(height).map_or(false, |b| b <= self.height);
    if fits_x && fits_y {
      Ok(Self {
        offset_x: self.offset_x + x,
        offset_y: self.offset_y + y,
        width,
        height,
        stride: self.stride,
      })
    } else {
      Err(self.out_of_bounds(x, y, width, height))
    }
  }

  fn index(&self, x: u32, y: u32) -> ImageResult<usize> {
    if x < self.width && y < self.height {
      Ok(xy_stride_to_index(self.offset_x + x, self.offset_y + y, self.stride))
    } else {
      Err(self.out_of_bounds(x, y, 1, 1))
    }
  }

  fn row_range(&self, y: u32) -> ImageResult<core::ops::Range<usize>> {
    if y < self.height {
      let start = xy_stride_to_index(self.offset_x, self.offset_y + y, self.stride);
      Ok(start..start + self.width as usize)
    } else {
      Err(self.out_of_bounds(0, y, self.width, 1))
    }
  }

  fn same_size(&self, other: &Self) -> ImageResult<()> {
    if self.width == other.width && self.height == other.height {
      Ok(())
    } else {
      Err(self.out_of_bounds(0, 0, other.width, other.height))
    }
  }
}

fn checked_area(width: u32, height: u32) -> ImageResult<usize> {
  (width as usize).checked_mul(height as usize).ok_or(ImageError::CheckedMath)
}

/// An owned image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image<P> {
  width: u32,
  height: u32,
  pixels: Vec<P>,
}
impl<P: Pixel> Image<P> {
  /// Allocates a zeroed image.
  pub fn try_new(width: u32, height: u32) -> ImageResult<Self> {
    let count = checked_area(width, height)?;
    let mut pixels = Vec::new();
    pixels.try_reserve_exact(count)?;
    pixels.resize(count, P::zeroed());
    Ok(Self { width, height, pixels })
  }

  /// Wraps existing pixels, which must be exactly `width * height` long.
  pub fn from_pixels(width: u32, height: u32, pixels: Vec<P>) -> ImageResult<Self> {
    let count = checked_area(width, height)?;
    if pixels.len() != count {
      return Err(ImageError::BufferTooSmall { needed: count, got: pixels.len() });
    }
    Ok(Self { width, height, pixels })
  }

  /// Width in pixels.
  #[inline]
  #[must_use]
  pub const fn width(&self) -> u32 {
    self.width
  }

  /// Height in pixels.
  #[inline]
  #[must_use]
  pub const fn height(&self) -> u32 {
    self.height
  }

  /// All pixels, row-major.
  #[inline]
  #[must_use]
  pub fn pixels(&self) -> &[P] {
    &self.pixels
  }

  /// All pixels, row-major.
  #[inline]
  #[must_use]
  pub fn pixels_mut(&mut self) -> &mut [P] {
    &mut self.pixels
  }

  /// Unwraps the pixel vector.
  #[inline]
  #[must_use]
  pub fn into_pixels(self) -> Vec<P> {
    self.pixels
  }

  /// Views the whole image.
  #[inline]
  #[must_use]
  pub fn view(&self) -> ImageView<'_, P> {
    ImageView { pixels: &self.pixels, window: Window::full(self.width, self.height) }
  }

  /// Mutably views the whole image.
  #[inline]
  #[must_use]
  pub fn view_mut(&mut self) -> ImageViewMut<'_, P> {
    ImageViewMut { pixels: &mut self.pixels, window: Window::full(self.width, self.height) }
  }

  /// The pixel at `(x,y)`.
  #[inline]
  pub fn get(&self, x: u32, y: u32) -> ImageResult<&P> {
    let i = Window::full(self.width, self.height).index(x, y)?;
    Ok(&self.pixels[i])
  }

  /// The pixel at `(x,y)`.
  #[inline]
  pub fn get_mut(&mut self, x: u32, y: u32) -> ImageResult<&mut P> {
    let i = Window::full(self.width, self.height).index(x, y)?;
    Ok(&mut self.pixels[i])
  }
}

/// A borrowed, read-only rectangle of pixels.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, P> {
  pixels: &'a [P],
  window: Window,
}

/// A borrowed, writable rectangle of pixels.
#[derive(Debug)]
pub struct ImageViewMut<'a, P> {
  pixels: &'a mut [P],
  window: Window,
}

impl<'a, P: Pixel> ImageView<'a, P> {
  /// Views a row-major slice as a `width * height` image.
  pub fn from_slice(pixels: &'a [P], width: u32, height: u32) -> ImageResult<Self> {
    let needed = checked_area(width, height)?;
    if pixels.len() < needed {
      return Err(ImageError::BufferTooSmall { needed, got: pixels.len() });
    }
    Ok(Self { pixels, window: Window::full(width, height) })
  }

  /// Width in pixels.
  #[inline]
  #[must_use]
  pub const fn width(&self) -> u32 {
    self.window.width
  }

  /// Height in pixels.
  #[inline]
  #[must_use]
  pub const fn height(&self) -> u32 {
    self.window.height
  }

  /// The pixel at `(x,y)`, relative to this view.
  #[inline]
  pub fn get(&self, x: u32, y: u32) -> ImageResult<&'a P> {
    let i = self.window.index(x, y)?;
    Ok(&self.pixels[i])
  }

  /// Row `y` of this view.
  #[inline]
  pub fn row(&self, y: u32) -> ImageResult<&'a [P]> {
    let r = self.window.row_range(y)?;
    Ok(&self.pixels[r])
  }

  /// Every row, top to bottom.
  pub fn rows(&self) -> impl Iterator<Item = &'a [P]> {
    let this = *self;
    (0..this.height()).filter_map(move |y| this.row(y).ok())
  }

  /// A `width * height` sub-view at `(x,y)` relative to this view.
  #[inline]
  pub fn slice(&self, width: u32, height: u32, x: u32, y: u32) -> ImageResult<Self> {
    Ok(Self { pixels: self.pixels, window: self.window.sub(width, height, x, y)? })
  }

  /// Copies the view into a packed row-major pixel slice.
  pub fn copy_to(&self, dst: &mut [P]) -> ImageResult<()> {
    let needed = checked_area(self.width(), self.height())?;
    if dst.len() < needed {
      return Err(ImageError::BufferTooSmall { needed, got: dst.len() });
    }
    if self.width() == 0 {
      return Ok(());
    }
    for (row, out) in self.rows().zip(dst.chunks_exact_mut(self.width() as usize)) {
      out.copy_from_slice(row);
    }
    Ok(())
  }

  /// Serializes the view into packed row-major bytes laid out as `format`.
  pub fn copy_to_bytes(&self, format: PixelFormat, dst: &mut [u8]) -> ImageResult<()> {
    let bpp = format.bytes_per_pixel();
    let row_bytes = (self.width() as usize).checked_mul(bpp).ok_or(ImageError::CheckedMath)?;
    let needed = row_bytes.checked_mul(self.height() as usize).ok_or(ImageError::CheckedMath)?;
    if dst.len() < needed {
      return Err(ImageError::BufferTooSmall { needed, got: dst.len() });
    }
    if needed == 0 {
      return Ok(());
    }
    for (row, out) in self.rows().zip(dst.chunks_exact_mut(row_bytes)) {
      for (p, out) in row.iter().zip(out.chunks_exact_mut(bpp)) {
        write_pixel(p, format, out)?;
      }
    }
    Ok(())
  }

  /// Fills `dst` by nearest-neighbour sampling of this view, scaled to fit.
  pub fn resample_nearest(&self, dst: &mut ImageViewMut<'_, P>) -> ImageResult<()> {
    if dst.width() == 0 || dst.height() == 0 {
      return Ok(());
    }
    if self.width() == 0 || self.height() == 0 {
      return Err(self.window.out_of_bounds(0, 0, 1, 1));
    }
    let (sw, sh) = (u64::from(self.width()), u64::from(self.height()));
    let (dw, dh) = (u64::from(dst.width()), u64::from(dst.height()));
    for y in 0..dst.height() {
      let src_row = self.row((u64::from(y) * sh / dh) as u32)?;
      let dst_row = dst.row_mut(y)?;
      for (x, out) in dst_row.iter_mut().enumerate() {
        *out = src_row[(x as u64 * sw / dw) as usize];
      }
    }
    Ok(())
  }

  /// Writes this view and its successively halved copies side by side into
  /// `dst`: level 0 at x=0, and each further level directly to the right of
  /// the previous one, all along the top edge. Stops once a level would have
  /// a zero side. Gives the number of levels written.
  ///
  /// `dst` must be at least [`mip_chain_width`] wide and as tall as this view.
  pub fn mipmap(&self, dst: &mut ImageViewMut<'_, P>) -> ImageResult<u32> {
    let (w, h) = (self.width(), self.height());
    let needed = mip_chain_width(w, h);
    if dst.width() < needed || dst.height() < h {
      return Err(dst.window.out_of_bounds(0, 0, needed, h));
    }
    dst.slice_mut(w, h, 0, 0)?.fill_from(self)?;
    let mut levels = 1;
    let mut x = w;
    loop {
      let lw = w.checked_shr(levels).unwrap_or(0);
      let lh = h.checked_shr(levels).unwrap_or(0);
      if lw == 0 || lh == 0 {
        break;
      }
      let mut region = dst.slice_mut(lw, lh, x, 0)?;
      self.resample_nearest(&mut region)?;
      x += lw;
      levels += 1;
    }
    Ok(levels)
  }
}

/// The width a [`mipmap`](ImageView::mipmap) destination needs for a
/// `width * height` image: `width * (1 + 1/2 + 1/4 + ...)` over every level
/// with non-zero sides.
#[must_use]
pub const fn mip_chain_width(width: u32, height: u32) -> u32 {
  let mut total = 0;
  let mut level = 0;
  while level < 32 && (width >> level) > 0 && (height >> level) > 0 {
    total += width >> level;
    level += 1;
  }
  total
}

impl<'a, P: Pixel> ImageViewMut<'a, P> {
  /// Views a row-major slice as a writable `width * height` image.
  pub fn from_slice(pixels: &'a mut [P], width: u32, height: u32) -> ImageResult<Self> {
    let needed = checked_area(width, height)?;
    if pixels.len() < needed {
      return Err(ImageError::BufferTooSmall { needed, got: pixels.len() });
    }
    Ok(Self { pixels, window: Window::full(width, height) })
  }

  /// Width in pixels.
  #[inline]
  #[must_use]
  pub const fn width(&self) -> u32 {
    self.window.width
  }

  /// Height in pixels.
  #[inline]
  #[must_use]
  pub const fn height(&self) -> u32 {
    self.window.height
  }

  /// A read-only view of the same rectangle.
  #[inline]
  #[must_use]
  pub fn as_view(&self) -> ImageView<'_, P> {
    ImageView { pixels: &*self.pixels, window: self.window }
  }

  /// The pixel at `(x,y)`, relative to this view.
  #[inline]
  pub fn get(&self, x: u32, y: u32) -> ImageResult<&P> {
    let i = self.window.index(x, y)?;
    Ok(&self.pixels[i])
  }

  /// The pixel at `(x,y)`, relative to this view.
  #[inline]
  pub fn get_mut(&mut self, x: u32, y: u32) -> ImageResult<&mut P> {
    let i = self.window.index(x, y)?;
    Ok(&mut self.pixels[i])
  }

  /// Row `y` of this view.
  #[inline]
  pub fn row(&self, y: u32) -> ImageResult<&[P]> {
    let r = self.window.row_range(y)?;
    Ok(&self.pixels[r])
  }

  /// Row `y` of this view.
  #[inline]
  pub fn row_mut(&mut self, y: u32) -> ImageResult<&mut [P]> {
    let r = self.window.row_range(y)?;
    Ok(&mut self.pixels[r])
  }

  /// A `width * height` writable sub-view at `(x,y)` relative to this view.
  #[inline]
  pub fn slice_mut(&mut self, width: u32, height: u32, x: u32, y: u32) -> ImageResult<ImageViewMut<'_, P>> {
    let window = self.window.sub(width, height, x, y)?;
    Ok(ImageViewMut { pixels: &mut *self.pixels, window })
  }

  /// A `width * height` read-only sub-view at `(x,y)` relative to this view.
  #[inline]
  pub fn slice(&self, width: u32, height: u32, x: u32, y: u32) -> ImageResult<ImageView<'_, P>> {
    self.as_view().slice(width, height, x, y)
  }

  /// Splits into the rows above `y` and the rows from `y` down. The two
  /// halves never overlap, so they can be handed to different workers.
  pub fn split_at_row(self, y: u32) -> ImageResult<(ImageViewMut<'a, P>, ImageViewMut<'a, P>)> {
    let Self { pixels, window: w } = self;
    if y > w.height {
      return Err(w.out_of_bounds(0, y, w.width, 0));
    }
    let split = xy_stride_to_index(0, w.offset_y + y, w.stride).min(pixels.len());
    let (top, bottom) = pixels.split_at_mut(split);
    let top_window = Window { height: y, ..w };
    let bottom_window = Window { offset_y: 0, height: w.height - y, ..w };
    Ok((
      ImageViewMut { pixels: top, window: top_window },
      ImageViewMut { pixels: bottom, window: bottom_window },
    ))
  }

  /// Sets every pixel to `color`.
  pub fn fill(&mut self, color: P) {
    for y in 0..self.height() {
      if let Ok(row) = self.row_mut(y) {
        row.fill(color);
      }
    }
  }

  /// Copies every pixel from a same-sized view.
  pub fn fill_from(&mut self, src: &ImageView<'_, P>) -> ImageResult<()> {
    self.window.same_size(&src.window)?;
    for y in 0..self.height() {
      self.row_mut(y)?.copy_from_slice(src.row(y)?);
    }
    Ok(())
  }

  /// Flips the view top to bottom, in place.
  pub fn flip_vertical(&mut self) {
    let w = self.window;
    let width = w.width as usize;
    for y in 0..w.height / 2 {
      let top = xy_stride_to_index(w.offset_x, w.offset_y + y, w.stride);
      let bottom = xy_stride_to_index(w.offset_x, w.offset_y + w.height - 1 - y, w.stride);
      let (low, high) = self.pixels.split_at_mut(bottom);
      low[top..top + width].swap_with_slice(&mut high[..width]);
    }
  }

  /// Flips the view left to right, in place.
  pub fn flip_horizontal(&mut self) {
    for y in 0..self.height() {
      if let Ok(row) = self.row_mut(y) {
        row.reverse();
      }
    }
  }

  /// Copies the view into a packed row-major pixel slice.
  #[inline]
  pub fn copy_to(&self, dst: &mut [P]) -> ImageResult<()> {
    self.as_view().copy_to(dst)
  }

  /// Serializes the view into packed row-major bytes laid out as `format`.
  #[inline]
  pub fn copy_to_bytes(&self, format: PixelFormat, dst: &mut [u8]) -> ImageResult<()> {
    self.as_view().copy_to_bytes(format, dst)
  }
}
