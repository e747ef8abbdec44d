//! Owned RGBA images, plus the rectangle operations that frame composition is
//! built out of.

use alloc::{collections::TryReserveError, vec, vec::Vec};
use core::ops::Range;

use crate::RGBA8888;

/// Converts an `(x,y)` position within a given `width` 2D space into a linear
/// index.
#[inline]
#[must_use]
pub const fn xy_width_to_index(x: u32, y: u32, width: u32) -> usize {
  (y as usize) * (width as usize) + (x as usize)
}

/// A rectangular area of an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct Region {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}
impl Region {
  /// The region covering an entire `width` by `height` image.
  #[inline]
  #[must_use]
  pub const fn full(width: u32, height: u32) -> Self {
    Self { x: 0, y: 0, width, height }
  }

  /// If the region has no pixels.
  #[inline]
  #[must_use]
  pub const fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  /// If the region lies entirely within a `width` by `height` image.
  #[inline]
  #[must_use]
  pub const fn fits_within(&self, width: u32, height: u32) -> bool {
    match (self.x.checked_add(self.width), self.y.checked_add(self.height)) {
      (Some(right), Some(bottom)) => right <= width && bottom <= height,
      _ => false,
    }
  }

  /// Number of pixels in the region.
  #[inline]
  #[must_use]
  pub const fn pixel_count(&self) -> usize {
    (self.width as usize) * (self.height as usize)
  }
}

/// The index range of each row of `region`, within an image `image_width`
/// pixels wide.
fn row_ranges(image_width: u32, region: Region) -> impl Iterator<Item = Range<usize>> {
  (region.y..region.y + region.height).map(move |y| {
    let start = xy_width_to_index(region.x, y, image_width);
    start..start + region.width as usize
  })
}

/// An owned direct-color image.
///
/// The fields are public, but if you put them together weirdly (a pixel
/// buffer that isn't `width * height` long) the region methods of this type
/// might panic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct Bitmap {
  pub width: u32,
  pub height: u32,
  pub pixels: Vec<RGBA8888>,
}
impl Bitmap {
  /// A fully transparent image.
  #[inline]
  #[must_use]
  pub fn new(width: u32, height: u32) -> Self {
    Self::filled(width, height, RGBA8888::TRANSPARENT)
  }

  /// An image where every pixel is `color`.
  #[inline]
  #[must_use]
  pub fn filled(width: u32, height: u32, color: RGBA8888) -> Self {
    Self { width, height, pixels: vec![color; Region::full(width, height).pixel_count()] }
  }

  /// A fully transparent image, reporting allocation failure instead of
  /// aborting.
  ///
  /// Decoding uses this since the size comes from untrusted data.
  #[inline]
  pub fn try_new(width: u32, height: u32) -> Result<Self, TryReserveError> {
    let count = Region::full(width, height).pixel_count();
    let mut pixels: Vec<RGBA8888> = Vec::new();
    pixels.try_reserve_exact(count)?;
    pixels.resize(count, RGBA8888::TRANSPARENT);
    Ok(Self { width, height, pixels })
  }

  /// Wraps an existing pixel buffer, or `None` if the buffer length is wrong.
  #[inline]
  #[must_use]
  pub fn from_pixels(width: u32, height: u32, pixels: Vec<RGBA8888>) -> Option<Self> {
    if pixels.len() == Region::full(width, height).pixel_count() {
      Some(Self { width, height, pixels })
    } else {
      None
    }
  }

  /// `(width, height)`
  #[inline]
  #[must_use]
  pub const fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  /// If the pixel buffer length agrees with the dimensions.
  #[inline]
  #[must_use]
  pub fn is_consistent(&self) -> bool {
    self.pixels.len() == Region::full(self.width, self.height).pixel_count()
  }

  /// Gets the pixel at the position, or `None` if the position is out of
  /// bounds.
  #[inline]
  #[must_use]
  pub fn get(&self, x: u32, y: u32) -> Option<&RGBA8888> {
    if x < self.width && y < self.height {
      self.pixels.get(xy_width_to_index(x, y, self.width))
    } else {
      None
    }
  }

  /// Gets the pixel at the position, or `None` if the position is out of
  /// bounds.
  #[inline]
  #[must_use]
  pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut RGBA8888> {
    if x < self.width && y < self.height {
      self.pixels.get_mut(xy_width_to_index(x, y, self.width))
    } else {
      None
    }
  }

  /// The pixel data as bytes, `RGBA` order, rows top to bottom.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.pixels)
  }

  /// Copies the pixels of `region` out, row by row.
  #[must_use]
  pub fn copy_region(&self, region: Region) -> Vec<RGBA8888> {
    debug_assert!(region.fits_within(self.width, self.height));
    let mut out = Vec::with_capacity(region.pixel_count());
    for range in row_ranges(self.width, region) {
      out.extend_from_slice(&self.pixels[range]);
    }
    out
  }

  /// Sets every pixel of `region` to `color`.
  pub fn fill_region(&mut self, region: Region, color: RGBA8888) {
    debug_assert!(region.fits_within(self.width, self.height));
    for range in row_ranges(self.width, region) {
      self.pixels[range].fill(color);
    }
  }

  /// Replaces the pixels of `region` with `src` (given row by row).
  pub fn write_region(&mut self, region: Region, src: &[RGBA8888]) {
    debug_assert!(region.fits_within(self.width, self.height));
    debug_assert_eq!(src.len(), region.pixel_count());
    if region.is_empty() {
      return;
    }
    for (range, src_row) in row_ranges(self.width, region).zip(src.chunks_exact(region.width as usize))
    {
      self.pixels[range].copy_from_slice(src_row);
    }
  }

  /// Composites `src` (given row by row) over the pixels of `region`.
  pub fn blend_region(&mut self, region: Region, src: &[RGBA8888]) {
    debug_assert!(region.fits_within(self.width, self.height));
    debug_assert_eq!(src.len(), region.pixel_count());
    if region.is_empty() {
      return;
    }
    for (range, src_row) in row_ranges(self.width, region).zip(src.chunks_exact(region.width as usize))
    {
      for (dst, src) in self.pixels[range].iter_mut().zip(src_row) {
        *dst = src.over(*dst);
      }
    }
  }
}

#[test]
fn test_region_fits_within() {
  assert!(Region { x: 2, y: 1, width: 2, height: 3 }.fits_within(4, 4));
  assert!(!Region { x: 3, y: 0, width: 2, height: 1 }.fits_within(4, 4));
  assert!(!Region { x: u32::MAX, y: 0, width: 2, height: 1 }.fits_within(4, 4));
}

#[test]
fn test_region_ops() {
  let red = RGBA8888::opaque(255, 0, 0);
  let blue = RGBA8888::opaque(0, 0, 255);
  let mut bitmap = Bitmap::filled(4, 3, red);
  let region = Region { x: 1, y: 1, width: 2, height: 2 };
  bitmap.fill_region(region, blue);
  assert_eq!(bitmap.get(0, 0), Some(&red));
  assert_eq!(bitmap.get(1, 1), Some(&blue));
  assert_eq!(bitmap.get(2, 2), Some(&blue));
  assert_eq!(bitmap.get(3, 2), Some(&red));
  assert_eq!(bitmap.copy_region(region), vec![blue; 4]);
  bitmap.write_region(region, &[red; 4]);
  assert_eq!(bitmap, Bitmap::filled(4, 3, red));
  assert_eq!(bitmap.get(4, 0), None);
}
