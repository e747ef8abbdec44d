use super::*;
use crate::{CodecError, FormatError};

#[cfg(test)]
use alloc::vec;

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette.
  ///
  /// The palette will have RGB8 data. There may optionally be a transparency
  /// chunk.
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }

  /// Converts the `IHDR` byte value.
  #[inline]
  #[must_use]
  pub const fn from_u8(value: u8) -> Option<Self> {
    Some(match value {
      0 => Self::Y,
      2 => Self::RGB,
      3 => Self::Index,
      4 => Self::YA,
      6 => Self::RGBA,
      _ => return None,
    })
  }
}

/// A legal PNG combination of color type and bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
  /// What channels each pixel has.
  pub color_type: PngColorType,
  /// Bits per channel.
  pub bit_depth: u8,
}
impl PixelFormat {
  /// The format the still image encoder always writes.
  pub const RGBA8: Self = Self { color_type: PngColorType::RGBA, bit_depth: 8 };

  /// Bits used by one pixel.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(self) -> usize {
    (self.bit_depth as usize) * self.color_type.channel_count()
  }

  /// Bytes of pixel data in one line `width` pixels wide, rounded up.
  #[inline]
  #[must_use]
  pub const fn bytes_per_scanline(self, width: u32) -> usize {
    (self.bits_per_pixel() * (width as usize)).div_ceil(8)
  }

  /// A scanline plus its leading filter type byte.
  #[inline]
  #[must_use]
  pub const fn bytes_per_filterline(self, width: u32) -> usize {
    1 + self.bytes_per_scanline(width)
  }

  /// The distance (in bytes) that the filters look back to find the "left"
  /// byte.
  ///
  /// This is a whole pixel, except that bit-packed formats use 1.
  #[inline]
  #[must_use]
  pub const fn filter_chunk_size(self) -> usize {
    let bytes = self.bits_per_pixel() / 8;
    if bytes == 0 {
      1
    } else {
      bytes
    }
  }

  /// Size of the decompressed (still filtered) data of a whole image.
  ///
  /// Saturates instead of overflowing, so absurd sizes just fail the
  /// allocation later.
  #[must_use]
  pub fn filtered_data_len(self, width: u32, height: u32, is_interlaced: bool) -> usize {
    let image_len = |(w, h): (u32, u32)| -> usize {
      if w == 0 {
        0
      } else {
        self.bytes_per_filterline(w).saturating_mul(h as usize)
      }
    };
    let dimensions = reduced_image_dimensions(width, height);
    if is_interlaced {
      dimensions[1..].iter().copied().map(image_len).fold(0, usize::saturating_add)
    } else {
      image_len(dimensions[0])
    }
  }
}

/// Image Header
///
/// The color type and bit depth are kept as their raw bytes, since the
/// animation layer only cares about the dimensions. Use
/// [`pixel_format`](Self::pixel_format) to check them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IHDR {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel
  pub bit_depth: u8,
  /// pixel color type, see [`PngColorType`]
  pub color_type: u8,
  /// if the image data is stored interlaced.
  ///
  /// please don't make new interlaced images, they're terrible.
  pub is_interlaced: bool,
}
impl IHDR {
  /// Length of an `IHDR` payload.
  pub const LEN: usize = 13;

  /// Largest width or height that [`parse`](Self::parse) accepts.
  ///
  /// Every buffer the decoder makes is sized from the header, before any
  /// image data is looked at, so this keeps a tiny stream from asking for
  /// gigabytes.
  pub const MAX_DIMENSION: u32 = 17_000;

  /// A header for an image in the given format.
  #[inline]
  #[must_use]
  pub const fn new(width: u32, height: u32, format: PixelFormat) -> Self {
    Self {
      width,
      height,
      bit_depth: format.bit_depth,
      color_type: format.color_type as u8,
      is_interlaced: false,
    }
  }

  /// Parses an `IHDR` payload.
  ///
  /// ## Failure
  /// * [`FormatError::MalformedChunk`] if the length is wrong, either dimension
  ///   is 0, or the compression/filter/interlace method isn't one PNG defines.
  /// * [`FormatError::DimensionsTooLarge`] if either dimension is over
  ///   [`MAX_DIMENSION`](Self::MAX_DIMENSION).
  pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
    let malformed = FormatError::MalformedChunk { chunk: ChunkType::IHDR };
    match data {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, 0, 0, interlace_method] => {
        let width = u32::from_be_bytes([*w0, *w1, *w2, *w3]);
        let height = u32::from_be_bytes([*h0, *h1, *h2, *h3]);
        if width == 0 || height == 0 {
          return Err(malformed);
        }
        if width > Self::MAX_DIMENSION || height > Self::MAX_DIMENSION {
          return Err(FormatError::DimensionsTooLarge { width, height });
        }
        Ok(Self {
          width,
          height,
          bit_depth: *bit_depth,
          color_type: *color_type,
          is_interlaced: match interlace_method {
            0 => false,
            1 => true,
            _ => return Err(malformed),
          },
        })
      }
      _ => Err(malformed),
    }
  }

  /// Serializes the header as an `IHDR` payload.
  #[inline]
  #[must_use]
  pub fn to_bytes(&self) -> [u8; Self::LEN] {
    let mut out = [0; Self::LEN];
    out[0..4].copy_from_slice(&self.width.to_be_bytes());
    out[4..8].copy_from_slice(&self.height.to_be_bytes());
    out[8] = self.bit_depth;
    out[9] = self.color_type;
    out[12] = u8::from(self.is_interlaced);
    out
  }

  /// This header, but for an image of a different size.
  ///
  /// Frames of an animation share the canvas pixel format, but each has its
  /// own size.
  #[inline]
  #[must_use]
  pub const fn with_dimensions(self, width: u32, height: u32) -> Self {
    Self { width, height, ..self }
  }

  /// Checks that the color type and bit depth are a legal combination.
  pub fn pixel_format(&self) -> Result<PixelFormat, CodecError> {
    let unsupported =
      CodecError::Unsupported { bit_depth: self.bit_depth, color_type: self.color_type };
    let color_type = PngColorType::from_u8(self.color_type).ok_or(unsupported.clone())?;
    let legal_depths: &[u8] = match color_type {
      PngColorType::Y => &[1, 2, 4, 8, 16],
      PngColorType::Index => &[1, 2, 4, 8],
      PngColorType::RGB | PngColorType::YA | PngColorType::RGBA => &[8, 16],
    };
    if legal_depths.contains(&self.bit_depth) {
      Ok(PixelFormat { color_type, bit_depth: self.bit_depth })
    } else {
      Err(unsupported)
    }
  }
}

/// `(x_start, y_start, x_step, y_step)` of each Adam7 pass.
///
/// ```txt
/// 1 6 4 6 2 6 4 6
/// 7 7 7 7 7 7 7 7
/// 5 6 5 6 5 6 5 6
/// 7 7 7 7 7 7 7 7
/// 3 6 4 6 3 6 4 6
/// 7 7 7 7 7 7 7 7
/// 5 6 5 6 5 6 5 6
/// 7 7 7 7 7 7 7 7
/// ```
const ADAM7: [(u32, u32, u32, u32); 7] =
  [(0, 0, 8, 8), (4, 0, 8, 8), (0, 4, 4, 8), (2, 0, 4, 4), (0, 2, 2, 4), (1, 0, 2, 2), (0, 1, 1, 2)];

/// Given the dimensions of the full PNG image, computes the size of each
/// reduced image.
///
/// The output uses index 0 as the base image size, and indexes 1 through 7 for
/// the size of reduced images 1 through 7.
#[inline]
#[must_use]
pub const fn reduced_image_dimensions(full_width: u32, full_height: u32) -> [(u32, u32); 8] {
  const fn pass_len(full: u32, start: u32, step: u32) -> u32 {
    if full > start {
      (full - start).div_ceil(step)
    } else {
      0
    }
  }
  let mut out = [(full_width, full_height); 8];
  let mut i = 0;
  while i < 7 {
    let (x_start, y_start, x_step, y_step) = ADAM7[i];
    out[i + 1] = (pass_len(full_width, x_start, x_step), pass_len(full_height, y_start, y_step));
    i += 1;
  }
  out
}

/// Converts a reduced image location into the full image location.
///
/// Image level 0 is the full image, so the position is unchanged.
#[inline]
#[must_use]
pub(crate) const fn interlaced_pos_to_full_pos(
  image_level: usize, reduced_x: u32, reduced_y: u32,
) -> (u32, u32) {
  if image_level == 0 {
    (reduced_x, reduced_y)
  } else {
    let (x_start, y_start, x_step, y_step) = ADAM7[image_level - 1];
    (reduced_x * x_step + x_start, reduced_y * y_step + y_start)
  }
}

#[test]
fn test_reduced_image_dimensions() {
  assert_eq!(reduced_image_dimensions(0, 0), [(0, 0); 8]);
  #[rustfmt::skip]
  let expected_by_pass: [([u32; 8], [u32; 8]); 7] = [
    ([1, 1, 1, 1, 1, 1, 1, 1], [1, 1, 1, 1, 1, 1, 1, 1]),
    ([0, 0, 0, 0, 1, 1, 1, 1], [1, 1, 1, 1, 1, 1, 1, 1]),
    ([1, 1, 1, 1, 2, 2, 2, 2], [0, 0, 0, 0, 1, 1, 1, 1]),
    ([0, 0, 1, 1, 1, 1, 2, 2], [1, 1, 1, 1, 2, 2, 2, 2]),
    ([1, 1, 2, 2, 3, 3, 4, 4], [0, 0, 1, 1, 1, 1, 2, 2]),
    ([0, 1, 1, 2, 2, 3, 3, 4], [1, 1, 2, 2, 3, 3, 4, 4]),
    ([1, 2, 3, 4, 5, 6, 7, 8], [0, 1, 1, 2, 2, 3, 3, 4]),
  ];
  for (pass, (widths, heights)) in expected_by_pass.iter().enumerate() {
    for (n, (ex_w, ex_h)) in (1..=8).zip(widths.iter().zip(heights)) {
      assert_eq!(reduced_image_dimensions(n, 0)[pass + 1].0, *ex_w, "pass {} w:{}", pass + 1, n);
      assert_eq!(reduced_image_dimensions(0, n)[pass + 1].1, *ex_h, "pass {} h:{}", pass + 1, n);
    }
  }
  assert_eq!(
    reduced_image_dimensions(8, 8),
    [(8, 8), (1, 1), (1, 1), (2, 1), (2, 2), (4, 2), (4, 4), (8, 4)]
  );
}

#[test]
fn test_interlaced_positions_cover_image_once() {
  let (w, h) = (13_u32, 7_u32);
  let mut seen = vec![0_u8; (w * h) as usize];
  for (level, (rw, rh)) in reduced_image_dimensions(w, h).into_iter().enumerate().skip(1) {
    for ry in 0..rh {
      for rx in 0..rw {
        let (x, y) = interlaced_pos_to_full_pos(level, rx, ry);
        seen[crate::xy_width_to_index(x, y, w)] += 1;
      }
    }
  }
  assert!(seen.iter().all(|&count| count == 1));
}

#[test]
fn test_ihdr_parse() {
  let ihdr = IHDR::new(3, 5, PixelFormat::RGBA8);
  assert_eq!(IHDR::parse(&ihdr.to_bytes()), Ok(ihdr));
  assert_eq!(ihdr.pixel_format(), Ok(PixelFormat::RGBA8));
  let mut bytes = ihdr.to_bytes();
  bytes[0..4].copy_from_slice(&0_u32.to_be_bytes());
  assert!(IHDR::parse(&bytes).is_err());
  assert!(IHDR::parse(&ihdr.to_bytes()[..12]).is_err());
  let bad = IHDR { bit_depth: 4, ..ihdr };
  assert_eq!(bad.pixel_format(), Err(CodecError::Unsupported { bit_depth: 4, color_type: 6 }));

  let widest = IHDR::new(IHDR::MAX_DIMENSION, 1, PixelFormat::RGBA8);
  assert_eq!(IHDR::parse(&widest.to_bytes()), Ok(widest));
  let huge = IHDR::new(60_000, 60_000, PixelFormat::RGBA8);
  assert_eq!(
    IHDR::parse(&huge.to_bytes()),
    Err(FormatError::DimensionsTooLarge { width: 60_000, height: 60_000 })
  );
  let tall = IHDR::new(1, IHDR::MAX_DIMENSION + 1, PixelFormat::RGBA8);
  assert_eq!(
    IHDR::parse(&tall.to_bytes()),
    Err(FormatError::DimensionsTooLarge { width: 1, height: IHDR::MAX_DIMENSION + 1 })
  );
}
