//! Pixel data structures.

use bytemuck::{Pod, Zeroable};

/// Red/Green/Blue/Alpha, u8 per channel.
///
/// Alpha is straight (not premultiplied), which is how PNG stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGBA8888 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}
impl RGBA8888 {
  /// All channels zero.
  pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0 };

  /// Makes a pixel from all four channels.
  #[inline]
  #[must_use]
  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }

  /// Makes a fully opaque pixel.
  #[inline]
  #[must_use]
  pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
    Self { r, g, b, a: u8::MAX }
  }

  /// Composites `self` over `dst` (Porter-Duff "source over").
  ///
  /// This is what an APNG frame with `blend_op = Over` does to each pixel of
  /// the canvas under it.
  #[inline]
  #[must_use]
  pub fn over(self, dst: Self) -> Self {
    match self.a {
      u8::MAX => return self,
      0 => return dst,
      _ => (),
    }
    // all the math here is scaled up by 255*255 to stay in integers.
    let src_a = u32::from(self.a);
    let dst_weight = u32::from(dst.a) * (255 - src_a);
    let out_a = src_a * 255 + dst_weight;
    let channel = |s: u8, d: u8| -> u8 {
      let numerator = u32::from(s) * src_a * 255 + u32::from(d) * dst_weight;
      ((numerator + out_a / 2) / out_a) as u8
    };
    Self {
      r: channel(self.r, dst.r),
      g: channel(self.g, dst.g),
      b: channel(self.b, dst.b),
      a: ((out_a + 127) / 255) as u8,
    }
  }
}

/// Red/Green/Blue, u8 per channel.
///
/// This is the layout of a `PLTE` chunk entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGB888 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}
impl From<RGB888> for RGBA8888 {
  #[inline]
  fn from(RGB888 { r, g, b }: RGB888) -> Self {
    Self::opaque(r, g, b)
  }
}

#[test]
fn test_over_extremes() {
  let red = RGBA8888::opaque(255, 0, 0);
  let blue = RGBA8888::opaque(0, 0, 255);
  assert_eq!(red.over(blue), red);
  assert_eq!(RGBA8888::TRANSPARENT.over(blue), blue);
  assert_eq!(RGBA8888::new(1, 2, 3, 0).over(blue), blue);
}

#[test]
fn test_over_transparent_keeps_source() {
  let half_green = RGBA8888::new(0, 200, 40, 128);
  assert_eq!(half_green.over(RGBA8888::TRANSPARENT), half_green);
}

#[test]
fn test_over_half_on_opaque() {
  let half_white = RGBA8888::new(255, 255, 255, 128);
  let black = RGBA8888::opaque(0, 0, 0);
  let out = half_white.over(black);
  assert_eq!(out.a, 255);
  assert_eq!(out.r, 128);
  assert_eq!(out.g, 128);
}
