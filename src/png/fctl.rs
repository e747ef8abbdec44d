use bytemuck::{Pod, Zeroable};

use super::*;
use crate::{FormatError, Region, U16BE, U32BE};

/// Frame Control Chunk payload, as it's laid out in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
#[allow(nonstandard_style)]
struct fcTL {
  sequence_number: U32BE,
  width: U32BE,
  height: U32BE,
  x_offset: U32BE,
  y_offset: U32BE,
  delay_num: U16BE,
  delay_den: U16BE,
  dispose_op: u8,
  blend_op: u8,
}

/// What happens to a frame's region once the frame is done being shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DisposeOp {
  /// Leave the canvas as it is.
  #[default]
  None = 0,
  /// Clear the region to fully transparent black.
  Background = 1,
  /// Put the region back how it was before the frame was drawn.
  Previous = 2,
}

/// How a frame's pixels are put onto the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendOp {
  /// Overwrite the region, alpha included.
  #[default]
  Source = 0,
  /// Alpha composite the frame over what's already there.
  Over = 1,
}

/// The data of an `fcTL` chunk: where a frame goes, how long it lasts, and
/// how it interacts with the frames around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct FrameControl {
  pub sequence_number: u32,
  pub width: u32,
  pub height: u32,
  pub x_offset: u32,
  pub y_offset: u32,
  pub delay_num: u16,
  /// A denominator of 0 means 100.
  pub delay_den: u16,
  pub dispose_op: DisposeOp,
  pub blend_op: BlendOp,
}
impl FrameControl {
  /// Length of an `fcTL` payload.
  pub const LEN: usize = core::mem::size_of::<fcTL>();

  /// A frame that covers the whole canvas, with `None` disposal and `Source`
  /// blending.
  #[inline]
  #[must_use]
  pub const fn full_canvas(sequence_number: u32, width: u32, height: u32) -> Self {
    Self {
      sequence_number,
      width,
      height,
      x_offset: 0,
      y_offset: 0,
      delay_num: 0,
      delay_den: 0,
      dispose_op: DisposeOp::None,
      blend_op: BlendOp::Source,
    }
  }

  /// Parses an `fcTL` payload.
  ///
  /// Only the layout is checked here, whether the region fits the canvas is
  /// up to the caller.
  ///
  /// ## Failure
  /// * [`FormatError::MalformedChunk`] if the length is wrong or the dispose
  ///   or blend op is out of range.
  pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
    let malformed = FormatError::MalformedChunk { chunk: ChunkType::fcTL };
    let fctl: fcTL = bytemuck::try_pod_read_unaligned(data).map_err(|_| malformed.clone())?;
    Ok(Self {
      sequence_number: fctl.sequence_number.to_u32(),
      width: fctl.width.to_u32(),
      height: fctl.height.to_u32(),
      x_offset: fctl.x_offset.to_u32(),
      y_offset: fctl.y_offset.to_u32(),
      delay_num: fctl.delay_num.to_u16(),
      delay_den: fctl.delay_den.to_u16(),
      dispose_op: match fctl.dispose_op {
        0 => DisposeOp::None,
        1 => DisposeOp::Background,
        2 => DisposeOp::Previous,
        _ => return Err(malformed),
      },
      blend_op: match fctl.blend_op {
        0 => BlendOp::Source,
        1 => BlendOp::Over,
        _ => return Err(malformed),
      },
    })
  }

  /// Serializes as an `fcTL` payload.
  #[inline]
  #[must_use]
  pub fn to_bytes(&self) -> [u8; Self::LEN] {
    let fctl = fcTL {
      sequence_number: self.sequence_number.into(),
      width: self.width.into(),
      height: self.height.into(),
      x_offset: self.x_offset.into(),
      y_offset: self.y_offset.into(),
      delay_num: self.delay_num.into(),
      delay_den: self.delay_den.into(),
      dispose_op: self.dispose_op as u8,
      blend_op: self.blend_op as u8,
    };
    bytemuck::cast(fctl)
  }

  /// The part of the canvas this frame covers.
  #[inline]
  #[must_use]
  pub const fn region(&self) -> Region {
    Region { x: self.x_offset, y: self.y_offset, width: self.width, height: self.height }
  }

  /// How long the frame is shown, in seconds.
  ///
  /// A numerator of 0 gives 0.0, which means "as fast as possible", the frame
  /// is still shown.
  #[inline]
  #[must_use]
  pub fn duration(&self) -> f64 {
    let den = if self.delay_den == 0 { 100 } else { self.delay_den };
    f64::from(self.delay_num) / f64::from(den)
  }

  /// Sets the delay fraction to approximate `seconds`.
  #[inline]
  #[must_use]
  pub fn with_duration(self, seconds: f64) -> Self {
    let (delay_num, delay_den) = delay_from_seconds(seconds);
    Self { delay_num, delay_den, ..self }
  }
}

/// Picks the `(numerator, denominator)` delay closest to `seconds`.
///
/// The finest denominator of 1000, 100, 10, and 1 whose numerator still fits
/// in a `u16` is used. Durations too long for even that saturate at
/// `u16::MAX` seconds. Negative and NaN durations give 0.
#[must_use]
pub fn delay_from_seconds(seconds: f64) -> (u16, u16) {
  for den in [1000_u16, 100, 10, 1] {
    // `as` truncates and saturates, so the `+ 0.5` rounds, and negatives
    // and NaN become 0.
    let num = seconds * f64::from(den) + 0.5;
    if num.is_nan() || num < f64::from(u16::MAX) + 1.0 {
      return (num as u16, den);
    }
  }
  (u16::MAX, 1)
}

#[test]
fn test_frame_control_layout() {
  let fc = FrameControl {
    sequence_number: 1,
    width: 2,
    height: 3,
    x_offset: 4,
    y_offset: 5,
    delay_num: 6,
    delay_den: 7,
    dispose_op: DisposeOp::Previous,
    blend_op: BlendOp::Over,
  };
  assert_eq!(FrameControl::LEN, 26);
  let bytes = fc.to_bytes();
  assert_eq!(&bytes[..8], &[0, 0, 0, 1, 0, 0, 0, 2]);
  assert_eq!(&bytes[20..], &[0, 6, 0, 7, 2, 1]);
  assert_eq!(FrameControl::parse(&bytes), Ok(fc));

  let mut bad = bytes;
  bad[24] = 3;
  assert!(FrameControl::parse(&bad).is_err());
  let mut bad = bytes;
  bad[25] = 2;
  assert!(FrameControl::parse(&bad).is_err());
  assert!(FrameControl::parse(&bytes[..25]).is_err());
}

#[test]
fn test_durations() {
  let fc = FrameControl::full_canvas(0, 1, 1);
  assert_eq!(FrameControl { delay_num: 5, delay_den: 0, ..fc }.duration(), 0.05);
  assert_eq!(FrameControl { delay_num: 1, delay_den: 4, ..fc }.duration(), 0.25);
  assert_eq!(fc.duration(), 0.0);
  assert_eq!(delay_from_seconds(0.1), (100, 1000));
  assert_eq!(delay_from_seconds(0.0), (0, 1000));
  assert_eq!(delay_from_seconds(70.0), (7000, 100));
  assert_eq!(delay_from_seconds(1.0e9), (u16::MAX, 1));
  assert_eq!(delay_from_seconds(-2.0), (0, 1000));
  assert_eq!(delay_from_seconds(f64::NAN), (0, 1000));
  assert_eq!(delay_from_seconds(0.0125), (13, 1000));
}
