//! Draws frames onto a shared canvas, following their dispose and blend ops.

use alloc::vec::Vec;

use log::debug;

use crate::png::{BlendOp, DisposeOp, FrameControl};
use crate::{Bitmap, CodecError, FormatError, Region, RGBA8888};

/// A fully drawn frame of an animation.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedFrame {
  /// The whole canvas, as it looks while this frame is shown.
  pub image: Bitmap,
  /// Seconds to show the frame. 0.0 means "as fast as possible".
  pub duration: f64,
}

/// A frame's decoded pixels, ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
  /// Where the frame goes and how it's drawn.
  pub control: FrameControl,
  /// Seconds to show the frame.
  pub duration: f64,
  /// The frame's own pixels, `control.width` by `control.height`.
  pub image: Bitmap,
}

/// What has to be done to the canvas before the next frame is drawn.
#[derive(Debug, Clone)]
enum PendingDisposal {
  Clear(Region),
  Restore(Region, Vec<RGBA8888>),
}

/// The working image of the compositor.
///
/// Each frame drawn gets back an independent copy of the canvas, so later
/// frames never change an image that was already handed out.
#[derive(Debug, Clone)]
pub struct Canvas {
  image: Bitmap,
  pending: Option<PendingDisposal>,
  frames_drawn: usize,
}
impl Canvas {
  /// A fully transparent canvas.
  pub fn new(width: u32, height: u32) -> Result<Self, FormatError> {
    let image = Bitmap::try_new(width, height).map_err(CodecError::from)?;
    Ok(Self { image, pending: None, frames_drawn: 0 })
  }

  /// The canvas as it is right now.
  #[inline]
  #[must_use]
  pub fn image(&self) -> &Bitmap {
    &self.image
  }

  /// Disposes of the previous frame, draws this one, and returns a snapshot.
  ///
  /// ## Failure
  /// * [`FormatError::DimensionMismatch`] if the frame's image isn't the size
  ///   its control says.
  /// * [`FormatError::FrameOutOfBounds`] if the frame doesn't fit on the
  ///   canvas (or is empty).
  ///
  /// The canvas isn't changed when this fails.
  pub fn draw_frame(
    &mut self, control: &FrameControl, image: &Bitmap, duration: f64,
  ) -> Result<ComposedFrame, FormatError> {
    let index = self.frames_drawn;
    let expected = (control.width, control.height);
    if image.dimensions() != expected || !image.is_consistent() {
      return Err(FormatError::DimensionMismatch { frame: index, expected, found: image.dimensions() });
    }
    let region = control.region();
    if region.is_empty() || !region.fits_within(self.image.width, self.image.height) {
      return Err(FormatError::FrameOutOfBounds { frame: index });
    }

    match self.pending.take() {
      Some(PendingDisposal::Clear(r)) => self.image.fill_region(r, RGBA8888::TRANSPARENT),
      Some(PendingDisposal::Restore(r, saved)) => self.image.write_region(r, &saved),
      None => (),
    }

    // There's nothing to go back to before the first frame.
    let dispose_op = match control.dispose_op {
      DisposeOp::Previous if index == 0 => DisposeOp::Background,
      other => other,
    };
    self.pending = match dispose_op {
      DisposeOp::None => None,
      DisposeOp::Background => Some(PendingDisposal::Clear(region)),
      DisposeOp::Previous => Some(PendingDisposal::Restore(region, self.image.copy_region(region))),
    };

    match control.blend_op {
      BlendOp::Source => self.image.write_region(region, &image.pixels),
      BlendOp::Over => self.image.blend_region(region, &image.pixels),
    }
    self.frames_drawn += 1;
    debug!("composed frame {index}, {dispose_op:?}/{:?} over {region:?}", control.blend_op);
    Ok(ComposedFrame { image: self.image.clone(), duration })
  }
}

/// Draws every frame in order, giving one full canvas image per frame.
///
/// This is strictly sequential, each frame depends on the canvas that all the
/// frames before it left behind.
pub fn compose<I>(width: u32, height: u32, frames: I) -> Result<Vec<ComposedFrame>, FormatError>
where
  I: IntoIterator<Item = DecodedFrame>,
{
  let mut canvas = Canvas::new(width, height)?;
  frames
    .into_iter()
    .map(|frame| canvas.draw_frame(&frame.control, &frame.image, frame.duration))
    .collect()
}
