use alloc::vec::Vec;

use log::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::*;
use crate::png::{PngStillCodec, RawChunkIter, StillImageCodec};
use crate::{Bitmap, CodecError, EncodeError, FormatError};

#[cfg(test)]
use alloc::vec;

/// A fully decoded animation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAnimation {
  /// Canvas width in pixels.
  pub width: u32,
  /// Canvas height in pixels.
  pub height: u32,
  /// Pixels per display point, from [`DecodeConfig::scale`].
  pub scale: f64,
  /// Times to play the animation, 0 meaning "forever".
  ///
  /// A plain PNG gives 0 here too, but it only has one frame anyway.
  pub loop_count: u32,
  /// If the data had an `acTL` chunk.
  pub animated: bool,
  /// The composed frames, in order.
  pub frames: Vec<ComposedFrame>,
}
impl DecodedAnimation {
  /// Seconds that one play of the animation takes.
  #[inline]
  #[must_use]
  pub fn total_duration(&self) -> f64 {
    self.frames.iter().map(|frame| frame.duration).sum()
  }

  /// If this came from an APNG (rather than a plain PNG).
  #[inline]
  #[must_use]
  pub const fn is_animated(&self) -> bool {
    self.animated
  }
}

/// Something that's already an animation, and can be taken apart into
/// frames for encoding.
pub trait AnimatedImage {
  /// Number of frames.
  fn frame_count(&self) -> usize;

  /// The image of a frame.
  ///
  /// A frame that gives `None` is left out of the encoding. The other frames
  /// keep their own durations.
  fn frame(&self, index: usize) -> Option<&Bitmap>;

  /// Seconds that the whole animation lasts.
  fn duration(&self) -> f64;

  /// Seconds that one frame lasts, if frames have their own timing.
  ///
  /// When this gives `None` the [`duration`](Self::duration) is split evenly.
  #[inline]
  fn frame_duration(&self, index: usize) -> Option<f64> {
    let _ = index;
    None
  }
}
impl AnimatedImage for DecodedAnimation {
  #[inline]
  fn frame_count(&self) -> usize {
    self.frames.len()
  }
  #[inline]
  fn frame(&self, index: usize) -> Option<&Bitmap> {
    self.frames.get(index).map(|frame| &frame.image)
  }
  #[inline]
  fn duration(&self) -> f64 {
    self.total_duration()
  }
  #[inline]
  fn frame_duration(&self, index: usize) -> Option<f64> {
    self.frames.get(index).map(|frame| frame.duration)
  }
}

/// Decodes PNG or APNG bytes into composed frames, using [`PngStillCodec`].
///
/// A plain PNG gives one frame lasting [`DecodeConfig::default_duration`].
///
/// ## Failure
/// Any problem at all with the data fails the whole decode. You never get a
/// partial animation.
#[inline]
pub fn decode_apng(bytes: &[u8], config: &DecodeConfig) -> Result<DecodedAnimation, FormatError> {
  decode_apng_with(&PngStillCodec, bytes, config)
}

/// Like [`decode_apng`], but with your own still image codec.
pub fn decode_apng_with(
  codec: &dyn StillImageCodec, bytes: &[u8], config: &DecodeConfig,
) -> Result<DecodedAnimation, FormatError> {
  let stream = parse(RawChunkIter::new(bytes)?, config.default_duration)?;
  let pngs = (0..stream.frames.len()).map(|i| stream.frame_png(i)).collect::<Result<Vec<_>, _>>()?;

  #[cfg(feature = "rayon")]
  let images: Result<Vec<Bitmap>, CodecError> = pngs.par_iter().map(|png| codec.decode(png)).collect();
  #[cfg(not(feature = "rayon"))]
  let images: Result<Vec<Bitmap>, CodecError> = pngs.iter().map(|png| codec.decode(png)).collect();

  let decoded = stream.frames.iter().zip(images?).map(|(frame, image)| DecodedFrame {
    control: frame.control,
    duration: frame.duration,
    image,
  });
  let mut frames = compose(stream.header.width, stream.header.height, decoded)?;

  if let Some(total) = config.total_duration.filter(|total| total.is_finite() && *total > 0.0) {
    rescale_durations(&mut frames, total);
  }
  debug!("decoded {} frames, {}x{}", frames.len(), stream.header.width, stream.header.height);
  Ok(DecodedAnimation {
    width: stream.header.width,
    height: stream.header.height,
    scale: config.scale,
    loop_count: stream.animation.map_or(0, |animation| animation.loop_count),
    animated: stream.animation.is_some(),
    frames,
  })
}

/// Scales the durations so they add up to `total`.
///
/// If every frame is 0 seconds, they all get an even share.
fn rescale_durations(frames: &mut [ComposedFrame], total: f64) {
  let current: f64 = frames.iter().map(|frame| frame.duration).sum();
  if current > 0.0 {
    let factor = total / current;
    frames.iter_mut().for_each(|frame| frame.duration *= factor);
  } else if !frames.is_empty() {
    let share = total / frames.len() as f64;
    frames.iter_mut().for_each(|frame| frame.duration = share);
  }
}

/// Encodes bitmaps as an APNG (or as a PNG, for just one bitmap), using
/// [`PngStillCodec`].
#[inline]
pub fn encode_images(
  images: &[Bitmap], durations: &FrameDurations, config: &EncodeConfig,
) -> Result<Vec<u8>, EncodeError> {
  encode_images_with(&PngStillCodec, images, durations, config)
}

/// Like [`encode_images`], but with your own still image codec.
pub fn encode_images_with(
  codec: &dyn StillImageCodec, images: &[Bitmap], durations: &FrameDurations,
  config: &EncodeConfig,
) -> Result<Vec<u8>, EncodeError> {
  if images.is_empty() {
    return Err(EncodeError::EmptyInput);
  }
  let durations = durations.resolve(images.len())?;
  let frames: Vec<(&Bitmap, f64)> = images.iter().zip(durations).collect();
  build(codec, &frames, config)
}

/// Encodes frames that already carry their own durations, such as the frames
/// of a [`DecodedAnimation`].
pub fn encode_frames(frames: &[ComposedFrame], config: &EncodeConfig) -> Result<Vec<u8>, EncodeError> {
  let frames: Vec<(&Bitmap, f64)> = frames.iter().map(|frame| (&frame.image, frame.duration)).collect();
  build(&PngStillCodec, &frames, config)
}

/// Takes an [`AnimatedImage`] apart and encodes its frames.
pub fn encode_animated_image(
  image: &impl AnimatedImage, config: &EncodeConfig,
) -> Result<Vec<u8>, EncodeError> {
  // frame indexes are kept, so a missing frame can't shift the durations
  let bitmaps: Vec<(usize, &Bitmap)> =
    (0..image.frame_count()).filter_map(|i| image.frame(i).map(|bitmap| (i, bitmap))).collect();
  if bitmaps.is_empty() {
    return Err(EncodeError::EmptyInput);
  }
  let even_share = image.duration() / bitmaps.len() as f64;
  let frames: Vec<(&Bitmap, f64)> = bitmaps
    .into_iter()
    .map(|(i, bitmap)| (bitmap, image.frame_duration(i).unwrap_or(even_share)))
    .collect();
  build(&PngStillCodec, &frames, config)
}

#[test]
fn test_rescale_durations() {
  let frame = |duration| ComposedFrame { image: Bitmap::new(1, 1), duration };
  let mut frames = vec![frame(0.1), frame(0.3)];
  rescale_durations(&mut frames, 2.0);
  assert!((frames[0].duration - 0.5).abs() < 1e-9);
  assert!((frames[1].duration - 1.5).abs() < 1e-9);
  let mut frames = vec![frame(0.0), frame(0.0)];
  rescale_durations(&mut frames, 1.0);
  assert_eq!(frames[1].duration, 0.5);
}
