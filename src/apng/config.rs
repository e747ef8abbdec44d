use alloc::{vec, vec::Vec};

use crate::EncodeError;

/// Options for decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeConfig {
  /// Seconds to show a frame that has no timing of its own.
  ///
  /// This is the single frame of a plain PNG, or a default image that gets
  /// counted as frame 0 without having an `fcTL` chunk. Default: `0.0`.
  pub default_duration: f64,
  /// Pixels per display point, passed through to
  /// [`DecodedAnimation::scale`](crate::DecodedAnimation::scale). Default:
  /// `1.0`.
  pub scale: f64,
  /// If set (and positive), every frame duration is scaled so that the whole
  /// animation lasts this many seconds. Default: `None`.
  pub total_duration: Option<f64>,
}
impl Default for DecodeConfig {
  #[inline]
  fn default() -> Self {
    Self { default_duration: 0.0, scale: 1.0, total_duration: None }
  }
}
impl DecodeConfig {
  /// Sets [`default_duration`](Self::default_duration).
  #[inline]
  #[must_use]
  pub const fn with_default_duration(self, default_duration: f64) -> Self {
    Self { default_duration, ..self }
  }

  /// Sets [`scale`](Self::scale).
  #[inline]
  #[must_use]
  pub const fn with_scale(self, scale: f64) -> Self {
    Self { scale, ..self }
  }

  /// Sets [`total_duration`](Self::total_duration).
  #[inline]
  #[must_use]
  pub const fn with_total_duration(self, total_duration: f64) -> Self {
    Self { total_duration: Some(total_duration), ..self }
  }
}

/// Options for encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeConfig {
  /// Times to play the animation, 0 meaning "forever". Default: `0`.
  pub loop_count: u32,
  /// Compression effort, from 0.0 (smallest output, slowest) to 1.0 (fastest).
  /// This is handed to the still image encoder as is. Default: `1.0`.
  pub quality: f32,
  /// The most image data bytes to put in any one `IDAT` or `fdAT` chunk.
  ///
  /// `None` (the default) puts each frame in a single chunk, unless it's too
  /// big for one. Values below 1 act like 1.
  pub max_fragment_len: Option<usize>,
}
impl Default for EncodeConfig {
  #[inline]
  fn default() -> Self {
    Self { loop_count: 0, quality: 1.0, max_fragment_len: None }
  }
}
impl EncodeConfig {
  /// Sets [`loop_count`](Self::loop_count).
  #[inline]
  #[must_use]
  pub const fn with_loop_count(self, loop_count: u32) -> Self {
    Self { loop_count, ..self }
  }

  /// Sets [`quality`](Self::quality).
  #[inline]
  #[must_use]
  pub const fn with_quality(self, quality: f32) -> Self {
    Self { quality, ..self }
  }

  /// Sets [`max_fragment_len`](Self::max_fragment_len).
  #[inline]
  #[must_use]
  pub const fn with_max_fragment_len(self, max_fragment_len: usize) -> Self {
    Self { max_fragment_len: Some(max_fragment_len), ..self }
  }
}

/// How long each frame being encoded is shown.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDurations {
  /// Every frame is shown for this many seconds.
  Uniform(f64),
  /// Seconds for each frame, one entry per frame.
  PerFrame(Vec<f64>),
}
impl FrameDurations {
  /// Expands to one duration per frame.
  ///
  /// ## Failure
  /// * [`EncodeError::DurationCountMismatch`] if `PerFrame` has the wrong
  ///   number of entries.
  /// * [`EncodeError::InvalidDuration`] for a negative or non-finite duration.
  pub fn resolve(&self, frame_count: usize) -> Result<Vec<f64>, EncodeError> {
    let durations = match self {
      Self::Uniform(seconds) => vec![*seconds; frame_count],
      Self::PerFrame(durations) if durations.len() == frame_count => durations.clone(),
      Self::PerFrame(durations) => {
        return Err(EncodeError::DurationCountMismatch {
          frames: frame_count,
          durations: durations.len(),
        })
      }
    };
    match durations.iter().position(|d| !is_valid_duration(*d)) {
      Some(frame) => Err(EncodeError::InvalidDuration { frame }),
      None => Ok(durations),
    }
  }
}

/// Finite and not negative.
#[inline]
pub(crate) fn is_valid_duration(seconds: f64) -> bool {
  seconds.is_finite() && seconds >= 0.0
}

#[test]
fn test_config_defaults() {
  let decode = DecodeConfig::default();
  assert_eq!(decode.default_duration, 0.0);
  assert_eq!(decode.scale, 1.0);
  assert_eq!(decode.total_duration, None);
  let encode = EncodeConfig::default().with_loop_count(5).with_max_fragment_len(100);
  assert_eq!(encode.loop_count, 5);
  assert_eq!(encode.quality, 1.0);
  assert_eq!(encode.max_fragment_len, Some(100));
}

#[test]
fn test_frame_durations_resolve() {
  assert_eq!(FrameDurations::Uniform(0.5).resolve(3), Ok(vec![0.5; 3]));
  assert_eq!(FrameDurations::PerFrame(vec![0.1, 0.2]).resolve(2), Ok(vec![0.1, 0.2]));
  assert_eq!(
    FrameDurations::PerFrame(vec![0.1]).resolve(2),
    Err(EncodeError::DurationCountMismatch { frames: 2, durations: 1 })
  );
  assert_eq!(
    FrameDurations::PerFrame(vec![0.1, f64::NAN]).resolve(2),
    Err(EncodeError::InvalidDuration { frame: 1 })
  );
  assert_eq!(FrameDurations::Uniform(-1.0).resolve(1), Err(EncodeError::InvalidDuration { frame: 0 }));
}
