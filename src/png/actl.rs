use bytemuck::{Pod, Zeroable};

use super::*;
use crate::{FormatError, U32BE};

/// Animation Control Chunk payload, as it's laid out in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
#[allow(nonstandard_style)]
struct acTL {
  num_frames: U32BE,
  num_plays: U32BE,
}

/// The data of an `acTL` chunk.
///
/// Having one of these at all is what makes a PNG an APNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationHeader {
  /// Number of frames in the animation (always at least 1).
  pub frame_count: u32,
  /// Times to play the animation, 0 meaning "forever".
  pub loop_count: u32,
}
impl AnimationHeader {
  /// Length of an `acTL` payload.
  pub const LEN: usize = core::mem::size_of::<acTL>();

  /// Parses an `acTL` payload.
  ///
  /// ## Failure
  /// * [`FormatError::MalformedChunk`] if the length is wrong or the frame
  ///   count is 0.
  pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
    let malformed = FormatError::MalformedChunk { chunk: ChunkType::acTL };
    let actl: acTL = bytemuck::try_pod_read_unaligned(data).map_err(|_| malformed.clone())?;
    let frame_count = actl.num_frames.to_u32();
    if frame_count == 0 {
      return Err(malformed);
    }
    Ok(Self { frame_count, loop_count: actl.num_plays.to_u32() })
  }

  /// Serializes as an `acTL` payload.
  #[inline]
  #[must_use]
  pub fn to_bytes(&self) -> [u8; Self::LEN] {
    let actl = acTL { num_frames: self.frame_count.into(), num_plays: self.loop_count.into() };
    bytemuck::cast(actl)
  }
}

#[test]
fn test_animation_header() {
  let header = AnimationHeader { frame_count: 3, loop_count: 5 };
  assert_eq!(header.to_bytes(), [0, 0, 0, 3, 0, 0, 0, 5]);
  assert_eq!(AnimationHeader::parse(&header.to_bytes()), Ok(header));
  assert!(AnimationHeader::parse(&[0; 8]).is_err());
  assert!(AnimationHeader::parse(&[0, 0, 0, 1, 0, 0, 0]).is_err());
}
