use super::*;
use crate::{try_split_off_u32_be, FormatError};

/// The data of an `fdAT` chunk: a sequence number, then a piece of the
/// frame's zlib stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameDataFragment<'b> {
  /// Position in the stream's shared `fcTL`/`fdAT` sequence.
  pub sequence_number: u32,
  /// Compressed image data, exactly like the payload of an `IDAT`.
  pub data: &'b [u8],
}
impl<'b> FrameDataFragment<'b> {
  /// Splits an `fdAT` payload.
  ///
  /// ## Failure
  /// * [`FormatError::MalformedChunk`] if the payload is too short to hold a
  ///   sequence number.
  #[inline]
  pub fn parse(data: &'b [u8]) -> Result<Self, FormatError> {
    let (sequence_number, data) =
      try_split_off_u32_be(data).ok_or(FormatError::MalformedChunk { chunk: ChunkType::fdAT })?;
    Ok(Self { sequence_number, data })
  }
}

#[test]
fn test_frame_data_fragment() {
  let fragment = FrameDataFragment::parse(&[0, 0, 1, 2, 9, 9]).unwrap();
  assert_eq!(fragment.sequence_number, 258);
  assert_eq!(fragment.data, &[9, 9]);
  assert!(FrameDataFragment::parse(&[0, 0, 1]).is_err());
}
