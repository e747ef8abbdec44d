use alloc::{boxed::Box, collections::TryReserveError, string::String};

use thiserror::Error;

use crate::png::ChunkType;

/// A problem with the PNG/APNG data stream being decoded.
///
/// Decoding never yields a partial animation: the first problem found stops
/// the whole decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FormatError {
  /// The first 8 bytes are not the PNG signature.
  #[error("the data does not start with the PNG signature")]
  BadSignature,

  /// The data ended in the middle of a chunk, or before the `IEND` chunk.
  #[error("the data stream ended early")]
  Truncated,

  /// A chunk's CRC doesn't match its type and payload.
  #[error("{chunk:?} chunk has CRC {declared:#010X}, but its data gives {actual:#010X}")]
  ChecksumMismatch {
    /// The chunk that failed.
    chunk: ChunkType,
    /// The CRC stored in the stream.
    declared: u32,
    /// The CRC computed from the chunk type and payload.
    actual: u32,
  },

  /// An `fcTL` or `fdAT` chunk has the wrong sequence number.
  #[error("expected sequence number {expected}, found {found}")]
  OutOfOrderSequence {
    /// The next number in the shared animation sequence.
    expected: u32,
    /// The number in the chunk.
    found: u32,
  },

  /// The `acTL` frame count doesn't match the frames in the stream.
  #[error("acTL declares {declared} frames, but {found} were found")]
  MissingFrames {
    /// `num_frames` from the `acTL` chunk.
    declared: u32,
    /// Frames actually assembled.
    found: u32,
  },

  /// A frame's image doesn't have the size its control chunk says it has.
  #[error("frame {frame} should be {expected:?}, but is {found:?}")]
  DimensionMismatch {
    /// Index of the frame within the animation.
    frame: usize,
    /// `(width, height)` from the frame control.
    expected: (u32, u32),
    /// `(width, height)` actually found.
    found: (u32, u32),
  },

  /// The stream doesn't begin with an `IHDR` chunk.
  #[error("the first chunk is not IHDR")]
  MissingHeader,

  /// A frame (or the whole image) has no compressed image data.
  #[error("image data is missing")]
  MissingImageData,

  /// A chunk payload has the wrong length or an illegal value.
  #[error("{chunk:?} chunk is malformed")]
  MalformedChunk {
    /// The chunk that failed to parse.
    chunk: ChunkType,
  },

  /// A chunk appeared somewhere it isn't allowed.
  #[error("{chunk:?} chunk is not allowed here")]
  UnexpectedChunk {
    /// The chunk that was out of place.
    chunk: ChunkType,
  },

  /// The image is wider or taller than [`IHDR::MAX_DIMENSION`].
  ///
  /// [`IHDR::MAX_DIMENSION`]: crate::png::IHDR::MAX_DIMENSION
  #[error("{width}x{height} is too large to decode")]
  DimensionsTooLarge {
    /// Width from the header.
    width: u32,
    /// Height from the header.
    height: u32,
  },

  /// A frame region is empty or doesn't fit inside the canvas.
  #[error("frame {frame} does not fit inside the canvas")]
  FrameOutOfBounds {
    /// Index of the frame within the animation.
    frame: usize,
  },

  /// The still image codec couldn't decode a frame.
  #[error("frame image could not be decoded: {0}")]
  Codec(#[from] CodecError),
}

/// A problem while building an encoded stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EncodeError {
  /// No frames were given.
  #[error("there are no frames to encode")]
  EmptyInput,

  /// Frames don't all have the same canvas size.
  #[error("frame {frame} is {found:?}, but the canvas is {expected:?}")]
  InconsistentDimensions {
    /// Index of the offending frame.
    frame: usize,
    /// `(width, height)` of the first frame.
    expected: (u32, u32),
    /// `(width, height)` of the offending frame.
    found: (u32, u32),
  },

  /// A frame duration is negative, infinite, or NaN.
  #[error("frame {frame} has an invalid duration")]
  InvalidDuration {
    /// Index of the offending frame.
    frame: usize,
  },

  /// Per-frame durations were given, but not one per frame.
  #[error("{durations} durations were given for {frames} frames")]
  DurationCountMismatch {
    /// Number of frames.
    frames: usize,
    /// Number of durations.
    durations: usize,
  },

  /// More frames than an `acTL` chunk can count.
  #[error("too many frames for a single animation")]
  TooManyFrames,

  /// A chunk payload was too big to write.
  #[error(transparent)]
  ChunkTooLarge(#[from] ChunkTooLarge),

  /// The still image encoder failed, or gave back output we can't use.
  #[error("the still image encoder failed: {0}")]
  UnderlyingCodecFailure(#[from] CodecError),
}

/// A problem inside the still image (single PNG) codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CodecError {
  /// The zlib data couldn't be inflated.
  #[error("zlib data could not be inflated: {0}")]
  Inflate(String),

  /// The bit depth and color type combination isn't legal PNG.
  #[error("unsupported pixel format: bit depth {bit_depth}, color type {color_type}")]
  Unsupported {
    /// The `IHDR` bit depth.
    bit_depth: u8,
    /// The `IHDR` color type.
    color_type: u8,
  },

  /// The image has a width or height of 0.
  #[error("the image has a width or height of 0")]
  ZeroDimensions,

  /// A bitmap's pixel buffer doesn't match its width and height.
  #[error("expected {expected} pixels, found {found}")]
  BufferSize {
    /// `width * height`
    expected: usize,
    /// Length of the pixel buffer.
    found: usize,
  },

  /// Less decompressed data than the header requires.
  #[error("the decompressed image data is too short")]
  ShortImageData,

  /// A scanline used a filter type that doesn't exist.
  #[error("unknown scanline filter type {0}")]
  BadFilter(u8),

  /// An indexed color image has no `PLTE` chunk.
  #[error("indexed color image has no palette")]
  MissingPalette,

  /// A pixel uses a palette entry past the end of the palette.
  #[error("palette index {index} is past the end of a {len} entry palette")]
  PaletteIndex {
    /// The index the pixel used.
    index: u8,
    /// How many entries the palette has.
    len: usize,
  },

  /// An encoder produced frames in differing pixel formats.
  #[error("encoded frames do not share one pixel format")]
  InconsistentOutput,

  /// The still image data stream itself is malformed.
  #[error("still image data stream: {0}")]
  Stream(Box<FormatError>),

  /// A chunk payload was too big to write.
  #[error(transparent)]
  ChunkTooLarge(#[from] ChunkTooLarge),

  /// The allocator couldn't give us enough space.
  #[error("allocation failed")]
  Alloc,
}
impl From<TryReserveError> for CodecError {
  #[inline]
  fn from(_: TryReserveError) -> Self {
    Self::Alloc
  }
}
impl From<FormatError> for CodecError {
  #[inline]
  fn from(e: FormatError) -> Self {
    Self::Stream(Box::new(e))
  }
}

/// A chunk payload exceeds the PNG limit of `2^31 - 1` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{chunk_type:?} payload of {len} bytes is too large for one chunk")]
pub struct ChunkTooLarge {
  /// The chunk being written.
  pub chunk_type: ChunkType,
  /// Payload length that was rejected.
  pub len: usize,
}
