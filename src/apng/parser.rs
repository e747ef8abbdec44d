//! Groups the chunks of a stream into frames.

use alloc::{vec, vec::Vec};

use log::{debug, warn};

use crate::png::*;
use crate::{CodecError, FormatError};

/// The compressed data of one frame: the payloads of its `IDAT` chunks, or
/// the data part of its `fdAT` chunks, in stream order.
///
/// Joined together, the fragments form one zlib stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawFrameData<'b> {
  /// Each chunk's worth of data.
  pub fragments: Vec<&'b [u8]>,
}

/// A frame's control info and data, still compressed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFrame<'b> {
  /// Where the frame goes and how it's drawn.
  pub control: FrameControl,
  /// Seconds to show the frame.
  ///
  /// This is from the control's delay, except for frames made up by the
  /// parser, which use the default duration.
  pub duration: f64,
  /// The frame's image data.
  pub data: RawFrameData<'b>,
}

/// Everything the parser found in a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStream<'b> {
  /// The `IHDR` of the stream. Its size is the canvas size.
  pub header: IHDR,
  /// The `acTL` data, or `None` for a plain PNG.
  pub animation: Option<AnimationHeader>,
  /// The frames, in display order.
  ///
  /// A plain PNG gives a single frame here.
  pub frames: Vec<ParsedFrame<'b>>,
  /// If `frames[0]` is the default image (the `IDAT` data).
  ///
  /// When this is `false` the default image is only a preview for programs
  /// that don't know APNG, and it isn't in `frames` at all.
  pub default_image_is_frame_zero: bool,
  /// `PLTE` and `tRNS` chunks, which every frame shares.
  pub palette_chunks: Vec<RawChunk<'b>>,
}
impl ParsedStream<'_> {
  /// Builds a standalone PNG holding just one frame, for the still image
  /// codec to decode.
  ///
  /// ## Panics
  /// * If the index is out of bounds.
  pub fn frame_png(&self, index: usize) -> Result<Vec<u8>, CodecError> {
    let frame = &self.frames[index];
    let parts = StillImageParts {
      header: self.header.with_dimensions(frame.control.width, frame.control.height),
      palette_chunks: self.palette_chunks.clone(),
      image_data: frame.data.fragments.clone(),
    };
    Ok(parts.to_png()?)
  }
}

/// Progress through the `IDAT` chunks, which must all be in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageDataProgress {
  NotStarted,
  InProgress,
  Done,
}

#[derive(Debug)]
struct FrameAccumulator<'b> {
  control: FrameControl,
  /// The frame's `fcTL` came before any `IDAT`, so its data is the `IDAT`s.
  is_default_image: bool,
  fragments: Vec<&'b [u8]>,
}

#[derive(Debug)]
enum ParseState<'b> {
  AwaitingHeader,
  AwaitingFrameControl,
  AccumulatingFrameData(FrameAccumulator<'b>),
  Finished,
}

struct Parser<'b> {
  state: ParseState<'b>,
  header: Option<IHDR>,
  animation: Option<AnimationHeader>,
  next_sequence_number: u32,
  image_data: ImageDataProgress,
  default_image_is_frame_zero: bool,
  /// `IDAT` data that came before any `fcTL`.
  unclaimed_default_image: Vec<&'b [u8]>,
  palette_chunks: Vec<RawChunk<'b>>,
  frames: Vec<ParsedFrame<'b>>,
}
impl<'b> Parser<'b> {
  const fn new() -> Self {
    Self {
      state: ParseState::AwaitingHeader,
      header: None,
      animation: None,
      next_sequence_number: 0,
      image_data: ImageDataProgress::NotStarted,
      default_image_is_frame_zero: false,
      unclaimed_default_image: Vec::new(),
      palette_chunks: Vec::new(),
      frames: Vec::new(),
    }
  }

  fn feed(&mut self, chunk: RawChunk<'b>) -> Result<(), FormatError> {
    let chunk_type = chunk.chunk_type;
    let unexpected = FormatError::UnexpectedChunk { chunk: chunk_type };
    match self.state {
      ParseState::AwaitingHeader => {
        if chunk_type != ChunkType::IHDR {
          return Err(FormatError::MissingHeader);
        }
        self.header = Some(IHDR::parse(chunk.data)?);
        self.state = ParseState::AwaitingFrameControl;
        return Ok(());
      }
      ParseState::Finished => return Err(unexpected),
      _ => (),
    }
    match chunk_type {
      ChunkType::IHDR => return Err(unexpected),
      ChunkType::acTL => {
        if self.animation.is_some() || self.image_data != ImageDataProgress::NotStarted {
          return Err(unexpected);
        }
        let animation = AnimationHeader::parse(chunk.data)?;
        debug!("animation has {} frames, {} loops", animation.frame_count, animation.loop_count);
        self.animation = Some(animation);
      }
      ChunkType::PLTE | ChunkType::tRNS => {
        if self.image_data != ImageDataProgress::NotStarted {
          return Err(unexpected);
        }
        self.palette_chunks.push(chunk);
      }
      ChunkType::fcTL => self.frame_control(chunk.data)?,
      ChunkType::IDAT => self.image_data(chunk.data)?,
      ChunkType::fdAT => self.frame_data(chunk.data)?,
      ChunkType::IEND => {
        self.finish_frame()?;
        self.state = ParseState::Finished;
      }
      other if other.is_critical() => warn!("skipping unknown critical chunk {other}"),
      _ => (),
    }
    if chunk_type != ChunkType::IDAT && self.image_data == ImageDataProgress::InProgress {
      self.image_data = ImageDataProgress::Done;
    }
    Ok(())
  }

  fn check_sequence_number(&mut self, found: u32) -> Result<(), FormatError> {
    let expected = self.next_sequence_number;
    if found != expected {
      return Err(FormatError::OutOfOrderSequence { expected, found });
    }
    self.next_sequence_number = expected.wrapping_add(1);
    Ok(())
  }

  /// Closes the open frame, if any.
  fn finish_frame(&mut self) -> Result<(), FormatError> {
    let state = core::mem::replace(&mut self.state, ParseState::AwaitingFrameControl);
    if let ParseState::AccumulatingFrameData(FrameAccumulator { control, fragments, .. }) = state {
      if fragments.is_empty() {
        return Err(FormatError::MissingImageData);
      }
      debug!(
        "frame {}: {}x{} at ({}, {}), {} fragments",
        self.frames.len(),
        control.width,
        control.height,
        control.x_offset,
        control.y_offset,
        fragments.len()
      );
      let duration = control.duration();
      self.frames.push(ParsedFrame { control, duration, data: RawFrameData { fragments } });
    }
    Ok(())
  }

  fn frame_control(&mut self, data: &[u8]) -> Result<(), FormatError> {
    if self.animation.is_none() {
      warn!("fcTL chunk without an acTL chunk, ignoring it");
      return Ok(());
    }
    let control = FrameControl::parse(data)?;
    self.check_sequence_number(control.sequence_number)?;
    self.finish_frame()?;
    let is_default_image = self.image_data == ImageDataProgress::NotStarted;
    if is_default_image {
      self.default_image_is_frame_zero = true;
    }
    self.state = ParseState::AccumulatingFrameData(FrameAccumulator {
      control,
      is_default_image,
      fragments: Vec::new(),
    });
    Ok(())
  }

  fn image_data(&mut self, data: &'b [u8]) -> Result<(), FormatError> {
    if self.image_data == ImageDataProgress::Done {
      return Err(FormatError::UnexpectedChunk { chunk: ChunkType::IDAT });
    }
    self.image_data = ImageDataProgress::InProgress;
    match &mut self.state {
      ParseState::AccumulatingFrameData(acc) if acc.is_default_image => acc.fragments.push(data),
      ParseState::AccumulatingFrameData(_) => {
        return Err(FormatError::UnexpectedChunk { chunk: ChunkType::IDAT })
      }
      _ => self.unclaimed_default_image.push(data),
    }
    Ok(())
  }

  fn frame_data(&mut self, data: &'b [u8]) -> Result<(), FormatError> {
    if self.animation.is_none() {
      warn!("fdAT chunk without an acTL chunk, ignoring it");
      return Ok(());
    }
    let fragment = FrameDataFragment::parse(data)?;
    self.check_sequence_number(fragment.sequence_number)?;
    match &mut self.state {
      ParseState::AccumulatingFrameData(acc) if !acc.is_default_image => {
        acc.fragments.push(fragment.data);
        Ok(())
      }
      _ => Err(FormatError::UnexpectedChunk { chunk: ChunkType::fdAT }),
    }
  }

  fn finish(self, default_duration: f64) -> Result<ParsedStream<'b>, FormatError> {
    match self.state {
      ParseState::Finished => (),
      ParseState::AwaitingHeader => return Err(FormatError::MissingHeader),
      _ => return Err(FormatError::Truncated),
    }
    let header = self.header.ok_or(FormatError::MissingHeader)?;
    if self.image_data == ImageDataProgress::NotStarted {
      return Err(FormatError::MissingImageData);
    }
    let canvas = (header.width, header.height);
    let default_frame = |fragments: Vec<&'b [u8]>| ParsedFrame {
      control: FrameControl::full_canvas(0, header.width, header.height),
      duration: default_duration,
      data: RawFrameData { fragments },
    };

    let Some(animation) = self.animation else {
      debug!("no acTL chunk, decoding as a still image");
      return Ok(ParsedStream {
        header,
        animation: None,
        frames: vec![default_frame(self.unclaimed_default_image)],
        default_image_is_frame_zero: true,
        palette_chunks: self.palette_chunks,
      });
    };

    let mut frames = self.frames;
    let mut default_image_is_frame_zero = self.default_image_is_frame_zero;
    let declared = animation.frame_count;
    let found = u32::try_from(frames.len()).unwrap_or(u32::MAX);
    if default_image_is_frame_zero {
      if declared != found {
        return Err(FormatError::MissingFrames { declared, found });
      }
      let first = frames[0].control;
      if (first.x_offset, first.y_offset) != (0, 0) {
        return Err(FormatError::FrameOutOfBounds { frame: 0 });
      }
      if (first.width, first.height) != canvas {
        return Err(FormatError::DimensionMismatch {
          frame: 0,
          expected: canvas,
          found: (first.width, first.height),
        });
      }
    } else if found.checked_add(1) == Some(declared) {
      debug!("acTL counts the default image, using it as frame 0");
      frames.insert(0, default_frame(self.unclaimed_default_image));
      default_image_is_frame_zero = true;
    } else if declared != found {
      return Err(FormatError::MissingFrames { declared, found });
    } else {
      warn!("default image is not part of the animation, ignoring it");
    }

    for (index, frame) in frames.iter().enumerate() {
      let region = frame.control.region();
      if region.is_empty() || !region.fits_within(header.width, header.height) {
        return Err(FormatError::FrameOutOfBounds { frame: index });
      }
    }

    Ok(ParsedStream {
      header,
      animation: Some(animation),
      frames,
      default_image_is_frame_zero,
      palette_chunks: self.palette_chunks,
    })
  }
}

/// Groups a chunk sequence into frames.
///
/// * The sequence must start with `IHDR` and end with `IEND`. The first error
///   from the sequence itself is passed along as is.
/// * The `fcTL` and `fdAT` chunks must carry one shared, gap free, sequence
///   counter starting at 0.
/// * Without an `acTL` chunk the stream is a still image, and you get one
///   full canvas frame lasting `default_duration`. Any `fcTL` or `fdAT`
///   chunks are then ignored.
///
/// The default image is frame 0 if an `fcTL` comes before the first `IDAT`.
/// Otherwise it's a hidden preview, unless the `acTL` frame count is exactly
/// one more than the number of `fcTL` chunks, in which case it becomes frame
/// 0 (full canvas, lasting `default_duration`).
pub fn parse<'b, I>(chunks: I, default_duration: f64) -> Result<ParsedStream<'b>, FormatError>
where
  I: IntoIterator<Item = Result<RawChunk<'b>, FormatError>>,
{
  let mut parser = Parser::new();
  for chunk in chunks {
    parser.feed(chunk?)?;
  }
  parser.finish(default_duration)
}

/// Runs [`parse`] on the chunks of some PNG bytes.
#[inline]
pub fn parse_bytes(bytes: &[u8], default_duration: f64) -> Result<ParsedStream<'_>, FormatError> {
  parse(RawChunkIter::new(bytes)?, default_duration)
}
