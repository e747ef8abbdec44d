use std::sync::Mutex;

use apng_serialization::png::*;
use apng_serialization::*;

const RED: RGBA8888 = RGBA8888::opaque(255, 0, 0);
const GREEN: RGBA8888 = RGBA8888::opaque(0, 255, 0);
const BLUE: RGBA8888 = RGBA8888::opaque(0, 0, 255);
const HALF_GREEN: RGBA8888 = RGBA8888::new(0, 255, 0, 128);

/// The compressed image data of a bitmap, as the still codec writes it.
fn frame_data(image: &Bitmap) -> Vec<u8> {
  let png = PngStillCodec.encode(image, 1.0).unwrap();
  StillImageParts::parse(&png).unwrap().image_data.concat()
}

/// Writes an APNG by hand, with frame 0 as the default image. The sequence
/// numbers of the controls are filled in.
fn custom_apng(width: u32, height: u32, frames: &[(FrameControl, Bitmap)]) -> Vec<u8> {
  let mut writer = ChunkWriter::new();
  writer.write_chunk(ChunkType::IHDR, &IHDR::new(width, height, PixelFormat::RGBA8).to_bytes()).unwrap();
  let actl = AnimationHeader { frame_count: frames.len() as u32, loop_count: 0 };
  writer.write_chunk(ChunkType::acTL, &actl.to_bytes()).unwrap();
  let mut sequence_number = 0_u32;
  for (i, (control, image)) in frames.iter().enumerate() {
    let control = FrameControl { sequence_number, ..*control };
    sequence_number += 1;
    writer.write_chunk(ChunkType::fcTL, &control.to_bytes()).unwrap();
    let data = frame_data(image);
    if i == 0 {
      writer.write_chunk(ChunkType::IDAT, &data).unwrap();
    } else {
      writer.write_chunk_parts(ChunkType::fdAT, &[&sequence_number.to_be_bytes(), &data]).unwrap();
      sequence_number += 1;
    }
  }
  writer.write_chunk(ChunkType::IEND, &[]).unwrap();
  writer.finish()
}

/// The type and payload range of every chunk.
fn chunk_spans(bytes: &[u8]) -> Vec<(ChunkType, core::ops::Range<usize>)> {
  let mut out = Vec::new();
  let mut pos = 8;
  while pos < bytes.len() {
    let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
    let chunk_type = ChunkType(bytes[pos + 4..pos + 8].try_into().unwrap());
    out.push((chunk_type, pos + 8..pos + 8 + len));
    pos += 12 + len;
  }
  out
}

fn sub_region(x: u32, y: u32, dispose_op: DisposeOp, blend_op: BlendOp) -> FrameControl {
  FrameControl { x_offset: x, y_offset: y, dispose_op, blend_op, ..FrameControl::full_canvas(0, 1, 1) }
}

#[test]
fn test_round_trip_frames_and_durations() {
  let images = vec![Bitmap::filled(5, 3, RED), Bitmap::filled(5, 3, GREEN), Bitmap::filled(5, 3, HALF_GREEN)];
  let durations = vec![0.1, 0.25, 1.5];
  let config = EncodeConfig::default().with_loop_count(2);
  let bytes = encode_images(&images, &FrameDurations::PerFrame(durations.clone()), &config).unwrap();
  let animation = decode_apng(&bytes, &DecodeConfig::default()).unwrap();
  assert!(animation.is_animated());
  assert_eq!((animation.width, animation.height), (5, 3));
  assert_eq!(animation.loop_count, 2);
  assert_eq!(animation.frames.len(), 3);
  for ((frame, image), duration) in animation.frames.iter().zip(&images).zip(&durations) {
    assert_eq!(&frame.image, image);
    assert!((frame.duration - duration).abs() <= 0.01);
  }
  assert!((animation.total_duration() - 1.85).abs() <= 0.03);
}

#[test]
fn test_round_trip_patterned_frames() {
  let pattern = |seed: u8| {
    let pixels = (0..64_u8).map(|i| RGBA8888::new(i.wrapping_mul(seed), i ^ seed, 255 - i, i * 4)).collect();
    Bitmap::from_pixels(8, 8, pixels).unwrap()
  };
  let images = vec![pattern(3), pattern(7), pattern(11), pattern(13)];
  for quality in [0.0, 1.0] {
    let config = EncodeConfig::default().with_quality(quality).with_max_fragment_len(17);
    let bytes = encode_images(&images, &FrameDurations::Uniform(0.04), &config).unwrap();
    let animation = decode_apng(&bytes, &DecodeConfig::default()).unwrap();
    let decoded: Vec<Bitmap> = animation.frames.into_iter().map(|frame| frame.image).collect();
    assert_eq!(decoded, images);
  }
}

#[test]
fn test_single_frame_is_plain_png() {
  let image = Bitmap::filled(4, 4, BLUE);
  let bytes = encode_images(&[image.clone()], &FrameDurations::Uniform(2.0), &EncodeConfig::default()).unwrap();
  let types = chunk_types(&bytes).unwrap();
  assert!(!types.contains(&ChunkType::acTL));
  assert!(!types.contains(&ChunkType::fcTL));
  let animation = decode_apng(&bytes, &DecodeConfig::default().with_default_duration(0.7)).unwrap();
  assert!(!animation.is_animated());
  assert_eq!(animation.frames.len(), 1);
  assert_eq!(animation.frames[0].image, image);
  assert_eq!(animation.frames[0].duration, 0.7);
}

#[test]
fn test_checksum_enforced_on_every_payload_byte() {
  let images = vec![Bitmap::filled(2, 2, RED), Bitmap::filled(2, 2, BLUE)];
  let bytes = encode_images(&images, &FrameDurations::Uniform(0.1), &EncodeConfig::default()).unwrap();
  for (chunk_type, payload) in chunk_spans(&bytes) {
    for i in payload {
      let mut corrupt = bytes.clone();
      corrupt[i] ^= 0x20;
      match decode_apng(&corrupt, &DecodeConfig::default()) {
        Err(FormatError::ChecksumMismatch { chunk, .. }) => assert_eq!(chunk, chunk_type),
        other => panic!("byte {i} of {chunk_type}: {other:?}"),
      }
    }
  }
}

#[test]
fn test_loop_count_preserved() {
  let images = vec![Bitmap::filled(1, 1, RED), Bitmap::filled(1, 1, BLUE)];
  for loop_count in [0, 5] {
    let config = EncodeConfig::default().with_loop_count(loop_count);
    let bytes = encode_images(&images, &FrameDurations::Uniform(0.1), &config).unwrap();
    assert_eq!(decode_apng(&bytes, &DecodeConfig::default()).unwrap().loop_count, loop_count);
  }
}

#[test]
fn test_skipped_sequence_number() {
  let images = vec![Bitmap::filled(2, 2, RED), Bitmap::filled(2, 2, BLUE)];
  let mut bytes = encode_images(&images, &FrameDurations::Uniform(0.1), &EncodeConfig::default()).unwrap();
  let (_, payload) = chunk_spans(&bytes).into_iter().find(|(chunk_type, _)| *chunk_type == ChunkType::fdAT).unwrap();
  assert_eq!(&bytes[payload.start..payload.start + 4], &[0, 0, 0, 2]);
  bytes[payload.start + 3] = 3;
  let crc = chunk_crc(*b"fdAT", &[&bytes[payload.clone()]]);
  bytes[payload.end..payload.end + 4].copy_from_slice(&crc.to_be_bytes());
  assert_eq!(
    decode_apng(&bytes, &DecodeConfig::default()),
    Err(FormatError::OutOfOrderSequence { expected: 2, found: 3 })
  );
}

#[test]
fn test_background_disposal_shows_through_blend() {
  let bytes = custom_apng(
    2,
    2,
    &[
      (FrameControl::full_canvas(0, 2, 2), Bitmap::filled(2, 2, RED)),
      (sub_region(1, 1, DisposeOp::Background, BlendOp::Source), Bitmap::filled(1, 1, BLUE)),
      (sub_region(1, 1, DisposeOp::None, BlendOp::Over), Bitmap::filled(1, 1, HALF_GREEN)),
    ],
  );
  let frames = decode_apng(&bytes, &DecodeConfig::default()).unwrap().frames;
  assert_eq!(frames[1].image.pixels, vec![RED, RED, RED, BLUE]);
  let expected = HALF_GREEN.over(RGBA8888::TRANSPARENT);
  assert_eq!(frames[2].image.pixels, vec![RED, RED, RED, expected]);
  assert_ne!(expected, HALF_GREEN.over(BLUE));
}

#[test]
fn test_previous_disposal_restores_first_frame() {
  let base = (FrameControl::full_canvas(0, 2, 2), Bitmap::filled(2, 2, RED));
  let covered = (sub_region(0, 1, DisposeOp::Previous, BlendOp::Source), Bitmap::filled(1, 1, BLUE));

  let bytes = custom_apng(
    2,
    2,
    &[base.clone(), covered.clone(), (sub_region(0, 1, DisposeOp::None, BlendOp::Source), Bitmap::filled(1, 1, GREEN))],
  );
  let frames = decode_apng(&bytes, &DecodeConfig::default()).unwrap().frames;
  assert_eq!(frames[0].image.pixels, vec![RED; 4]);
  assert_eq!(frames[1].image.pixels, vec![RED, RED, BLUE, RED]);
  assert_eq!(frames[2].image.pixels, vec![RED, RED, GREEN, RED]);

  let bytes = custom_apng(
    2,
    2,
    &[base, covered, (sub_region(0, 1, DisposeOp::None, BlendOp::Over), Bitmap::filled(1, 1, HALF_GREEN))],
  );
  let frames = decode_apng(&bytes, &DecodeConfig::default()).unwrap().frames;
  assert_eq!(frames[2].image.pixels, vec![RED, RED, HALF_GREEN.over(RED), RED]);
  // the frame before is still its own image
  assert_eq!(frames[1].image.pixels, vec![RED, RED, BLUE, RED]);
}

/// An APNG whose default image comes before the only `fcTL`.
fn default_image_stream(preview: &Bitmap, frame: &Bitmap, frame_count: u32) -> Vec<u8> {
  let mut writer = ChunkWriter::new();
  writer.write_chunk(ChunkType::IHDR, &IHDR::new(2, 2, PixelFormat::RGBA8).to_bytes()).unwrap();
  let actl = AnimationHeader { frame_count, loop_count: 0 };
  writer.write_chunk(ChunkType::acTL, &actl.to_bytes()).unwrap();
  writer.write_chunk(ChunkType::IDAT, &frame_data(preview)).unwrap();
  let control = FrameControl { delay_num: 3, delay_den: 10, ..FrameControl::full_canvas(0, 2, 2) };
  writer.write_chunk(ChunkType::fcTL, &control.to_bytes()).unwrap();
  writer.write_chunk_parts(ChunkType::fdAT, &[&1_u32.to_be_bytes(), &frame_data(frame)]).unwrap();
  writer.write_chunk(ChunkType::IEND, &[]).unwrap();
  writer.finish()
}

#[test]
fn test_hidden_and_promoted_default_image() {
  let preview = Bitmap::filled(2, 2, BLUE);
  let frame = Bitmap::filled(2, 2, GREEN);
  let config = DecodeConfig::default().with_default_duration(0.5);

  let hidden = decode_apng(&default_image_stream(&preview, &frame, 1), &config).unwrap();
  assert_eq!(hidden.frames.len(), 1);
  assert_eq!(hidden.frames[0].image, frame);
  assert_eq!(hidden.frames[0].duration, 0.3);

  let promoted = decode_apng(&default_image_stream(&preview, &frame, 2), &config).unwrap();
  assert_eq!(promoted.frames.len(), 2);
  assert_eq!(promoted.frames[0].image, preview);
  assert_eq!(promoted.frames[0].duration, 0.5);
  assert_eq!(promoted.frames[1].image, frame);

  assert_eq!(
    decode_apng(&default_image_stream(&preview, &frame, 4), &config),
    Err(FormatError::MissingFrames { declared: 4, found: 1 })
  );
}

/// Keeps the text of every warning logged by any test in this binary.
struct WarningLog;
static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());
impl log::Log for WarningLog {
  fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
    metadata.level() <= log::Level::Warn
  }
  fn log(&self, record: &log::Record<'_>) {
    if record.level() == log::Level::Warn {
      WARNINGS.lock().unwrap().push(record.args().to_string());
    }
  }
  fn flush(&self) {}
}

#[test]
fn test_hidden_default_image_logs_warning() {
  if log::set_logger(&WarningLog).is_ok() {
    log::set_max_level(log::LevelFilter::Warn);
  }
  let bytes = default_image_stream(&Bitmap::filled(2, 2, BLUE), &Bitmap::filled(2, 2, GREEN), 1);
  decode_apng(&bytes, &DecodeConfig::default()).unwrap();
  assert!(WARNINGS.lock().unwrap().iter().any(|message| message.contains("default image")));
}

#[test]
fn test_frame_with_wrong_size_data() {
  // the control says 1x1, but the data is a 2x2 image's data, which is too
  // much data for the still codec
  let mut writer = ChunkWriter::new();
  writer.write_chunk(ChunkType::IHDR, &IHDR::new(2, 2, PixelFormat::RGBA8).to_bytes()).unwrap();
  writer.write_chunk(ChunkType::acTL, &AnimationHeader { frame_count: 2, loop_count: 0 }.to_bytes()).unwrap();
  writer.write_chunk(ChunkType::fcTL, &FrameControl::full_canvas(0, 2, 2).to_bytes()).unwrap();
  writer.write_chunk(ChunkType::IDAT, &frame_data(&Bitmap::filled(2, 2, RED))).unwrap();
  writer.write_chunk(ChunkType::fcTL, &FrameControl::full_canvas(1, 1, 1).to_bytes()).unwrap();
  writer.write_chunk_parts(ChunkType::fdAT, &[&2_u32.to_be_bytes(), &frame_data(&Bitmap::filled(2, 2, BLUE))]).unwrap();
  writer.write_chunk(ChunkType::IEND, &[]).unwrap();
  assert!(matches!(decode_apng(&writer.finish(), &DecodeConfig::default()), Err(FormatError::Codec(_))));
}

/// A codec that ignores the frame header and always decodes to 3x3.
struct WrongSize;
impl StillImageCodec for WrongSize {
  fn decode(&self, _png: &[u8]) -> Result<Bitmap, CodecError> {
    Ok(Bitmap::new(3, 3))
  }
  fn encode(&self, bitmap: &Bitmap, quality: f32) -> Result<Vec<u8>, CodecError> {
    PngStillCodec.encode(bitmap, quality)
  }
}

#[test]
fn test_dimension_mismatch_is_fatal() {
  let images = vec![Bitmap::filled(2, 2, RED), Bitmap::filled(2, 2, BLUE)];
  let bytes = encode_images(&images, &FrameDurations::Uniform(0.1), &EncodeConfig::default()).unwrap();
  assert_eq!(
    decode_apng_with(&WrongSize, &bytes, &DecodeConfig::default()),
    Err(FormatError::DimensionMismatch { frame: 0, expected: (2, 2), found: (3, 3) })
  );
}

#[test]
fn test_encode_errors() {
  let config = EncodeConfig::default();
  assert_eq!(encode_images(&[], &FrameDurations::Uniform(0.1), &config), Err(EncodeError::EmptyInput));
  let images = vec![Bitmap::filled(2, 2, RED), Bitmap::filled(3, 2, RED)];
  assert_eq!(
    encode_images(&images, &FrameDurations::Uniform(0.1), &config),
    Err(EncodeError::InconsistentDimensions { frame: 1, expected: (2, 2), found: (3, 2) })
  );
  let images = vec![Bitmap::filled(2, 2, RED), Bitmap::filled(2, 2, BLUE)];
  assert_eq!(
    encode_images(&images, &FrameDurations::PerFrame(vec![0.1]), &config),
    Err(EncodeError::DurationCountMismatch { frames: 2, durations: 1 })
  );
  assert_eq!(
    encode_images(&images, &FrameDurations::Uniform(-0.5), &config),
    Err(EncodeError::InvalidDuration { frame: 0 })
  );
}

#[test]
fn test_transcode_decoded_animation() {
  let images = vec![Bitmap::filled(3, 3, RED), Bitmap::filled(3, 3, HALF_GREEN), Bitmap::filled(3, 3, BLUE)];
  let durations = FrameDurations::PerFrame(vec![0.5, 0.0, 0.125]);
  let bytes = encode_images(&images, &durations, &EncodeConfig::default()).unwrap();
  let animation = decode_apng(&bytes, &DecodeConfig::default()).unwrap();

  let again = encode_frames(&animation.frames, &EncodeConfig::default()).unwrap();
  assert_eq!(decode_apng(&again, &DecodeConfig::default()).unwrap(), animation);

  let again = encode_animated_image(&animation, &EncodeConfig::default()).unwrap();
  assert_eq!(decode_apng(&again, &DecodeConfig::default()).unwrap(), animation);
}

/// Three frames that only know their total duration.
struct Flipbook(Vec<Bitmap>);
impl AnimatedImage for Flipbook {
  fn frame_count(&self) -> usize {
    self.0.len()
  }
  fn frame(&self, index: usize) -> Option<&Bitmap> {
    self.0.get(index)
  }
  fn duration(&self) -> f64 {
    0.9
  }
}

#[test]
fn test_animated_image_splits_duration() {
  let book = Flipbook(vec![Bitmap::filled(1, 2, RED), Bitmap::filled(1, 2, GREEN), Bitmap::filled(1, 2, BLUE)]);
  let bytes = encode_animated_image(&book, &EncodeConfig::default()).unwrap();
  let animation = decode_apng(&bytes, &DecodeConfig::default()).unwrap();
  assert_eq!(animation.frames.len(), 3);
  for frame in &animation.frames {
    assert!((frame.duration - 0.3).abs() < 1e-9);
  }
  assert_eq!(encode_animated_image(&Flipbook(Vec::new()), &EncodeConfig::default()), Err(EncodeError::EmptyInput));
}

/// Has a hole at index 1, and gives every frame its own duration.
struct Gappy([Option<Bitmap>; 3]);
impl AnimatedImage for Gappy {
  fn frame_count(&self) -> usize {
    self.0.len()
  }
  fn frame(&self, index: usize) -> Option<&Bitmap> {
    self.0.get(index)?.as_ref()
  }
  fn duration(&self) -> f64 {
    0.6
  }
  fn frame_duration(&self, index: usize) -> Option<f64> {
    [0.1, 0.2, 0.3].get(index).copied()
  }
}

#[test]
fn test_animated_image_missing_frame_keeps_durations() {
  let gappy = Gappy([Some(Bitmap::filled(1, 1, RED)), None, Some(Bitmap::filled(1, 1, BLUE))]);
  let bytes = encode_animated_image(&gappy, &EncodeConfig::default()).unwrap();
  let frames = decode_apng(&bytes, &DecodeConfig::default()).unwrap().frames;
  assert_eq!(frames.len(), 2);
  assert_eq!(frames[0].image.pixels, vec![RED]);
  assert_eq!(frames[0].duration, 0.1);
  assert_eq!(frames[1].image.pixels, vec![BLUE]);
  assert_eq!(frames[1].duration, 0.3);
}

#[test]
fn test_huge_header_is_rejected_before_allocating() {
  let huge = IHDR::new(60_000, 60_000, PixelFormat::RGBA8);
  let mut writer = ChunkWriter::new();
  writer.write_chunk(ChunkType::IHDR, &huge.to_bytes()).unwrap();
  writer.write_chunk(ChunkType::IDAT, &[0x78, 0x9C, 0x03, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
  writer.write_chunk(ChunkType::IEND, &[]).unwrap();
  let bytes = writer.finish();
  assert_eq!(
    decode_apng(&bytes, &DecodeConfig::default()),
    Err(FormatError::DimensionsTooLarge { width: 60_000, height: 60_000 })
  );
}

#[test]
fn test_decode_config_total_duration_and_scale() {
  let images = vec![Bitmap::filled(1, 1, RED), Bitmap::filled(1, 1, BLUE)];
  let bytes = encode_images(&images, &FrameDurations::PerFrame(vec![0.1, 0.3]), &EncodeConfig::default()).unwrap();
  let config = DecodeConfig::default().with_total_duration(2.0).with_scale(2.0);
  let animation = decode_apng(&bytes, &config).unwrap();
  assert_eq!(animation.scale, 2.0);
  assert!((animation.frames[0].duration - 0.5).abs() < 1e-9);
  assert!((animation.frames[1].duration - 1.5).abs() < 1e-9);
}
