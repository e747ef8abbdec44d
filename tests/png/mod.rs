use apng_serialization::png::*;
use apng_serialization::*;
use walkdir::WalkDir;

#[test]
fn test_RawChunkIter_no_panics() {
  // iter ALL files in the test folder, even non-png files shouldn't panic it.
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(_) => continue,
    };
    if let Ok(it) = RawChunkIter::new(&v) {
      for _ in it {}
    }
    let _ = decode_apng(&v, &DecodeConfig::default());
  }
  // even totally random data should never panic the iterator!
  for _ in 0..10 {
    let mut v = super::rand_bytes(1024);
    assert_eq!(RawChunkIter::new(&v).err(), Some(FormatError::BadSignature));
    v[..8].copy_from_slice(&PNG_SIGNATURE);
    for _ in RawChunkIter::new(&v).unwrap() {}
    assert!(decode_apng(&v, &DecodeConfig::default()).is_err());
  }
}

#[test]
fn test_decode_random_payloads_no_panics() {
  // valid chunk framing around garbage payloads
  for chunk_type in [ChunkType::IHDR, ChunkType::acTL, ChunkType::fcTL, ChunkType::IDAT, ChunkType::fdAT] {
    for len in [0, 3, 13, 26, 100] {
      let mut writer = ChunkWriter::new();
      if chunk_type != ChunkType::IHDR {
        writer.write_chunk(ChunkType::IHDR, &IHDR::new(4, 4, PixelFormat::RGBA8).to_bytes()).unwrap();
      }
      writer.write_chunk(chunk_type, &super::rand_bytes(len)).unwrap();
      writer.write_chunk(ChunkType::IEND, &[]).unwrap();
      assert!(decode_apng(&writer.finish(), &DecodeConfig::default()).is_err());
    }
  }
}

#[test]
fn test_truncation_is_reported() {
  let image = Bitmap::filled(3, 3, RGBA8888::opaque(9, 8, 7));
  let bytes = encode_images(&[image], &FrameDurations::Uniform(0.0), &EncodeConfig::default()).unwrap();
  for cut in [8, 9, 20, bytes.len() - 13, bytes.len() - 1] {
    assert_eq!(decode_apng(&bytes[..cut], &DecodeConfig::default()), Err(FormatError::Truncated), "cut at {cut}");
  }
}

#[test]
fn test_chunk_types() {
  let image = Bitmap::filled(2, 2, RGBA8888::opaque(1, 2, 3));
  let bytes = encode_images(&[image], &FrameDurations::Uniform(0.0), &EncodeConfig::default()).unwrap();
  assert_eq!(chunk_types(&bytes).unwrap(), vec![ChunkType::IHDR, ChunkType::IDAT, ChunkType::IEND]);
  assert_eq!(chunk_types(b"not a png"), Err(FormatError::BadSignature));
}
