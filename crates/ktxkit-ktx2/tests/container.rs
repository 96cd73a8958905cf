use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;

use ktxkit_ktx2::kvd::KEY_ORIENTATION;
use ktxkit_ktx2::dfd::ColorModel;
use ktxkit_ktx2::{
    Allocator, BasisLzGlobalData, BasisLzHeader, BasisLzImageDesc, Capabilities, Error, Format,
    HeapAllocator, Ktx2Texture, Result, SupercompressionScheme, TextureState, TranscodeFormat,
    KTX2_MAGIC,
};
use rstest::rstest;

/// Configure, allocate and fill every image with a byte derived from its address.
fn filled(
    format: Format,
    width: u32,
    height: u32,
    levels: u32,
    faces: u32,
    depth: u32,
    layers: u32,
) -> Ktx2Texture {
    let mut texture = Ktx2Texture::default();
    texture
        .specify_format(format, width, height, levels, faces, depth, layers)
        .unwrap();
    texture.allocate_image_storage().unwrap();

    let geometry = texture.geometry().unwrap();
    for level in 0..geometry.level_count {
        for layer in 0..geometry.layer_count {
            for face in 0..geometry.face_count {
                let size = geometry.face_byte_size(level) as usize;
                let data = vec![fill_byte(level, face, layer); size];
                texture.set_image(&data, level, face, layer).unwrap();
            }
        }
    }
    texture
}

fn fill_byte(level: u32, face: u32, layer: u32) -> u8 {
    (1 + level * 37 + face * 7 + layer * 3) as u8
}

fn assert_same_content(original: &Ktx2Texture, parsed: &Ktx2Texture) {
    assert_eq!(original.header(), parsed.header());
    assert_eq!(original.level_index(), parsed.level_index());
    assert_eq!(original.section_index(), parsed.section_index());
    assert_eq!(original.dfd(), parsed.dfd());
    assert_eq!(original.kvd(), parsed.kvd());

    let geometry = original.geometry().unwrap();
    for level in 0..geometry.level_count {
        for layer in 0..geometry.layer_count {
            for face in 0..geometry.face_count {
                assert_eq!(
                    original.image(level, face, layer).unwrap(),
                    parsed.image(level, face, layer).unwrap(),
                    "level {} face {} layer {}",
                    level,
                    face,
                    layer
                );
            }
        }
    }
}

#[rstest]
#[case::rgba8_mip_chain(Format::R8G8B8A8_UNORM, 4, 4, 3, 1, 0, 1)]
#[case::odd_rgb8(Format::R8G8B8_SRGB, 7, 3, 3, 1, 0, 1)]
#[case::r16f_3d(Format::R16_SFLOAT, 8, 8, 4, 1, 4, 1)]
#[case::cube_array(Format::R8_UNORM, 4, 4, 3, 6, 0, 2)]
#[case::bc1_non_multiple(Format::BC1_RGB_UNORM_BLOCK, 10, 6, 4, 1, 0, 1)]
#[case::astc_6x6_array(Format::ASTC_6x6_SRGB_BLOCK, 13, 13, 2, 1, 0, 3)]
#[case::one_dimensional(Format::R32G32B32A32_SFLOAT, 16, 0, 5, 1, 0, 1)]
fn test_round_trip(
    #[case] format: Format,
    #[case] width: u32,
    #[case] height: u32,
    #[case] levels: u32,
    #[case] faces: u32,
    #[case] depth: u32,
    #[case] layers: u32,
) {
    let mut texture = filled(format, width, height, levels, faces, depth, layers);
    let bytes = texture.to_bytes().unwrap();

    assert_eq!(&bytes[..12], &KTX2_MAGIC);
    assert_eq!(bytes.len() as u64, texture.container_size().unwrap());
    assert_eq!(texture.state(), TextureState::Serialized);

    let parsed = Ktx2Texture::from_bytes(&bytes).unwrap();
    assert_eq!(parsed.state(), TextureState::Parsed);
    assert_same_content(&texture, &parsed);

    let mut reparsed = parsed;
    assert_eq!(reparsed.to_bytes().unwrap(), bytes);
}

#[test]
fn test_round_trip_through_file() {
    let mut texture = filled(Format::R8G8B8A8_SRGB, 8, 8, 4, 1, 0, 1);
    texture
        .kvd_mut()
        .unwrap()
        .add_str(KEY_ORIENTATION, "rd")
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("texture.ktx2");
    texture.write_to_file(&path).unwrap();

    let parsed = Ktx2Texture::open(&path).unwrap();
    assert_same_content(&texture, &parsed);
    assert_eq!(parsed.kvd().unwrap().get_str(KEY_ORIENTATION), Some("rd"));
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        texture.container_size().unwrap()
    );
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Ktx2Texture::open(dir.path().join("missing.ktx2"));
    assert!(matches!(result, Err(Error::IoReadFail { what: "file", .. })));
}

#[test]
fn test_offsets_relative_to_stream_start() {
    let mut texture = filled(Format::R8G8B8A8_UNORM, 4, 4, 3, 1, 0, 1);
    let bytes = texture.to_bytes().unwrap();

    let mut prefixed = vec![0xEE; 5];
    prefixed.extend_from_slice(&bytes);
    let mut cursor = Cursor::new(prefixed.as_slice());
    cursor.set_position(5);

    let mut parsed = Ktx2Texture::default();
    parsed.parse(&mut cursor).unwrap();
    assert_same_content(&texture, &parsed);
}

/// Counts every allocation request it serves.
struct CountingAllocator(Rc<Cell<usize>>);

impl Allocator for CountingAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>> {
        self.0.set(self.0.get() + 1);
        HeapAllocator::new().allocate(size)
    }
}

#[test]
fn test_bad_identifier_rejected_before_allocation() {
    let mut bytes = filled(Format::R8_UNORM, 4, 4, 1, 1, 0, 1).to_bytes().unwrap();
    bytes[1] = b'X';

    let count = Rc::new(Cell::new(0));
    let caps = Capabilities::default().with_allocator(CountingAllocator(Rc::clone(&count)));
    let mut texture = Ktx2Texture::new(caps);

    let result = texture.parse(&mut Cursor::new(&bytes));
    assert!(matches!(result, Err(Error::InvalidIdentifier(id)) if id[1] == b'X'));
    assert_eq!(count.get(), 0);
    assert_eq!(texture.state(), TextureState::Empty);
}

#[test]
fn test_parse_allocates_through_capabilities() {
    let bytes = filled(Format::R8_UNORM, 4, 4, 3, 1, 0, 1).to_bytes().unwrap();

    let count = Rc::new(Cell::new(0));
    let caps = Capabilities::default().with_allocator(CountingAllocator(Rc::clone(&count)));
    let mut texture = Ktx2Texture::new(caps);
    texture.parse(&mut Cursor::new(&bytes)).unwrap();

    // DFD, KVD and one buffer per level.
    assert_eq!(count.get(), 2 + 3);
}

#[test]
fn test_allocation_failure_during_parse() {
    let bytes = filled(Format::R8G8B8A8_UNORM, 16, 16, 1, 1, 0, 1).to_bytes().unwrap();

    let caps = Capabilities::default().with_allocator(HeapAllocator::with_limit(512));
    let mut texture = Ktx2Texture::new(caps);
    let result = texture.parse(&mut Cursor::new(&bytes));

    assert!(matches!(
        result,
        Err(Error::AllocationFailed { what: "mip level", size: 1024 })
    ));
    assert_eq!(texture.state(), TextureState::Empty);
}

#[rstest]
#[case::inside_header(20)]
#[case::inside_level_index(100)]
#[case::inside_last_level(10)]
fn test_truncated_file(#[case] cut: usize) {
    let bytes = filled(Format::R8G8B8A8_UNORM, 4, 4, 3, 1, 0, 1).to_bytes().unwrap();
    let truncated = if cut == 10 {
        &bytes[..bytes.len() - cut]
    } else {
        &bytes[..cut]
    };

    let mut texture = Ktx2Texture::default();
    let result = texture.parse(&mut Cursor::new(truncated));
    assert!(matches!(result, Err(Error::IoReadFail { .. })), "{:?}", result);
    assert!(result.unwrap_err().is_io());
    assert_eq!(texture.state(), TextureState::Empty);
    assert!(texture.dfd().is_none());
    assert!(texture.kvd().is_none());
}

#[test]
fn test_level_length_mismatch_rejected() {
    let bytes = filled(Format::R8G8B8A8_UNORM, 4, 4, 3, 1, 0, 1).to_bytes().unwrap();
    let mut corrupt = bytes.clone();
    // byteLength of file level 0, the 1x1 level: 4 -> 5.
    corrupt[80 + 8] = 5;
    corrupt[80 + 16] = 5;

    let result = Ktx2Texture::from_bytes(&corrupt);
    assert!(matches!(result, Err(Error::InvalidLevelIndexEntry { level: 2, .. })));
}

#[test]
fn test_short_dfd_section_rejected() {
    let bytes = filled(Format::R8_UNORM, 4, 4, 1, 1, 0, 1).to_bytes().unwrap();
    let mut corrupt = bytes.clone();
    // dfdByteLength
    corrupt[52..56].copy_from_slice(&8u32.to_le_bytes());

    assert!(matches!(
        Ktx2Texture::from_bytes(&corrupt),
        Err(Error::InvalidSectionIndex { section: "DFD", .. })
    ));
}

/// Overwrite a little-endian u32 header field.
fn patch_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[rstest]
// pixelWidth, pixelHeight, pixelDepth
#[case::huge_extent(Format::R32G32B32A32_SFLOAT, &[(20, u32::MAX), (24, u32::MAX), (28, u32::MAX)])]
// vkFormat UNDEFINED, layerCount, faceCount
#[case::huge_image_count(Format::R8_UNORM, &[(12, 0), (32, u32::MAX), (36, 6)])]
#[case::huge_cube_array(Format::R8G8B8A8_UNORM, &[(20, u32::MAX), (24, u32::MAX), (32, u32::MAX), (36, 6)])]
fn test_overflowing_header_rejected(#[case] format: Format, #[case] patches: &[(usize, u32)]) {
    let mut bytes = filled(format, 1, 1, 1, 1, 0, 1).to_bytes().unwrap();
    for &(offset, value) in patches {
        patch_u32(&mut bytes, offset, value);
    }

    let mut texture = Ktx2Texture::default();
    let result = texture.parse(&mut Cursor::new(&bytes));
    assert!(matches!(result, Err(Error::InvalidDimensions(_))), "{:?}", result);
    assert_eq!(texture.state(), TextureState::Empty);
}

#[rstest]
#[case::huge_extent(Format::R32G32B32A32_SFLOAT, u32::MAX, u32::MAX, u32::MAX, 1, 1)]
#[case::huge_image_count(Format::UNDEFINED, 1, 1, 0, 6, u32::MAX)]
fn test_specify_format_rejects_overflowing_shape(
    #[case] format: Format,
    #[case] width: u32,
    #[case] height: u32,
    #[case] depth: u32,
    #[case] faces: u32,
    #[case] layers: u32,
) {
    let mut texture = Ktx2Texture::default();
    let result = texture.specify_format(format, width, height, 1, faces, depth, layers);
    assert!(matches!(result, Err(Error::InvalidDimensions(_))), "{:?}", result);
    assert_eq!(texture.state(), TextureState::Empty);
}

#[rstest]
#[case(u64::MAX)]
#[case(u64::MAX - 10)]
#[case(321)]
fn test_image_expecting_past_level_end(#[case] expected_size: u64) {
    let texture = filled(Format::R8G8B8A8_UNORM, 4, 4, 1, 6, 0, 1);

    let result = texture.image_expecting(0, 1, 0, expected_size);
    assert!(
        matches!(result, Err(Error::InvalidImageSize { expected: 320, actual }) if actual == expected_size),
        "{:?}",
        result
    );
    assert_eq!(texture.image_expecting(0, 1, 0, 320).unwrap().len(), 320);
}

#[test]
fn test_level_clamping() {
    let mut texture = Ktx2Texture::default();
    texture
        .specify_format(Format::R8G8B8A8_UNORM, 4, 4, 10, 1, 0, 1)
        .unwrap();
    assert_eq!(texture.level_count(), 3);

    texture
        .specify_format(Format::R8G8B8A8_UNORM, 1, 0, 4, 1, 0, 1)
        .unwrap();
    assert_eq!(texture.level_count(), 1);

    texture
        .specify_format(Format::R8_UNORM, 4, 4, 10, 1, 32, 1)
        .unwrap();
    assert_eq!(texture.level_count(), 6);
}

#[rstest]
#[case(63)]
#[case(65)]
fn test_set_image_size_mismatch(#[case] size: usize) {
    let mut texture = Ktx2Texture::default();
    texture
        .specify_format(Format::R8G8B8A8_UNORM, 4, 4, 3, 1, 0, 1)
        .unwrap();
    texture.allocate_image_storage().unwrap();

    let result = texture.set_image(&vec![0xAB; size], 0, 0, 0);
    assert!(matches!(
        result,
        Err(Error::InvalidImageSize { expected: 64, actual }) if actual == size as u64
    ));
    assert!(texture.image(0, 0, 0).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn test_rgba8_4x4_scenario() {
    let mut texture = Ktx2Texture::default();
    texture
        .specify_format(Format::R8G8B8A8_UNORM, 4, 4, 3, 1, 0, 1)
        .unwrap();
    texture.allocate_image_storage().unwrap();

    let lengths: Vec<u64> = texture.level_index().iter().map(|l| l.byte_length).collect();
    assert_eq!(lengths, [4, 16, 64]);

    texture.set_image(&[9; 64], 0, 0, 0).unwrap();
    assert_eq!(texture.image(0, 0, 0).unwrap().len(), 64);
    assert_eq!(texture.level_data(0).unwrap(), &[9; 64]);
    assert_eq!(texture.level_data(2).unwrap().len(), 4);
}

#[test]
fn test_cube_array_addressing() {
    let texture = filled(Format::R8G8B8A8_UNORM, 8, 8, 2, 6, 0, 3);
    let geometry = texture.geometry().unwrap();

    assert!(texture.is_cubemap());
    assert!(texture.is_array());
    assert_eq!(texture.level_data(0).unwrap().len(), 8 * 8 * 4 * 6 * 3);

    let mut previous = None;
    for layer in 0..3 {
        for face in 0..6 {
            let offset = geometry.face_offset(0, face, layer);
            assert!(previous.map_or(true, |p| offset > p));
            previous = Some(offset);

            let image = texture.image(0, face, layer).unwrap();
            assert!(image.iter().all(|&b| b == fill_byte(0, face, layer)));
        }
    }

    assert!(matches!(
        texture.image(0, 6, 0),
        Err(Error::InvalidFaceIndex { face: 6, count: 6 })
    ));
    assert!(matches!(
        texture.image(0, 0, 3),
        Err(Error::InvalidLayerIndex { layer: 3, count: 3 })
    ));
}

#[rstest]
#[case::zstd(SupercompressionScheme::ZSTANDARD, 3)]
#[case::zlib(SupercompressionScheme::ZLIB, 6)]
fn test_supercompression_round_trip(#[case] scheme: SupercompressionScheme, #[case] level: i32) {
    let mut original = filled(Format::R8G8B8A8_UNORM, 32, 32, 6, 1, 0, 1);
    let plain = original.to_bytes().unwrap();

    let mut texture = Ktx2Texture::from_bytes(&plain).unwrap();
    texture.supercompress(scheme, level).unwrap();
    assert_eq!(texture.supercompression_scheme(), scheme);
    assert!(matches!(texture.image(0, 0, 0), Err(Error::Supercompressed(_))));
    assert!(matches!(
        texture.set_image(&[0; 4096], 0, 0, 0),
        Err(Error::Supercompressed(_))
    ));

    let packed = texture.to_bytes().unwrap();
    assert!(packed.len() < plain.len());

    let mut parsed = Ktx2Texture::from_bytes(&packed).unwrap();
    assert_eq!(parsed.supercompression_scheme(), scheme);
    let top = parsed.level_index().last().unwrap();
    assert_eq!(top.uncompressed_byte_length, 32 * 32 * 4);
    assert!(top.byte_length < top.uncompressed_byte_length);

    parsed.inflate().unwrap();
    assert_eq!(parsed.supercompression_scheme(), SupercompressionScheme::NONE);
    assert_eq!(parsed.to_bytes().unwrap(), plain);
}

#[test]
fn test_basis_lz_is_not_inflated() {
    let mut texture = filled(Format::R8_UNORM, 4, 4, 1, 1, 0, 1);
    assert!(matches!(
        texture.supercompress(SupercompressionScheme::BASIS_LZ, 0),
        Err(Error::UnsupportedSupercompression(SupercompressionScheme::BASIS_LZ))
    ));
}

#[test]
fn test_inflate_with_unbounded_declared_length() {
    let mut texture = filled(Format::R8_UNORM, 4, 4, 1, 1, 0, 1);
    texture
        .supercompress(SupercompressionScheme::ZSTANDARD, 3)
        .unwrap();
    let mut bytes = texture.to_bytes().unwrap();
    // vkFormat UNDEFINED, so the level length cannot be checked against the extent.
    patch_u32(&mut bytes, 12, 0);
    // uncompressedByteLength of the only level.
    bytes[96..104].copy_from_slice(&u64::MAX.to_le_bytes());

    let mut parsed = Ktx2Texture::from_bytes(&bytes).unwrap();
    assert_eq!(parsed.level_index()[0].uncompressed_byte_length, u64::MAX);
    assert!(matches!(
        parsed.inflate(),
        Err(Error::AllocationFailed { size: u64::MAX, .. })
    ));
    assert_eq!(parsed.supercompression_scheme(), SupercompressionScheme::ZSTANDARD);
}

fn basis_global_data() -> BasisLzGlobalData {
    BasisLzGlobalData {
        header: BasisLzHeader {
            endpoint_count: 2,
            selector_count: 3,
            endpoints_byte_length: 5,
            selectors_byte_length: 6,
            tables_byte_length: 7,
            extended_byte_length: 0,
        },
        images: vec![
            BasisLzImageDesc {
                image_flags: BasisLzImageDesc::FLAG_IS_I_FRAME,
                rgb_slice_byte_offset: 0,
                rgb_slice_byte_length: 20,
                alpha_slice_byte_offset: 20,
                alpha_slice_byte_length: 10,
            },
            BasisLzImageDesc {
                rgb_slice_byte_length: 11,
                ..BasisLzImageDesc::default()
            },
        ],
        endpoints: vec![1; 5],
        selectors: vec![2; 6],
        tables: vec![3; 7],
        extended: Vec::new(),
    }
}

#[test]
fn test_basis_lz_round_trip() {
    let global = basis_global_data();
    let mut texture = Ktx2Texture::default();
    texture
        .specify_format(Format::UNDEFINED, 8, 8, 2, 1, 0, 1)
        .unwrap();
    texture
        .set_basis_lz(&global, vec![vec![0xA0; 30], vec![0xA1; 11]])
        .unwrap();

    // Leave the key/value data ending off an 8-byte boundary so the global
    // data needs padding in front of it.
    let layout = texture.layout().unwrap();
    let kvd_end = layout.section_index.kvd_byte_offset + layout.section_index.kvd_byte_length;
    if kvd_end % 8 == 0 {
        // 4-byte length, then "kk\0ab\0" padded to 8 bytes.
        texture.kvd_mut().unwrap().add_str("kk", "ab").unwrap();
    }
    let layout = texture.layout().unwrap();
    let index = layout.section_index;
    assert_ne!((index.kvd_byte_offset + index.kvd_byte_length) % 8, 0);

    let bytes = texture.to_bytes().unwrap();
    let parsed = Ktx2Texture::from_bytes(&bytes).unwrap();
    assert_eq!(parsed.supercompression_scheme(), SupercompressionScheme::BASIS_LZ);
    assert_eq!(parsed.section_index().sgd_byte_offset % 8, 0);
    assert!(parsed.section_index().sgd_byte_offset > (index.kvd_byte_offset + index.kvd_byte_length) as u64);
    assert_eq!(parsed.sgd(), texture.sgd());
    assert_eq!(parsed.sgd(), global.to_bytes());
    assert_eq!(parsed.basis_global_data().unwrap(), Some(global));
    assert_eq!(parsed.level_data(0).unwrap(), &[0xA0; 30]);
    assert_eq!(parsed.level_data(1).unwrap(), &[0xA1; 11]);
    assert!(parsed.level_index().iter().all(|l| l.uncompressed_byte_length == 0));
    assert_eq!(parsed.dfd().unwrap().blocks()[0].header.color_model, ColorModel::ETC1S);

    let slices = parsed.image_slices().unwrap();
    assert_eq!(slices.len(), 2);
    assert_eq!(slices[0].alpha, Some((20, 10)));
    assert_eq!(slices[1].byte_length, 11);

    let mut parsed = parsed;
    assert_eq!(parsed.to_bytes().unwrap(), bytes);
}

#[rstest]
#[case::wrong_level_count(vec![vec![0; 30]])]
#[case::slice_past_level_end(vec![vec![0; 29], vec![0; 11]])]
fn test_set_basis_lz_rejects_inconsistent_data(#[case] levels: Vec<Vec<u8>>) {
    let mut texture = Ktx2Texture::default();
    texture
        .specify_format(Format::UNDEFINED, 8, 8, 2, 1, 0, 1)
        .unwrap();
    assert!(matches!(
        texture.set_basis_lz(&basis_global_data(), levels),
        Err(Error::InvalidSgd(_))
    ));
    assert_eq!(texture.supercompression_scheme(), SupercompressionScheme::NONE);
}

#[test]
fn test_transcode_with_closure() {
    let mut texture = filled(Format::R8G8B8A8_UNORM, 8, 8, 4, 1, 0, 1);
    let mut calls = 0;

    let mut engine = |source: &Ktx2Texture, target: TranscodeFormat| -> Result<Vec<Vec<u8>>> {
        calls += 1;
        assert_eq!(target, TranscodeFormat::Bc7Rgba);
        assert_eq!(source.image_slices()?.len(), 4);
        // 8x8 is four 4x4 blocks; every smaller level is a single block.
        Ok(vec![vec![1u8; 64], vec![2u8; 16], vec![3u8; 16], vec![4u8; 16]])
    };
    texture
        .transcode_with(&mut engine, TranscodeFormat::Bc7Rgba, true)
        .unwrap();
    assert_eq!(calls, 1);

    assert_eq!(texture.format(), Format::BC7_SRGB_BLOCK);
    assert_eq!(texture.image(2, 0, 0).unwrap(), &[3u8; 16]);

    let bytes = texture.to_bytes().unwrap();
    let parsed = Ktx2Texture::from_bytes(&bytes).unwrap();
    assert_same_content(&texture, &parsed);
    assert!(parsed.level_index().iter().all(|l| l.byte_offset % 16 == 0));
}

#[test]
fn test_transcode_with_wrong_level_size() {
    let mut texture = filled(Format::R8G8B8A8_UNORM, 4, 4, 1, 1, 0, 1);
    let mut engine =
        |_: &Ktx2Texture, _: TranscodeFormat| -> Result<Vec<Vec<u8>>> { Ok(vec![vec![0u8; 8]]) };

    let result = texture.transcode_with(&mut engine, TranscodeFormat::Bc7Rgba, false);
    assert!(matches!(
        result,
        Err(Error::InvalidImageSize { expected: 16, actual: 8 })
    ));
    assert_eq!(texture.format(), Format::R8G8B8A8_UNORM);
}

#[test]
fn test_log_hook_sees_parse_progress() {
    let bytes = filled(Format::R8_UNORM, 4, 4, 3, 1, 0, 1).to_bytes().unwrap();

    let messages = Rc::new(Cell::new(0usize));
    let sink = Rc::clone(&messages);
    let caps = Capabilities::default().with_log(move |_| sink.set(sink.get() + 1));
    let mut texture = Ktx2Texture::new(caps);
    texture.parse(&mut Cursor::new(&bytes)).unwrap();

    assert!(messages.get() >= 4);
}
