// Integration tests using the test_utils module

use jpeg_comment_io::{
    markers, test_utils::*, ByteOrder, Charset, Error, ExifDecoder, JpegDocument, JpegIO,
    SegmentSource,
};
use std::fs;
use std::io::Cursor;
use std::path::Path;

fn fixture(dir: &Path, name: &str, builder: JpegBuilder) -> std::path::PathBuf {
    write_fixture(dir, name, &builder.build()).expect("write fixture")
}

fn markers_of(doc: &JpegDocument) -> Vec<u8> {
    doc.segments().iter().map(|s| s.marker).collect()
}

#[test]
fn test_round_trip_identity() {
    let tiff = TiffBuilder::new(ByteOrder::LittleEndian)
        .orientation(6)
        .make("Acme")
        .user_comment("exif text")
        .gps_version()
        .build();
    let bytes = JpegBuilder::new()
        .jfif()
        .exif(&tiff)
        .xmp("<x:xmpmeta/>")
        .comment("jfif text")
        .segment(0xE2, b"ICC_PROFILE\0\x01\x01")
        .baseline_image()
        .raw(b"trailer")
        .build();

    let structure = JpegIO::new().parse(&mut Cursor::new(&bytes)).unwrap();
    let mut out = Vec::new();
    JpegIO::new()
        .write(&structure.catalog, &mut Cursor::new(&bytes), &mut out)
        .unwrap();
    assert_eq!(out, bytes);

    // Segment by segment: every offset-mode range points at the original bytes
    for segment in structure.catalog.segments() {
        if let Some(range) = segment.range() {
            let end = range.end_offset() as usize;
            assert!(end <= bytes.len(), "{} overruns the file", segment);
        }
    }
}

#[test]
fn test_comment_idempotence() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(dir.path(), "a.jpg", JpegBuilder::new().jfif().baseline_image());

    let mut doc = JpegDocument::open(&path).unwrap();
    for len in [1usize, 80, 1024, 4096, 8000] {
        let text: String = (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        doc.set_comment(&text).unwrap();
        assert_eq!(doc.comment(), text);
    }
}

#[test]
fn test_comment_replace_not_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(dir.path(), "a.jpg", JpegBuilder::new().jfif().baseline_image());

    let mut doc = JpegDocument::open(&path).unwrap();
    doc.set_comment("first").unwrap();
    doc.set_comment("second").unwrap();

    let coms = doc.segments().iter().filter(|s| s.is_comment()).count();
    assert_eq!(coms, 1);
    assert_eq!(doc.catalog().comment_count(), 1);

    let out = dir.path().join("b.jpg");
    doc.save(&out).unwrap();
    let saved = JpegDocument::open(&out).unwrap();
    assert_eq!(saved.catalog().comment_count(), 1);
    assert_eq!(saved.comment(), "second");
}

#[test]
fn test_existing_comment_replaced_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let builder = JpegBuilder::new().jfif().comment("old").dqt().image_tail();
    let path = fixture(dir.path(), "a.jpg", builder);

    let mut doc = JpegDocument::open(&path).unwrap();
    let before = markers_of(&doc);
    doc.set_comment("a longer replacement").unwrap();
    assert_eq!(markers_of(&doc), before);

    let index = doc.catalog().comment_index().unwrap();
    let com = &doc.segments()[index];
    assert!(matches!(com.source, SegmentSource::Buffer(_)));
    assert_eq!(com.length, "a longer replacement".len() as u64);
}

#[test]
fn test_insert_after_last_app() {
    let dir = tempfile::tempdir().unwrap();
    let tiff = TiffBuilder::new(ByteOrder::BigEndian).build();
    let builder = JpegBuilder::new()
        .jfif()
        .exif(&tiff)
        .segment(0xED, b"Photoshop 3.0\0")
        .baseline_image();
    let path = fixture(dir.path(), "a.jpg", builder);

    let mut doc = JpegDocument::open(&path).unwrap();
    doc.set_comment("c").unwrap();
    assert_eq!(
        &markers_of(&doc)[..6],
        &[
            markers::SOI,
            markers::APP0,
            markers::APP1,
            0xED,
            markers::COM,
            markers::DQT
        ]
    );
}

#[test]
fn test_insert_after_soi_without_app() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(dir.path(), "a.jpg", JpegBuilder::new().baseline_image());

    let mut doc = JpegDocument::open(&path).unwrap();
    doc.set_comment("c").unwrap();
    assert_eq!(&markers_of(&doc)[..3], &[markers::SOI, markers::COM, markers::DQT]);
}

#[test]
fn test_exif_priority() {
    let dir = tempfile::tempdir().unwrap();
    let tiff = TiffBuilder::new(ByteOrder::BigEndian).user_comment("B").build();
    let path = fixture(
        dir.path(),
        "a.jpg",
        JpegBuilder::new().exif(&tiff).comment("A").baseline_image(),
    );

    let doc = JpegDocument::open(&path).unwrap();
    assert_eq!(doc.comment(), "B");
    assert_eq!(doc.jfif_comment(), Some("A"));
}

#[test]
fn test_empty_exif_comment_falls_back_to_com() {
    let dir = tempfile::tempdir().unwrap();
    let tiff = TiffBuilder::new(ByteOrder::LittleEndian).user_comment("").build();
    let path = fixture(
        dir.path(),
        "a.jpg",
        JpegBuilder::new().exif(&tiff).comment("A").baseline_image(),
    );

    assert_eq!(JpegDocument::open(&path).unwrap().comment(), "A");
}

#[test]
fn test_unicode_user_comment() {
    let mut raw = b"UNICODE\0".to_vec();
    for unit in "héllo".encode_utf16() {
        raw.extend_from_slice(&unit.to_be_bytes());
    }
    let tiff = TiffBuilder::new(ByteOrder::BigEndian).raw_user_comment(raw).build();
    let exif = ExifDecoder::parse(tiff, 0).unwrap();

    assert_eq!(exif.user_comment_charset(), Some(Charset::Unicode));
    assert_eq!(exif.user_comment(), "héllo");
}

#[test]
fn test_endian_correctness() {
    let le = ExifDecoder::parse(TiffBuilder::new(ByteOrder::LittleEndian).build(), 0).unwrap();
    let be = ExifDecoder::parse(TiffBuilder::new(ByteOrder::BigEndian).build(), 0).unwrap();

    assert_eq!(le.get16(&[0x02, 0x01]), 0x0102);
    assert_eq!(be.get16(&[0x01, 0x02]), 0x0102);
    assert_eq!(le.get32(&[0x04, 0x03, 0x02, 0x01]), 0x0102_0304);
    assert_eq!(be.get32(&[0x01, 0x02, 0x03, 0x04]), 0x0102_0304);

    let le_tiff = TiffBuilder::new(ByteOrder::LittleEndian).orientation(0x0102).build();
    let be_tiff = TiffBuilder::new(ByteOrder::BigEndian).orientation(0x0102).build();
    let le = ExifDecoder::parse(le_tiff, 0).unwrap();
    let be = ExifDecoder::parse(be_tiff, 0).unwrap();
    assert_eq!(le.orientation(), Some(0x0102));
    assert_eq!(be.orientation(), Some(0x0102));
}

#[test]
fn test_unknown_marker_passthrough() {
    let dir = tempfile::tempdir().unwrap();
    let unknown = b"vendor payload";
    let path = fixture(
        dir.path(),
        "a.jpg",
        JpegBuilder::new().dqt().segment(0xF1, unknown).image_tail(),
    );

    let mut doc = JpegDocument::open(&path).unwrap();
    let names: Vec<&str> = doc.segments().iter().map(|s| s.name).collect();
    assert_eq!(names[2], "NOTPARSED");

    doc.set_comment("c").unwrap();
    let out = dir.path().join("b.jpg");
    doc.save(&out).unwrap();

    let expected = JpegBuilder::new()
        .comment("c")
        .dqt()
        .segment(0xF1, unknown)
        .image_tail()
        .build();
    assert_eq!(fs::read(&out).unwrap(), expected);
}

#[test]
fn test_same_file_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(
        dir.path(),
        "a.jpg",
        JpegBuilder::new().jfif().comment("before").baseline_image(),
    );

    let mut doc = JpegDocument::open(&path).unwrap();
    doc.set_comment("after").unwrap();
    let saved_to = doc.save(&path).unwrap();

    assert_eq!(saved_to, path);
    assert!(!dir.path().join("a.jpg.tmp").exists());
    assert!(!doc.is_dirty());
    assert_eq!(doc.comment(), "after");
    assert!(matches!(doc.save(&path), Err(Error::NotModified)));

    let expected = JpegBuilder::new()
        .jfif()
        .comment("after")
        .baseline_image()
        .build();
    assert_eq!(fs::read(&path).unwrap(), expected);
}

#[test]
fn test_same_file_save_custom_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(dir.path(), "a.jpg", JpegBuilder::new().baseline_image());

    let options = jpeg_comment_io::DocumentOptions::new().temp_suffix(".partial");
    let mut doc = JpegDocument::open_with(&path, options).unwrap();
    doc.set_comment("x").unwrap();
    doc.save(&path).unwrap();

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
    assert_eq!(JpegDocument::open(&path).unwrap().comment(), "x");
}

#[test]
fn test_save_elsewhere_keeps_source() {
    let dir = tempfile::tempdir().unwrap();
    let original = JpegBuilder::new().comment("keep").baseline_image().build();
    let path = write_fixture(dir.path(), "a.jpg", &original).unwrap();

    let mut doc = JpegDocument::open(&path).unwrap();
    doc.set_comment("copy").unwrap();
    doc.save(dir.path().join("b.jpg")).unwrap();

    assert_eq!(fs::read(&path).unwrap(), original);
    assert_eq!(doc.path(), Some(path.as_path()));
    assert!(doc.is_dirty());
}

#[test]
fn test_malformed_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "a.jpg", b"GIF89a\x01\x00").unwrap();
    assert!(matches!(JpegDocument::open(&path), Err(Error::NotJpeg)));

    let empty = write_fixture(dir.path(), "empty.jpg", b"").unwrap();
    assert!(JpegDocument::open(&empty).is_err());

    assert!(matches!(
        JpegDocument::open(dir.path().join("missing.jpg")),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_truncated_app1_scan_completes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        dir.path(),
        "a.jpg",
        &[0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x14, b'E', b'x', b'i'],
    )
    .unwrap();

    let doc = JpegDocument::open(&path).unwrap();
    let names: Vec<&str> = doc.segments().iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["SOI", "APP1", "DATA"]);
    assert!(doc.exif().is_none());
    assert_eq!(doc.comment(), "");
}

#[test]
fn test_failed_save_removes_output() {
    let dir = tempfile::tempdir().unwrap();
    let original = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x14, b'E', b'x', b'i'];
    let path = write_fixture(dir.path(), "a.jpg", &original).unwrap();

    let mut doc = JpegDocument::open(&path).unwrap();
    doc.set_comment("c").unwrap();

    let out = dir.path().join("b.jpg");
    assert!(matches!(doc.save(&out), Err(Error::ShortCopy { .. })));
    assert!(!out.exists());

    assert!(doc.save(&path).is_err());
    assert!(!dir.path().join("a.jpg.tmp").exists());
    assert_eq!(fs::read(&path).unwrap(), original);
    assert!(doc.is_open());
}

#[test]
fn test_exif_metadata_access() {
    let dir = tempfile::tempdir().unwrap();
    let tiff = TiffBuilder::new(ByteOrder::LittleEndian)
        .orientation(3)
        .make("Acme")
        .gps_version()
        .build();
    let path = fixture(
        dir.path(),
        "a.jpg",
        JpegBuilder::new().jfif().exif(&tiff).baseline_image(),
    );

    let doc = JpegDocument::open(&path).unwrap();
    let exif = doc.exif().unwrap();
    // SOI(2) + APP0(4 + 14) + APP1 header(4) + "Exif\0\0"(6)
    assert_eq!(exif.base_offset(), 30);
    assert_eq!(exif.orientation(), Some(3));
    assert_eq!(exif.user_comment(), "");
    let make = exif.find_tag(jpeg_comment_io::tags::MAKE).unwrap();
    assert_eq!(exif.ascii_value(make).as_deref(), Some("Acme"));
    assert!(exif
        .find_tag(jpeg_comment_io::tags::GPS_VERSION_ID)
        .is_some());
}
