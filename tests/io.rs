use std::fs;
use std::path::{Path, PathBuf};

use mp4tag::{Collection, ErrorKind, Mp4Tag, TargetType};
use tempfile::{tempdir, TempDir};

const MDAT_LEN: usize = 1000;

fn boxed(fourcc: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + content.len());
    buf.extend(u32::to_be_bytes(8 + content.len() as u32));
    buf.extend(fourcc);
    buf.extend(content);
    buf
}

fn item(fourcc: &[u8; 4], datatype: u32, payload: &[u8]) -> Vec<u8> {
    let mut data_content = Vec::new();
    data_content.extend(u32::to_be_bytes(datatype));
    data_content.extend([0u8; 4]); // locale
    data_content.extend(payload);
    boxed(fourcc, &boxed(b"data", &data_content))
}

fn free_box(total: usize) -> Vec<u8> {
    boxed(b"free", &vec![0u8; total - 8])
}

fn mdat_payload() -> Vec<u8> {
    (0..MDAT_LEN).map(|i| i as u8).collect()
}

/// Builds a minimal m4a file: ftyp, moov { mvhd, udta { meta { hdlr, ilst,
/// free } } }, mdat. Without items the whole udta chain is omitted.
fn build_file(items: &[Vec<u8>], trailing_free: usize) -> Vec<u8> {
    let ftyp = boxed(b"ftyp", b"M4A \x00\x00\x02\x00M4A mp42isom");
    let mvhd = boxed(b"mvhd", &[0u8; 100]);

    let moov_content = if items.is_empty() {
        mvhd
    } else {
        let ilst_content: Vec<u8> = items.concat();
        let ilst = boxed(b"ilst", &ilst_content);

        #[rustfmt::skip]
        let hdlr = boxed(b"hdlr", &[
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            b'm', b'd', b'i', b'r',
            b'a', b'p', b'p', b'l',
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00,
        ]);

        let mut meta_content = vec![0u8; 4]; // version + flags
        meta_content.extend(&hdlr);
        meta_content.extend(&ilst);
        if trailing_free > 0 {
            meta_content.extend(free_box(trailing_free));
        }

        let udta = boxed(b"udta", &boxed(b"meta", &meta_content));
        let mut content = mvhd;
        content.extend(udta);
        content
    };

    let mut file = ftyp;
    file.extend(boxed(b"moov", &moov_content));
    file.extend(boxed(b"mdat", &mdat_payload()));
    file
}

fn write_sample(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn text_sample() -> Vec<u8> {
    build_file(
        &[
            item(b"\xa9nam", 1, b"Test Title"),
            item(b"\xa9ART", 1, b"Test Artist"),
        ],
        512,
    )
}

fn mdat_bytes(bytes: &[u8]) -> &[u8] {
    let pos = bytes
        .windows(4)
        .position(|w| w == b"mdat")
        .expect("sample file has no mdat");
    &bytes[pos + 4..]
}

fn mdat_offset(path: &Path) -> usize {
    let bytes = fs::read(path).unwrap();
    bytes.windows(4).position(|w| w == b"mdat").unwrap()
}

#[test]
fn read_utf8_text() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "text.m4a", &text_sample());

    let mut mp4 = Mp4Tag::new();
    mp4.open(&path).unwrap();
    assert!(mp4.is_open());

    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "Test Title");
    assert_eq!(mp4.read_tag_string("ARTIST").unwrap(), "Test Artist");
    assert_eq!(mp4.read_tag_string("Title").unwrap(), "Test Title");
    assert_eq!(mp4.read_tag_string("title").unwrap(), "Test Title");

    let err = mp4.read_tag_string("NONEXISTENT").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TagNotFound));

    let mut buf = [0u8; 4];
    let err = mp4.read_tag_into("TITLE", &mut buf).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TagTooLarge));

    let mut buf = [0u8; 64];
    let len = mp4.read_tag_into("TITLE", &mut buf).unwrap();
    assert_eq!(&buf[..len], b"Test Title");
    assert_eq!(buf[len], 0);
}

#[test]
fn read_integer_atoms() {
    let dir = tempdir().unwrap();
    let bytes = build_file(
        &[
            item(b"trkn", 0, &[0x00, 0x00, 0x00, 0x03, 0x00, 0x0C, 0x00, 0x00]),
            item(b"tmpo", 21, &[0x00, 0x80]),
            item(b"cpil", 21, &[0x01]),
        ],
        0,
    );
    let path = write_sample(&dir, "int.m4a", &bytes);

    let mut mp4 = Mp4Tag::new();
    mp4.open(&path).unwrap();

    assert_eq!(mp4.read_tag_string("TRACK_NUMBER").unwrap(), "3/12");
    assert_eq!(mp4.read_tag_string("BPM").unwrap(), "128");
    assert_eq!(mp4.read_tag_string("COMPILATION").unwrap(), "1");

    assert_eq!(mp4.track_number(), Some("3/12"));
    assert_eq!(mp4.bpm(), Some(128));
    assert!(mp4.compilation());
}

#[test]
fn in_place_update_preserves_the_footprint() {
    let dir = tempdir().unwrap();
    let original = text_sample();
    let path = write_sample(&dir, "inplace.m4a", &original);
    let mdat_pos_before = mdat_offset(&path);

    let mut mp4 = Mp4Tag::new();
    mp4.open_rw(&path).unwrap();
    mp4.set_tag_string("TITLE", Some("New Title")).unwrap();

    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "New Title");
    assert_eq!(mp4.read_tag_string("ARTIST").unwrap(), "Test Artist");
    mp4.close();

    let rewritten = fs::read(&path).unwrap();
    assert_eq!(rewritten.len(), original.len());
    assert_eq!(mdat_offset(&path), mdat_pos_before);
    assert_eq!(mdat_bytes(&rewritten), mdat_bytes(&original));

    // the trailing free atom absorbed the length difference
    assert!(rewritten.windows(4).any(|w| w == b"free"));

    // a fresh context sees the same values
    let mut mp4 = Mp4Tag::new();
    mp4.open(&path).unwrap();
    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "New Title");
}

#[test]
fn adding_a_tag_without_free_space_rewrites() {
    let dir = tempdir().unwrap();
    let original = build_file(&[], 0);
    let path = write_sample(&dir, "rewrite.m4a", &original);

    let mut mp4 = Mp4Tag::new();
    mp4.open_rw(&path).unwrap();

    let err = mp4.read_tags().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NoTags));

    mp4.set_tag_string("TITLE", Some("Brand New Title")).unwrap();
    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "Brand New Title");
    mp4.close();

    let rewritten = fs::read(&path).unwrap();
    assert_eq!(mdat_bytes(&rewritten), mdat_bytes(&original));
    for fourcc in [b"udta", b"meta", b"hdlr", b"ilst"] {
        assert!(rewritten.windows(4).any(|w| w == fourcc));
    }

    // no scratch files are left behind
    let stray: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path() != path)
        .collect();
    assert!(stray.is_empty());

    let mut mp4 = Mp4Tag::new();
    mp4.open(&path).unwrap();
    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "Brand New Title");
}

#[test]
fn growing_past_the_padding_rewrites() {
    let dir = tempdir().unwrap();
    let original = text_sample();
    let path = write_sample(&dir, "grow.m4a", &original);

    let long_value = "x".repeat(2048);
    let mut mp4 = Mp4Tag::new();
    mp4.open_rw(&path).unwrap();
    mp4.set_tag_string("LYRICS", Some(&long_value)).unwrap();

    assert_eq!(mp4.read_tag_string("LYRICS").unwrap(), long_value);
    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "Test Title");
    mp4.close();

    let rewritten = fs::read(&path).unwrap();
    assert!(rewritten.len() > original.len());
    assert_eq!(mdat_bytes(&rewritten), mdat_bytes(&original));
}

#[test]
fn remove_tag() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "remove.m4a", &text_sample());

    let mut mp4 = Mp4Tag::new();
    mp4.open_rw(&path).unwrap();
    mp4.remove_tag("ARTIST").unwrap();

    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "Test Title");
    let err = mp4.read_tag_string("ARTIST").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TagNotFound));
}

#[test]
fn read_only_protection() {
    let dir = tempdir().unwrap();
    let original = text_sample();
    let path = write_sample(&dir, "readonly.m4a", &original);

    let mut mp4 = Mp4Tag::new();
    mp4.open(&path).unwrap();

    let err = mp4.set_tag_string("TITLE", Some("New Title")).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReadOnly));
    let err = mp4.remove_tag("ARTIST").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReadOnly));
    let err = mp4.write_tags(&Collection::new()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReadOnly));

    assert_eq!(fs::read(&path).unwrap(), original);
}

#[test]
fn write_a_built_collection() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "built.m4a", &text_sample());

    let mut collection = Collection::new();
    let tag = collection.add_tag(TargetType::Album);
    tag.add_simple("TITLE", "Replaced");
    tag.add_simple("ALBUM", "Some Album");
    tag.add_simple("TRACK_NUMBER", "3/12");
    tag.add_track_uid(42);

    let mut mp4 = Mp4Tag::new();
    mp4.open_rw(&path).unwrap();
    mp4.write_tags(&collection).unwrap();

    // full replacement, the old artist is gone
    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "Replaced");
    assert_eq!(mp4.read_tag_string("ALBUM").unwrap(), "Some Album");
    assert_eq!(mp4.read_tag_string("TRACK_NUMBER").unwrap(), "3/12");
    assert!(mp4.read_tag_string("ARTIST").is_err());

    let tags = mp4.read_tags().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags.tags[0].target_type, TargetType::Album);
}

#[test]
fn forced_rewrite() {
    let dir = tempdir().unwrap();
    let original = text_sample();
    let path = write_sample(&dir, "forced.m4a", &original);

    let mut collection = Collection::new();
    collection.add_tag(TargetType::Album).add_simple("TITLE", "Rewritten");

    let mut mp4 = Mp4Tag::new();
    mp4.open_rw(&path).unwrap();
    mp4.rewrite_tags(&collection).unwrap();

    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "Rewritten");
    let rewritten = fs::read(&path).unwrap();
    assert_eq!(mdat_bytes(&rewritten), mdat_bytes(&original));
}

#[test]
fn cover_art() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "cover.m4a", &text_sample());

    let png: Vec<u8> = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        .iter()
        .copied()
        .chain((0..64).map(|i| i as u8))
        .collect();

    let mut mp4 = Mp4Tag::new();
    mp4.open_rw(&path).unwrap();
    mp4.set_cover_art(png.clone()).unwrap();

    assert_eq!(mp4.cover_art(), Some(png.as_slice()));
    assert_eq!(mp4.read_tag_string("TITLE").unwrap(), "Test Title");

    // the indicator on disk is png
    let bytes = fs::read(&path).unwrap();
    let covr = bytes.windows(4).position(|w| w == b"covr").unwrap();
    let indicator = u32::from_be_bytes([
        bytes[covr + 12],
        bytes[covr + 13],
        bytes[covr + 14],
        bytes[covr + 15],
    ]);
    assert_eq!(indicator, 14);
}

#[test]
fn cached_collection_is_refreshed_after_writes() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "cache.m4a", &text_sample());

    let mut mp4 = Mp4Tag::new();
    mp4.open_rw(&path).unwrap();

    let before = mp4.read_tags().unwrap().clone();
    assert_eq!(before.find("TITLE").unwrap().value.as_deref(), Some("Test Title"));

    mp4.set_tag_string("TITLE", Some("Changed")).unwrap();

    let after = mp4.read_tags().unwrap();
    assert_eq!(after.find("TITLE").unwrap().value.as_deref(), Some("Changed"));
    assert_ne!(&before, after);
}

#[test]
fn open_rejects_non_mp4_files() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "not.mp4", b"RIFF\x00\x00\x00\x00WAVEfmt ");

    let mut mp4 = Mp4Tag::new();
    let err = mp4.open(&path).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotMp4));
    assert!(!mp4.is_open());
    assert!(mp4.path().is_none());
}

#[test]
fn open_twice_fails() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "twice.m4a", &text_sample());

    let mut mp4 = Mp4Tag::new();
    mp4.open(&path).unwrap();
    let err = mp4.open(&path).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AlreadyOpen));

    // close is idempotent and allows reopening
    mp4.close();
    mp4.close();
    assert!(!mp4.is_open());
    mp4.open(&path).unwrap();
}

#[test]
fn mutating_a_closed_context_fails() {
    let mut mp4 = Mp4Tag::new();
    assert!(matches!(mp4.read_tags().unwrap_err().kind, ErrorKind::NotOpen));
    assert!(matches!(
        mp4.set_tag_string("TITLE", Some("x")).unwrap_err().kind,
        ErrorKind::NotOpen
    ));
}

#[test]
fn unmapped_four_character_names_round_trip() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "raw.m4a", &text_sample());

    let mut mp4 = Mp4Tag::new();
    mp4.open_rw(&path).unwrap();
    mp4.set_tag_string("tvsh", Some("Some Show")).unwrap();

    assert_eq!(mp4.read_tag_string("tvsh").unwrap(), "Some Show");
}
