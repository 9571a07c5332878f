use proptest::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};
use vrshot::chunk::{extract_text, Chunk, ChunkType};
use vrshot::container::{self, ReadOptions, PNG_SIGNATURE};
use vrshot::crc::{crc32, ITXT_SEED};
use vrshot::metadata::{decode_file, MetadataError};
use vrshot::scanner::find_chunk;
use vrshot::search::{search_directory, MetadataCache, SearchOptions, SearchQuery};

fn screenshot(width: u32, height: u32) -> Vec<u8> {
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);

    let mut png = PNG_SIGNATURE.to_vec();
    png.extend(Chunk::decode_payload(ChunkType::IHDR, &ihdr).to_bytes().unwrap());
    png.extend(Chunk::decode_payload(ChunkType(*b"IDAT"), &[0x78, 0x9C, 0x63, 0x00, 0x00]).to_bytes().unwrap());
    png.extend(Chunk::decode_payload(ChunkType::IEND, &[]).to_bytes().unwrap());
    png
}

fn write_screenshot(path: &Path, description: Option<&str>) {
    fs::write(path, screenshot(1920, 1080)).unwrap();
    if let Some(text) = description {
        assert!(container::write_description(path, text, &ReadOptions::default()).unwrap());
    }
}

#[test]
fn test_write_then_read_description() {
    let temp_file = NamedTempFile::new().unwrap();
    let opts = ReadOptions::default();
    fs::write(temp_file.path(), screenshot(1920, 1080)).unwrap();

    assert_eq!(container::read_description(temp_file.path(), &opts).unwrap(), None);
    assert!(!container::has_text_chunk(temp_file.path(), &opts).unwrap());

    let text = "lfs|2|author:usr_AAA,Alice|world:wrld_BBB,5,MyWorld|pos:1.0,2.0,3.0|players:usr_AAA,0.1,0.2,0.3,Alice";
    assert!(container::write_description(temp_file.path(), text, &opts).unwrap());
    assert!(container::has_text_chunk(temp_file.path(), &opts).unwrap());
    assert_eq!(container::read_description(temp_file.path(), &opts).unwrap().as_deref(), Some(text));
}

#[test]
fn test_second_write_is_noop() {
    let temp_file = NamedTempFile::new().unwrap();
    let opts = ReadOptions::default();
    fs::write(temp_file.path(), screenshot(1280, 720)).unwrap();

    assert!(container::write_description(temp_file.path(), "lfs|2|rq:1", &opts).unwrap());
    let after_first = fs::read(temp_file.path()).unwrap();

    assert!(!container::write_description(temp_file.path(), "lfs|2|rq:2", &opts).unwrap());
    let after_second = fs::read(temp_file.path()).unwrap();
    assert_eq!(after_first, after_second);
}

#[test]
fn test_write_replaces_file_in_place() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("VRChat_2024-05-01.png");
    write_screenshot(&path, Some("lfs|2|rq:3"));

    let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name().into_string().unwrap()).collect();
    assert_eq!(names, ["VRChat_2024-05-01.png"]);
    let png = fs::read(&path).unwrap();
    assert!(find_chunk(&png, ChunkType::ITXT).is_some());
    assert!(find_chunk(&png, ChunkType::IEND).is_some());
    assert_eq!(container::read_description(&path, &ReadOptions::default()).unwrap().as_deref(), Some("lfs|2|rq:3"));
}

#[test]
fn test_write_refuses_non_png() {
    let temp_file = NamedTempFile::new().unwrap();
    let opts = ReadOptions::default();
    fs::write(temp_file.path(), b"\xFF\xD8\xFF\xE0 definitely a jpeg").unwrap();

    assert!(!container::write_description(temp_file.path(), "lfs|2", &opts).unwrap());
    assert_eq!(fs::read(temp_file.path()).unwrap(), b"\xFF\xD8\xFF\xE0 definitely a jpeg");
    assert!(matches!(
        container::read_description(temp_file.path(), &opts),
        Err(container::ContainerError::NotAContainerFile)
    ));
}

#[test]
fn test_read_resolution() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), screenshot(1920, 1080)).unwrap();
    assert_eq!(container::read_resolution(temp_file.path(), &ReadOptions::default()).unwrap(), "1920x1080");
}

#[test]
fn test_chunk_beyond_window_is_invisible() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut png = screenshot(64, 64);
    // Push the description past a small window with a large ancillary chunk.
    let filler = Chunk::decode_payload(ChunkType(*b"teXt"), &vec![0u8; 4096]);
    let iend_at = png.len() - 12;
    let mut tail = filler.to_bytes().unwrap();
    tail.extend(Chunk::text("Description", "lfs|2|rq:1").unwrap().to_bytes().unwrap());
    let iend = png.split_off(iend_at);
    png.extend(tail);
    png.extend(iend);
    fs::write(temp_file.path(), &png).unwrap();

    let small = ReadOptions { window_size: 1024, ..ReadOptions::default() };
    assert_eq!(container::read_description(temp_file.path(), &small).unwrap(), None);
    let full = ReadOptions::default();
    assert_eq!(container::read_description(temp_file.path(), &full).unwrap().as_deref(), Some("lfs|2|rq:1"));
}

#[test]
fn test_decode_file_sets_source() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("VRChat_cvr.png");
    write_screenshot(&path, Some("lfs|cvr|1|author:AAA,Bob|world:CCC,i+xyz,RoomName|pos:0,0,0|players:DDD,0,0,0,Carol"));

    let meta = decode_file(&path, &ReadOptions::default()).unwrap().unwrap();
    assert_eq!(meta.application, "cvr");
    assert_eq!(meta.author.unwrap().display_name, "Bob (AAA)");
    assert_eq!(meta.source_file.as_deref(), Some(path.as_path()));
}

#[test]
fn test_decode_file_unknown_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("other.png");
    write_screenshot(&path, Some("Taken with SomeOtherTool"));
    assert!(matches!(decode_file(&path, &ReadOptions::default()), Err(MetadataError::UnknownFormat)));
}

#[test]
fn test_cache_get_or_decode() {
    let dir = tempdir().unwrap();
    let opts = ReadOptions::default();
    let described = dir.path().join("described.png");
    let plain = dir.path().join("plain.png");
    write_screenshot(&described, Some("lfs|2|author:usr_AAA,Alice|pos:1,2,3"));
    write_screenshot(&plain, None);

    let mut cache = MetadataCache::new();
    let first = cache.get_or_decode(&described, &opts).unwrap().cloned().unwrap();
    assert_eq!(first.author.as_ref().unwrap().display_name, "Alice");
    assert_eq!(cache.len(), 1);

    // Served from the cache once the file is gone.
    fs::remove_file(&described).unwrap();
    assert_eq!(cache.get_or_decode(&described, &opts).unwrap(), Some(&first));

    cache.invalidate(&described);
    assert!(cache.get_or_decode(&described, &opts).is_err());

    assert_eq!(cache.get_or_decode(&plain, &opts).unwrap(), None);
    assert!(!cache.contains(&plain));
    assert!(cache.is_empty());
}

#[test]
fn test_search_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("2024-05");
    fs::create_dir(&nested).unwrap();

    write_screenshot(&dir.path().join("a.png"), Some("lfs|2|author:usr_A,Alice|world:wrld_1,5,Pug Land"));
    write_screenshot(&nested.join("b.png"), Some("screenshotmanager|0|author:usr_B,Bea|wrld_2,9,Pug Palace"));
    write_screenshot(&nested.join("c.png"), Some(r#"{"application":"VRCX","version":1,"world":{"id":"wrld_3","name":"Lobby","instanceId":"1"}}"#));
    write_screenshot(&nested.join("plain.png"), None);
    write_screenshot(&nested.join("broken.png"), Some("lfs|2|author:usr_X"));
    fs::write(nested.join("notes.txt"), "lfs|2").unwrap();

    let mut cache = MetadataCache::new();
    let opts = SearchOptions::default();
    let report = search_directory(dir.path(), &SearchQuery::WorldName("pug".into()), &mut cache, &opts).unwrap();

    let worlds: Vec<_> = report.matches.iter().map(|m| m.world.as_ref().unwrap().name.as_str()).collect();
    // Sorted by path: "2024-05/b.png" precedes "a.png".
    assert_eq!(worlds, ["Pug Palace", "Pug Land"]);
    assert_eq!(report.scanned, 5);
    assert_eq!(report.no_metadata, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(cache.len(), 3);

    let again = search_directory(dir.path(), &SearchQuery::WorldId("wrld_3".into()), &mut cache, &opts).unwrap();
    assert_eq!(again.cache_hits, 3);
    assert_eq!(again.matches.len(), 1);
    assert_eq!(again.matches[0].application, "VRCX");
}

#[test]
fn test_search_fail_fast() {
    let dir = tempdir().unwrap();
    write_screenshot(&dir.path().join("broken.png"), Some("lfs|2|pos:1"));

    let opts = SearchOptions { fail_fast: true, ..SearchOptions::default() };
    let result = search_directory(dir.path(), &SearchQuery::Any("x".into()), &mut MetadataCache::new(), &opts);
    assert!(matches!(result, Err(MetadataError::MalformedLfs(_))));
}

proptest! {
    #[test]
    fn prop_text_chunk_roundtrip(keyword in "[ -~\u{a1}-\u{ff}]{1,40}", text in r"[^\x00]*") {
        let chunk = Chunk::text(&keyword, &text).unwrap();
        prop_assert_eq!(extract_text(&chunk, &keyword).unwrap(), text);
    }

    #[test]
    fn prop_seeded_crc_matches_straight_crc(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut whole = b"iTXt".to_vec();
        whole.extend_from_slice(&payload);
        prop_assert_eq!(crc32(&payload, ITXT_SEED), crc32(&whole, 0));
    }

    #[test]
    fn prop_scanner_never_panics(tail in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut buf = PNG_SIGNATURE.to_vec();
        buf.extend_from_slice(&tail);
        if let Some(loc) = find_chunk(&buf, ChunkType::ITXT) {
            prop_assert!(loc.end() <= buf.len());
        }
    }
}
