use super::*;

fn single_file_torrent() -> Vec<u8> {
    // One 32 KiB file split into two 16 KiB pieces.
    let mut data = Vec::new();
    data.extend_from_slice(b"d8:announce31:http://tracker.example/announce");
    data.extend_from_slice(b"13:announce-listll31:http://tracker.example/announceel29:udp://backup.example:6969/annee");
    data.extend_from_slice(b"4:infod6:lengthi32768e4:name4:demo12:piece lengthi16384e6:pieces40:");
    data.extend_from_slice(&[0xAA; 40]);
    data.extend_from_slice(b"ee");
    data
}

#[test]
fn parse_single_file() {
    let meta = Metainfo::from_bytes(&single_file_torrent()).unwrap();

    assert_eq!(meta.name, "demo");
    assert_eq!(meta.piece_length, 16384);
    assert_eq!(meta.piece_count, 2);
    assert_eq!(meta.total_length, 32768);
    assert!(!meta.private);
}

#[test]
fn trackers_deduplicated_in_order() {
    let meta = Metainfo::from_bytes(&single_file_torrent()).unwrap();

    assert_eq!(
        meta.trackers,
        vec![
            "http://tracker.example/announce".to_string(),
            "udp://backup.example:6969/ann".to_string(),
        ]
    );
}

#[test]
fn info_hash_is_stable() {
    let a = Metainfo::from_bytes(&single_file_torrent()).unwrap();
    let b = Metainfo::from_bytes(&single_file_torrent()).unwrap();
    assert_eq!(a.info_hash, b.info_hash);
    assert_eq!(a.info_hash, InfoHash::from_info_dict(a.raw_info()));
}

#[test]
fn parse_multi_file_total_length() {
    let mut data = Vec::new();
    data.extend_from_slice(b"d4:infod5:filesl");
    data.extend_from_slice(b"d6:lengthi100e4:pathl1:aeed6:lengthi200e4:pathl1:beee");
    data.extend_from_slice(b"4:name3:dir12:piece lengthi16384e6:pieces20:");
    data.extend_from_slice(&[0x11; 20]);
    data.extend_from_slice(b"ee");

    let meta = Metainfo::from_bytes(&data).unwrap();
    assert_eq!(meta.total_length, 300);
    assert_eq!(meta.piece_count, 1);
}

#[test]
fn missing_info_is_rejected() {
    assert!(matches!(
        Metainfo::from_bytes(b"de"),
        Err(MetainfoError::MissingField("info"))
    ));
}

#[test]
fn ragged_pieces_rejected() {
    let mut data = Vec::new();
    data.extend_from_slice(b"d4:infod6:lengthi1e4:name1:x12:piece lengthi16384e6:pieces21:");
    data.extend_from_slice(&[0x22; 21]);
    data.extend_from_slice(b"ee");

    assert!(matches!(
        Metainfo::from_bytes(&data),
        Err(MetainfoError::InvalidField("pieces"))
    ));
}

#[test]
fn info_hash_hex_round_trip() {
    let hash = InfoHash::from_bytes([0xC1; 20]);
    let parsed = InfoHash::from_hex(&hash.to_hex()).unwrap();
    assert_eq!(hash, parsed);

    assert!(InfoHash::from_hex("deadbeef").is_err());
    assert!(InfoHash::from_hex(&"zz".repeat(20)).is_err());
}
