use super::http::{decode_announce, decode_scrape};
use super::query::{percent_decode, percent_encode};
use super::response::{parse_compact_peers, parse_compact_peers6};
use super::*;
use crate::metainfo::InfoHash;
use crate::peer::PeerId;

#[test]
fn scrape_url_rewrites_last_segment() {
    let cases = [
        ("http://example.com/announce", Some("http://example.com/scrape")),
        ("http://example.com/x/announce", Some("http://example.com/x/scrape")),
        ("http://example.com/announce.php", Some("http://example.com/scrape.php")),
        ("http://example.com/a", None),
        (
            "http://example.com/announce?x2%0644",
            Some("http://example.com/scrape?x2%0644"),
        ),
        (
            "http://example.com/announce?x=2/4",
            Some("http://example.com/scrape?x=2/4"),
        ),
        ("http://example.com/x%064announce", None),
    ];

    for (input, expected) in cases {
        assert_eq!(scrape_url(input).as_deref(), expected, "input: {}", input);
    }
}

#[test]
fn tracker_event_encodings() {
    assert_eq!(TrackerEvent::None.as_str(), "");
    assert_eq!(TrackerEvent::Started.as_str(), "started");
    assert_eq!(TrackerEvent::Stopped.as_str(), "stopped");
    assert_eq!(TrackerEvent::Completed.as_str(), "completed");

    assert_eq!(TrackerEvent::None.as_udp_id(), 0);
    assert_eq!(TrackerEvent::Completed.as_udp_id(), 1);
    assert_eq!(TrackerEvent::Started.as_udp_id(), 2);
    assert_eq!(TrackerEvent::Stopped.as_udp_id(), 3);
}

#[test]
fn percent_encoding_round_trip() {
    let raw: Vec<u8> = (0..=255).collect();
    let encoded = percent_encode(&raw);
    assert_eq!(percent_decode(&encoded).unwrap(), raw);

    // Unreserved characters pass through unescaped.
    assert_eq!(percent_encode(b"aZ09-_.~"), "aZ09-_.~");
    assert_eq!(percent_encode(b"\x00\xff "), "%00%FF%20");
}

#[test]
fn announce_query_round_trip() {
    let events = [
        TrackerEvent::None,
        TrackerEvent::Started,
        TrackerEvent::Stopped,
        TrackerEvent::Completed,
    ];

    for event in events {
        let query = AnnounceQuery {
            info_hash: InfoHash::from_bytes([0xAB; 20]),
            peer_id: PeerId::generate(),
            port: 6881,
            uploaded: 1024,
            downloaded: 4096,
            left: 12_345_678,
            event,
        };

        let rendered = query.render();
        assert_eq!(AnnounceQuery::parse(&rendered).unwrap(), query);
    }
}

#[test]
fn announce_query_renders_compact_and_event() {
    let query = AnnounceQuery {
        info_hash: InfoHash::from_bytes([0u8; 20]),
        peer_id: PeerId::generate(),
        port: 6881,
        uploaded: 0,
        downloaded: 0,
        left: 0,
        event: TrackerEvent::Started,
    };

    let rendered = query.render();
    assert!(rendered.contains("compact=1"));
    assert!(rendered.ends_with("&event=started"));

    let regular = AnnounceQuery {
        event: TrackerEvent::None,
        ..query
    };
    assert!(!regular.render().contains("event="));
}

#[test]
fn compact_peers_v4() {
    let data = [
        192, 168, 1, 1, 0x1A, 0xE1, // 192.168.1.1:6881
        10, 0, 0, 1, 0x1A, 0xE2, // 10.0.0.1:6882
        99, // ragged trailing byte is ignored
    ];

    let peers = parse_compact_peers(&data);
    assert_eq!(peers.len(), 2);
    assert_eq!(peers[0].addr.to_string(), "192.168.1.1:6881");
    assert_eq!(peers[1].addr.port(), 6882);
    assert!(peers[0].peer_id.is_none());
}

#[test]
fn compact_peers_v6() {
    let mut data = vec![0u8; 18];
    data[15] = 1; // ::1
    data[16..18].copy_from_slice(&6881u16.to_be_bytes());

    let peers = parse_compact_peers6(&data);
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].addr.to_string(), "[::1]:6881");
}

#[test]
fn compact_round_trip() {
    let peer = PeerAddress::from_compact_v4(&[1, 2, 3, 4, 0x1A, 0xE1]).unwrap();
    assert_eq!(peer.to_compact(), vec![1, 2, 3, 4, 0x1A, 0xE1]);
}

#[test]
fn announce_response_with_dict_peers() {
    let body = b"d8:completei10e10:incompletei5e8:intervali1800e5:peersld2:ip9:127.0.0.17:peer id20:-RM0001-aaaabbbbcccc4:porti6881eeee";

    let info = decode_announce(body).unwrap();
    assert_eq!(info.interval, 1800);
    assert_eq!(info.complete, Some(10));
    assert_eq!(info.incomplete, Some(5));
    assert_eq!(info.peers.len(), 1);
    assert_eq!(info.peers[0].addr.to_string(), "127.0.0.1:6881");
    assert!(info.peers[0].peer_id.is_some());
}

#[test]
fn announce_response_with_compact_peers() {
    let mut body = b"d8:intervali900e5:peers12:".to_vec();
    body.extend_from_slice(&[192, 168, 0, 1, 0x1A, 0xE1, 192, 168, 0, 2, 0x1A, 0xE1]);
    body.extend_from_slice(b"e");

    let info = decode_announce(&body).unwrap();
    assert_eq!(info.interval, 900);
    assert_eq!(info.peers.len(), 2);
}

#[test]
fn announce_failure_reason_surfaces() {
    let body = b"d14:failure reason12:torrent gonee";
    match decode_announce(body) {
        Err(TrackerError::Failure(reason)) => assert_eq!(reason, "torrent gone"),
        other => panic!("expected failure, got {:?}", other.map(|i| i.interval)),
    }
}

#[test]
fn scrape_info_bencode_round_trip() {
    let cases = [
        ScrapeInfo {
            complete: 12,
            downloaded: 340,
            incomplete: 7,
            name: None,
        },
        ScrapeInfo {
            complete: 0,
            downloaded: 0,
            incomplete: 0,
            name: Some("demo".to_string()),
        },
    ];

    for info in cases {
        let encoded = crate::bencode::encode(&info.to_value());
        let decoded = crate::bencode::decode(&encoded).unwrap();
        assert_eq!(ScrapeInfo::from_value(&decoded).unwrap(), info);
    }
}

#[test]
fn scrape_response_decodes_files() {
    let mut body = b"d5:filesd20:".to_vec();
    body.extend_from_slice(&[0x11; 20]);
    body.extend_from_slice(b"d8:completei4e10:downloadedi99e10:incompletei2eeee");

    let entries = decode_scrape(&body).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, InfoHash::from_bytes([0x11; 20]));
    assert_eq!(entries[0].1.complete, 4);
    assert_eq!(entries[0].1.downloaded, 99);
    assert_eq!(entries[0].1.incomplete, 2);
}

#[test]
fn http_tracker_rejects_other_schemes() {
    assert!(matches!(
        HttpTracker::new("ftp://tracker.example"),
        Err(TrackerError::InvalidUrl(_))
    ));
    assert!(matches!(
        Tracker::new("ws://tracker.example"),
        Err(TrackerError::UnsupportedProtocol(_))
    ));
}

#[tokio::test]
async fn tracker_session_skips_unusable_urls() {
    let session = TrackerSession::new(&[
        "http://tracker.example/announce".to_string(),
        "not a url".to_string(),
        "udp://tracker.example:6969".to_string(),
    ]);

    assert_eq!(session.tracker_count().await, 2);
}

mod udp {
    use super::*;
    use tokio::net::UdpSocket;

    /// A scripted one-client tracker on localhost.
    async fn mock_tracker() -> (UdpSocket, std::net::SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    fn be_u32(data: &[u8]) -> u32 {
        u32::from_be_bytes(data[..4].try_into().unwrap())
    }

    fn be_u64(data: &[u8]) -> u64 {
        u64::from_be_bytes(data[..8].try_into().unwrap())
    }

    fn query(addr_port: u16) -> AnnounceQuery {
        AnnounceQuery {
            info_hash: InfoHash::from_bytes([0x42; 20]),
            peer_id: PeerId::generate(),
            port: addr_port,
            uploaded: 10,
            downloaded: 20,
            left: 30,
            event: TrackerEvent::Started,
        }
    }

    #[tokio::test]
    async fn connect_then_announce_carries_connection_id() {
        let (server, addr) = mock_tracker().await;
        let mut tracker = UdpTracker::new(&format!("udp://{}", addr)).unwrap();

        let server_task = tokio::spawn(async move {
            let mut buf = [0u8; 256];

            // Connect: magic id, action 0; answer with connection id 0xC1D.
            let (n, client) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(n, 16);
            assert_eq!(be_u64(&buf[0..8]), 0x41727101980);
            assert_eq!(be_u32(&buf[8..12]), 0);
            let tid = &buf[12..16].to_owned();

            let mut reply = Vec::new();
            reply.extend_from_slice(&0u32.to_be_bytes());
            reply.extend_from_slice(tid);
            reply.extend_from_slice(&0xC1Du64.to_be_bytes());
            server.send_to(&reply, client).await.unwrap();

            // Announce must reuse the connection id from connect.
            let (n, client) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(n, 98);
            assert_eq!(be_u64(&buf[0..8]), 0xC1D);
            assert_eq!(be_u32(&buf[8..12]), 1);
            assert_eq!(&buf[16..36], &[0x42; 20]);
            let tid = &buf[12..16].to_owned();

            let mut reply = Vec::new();
            reply.extend_from_slice(&1u32.to_be_bytes());
            reply.extend_from_slice(tid);
            reply.extend_from_slice(&1800u32.to_be_bytes()); // interval
            reply.extend_from_slice(&3u32.to_be_bytes()); // leechers
            reply.extend_from_slice(&7u32.to_be_bytes()); // seeders
            reply.extend_from_slice(&[10, 0, 0, 9, 0x1A, 0xE1]); // one peer
            server.send_to(&reply, client).await.unwrap();
        });

        let info = tracker.announce(&query(6881)).await.unwrap();
        assert_eq!(info.interval, 1800);
        assert_eq!(info.complete, Some(7));
        assert_eq!(info.incomplete, Some(3));
        assert_eq!(info.peers.len(), 1);
        assert_eq!(info.peers[0].addr.to_string(), "10.0.0.9:6881");

        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn mismatched_transaction_id_is_discarded() {
        let (server, addr) = mock_tracker().await;
        let mut tracker = UdpTracker::new(&format!("udp://{}", addr)).unwrap();

        let server_task = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let (_, client) = server.recv_from(&mut buf).await.unwrap();
            let tid = be_u32(&buf[12..16]);

            // A stray reply with the wrong transaction id first; the
            // client must keep waiting for the matching one.
            let mut stray = Vec::new();
            stray.extend_from_slice(&0u32.to_be_bytes());
            stray.extend_from_slice(&tid.wrapping_add(1).to_be_bytes());
            stray.extend_from_slice(&0xBADu64.to_be_bytes());
            server.send_to(&stray, client).await.unwrap();

            let mut good = Vec::new();
            good.extend_from_slice(&0u32.to_be_bytes());
            good.extend_from_slice(&tid.to_be_bytes());
            good.extend_from_slice(&0xFEEDu64.to_be_bytes());
            server.send_to(&good, client).await.unwrap();

            // The announce that follows must carry the id from the
            // matching reply, not the stray.
            let (_, client) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(be_u64(&buf[0..8]), 0xFEED);
            let tid = &buf[12..16].to_owned();

            let mut reply = Vec::new();
            reply.extend_from_slice(&1u32.to_be_bytes());
            reply.extend_from_slice(tid);
            reply.extend_from_slice(&[0u8; 12]);
            server.send_to(&reply, client).await.unwrap();
        });

        let info = tracker.announce(&query(6881)).await.unwrap();
        assert_eq!(info.interval, 0);
        assert!(info.peers.is_empty());

        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn error_action_surfaces_as_failure() {
        let (server, addr) = mock_tracker().await;
        let mut tracker = UdpTracker::new(&format!("udp://{}", addr)).unwrap();

        let server_task = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let (_, client) = server.recv_from(&mut buf).await.unwrap();
            let tid = &buf[12..16].to_owned();

            let mut reply = Vec::new();
            reply.extend_from_slice(&3u32.to_be_bytes());
            reply.extend_from_slice(tid);
            reply.extend_from_slice(b"swarm unknown");
            server.send_to(&reply, client).await.unwrap();
        });

        match tracker.announce(&query(6881)).await {
            Err(TrackerError::Failure(message)) => assert_eq!(message, "swarm unknown"),
            other => panic!("expected failure, got {:?}", other.is_ok()),
        }

        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn scrape_parses_stat_triples() {
        let (server, addr) = mock_tracker().await;
        let mut tracker = UdpTracker::new(&format!("udp://{}", addr)).unwrap();

        let server_task = tokio::spawn(async move {
            let mut buf = [0u8; 256];

            // Connect.
            let (_, client) = server.recv_from(&mut buf).await.unwrap();
            let tid = &buf[12..16].to_owned();
            let mut reply = Vec::new();
            reply.extend_from_slice(&0u32.to_be_bytes());
            reply.extend_from_slice(tid);
            reply.extend_from_slice(&1u64.to_be_bytes());
            server.send_to(&reply, client).await.unwrap();

            // Scrape for two info hashes.
            let (n, client) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(n, 16 + 40);
            assert_eq!(be_u32(&buf[8..12]), 2);
            let tid = &buf[12..16].to_owned();

            let mut reply = Vec::new();
            reply.extend_from_slice(&2u32.to_be_bytes());
            reply.extend_from_slice(tid);
            for triple in [[5u32, 100, 2], [0, 1, 0]] {
                for value in triple {
                    reply.extend_from_slice(&value.to_be_bytes());
                }
            }
            server.send_to(&reply, client).await.unwrap();
        });

        let hashes = [
            InfoHash::from_bytes([0xA1; 20]),
            InfoHash::from_bytes([0xB2; 20]),
        ];
        let entries = tracker.scrape(&hashes).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, hashes[0]);
        assert_eq!(
            entries[0].1,
            ScrapeInfo {
                complete: 5,
                downloaded: 100,
                incomplete: 2,
                name: None,
            }
        );
        assert_eq!(entries[1].1.downloaded, 1);

        server_task.await.unwrap();
    }
}
