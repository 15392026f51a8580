use super::*;
use std::net::SocketAddr;

fn node(tag: u8) -> Node {
    let mut id = [0u8; 20];
    id[0] = tag;
    let addr: SocketAddr = format!("10.0.0.{}:6881", tag).parse().unwrap();
    Node::new(NodeId::from_bytes(id), addr)
}

#[test]
fn node_id_distance_is_xor() {
    let a = NodeId::from_bytes([0xF0; 20]);
    let b = NodeId::from_bytes([0x0F; 20]);
    assert_eq!(a.distance(&b), [0xFF; 20]);
    assert_eq!(a.distance(&a), [0x00; 20]);
}

#[test]
fn bucket_appends_until_full() {
    let mut bucket = Bucket::new();

    for tag in 0..K as u8 {
        assert!(matches!(bucket.insert(node(tag)), Insertion::Added));
    }
    assert_eq!(bucket.len(), K);

    // Full bucket defers to a ping of the least-recently-seen node.
    match bucket.insert(node(99)) {
        Insertion::PingOldest(oldest) => assert_eq!(oldest.id, node(0).id),
        other => panic!("expected ping, got {:?}", other),
    }

    // A second newcomer while the ping is outstanding is dropped.
    assert!(matches!(bucket.insert(node(100)), Insertion::Dropped));
}

#[test]
fn known_node_moves_to_tail() {
    let mut bucket = Bucket::new();
    bucket.insert(node(1));
    bucket.insert(node(2));
    bucket.insert(node(3));

    assert!(matches!(bucket.insert(node(1)), Insertion::Refreshed));

    let order: Vec<_> = bucket.iter().map(|n| n.id).collect();
    assert_eq!(order, vec![node(2).id, node(3).id, node(1).id]);
}

#[test]
fn failed_ping_evicts_and_seats_the_candidate() {
    let mut bucket = Bucket::new();
    for tag in 0..K as u8 {
        bucket.insert(node(tag));
    }

    let Insertion::PingOldest(oldest) = bucket.insert(node(50)) else {
        panic!("expected ping");
    };

    bucket.resolve_ping(oldest.id, false);
    assert!(!bucket.contains(&oldest.id));
    assert!(bucket.contains(&node(50).id));
    assert_eq!(bucket.len(), K);
}

#[test]
fn answered_ping_keeps_the_old_node() {
    let mut bucket = Bucket::new();
    for tag in 0..K as u8 {
        bucket.insert(node(tag));
    }

    let Insertion::PingOldest(oldest) = bucket.insert(node(50)) else {
        panic!("expected ping");
    };

    bucket.resolve_ping(oldest.id, true);
    assert!(bucket.contains(&oldest.id));
    assert!(!bucket.contains(&node(50).id));

    // The answered node moved to the tail.
    assert_eq!(bucket.iter().last().unwrap().id, oldest.id);
}

#[test]
fn reinsert_of_pinged_key_settles_the_ping() {
    let mut bucket = Bucket::new();
    for tag in 0..K as u8 {
        bucket.insert(node(tag));
    }

    // Bucket full; node(0) is under ping for node(50)'s sake.
    let Insertion::PingOldest(oldest) = bucket.insert(node(50)) else {
        panic!("expected ping");
    };
    assert_eq!(oldest.id, node(0).id);

    // The pinged key shows up again on its own: refresh in place and
    // ignore the ping, whatever it would have said.
    assert!(matches!(bucket.insert(node(0)), Insertion::Refreshed));
    assert_eq!(bucket.iter().last().unwrap().id, node(0).id);

    // A late ping verdict for it changes nothing.
    bucket.resolve_ping(node(0).id, false);
    assert!(bucket.contains(&node(0).id));
    assert!(!bucket.contains(&node(50).id));
    assert_eq!(bucket.len(), K);

    // The slot freed by the settled ping is usable again.
    assert!(matches!(bucket.insert(node(60)), Insertion::PingOldest(_)));
}
