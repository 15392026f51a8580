use std::collections::VecDeque;

use super::node::{Node, NodeId};

/// Nodes per bucket (the Kademlia `k` parameter).
pub const K: usize = 8;

/// Outcome of offering a node to a bucket.
#[derive(Debug)]
pub enum Insertion {
    /// The node was already known and moved to the tail.
    Refreshed,
    /// The node was appended to a bucket with room.
    Added,
    /// The bucket is full: ping the returned least-recently-seen node
    /// and report the outcome through [`Bucket::resolve_ping`]. The
    /// newcomer is parked until then.
    PingOldest(Node),
    /// The bucket is full and a ping is already outstanding.
    Dropped,
}

struct PendingPing {
    candidate: Node,
    oldest_id: NodeId,
}

/// One k-bucket: up to [`K`] nodes ordered least-recently-seen first.
///
/// Eviction is lazy. A full bucket never drops a live node for a
/// newcomer: the oldest node gets pinged, and only a failed ping frees
/// its slot. Re-inserting a known id always refreshes it in place, and
/// if that id is the one being pinged the ping result is ignored.
pub struct Bucket {
    nodes: VecDeque<Node>,
    pending: Option<PendingPing>,
}

impl Bucket {
    pub fn new() -> Self {
        Self {
            nodes: VecDeque::with_capacity(K),
            pending: None,
        }
    }

    /// Offers a node to the bucket.
    pub fn insert(&mut self, node: Node) -> Insertion {
        if let Some(pos) = self.nodes.iter().position(|n| n.id == node.id) {
            let mut known = self.nodes.remove(pos).expect("position just found");
            known.addr = node.addr;
            known.touch();
            self.nodes.push_back(known);

            // A refresh of the node under ping settles the question the
            // ping was asking; the parked candidate is dropped with it.
            if self
                .pending
                .as_ref()
                .is_some_and(|p| p.oldest_id == node.id)
            {
                self.pending = None;
            }
            return Insertion::Refreshed;
        }

        if self.nodes.len() < K {
            self.nodes.push_back(node);
            return Insertion::Added;
        }

        if self.pending.is_some() {
            return Insertion::Dropped;
        }

        let oldest = self.nodes.front().expect("full bucket").clone();
        self.pending = Some(PendingPing {
            candidate: node,
            oldest_id: oldest.id,
        });
        Insertion::PingOldest(oldest)
    }

    /// Settles the ping issued by [`Insertion::PingOldest`].
    ///
    /// A responding node keeps its slot and moves to the tail; a silent
    /// one is evicted and the parked candidate takes its place.
    pub fn resolve_ping(&mut self, oldest_id: NodeId, responded: bool) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.oldest_id != oldest_id {
            self.pending = Some(pending);
            return;
        }

        let Some(pos) = self.nodes.iter().position(|n| n.id == oldest_id) else {
            return;
        };

        if responded {
            let mut node = self.nodes.remove(pos).expect("position just found");
            node.touch();
            self.nodes.push_back(node);
        } else {
            self.nodes.remove(pos);
            self.nodes.push_back(pending.candidate);
        }
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes least-recently-seen first.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

impl Default for Bucket {
    fn default() -> Self {
        Self::new()
    }
}
