//! Peer discovery collaborator contract and its k-bucket backing.
//!
//! DHT routing itself is an external collaborator; the core only needs
//! the [`PeerDiscovery`] contract to register running torrents and pull
//! peer addresses, plus the bucket structure the collaborator keeps its
//! node view in.

mod node;
mod routing;

use tokio::sync::mpsc;

use crate::metainfo::InfoHash;
use crate::tracker::PeerAddress;

pub use node::{Node, NodeId};
pub use routing::{Bucket, Insertion, K};

#[cfg(test)]
mod tests;

/// Discovery side-channel for peers outside tracker announces.
///
/// Implementations must not block; `lookup` results stream in as the
/// network answers.
pub trait PeerDiscovery: Send + Sync {
    /// Registers an info hash for announcement to the network.
    fn insert(&self, info_hash: InfoHash);

    /// Withdraws an info hash.
    fn remove(&self, info_hash: InfoHash);

    /// Starts a lookup; addresses arrive on the returned channel until
    /// the search exhausts itself.
    fn lookup(&self, info_hash: InfoHash) -> mpsc::Receiver<PeerAddress>;

    /// Notes a node advertised by a peer (Port message).
    fn observe(&self, addr: std::net::SocketAddr);
}
