//! Tracker protocols ([BEP-3], [BEP-15], [BEP-23]).
//!
//! Trackers are the rendezvous servers of a swarm: clients announce
//! themselves periodically and receive peer lists back, and may scrape
//! aggregate statistics. Both the HTTP(S) and the binary UDP transport
//! are implemented; [`TrackerSession`] wraps a torrent's tracker list so
//! a swarm announces through one serialised channel.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html
//! [BEP-15]: http://bittorrent.org/beps/bep_0015.html
//! [BEP-23]: http://bittorrent.org/beps/bep_0023.html

mod error;
mod http;
mod query;
mod response;
mod session;
mod udp;

pub use error::TrackerError;
pub use http::{scrape_url, HttpTracker};
pub use query::AnnounceQuery;
pub use response::{AnnounceInfo, PeerAddress, ScrapeInfo, TrackerEvent};
pub use session::{Tracker, TrackerSession};
pub use udp::UdpTracker;

#[cfg(test)]
mod tests;
