//! Client, swarm and handle lifecycle.
//!
//! One [`ClientSession`] per process owns the listener, the thread
//! budget and a handle map keyed by info hash. Each [`TorrentHandle`]
//! controls one torrent (open, start, pause, stop, close) and fronts a
//! [`SwarmSession`] that announces to trackers and keeps a bounded set
//! of peer sessions running.

mod client;
mod error;
mod events;
mod handle;
mod progress;
mod swarm;

pub use client::{ClientConfig, ClientSession};
pub use error::SessionError;
pub use events::{Event, TorrentStatus};
pub use handle::TorrentHandle;
pub use progress::{Progress, ProgressSnapshot};
pub use swarm::SwarmSession;
