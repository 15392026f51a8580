use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transfer totals for one torrent.
///
/// Counters are only ever advanced by the exchange collaborator
/// reporting successful block transfers, so readers observe
/// monotonically non-decreasing uploaded/downloaded values.
#[derive(Debug)]
pub struct Progress {
    uploaded: AtomicU64,
    downloaded: AtomicU64,
    left: AtomicU64,
}

/// One consistent-enough reading of a [`Progress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
}

impl ProgressSnapshot {
    /// Folds another snapshot into this one (client-wide totals).
    pub fn merge(&mut self, other: ProgressSnapshot) {
        self.uploaded += other.uploaded;
        self.downloaded += other.downloaded;
        self.left += other.left;
    }
}

impl Progress {
    /// A fresh torrent: nothing transferred, everything left.
    pub fn fresh(total_length: u64) -> Self {
        Self {
            uploaded: AtomicU64::new(0),
            downloaded: AtomicU64::new(0),
            left: AtomicU64::new(total_length),
        }
    }

    /// Loads a resume file, falling back to fresh when it is absent.
    ///
    /// The format is three decimal integers `uploaded downloaded left`
    /// separated by single spaces. A malformed file is an error; only a
    /// missing one means a fresh start.
    pub fn load(path: &Path, total_length: u64) -> std::io::Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::fresh(total_length))
            }
            Err(e) => return Err(e),
        };

        let mut fields = text.split_whitespace().map(str::parse::<u64>);
        let mut next = || {
            fields
                .next()
                .and_then(Result::ok)
                .ok_or_else(|| std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "resume file needs three integers",
                ))
        };

        Ok(Self {
            uploaded: AtomicU64::new(next()?),
            downloaded: AtomicU64::new(next()?),
            left: AtomicU64::new(next()?),
        })
    }

    /// Writes the resume file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let snap = self.snapshot();
        std::fs::write(
            path,
            format!("{} {} {}", snap.uploaded, snap.downloaded, snap.left),
        )
    }

    /// Credits bytes served to a peer.
    pub fn add_uploaded(&self, bytes: u64) {
        self.uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Credits bytes received and verified; shrinks `left` accordingly.
    pub fn add_downloaded(&self, bytes: u64) {
        self.downloaded.fetch_add(bytes, Ordering::Relaxed);
        self.left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| {
                Some(left.saturating_sub(bytes))
            })
            .ok();
    }

    /// True once nothing is left to download.
    pub fn is_complete(&self) -> bool {
        self.left.load(Ordering::Relaxed) == 0
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            uploaded: self.uploaded.load(Ordering::Relaxed),
            downloaded: self.downloaded.load(Ordering::Relaxed),
            left: self.left.load(Ordering::Relaxed),
        }
    }
}
