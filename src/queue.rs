//! Queue snapshots.
//!
//! A snapshot is the `squeue` listing reduced to its job lines: the header
//! line and blank lines are dropped, the remaining lines are trimmed and
//! kept in the order the scheduler printed them.

use crate::error::Result;
use crate::slurm::SlurmCommands;

/// Column header shown above the queue lines in the viewer and static output
pub const QUEUE_HEADER: &str =
    "JobID   Partition  JobName     User Status   Time    Nodes Nodelist(Reason)";

/// Whose jobs a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueScope {
    #[default]
    Mine,
    All,
}

impl QueueScope {
    #[must_use]
    pub fn from_show_all(show_all: bool) -> Self {
        if show_all { QueueScope::All } else { QueueScope::Mine }
    }

    /// Owner label used in headers, e.g. `alice's` or `The whole`
    #[must_use]
    pub fn owner_label(self, user: &str) -> String {
        match self {
            QueueScope::Mine => format!("{user}'s"),
            QueueScope::All => "The whole".to_string(),
        }
    }
}

/// Anything that can produce queue snapshots.
///
/// The live viewer depends on this rather than on [`SlurmCommands`] so that
/// it can be driven by canned listings.
pub trait SnapshotSource {
    fn fetch(&mut self, scope: QueueScope) -> Result<Vec<String>>;
}

/// Snapshot source backed by `squeue`
pub struct SlurmQueue<'a, S: SlurmCommands + ?Sized> {
    slurm: &'a S,
}

impl<'a, S: SlurmCommands + ?Sized> SlurmQueue<'a, S> {
    pub fn new(slurm: &'a S) -> Self {
        Self { slurm }
    }
}

impl<S: SlurmCommands + ?Sized> SnapshotSource for SlurmQueue<'_, S> {
    fn fetch(&mut self, scope: QueueScope) -> Result<Vec<String>> {
        fetch(self.slurm, scope)
    }
}

/// Run one queue listing and return its job lines.
///
/// Failures of the external call are returned unchanged; there is no retry.
pub fn fetch<S: SlurmCommands + ?Sized>(slurm: &S, scope: QueueScope) -> Result<Vec<String>> {
    let listing = slurm.queue(scope)?;
    Ok(parse_queue_listing(&listing))
}

/// Strip the header line and blank lines, preserving order
#[must_use]
pub fn parse_queue_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
