//! Parallel key search.
//!
//! This module provides:
//! - Search workers generating and testing keypairs on their own threads
//! - The coordinator that spawns them, counts matches and stops them
//! - The messages exchanged between the two
//!
//! Workers and coordinator share nothing mutable; every interaction goes
//! through `crossbeam_channel` channels.

mod coordinator;
mod search;

pub use coordinator::{throughput, Coordinator, Harvest, SearchStats, SearchSummary};
pub use search::SearchWorker;

use crate::error::SearchError;

/// What a worker has to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A matching key was enqueued; carries its candidate string.
    Found(String),
    /// Keys generated since the worker's previous count.
    Count(u64),
}

/// A worker report on the shared report channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub worker: usize,
    pub event: Event,
}

/// Message on a worker's private control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Quit,
}

/// Sent on the completion channel once a worker has stopped.
#[derive(Debug)]
pub struct WorkerExit {
    pub worker: usize,
    pub outcome: Result<(), SearchError>,
}
