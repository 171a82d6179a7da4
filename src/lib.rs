//! # ssh_vanity
//!
//! Parallel vanity key search for OpenSSH ed25519 keys.
//!
//! ## Architecture
//!
//! - `crypto`: Keypair generation and OpenSSH key encoding
//! - `matcher`: Regular expression search conditions
//! - `worker`: Search workers and the coordinator driving them
//! - `output`: Key file persistence
//! - `config`: Runtime configuration

pub mod config;
pub mod crypto;
pub mod error;
pub mod matcher;
pub mod output;
pub mod worker;

pub use config::{Config, SearchConfig};
pub use crypto::KeyPair;
pub use error::SearchError;
pub use matcher::SearchCondition;
pub use output::{KeyFileWriter, KeyFiles};
pub use worker::{Coordinator, SearchStats, SearchSummary};
