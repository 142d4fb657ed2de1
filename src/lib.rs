// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

//! A peer-to-peer, cryptographically signed message moderation quorum protocol.
//!
//! A publisher signs a message and fans it out to the moderators currently online
//! ([`quorum::AutoQuorumDriver`]). Each moderator classifies the message and signs its verdict
//! ([`moderator::ModeratorEngine`]); the publisher aggregates those verdicts under a majority
//! predicate to decide whether the message is accepted. A moderator that cannot decide
//! immediately may defer, in which case the publisher escalates through the slower manual path
//! ([`quorum::ManualQuorumDriver`]), persists the outstanding moderators to a durable ledger
//! ([`ledger::PendingStore`]), and a background [`scheduler::RetryScheduler`] re-addresses them
//! until the message settles or its entry ages out.
//!
//! Every external collaborator this crate needs — peer discovery, the network transport, key
//! storage, and the moderation policy itself — is a trait at [`directory`], [`transport`],
//! [`keystore`], and [`moderator::classifier`]; this crate only consumes them.

pub mod config;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod keystore;
pub mod ledger;
pub mod moderator;
pub mod quorum;
pub mod scheduler;
pub mod transport;
pub mod types;

pub use config::{Config, QuorumConfig, SchedulerConfig};
pub use error::{Error, Result};

/// Runs once before the first test in the binary, so every `#[tokio::test]` in this crate gets
/// `tracing` output on failure without each test file wiring up its own subscriber.
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
