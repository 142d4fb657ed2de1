// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

//! The pending-moderation ledger: a durable map from message-signature to partial-certificate
//! state, with atomic update/remove and snapshot-consistent enumeration for the retry scheduler.

mod memory;
mod sled_store;

pub use memory::MemoryPendingStore;
pub use sled_store::SledPendingStore;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ModCert, MsgCert};

/// A durable record of a manual moderation request whose verdict set is incomplete.
///
/// Invariant: `partial_certs` and `awaiting_mods` are disjoint in membership — a moderator
/// either has finalized (appears in `partial_certs`) or is awaited (appears in `awaiting_mods`),
/// never both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    #[serde(rename = "msgSign")]
    pub msg_sign: String,
    #[serde(rename = "msgCert")]
    pub msg_cert: MsgCert,
    #[serde(rename = "partialCerts")]
    pub partial_certs: Vec<ModCert>,
    #[serde(rename = "awaitingMods")]
    pub awaiting_mods: BTreeSet<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl PendingEntry {
    /// `true` if every invariant in SPEC_FULL.md §3 holds for this entry (disjointness only —
    /// signature validity is checked by the caller, which has access to `crypto::verify`).
    pub fn awaiting_and_partials_disjoint(&self) -> bool {
        self.partial_certs
            .iter()
            .all(|cert| !self.awaiting_mods.contains(&cert.public_key))
    }
}

/// Durable map from message-signature to partial-certificate state.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Upsert by `msg_sign`. Atomic with respect to concurrent `save`/`remove`/`list`.
    async fn save(&self, entry: PendingEntry) -> Result<()>;

    /// Remove the entry for `msg_sign`, if any.
    async fn remove(&self, msg_sign: &str) -> Result<()>;

    /// A snapshot-consistent enumeration of all pending entries. A concurrent mutation need
    /// not be visible in the returned snapshot.
    async fn list(&self) -> Result<Vec<PendingEntry>>;

    /// Atomically replace `awaiting_mods` and `partial_certs` for `msg_sign`. Used after a
    /// retry round merges newly-received verdicts.
    async fn update_awaiting(
        &self,
        msg_sign: &str,
        new_awaiting: BTreeSet<String>,
        merged_partials: Vec<ModCert>,
    ) -> Result<()>;
}
