// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;

use super::PendingEntry;
use crate::error::{Error, Result};
use crate::types::ModCert;

/// A `sled`-backed, durable `PendingStore`. Every mutating operation is a single `sled`
/// key/value write, which `sled` itself makes atomic and durable (fsynced on commit), so
/// `awaiting_mods` and `partial_certs` are never observed torn and the ledger survives a
/// process restart.
pub struct SledPendingStore {
    tree: sled::Tree,
}

const TREE_NAME: &str = "pending_moderation";

impl SledPendingStore {
    /// Open (creating if absent) a `sled` database at `path` and use its `pending_moderation`
    /// tree as the backing store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path).map_err(|e| Error::Store(e.to_string()))?;
        Self::from_db(&db)
    }

    /// Reuse an already-open `sled::Db`, e.g. one shared with other subsystems of a host
    /// process.
    pub fn from_db(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree(TREE_NAME).map_err(|e| Error::Store(e.to_string()))?;
        Ok(Self { tree })
    }

    fn encode(entry: &PendingEntry) -> Result<Vec<u8>> {
        serde_json::to_vec(entry).map_err(|e| Error::Store(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<PendingEntry> {
        serde_json::from_slice(bytes).map_err(|e| Error::Store(e.to_string()))
    }
}

#[async_trait]
impl super::PendingStore for SledPendingStore {
    async fn save(&self, entry: PendingEntry) -> Result<()> {
        let bytes = Self::encode(&entry)?;
        self.tree
            .insert(entry.msg_sign.as_bytes(), bytes)
            .map_err(|e| Error::Store(e.to_string()))?;
        self.tree.flush_async().await.map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, msg_sign: &str) -> Result<()> {
        self.tree
            .remove(msg_sign.as_bytes())
            .map_err(|e| Error::Store(e.to_string()))?;
        self.tree.flush_async().await.map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PendingEntry>> {
        let mut entries = Vec::new();
        for item in self.tree.iter() {
            let (_key, value) = item.map_err(|e| Error::Store(e.to_string()))?;
            entries.push(Self::decode(&value)?);
        }
        Ok(entries)
    }

    async fn update_awaiting(
        &self,
        msg_sign: &str,
        new_awaiting: BTreeSet<String>,
        merged_partials: Vec<ModCert>,
    ) -> Result<()> {
        let existing = self
            .tree
            .get(msg_sign.as_bytes())
            .map_err(|e| Error::Store(e.to_string()))?;
        let Some(existing) = existing else {
            return Ok(());
        };
        let mut entry = Self::decode(&existing)?;
        entry.awaiting_mods = new_awaiting;
        entry.partial_certs = merged_partials;

        let bytes = Self::encode(&entry)?;
        self.tree
            .insert(msg_sign.as_bytes(), bytes)
            .map_err(|e| Error::Store(e.to_string()))?;
        self.tree.flush_async().await.map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PendingStore;
    use crate::types::{Msg, MsgCert, VerdictStatus};
    use chrono::Utc;

    fn entry(msg_sign: &str, awaiting: &[&str]) -> PendingEntry {
        PendingEntry {
            msg_sign: msg_sign.into(),
            msg_cert: MsgCert::new(Msg::new("m", 1), msg_sign.into(), "pub".into()),
            partial_certs: vec![],
            awaiting_mods: awaiting.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledPendingStore::open(dir.path()).unwrap();
        store.save(entry("sig1", &["a", "b"])).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].msg_sign, "sig1");
    }

    #[tokio::test]
    async fn survives_reopening_the_same_path() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledPendingStore::open(dir.path()).unwrap();
            store.save(entry("sig1", &["a"])).await.unwrap();
        }

        let reopened = SledPendingStore::open(dir.path()).unwrap();
        let listed = reopened.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].msg_sign, "sig1");
    }

    #[tokio::test]
    async fn update_awaiting_merges_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledPendingStore::open(dir.path()).unwrap();
        store.save(entry("sig1", &["a", "b"])).await.unwrap();

        let merged = vec![ModCert {
            public_key: "a".into(),
            status: VerdictStatus::Accept,
            sign: "sig".into(),
        }];
        store
            .update_awaiting("sig1", BTreeSet::from(["b".to_string()]), merged.clone())
            .await
            .unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].awaiting_mods, BTreeSet::from(["b".to_string()]));
        assert_eq!(listed[0].partial_certs, merged);
    }

    #[tokio::test]
    async fn remove_drops_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledPendingStore::open(dir.path()).unwrap();
        store.save(entry("sig1", &["a"])).await.unwrap();
        store.remove("sig1").await.unwrap();

        assert!(store.list().await.unwrap().is_empty());
    }
}
