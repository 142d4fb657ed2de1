// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;

use super::PendingEntry;
use crate::error::Result;
use crate::types::ModCert;

/// A `dashmap`-backed in-process `PendingStore`. Suitable for tests and for embedding the
/// protocol in a single process without external storage; does not survive a restart.
#[derive(Default)]
pub struct MemoryPendingStore {
    entries: DashMap<String, PendingEntry>,
}

impl MemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl super::PendingStore for MemoryPendingStore {
    async fn save(&self, entry: PendingEntry) -> Result<()> {
        self.entries.insert(entry.msg_sign.clone(), entry);
        Ok(())
    }

    async fn remove(&self, msg_sign: &str) -> Result<()> {
        self.entries.remove(msg_sign);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PendingEntry>> {
        Ok(self.entries.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn update_awaiting(
        &self,
        msg_sign: &str,
        new_awaiting: BTreeSet<String>,
        merged_partials: Vec<ModCert>,
    ) -> Result<()> {
        if let Some(mut entry) = self.entries.get_mut(msg_sign) {
            entry.awaiting_mods = new_awaiting;
            entry.partial_certs = merged_partials;
        }
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
        let store = MemoryPendingStore::new();
        store.save(entry("sig1", &["a", "b"])).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].msg_sign, "sig1");
    }

    #[tokio::test]
    async fn save_upserts_by_msg_sign() {
        let store = MemoryPendingStore::new();
        store.save(entry("sig1", &["a"])).await.unwrap();
        store.save(entry("sig1", &["a", "b"])).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].awaiting_mods.len(), 2);
    }

    #[tokio::test]
    async fn remove_drops_the_entry() {
        let store = MemoryPendingStore::new();
        store.save(entry("sig1", &["a"])).await.unwrap();
        store.remove("sig1").await.unwrap();

        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_awaiting_atomically_replaces_both_fields() {
        let store = MemoryPendingStore::new();
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
    async fn update_awaiting_on_missing_key_is_a_no_op() {
        let store = MemoryPendingStore::new();
        store
            .update_awaiting("missing", BTreeSet::new(), vec![])
            .await
            .unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
