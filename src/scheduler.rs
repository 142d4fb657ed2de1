// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

//! The retry scheduler: a background sweep over the pending-moderation ledger that re-addresses
//! still-awaited moderators, merges newly-decided verdicts, and retires entries that either
//! settle or age past their TTL.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::directory::ModeratorDirectory;
use crate::error::Result;
use crate::ledger::PendingStore;
use crate::quorum::{ManualQuorumDriver, QuorumOutcome};
use crate::transport::Transport;

/// A finalized message the scheduler has stopped tracking, either because a quorum was reached
/// (in either direction) or because it aged out.
#[derive(Clone, Debug)]
pub enum CompletedModeration {
    Completed {
        msg_sign: String,
        outcome: QuorumOutcome,
    },
    Expired {
        msg_sign: String,
    },
}

/// Periodically re-drives every entry in a [`PendingStore`] through another
/// [`ManualQuorumDriver`] round, until it settles or its TTL elapses.
pub struct RetryScheduler<D, T, P> {
    directory: Arc<D>,
    manual: ManualQuorumDriver<T>,
    store: Arc<P>,
    config: SchedulerConfig,
}

impl<D, T, P> RetryScheduler<D, T, P>
where
    D: ModeratorDirectory,
    T: Transport,
    P: PendingStore,
{
    pub fn new(directory: Arc<D>, manual: ManualQuorumDriver<T>, store: Arc<P>, config: SchedulerConfig) -> Self {
        Self {
            directory,
            manual,
            store,
            config,
        }
    }

    /// Run the sweep loop forever, reporting finalized entries on `completions`. Intended to be
    /// spawned as its own task; returns only if `completions` is dropped.
    pub async fn run(self, completions: mpsc::Sender<CompletedModeration>) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.sweep_once(&completions).await {
                error!("pending-moderation sweep failed: {err}");
            }
            if completions.is_closed() {
                return;
            }
        }
    }

    /// Drive one sweep over every currently-pending entry. Exposed separately from [`Self::run`]
    /// so tests and embedders can trigger a sweep deterministically instead of waiting on the
    /// interval.
    #[instrument(skip(self, completions))]
    pub async fn sweep_once(&self, completions: &mpsc::Sender<CompletedModeration>) -> Result<()> {
        let entries = self.store.list().await?;
        info!(pending = entries.len(), "sweeping pending-moderation ledger");

        for entry in entries {
            let age = Utc::now().signed_duration_since(entry.created_at);
            let ttl = chrono::Duration::from_std(self.config.ttl).unwrap_or(chrono::Duration::max_value());
            if age > ttl {
                warn!(msg_sign = %entry.msg_sign, "pending entry exceeded its TTL, expiring");
                self.store.remove(&entry.msg_sign).await?;
                let _ = completions
                    .send(CompletedModeration::Expired {
                        msg_sign: entry.msg_sign,
                    })
                    .await;
                continue;
            }

            let msg_sign = entry.msg_sign.clone();
            let round = self.manual.run_round(self.directory.as_ref(), entry).await?;

            match round.final_outcome {
                Some(outcome) => {
                    self.store.remove(&msg_sign).await?;
                    let _ = completions
                        .send(CompletedModeration::Completed { msg_sign, outcome })
                        .await;
                }
                None => {
                    self.store
                        .update_awaiting(&msg_sign, round.entry.awaiting_mods, round.entry.partial_certs)
                        .await?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use crate::directory::MemoryDirectory;
    use crate::keystore::StaticKeyStore;
    use crate::ledger::{MemoryPendingStore, PendingEntry};
    use crate::moderator::{AlwaysDefer, ModeratorEngine, NeverDefer, RuleClassifier};
    use crate::transport::InMemoryTransport;
    use crate::types::{Mod, Msg, MsgCert};
    use std::collections::BTreeSet;
    use std::time::Duration;

    async fn register(transport: &InMemoryTransport, defer: bool) -> String {
        let (store, keypair) = StaticKeyStore::generate();
        let public_key = crypto::encode_public_key(&keypair);
        if defer {
            let engine = ModeratorEngine::new(RuleClassifier::always_accept(), store, AlwaysDefer);
            transport.register(public_key.clone(), Arc::new(engine)).await;
        } else {
            let engine = ModeratorEngine::new(RuleClassifier::always_accept(), store, NeverDefer);
            transport.register(public_key.clone(), Arc::new(engine)).await;
        }
        public_key
    }

    #[tokio::test]
    async fn a_deferred_entry_settles_once_the_moderator_stops_deferring() {
        let directory = Arc::new(MemoryDirectory::default());
        let transport = Arc::new(InMemoryTransport::new());
        let store = Arc::new(MemoryPendingStore::new());

        let a = register(&transport, false).await;
        let b = register(&transport, false).await;
        let deferring = register(&transport, true).await;
        for key in [&a, &b, &deferring] {
            directory.insert(Mod {
                ip: "127.0.0.1".into(),
                port: "9000".into(),
                public_key: key.clone(),
            });
        }

        let cert = MsgCert::new(Msg::new("hello", 1), "pubsig".into(), "pub".into());
        let entry = PendingEntry {
            msg_sign: cert.sign.clone(),
            msg_cert: cert,
            partial_certs: Vec::new(),
            awaiting_mods: BTreeSet::from([a, b, deferring.clone()]),
            created_at: Utc::now(),
        };
        store.save(entry).await.unwrap();

        let manual = ManualQuorumDriver::new(transport.clone(), Duration::from_millis(200));
        let scheduler = RetryScheduler::new(directory.clone(), manual, store.clone(), SchedulerConfig::default());

        let (tx, mut rx) = mpsc::channel(8);
        scheduler.sweep_once(&tx).await.unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(store.list().await.unwrap()[0].awaiting_mods.len(), 1);

        let (new_store, keypair) = StaticKeyStore::generate();
        let _ = keypair;
        let engine = ModeratorEngine::new(RuleClassifier::always_accept(), new_store, NeverDefer);
        transport.register(deferring, Arc::new(engine)).await;

        scheduler.sweep_once(&tx).await.unwrap();
        let completion = rx.try_recv().unwrap();
        assert!(matches!(
            completion,
            CompletedModeration::Completed { outcome, .. } if outcome.accepted
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn an_expired_entry_is_dropped_and_reported() {
        let directory = Arc::new(MemoryDirectory::default());
        let transport = Arc::new(InMemoryTransport::new());
        let store = Arc::new(MemoryPendingStore::new());

        let cert = MsgCert::new(Msg::new("hello", 1), "pubsig".into(), "pub".into());
        let stale_entry = PendingEntry {
            msg_sign: cert.sign.clone(),
            msg_cert: cert,
            partial_certs: Vec::new(),
            awaiting_mods: BTreeSet::from(["ghost".to_string()]),
            created_at: Utc::now() - chrono::Duration::days(2),
        };
        store.save(stale_entry).await.unwrap();

        let manual = ManualQuorumDriver::new(transport, Duration::from_millis(50));
        let mut config = SchedulerConfig::default();
        config.ttl = Duration::from_secs(3600);
        let scheduler = RetryScheduler::new(directory, manual, store.clone(), config);

        let (tx, mut rx) = mpsc::channel(8);
        scheduler.sweep_once(&tx).await.unwrap();

        let completion = rx.try_recv().unwrap();
        assert!(matches!(completion, CompletedModeration::Expired { .. }));
        assert!(store.list().await.unwrap().is_empty());
    }
}
