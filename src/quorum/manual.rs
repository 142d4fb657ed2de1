// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{info, instrument, warn};

use super::auto::QuorumOutcome;
use crate::config::QuorumConfig;
use crate::crypto;
use crate::directory::ModeratorDirectory;
use crate::error::{Error, Result};
use crate::ledger::PendingEntry;
use crate::transport::{Route, Transport, TransportPayload};
use crate::types::{canonical_manual_payload, Mod, ModCert, MsgCert, VerdictStatus};

/// The result of one manual-mode round: the updated ledger entry, this round's acknowledgement
/// count (observability only, never persisted — see SPEC_FULL.md §9), and a final verdict if
/// this round settled the message one way or the other.
pub struct ManualOutcome {
    pub entry: PendingEntry,
    pub ack_count: usize,
    pub final_outcome: Option<QuorumOutcome>,
}

/// Client-side manual (escalation/retry) quorum driver.
///
/// Unlike [`super::auto::AutoQuorumDriver`], a manual round never cancels outstanding peers
/// early: every addressed moderator gets its full `peer_timeout` to either decide or
/// acknowledge, because a deferred moderator's later retry is a decision this protocol still
/// wants.
pub struct ManualQuorumDriver<T> {
    transport: Arc<T>,
    peer_timeout: Duration,
}

impl<T: Transport> ManualQuorumDriver<T> {
    pub fn new(transport: Arc<T>, peer_timeout: Duration) -> Self {
        Self {
            transport,
            peer_timeout,
        }
    }

    /// Build a driver from the quorum section of [`crate::config::Config`], using the
    /// manual-mode peer deadline.
    pub fn from_config(transport: Arc<T>, config: &QuorumConfig) -> Self {
        Self::new(transport, config.manual_peer_timeout)
    }

    /// Open a new pending-moderation entry for `cert` against every currently-online moderator
    /// and run its first round.
    pub async fn first_round<D: ModeratorDirectory>(
        &self,
        directory: &D,
        cert: MsgCert,
    ) -> Result<ManualOutcome> {
        let mods = directory.online_moderators().await?;
        if mods.is_empty() {
            return Err(Error::NoModerators);
        }
        let awaiting_mods = mods.iter().map(|m| m.public_key.clone()).collect::<BTreeSet<_>>();
        let entry = PendingEntry {
            msg_sign: cert.sign.clone(),
            msg_cert: cert,
            partial_certs: Vec::new(),
            awaiting_mods,
            created_at: Utc::now(),
        };
        self.run_round(directory, entry).await
    }

    /// Re-address every moderator still in `entry.awaiting_mods`, merge newly-decided verdicts
    /// into `entry.partial_certs`, and re-evaluate the quorum predicate over the accumulated
    /// state. The denominator `n` is `partial_certs.len() + awaiting_mods.len()`, which the
    /// `PendingEntry` disjointness invariant keeps constant across retries.
    #[instrument(skip(self, directory, entry), fields(msg_sign = %entry.msg_sign))]
    pub async fn run_round<D: ModeratorDirectory>(
        &self,
        directory: &D,
        mut entry: PendingEntry,
    ) -> Result<ManualOutcome> {
        let mut tasks = FuturesUnordered::new();
        let mut unreachable = BTreeSet::new();

        for public_key in &entry.awaiting_mods {
            match directory.lookup(public_key).await? {
                Some(target) => {
                    let transport = self.transport.clone();
                    let cert = entry.msg_cert.clone();
                    let peer_timeout = self.peer_timeout;
                    let public_key = public_key.clone();
                    tasks.push(tokio::spawn(async move {
                        (public_key, run_peer(transport, target, cert, peer_timeout).await)
                    }));
                }
                None => {
                    unreachable.insert(public_key.clone());
                }
            }
        }

        let mut ack_count = 0usize;
        let mut still_awaiting = unreachable;

        while let Some(joined) = tasks.next().await {
            let (public_key, vote) = match joined {
                Ok(pair) => pair,
                Err(join_err) => {
                    warn!("peer task panicked, re-awaiting: {join_err}");
                    continue;
                }
            };

            match vote {
                ManualVote::Decided(cert) => entry.partial_certs.push(cert),
                ManualVote::Acknowledged => {
                    ack_count += 1;
                    still_awaiting.insert(public_key);
                }
                ManualVote::Unresponsive => {
                    still_awaiting.insert(public_key);
                }
            }
        }

        entry.awaiting_mods = still_awaiting;

        let n = entry.partial_certs.len() + entry.awaiting_mods.len();
        let accepted = entry
            .partial_certs
            .iter()
            .filter(|c| c.status == VerdictStatus::Accept)
            .count();
        let effective = entry.partial_certs.len();

        let accept_ratio = accepted as f64 / n as f64;
        let effective_ratio = if effective == 0 {
            0.0
        } else {
            accepted as f64 / effective as f64
        };
        let predicate =
            accepted > n / 2 && effective > n / 2 && accept_ratio >= 0.30 && effective_ratio >= 0.50;

        info!(
            accepted,
            effective,
            n,
            awaiting = entry.awaiting_mods.len(),
            ack_count,
            predicate,
            "manual quorum round complete"
        );

        let final_outcome = if predicate {
            Some(QuorumOutcome {
                certs: entry
                    .partial_certs
                    .iter()
                    .filter(|c| c.status == VerdictStatus::Accept)
                    .cloned()
                    .collect(),
                accepted: true,
            })
        } else if entry.awaiting_mods.is_empty() {
            Some(QuorumOutcome {
                certs: Vec::new(),
                accepted: false,
            })
        } else {
            None
        };

        Ok(ManualOutcome {
            entry,
            ack_count,
            final_outcome,
        })
    }
}

enum ManualVote {
    Decided(ModCert),
    Acknowledged,
    Unresponsive,
}

async fn run_peer(
    transport: Arc<dyn Transport>,
    target: Mod,
    cert: MsgCert,
    peer_timeout: Duration,
) -> ManualVote {
    let result = tokio::time::timeout(
        peer_timeout,
        transport.send(&target, Route::Manual, TransportPayload::MsgCert(cert.clone())),
    )
    .await;

    let modcert = match result {
        Ok(Ok(modcert)) => modcert,
        Ok(Err(err)) => {
            warn!("mod {}:{} errored: {}", target.ip, target.port, err);
            return ManualVote::Unresponsive;
        }
        Err(_elapsed) => {
            warn!("mod {}:{} timed out", target.ip, target.port);
            return ManualVote::Unresponsive;
        }
    };

    if modcert.public_key != target.public_key {
        warn!("mod {}:{} public key mismatch", target.ip, target.port);
        return ManualVote::Unresponsive;
    }

    if modcert.status == VerdictStatus::Acknowledged {
        // An acknowledgement carries no fresh signature — it echoes the publisher's own
        // `sign` to confirm receipt, per `ModeratorEngine::handle_manual`. The only check
        // available is that the echo matches what was sent.
        if modcert.sign != cert.sign {
            warn!("mod {}:{} echoed an unexpected signature", target.ip, target.port);
            return ManualVote::Unresponsive;
        }
        return ManualVote::Acknowledged;
    }

    let payload = canonical_manual_payload(&cert.sign, modcert.status);
    if !crypto::verify(&modcert.public_key, &payload, &modcert.sign) {
        warn!("mod {}:{} sent an invalid signature", target.ip, target.port);
        return ManualVote::Unresponsive;
    }

    ManualVote::Decided(modcert)
}
