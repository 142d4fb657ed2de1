// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{watch, Semaphore};
use tracing::{info, instrument, warn};

use crate::config::QuorumConfig;
use crate::crypto;
use crate::directory::ModeratorDirectory;
use crate::error::{Error, Result};
use crate::transport::{Route, Transport, TransportPayload};
use crate::types::{canonical_auto_payload, Mod, ModCert, Msg, VerdictStatus};

/// The result of a quorum round: the accepting verdicts (if any) and whether the final
/// acceptance predicate held. Never overloads a missing result onto both "no quorum" and "all
/// rejected" — see SPEC_FULL.md §9.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuorumOutcome {
    pub certs: Vec<ModCert>,
    pub accepted: bool,
}

/// Client-side automatic (publish-time) quorum driver.
pub struct AutoQuorumDriver<D, T> {
    directory: Arc<D>,
    transport: Arc<T>,
    peer_timeout: Duration,
    max_concurrent_peers: Option<usize>,
}

impl<D: ModeratorDirectory, T: Transport> AutoQuorumDriver<D, T> {
    pub fn new(directory: Arc<D>, transport: Arc<T>, peer_timeout: Duration) -> Self {
        Self {
            directory,
            transport,
            peer_timeout,
            max_concurrent_peers: None,
        }
    }

    /// Build a driver from the quorum section of [`crate::config::Config`], honoring both the
    /// auto-mode peer deadline and the optional fan-out concurrency cap (SPEC_FULL.md §5).
    pub fn from_config(directory: Arc<D>, transport: Arc<T>, config: &QuorumConfig) -> Self {
        Self {
            directory,
            transport,
            peer_timeout: config.auto_peer_timeout,
            max_concurrent_peers: config.max_concurrent_peers,
        }
    }

    /// Fan out `msg` to every currently-online moderator and aggregate under the four-
    /// inequality majority predicate of SPEC_FULL.md §4.4.
    #[instrument(skip(self, msg), fields(content_len = msg.content.len()))]
    pub async fn auto_quorum(&self, msg: Msg) -> Result<QuorumOutcome> {
        let mods = self.directory.online_moderators().await?;
        let n = mods.len();
        if n == 0 {
            return Err(Error::NoModerators);
        }

        let (cancel_tx, _) = watch::channel(false);
        let semaphore = self.max_concurrent_peers.map(|permits| Arc::new(Semaphore::new(permits)));
        let mut tasks = FuturesUnordered::new();
        for m in mods {
            let transport = self.transport.clone();
            let msg = msg.clone();
            let cancel_rx = cancel_tx.subscribe();
            let peer_timeout = self.peer_timeout;
            let semaphore = semaphore.clone();
            tasks.push(tokio::spawn(async move {
                run_peer(transport, m, msg, peer_timeout, semaphore, cancel_rx).await
            }));
        }

        let mut certs = Vec::new();
        let mut accepted = 0usize;
        let mut effective = n;
        let mut cancelled = false;

        while let Some(joined) = tasks.next().await {
            let vote = match joined {
                Ok(vote) => vote,
                Err(join_err) => {
                    warn!("peer task panicked, demoting to unresponsive: {join_err}");
                    PeerVote::Unresponsive
                }
            };

            match vote {
                PeerVote::Accept(cert) => {
                    certs.push(cert);
                    accepted += 1;
                    if !cancelled && accepted > n / 2 {
                        cancelled = true;
                        info!(accepted, n, "majority accept reached, cancelling outstanding peers");
                        let _ = cancel_tx.send(true);
                    }
                }
                PeerVote::NonAcceptValid => {}
                PeerVote::Unresponsive => effective -= 1,
            }
        }

        let accept_ratio = accepted as f64 / n as f64;
        let effective_ratio = if effective == 0 {
            0.0
        } else {
            accepted as f64 / effective as f64
        };
        let predicate =
            accepted > n / 2 && effective > n / 2 && accept_ratio >= 0.30 && effective_ratio >= 0.50;

        info!(accepted, effective, n, predicate, "auto quorum round complete");

        if predicate {
            Ok(QuorumOutcome {
                certs,
                accepted: true,
            })
        } else {
            Ok(QuorumOutcome {
                certs: Vec::new(),
                accepted: false,
            })
        }
    }
}

enum PeerVote {
    Accept(ModCert),
    NonAcceptValid,
    Unresponsive,
}

async fn run_peer(
    transport: Arc<dyn Transport>,
    m: Mod,
    msg: Msg,
    peer_timeout: Duration,
    semaphore: Option<Arc<Semaphore>>,
    mut cancel_rx: watch::Receiver<bool>,
) -> PeerVote {
    // Bounds the number of in-flight sends when `Config::max_concurrent_peers` is set
    // (SPEC_FULL.md §5); a cancelled round frees waiters immediately rather than letting them
    // block on a permit for a result nobody will read.
    let _permit = if let Some(semaphore) = semaphore {
        tokio::select! {
            biased;
            permit = semaphore.acquire_owned() => {
                match permit {
                    Ok(permit) => Some(permit),
                    Err(_closed) => return PeerVote::Unresponsive,
                }
            }
            _ = cancel_rx.changed() => return PeerVote::Unresponsive,
        }
    } else {
        None
    };

    let send_fut = transport.send(&m, Route::Auto, TransportPayload::Msg(msg.clone()));

    let result = tokio::select! {
        biased;
        res = tokio::time::timeout(peer_timeout, send_fut) => res,
        _ = cancel_rx.changed() => {
            return PeerVote::Unresponsive;
        }
    };

    let modcert = match result {
        Ok(Ok(modcert)) => modcert,
        Ok(Err(err)) => {
            warn!("mod {}:{} errored: {}", m.ip, m.port, err);
            return PeerVote::Unresponsive;
        }
        Err(_elapsed) => {
            warn!("mod {}:{} timed out", m.ip, m.port);
            return PeerVote::Unresponsive;
        }
    };

    if modcert.public_key != m.public_key {
        warn!(
            "mod {}:{} public key mismatch: expected {}, got {}",
            m.ip, m.port, m.public_key, modcert.public_key
        );
        return PeerVote::Unresponsive;
    }

    let payload = canonical_auto_payload(&msg, modcert.status);
    if !crypto::verify(&modcert.public_key, &payload, &modcert.sign) {
        warn!("mod {}:{} sent an invalid signature", m.ip, m.port);
        return PeerVote::Unresponsive;
    }

    if modcert.status == VerdictStatus::Accept {
        PeerVote::Accept(modcert)
    } else {
        PeerVote::NonAcceptValid
    }
}
