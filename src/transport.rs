// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

//! `Transport` — the underlying network send/receive collaborator. Out of scope for this crate
//! beyond the trait boundary and a deterministic in-memory double for tests.
//!
//! The source returns an untyped response from the transport and runtime-checks its shape. This
//! crate instead models the transport boundary as decoding a typed sum type exactly once (see
//! SPEC_FULL.md §9): `Transport::send` returns a decoded `ModCert` or a typed `Error`, and the
//! quorum driver never touches an untyped payload.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::moderator::ModeratorHandler;
use crate::types::{Mod, Msg, MsgCert};

/// Which logical endpoint a request targets, mirroring the wire routes `/route=auto` and
/// `/route=manual`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Auto,
    Manual,
}

/// The request body sent to a moderator, decoded by the transport according to `Route`.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportPayload {
    Msg(Msg),
    MsgCert(MsgCert),
}

/// Sends a request to a moderator and returns its decoded verdict (or a transport-level
/// failure). A real implementation carries this over HTTP/QUIC/etc; this crate only consumes
/// the trait.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, target: &Mod, route: Route, payload: TransportPayload) -> Result<crate::types::ModCert>;
}

/// Simulated per-peer misbehavior, for exercising the quorum driver's error handling without a
/// real network.
#[derive(Clone, Debug)]
pub enum PeerFault {
    /// Respond normally.
    None,
    /// Never respond; the caller's own per-peer deadline is what terminates this.
    Timeout,
    /// Fail immediately with a transport error.
    TransportError,
    /// Respond, but with a `public_key` different from the one the directory advertised.
    WrongPublicKey,
    /// Respond, but with a signature that does not verify.
    BadSignature,
}

/// An in-process `Transport` that dispatches directly to registered `ModeratorHandler`s,
/// optionally injecting faults per moderator public key. Used by the test suite and by
/// embedders wiring up the protocol without real networking.
#[derive(Default)]
pub struct InMemoryTransport {
    handlers: RwLock<HashMap<String, Arc<dyn ModeratorHandler>>>,
    faults: RwLock<HashMap<String, PeerFault>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, public_key: impl Into<String>, handler: Arc<dyn ModeratorHandler>) {
        self.handlers.write().await.insert(public_key.into(), handler);
    }

    pub async fn set_fault(&self, public_key: impl Into<String>, fault: PeerFault) {
        self.faults.write().await.insert(public_key.into(), fault);
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, target: &Mod, route: Route, payload: TransportPayload) -> Result<crate::types::ModCert> {
        let fault = self
            .faults
            .read()
            .await
            .get(&target.public_key)
            .cloned()
            .unwrap_or(PeerFault::None);

        match fault {
            PeerFault::Timeout => {
                futures::future::pending::<()>().await;
                unreachable!("pending future never resolves");
            }
            PeerFault::TransportError => {
                return Err(Error::Transport(format!(
                    "simulated failure contacting {}:{}",
                    target.ip, target.port
                )));
            }
            PeerFault::None | PeerFault::WrongPublicKey | PeerFault::BadSignature => {}
        }

        let handlers = self.handlers.read().await;
        let handler = handlers.get(&target.public_key).ok_or_else(|| {
            Error::Transport(format!("no moderator registered for {}", target.public_key))
        })?;

        let mut verdict = match route {
            Route::Auto => {
                let msg = match payload {
                    TransportPayload::Msg(msg) => msg,
                    TransportPayload::MsgCert(_) => {
                        return Err(Error::Transport("auto route requires a Msg payload".into()))
                    }
                };
                handler.handle_auto(msg).await?
            }
            Route::Manual => {
                let cert = match payload {
                    TransportPayload::MsgCert(cert) => cert,
                    TransportPayload::Msg(_) => {
                        return Err(Error::Transport("manual route requires a MsgCert payload".into()))
                    }
                };
                handler.handle_manual(cert).await?
            }
        };

        match fault {
            PeerFault::WrongPublicKey => verdict.public_key = format!("not-{}", verdict.public_key),
            PeerFault::BadSignature => verdict.sign = "0000".repeat(8),
            _ => {}
        }

        Ok(verdict)
    }
}
