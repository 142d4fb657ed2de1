// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::cache::VerdictCache;
use super::classifier::Classifier;
use super::deferral::DeferralPolicy;
use crate::crypto;
use crate::error::{Error, Result};
use crate::keystore::KeyStore;
use crate::types::{canonical_auto_payload, canonical_manual_payload, Msg, ModCert, MsgCert, VerdictStatus};

/// Moderator-side verdict engine: classifies a message or escalation, signs the result, and
/// caches it for idempotent re-delivery.
pub struct ModeratorEngine<C, K, D = super::deferral::NeverDefer> {
    classifier: C,
    key_store: K,
    deferral: D,
    cache: VerdictCache,
}

impl<C: Classifier, K: KeyStore, D: DeferralPolicy> ModeratorEngine<C, K, D> {
    pub fn new(classifier: C, key_store: K, deferral: D) -> Self {
        Self {
            classifier,
            key_store,
            deferral,
            cache: VerdictCache::new(),
        }
    }

    /// `route=auto`: validate, classify, sign over the auto-mode payload.
    pub async fn handle_auto(&self, msg: Msg) -> Result<ModCert> {
        if msg.content.trim().is_empty() {
            return Err(Error::BadRequest("content must not be empty".into()));
        }
        if msg.ts <= 0 {
            return Err(Error::BadRequest("ts must be positive".into()));
        }

        let cache_key = msg.canonical_bytes();
        let cache_key = hex::encode(&cache_key);
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!("returning cached auto verdict for {}", cache_key);
            return Ok(cached);
        }

        let status = self.classify_strict(&msg.content).await?;
        let (public_key, keypair) = self.key_store.load_keys()?;
        let payload = canonical_auto_payload(&msg, status);
        let sign = crypto::sign(&keypair, &payload);

        let verdict = ModCert {
            public_key,
            status,
            sign,
        };
        Ok(self.cache.record_if_absent(&cache_key, verdict))
    }

    /// `route=manual`: either classify immediately (same payload shape as auto, but over the
    /// manual-mode payload) or acknowledge and defer to a later retry.
    pub async fn handle_manual(&self, cert: MsgCert) -> Result<ModCert> {
        if let Some(cached) = self.cache.get(&cert.sign) {
            debug!("returning cached manual verdict for {}", cert.sign);
            return Ok(cached);
        }

        if self.deferral.should_defer(&cert) {
            warn!("deferring manual request {}, will acknowledge", cert.sign);
            // Acknowledgement echoes the publisher's signature; it is never cached, since it
            // is not yet a decision — the next retry may classify for real.
            return Ok(ModCert {
                public_key: self.key_store.load_keys()?.0,
                status: VerdictStatus::Acknowledged,
                sign: cert.sign,
            });
        }

        let status = self.classify_strict(&cert.msg.content).await?;
        let (public_key, keypair) = self.key_store.load_keys()?;
        let payload = canonical_manual_payload(&cert.sign, status);
        let sign = crypto::sign(&keypair, &payload);

        let verdict = ModCert {
            public_key,
            status,
            sign,
        };
        Ok(self.cache.record_if_absent(&cert.sign, verdict))
    }

    async fn classify_strict(&self, content: &str) -> Result<VerdictStatus> {
        match self.classifier.classify(content).await {
            Ok(VerdictStatus::Acknowledged) => Err(Error::Internal(
                "classifier must not return Acknowledged".into(),
            )),
            Ok(status) => Ok(status),
            Err(err) => Err(Error::Internal(err.to_string())),
        }
    }
}

/// Transport-agnostic dispatch surface the `Transport` layer calls into. Implemented for every
/// `ModeratorEngine` instantiation so a `Transport::send` implementation can hold a
/// `dyn ModeratorHandler` without naming the concrete `Classifier`/`KeyStore`/`DeferralPolicy`
/// types.
#[async_trait]
pub trait ModeratorHandler: Send + Sync {
    async fn handle_auto(&self, msg: Msg) -> Result<ModCert>;
    async fn handle_manual(&self, cert: MsgCert) -> Result<ModCert>;
}

#[async_trait]
impl<C, K, D> ModeratorHandler for ModeratorEngine<C, K, D>
where
    C: Classifier,
    K: KeyStore,
    D: DeferralPolicy,
{
    async fn handle_auto(&self, msg: Msg) -> Result<ModCert> {
        ModeratorEngine::handle_auto(self, msg).await
    }

    async fn handle_manual(&self, cert: MsgCert) -> Result<ModCert> {
        ModeratorEngine::handle_manual(self, cert).await
    }
}
