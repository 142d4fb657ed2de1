// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use dashmap::DashMap;

use crate::types::ModCert;

/// A process-scoped, write-once cache of verdicts keyed by `msg_cert.sign`, giving the
/// moderator idempotent re-delivery: re-processing the same `MsgCert` returns the first
/// decision rather than re-running the classifier (and, for a non-deterministic classifier,
/// re-signing a different answer).
///
/// Explicit lifecycle (`new`/`clear`) rather than the source's implicit global `map[string]`,
/// per the design note in SPEC_FULL.md §9.
#[derive(Default)]
pub struct VerdictCache {
    decisions: DashMap<String, ModCert>,
}

impl VerdictCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached verdict for `msg_sign`, if a decision has already been made.
    pub fn get(&self, msg_sign: &str) -> Option<ModCert> {
        self.decisions.get(msg_sign).map(|entry| entry.clone())
    }

    /// Records the first decision for `msg_sign`. Subsequent calls for the same key are no-ops:
    /// the cache is write-once after the first decision.
    pub fn record_if_absent(&self, msg_sign: &str, verdict: ModCert) -> ModCert {
        self.decisions
            .entry(msg_sign.to_string())
            .or_insert(verdict)
            .clone()
    }

    /// Drops every cached decision. Intended for test isolation and explicit process-lifetime
    /// resets, not for routine operation.
    pub fn clear(&self) {
        self.decisions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VerdictStatus;

    fn verdict(sign: &str) -> ModCert {
        ModCert {
            public_key: "pk".into(),
            status: VerdictStatus::Accept,
            sign: sign.into(),
        }
    }

    #[test]
    fn first_write_wins() {
        let cache = VerdictCache::new();
        let first = cache.record_if_absent("sig", verdict("first"));
        let second = cache.record_if_absent("sig", verdict("second"));

        assert_eq!(first.sign, "first");
        assert_eq!(second.sign, "first");
        assert_eq!(cache.get("sig").unwrap().sign, "first");
    }

    #[test]
    fn clear_forgets_decisions() {
        let cache = VerdictCache::new();
        cache.record_if_absent("sig", verdict("first"));
        cache.clear();
        assert!(cache.get("sig").is_none());
    }

    #[test]
    fn unknown_key_is_absent() {
        let cache = VerdictCache::new();
        assert!(cache.get("missing").is_none());
    }
}
