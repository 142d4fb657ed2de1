// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

//! `ModeratorDirectory` — the peer discovery / DHT-style routing collaborator. Out of scope for
//! this crate beyond the trait boundary and a deterministic in-memory double for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Mod;

/// Enumerates and resolves currently-online moderators. A real implementation sits on top of a
/// DHT or similar routing layer; this crate only consumes the trait.
#[async_trait]
pub trait ModeratorDirectory: Send + Sync {
    /// All moderators currently considered online, in arbitrary order.
    async fn online_moderators(&self) -> Result<Vec<Mod>>;

    /// Resolve a moderator's current locator by its public key, if it is known to be online.
    async fn lookup(&self, public_key: &str) -> Result<Option<Mod>>;
}

/// A fixed, in-process directory. Useful for tests and for embedding the protocol without a
/// real peer-discovery layer.
#[derive(Default)]
pub struct MemoryDirectory {
    mods: RwLock<HashMap<String, Mod>>,
}

impl MemoryDirectory {
    pub fn new(mods: impl IntoIterator<Item = Mod>) -> Self {
        let map = mods.into_iter().map(|m| (m.public_key.clone(), m)).collect();
        Self {
            mods: RwLock::new(map),
        }
    }

    /// Add or replace a moderator's locator, simulating it coming online.
    pub fn insert(&self, m: Mod) {
        self.mods.write().expect("lock poisoned").insert(m.public_key.clone(), m);
    }

    /// Remove a moderator, simulating it going offline.
    pub fn remove(&self, public_key: &str) {
        self.mods.write().expect("lock poisoned").remove(public_key);
    }
}

#[async_trait]
impl ModeratorDirectory for MemoryDirectory {
    async fn online_moderators(&self) -> Result<Vec<Mod>> {
        Ok(self.mods.read().expect("lock poisoned").values().cloned().collect())
    }

    async fn lookup(&self, public_key: &str) -> Result<Option<Mod>> {
        Ok(self.mods.read().expect("lock poisoned").get(public_key).cloned())
    }
}
