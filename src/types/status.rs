// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use serde::{Deserialize, Serialize};

/// A moderator's verdict on a message, restricted to the three literal wire tokens the
/// signed payload canonicalization depends on. These are never integers or booleans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictStatus {
    /// Moderator rejects the message.
    #[serde(rename = "0")]
    Reject,
    /// Moderator accepts the message.
    #[serde(rename = "1")]
    Accept,
    /// Moderator has not decided yet; promises a verdict on a later retry.
    #[serde(rename = "acknowledged")]
    Acknowledged,
}

impl VerdictStatus {
    /// The exact byte string used when building a signed payload. Kept separate from the
    /// `serde` representation so a future wire-format change (e.g. extra punctuation in JSON)
    /// can't silently change what gets signed.
    pub fn canonical(&self) -> &'static str {
        match self {
            VerdictStatus::Reject => "0",
            VerdictStatus::Accept => "1",
            VerdictStatus::Acknowledged => "acknowledged",
        }
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical())
    }
}
