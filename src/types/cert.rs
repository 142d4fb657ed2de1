// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use serde::{Deserialize, Serialize};

use super::{Msg, VerdictStatus};

/// The publisher's signed publication envelope, presented to moderators for evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgCert {
    pub msg: Msg,
    pub sign: String,
    #[serde(rename = "publisherPubKey")]
    pub publisher_pub_key: String,
    /// Set only for manual escalations.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}

impl MsgCert {
    pub fn new(msg: Msg, sign: String, publisher_pub_key: String) -> Self {
        Self {
            msg,
            sign,
            publisher_pub_key,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// A moderator's signed decision on a message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModCert {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub status: VerdictStatus,
    pub sign: String,
}

/// A moderator peer descriptor. Identity is `public_key`; `ip`/`port` are ephemeral locators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mod {
    pub ip: String,
    pub port: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}
