// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use serde::{Deserialize, Serialize};

/// A publisher's message payload, as evaluated by moderators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Msg {
    pub content: String,
    pub ts: i64,
}

impl Msg {
    pub fn new(content: impl Into<String>, ts: i64) -> Self {
        Self {
            content: content.into(),
            ts,
        }
    }

    /// `content ∥ decimal(ts)`, the canonical byte string a publisher signs over.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        format!("{}{}", self.content, self.ts).into_bytes()
    }
}

/// Build the auto-mode signed payload: `content ∥ decimal(ts) ∥ status`.
pub fn canonical_auto_payload(msg: &Msg, status: super::VerdictStatus) -> Vec<u8> {
    format!("{}{}{}", msg.content, msg.ts, status.canonical()).into_bytes()
}

/// Build the manual-mode signed payload: `msg_cert.sign ∥ status`.
pub fn canonical_manual_payload(msg_cert_sign: &str, status: super::VerdictStatus) -> Vec<u8> {
    format!("{}{}", msg_cert_sign, status.canonical()).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VerdictStatus;

    #[test]
    fn canonical_bytes_has_no_separator() {
        let msg = Msg::new("hello", 1690000000000);
        assert_eq!(msg.canonical_bytes(), b"hello1690000000000");
    }

    #[test]
    fn auto_payload_appends_status() {
        let msg = Msg::new("hello", 42);
        assert_eq!(
            canonical_auto_payload(&msg, VerdictStatus::Accept),
            b"hello421"
        );
    }

    #[test]
    fn manual_payload_uses_msg_cert_sign() {
        assert_eq!(
            canonical_manual_payload("deadbeef", VerdictStatus::Reject),
            b"deadbeef0"
        );
    }
}
