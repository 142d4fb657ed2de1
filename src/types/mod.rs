// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

//! The verdict certificate data model: messages, publication envelopes, moderator descriptors,
//! and moderator verdicts, plus the canonical byte strings signed over each.

mod cert;
mod msg;
mod status;

pub use cert::{Mod, ModCert, MsgCert};
pub use msg::{canonical_auto_payload, canonical_manual_payload, Msg};
pub use status::VerdictStatus;
