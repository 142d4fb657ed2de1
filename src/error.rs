// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied.

use std::result;

use thiserror::Error;

/// A specialised `Result` type for this crate.
pub type Result<T> = result::Result<T, Error>;

/// Main error type for the moderation quorum protocol.
///
/// Per-peer failures (`Transport`, `Timeout`, `SignatureInvalid`, `IdentityMismatch`) are always
/// handled locally by the quorum driver and never escape a fan-out round; only `NoModerators` and
/// `Crypto` are expected to surface all the way to a caller of the public API.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure contacting a moderator: unreachable, connection reset, malformed
    /// body. Demoted to "unresponsive" for that peer; never fatal to the overall round.
    #[error("transport error: {0}")]
    Transport(String),

    /// The per-peer deadline elapsed before a response arrived.
    #[error("peer timed out")]
    Timeout,

    /// A moderator's signature failed to verify against its claimed payload.
    #[error("invalid signature from moderator")]
    SignatureInvalid,

    /// A response's `public_key` did not match the key the directory advertised for that peer.
    #[error("moderator public key mismatch")]
    IdentityMismatch,

    /// The moderator directory returned zero online moderators.
    #[error("no moderators available")]
    NoModerators,

    /// Key material failed to load, or was malformed beyond recovery. Fatal.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The pending-moderation ledger failed a read or write.
    #[error("pending store error: {0}")]
    Store(String),

    /// A request to the moderator verdict engine was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The moderator's classifier or signing step failed internally.
    #[error("internal moderator error: {0}")]
    Internal(String),
}
