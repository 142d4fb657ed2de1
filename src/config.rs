// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

//! Runtime configuration for the quorum driver and retry scheduler.
//!
//! Unlike the rest of the ambient stack, this crate does not own a CLI bootstrap (that is an
//! external collaborator's concern), so `Config` is a plain `serde`-deserializable struct rather
//! than a `structopt`/`clap` parser — embedders wire it up from whatever configuration source
//! their binary already uses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the quorum protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub quorum: QuorumConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quorum: QuorumConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Tuning knobs for the fan-out/aggregation driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    #[serde(with = "duration_secs")]
    pub auto_peer_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub manual_peer_timeout: Duration,
    /// Optional cap on concurrently in-flight peer tasks. `None` fans out to every moderator
    /// at once with no internal bounded pool.
    pub max_concurrent_peers: Option<usize>,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            auto_peer_timeout: Duration::from_secs(5),
            manual_peer_timeout: Duration::from_secs(3),
            max_concurrent_peers: None,
        }
    }
}

/// Tuning knobs for the background retry sweeper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    #[serde(with = "duration_secs")]
    pub sweep_interval: Duration,
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
