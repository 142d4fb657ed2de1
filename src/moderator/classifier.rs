// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::VerdictStatus;

/// The content-moderation classifier. Out of scope for this crate beyond the trait boundary.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `content`, returning `Accept` or `Reject`. Returning `Acknowledged` is a
    /// contract violation the engine rejects with `Error::Internal`, since a classifier either
    /// decides or fails — deferral is a policy decision made by `DeferralPolicy`, not the
    /// classifier.
    async fn classify(&self, content: &str) -> Result<VerdictStatus>;
}

/// A deterministic test classifier: accepts unless `content` contains any of a configured set
/// of banned substrings.
pub struct RuleClassifier {
    banned_substrings: Vec<String>,
}

impl RuleClassifier {
    pub fn new(banned_substrings: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            banned_substrings: banned_substrings.into_iter().map(Into::into).collect(),
        }
    }

    pub fn always_accept() -> Self {
        Self::new(Vec::<String>::new())
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(&self, content: &str) -> Result<VerdictStatus> {
        let rejected = self
            .banned_substrings
            .iter()
            .any(|banned| content.contains(banned.as_str()));
        Ok(if rejected {
            VerdictStatus::Reject
        } else {
            VerdictStatus::Accept
        })
    }
}
