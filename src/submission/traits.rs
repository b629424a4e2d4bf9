//! Trait abstraction for submission storage to enable mocking in tests

use super::record::Submission;
use anyhow::Result;
use async_trait::async_trait;

/// Somewhere a finished form can be stored
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Store `submission`, returning where it ended up
    async fn submit(&self, submission: &Submission) -> Result<String>;
}
