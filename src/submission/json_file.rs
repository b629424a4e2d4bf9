//! Stores each submission as a pretty-printed JSON file

use super::record::Submission;
use super::traits::SubmissionSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes `<id>.json` into one directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, submission: &Submission) -> PathBuf {
        self.dir.join(format!("{}.json", submission.id))
    }
}

#[async_trait]
impl SubmissionSink for JsonFileSink {
    async fn submit(&self, submission: &Submission) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(submission);
        let content = serde_json::to_string_pretty(submission)?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("wrote {}", path.display());
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::FormKind;
    use crate::state::{FieldValue, SessionContext};
    use chrono::Utc;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("checkin-form-test-{}", Uuid::new_v4()))
    }

    fn submission() -> Submission {
        let mut session = FormKind::Role
            .open(SessionContext::default(), 0, Utc::now())
            .unwrap();
        session.patch("name", FieldValue::text("viewer")).unwrap();
        Submission::from_session(FormKind::Role, &session, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_writes_one_file_per_submission() {
        let dir = scratch_dir();
        let sink = JsonFileSink::new(&dir);
        let submission = submission();

        let location = sink.submit(&submission).await.unwrap();
        let path = dir.join(format!("{}.json", submission.id));
        assert_eq!(location, path.display().to_string());

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Submission = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, submission);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn test_submit_outside_a_runtime() {
        let dir = scratch_dir();
        let sink = JsonFileSink::new(&dir);
        let location = tokio_test::assert_ok!(tokio_test::block_on(sink.submit(&submission())));
        assert!(location.ends_with(".json"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_an_error() {
        let file = scratch_dir();
        tokio::fs::write(&file, "not a dir").await.unwrap();
        let sink = JsonFileSink::new(file.join("nested"));

        assert!(sink.submit(&submission()).await.is_err());

        tokio::fs::remove_file(&file).await.unwrap();
    }
}
