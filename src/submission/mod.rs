//! Handing finished forms over to storage

mod json_file;
mod record;
mod traits;

pub use json_file::JsonFileSink;
pub use record::{Submission, SubmissionError};
pub use traits::SubmissionSink;

#[cfg(test)]
pub use traits::MockSubmissionSink;

use crate::presets::FormKind;
use crate::state::FormSession;
use anyhow::Result;
use chrono::Utc;

/// Build a submission from `session` and send it to `sink`.
/// Returns the submission and the location the sink reported.
pub async fn submit_session(
    sink: &dyn SubmissionSink,
    form: FormKind,
    session: &FormSession,
) -> Result<(Submission, String)> {
    let submission = Submission::from_session(form, session, Utc::now())?;
    let location = sink.submit(&submission).await?;
    tracing::info!(
        "{} submission {} stored at {location}",
        form,
        submission.id
    );
    Ok((submission, location))
}
