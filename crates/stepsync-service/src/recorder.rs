use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use stepsync_core::store::RecordSink;
use stepsync_core::{AccountId, NewSubmitRecord, Result, SubmitRecord, SubmitStatus};
use stepsync_remote::{truncate_chars, SubmissionResult, MAX_RAW_CHARS};

/// Writes one submit record per execution attempt. Errors go back to the
/// caller, which decides whether they matter.
pub struct ExecutionRecorder {
    sink: Arc<dyn RecordSink>,
    tz: Tz,
}

impl ExecutionRecorder {
    pub fn new(sink: Arc<dyn RecordSink>, tz: Tz) -> Self {
        Self { sink, tz }
    }

    pub fn record(
        &self,
        account_id: AccountId,
        account_name: &str,
        steps: u32,
        result: &SubmissionResult,
    ) -> Result<SubmitRecord> {
        let record = NewSubmitRecord {
            account_id,
            account_name: account_name.to_string(),
            steps,
            status: SubmitStatus::from_success(result.success),
            message: result.message.clone(),
            raw: truncate_chars(&result.raw, MAX_RAW_CHARS),
            created_at: Utc::now().with_timezone(&self.tz),
        };
        self.sink.insert_record(record)
    }
}
