//! Result records and the outcomes a client observes when asking for them.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Ready,
    Error,
}

/// The persisted outcome of a job.
///
/// Written once by the worker under key = `job_id`. Re-writing the same
/// record is harmless; the store is last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub job_id: JobId,
    pub status: ResultStatus,
    pub body: serde_json::Value,
}

impl ResultRecord {
    pub fn ready(job_id: JobId, body: serde_json::Value) -> Self {
        Self {
            job_id,
            status: ResultStatus::Ready,
            body,
        }
    }

    /// A record describing a job the worker could not complete.
    pub fn failed(job_id: JobId, message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: ResultStatus::Error,
            body: serde_json::json!({ "message": message.into() }),
        }
    }

    /// Serialize to the stored text form.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Internal(e.to_string()))
    }

    /// Parse a stored value, checking it belongs to `job_id`.
    pub fn parse(job_id: JobId, raw: &str) -> Result<Self, CoreError> {
        let record: Self = serde_json::from_str(raw).map_err(|e| CoreError::ResultFormat {
            job_id: job_id.to_string(),
            reason: e.to_string(),
        })?;

        if record.job_id != job_id {
            return Err(CoreError::ResultFormat {
                job_id: job_id.to_string(),
                reason: format!("record belongs to job {}", record.job_id),
            });
        }

        Ok(record)
    }

    /// Human-readable failure detail for an `Error` record.
    pub fn error_message(&self) -> String {
        match self.body.get("message").and_then(|m| m.as_str()) {
            Some(msg) => msg.to_string(),
            None => self.body.to_string(),
        }
    }
}

/// What a poll (or a live delivery) resolves to.
///
/// An absent record is reported as `Processing`; after TTL expiry this is
/// indistinguishable from a job that is still running.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// No record yet.
    Processing,
    /// The worker finished; `body` is the review result.
    Ready(serde_json::Value),
    /// The worker recorded a processing error.
    Failed(String),
    /// A record exists but could not be parsed.
    Malformed(String),
}

impl PollOutcome {
    /// Classify the raw value read from the result store.
    pub fn from_stored(job_id: JobId, raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Processing;
        };

        match ResultRecord::parse(job_id, raw) {
            Ok(record) => match record.status {
                ResultStatus::Ready => Self::Ready(record.body),
                ResultStatus::Error => Self::Failed(record.error_message()),
            },
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Stored result is malformed");
                Self::Malformed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn absent_record_is_processing() {
        assert_eq!(PollOutcome::from_stored(JobId::new(), None), PollOutcome::Processing);
    }

    #[test]
    fn ready_record_yields_body() {
        let id = JobId::new();
        let raw = ResultRecord::ready(id, serde_json::json!("X")).to_json().unwrap();

        assert_eq!(
            PollOutcome::from_stored(id, Some(&raw)),
            PollOutcome::Ready(serde_json::json!("X"))
        );
    }

    #[test]
    fn error_record_yields_message() {
        let id = JobId::new();
        let raw = ResultRecord::failed(id, "document contains no text")
            .to_json()
            .unwrap();

        assert_eq!(
            PollOutcome::from_stored(id, Some(&raw)),
            PollOutcome::Failed("document contains no text".into())
        );
    }

    #[test]
    fn unparseable_record_is_malformed_not_dropped() {
        let id = JobId::new();
        assert_matches!(
            PollOutcome::from_stored(id, Some("{not json")),
            PollOutcome::Malformed(_)
        );
    }

    #[test]
    fn record_for_another_job_is_rejected() {
        let raw = ResultRecord::ready(JobId::new(), serde_json::json!({}))
            .to_json()
            .unwrap();

        assert_matches!(
            ResultRecord::parse(JobId::new(), &raw),
            Err(CoreError::ResultFormat { .. })
        );
    }

    #[test]
    fn status_serializes_lowercase() {
        let record = ResultRecord::ready(JobId::new(), serde_json::json!(1));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "ready");
    }
}
