//! Completion notifications announced by workers on the completion bus.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::result::ResultRecord;
use crate::types::JobId;

/// Default channel (topic) name for completion notifications.
pub const DEFAULT_COMPLETION_CHANNEL: &str = "contract_results";

/// `{id, result}` message published once a job's result is stored.
///
/// `result` carries the serialized [`ResultRecord`]. It is omitted when
/// the transport cannot carry it, in which case receivers must read the
/// result store instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    #[serde(rename = "id")]
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl CompletionEvent {
    pub fn new(job_id: JobId, result: impl Into<String>) -> Self {
        Self {
            job_id,
            result: Some(result.into()),
        }
    }

    /// Build the event announcing `record`.
    pub fn for_record(record: &ResultRecord) -> Result<Self, CoreError> {
        Ok(Self::new(record.job_id, record.to_json()?))
    }

    /// The same announcement without the inline result.
    pub fn without_result(&self) -> Self {
        Self {
            job_id: self.job_id,
            result: None,
        }
    }

    pub fn to_payload(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Internal(e.to_string()))
    }

    /// Decode a raw bus payload.
    pub fn parse(payload: &str) -> Result<Self, CoreError> {
        serde_json::from_str(payload)
            .map_err(|e| CoreError::Validation(format!("Invalid completion event: {e}")))
    }
}
