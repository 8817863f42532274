//! Response bodies shared by several handlers.

use serde::Serialize;
use serde_json::Value;

use review_core::result::PollOutcome;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "id": ... }` returned when a job is accepted.
#[derive(Debug, Serialize)]
pub struct AcceptedJob {
    pub id: String,
}

/// Status document for a job result, used by both the poll endpoint and
/// the live-subscribe event payloads.
///
/// ```text
/// {"status": "processing", "message": "Result not ready yet."}
/// {"status": "ready", "body": {...}}
/// {"status": "error", "message": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultStatusBody {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

pub const NOT_READY_MESSAGE: &str = "Result not ready yet.";
pub const FORMAT_ERROR_MESSAGE: &str = "Result format error.";

impl ResultStatusBody {
    pub fn from_outcome(outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::Processing => Self {
                status: "processing",
                message: Some(NOT_READY_MESSAGE.into()),
                body: None,
            },
            PollOutcome::Ready(body) => Self {
                status: "ready",
                message: None,
                body: Some(body),
            },
            PollOutcome::Failed(message) => Self {
                status: "error",
                message: Some(message),
                body: None,
            },
            PollOutcome::Malformed(_) => Self {
                status: "error",
                message: Some(FORMAT_ERROR_MESSAGE.into()),
                body: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn processing_has_no_body() {
        let value = serde_json::to_value(ResultStatusBody::from_outcome(PollOutcome::Processing))
            .unwrap();
        assert_eq!(value, json!({"status": "processing", "message": "Result not ready yet."}));
    }

    #[test]
    fn malformed_hides_parse_detail() {
        let body = ResultStatusBody::from_outcome(PollOutcome::Malformed("EOF at 1:3".into()));
        assert_eq!(body.message.as_deref(), Some(FORMAT_ERROR_MESSAGE));
    }
}
