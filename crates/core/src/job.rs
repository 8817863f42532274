//! Submitted documents and the job message placed on the work queue.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::JobId;

/// A single segmented clause of the submitted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub index: u32,
    pub text: String,
}

/// The processed-document payload a client submits for review.
///
/// Text extraction and clause segmentation happen upstream; this is
/// their output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct JobPayload {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    pub extracted_text: String,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
}

/// A unit of submitted work. Immutable once dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub payload: JobPayload,
}

impl Job {
    /// Wrap a payload with a freshly minted id.
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: JobId::new(),
            payload,
        }
    }
}

/// Wire form of a [`Job`] as consumed by workers.
///
/// Field names are camelCase (`fileName`, `extractedText`) to stay
/// compatible with existing worker deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    pub id: JobId,
    pub file_name: String,
    pub extracted_text: String,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clauses: Vec<Clause>,
}

impl From<&Job> for JobMessage {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            file_name: job.payload.file_name.clone(),
            extracted_text: job.payload.extracted_text.clone(),
            header: job.payload.header.clone(),
            clauses: job.payload.clauses.clone(),
        }
    }
}

impl From<JobMessage> for Job {
    fn from(msg: JobMessage) -> Self {
        Self {
            id: msg.id,
            payload: JobPayload {
                file_name: msg.file_name,
                extracted_text: msg.extracted_text,
                header: msg.header,
                clauses: msg.clauses,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> JobPayload {
        JobPayload {
            file_name: "lease.pdf".into(),
            extracted_text: "This lease is made between...".into(),
            header: Some("LEASE AGREEMENT".into()),
            clauses: vec![Clause {
                index: 1,
                text: "The tenant shall pay rent monthly.".into(),
            }],
        }
    }

    #[test]
    fn message_uses_worker_field_names() {
        let job = Job::new(payload());
        let json = serde_json::to_value(JobMessage::from(&job)).unwrap();

        assert_eq!(json["id"], job.id.to_string());
        assert_eq!(json["fileName"], "lease.pdf");
        assert_eq!(json["extractedText"], "This lease is made between...");
        assert_eq!(json["header"], "LEASE AGREEMENT");
        assert_eq!(json["clauses"][0]["index"], 1);
    }

    #[test]
    fn message_without_clauses_still_decodes() {
        let id = JobId::new();
        let raw = serde_json::json!({
            "id": id.to_string(),
            "fileName": "nda.docx",
            "extractedText": "Confidential",
            "header": null,
        });

        let job: Job = serde_json::from_value::<JobMessage>(raw).unwrap().into();
        assert_eq!(job.id, id);
        assert!(job.payload.clauses.is_empty());
        assert!(job.payload.header.is_none());
    }

    #[test]
    fn empty_file_name_fails_validation() {
        let mut p = payload();
        p.file_name.clear();
        assert!(p.validate().is_err());
        assert!(payload().validate().is_ok());
    }
}
