//! Document processing step run by the worker for each job.

use async_trait::async_trait;
use review_core::job::JobPayload;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The document cannot be reviewed as submitted.
    #[error("{0}")]
    Rejected(String),

    #[error("Processing failed: {0}")]
    Failed(String),
}

/// Turns a submitted document into a review result body.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn process(&self, payload: &JobPayload) -> Result<serde_json::Value, ProcessError>;
}

/// Summarizes the segmented clauses of a document.
///
/// Stands in for a full review pipeline: reports the header and each
/// clause with its word count.
pub struct ClauseSummaryProcessor;

#[async_trait]
impl DocumentProcessor for ClauseSummaryProcessor {
    async fn process(&self, payload: &JobPayload) -> Result<serde_json::Value, ProcessError> {
        if payload.extracted_text.trim().is_empty() && payload.clauses.is_empty() {
            return Err(ProcessError::Rejected("Document contains no text".into()));
        }

        let clauses: Vec<_> = payload
            .clauses
            .iter()
            .map(|c| {
                serde_json::json!({
                    "index": c.index,
                    "text": c.text,
                    "word_count": c.text.split_whitespace().count(),
                })
            })
            .collect();

        Ok(serde_json::json!({
            "file_name": payload.file_name,
            "header": payload.header,
            "clause_count": clauses.len(),
            "clauses": clauses,
        }))
    }
}
