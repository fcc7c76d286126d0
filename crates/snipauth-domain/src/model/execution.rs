//! Execution-service payloads and test verdicts.

use serde::{Deserialize, Serialize};

/// Code submitted to the execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub name: String,
    pub content: String,
    pub language: String,
    pub language_version: String,
}

/// Output lines and diagnostics produced by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(default, alias = "errors")]
    pub diagnostics: Vec<String>,
}

/// What the execution service answered, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReply {
    /// HTTP-style status code reported by the service.
    pub status: u16,
    pub body: Option<ExecutionOutput>,
}

impl ExecutionReply {
    pub fn ok(body: ExecutionOutput) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Verdict of one test-case run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub test_case_id: String,
    pub success: bool,
    pub actual_output: Vec<String>,
    pub expected_output: Vec<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_success_range() {
        assert!(ExecutionReply::ok(ExecutionOutput::default()).is_success());
        let reply = ExecutionReply {
            status: 500,
            body: None,
        };
        assert!(!reply.is_success());
    }

    #[test]
    fn test_output_accepts_errors_alias() {
        let output: ExecutionOutput =
            serde_json::from_str(r#"{"output": ["Hello"], "errors": ["warn"]}"#).unwrap();
        assert_eq!(output.output, vec!["Hello"]);
        assert_eq!(output.diagnostics, vec!["warn"]);
    }
}
