//! Classification of server responses and projection onto display state.
//!
//! Every request funnels through [`classify`], which sorts a response into a payload, a domain
//! error carried by an OperationOutcome, or a malformed-response failure. Measure invocations
//! then fold that into an [`InvocationResult`] and a [`Display`] for the caller to render.

use crate::client::FhirResponse;
use crate::{ConsoleError, ConsoleResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pull the human-readable text out of the first issue of an OperationOutcome body.
///
/// Returns `None` when the body is not JSON or has no `issue` array. An issue without
/// `details.text` falls back to `diagnostics`, then to an empty string.
pub fn first_issue_detail(body: &Value) -> Option<String> {
    let issues = body.get("issue")?.as_array()?;
    let detail = issues
        .first()
        .and_then(|issue| {
            issue
                .pointer("/details/text")
                .and_then(Value::as_str)
                .or_else(|| issue.get("diagnostics").and_then(Value::as_str))
        })
        .unwrap_or_default();
    Some(detail.to_string())
}

/// Sort a response by status and body.
///
/// A status in `accepted` yields the parsed body, or `None` for an empty body. Any other
/// status yields [`ConsoleError::Domain`] when the body is an OperationOutcome, otherwise
/// [`ConsoleError::MalformedResponse`].
pub fn classify(response: &FhirResponse, accepted: &[u16]) -> ConsoleResult<Option<Value>> {
    if accepted.contains(&response.status) {
        if response.body.trim().is_empty() {
            return Ok(None);
        }
        return serde_json::from_str(&response.body)
            .map(Some)
            .map_err(|e| ConsoleError::MalformedResponse(format!("body is not valid JSON: {e}")));
    }

    let detail = serde_json::from_str::<Value>(&response.body)
        .ok()
        .as_ref()
        .and_then(first_issue_detail);

    match detail {
        Some(detail) => Err(ConsoleError::Domain {
            status: response.status,
            status_text: response.status_text.clone(),
            detail,
        }),
        None => Err(ConsoleError::MalformedResponse(format!(
            "{} {} without an OperationOutcome body",
            response.status, response.status_text
        ))),
    }
}

/// Lifecycle of a single measure invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum InvocationResult {
    #[default]
    Idle,
    Loading,
    Success {
        payload: Value,
    },
    #[serde(rename_all = "camelCase")]
    DomainError {
        status: u16,
        status_text: String,
        detail: String,
    },
    TransportError {
        message: String,
    },
}

impl InvocationResult {
    pub fn is_loading(&self) -> bool {
        matches!(self, InvocationResult::Loading)
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            InvocationResult::Success { payload } => Some(payload),
            _ => None,
        }
    }

    /// Project onto what a caller shows; `operation` names the action in the success text.
    pub fn display(&self, operation: &str) -> Display {
        let notification = match self {
            InvocationResult::Idle | InvocationResult::Loading => None,
            InvocationResult::Success { .. } => Some(Notification {
                kind: NotificationKind::Positive,
                title: "Success".into(),
                message: format!("{operation} completed"),
            }),
            InvocationResult::DomainError {
                status,
                status_text,
                detail,
            } => Some(Notification {
                kind: NotificationKind::Negative,
                title: format!("{status} {status_text}"),
                message: detail.clone(),
            }),
            InvocationResult::TransportError { message } => Some(Notification {
                kind: NotificationKind::Negative,
                title: "Connection problem".into(),
                message: format!("Problem connecting to server: {message}"),
            }),
        };

        Display {
            notification,
            result: self.payload().cloned(),
        }
    }
}

impl From<ConsoleResult<Value>> for InvocationResult {
    fn from(result: ConsoleResult<Value>) -> Self {
        match result {
            Ok(payload) => InvocationResult::Success { payload },
            Err(ConsoleError::Domain {
                status,
                status_text,
                detail,
            }) => InvocationResult::DomainError {
                status,
                status_text,
                detail,
            },
            Err(err) => InvocationResult::TransportError {
                message: err.to_string(),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Positive,
    Negative,
}

/// A message for the user about the last invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

/// Everything a caller renders after an invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Display {
    pub notification: Option<Notification>,
    pub result: Option<Value>,
}
