//! Context protocol wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::sleeper::{SleeperError, UpstreamErrorKind};

/// Protocol version advertised in capabilities.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Provider name advertised in capabilities.
pub const PROVIDER: &str = "sleeper";

/// A parameter of an advertised function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionParameter {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
}

/// A function the agent may invoke.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<FunctionParameter>,
}

/// Capabilities document.
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub functions: Vec<FunctionSpec>,
    pub version: &'static str,
    pub provider: &'static str,
}

/// Request to invoke a function.
#[derive(Debug, Clone, Deserialize)]
pub struct Invocation {
    pub function_name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Success,
    Error,
}

/// Structured description of a failed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    /// `validation`, `timeout`, `http_status`, `parse_failure`, `transport` or `internal`.
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl From<&SleeperError> for ErrorDetail {
    fn from(err: &SleeperError) -> Self {
        match err {
            SleeperError::Validation(v) => ErrorDetail {
                kind: "validation",
                status: None,
                field: Some(v.field),
                snippet: None,
            },
            SleeperError::Upstream(u) => ErrorDetail {
                kind: u.kind.as_str(),
                status: match u.kind {
                    UpstreamErrorKind::HttpStatus(code) => Some(code),
                    _ => None,
                },
                field: None,
                snippet: u.body_snippet.clone(),
            },
            SleeperError::RateLimitInternal(_) => ErrorDetail {
                kind: "internal",
                status: None,
                field: None,
                snippet: None,
            },
        }
    }
}

/// Result of an invocation.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResponse {
    pub status: InvocationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
}

impl InvocationResponse {
    pub fn success(result: Value) -> Self {
        Self {
            status: InvocationStatus::Success,
            result: Some(result),
            error: None,
            error_detail: None,
        }
    }

    pub fn error(err: &SleeperError) -> Self {
        Self {
            status: InvocationStatus::Error,
            result: None,
            error: Some(err.to_string()),
            error_detail: Some(ErrorDetail::from(err)),
        }
    }
}
