use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::types::RequestId;

/// Closed taxonomy of error codes carried in an error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// The call did not complete before the adapter's deadline
    Timeout,
    ServerError(i64), // -32099 to -32000
}

impl ErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => crate::error_codes::PARSE_ERROR,
            ErrorCode::InvalidRequest => crate::error_codes::INVALID_REQUEST,
            ErrorCode::MethodNotFound => crate::error_codes::METHOD_NOT_FOUND,
            ErrorCode::InvalidParams => crate::error_codes::INVALID_PARAMS,
            ErrorCode::InternalError => crate::error_codes::INTERNAL_ERROR,
            ErrorCode::Timeout => crate::error_codes::TIMEOUT,
            ErrorCode::ServerError(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::Timeout => "Request timed out",
            ErrorCode::ServerError(_) => "Server error",
        }
    }

    /// Map a numeric code back onto the taxonomy.
    ///
    /// Codes outside the known set are kept verbatim as `ServerError`.
    pub fn from_code(code: i64) -> Self {
        use crate::error_codes::*;
        match code {
            PARSE_ERROR => ErrorCode::ParseError,
            INVALID_REQUEST => ErrorCode::InvalidRequest,
            METHOD_NOT_FOUND => ErrorCode::MethodNotFound,
            INVALID_PARAMS => ErrorCode::InvalidParams,
            INTERNAL_ERROR => ErrorCode::InternalError,
            TIMEOUT => ErrorCode::Timeout,
            other => ErrorCode::ServerError(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Error object owned by an error-carrying `Response`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, None, None)
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(ErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(ErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found() -> Self {
        Self::new(ErrorCode::MethodNotFound, None, None)
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(ErrorCode::InvalidParams, Some(message.to_string()), None)
    }

    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(ErrorCode::InternalError, message, None)
    }

    pub fn timeout() -> Self {
        Self::new(ErrorCode::Timeout, None, None)
    }

    pub fn server_error(code: i64, message: &str, data: Option<Value>) -> Self {
        assert!(
            (crate::error_codes::SERVER_ERROR_START..=crate::error_codes::SERVER_ERROR_END)
                .contains(&code),
            "Server error code must be in range -32099 to -32000"
        );
        Self::new(ErrorCode::ServerError(code), Some(message.to_string()), data)
    }

    /// Replace the message, keeping code and data.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach structured data.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn kind(&self) -> ErrorCode {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Trait for domain errors that can be reported as an error response
pub trait ToRpcError: std::error::Error + Send + Sync + 'static {
    fn to_rpc_error(&self) -> RpcError;
}

impl ToRpcError for RpcError {
    fn to_rpc_error(&self) -> RpcError {
        self.clone()
    }
}

/// Why request text could not be turned into a `Request`
#[derive(Debug, Error)]
pub enum MalformedRequest {
    #[error("request is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("request is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("request must be a JSON object")]
    NotAnObject,

    #[error("request has no method")]
    MissingMethod { id: Option<RequestId> },

    #[error("request method must be a string")]
    InvalidMethod { id: Option<RequestId> },

    #[error("request id must be a string or an integer")]
    InvalidId,
}

impl MalformedRequest {
    /// The id of the offending request, when it could be recovered.
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            MalformedRequest::MissingMethod { id } | MalformedRequest::InvalidMethod { id } => {
                id.as_ref()
            }
            _ => None,
        }
    }

    /// The protocol-level error to report back to the caller.
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            MalformedRequest::Encoding(_) | MalformedRequest::Syntax(_) => {
                RpcError::parse_error(Some(Value::String(self.to_string())))
            }
            other => RpcError::invalid_request(Some(Value::String(other.to_string()))),
        }
    }
}

/// Why response text could not be turned into a `Response`
#[derive(Debug, Error)]
pub enum MalformedResponse {
    #[error("response is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("response must be a JSON object")]
    NotAnObject,

    #[error("response id must be a string or an integer")]
    InvalidId,

    #[error("response must carry exactly one of result or error")]
    AmbiguousOutcome,

    #[error("response error object is invalid: {0}")]
    InvalidError(serde_json::Error),
}

/// Failures of the surrounding byte channels, reported outside the RPC envelope
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Outbound channel closed before the response was written")]
    ChannelClosed,
}
