//! # JSON-RPC Dispatch Core
//!
//! A transport-agnostic request dispatcher: decode request text, route it by
//! method name to a registered handler, let that handler complete now or
//! later, and deliver exactly one response per call.
//!
//! ## Features
//! - Callback completion that fires exactly once, even if a handler
//!   completes twice, panics, or forgets to respond
//! - Method registry with a single fallback handler (`MethodNotFound` by default)
//! - Blocking and direct-write adapters for transports that need one
//!   response per inbound call
//! - tokio-driven asynchronous handlers with the `async` feature

pub mod adapter;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod prelude;
pub mod request;
pub mod response;
pub mod types;

#[cfg(feature = "async")]
pub mod r#async;

// Re-export main types
pub use adapter::{BlockingAdapter, DirectWriteAdapter, OutboundChannel, PendingCall, WriteChannel};
pub use config::AdapterConfig;
pub use dispatcher::RpcDispatcher;
pub use error::{ErrorCode, MalformedRequest, MalformedResponse, RpcError, ToRpcError, TransportError};
pub use handler::{CallHandler, Completion, FnHandler, MethodNotFoundHandler};
pub use request::Request;
pub use response::{Outcome, Response};
pub use types::RequestId;

#[cfg(feature = "async")]
pub use adapter::AsyncAdapter;
#[cfg(feature = "async")]
pub use r#async::{AsyncHandler, Spawned};

/// MIME type of encoded responses
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Name of the transport field that may carry the request text
pub const CONTENT_PARAM: &str = "content";

/// Standard error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const TIMEOUT: i64 = -32001;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
