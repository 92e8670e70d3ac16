//! # Dispatch Prelude
//!
//! Convenient re-exports of the most commonly used types.
//!
//! ```rust
//! use jsonrpc_dispatch::prelude::*;
//! ```

// Message model
pub use crate::error::{ErrorCode, RpcError, ToRpcError};
pub use crate::request::Request;
pub use crate::response::{Outcome, Response};
pub use crate::types::RequestId;

// Dispatch
pub use crate::dispatcher::RpcDispatcher;
pub use crate::handler::{CallHandler, Completion, FnHandler};

// Adapters
pub use crate::adapter::{BlockingAdapter, DirectWriteAdapter, OutboundChannel};
pub use crate::config::AdapterConfig;

#[cfg(feature = "async")]
pub use crate::adapter::AsyncAdapter;
#[cfg(feature = "async")]
pub use crate::r#async::{AsyncHandler, Spawned};

// Standard error codes
pub use crate::error_codes::*;
