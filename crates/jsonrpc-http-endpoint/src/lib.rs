//! # JSON-RPC HTTP Endpoint
//!
//! Serves an [`RpcDispatcher`] over HTTP/1.1. Each inbound request carries
//! the call text in a `content` parameter (query string or form body) or as
//! the raw body, and receives exactly one `application/json` response.
//!
//! Responses are written straight from the handler's completion into a
//! tokio oneshot channel, which the connection task awaits with a deadline.

pub mod handler;
pub mod server;

#[cfg(test)]
mod tests;

// Re-export main types
pub use handler::RpcHttpHandler;
pub use server::{RpcHttpServer, RpcHttpServerBuilder, ServerConfig};

// Re-export foundational types
pub use jsonrpc_dispatch::{CallHandler, RpcDispatcher};

/// Result type for HTTP endpoint operations
pub type Result<T> = std::result::Result<T, HttpRpcError>;

/// Transport-level failures of the endpoint
#[derive(Debug, thiserror::Error)]
pub enum HttpRpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
