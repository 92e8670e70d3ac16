//! Deferred handlers driven by a tokio runtime.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tokio::runtime::{Handle, TryCurrentError};
use tracing::error;

use crate::error::{RpcError, ToRpcError};
use crate::handler::{CallHandler, Completion, panic_message};
use crate::request::Request;

/// Trait for method logic that completes asynchronously
#[async_trait]
pub trait AsyncHandler: Send + Sync + 'static {
    /// The error type returned by this handler
    type Error: ToRpcError;

    /// Returns domain errors only - [`Spawned`] handles conversion to error responses
    async fn call(&self, request: Request) -> Result<Value, Self::Error>;
}

/// Runs an [`AsyncHandler`] as a task on a tokio runtime.
///
/// `handle` returns immediately; the completion fires from the spawned task.
pub struct Spawned<H> {
    handler: Arc<H>,
    runtime: Handle,
}

impl<H: AsyncHandler> Spawned<H> {
    pub fn new(handler: H, runtime: Handle) -> Self {
        Self {
            handler: Arc::new(handler),
            runtime,
        }
    }

    /// Spawn onto the runtime the caller is running in
    pub fn try_current(handler: H) -> Result<Self, TryCurrentError> {
        Ok(Self::new(handler, Handle::try_current()?))
    }
}

impl<H: AsyncHandler> CallHandler for Spawned<H> {
    fn handle(&self, request: Request, completion: Completion) {
        let handler = Arc::clone(&self.handler);
        self.runtime.spawn(async move {
            let method = request.method().to_string();
            match AssertUnwindSafe(handler.call(request)).catch_unwind().await {
                Ok(Ok(result)) => completion.respond(result),
                Ok(Err(domain_error)) => completion.fail(domain_error.to_rpc_error()),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(method = %method, "async handler panicked: {}", message);
                    completion.fail(RpcError::internal_error(Some(message)))
                }
            };
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::response::Response;
    use crate::types::RequestId;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[derive(thiserror::Error, Debug)]
    enum TestError {
        #[error("Test error: {0}")]
        Failed(String),
    }

    impl ToRpcError for TestError {
        fn to_rpc_error(&self) -> RpcError {
            RpcError::internal_error(Some(self.to_string()))
        }
    }

    struct SleepyHandler;

    #[async_trait]
    impl AsyncHandler for SleepyHandler {
        type Error = TestError;

        async fn call(&self, request: Request) -> Result<Value, Self::Error> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            match request.method() {
                "sleep" => Ok(json!("rested")),
                "explode" => panic!("kaboom"),
                other => Err(TestError::Failed(other.to_string())),
            }
        }
    }

    async fn run(method: &str) -> Response {
        let handler = Spawned::try_current(SleepyHandler).unwrap();
        let (tx, rx) = oneshot::channel();
        let completion = Completion::new(RequestId::Number(1), move |response| {
            let _ = tx.send(response);
        });

        handler.handle(Request::call(1_i64, method), completion);
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_spawned_handler_completes_later() {
        let response = run("sleep").await;
        assert_eq!(response.id(), &RequestId::Number(1));
        assert_eq!(response.result(), Some(&json!("rested")));
    }

    #[tokio::test]
    async fn test_spawned_handler_maps_domain_error() {
        let response = run("other").await;
        let error = response.rpc_error().unwrap();
        assert_eq!(error.kind(), ErrorCode::InternalError);
        assert_eq!(error.message, "Test error: other");
    }

    #[tokio::test]
    async fn test_spawned_handler_catches_panic() {
        let response = run("explode").await;
        let error = response.rpc_error().unwrap();
        assert_eq!(error.kind(), ErrorCode::InternalError);
        assert_eq!(error.message, "kaboom");
    }

    #[test]
    fn test_try_current_without_runtime() {
        assert!(Spawned::try_current(SleepyHandler).is_err());
    }
}
