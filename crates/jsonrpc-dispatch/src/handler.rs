//! Call handlers and the single-shot completion they report through.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{error, warn};

use crate::error::RpcError;
use crate::request::Request;
use crate::response::Response;
use crate::types::RequestId;

type Sink = Box<dyn FnOnce(Response) + Send>;

struct CompletionState {
    id: RequestId,
    sink: Mutex<Option<Sink>>,
}

impl Drop for CompletionState {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.get_mut().take() {
            warn!(id = %self.id, "completion dropped without a response");
            sink(Response::error(
                self.id.clone(),
                RpcError::internal_error(Some(
                    "Handler finished without producing a response".to_string(),
                )),
            ));
        }
    }
}

/// Single-shot channel through which a handler reports its response.
///
/// Clones share one slot: the first delivered response wins and every later
/// attempt is logged and dropped. When the last clone goes away without a
/// response (the handler forgot, or panicked) an `InternalError` response is
/// delivered instead, so whoever waits on the call always hears back.
#[derive(Clone)]
pub struct Completion {
    state: Arc<CompletionState>,
}

impl Completion {
    /// Wrap `on_complete` for a call correlated by `id`.
    pub fn new<F>(id: RequestId, on_complete: F) -> Self
    where
        F: FnOnce(Response) + Send + 'static,
    {
        Self {
            state: Arc::new(CompletionState {
                id,
                sink: Mutex::new(Some(Box::new(on_complete))),
            }),
        }
    }

    /// The id every response through this completion carries
    pub fn id(&self) -> &RequestId {
        &self.state.id
    }

    pub fn is_completed(&self) -> bool {
        self.state.sink.lock().is_none()
    }

    /// Deliver `response`. Returns `false` if a response was already delivered.
    ///
    /// A response carrying a different id is re-correlated to [`Completion::id`].
    pub fn complete(&self, response: Response) -> bool {
        let Some(sink) = self.state.sink.lock().take() else {
            warn!(id = %self.state.id, "duplicate completion dropped");
            return false;
        };

        let response = if response.id() == &self.state.id {
            response
        } else {
            warn!(
                expected = %self.state.id,
                actual = %response.id(),
                "response id does not match its call, re-correlating"
            );
            response.with_id(self.state.id.clone())
        };

        sink(response);
        true
    }

    /// Complete with a successful result
    pub fn respond(&self, result: Value) -> bool {
        self.complete(Response::success(self.state.id.clone(), result))
    }

    /// Complete with an error
    pub fn fail(&self, error: RpcError) -> bool {
        self.complete(Response::error(self.state.id.clone(), error))
    }

    pub fn finish(&self, outcome: Result<Value, RpcError>) -> bool {
        match outcome {
            Ok(result) => self.respond(result),
            Err(error) => self.fail(error),
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("id", &self.state.id)
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// How to answer one method.
///
/// `handle` is invoked once per request and must eventually call
/// [`Completion::complete`] exactly once, either before returning or later
/// from any other thread or task.
pub trait CallHandler: Send + Sync {
    fn handle(&self, request: Request, completion: Completion);

    /// Identifier for a request that arrived without one
    fn new_request_id(&self) -> RequestId {
        RequestId::generate()
    }
}

/// A handler backed by a synchronous closure, completed on the calling thread.
///
/// Panics raised by the closure are reported as `InternalError`.
pub struct FnHandler<F>
where
    F: Fn(&Request) -> Result<Value, RpcError> + Send + Sync,
{
    handler_fn: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Request) -> Result<Value, RpcError> + Send + Sync,
{
    pub fn new(handler_fn: F) -> Self {
        Self { handler_fn }
    }
}

impl<F> CallHandler for FnHandler<F>
where
    F: Fn(&Request) -> Result<Value, RpcError> + Send + Sync,
{
    fn handle(&self, request: Request, completion: Completion) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.handler_fn)(&request)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!(method = request.method(), "handler panicked: {}", message);
                Err(RpcError::internal_error(Some(message)))
            });
        completion.finish(outcome);
    }
}

/// Default handler: answers every call with `MethodNotFound`
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodNotFoundHandler;

impl CallHandler for MethodNotFoundHandler {
    fn handle(&self, request: Request, completion: Completion) {
        warn!(method = request.method(), id = %completion.id(), "no handler registered");
        completion.fail(RpcError::method_not_found());
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;
    use std::sync::mpsc;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn collecting(id: RequestId) -> (Completion, mpsc::Receiver<Response>) {
        let (tx, rx) = mpsc::channel();
        let completion = Completion::new(id, move |response| {
            tx.send(response).unwrap();
        });
        (completion, rx)
    }

    #[test]
    fn test_first_completion_wins() {
        let (completion, rx) = collecting(RequestId::Number(1));

        assert!(completion.respond(json!("first")));
        assert!(!completion.respond(json!("second")));
        assert!(completion.is_completed());
        drop(completion);

        let responses: Vec<_> = rx.try_iter().collect();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].result(), Some(&json!("first")));
    }

    #[test]
    fn test_clones_share_one_slot() {
        let (completion, rx) = collecting(RequestId::Number(2));
        let other = completion.clone();

        let worker = std::thread::spawn(move || other.respond(json!("from thread")));
        let delivered_by_thread = worker.join().unwrap();
        let delivered_here = completion.respond(json!("from caller"));
        drop(completion);

        assert!(delivered_by_thread ^ delivered_here);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_dropped_completion_reports_internal_error() {
        let (completion, rx) = collecting(RequestId::from("lost"));
        drop(completion);

        let response = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(response.id(), &RequestId::from("lost"));
        assert_eq!(
            response.rpc_error().unwrap().kind(),
            ErrorCode::InternalError
        );
    }

    #[test]
    fn test_mismatched_id_is_recorrelated() {
        let (completion, rx) = collecting(RequestId::Number(10));
        completion.complete(Response::success(RequestId::Number(99), json!(true)));

        let response = rx.recv().unwrap();
        assert_eq!(response.id(), &RequestId::Number(10));
    }

    #[test]
    fn test_fn_handler_success_and_error() {
        let handler = FnHandler::new(|request: &Request| match request.method() {
            "ok" => Ok(json!({"ok": true})),
            _ => Err(RpcError::invalid_params("nope")),
        });

        let (completion, rx) = collecting(RequestId::Number(1));
        handler.handle(Request::call(1_i64, "ok"), completion);
        assert_eq!(rx.recv().unwrap().result(), Some(&json!({"ok": true})));

        let (completion, rx) = collecting(RequestId::Number(2));
        handler.handle(Request::call(2_i64, "bad"), completion);
        let response = rx.recv().unwrap();
        assert_eq!(
            response.rpc_error().unwrap().kind(),
            ErrorCode::InvalidParams
        );
    }

    #[test]
    fn test_fn_handler_converts_panic() {
        let handler = FnHandler::new(|_: &Request| -> Result<Value, RpcError> {
            panic!("division by zero")
        });

        let (completion, rx) = collecting(RequestId::Number(3));
        handler.handle(Request::call(3_i64, "divide"), completion);

        let response = rx.recv().unwrap();
        let error = response.rpc_error().unwrap();
        assert_eq!(error.kind(), ErrorCode::InternalError);
        assert_eq!(error.message, "division by zero");
    }

    #[test]
    #[traced_test]
    fn test_method_not_found_handler() {
        let (completion, rx) = collecting(RequestId::Number(4));
        MethodNotFoundHandler.handle(Request::call(4_i64, "missing"), completion);

        let response = rx.recv().unwrap();
        assert_eq!(
            response.encode(),
            r#"{"id":4,"error":{"code":-32601,"message":"Method not found"}}"#
        );
        assert!(logs_contain("WARN"));
        assert!(logs_contain("no handler registered"));
    }
}
