use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::MalformedRequest;
use crate::handler::{CallHandler, Completion, MethodNotFoundHandler, panic_message};
use crate::request::Request;
use crate::response::Response;
use crate::types::RequestId;

/// Routes requests to handlers by method name.
///
/// Registration takes `&mut self` and therefore finishes before the
/// dispatcher is shared (typically behind an `Arc`); lookups during dispatch
/// need no locking.
pub struct RpcDispatcher {
    handlers: HashMap<String, Arc<dyn CallHandler>>,
    default_handler: Arc<dyn CallHandler>,
}

impl RpcDispatcher {
    /// Create a dispatcher whose fallback answers `MethodNotFound`
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            default_handler: Arc::new(MethodNotFoundHandler),
        }
    }

    /// Register a handler for a specific method; the last registration wins
    pub fn register<H>(&mut self, method: impl Into<String>, handler: H)
    where
        H: CallHandler + 'static,
    {
        self.register_shared(method, Arc::new(handler));
    }

    /// Register an already shared handler for a specific method
    pub fn register_shared(&mut self, method: impl Into<String>, handler: Arc<dyn CallHandler>) {
        let method = method.into();
        if self.handlers.insert(method.clone(), handler).is_some() {
            warn!(method = %method, "replacing previously registered handler");
        }
    }

    /// Register one handler for multiple methods
    pub fn register_methods<H, I, S>(&mut self, methods: I, handler: H)
    where
        H: CallHandler + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handler: Arc<dyn CallHandler> = Arc::new(handler);
        for method in methods {
            self.register_shared(method, Arc::clone(&handler));
        }
    }

    /// Set the fallback for unregistered methods
    pub fn set_default_handler<H>(&mut self, handler: H)
    where
        H: CallHandler + 'static,
    {
        self.default_handler = Arc::new(handler);
    }

    /// The handler a call to `method` is routed to
    pub fn handler_for(&self, method: &str) -> &Arc<dyn CallHandler> {
        self.handlers.get(method).unwrap_or(&self.default_handler)
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Get all registered methods
    pub fn registered_methods(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// The id the response to `request` will carry: the request's own, or
    /// one minted by the handler it routes to.
    pub fn correlation_id(&self, request: &Request) -> RequestId {
        match request.id() {
            Some(id) => id.clone(),
            None => self.handler_for(request.method()).new_request_id(),
        }
    }

    /// Route `request` and arrange for `on_complete` to receive exactly one response.
    ///
    /// Returns as soon as the selected handler returns; whether the callback
    /// has already run depends on that handler.
    pub fn dispatch<F>(&self, request: Request, on_complete: F)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        let id = self.correlation_id(&request);
        self.dispatch_with(request, Completion::new(id, on_complete));
    }

    /// Route `request` with a caller-built completion.
    ///
    /// The completion's id should come from [`RpcDispatcher::correlation_id`].
    pub fn dispatch_with(&self, request: Request, completion: Completion) {
        let handler = Arc::clone(self.handler_for(request.method()));
        let method = request.method().to_string();
        debug!(method = %method, id = %completion.id(), "dispatching call");

        // A panicking handler drops its completion while unwinding, which
        // delivers an InternalError response.
        if let Err(payload) =
            panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request, completion)))
        {
            error!(
                method = %method,
                "handler panicked during dispatch: {}",
                panic_message(payload.as_ref())
            );
        }
    }

    /// Decode `text` and dispatch it. Undecodable text is answered through
    /// `on_complete` with a `ParseError` or `InvalidRequest` response.
    pub fn dispatch_text<F>(&self, text: &str, on_complete: F)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        match Request::decode(text) {
            Ok(request) => self.dispatch(request, on_complete),
            Err(err) => on_complete(self.reject(&err)),
        }
    }

    /// The error response for request text that could not be decoded
    pub fn reject(&self, err: &MalformedRequest) -> Response {
        warn!("rejecting malformed request: {}", err);
        let id = err
            .request_id()
            .cloned()
            .unwrap_or_else(|| self.default_handler.new_request_id());
        Response::error(id, err.to_rpc_error())
    }
}

impl Default for RpcDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
