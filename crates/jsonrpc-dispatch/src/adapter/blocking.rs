use std::io::{Read, Write};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::adapter::{PendingCall, read_inbound};
use crate::config::AdapterConfig;
use crate::dispatcher::RpcDispatcher;
use crate::error::{MalformedRequest, RpcError, TransportError};
use crate::handler::Completion;
use crate::request::Request;
use crate::response::Response;

/// Parks the calling thread until the dispatched call completes.
///
/// The completion callback fills a [`PendingCall`]; the caller re-checks it
/// every `poll_interval` and gives up with a `Timeout` response once the
/// configured deadline passes. A response arriving after that is discarded.
#[derive(Clone)]
pub struct BlockingAdapter {
    dispatcher: Arc<RpcDispatcher>,
    config: AdapterConfig,
}

impl BlockingAdapter {
    pub fn new(dispatcher: Arc<RpcDispatcher>) -> Self {
        Self::with_config(dispatcher, AdapterConfig::default())
    }

    pub fn with_config(dispatcher: Arc<RpcDispatcher>, config: AdapterConfig) -> Self {
        Self { dispatcher, config }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Dispatch `request` and wait for its response
    pub fn call(&self, request: Request) -> Response {
        let id = self.dispatcher.correlation_id(&request);
        let pending = Arc::new(PendingCall::new());

        let slot = Arc::clone(&pending);
        self.dispatcher.dispatch_with(
            request,
            Completion::new(id.clone(), move |response| {
                slot.fill(response);
            }),
        );

        match pending.wait(self.config.poll_interval, self.config.deadline) {
            Some(response) => response,
            None => {
                warn!(id = %id, deadline = ?self.config.deadline, "call did not complete in time");
                Response::error(id, RpcError::timeout())
            }
        }
    }

    /// Decode, dispatch, wait and encode
    pub fn call_text(&self, text: &str) -> String {
        self.respond_to(Request::decode(text)).encode()
    }

    /// Serve one inbound call over byte channels.
    ///
    /// The request text is `content` when given, otherwise everything read
    /// from `input`. Exactly one payload is written to `output`.
    pub fn serve<R, W>(
        &self,
        content: Option<&str>,
        input: R,
        mut output: W,
    ) -> Result<(), TransportError>
    where
        R: Read,
        W: Write,
    {
        let bytes = read_inbound(content, input).inspect_err(|err| {
            error!("failed to read request: {}", err);
        })?;

        let payload = self.respond_to(Request::decode_bytes(&bytes)).encode();
        debug!(bytes = payload.len(), "writing response");

        output
            .write_all(payload.as_bytes())
            .and_then(|()| output.flush())
            .inspect_err(|err| error!("failed to write response: {}", err))?;
        Ok(())
    }

    fn respond_to(&self, decoded: Result<Request, MalformedRequest>) -> Response {
        match decoded {
            Ok(request) => self.call(request),
            Err(err) => self.dispatcher.reject(&err),
        }
    }
}
