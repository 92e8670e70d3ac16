use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{error, warn};

use crate::config::AdapterConfig;
use crate::dispatcher::RpcDispatcher;
use crate::error::RpcError;
use crate::handler::Completion;
use crate::request::Request;
use crate::response::Response;

/// Awaits the dispatched call on a tokio oneshot instead of parking a thread.
///
/// Only [`AdapterConfig::deadline`] applies; there is nothing to poll.
#[derive(Clone)]
pub struct AsyncAdapter {
    dispatcher: Arc<RpcDispatcher>,
    config: AdapterConfig,
}

impl AsyncAdapter {
    pub fn new(dispatcher: Arc<RpcDispatcher>) -> Self {
        Self::with_config(dispatcher, AdapterConfig::default())
    }

    pub fn with_config(dispatcher: Arc<RpcDispatcher>, config: AdapterConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Dispatch `request` and await its response
    pub async fn call(&self, request: Request) -> Response {
        let id = self.dispatcher.correlation_id(&request);
        let (tx, rx) = oneshot::channel();

        self.dispatcher.dispatch_with(
            request,
            Completion::new(id.clone(), move |response| {
                // Receiver gone means the caller stopped waiting
                let _ = tx.send(response);
            }),
        );

        let received = match self.config.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, rx).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(id = %id, ?deadline, "call did not complete in time");
                    return Response::error(id, RpcError::timeout());
                }
            },
            None => rx.await,
        };

        received.unwrap_or_else(|_| {
            error!(id = %id, "completion dropped without a response");
            Response::error(id, RpcError::internal_error(None))
        })
    }

    /// Decode, dispatch, await and encode
    pub async fn call_text(&self, text: &str) -> String {
        match Request::decode(text) {
            Ok(request) => self.call(request).await.encode(),
            Err(err) => self.dispatcher.reject(&err).encode(),
        }
    }
}
