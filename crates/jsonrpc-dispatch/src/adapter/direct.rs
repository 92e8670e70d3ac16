use std::io::{Read, Write};
use std::sync::{Arc, mpsc};

use tracing::{debug, error};

use crate::adapter::read_inbound;
use crate::dispatcher::RpcDispatcher;
use crate::error::{MalformedRequest, TransportError};
use crate::handler::Completion;
use crate::request::Request;
use crate::response::Response;
use crate::types::RequestId;

/// Destination for exactly one serialized response.
///
/// `send_response` consumes the channel, so a channel is written at most
/// once. The `Send + 'static` bound is what makes writing from the
/// handler's completion context sound: the channel may be moved to and
/// finalized on any thread.
pub trait OutboundChannel: Send + 'static {
    fn send_response(self, payload: String) -> Result<(), TransportError>;
}

impl OutboundChannel for mpsc::Sender<String> {
    fn send_response(self, payload: String) -> Result<(), TransportError> {
        self.send(payload).map_err(|_| TransportError::ChannelClosed)
    }
}

impl OutboundChannel for futures::channel::oneshot::Sender<String> {
    fn send_response(self, payload: String) -> Result<(), TransportError> {
        self.send(payload).map_err(|_| TransportError::ChannelClosed)
    }
}

#[cfg(feature = "async")]
impl OutboundChannel for tokio::sync::oneshot::Sender<String> {
    fn send_response(self, payload: String) -> Result<(), TransportError> {
        self.send(payload).map_err(|_| TransportError::ChannelClosed)
    }
}

/// Any byte sink, written in full and flushed
pub struct WriteChannel<W>(pub W);

impl<W> OutboundChannel for WriteChannel<W>
where
    W: Write + Send + 'static,
{
    fn send_response(mut self, payload: String) -> Result<(), TransportError> {
        self.0.write_all(payload.as_bytes())?;
        self.0.flush()?;
        Ok(())
    }
}

/// Writes the response from inside the completion callback.
///
/// Nothing blocks: the caller gets control back as soon as the handler
/// returns, and the channel is finalized by whichever thread or task
/// completes the call. Write failures at that point have nowhere to go and
/// are logged.
#[derive(Clone)]
pub struct DirectWriteAdapter {
    dispatcher: Arc<RpcDispatcher>,
}

impl DirectWriteAdapter {
    pub fn new(dispatcher: Arc<RpcDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<RpcDispatcher> {
        &self.dispatcher
    }

    /// Dispatch `request`; its response goes to `channel`.
    ///
    /// Returns the id the response will carry.
    pub fn call<C: OutboundChannel>(&self, request: Request, channel: C) -> RequestId {
        let id = self.dispatcher.correlation_id(&request);
        self.dispatcher.dispatch_with(
            request,
            Completion::new(id.clone(), move |response| write_once(channel, &response)),
        );
        id
    }

    /// Decode `text` and dispatch it; undecodable text is answered immediately.
    pub fn call_text<C: OutboundChannel>(&self, text: &str, channel: C) -> RequestId {
        match Request::decode(text) {
            Ok(request) => self.call(request, channel),
            Err(err) => self.reject(&err, channel),
        }
    }

    /// Serve one inbound call whose text is `content` or the whole of `input`.
    ///
    /// Only reading is reported here; the write happens on completion.
    pub fn serve<R, C>(
        &self,
        content: Option<&str>,
        input: R,
        channel: C,
    ) -> Result<RequestId, TransportError>
    where
        R: Read,
        C: OutboundChannel,
    {
        let bytes = read_inbound(content, input).inspect_err(|err| {
            error!("failed to read request: {}", err);
        })?;

        Ok(self.call_bytes(&bytes, channel))
    }

    /// Decode raw request bytes and dispatch them; invalid UTF-8 is a `ParseError`.
    pub fn call_bytes<C: OutboundChannel>(&self, bytes: &[u8], channel: C) -> RequestId {
        match Request::decode_bytes(bytes) {
            Ok(request) => self.call(request, channel),
            Err(err) => self.reject(&err, channel),
        }
    }

    fn reject<C: OutboundChannel>(&self, err: &MalformedRequest, channel: C) -> RequestId {
        let response = self.dispatcher.reject(err);
        let id = response.id().clone();
        write_once(channel, &response);
        id
    }
}

fn write_once<C: OutboundChannel>(channel: C, response: &Response) {
    debug!(id = %response.id(), "writing response");
    if let Err(err) = channel.send_response(response.encode()) {
        error!(id = %response.id(), "failed to write response: {}", err);
    }
}
