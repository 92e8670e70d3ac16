//! HTTP request handler for JSON-RPC calls

use std::error::Error as StdError;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use jsonrpc_dispatch::{DirectWriteAdapter, RequestId, RpcDispatcher, RpcError};

use crate::ServerConfig;

const JSON_UTF8: &str = "application/json; charset=utf-8";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// HTTP handler that answers every call on the RPC path with one JSON payload
#[derive(Clone)]
pub struct RpcHttpHandler {
    pub(crate) config: Arc<ServerConfig>,
    adapter: DirectWriteAdapter,
}

impl RpcHttpHandler {
    /// Create a new handler
    pub fn new(config: Arc<ServerConfig>, dispatcher: Arc<RpcDispatcher>) -> Self {
        Self {
            config,
            adapter: DirectWriteAdapter::new(dispatcher),
        }
    }

    /// Handle one HTTP request
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        if req.uri().path() != self.config.rpc_path {
            return plain(StatusCode::NOT_FOUND, "Not Found");
        }
        if req.method() != Method::GET && req.method() != Method::POST {
            warn!("Unsupported method: {}", req.method());
            return plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        match self.read_call_text(req).await {
            Ok(text) => self.dispatch(text).await,
            Err(rejection) => rejection,
        }
    }

    /// Request text: the content parameter from the query string, then from a
    /// form body, then the raw body.
    async fn read_call_text<B>(&self, req: Request<B>) -> Result<Vec<u8>, Response<Full<Bytes>>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let param = self.config.content_param.as_str();

        if let Some(content) = req
            .uri()
            .query()
            .and_then(|query| form_value(query.as_bytes(), param))
        {
            debug!("Using request text from query parameter '{}'", param);
            return Ok(content.into_bytes());
        }

        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.starts_with(FORM_URLENCODED));

        let limit = self.config.max_body_size;
        let body_bytes = match Limited::new(req.into_body(), limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.is::<LengthLimitError>() => {
                warn!("Request body exceeds {} bytes", limit);
                return Err(plain(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
            }
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return Err(plain(StatusCode::BAD_REQUEST, "Failed to read request body"));
            }
        };

        if is_form {
            debug!("Using request text from form field '{}'", param);
            return Ok(form_value(&body_bytes, param)
                .map(String::into_bytes)
                .unwrap_or_default());
        }

        Ok(body_bytes.to_vec())
    }

    async fn dispatch(&self, text: Vec<u8>) -> Response<Full<Bytes>> {
        let (tx, rx) = oneshot::channel();
        let id = self.adapter.call_bytes(&text, tx);

        let payload = match tokio::time::timeout(self.config.deadline, rx).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(_)) => {
                error!(id = %id, "Completion closed without writing a response");
                error_payload(id, RpcError::internal_error(None))
            }
            Err(_) => {
                warn!(id = %id, "Call did not complete within {:?}", self.config.deadline);
                error_payload(id, RpcError::timeout())
            }
        };

        debug!("Sending JSON-RPC response");
        json(payload)
    }
}

fn error_payload(id: RequestId, error: RpcError) -> String {
    jsonrpc_dispatch::Response::error(id, error).encode()
}

/// First value of `name` in an urlencoded form
fn form_value(form: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(form)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn json(payload: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(payload)));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
    response
}

fn plain(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response
}
