//! HTTP server that owns a dispatcher and serves it on one path

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use jsonrpc_dispatch::{CONTENT_PARAM, CallHandler, RpcDispatcher};

use crate::{Result, RpcHttpHandler};

/// Configuration for the HTTP endpoint
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path for the RPC endpoint
    pub rpc_path: String,
    /// Query/form field that may carry the request text
    pub content_param: String,
    /// Maximum request body size
    pub max_body_size: usize,
    /// How long a call may take before a timeout response is sent
    pub deadline: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            rpc_path: "/rpc".to_string(),
            content_param: CONTENT_PARAM.to_string(),
            max_body_size: 1024 * 1024, // 1MB
            deadline: Duration::from_secs(30),
        }
    }
}

/// Builder for the HTTP endpoint.
///
/// All handlers are registered here; the dispatcher is frozen by [`build`](Self::build).
pub struct RpcHttpServerBuilder {
    config: ServerConfig,
    dispatcher: RpcDispatcher,
}

impl RpcHttpServerBuilder {
    /// Create a new builder with default configuration and no methods
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher: RpcDispatcher::new(),
        }
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the RPC endpoint path
    pub fn rpc_path(mut self, path: impl Into<String>) -> Self {
        self.config.rpc_path = path.into();
        self
    }

    /// Set the name of the field carrying the request text
    pub fn content_param(mut self, name: impl Into<String>) -> Self {
        self.config.content_param = name.into();
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set how long a call may run before it is answered with a timeout
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = deadline;
        self
    }

    /// Register a handler for one method
    pub fn method<H>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: CallHandler + 'static,
    {
        self.dispatcher.register(name, handler);
        self
    }

    /// Register a handler for several methods
    pub fn methods<H, I, S>(mut self, names: I, handler: H) -> Self
    where
        H: CallHandler + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dispatcher.register_methods(names, handler);
        self
    }

    /// Register a default handler for unhandled methods
    pub fn default_handler<H>(mut self, handler: H) -> Self
    where
        H: CallHandler + 'static,
    {
        self.dispatcher.set_default_handler(handler);
        self
    }

    /// Build the HTTP endpoint
    pub fn build(self) -> RpcHttpServer {
        let config = Arc::new(self.config);
        let handler = RpcHttpHandler::new(Arc::clone(&config), Arc::new(self.dispatcher));
        RpcHttpServer { config, handler }
    }
}

impl Default for RpcHttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP endpoint serving a frozen dispatcher
#[derive(Clone)]
pub struct RpcHttpServer {
    config: Arc<ServerConfig>,
    handler: RpcHttpHandler,
}

impl RpcHttpServer {
    pub fn builder() -> RpcHttpServerBuilder {
        RpcHttpServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The request handler, for embedding in another hyper service
    pub fn handler(&self) -> RpcHttpHandler {
        self.handler.clone()
    }

    /// Bind the configured address and serve until the listener fails
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections accepted from `listener`
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("JSON-RPC endpoint listening on {}", listener.local_addr()?);
        info!("RPC endpoint available at: {}", self.config.rpc_path);

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    // Filter out common client disconnection errors that aren't actual problems
                    if err.is_incomplete_message() {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
