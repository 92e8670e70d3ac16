//! # Echo Server Demo
//!
//! Serves a handful of JSON-RPC methods over HTTP:
//! `ping` answers immediately, `echo` returns its params, `sleep` completes
//! from a tokio task after a delay, and `fail` always returns a domain error.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use jsonrpc_dispatch::{AsyncHandler, FnHandler, Request, RpcError, Spawned, ToRpcError};
use jsonrpc_http_endpoint::RpcHttpServer;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8641")]
    bind: SocketAddr,

    /// Path of the RPC endpoint
    #[arg(short, long, default_value = "/rpc")]
    path: String,

    /// Seconds a call may take before it is answered with a timeout
    #[arg(short, long, default_value = "30")]
    deadline: u64,
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("sleep takes a number of milliseconds, got {0}")]
    BadDelay(Value),
}

impl ToRpcError for DemoError {
    fn to_rpc_error(&self) -> RpcError {
        RpcError::invalid_params(&self.to_string())
    }
}

/// Waits `params[0]` milliseconds (default 100) and reports how long it slept
struct Sleep;

#[async_trait]
impl AsyncHandler for Sleep {
    type Error = DemoError;

    async fn call(&self, request: Request) -> Result<Value, DemoError> {
        let millis = match request.get_param_index(0) {
            None => 100,
            Some(value) => value
                .as_u64()
                .ok_or_else(|| DemoError::BadDelay(value.clone()))?,
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(json!({ "slept_ms": millis }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let sleep = Spawned::try_current(Sleep).context("no tokio runtime")?;
    let server = RpcHttpServer::builder()
        .bind_address(args.bind)
        .rpc_path(args.path.clone())
        .deadline(Duration::from_secs(args.deadline))
        .method("ping", FnHandler::new(|_: &Request| Ok(json!("pong"))))
        .method(
            "echo",
            FnHandler::new(|request: &Request| {
                Ok(request.params().cloned().unwrap_or(Value::Null))
            }),
        )
        .method("sleep", sleep)
        .method(
            "fail",
            FnHandler::new(|_: &Request| Err(RpcError::server_error(-32000, "Requested failure", None))),
        )
        .build();

    info!("Try: curl -d '{{\"method\":\"ping\",\"id\":1}}' http://{}{}", args.bind, args.path);

    server.run().await.context("server failed")?;
    Ok(())
}
