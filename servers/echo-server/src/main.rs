//! Demo tool server
//!
//! Exposes two tools over the wire protocol: `echo` (returns its input) and
//! `system_time` (returns the current UTC time). Useful for exercising the
//! agent end to end without any external service.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use wire_common::{
    read_frame, write_frame, FrameError, ServerIdentity, ToolSpec, WireRequest, WireResponse,
    WireToolResult, PROTOCOL_VERSION,
};

#[derive(Parser)]
#[command(name = "echo-server")]
#[command(about = "Demo tool server speaking the toolbus wire protocol")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8811)]
    port: u16,
}

fn identity() -> ServerIdentity {
    ServerIdentity {
        name: "echo-server".to_string(),
        version: PROTOCOL_VERSION.to_string(),
    }
}

fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "echo".to_string(),
            description: Some("Echo the given text back".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "Text to echo"}
                },
                "required": ["text"]
            })),
        },
        ToolSpec {
            name: "system_time".to_string(),
            description: Some("Current UTC time in RFC 3339 format".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {}
            })),
        },
    ]
}

fn call_tool(tool: &str, arguments: Option<&Value>) -> WireToolResult {
    match tool {
        "echo" => match arguments.and_then(|a| a.get("text")).and_then(Value::as_str) {
            Some(text) => WireToolResult::text(text),
            None => WireToolResult::error("echo requires a 'text' argument"),
        },
        "system_time" => WireToolResult::text(chrono::Utc::now().to_rfc3339()),
        other => WireToolResult::error(format!("unknown tool: {}", other)),
    }
}

/// Serve one client session: handshake first, then requests until EOF
async fn handle_connection(stream: TcpStream) -> Result<()> {
    let peer = stream.peer_addr().ok();
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut initialized = false;

    loop {
        let request: WireRequest = match read_frame(&mut reader).await {
            Ok(request) => request,
            Err(FrameError::Closed) => break,
            Err(e) => {
                tracing::warn!("Dropping session from {:?}: {}", peer, e);
                let response = WireResponse::Error {
                    message: e.to_string(),
                };
                let _ = write_frame(&mut writer, &response).await;
                break;
            }
        };

        let response = match request {
            WireRequest::Initialize { client } => {
                tracing::info!("Session from {} {}", client.name, client.version);
                initialized = true;
                WireResponse::Ready { server: identity() }
            }
            _ if !initialized => WireResponse::Error {
                message: "session not initialized".to_string(),
            },
            WireRequest::ListTools => WireResponse::Tools {
                tools: tool_specs(),
            },
            WireRequest::CallTool { tool, arguments } => {
                tracing::info!("Calling tool '{}'", tool);
                WireResponse::Result {
                    result: call_tool(&tool, arguments.as_ref()),
                }
            }
        };

        write_frame(&mut writer, &response).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    wire_common::init_tracing("echo_server")?;

    let cli = Cli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to {}", addr))?;
    tracing::info!("Echo tool server listening on {}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!("Accepted connection from {}", peer);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream).await {
                tracing::warn!("Connection error: {}", e);
            }
        });
    }
}
