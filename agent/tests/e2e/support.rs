//! In-process stub tool server and config helpers for the e2e suite

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wire_common::{
    read_frame, write_frame, FrameError, ServerIdentity, ToolSpec, WireRequest, WireResponse,
    WireToolResult, PROTOCOL_VERSION,
};

use toolbus_agent::config::{ConnectionSettings, ServerRegistry};

/// A stub tool server bound to an OS-assigned port
///
/// Exposes `echo` (returns its `text` argument) and `always_fails` (error
/// result), and counts how many tool calls actually reach it.
pub struct StubServer {
    pub port: u16,
    calls: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let port = listener.local_addr().expect("local addr").port();
        let calls = Arc::new(AtomicU64::new(0));
        let session_calls = calls.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let calls = session_calls.clone();
                tokio::spawn(async move {
                    let _ = serve_session(stream, calls).await;
                });
            }
        });

        Self {
            port,
            calls,
            handle,
        }
    }

    /// Number of tool calls that reached the server
    pub fn tool_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Registry with this stub as the only configured server
    pub fn registry(&self, name: &str) -> ServerRegistry {
        registry_from(&format!(
            r#"{{"toolServers": {{"{}": {{"transport": "tcp", "host": "127.0.0.1", "port": {}}}}}}}"#,
            name, self.port
        ))
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn registry_from(json: &str) -> ServerRegistry {
    serde_json::from_str(json).expect("registry json")
}

pub fn fast_settings() -> ConnectionSettings {
    ConnectionSettings {
        connect_timeout_secs: 2,
        call_timeout_secs: 2,
        ..ConnectionSettings::default()
    }
}

/// A port with nothing listening on it
pub async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}

async fn serve_session(stream: TcpStream, calls: Arc<AtomicU64>) -> Result<(), FrameError> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let request: WireRequest = match read_frame(&mut reader).await {
            Ok(request) => request,
            Err(_) => break,
        };

        let response = match request {
            WireRequest::Initialize { .. } => WireResponse::Ready {
                server: ServerIdentity {
                    name: "stub".to_string(),
                    version: PROTOCOL_VERSION.to_string(),
                },
            },
            WireRequest::ListTools => WireResponse::Tools {
                tools: stub_tools(),
            },
            WireRequest::CallTool { tool, arguments } => {
                calls.fetch_add(1, Ordering::Relaxed);
                WireResponse::Result {
                    result: run_tool(&tool, arguments.as_ref()),
                }
            }
        };

        write_frame(&mut writer, &response).await?;
    }

    Ok(())
}

fn stub_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "echo".to_string(),
            description: Some("Echo text back".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })),
        },
        ToolSpec {
            name: "always_fails".to_string(),
            description: Some("Always returns an error".to_string()),
            input_schema: None,
        },
    ]
}

fn run_tool(tool: &str, arguments: Option<&Value>) -> WireToolResult {
    match tool {
        "echo" => {
            let text = arguments
                .and_then(|a| a.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("");
            WireToolResult::text(text)
        }
        "always_fails" => WireToolResult::error("this tool always fails"),
        other => WireToolResult::error(format!("unknown tool: {}", other)),
    }
}
