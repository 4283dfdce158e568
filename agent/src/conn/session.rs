//! Wire session against a single tool server
//!
//! Sessions are short-lived: dial, identity handshake, one or more requests,
//! drop. The manager opens a fresh session per discovery or execution call
//! rather than keeping sockets open between calls.

use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use wire_common::{
    read_frame, write_frame, ClientIdentity, ToolSpec, WireRequest, WireResponse, WireToolResult,
};

use crate::error::ToolServerError;

/// An established, handshaken session with a tool server
pub struct WireSession {
    server_name: String,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl WireSession {
    /// Dial the server with a bounded timeout and perform the identity handshake
    pub async fn open(
        server_name: &str,
        addr: &str,
        client: ClientIdentity,
        connect_timeout: Duration,
    ) -> Result<Self, ToolServerError> {
        tracing::debug!("Opening session to tool server '{}' at {}", server_name, addr);

        let stream = match timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ToolServerError::ConnectionFailed {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ToolServerError::ConnectionFailed {
                    addr: addr.to_string(),
                    reason: format!("connect timed out after {:?}", connect_timeout),
                })
            }
        };

        let (read_half, write_half) = stream.into_split();
        let mut session = Self {
            server_name: server_name.to_string(),
            reader: BufReader::new(read_half),
            writer: write_half,
        };
        session.handshake(client).await?;
        Ok(session)
    }

    /// Exchange client identity for the server's `Ready` acknowledgment
    async fn handshake(&mut self, client: ClientIdentity) -> Result<(), ToolServerError> {
        let request = WireRequest::Initialize { client };
        write_frame(&mut self.writer, &request).await.map_err(|e| {
            ToolServerError::HandshakeFailed {
                server: self.server_name.clone(),
                reason: e.to_string(),
            }
        })?;

        let response: WireResponse =
            read_frame(&mut self.reader)
                .await
                .map_err(|e| ToolServerError::HandshakeFailed {
                    server: self.server_name.clone(),
                    reason: e.to_string(),
                })?;

        match response {
            WireResponse::Ready { server } => {
                tracing::debug!(
                    "Session ready: '{}' ({} {})",
                    self.server_name,
                    server.name,
                    server.version
                );
                Ok(())
            }
            WireResponse::Error { message } => Err(ToolServerError::HandshakeFailed {
                server: self.server_name.clone(),
                reason: message,
            }),
            _ => Err(ToolServerError::HandshakeFailed {
                server: self.server_name.clone(),
                reason: "unexpected response to handshake".to_string(),
            }),
        }
    }

    /// Request the server's tool list
    pub async fn list_tools(&mut self) -> Result<Vec<ToolSpec>, ToolServerError> {
        match self.round_trip(WireRequest::ListTools).await? {
            WireResponse::Tools { tools } => Ok(tools),
            WireResponse::Error { message } => Err(self.protocol_error(message)),
            _ => Err(self.protocol_error("unexpected response to tool list request")),
        }
    }

    /// Invoke a tool and return the raw wire result
    pub async fn call_tool(
        &mut self,
        tool: &str,
        arguments: Option<serde_json::Value>,
    ) -> Result<WireToolResult, ToolServerError> {
        let request = WireRequest::CallTool {
            tool: tool.to_string(),
            arguments,
        };
        match self.round_trip(request).await? {
            WireResponse::Result { result } => Ok(result),
            WireResponse::Error { message } => Err(ToolServerError::ExecutionFailed {
                tool: tool.to_string(),
                reason: message,
            }),
            _ => Err(self.protocol_error("unexpected response to tool call")),
        }
    }

    async fn round_trip(&mut self, request: WireRequest) -> Result<WireResponse, ToolServerError> {
        write_frame(&mut self.writer, &request)
            .await
            .map_err(|e| self.protocol_error(e.to_string()))?;
        read_frame(&mut self.reader)
            .await
            .map_err(|e| self.protocol_error(e.to_string()))
    }

    fn protocol_error(&self, reason: impl Into<String>) -> ToolServerError {
        ToolServerError::Protocol {
            server: self.server_name.clone(),
            reason: reason.into(),
        }
    }
}
