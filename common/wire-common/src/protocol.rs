//! Wire protocol for agent <-> tool-server communication
//!
//! Defines the message types exchanged between the agent and a tool server
//! over a byte stream (TCP in practice). Every session starts with an
//! `Initialize`/`Ready` identity exchange before any other request is
//! accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version sent in the identity handshake
pub const PROTOCOL_VERSION: &str = "1.0";

/// Identity presented by the connecting client during the handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub name: String,
    pub version: String,
}

/// Identity returned by the server in the `Ready` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
}

/// Request from agent to tool server
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireRequest {
    /// Identity handshake, must be the first request of a session
    Initialize { client: ClientIdentity },

    /// List all tools the server exposes
    ListTools,

    /// Invoke a tool with JSON arguments
    CallTool {
        tool: String,
        arguments: Option<Value>,
    },
}

/// Response from tool server to agent
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireResponse {
    /// Handshake accepted
    Ready { server: ServerIdentity },

    /// List of tool specs
    Tools { tools: Vec<ToolSpec> },

    /// Tool call result
    Result { result: WireToolResult },

    /// Error response
    Error { message: String },
}

/// Description of a single tool as advertised by a server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

/// Result of a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolResult {
    pub content: Vec<ToolContent>,
    pub is_error: bool,
}

impl WireToolResult {
    /// A successful result carrying a single text item
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: false,
        }
    }

    /// An error result carrying the message as a text item
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(message)],
            is_error: true,
        }
    }
}

/// A single content item within a tool call result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 payload for binary content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: Some(text.into()),
            data: None,
            mime_type: None,
        }
    }
}
