//! Shared types for the tool server connection layer

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wire_common::{ToolSpec, WireToolResult};

use crate::config::TransportKind;

/// A tool discovered on a tool server
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: Option<String>,
    /// Server this tool belongs to
    pub server: String,
    /// Input schema (JSON)
    pub input_schema: Option<Value>,
}

impl ToolInfo {
    pub(crate) fn from_spec(server: &str, spec: ToolSpec) -> Self {
        Self {
            name: spec.name,
            description: spec.description,
            server: server.to_string(),
            input_schema: spec.input_schema,
        }
    }
}

/// Reported status of a configured server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Connected,
    Disconnected,
    Unavailable,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Connected => write!(f, "connected"),
            ServerStatus::Disconnected => write!(f, "disconnected"),
            ServerStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Snapshot view of a configured server
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub transport: TransportKind,
    pub address: String,
    pub port: u16,
    pub status: ServerStatus,
}

/// Health classification of a server connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health of a single server, as measured by a timed connect attempt
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub last_check: DateTime<Utc>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tool_count: usize,
}

/// A tool execution request
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: String,
    /// Resolved by catalog lookup when absent
    pub server: Option<String>,
    pub arguments: Option<Value>,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, arguments: Option<Value>) -> Self {
        Self {
            tool: tool.into(),
            server: None,
            arguments,
        }
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub server: String,
    pub success: bool,
    pub content: Vec<ContentItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A single content item within a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 payload for binary content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ToolResult {
    /// Map a wire-level result into the agent-facing form
    pub(crate) fn from_wire(
        tool: &str,
        server: &str,
        wire: WireToolResult,
        duration: Duration,
    ) -> Self {
        let content = wire
            .content
            .into_iter()
            .map(|c| ContentItem {
                kind: c.content_type,
                text: c.text,
                data: c.data,
                mime_type: c.mime_type,
            })
            .collect();

        let error = if wire.is_error {
            Some("tool returned an error".to_string())
        } else {
            None
        };

        Self {
            tool: tool.to_string(),
            server: server.to_string(),
            success: !wire.is_error,
            content,
            error,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// A failed execution with no content
    pub(crate) fn failure(
        tool: &str,
        server: &str,
        reason: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            tool: tool.to_string(),
            server: server.to_string(),
            success: false,
            content: Vec::new(),
            error: Some(reason.into()),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Concatenated text content, one item per line
    pub fn text(&self) -> String {
        let mut output = String::new();
        for item in &self.content {
            if let Some(ref text) = item.text {
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(text);
            }
        }
        output
    }
}
