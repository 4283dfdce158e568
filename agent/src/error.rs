//! Error types for tool server connections and execution
//!
//! Connection and execution errors are returned to the immediate caller so it
//! can retry, report, or degrade. Discovery and health checks never surface
//! these directly - they aggregate per-server outcomes in-band instead.

use thiserror::Error;

use crate::config::TransportKind;

/// Errors produced while talking to tool servers
#[derive(Debug, Error)]
pub enum ToolServerError {
    #[error("server '{0}' is not configured")]
    ServerNotConfigured(String),

    #[error("no tool servers configured")]
    NoServersConfigured,

    #[error("connection to {addr} failed: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    #[error("transport '{0}' is not supported")]
    UnsupportedTransport(TransportKind),

    #[error("handshake with '{server}' failed: {reason}")]
    HandshakeFailed { server: String, reason: String },

    #[error("protocol error from '{server}': {reason}")]
    Protocol { server: String, reason: String },

    #[error("tool '{0}' not found in any connected server")]
    ToolNotFound(String),

    #[error("tool '{tool}' execution failed: {reason}")]
    ExecutionFailed { tool: String, reason: String },
}
