//! Wire Common - shared protocol between the agent and tool servers
//!
//! This crate defines everything both sides of a tool-server connection need:
//!
//! - **Protocol**: request/response message types, the identity handshake,
//!   tool specs and tool call results
//! - **Framing**: newline-delimited JSON read/write helpers over any async
//!   byte stream
//! - **Initialization**: `init_tracing` for consistent server startup logging

pub mod frame;
pub mod init;
pub mod protocol;

// Re-export commonly used items at crate root
pub use frame::{read_frame, write_frame, FrameError};
pub use init::init_tracing;
pub use protocol::{
    ClientIdentity, ServerIdentity, ToolContent, ToolSpec, WireRequest, WireResponse,
    WireToolResult, PROTOCOL_VERSION,
};
