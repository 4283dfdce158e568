//! Tool server connection manager
//!
//! Tracks configured tool servers, maintains connection bookkeeping and the
//! discovered tool catalog, and executes tools against their owning servers.
//! Connection-status and catalog state live behind a single read/write lock;
//! network I/O happens outside the lock so slow connects never block readers.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::time::timeout;
use wire_common::ClientIdentity;

use crate::config::{ConnectionSettings, ServerConfig, ServerRegistry, TransportKind};
use crate::error::ToolServerError;

use super::session::WireSession;
use super::types::{
    HealthState, HealthStatus, ServerInfo, ServerStatus, ToolInfo, ToolResult,
};

// =============================================================================
// Direct execution seam
// =============================================================================

/// Direct tool execution, as a trait so cache-aware callers can delegate
/// without naming the concrete manager type.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Server owning a tool in the current catalog, if any
    async fn resolve_server(&self, tool: &str) -> Option<String>;

    /// Execute a tool against its owning server
    async fn execute_tool(
        &self,
        tool: &str,
        arguments: Option<Value>,
    ) -> Result<ToolResult, ToolServerError>;
}

// =============================================================================
// Connection Manager
// =============================================================================

/// Per-server connection bookkeeping
struct ConnectionState {
    connected: bool,
    last_check: DateTime<Utc>,
}

/// State guarded by the manager's lock: connection flags plus tool catalog
struct ManagerState {
    connections: HashMap<String, ConnectionState>,
    tools: Vec<ToolInfo>,
}

/// Manager for configured tool servers and their tool catalog
///
/// Construct one per application and share it behind an `Arc`; all operations
/// take `&self` and are safe under concurrent use.
pub struct ConnectionManager {
    servers: HashMap<String, ServerConfig>,
    settings: ConnectionSettings,
    state: RwLock<ManagerState>,
}

impl ConnectionManager {
    /// Create a manager from a server registry snapshot
    pub fn new(registry: ServerRegistry, settings: ConnectionSettings) -> Self {
        Self {
            servers: registry.tool_servers,
            settings,
            state: RwLock::new(ManagerState {
                connections: HashMap::new(),
                tools: Vec::new(),
            }),
        }
    }

    fn identity(&self) -> ClientIdentity {
        ClientIdentity {
            name: self.settings.client_name.clone(),
            version: self.settings.client_version.clone(),
        }
    }

    /// Names of all configured servers
    pub fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    /// Check reachability of a server and record the outcome
    ///
    /// The dial is a handshake check only; sessions are opened fresh per
    /// discovery or execution call.
    pub async fn connect(&self, name: &str) -> Result<(), ToolServerError> {
        let config = self
            .servers
            .get(name)
            .ok_or_else(|| ToolServerError::ServerNotConfigured(name.to_string()))?;

        match config.transport {
            TransportKind::Tcp => {
                let addr = config.address();
                tracing::debug!("Connecting to tool server '{}' at {}", name, addr);

                let dial = timeout(self.settings.connect_timeout(), TcpStream::connect(&addr)).await;
                let stream = match dial {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(e)) => {
                        self.mark(name, false).await;
                        return Err(ToolServerError::ConnectionFailed {
                            addr,
                            reason: e.to_string(),
                        });
                    }
                    Err(_) => {
                        self.mark(name, false).await;
                        return Err(ToolServerError::ConnectionFailed {
                            addr,
                            reason: format!(
                                "connect timed out after {}s",
                                self.settings.connect_timeout_secs
                            ),
                        });
                    }
                };
                drop(stream);

                self.mark(name, true).await;
                tracing::info!("Connected to tool server '{}' at {}", name, addr);
                Ok(())
            }
            other => Err(ToolServerError::UnsupportedTransport(other)),
        }
    }

    /// Clear connection bookkeeping for a server; always succeeds
    pub async fn disconnect(&self, name: &str) {
        let mut state = self.state.write().await;
        state.connections.remove(name);
        tracing::info!("Disconnected from tool server '{}'", name);
    }

    /// Clear connection bookkeeping for all servers; always succeeds
    pub async fn disconnect_all(&self) {
        let mut state = self.state.write().await;
        state.connections.clear();
        tracing::info!("Disconnected from all tool servers");
    }

    /// Whether a server is currently marked connected
    pub async fn is_connected(&self, name: &str) -> bool {
        let state = self.state.read().await;
        state
            .connections
            .get(name)
            .map(|c| c.connected)
            .unwrap_or(false)
    }

    /// Names of servers currently marked connected
    pub async fn connected_servers(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .connections
            .iter()
            .filter(|(_, c)| c.connected)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Snapshot view of a configured server
    pub async fn server_info(&self, name: &str) -> Result<ServerInfo, ToolServerError> {
        let config = self
            .servers
            .get(name)
            .ok_or_else(|| ToolServerError::ServerNotConfigured(name.to_string()))?;

        let status = if self.is_connected(name).await {
            ServerStatus::Connected
        } else {
            ServerStatus::Disconnected
        };

        Ok(ServerInfo {
            name: name.to_string(),
            transport: config.transport,
            address: config.host.clone(),
            port: config.port,
            status,
        })
    }

    /// Attempt a connection to every enabled server and report each outcome
    ///
    /// Never fails as a whole; per-server failures are reported in-band as
    /// `unavailable`.
    pub async fn discover_servers(&self) -> Vec<ServerInfo> {
        let mut servers = Vec::new();

        for (name, config) in &self.servers {
            if !config.enabled {
                continue;
            }

            let status = match self.connect(name).await {
                Ok(()) => ServerStatus::Connected,
                Err(e) => {
                    tracing::warn!("Server '{}' discovered but unreachable: {}", name, e);
                    ServerStatus::Unavailable
                }
            };

            servers.push(ServerInfo {
                name: name.clone(),
                transport: config.transport,
                address: config.host.clone(),
                port: config.port,
                status,
            });
        }

        tracing::info!("Discovered {} tool servers", servers.len());
        servers
    }

    /// Rebuild the tool catalog from every enabled, reachable server
    ///
    /// Per-server failures are logged and skipped. The new catalog is
    /// assembled off-lock and swapped in wholesale, so concurrent readers see
    /// either the old catalog or the new one, never a partial mix. Fails only
    /// when no servers are configured.
    pub async fn refresh_tools(&self) -> Result<(), ToolServerError> {
        if self.servers.is_empty() {
            return Err(ToolServerError::NoServersConfigured);
        }

        let mut catalog = Vec::new();

        for (name, config) in &self.servers {
            if !config.enabled {
                continue;
            }

            if let Err(e) = self.connect(name).await {
                tracing::warn!("Skipping tool discovery for '{}': {}", name, e);
                continue;
            }

            let specs = match self.open_session(name, config).await {
                Ok(mut session) => match session.list_tools().await {
                    Ok(specs) => specs,
                    Err(e) => {
                        tracing::warn!("Failed to list tools from '{}': {}", name, e);
                        continue;
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to open session to '{}': {}", name, e);
                    continue;
                }
            };

            tracing::info!("Server '{}': {} tools discovered", name, specs.len());
            catalog.extend(specs.into_iter().map(|spec| ToolInfo::from_spec(name, spec)));
        }

        let mut state = self.state.write().await;
        state.tools = catalog;
        tracing::info!("Refreshed tool catalog: {} tools", state.tools.len());
        Ok(())
    }

    /// Current tool catalog snapshot
    pub async fn available_tools(&self) -> Vec<ToolInfo> {
        let state = self.state.read().await;
        state.tools.clone()
    }

    /// Tools belonging to a specific server
    pub async fn tools_from(&self, server: &str) -> Vec<ToolInfo> {
        let state = self.state.read().await;
        state
            .tools
            .iter()
            .filter(|t| t.server == server)
            .cloned()
            .collect()
    }

    /// Time a connect attempt against every enabled server
    pub async fn health_check(&self) -> HashMap<String, HealthStatus> {
        let mut statuses = HashMap::new();

        for (name, config) in &self.servers {
            if !config.enabled {
                continue;
            }

            let tool_count = self.tools_from(name).await.len();
            let start = Instant::now();

            let status = match self.connect(name).await {
                Ok(()) => HealthStatus {
                    status: HealthState::Healthy,
                    last_check: Utc::now(),
                    response_time_ms: start.elapsed().as_millis() as u64,
                    error: None,
                    tool_count,
                },
                Err(e) => HealthStatus {
                    status: HealthState::Unhealthy,
                    last_check: Utc::now(),
                    response_time_ms: 0,
                    error: Some(e.to_string()),
                    tool_count,
                },
            };

            statuses.insert(name.clone(), status);
        }

        statuses
    }

    async fn mark(&self, name: &str, connected: bool) {
        let mut state = self.state.write().await;
        state.connections.insert(
            name.to_string(),
            ConnectionState {
                connected,
                last_check: Utc::now(),
            },
        );
    }

    async fn open_session(
        &self,
        name: &str,
        config: &ServerConfig,
    ) -> Result<WireSession, ToolServerError> {
        match config.transport {
            TransportKind::Tcp => {
                WireSession::open(
                    name,
                    &config.address(),
                    self.identity(),
                    self.settings.connect_timeout(),
                )
                .await
            }
            other => Err(ToolServerError::UnsupportedTransport(other)),
        }
    }
}

#[async_trait]
impl ToolExecutor for ConnectionManager {
    async fn resolve_server(&self, tool: &str) -> Option<String> {
        let state = self.state.read().await;
        state
            .tools
            .iter()
            .find(|t| t.name == tool)
            .map(|t| t.server.clone())
    }

    /// Execute a tool against its owning server
    ///
    /// Session establishment failures propagate as errors; failures after the
    /// session is up (remote error flag, transport breaking mid-call, call
    /// timeout) come back as a `ToolResult` with `success == false` so the
    /// caller can feed the error text to the model instead of aborting.
    async fn execute_tool(
        &self,
        tool: &str,
        arguments: Option<Value>,
    ) -> Result<ToolResult, ToolServerError> {
        let server_name = self
            .resolve_server(tool)
            .await
            .ok_or_else(|| ToolServerError::ToolNotFound(tool.to_string()))?;

        let config = self
            .servers
            .get(&server_name)
            .ok_or_else(|| ToolServerError::ServerNotConfigured(server_name.clone()))?;

        if !self.is_connected(&server_name).await {
            self.connect(&server_name).await?;
        }

        let mut session = self.open_session(&server_name, config).await?;

        let start = Instant::now();
        let outcome = timeout(
            self.settings.call_timeout(),
            session.call_tool(tool, arguments),
        )
        .await;
        let duration = start.elapsed();

        let result = match outcome {
            Ok(Ok(wire)) => ToolResult::from_wire(tool, &server_name, wire, duration),
            Ok(Err(e)) => ToolResult::failure(tool, &server_name, e.to_string(), duration),
            Err(_) => ToolResult::failure(
                tool,
                &server_name,
                format!(
                    "tool call timed out after {}s",
                    self.settings.call_timeout_secs
                ),
                duration,
            ),
        };

        tracing::info!(
            "Tool '{}' on '{}' completed: success={} duration={}ms",
            tool,
            server_name,
            result.success,
            result.duration_ms
        );

        Ok(result)
    }
}
