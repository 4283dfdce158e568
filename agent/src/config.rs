//! Configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/toolbus/
///
/// Returns the path if found, None otherwise.
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    // Walk up the directory tree
    loop {
        // Check current directory
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        // Also check agent/ subdirectory (for project root detection)
        let agent_candidate = current.join("agent").join(filename);
        if agent_candidate.exists() {
            return Some(agent_candidate);
        }

        // Move to parent directory
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break, // Reached filesystem root
        }
    }

    // Fallback: Check global config
    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("toolbus").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

// ============================================================================
// Tool Server Registry (.toolservers.json)
// ============================================================================

/// Transport used to reach a tool server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Stdio,
    Websocket,
    Docker,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Tcp => write!(f, "tcp"),
            TransportKind::Stdio => write!(f, "stdio"),
            TransportKind::Websocket => write!(f, "websocket"),
            TransportKind::Docker => write!(f, "docker"),
        }
    }
}

/// Configuration for a single tool server
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub transport: TransportKind,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    /// Launch command, used by the stdio transport
    #[serde(default)]
    pub command: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ServerConfig {
    /// Socket address for TCP-style transports
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Tool server registry (from .toolservers.json)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerRegistry {
    #[serde(rename = "toolServers")]
    pub tool_servers: HashMap<String, ServerConfig>,
}

impl ServerRegistry {
    /// Load the registry from .toolservers.json
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .toolservers.json
    /// 2. Check ~/.config/toolbus/.toolservers.json (global fallback)
    pub fn load() -> Result<Option<Self>> {
        if let Some(config_path) = find_config_file(".toolservers.json") {
            tracing::debug!("Loading server registry from: {}", config_path.display());
            return Self::load_from_path(&config_path).map(Some);
        }

        tracing::debug!("No .toolservers.json found");
        Ok(None)
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let registry: ServerRegistry = serde_json::from_str(&content)?;
        Ok(registry)
    }
}

// ============================================================================
// Agent Configuration (.agent.toml)
// ============================================================================

/// Top-level agent configuration (from .agent.toml)
#[derive(Debug, Default, Deserialize)]
pub struct AgentFileConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// LLM configuration section
#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

/// Connection settings section
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSettings {
    /// Timeout for opening a socket to a server, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Timeout for a single remote tool call, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_client_version")]
    pub client_version: String,
}

impl ConnectionSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

// Default value functions
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen3-coder:30b".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_call_timeout() -> u64 {
    30
}

fn default_client_name() -> String {
    "toolbus-agent".to_string()
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            call_timeout_secs: default_call_timeout(),
            client_name: default_client_name(),
            client_version: default_client_version(),
        }
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Backend holding cached tool results
///
/// Unknown backend names are rejected when the config is parsed rather than
/// silently falling back to memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
}

/// Policy used to evict entries when a cache reaches its key bound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the least recently accessed entry
    #[default]
    Lru,
    /// Evict the entry closest to expiry
    Ttl,
}

/// Cache configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// TTL applied when a tool has no override, in seconds
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,
    /// Maximum number of entries per (tool, server) cache
    #[serde(default = "default_max_keys")]
    pub max_keys: usize,
    #[serde(default)]
    pub eviction_policy: EvictionPolicy,
    #[serde(default)]
    pub backend: CacheBackend,
    /// Interval between expired-entry sweeps, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// Per-tool TTL overrides, in seconds
    #[serde(default)]
    pub tool_ttls: HashMap<String, u64>,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_ttl() -> u64 {
    300
}

fn default_max_keys() -> usize {
    10_000
}

fn default_cleanup_interval() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            default_ttl_secs: default_ttl(),
            max_keys: default_max_keys(),
            eviction_policy: EvictionPolicy::default(),
            backend: CacheBackend::default(),
            cleanup_interval_secs: default_cleanup_interval(),
            tool_ttls: HashMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// TTL for a tool, honoring per-tool overrides
    pub fn ttl_for(&self, tool: &str) -> Duration {
        self.tool_ttls
            .get(tool)
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or_else(|| self.default_ttl())
    }
}

impl AgentFileConfig {
    /// Load config from .agent.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .agent.toml
    /// 2. Check ~/.config/toolbus/.agent.toml (global fallback)
    /// 3. Fall back to defaults
    pub fn load() -> Result<Self> {
        if let Some(config_path) = find_config_file(".agent.toml") {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        // No config file found, return defaults
        tracing::debug!("No .agent.toml found, using defaults");
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AgentFileConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
