//! E2E: server discovery and tool catalog refresh

use toolbus_agent::conn::{ConnectionManager, ServerStatus};

use crate::support::{dead_port, fast_settings, registry_from, StubServer};

#[tokio::test]
async fn test_refresh_discovers_tools() {
    let stub = StubServer::spawn().await;
    let manager = ConnectionManager::new(stub.registry("stub"), fast_settings());

    manager.refresh_tools().await.expect("refresh");

    let tools = manager.available_tools().await;
    assert_eq!(tools.len(), 2);
    assert!(tools.iter().any(|t| t.name == "echo"));
    assert!(tools.iter().any(|t| t.name == "always_fails"));
    assert!(tools.iter().all(|t| t.server == "stub"));

    // Discovered schemas come through intact
    let echo = tools.iter().find(|t| t.name == "echo").unwrap();
    let schema = echo.input_schema.as_ref().expect("schema");
    assert_eq!(schema["properties"]["text"]["type"], "string");

    assert_eq!(manager.tools_from("stub").await.len(), 2);
    assert!(manager.connected_servers().await.contains(&"stub".to_string()));
}

#[tokio::test]
async fn test_refresh_replaces_wholesale() {
    let stub = StubServer::spawn().await;
    let manager = ConnectionManager::new(stub.registry("stub"), fast_settings());

    manager.refresh_tools().await.expect("first refresh");
    manager.refresh_tools().await.expect("second refresh");

    // A second refresh replaces the catalog instead of appending to it
    assert_eq!(manager.available_tools().await.len(), 2);
}

#[tokio::test]
async fn test_refresh_skips_unreachable_server() {
    let stub = StubServer::spawn().await;
    let dead = dead_port().await;
    let registry = registry_from(&format!(
        r#"{{"toolServers": {{
            "stub": {{"transport": "tcp", "host": "127.0.0.1", "port": {}}},
            "dead": {{"transport": "tcp", "host": "127.0.0.1", "port": {}}}
        }}}}"#,
        stub.port, dead
    ));
    let manager = ConnectionManager::new(registry, fast_settings());

    // One unreachable server must not fail the refresh
    manager.refresh_tools().await.expect("refresh");

    let tools = manager.available_tools().await;
    assert_eq!(tools.len(), 2);
    assert!(tools.iter().all(|t| t.server == "stub"));
}

#[tokio::test]
async fn test_refresh_skips_disabled_server() {
    let stub = StubServer::spawn().await;
    let registry = registry_from(&format!(
        r#"{{"toolServers": {{
            "stub": {{"transport": "tcp", "host": "127.0.0.1", "port": {}, "enabled": false}}
        }}}}"#,
        stub.port
    ));
    let manager = ConnectionManager::new(registry, fast_settings());

    manager.refresh_tools().await.expect("refresh");
    assert!(manager.available_tools().await.is_empty());
}

#[tokio::test]
async fn test_discover_mixed_availability() {
    let stub = StubServer::spawn().await;
    let dead = dead_port().await;
    let registry = registry_from(&format!(
        r#"{{"toolServers": {{
            "stub": {{"transport": "tcp", "host": "127.0.0.1", "port": {}}},
            "docker-mcp": {{"transport": "tcp", "host": "127.0.0.1", "port": {}}}
        }}}}"#,
        stub.port, dead
    ));
    let manager = ConnectionManager::new(registry, fast_settings());

    let servers = manager.discover_servers().await;
    assert_eq!(servers.len(), 2);

    let by_name = |name: &str| servers.iter().find(|s| s.name == name).unwrap();
    assert_eq!(by_name("stub").status, ServerStatus::Connected);
    assert_eq!(by_name("docker-mcp").status, ServerStatus::Unavailable);
}
