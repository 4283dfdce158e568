//! E2E: direct tool execution and health checks

use serde_json::json;
use toolbus_agent::conn::{ConnectionManager, HealthState, ToolExecutor};
use toolbus_agent::error::ToolServerError;

use crate::support::{dead_port, fast_settings, registry_from, StubServer};

#[tokio::test]
async fn test_execute_echo() {
    let stub = StubServer::spawn().await;
    let manager = ConnectionManager::new(stub.registry("stub"), fast_settings());
    manager.refresh_tools().await.expect("refresh");

    let result = manager
        .execute_tool("echo", Some(json!({"text": "hello over the wire"})))
        .await
        .expect("execute");

    assert!(result.success);
    assert_eq!(result.server, "stub");
    assert_eq!(result.text(), "hello over the wire");
    assert!(result.error.is_none());
    assert_eq!(stub.tool_calls(), 1);
}

#[tokio::test]
async fn test_remote_error_becomes_failed_result() {
    let stub = StubServer::spawn().await;
    let manager = ConnectionManager::new(stub.registry("stub"), fast_settings());
    manager.refresh_tools().await.expect("refresh");

    // The remote error flag maps to success=false, not an Err
    let result = manager
        .execute_tool("always_fails", None)
        .await
        .expect("execute");

    assert!(!result.success);
    assert!(result.error.is_some());
    assert_eq!(result.text(), "this tool always fails");
}

#[tokio::test]
async fn test_execute_unknown_tool_is_an_error() {
    let stub = StubServer::spawn().await;
    let manager = ConnectionManager::new(stub.registry("stub"), fast_settings());
    manager.refresh_tools().await.expect("refresh");

    let err = manager.execute_tool("no_such_tool", None).await.unwrap_err();
    assert!(matches!(err, ToolServerError::ToolNotFound(_)));
}

#[tokio::test]
async fn test_health_check_mixed() {
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
    manager.refresh_tools().await.expect("refresh");

    let statuses = manager.health_check().await;
    assert_eq!(statuses.len(), 2);

    let healthy = &statuses["stub"];
    assert_eq!(healthy.status, HealthState::Healthy);
    assert!(healthy.error.is_none());
    assert_eq!(healthy.tool_count, 2);

    let unhealthy = &statuses["dead"];
    assert_eq!(unhealthy.status, HealthState::Unhealthy);
    assert!(unhealthy.error.is_some());

    // A failed health check drops the connected flag
    assert!(!manager.is_connected("dead").await);
}

#[tokio::test]
async fn test_disconnect_then_execute_reconnects() {
    let stub = StubServer::spawn().await;
    let manager = ConnectionManager::new(stub.registry("stub"), fast_settings());
    manager.refresh_tools().await.expect("refresh");

    manager.disconnect_all().await;
    assert!(!manager.is_connected("stub").await);

    // Execution reconnects on demand
    let result = manager
        .execute_tool("echo", Some(json!({"text": "back"})))
        .await
        .expect("execute");
    assert!(result.success);
    assert!(manager.is_connected("stub").await);
}
