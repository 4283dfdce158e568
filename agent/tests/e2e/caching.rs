//! E2E: cache-aware execution against a live stub server

use std::sync::Arc;

use serde_json::json;
use toolbus_agent::cache::CacheManager;
use toolbus_agent::config::CacheConfig;
use toolbus_agent::conn::{ConnectionManager, ToolInvocation};

use crate::support::{fast_settings, StubServer};

async fn setup(stub: &StubServer) -> (Arc<ConnectionManager>, Arc<CacheManager>) {
    let conn = Arc::new(ConnectionManager::new(
        stub.registry("stub"),
        fast_settings(),
    ));
    conn.refresh_tools().await.expect("refresh");
    let cache = Arc::new(CacheManager::new(CacheConfig::default(), conn.clone()));
    (conn, cache)
}

#[tokio::test]
async fn test_repeat_call_served_from_cache() {
    let stub = StubServer::spawn().await;
    let (_conn, cache) = setup(&stub).await;

    let invocation = || ToolInvocation::new("echo", Some(json!({"text": "cached?"})));

    let first = cache.execute_with_cache(invocation()).await.expect("first");
    let second = cache.execute_with_cache(invocation()).await.expect("second");

    assert!(first.success && second.success);
    assert_eq!(second.text(), "cached?");
    // Only the first call crossed the wire
    assert_eq!(stub.tool_calls(), 1);

    let stats = cache.global_stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.total_keys, 1);
}

#[tokio::test]
async fn test_failed_execution_not_cached() {
    let stub = StubServer::spawn().await;
    let (_conn, cache) = setup(&stub).await;

    let first = cache
        .execute_with_cache(ToolInvocation::new("always_fails", None))
        .await
        .expect("first");
    assert!(!first.success);

    let _ = cache
        .execute_with_cache(ToolInvocation::new("always_fails", None))
        .await
        .expect("second");

    // Both calls executed; the failure was never stored
    assert_eq!(stub.tool_calls(), 2);
    assert_eq!(cache.global_stats().await.total_keys, 0);
}

#[tokio::test]
async fn test_invalidate_forces_reexecution() {
    let stub = StubServer::spawn().await;
    let (_conn, cache) = setup(&stub).await;

    let invocation = || ToolInvocation::new("echo", Some(json!({"text": "x"})));
    let _ = cache.execute_with_cache(invocation()).await.expect("first");

    let cleared = cache.invalidate("echo").await;
    assert_eq!(cleared, 1);

    let _ = cache.execute_with_cache(invocation()).await.expect("second");
    assert_eq!(stub.tool_calls(), 2);
}

#[tokio::test]
async fn test_normalized_arguments_share_one_entry() {
    let stub = StubServer::spawn().await;
    let (_conn, cache) = setup(&stub).await;

    // Same logical call: value whitespace is normalized away in the key
    let first = cache
        .execute_with_cache(ToolInvocation::new("echo", Some(json!({"text": "same"}))))
        .await
        .expect("first");
    let second = cache
        .execute_with_cache(ToolInvocation::new("echo", Some(json!({"text": "  same  "}))))
        .await
        .expect("second");

    assert!(first.success && second.success);
    assert_eq!(stub.tool_calls(), 1);
}

#[tokio::test]
async fn test_explicit_server_in_invocation() {
    let stub = StubServer::spawn().await;
    let (_conn, cache) = setup(&stub).await;

    let invocation = ToolInvocation {
        tool: "echo".to_string(),
        server: Some("stub".to_string()),
        arguments: Some(json!({"text": "pinned"})),
    };

    let result = cache.execute_with_cache(invocation).await.expect("execute");
    assert!(result.success);
    assert_eq!(result.server, "stub");
}
