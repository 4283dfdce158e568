//! E2E: the full tool-using agent loop with a scripted model

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use toolbus_agent::agent::Agent;
use toolbus_agent::cache::CacheManager;
use toolbus_agent::config::CacheConfig;
use toolbus_agent::conn::ConnectionManager;
use toolbus_agent::llm::{Llm, Message, Role};

use crate::support::{fast_settings, StubServer};

/// Scripted model: pops canned responses and records what it was asked
struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    async fn chat(&self, message: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(message.to_string());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn chat_with_history(
        &self,
        history: &mut Vec<Message>,
        message: &str,
    ) -> Result<String> {
        self.prompts.lock().unwrap().push(message.to_string());
        history.push(Message {
            role: Role::User,
            content: message.to_string(),
        });

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        history.push(Message {
            role: Role::Assistant,
            content: response.clone(),
        });
        Ok(response)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Handle so a test can keep inspecting the scripted model it handed to the agent
struct SharedLlm(Arc<ScriptedLlm>);

#[async_trait]
impl Llm for SharedLlm {
    async fn chat(&self, message: &str) -> Result<String> {
        self.0.chat(message).await
    }

    async fn chat_with_history(
        &self,
        history: &mut Vec<Message>,
        message: &str,
    ) -> Result<String> {
        self.0.chat_with_history(history, message).await
    }

    fn model(&self) -> &str {
        self.0.model()
    }
}

#[tokio::test]
async fn test_agent_executes_tool_then_answers() {
    let stub = StubServer::spawn().await;
    let conn = Arc::new(ConnectionManager::new(
        stub.registry("stub"),
        fast_settings(),
    ));
    conn.refresh_tools().await.expect("refresh");
    let cache = Arc::new(CacheManager::new(CacheConfig::default(), conn.clone()));

    let llm = Arc::new(ScriptedLlm::new(&[
        r#"I'll check. TOOL_CALL{"name": "echo", "args": {"text": "pong"}}"#,
        "The tool said: pong",
    ]));

    let mut agent = Agent::new(Box::new(SharedLlm(llm.clone())), conn, cache)
        .with_system_prompt("You are a test agent");

    let answer = agent.chat("ping the stub").await.expect("chat");
    assert_eq!(answer, "The tool said: pong");
    assert_eq!(stub.tool_calls(), 1);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    // First prompt carries the rendered tool catalog
    assert!(prompts[0].contains("**echo**"));
    assert!(prompts[0].contains("TOOL_CALL"));
    // Second prompt feeds the tool result back
    assert!(prompts[1].contains("Tool results:"));
    assert!(prompts[1].contains("pong"));
}

#[tokio::test]
async fn test_agent_answers_directly_without_tools() {
    let stub = StubServer::spawn().await;
    let conn = Arc::new(ConnectionManager::new(
        stub.registry("stub"),
        fast_settings(),
    ));
    conn.refresh_tools().await.expect("refresh");
    let cache = Arc::new(CacheManager::new(CacheConfig::default(), conn.clone()));

    let llm = ScriptedLlm::new(&["Just an answer, no tools needed."]);
    let mut agent = Agent::new(Box::new(llm), conn, cache);

    let answer = agent.chat("hello").await.expect("chat");
    assert_eq!(answer, "Just an answer, no tools needed.");
    assert_eq!(stub.tool_calls(), 0);
}

#[tokio::test]
async fn test_agent_reports_tool_failure_to_model() {
    let stub = StubServer::spawn().await;
    let conn = Arc::new(ConnectionManager::new(
        stub.registry("stub"),
        fast_settings(),
    ));
    conn.refresh_tools().await.expect("refresh");
    let cache = Arc::new(CacheManager::new(CacheConfig::default(), conn.clone()));

    let llm = Arc::new(ScriptedLlm::new(&[
        r#"TOOL_CALL{"name": "always_fails", "args": {}}"#,
        "The tool was unavailable.",
    ]));

    let mut agent = Agent::new(Box::new(SharedLlm(llm.clone())), conn, cache);
    let answer = agent.chat("try the failing tool").await.expect("chat");

    // The failure did not abort the loop; its text went back to the model
    assert_eq!(answer, "The tool was unavailable.");
    let prompts = llm.prompts();
    assert!(prompts[1].contains("failed"));
    assert!(prompts[1].contains("always fails"));
}
