//! Agent - LLM with tool-calling via remote tool servers
//!
//! The tool-using loop:
//! 1. The user message goes to the model along with the rendered tool catalog
//! 2. The model either answers directly or emits marker-delimited tool calls
//! 3. Tool calls execute through the cache manager; results (or their error
//!    text) are fed back to the model as context
//! 4. The loop ends when the model answers without tool calls

mod prompt;
pub use prompt::{format_schema, format_tools_prompt};

use std::sync::Arc;

use anyhow::Result;

use crate::cache::CacheManager;
use crate::conn::{ConnectionManager, ToolInvocation};
use crate::llm::{Llm, Message, Role};
use crate::parser::parse_tool_calls;

/// Maximum number of tool-calling iterations to prevent infinite loops
const MAX_ITERATIONS: usize = 10;

/// An agent that can call tools exposed by configured tool servers
pub struct Agent {
    llm: Box<dyn Llm>,
    conn: Arc<ConnectionManager>,
    cache: Arc<CacheManager>,
    system_prompt: Option<String>,
    history: Vec<Message>,
}

impl Agent {
    pub fn new(llm: Box<dyn Llm>, conn: Arc<ConnectionManager>, cache: Arc<CacheManager>) -> Self {
        Self {
            llm,
            conn,
            cache,
            system_prompt: None,
            history: Vec::new(),
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }

    /// Clear conversation history
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Run a single message through the agent, handling tool calls
    pub async fn chat(&mut self, user_message: &str) -> Result<String> {
        let tools = self.conn.available_tools().await;
        tracing::info!("Agent has {} tools available", tools.len());

        if self.history.is_empty() {
            if let Some(ref system) = self.system_prompt {
                self.history.push(Message {
                    role: Role::System,
                    content: system.clone(),
                });
            }
        }

        let mut message = format!("{}{}", user_message, format_tools_prompt(&tools));
        let mut last_response = String::new();

        for iteration in 1..=MAX_ITERATIONS {
            tracing::debug!("Agent iteration {}", iteration);

            let response = self.llm.chat_with_history(&mut self.history, &message).await?;
            let calls = parse_tool_calls(&response);

            if calls.is_empty() {
                return Ok(response);
            }

            tracing::info!("Model requested {} tool call(s)", calls.len());
            last_response = response;

            let mut results = String::from("Tool results:\n");
            for call in calls {
                let invocation = ToolInvocation::new(&call.name, Some(call.arguments));
                match self.cache.execute_with_cache(invocation).await {
                    Ok(result) if result.success => {
                        results.push_str(&format!("\n[{}]\n{}\n", call.name, result.text()));
                    }
                    Ok(result) => {
                        // Failure text goes back to the model as context
                        results.push_str(&format!(
                            "\n[{}] failed: {}\n",
                            call.name,
                            result.error.as_deref().unwrap_or("unknown error")
                        ));
                    }
                    Err(e) => {
                        results.push_str(&format!("\n[{}] failed: {}\n", call.name, e));
                    }
                }
            }

            message = format!(
                "{}\nAnswer the original question using these results.",
                results
            );
        }

        tracing::warn!("Agent reached max iterations ({}), stopping", MAX_ITERATIONS);
        Ok(last_response)
    }
}
