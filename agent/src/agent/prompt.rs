//! Tool catalog rendering for the model prompt

use serde_json::Value;

use crate::conn::ToolInfo;
use crate::parser::TOOL_CALL_MARKER;

/// Render the available tools as a prompt section
///
/// Lists every tool with its description and a readable schema, then states
/// the marker-delimited call format that the parser decodes. Empty catalogs
/// render nothing so the prompt stays clean when no servers are reachable.
pub fn format_tools_prompt(tools: &[ToolInfo]) -> String {
    if tools.is_empty() {
        return String::new();
    }

    let mut prompt = String::from("\n\nAvailable tools:\n");
    for tool in tools {
        prompt.push_str(&format!(
            "\n**{}**: {}\n",
            tool.name,
            tool.description.as_deref().unwrap_or("")
        ));

        if let Some(ref schema) = tool.input_schema {
            prompt.push_str("Schema: ");
            prompt.push_str(&format_schema(schema));
            prompt.push('\n');
        }
    }

    prompt.push_str(&format!(
        r#"
To use a tool, you MUST respond with a call in this exact format:
{marker}{{"name": "tool_name", "args": {{"param": "value"}}}}

Rules:
- Use the exact parameter names and types from the tool's schema
- Make tool calls as soon as they would help answer the question
- If the user asks you to use a specific tool, use it

Example:
{marker}{{"name": "search", "args": {{"query": "search terms here"}}}}
"#,
        marker = TOOL_CALL_MARKER
    ));

    prompt
}

/// Render a tool's JSON schema as readable parameter documentation
pub fn format_schema(schema: &Value) -> String {
    let mut out = String::new();

    if let Some(kind) = schema.get("type").and_then(Value::as_str) {
        out.push_str(&format!("Type: {}", kind));
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        out.push_str("\nParameters:\n");
        for (name, details) in properties {
            let kind = details
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let description = details
                .get("description")
                .and_then(Value::as_str)
                .map(|d| format!(" - {}", d))
                .unwrap_or_default();
            out.push_str(&format!("  - {} ({}){}\n", name, kind, description));
        }
    }

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        let names: Vec<&str> = required.iter().filter_map(Value::as_str).collect();
        if !names.is_empty() {
            out.push_str(&format!("Required parameters: {}\n", names.join(", ")));
        }
    }

    if out.is_empty() {
        out.push_str("No schema available");
    }
    out
}
