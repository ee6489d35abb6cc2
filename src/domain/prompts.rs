//! Prompt templates offered to MCP clients

use rust_mcp_sdk::schema::{
    ContentBlock, GetPromptResult, ListPromptsResult, Prompt, PromptArgument, PromptMessage, Role,
    TextContent,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::mcp::rpc::{json_rpc_error, json_rpc_error_with_data, json_rpc_result};

pub const SEARCH_BASED_ON_CODEBASE: &str = "search_based_on_codebase";

#[derive(Debug, Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: Option<serde_json::Map<String, Value>>,
}

const CODEBASE_PROMPT_DESCRIPTION: &str =
    "Search for YouTube videos that are relevant to the codebase.";

pub fn build_prompts_list() -> ListPromptsResult {
    ListPromptsResult {
        meta: None,
        next_cursor: None,
        prompts: vec![Prompt {
            arguments: vec![PromptArgument {
                description: Some("Programming language of the codebase".to_string()),
                name: "language".to_string(),
                required: Some(true),
                title: None,
            }],
            description: Some(CODEBASE_PROMPT_DESCRIPTION.to_string()),
            icons: vec![],
            meta: None,
            name: SEARCH_BASED_ON_CODEBASE.to_string(),
            title: Some("Search YouTube videos based on codebase".to_string()),
        }],
    }
}

pub fn codebase_search_message(language: &str) -> String {
    format!("Search for YouTube videos that are relevant to the codebase in {language} language.")
}

pub fn handle_prompts_get(id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let prompt: GetPromptParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };

    if prompt.name != SEARCH_BASED_ON_CODEBASE {
        return json_rpc_error_with_data(
            id,
            -32602,
            "Invalid params",
            Some(json!({
                "code": "prompt_not_found",
                "message": "unknown prompt name",
                "details": {
                    "name": prompt.name,
                },
            })),
        );
    }

    let language = prompt
        .arguments
        .as_ref()
        .and_then(|arguments| arguments.get("language"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|language| !language.is_empty());

    let Some(language) = language else {
        return json_rpc_error_with_data(
            id,
            -32602,
            "Invalid params",
            Some(json!({
                "code": "missing_argument",
                "message": "language argument is required",
                "details": {},
            })),
        );
    };

    let result = GetPromptResult {
        description: Some(CODEBASE_PROMPT_DESCRIPTION.to_string()),
        messages: vec![PromptMessage {
            content: ContentBlock::from(TextContent::new(
                codebase_search_message(language),
                None,
                None,
            )),
            role: Role::User,
        }],
        meta: None,
    };

    json_rpc_result(
        id,
        serde_json::to_value(result).expect("get prompt result serialization"),
    )
}
