//! Interactive tools exposed via Model Context Protocol
//!
//! Provides `search_video` and `get_youtube_channel` by delegating to the
//! `VideoPlatform` implementation. Arguments are parsed into a [`ToolRequest`]
//! before anything reaches the platform.

use chrono::{SecondsFormat, Utc};
use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::domain::utils::{
    normalize_caption, normalize_language, normalize_max_results, normalize_query,
    render_channel_results, render_video_results,
};
use crate::mcp::{
    peer::{Peer, SamplingError},
    rpc::{app_error_to_json_rpc, json_rpc_error, json_rpc_error_with_data, json_rpc_result},
};
use crate::{
    errors::AppError,
    youtube_client::{SearchOrder, SearchQuery},
    Services,
};

const REFINE_MAX_TOKENS: u32 = 64;
const FORMAT_MAX_TOKENS: u32 = 1_024;

#[derive(Debug, Default, Deserialize)]
pub struct SearchVideoParams {
    pub q: Option<String>,
    pub max_results: Option<u32>,
    pub language: Option<String>,
    pub caption: Option<String>,
    pub refine_query: Option<bool>,
    pub format_with_model: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelLookupParams {
    pub query: Option<String>,
}

#[macros::mcp_tool(name = "search_video", description = "Search for a video on YouTube")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SearchVideoTool {
    /// The search query for the video
    pub q: String,
    /// Number of results to return, between 1 and 10 (default 5)
    pub max_results: Option<u32>,
    /// Preferred result language as an ISO 639-1 code or BCP-47 tag
    pub language: Option<String>,
    /// Caption filter: any, closed_caption or none
    pub caption: Option<String>,
    /// Ask the client model to rewrite the query before searching
    pub refine_query: Option<bool>,
    /// Ask the client model to format the result list
    pub format_with_model: Option<bool>,
}

#[macros::mcp_tool(
    name = "get_youtube_channel",
    description = "Search for a YouTube channel by its name."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetYoutubeChannelTool {
    /// The name of the YouTube channel to search for
    pub query: String,
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![SearchVideoTool::tool(), GetYoutubeChannelTool::tool()]
}

/// A tool call whose name has been resolved and whose arguments have been
/// decoded into that tool's parameter type.
#[derive(Debug)]
pub enum ToolRequest {
    SearchVideo(SearchVideoParams),
    GetYoutubeChannel(ChannelLookupParams),
}

#[derive(Debug, PartialEq, Eq)]
pub enum ToolParseError {
    UnknownTool(String),
    InvalidArguments,
}

impl ToolRequest {
    pub fn parse(call: CallToolRequestParams) -> Result<Self, ToolParseError> {
        let arguments = Value::Object(call.arguments.unwrap_or_default());
        match call.name.as_str() {
            "search_video" => decode_arguments(arguments).map(Self::SearchVideo),
            "get_youtube_channel" => decode_arguments(arguments).map(Self::GetYoutubeChannel),
            _ => Err(ToolParseError::UnknownTool(call.name)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchVideo(_) => "search_video",
            Self::GetYoutubeChannel(_) => "get_youtube_channel",
        }
    }
}

fn decode_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolParseError> {
    serde_json::from_value(arguments).map_err(|_| ToolParseError::InvalidArguments)
}

pub fn build_search_query(params: &SearchVideoParams) -> Result<SearchQuery, AppError> {
    Ok(SearchQuery {
        query: normalize_query(params.q.clone())?,
        max_results: normalize_max_results(params.max_results)?,
        order: SearchOrder::Relevance,
        relevance_language: normalize_language(params.language.clone())?,
        caption: normalize_caption(params.caption.clone())?,
    })
}

pub async fn handle_tools_call(
    services: &Services,
    peer: &Peer,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };

    let request = match ToolRequest::parse(tool_call) {
        Ok(request) => request,
        Err(ToolParseError::InvalidArguments) => {
            return json_rpc_error(id, -32602, "Invalid params")
        }
        Err(ToolParseError::UnknownTool(name)) => {
            return json_rpc_error_with_data(
                id,
                -32601,
                "Method not found",
                Some(json!({
                    "code": "tool_not_found",
                    "message": "unknown tool name",
                    "details": {
                        "name": name,
                    },
                })),
            )
        }
    };

    let tool_name = request.name();
    let outcome = match request {
        ToolRequest::SearchVideo(params) => search_video(services, peer, params).await,
        ToolRequest::GetYoutubeChannel(params) => get_youtube_channel(services, params).await,
    };

    match outcome {
        Ok(result) => {
            debug!(tool = tool_name, "tool call completed");
            json_rpc_result(
                id,
                serde_json::to_value(result).expect("tool result serialization"),
            )
        }
        Err(err) => app_error_to_json_rpc(id, err),
    }
}

async fn search_video(
    services: &Services,
    peer: &Peer,
    params: SearchVideoParams,
) -> Result<CallToolResult, AppError> {
    let mut query = build_search_query(&params)?;
    let requested_query = query.query.clone();

    if params.refine_query.unwrap_or(false) {
        let prompt = format!(
            "Rewrite the following request as a concise YouTube search query. \
             Reply with the query only.\n\n{}",
            query.query
        );
        match peer.create_message(&prompt, REFINE_MAX_TOKENS).await {
            Ok(refined) => {
                let refined = refined.trim().trim_matches('"').trim();
                if !refined.is_empty() {
                    info!(original = %query.query, refined = %refined, "search query refined");
                    query.query = refined.to_string();
                }
            }
            Err(SamplingError::Unavailable) => {
                debug!("query refinement skipped, sampling unavailable");
            }
            Err(SamplingError::Failed(message)) => return Err(AppError::upstream(message)),
        }
    }

    let videos = services.video_platform.search_videos(&query).await?;
    let rendered = render_video_results(&requested_query, &videos);

    let text = if params.format_with_model.unwrap_or(false) && !videos.is_empty() {
        let prompt = format!(
            "Format these YouTube search results as a short Markdown list. \
             Keep every title and link.\n\n{rendered}"
        );
        match peer.create_message(&prompt, FORMAT_MAX_TOKENS).await {
            Ok(formatted) => formatted,
            Err(SamplingError::Unavailable) => {
                debug!("result formatting skipped, sampling unavailable");
                rendered
            }
            Err(SamplingError::Failed(message)) => return Err(AppError::upstream(message)),
        }
    } else {
        rendered
    };

    let returned = videos.len();
    Ok(CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: None,
        meta: None,
        structured_content: Some(serde_json::Map::from_iter([
            ("videos".to_string(), json!(videos)),
            ("query".to_string(), json!(query.query)),
            ("requested_query".to_string(), json!(requested_query)),
            ("returned".to_string(), json!(returned)),
            ("generated_at_utc".to_string(), json!(generated_at_utc())),
        ])),
    })
}

async fn get_youtube_channel(
    services: &Services,
    params: ChannelLookupParams,
) -> Result<CallToolResult, AppError> {
    let handle = normalize_query(params.query)?;
    let channels = services.video_platform.find_channels(&handle).await?;
    let returned = channels.len();

    Ok(CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(
            render_channel_results(&handle, &channels),
            None,
            None,
        ))],
        is_error: None,
        meta: None,
        structured_content: Some(serde_json::Map::from_iter([
            ("channels".to_string(), json!(channels)),
            ("returned".to_string(), json!(returned)),
            ("generated_at_utc".to_string(), json!(generated_at_utc())),
        ])),
    })
}

fn generated_at_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use rust_mcp_sdk::schema::CallToolRequestParams;
    use serde_json::json;

    use super::{build_search_query, ToolParseError, ToolRequest, SearchVideoParams};
    use crate::youtube_client::{CaptionFilter, SearchOrder};

    fn call(name: &str, arguments: serde_json::Value) -> CallToolRequestParams {
        serde_json::from_value(json!({ "name": name, "arguments": arguments }))
            .expect("call params")
    }

    #[test]
    fn search_defaults_to_five_results_by_relevance() {
        let query = build_search_query(&SearchVideoParams {
            q: Some("cats".to_string()),
            ..Default::default()
        })
        .expect("query should build");

        assert_eq!(query.query, "cats");
        assert_eq!(query.max_results, 5);
        assert_eq!(query.order, SearchOrder::Relevance);
        assert_eq!(query.relevance_language, None);
        assert_eq!(query.caption, CaptionFilter::Any);
    }

    #[test]
    fn rejects_max_results_above_ten() {
        let error = build_search_query(&SearchVideoParams {
            q: Some("cats".to_string()),
            max_results: Some(11),
            ..Default::default()
        })
        .expect_err("expected invalid max_results");

        assert!(error.to_string().contains("bad request"));
    }

    #[test]
    fn rejects_missing_query() {
        let error = build_search_query(&SearchVideoParams::default())
            .expect_err("expected missing query");

        assert!(error.to_string().contains("bad request"));
    }

    #[test]
    fn parses_known_tools_into_variants() {
        let request = ToolRequest::parse(call("search_video", json!({ "q": "cats", "max_results": 3 })))
            .expect("search_video parses");
        assert!(matches!(
            request,
            ToolRequest::SearchVideo(SearchVideoParams { max_results: Some(3), .. })
        ));

        let request = ToolRequest::parse(call("get_youtube_channel", json!({ "query": "@returngis" })))
            .expect("get_youtube_channel parses");
        assert_eq!(request.name(), "get_youtube_channel");
    }

    #[test]
    fn rejects_unknown_tool_and_mistyped_arguments() {
        assert_eq!(
            ToolRequest::parse(call("delete_video", json!({}))).expect_err("unknown tool"),
            ToolParseError::UnknownTool("delete_video".to_string())
        );
        assert_eq!(
            ToolRequest::parse(call("search_video", json!({ "q": "cats", "max_results": "five" })))
                .expect_err("mistyped argument"),
            ToolParseError::InvalidArguments
        );
    }

    #[test]
    fn tools_list_exposes_both_tools() {
        let tools = super::build_tools_list();
        let names: Vec<_> = tools.iter().map(|tool| tool.name.as_str()).collect();
        assert_eq!(names, vec!["search_video", "get_youtube_channel"]);
    }
}
