//! Model Context Protocol static resource providers
//!
//! Exposes the channel link and the MCP TypeScript SDK documentation as readable resources.

use async_trait::async_trait;
use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceRequestParams, ReadResourceResult, Resource,
    TextResourceContents,
};
use serde_json::{json, Value};

use crate::mcp::rpc::{
    app_error_to_json_rpc, json_rpc_error, json_rpc_error_with_data, json_rpc_result,
};
use crate::{errors::AppError, Services};

pub const CHANNEL_RESOURCE_URI: &str = "https://www.youtube.com/@returngis";
pub const SDK_DOCS_RESOURCE_URI: &str =
    "https://raw.githubusercontent.com/modelcontextprotocol/typescript-sdk/refs/heads/main/README.md";

/// Fetches remote documents served as resource contents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_text(&self, uri: &str) -> Result<String, AppError>;
}

pub struct HttpDocumentSource {
    http: reqwest::Client,
}

impl HttpDocumentSource {
    pub fn new() -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AppError::internal(format!("failed to build http client: {err}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch_text(&self, uri: &str) -> Result<String, AppError> {
        let response = self
            .http
            .get(uri)
            .send()
            .await
            .map_err(|err| AppError::upstream(format!("document fetch failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(format!(
                "document fetch returned status {}",
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|err| AppError::upstream(format!("document body could not be read: {err}")))
    }
}

pub fn build_resources_list() -> Vec<Resource> {
    vec![
        Resource {
            annotations: None,
            description: Some("My personal Youtube channel".to_string()),
            icons: vec![],
            meta: None,
            mime_type: Some("text/plain".to_string()),
            name: "My Youtube Channel".to_string(),
            size: None,
            title: Some("My Youtube Channel".to_string()),
            uri: CHANNEL_RESOURCE_URI.to_string(),
        },
        Resource {
            annotations: None,
            description: Some(
                "Documentation for the Model Context Protocol Typescript SDK".to_string(),
            ),
            icons: vec![],
            meta: None,
            mime_type: Some("text/markdown".to_string()),
            name: "MCP Documentation for Typescript SDK".to_string(),
            size: None,
            title: Some("MCP Typescript SDK Documentation".to_string()),
            uri: SDK_DOCS_RESOURCE_URI.to_string(),
        },
    ]
}

fn text_resource(uri: &str, mime_type: &str, text: String) -> Value {
    serde_json::to_value(ReadResourceResult {
        contents: vec![ReadResourceContent::from(TextResourceContents {
            meta: None,
            mime_type: Some(mime_type.to_string()),
            text,
            uri: uri.to_string(),
        })],
        meta: None,
    })
    .expect("read resource result serialization")
}

pub async fn handle_resources_read(
    services: &Services,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let resource_read: ReadResourceRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };

    match resource_read.uri.as_str() {
        CHANNEL_RESOURCE_URI => json_rpc_result(
            id,
            text_resource(
                CHANNEL_RESOURCE_URI,
                "text/plain",
                format!("My Youtube Channel {CHANNEL_RESOURCE_URI}"),
            ),
        ),
        SDK_DOCS_RESOURCE_URI => match services.documents.fetch_text(SDK_DOCS_RESOURCE_URI).await {
            Ok(text) => json_rpc_result(
                id,
                text_resource(SDK_DOCS_RESOURCE_URI, "text/markdown", text),
            ),
            Err(err) => app_error_to_json_rpc(id, err),
        },
        _ => json_rpc_error_with_data(
            id,
            -32002,
            "Resource not found",
            Some(json!({
                "code": "resource_not_found",
                "message": "unknown resource uri",
                "details": {
                    "uri": resource_read.uri,
                },
            })),
        ),
    }
}
