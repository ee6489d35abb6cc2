//! JSON-RPC protocol representations and formatting utilities
//!
//! Provides standardized mapping of internal AppErrors to valid JSON-RPC payloads.

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError,
};
use serde_json::{json, Value};

use crate::errors::AppError;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

/// A message carrying `result` or `error` but no `method` is a reply to a
/// server-initiated request.
pub fn is_json_rpc_response(value: &Value) -> bool {
    value.get("method").is_none()
        && value.get("id").is_some()
        && (value.get("result").is_some() || value.get("error").is_some())
}

pub fn app_error_to_json_rpc(id: Option<Value>, err: AppError) -> Value {
    match err {
        AppError::BadRequest { code, message } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": code,
                "message": message,
                "details": {}
            })),
        ),
        AppError::Upstream { code, message } => {
            tracing::warn!(error = %message, "upstream call failed");
            json_rpc_error_with_data(
                id,
                INTERNAL_ERROR,
                "Internal error",
                Some(json!({
                    "code": code,
                    "message": message,
                    "details": {}
                })),
            )
        }
        AppError::Internal { .. } | AppError::Unauthorized { .. } => {
            json_rpc_error(id, INTERNAL_ERROR, "Internal error")
        }
    }
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let response = JsonrpcErrorResponse::new(
        RpcError {
            code: i64::from(code),
            data,
            message: message.to_string(),
        },
        id.as_ref().and_then(value_to_request_id),
    );
    serde_json::to_value(response).expect("jsonrpc error response serialization")
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let extra = result.as_object().cloned();
        let response = JsonrpcResultResponse::new(request_id, McpResult { meta: None, extra });
        return serde_json::to_value(response).expect("jsonrpc result response serialization");
    }

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}

pub fn request_id_to_value(id: RequestId) -> Value {
    match id {
        RequestId::String(value) => Value::String(value),
        RequestId::Integer(value) => Value::Number(value.into()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{app_error_to_json_rpc, is_json_rpc_response, INTERNAL_ERROR, INVALID_PARAMS};
    use crate::errors::AppError;

    #[test]
    fn recognizes_client_replies() {
        assert!(is_json_rpc_response(
            &json!({"jsonrpc": "2.0", "id": "srv-1", "result": {}})
        ));
        assert!(is_json_rpc_response(
            &json!({"jsonrpc": "2.0", "id": 4, "error": {"code": -1, "message": "no"}})
        ));
        assert!(!is_json_rpc_response(
            &json!({"jsonrpc": "2.0", "id": 4, "method": "ping"})
        ));
        assert!(!is_json_rpc_response(
            &json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
        ));
    }

    #[test]
    fn bad_request_maps_to_invalid_params_with_details() {
        let response = app_error_to_json_rpc(
            Some(json!(7)),
            AppError::bad_request("invalid_max_results", "max_results must be between 1 and 10"),
        );

        assert_eq!(response["id"], 7);
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["data"]["code"], "invalid_max_results");
    }

    #[test]
    fn internal_error_carries_no_details() {
        let response = app_error_to_json_rpc(
            Some(json!(8)),
            AppError::internal("http client could not be built"),
        );

        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
        assert_eq!(response["error"]["message"], "Internal error");
        assert!(response["error"]["data"].is_null());
    }
}
