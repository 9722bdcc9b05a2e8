//! JSON-RPC 2.0 envelope types for the MCP server.
//!
//! Provides serialization and deserialization of the request and response
//! envelopes exchanged between the MCP client and server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version stamped on every response.
pub const JSONRPC_VERSION: &str = "2.0";

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_string()
}

/// A JSON-RPC 2.0 request received from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version; defaults to `"2.0"` when omitted.
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    /// The RPC method name.
    pub method: String,
    /// Optional parameters for the method: an object or an array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request identifier, a number or a string.
    /// Absent (or null) for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    /// Builds a request from an already-decoded JSON value.
    ///
    /// Returns a description of the problem if the value is not a
    /// well-formed request envelope.
    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        let request: JsonRpcRequest = serde_json::from_value(value).map_err(|e| e.to_string())?;
        match &request.params {
            None | Some(Value::Object(_)) | Some(Value::Array(_)) => Ok(request),
            Some(_) => Err("params must be an object or an array".to_string()),
        }
    }

    /// Returns `true` if the client expects no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC 2.0 response sent back to the client.
///
/// Exactly one of `result` and `error` is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version; always `"2.0"`.
    pub jsonrpc: String,
    /// The result on success; absent on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// The request identifier this response corresponds to. Absent when the
    /// request could not be read far enough to find one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    /// Creates a successful JSON-RPC response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Creates an error JSON-RPC response.
    pub fn error(id: Option<Value>, code: ErrorCode, message: String) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    /// Creates an error JSON-RPC response carrying additional `data`.
    pub fn error_with_data(
        id: Option<Value>,
        code: ErrorCode,
        message: String,
        data: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(JsonRpcError {
                code: code.as_i32(),
                message,
                data,
            }),
            id,
        }
    }

    /// Returns `true` if this is an error response.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Standard JSON-RPC 2.0 error codes used by this server.
///
/// Caller-input and tool failures are reported as `InternalError`; the
/// message text tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The request is not a valid JSON-RPC request.
    InvalidRequest,
    /// The requested method does not exist.
    MethodNotFound,
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric error code as defined by JSON-RPC 2.0.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InternalError => -32603,
        }
    }
}
