//! The JSON-RPC-like envelope carried one-per-frame by [`crate::transport`].
//!
//! This is deliberately *not* full JSON-RPC 2.0: there is no batch support
//! and no standardized `error` object yet. Outbound envelopes carry
//! `"jsonrpc": "2.0"` for forward compatibility; inbound envelopes accept
//! and ignore a `jsonrpc` key if present.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RpcError;

/// A request envelope as it arrives off the wire, before its `params` are
/// known to be any particular method's parameter type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub method: String,
    pub params: serde_json::Value,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing)]
    pub jsonrpc: Option<String>,
}

/// A response envelope as it arrives off the wire.
///
/// `id` is absent on server-pushed frames — clients on a stream connection
/// must tolerate that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing)]
    pub jsonrpc: Option<String>,
}

/// Generates a fresh request id when the caller doesn't supply one.
pub fn generate_id() -> serde_json::Value {
    serde_json::Value::String(Uuid::new_v4().to_string())
}

impl RequestEnvelope {
    pub fn new<P: Serialize>(
        method: impl Into<String>,
        params: P,
        id: serde_json::Value,
    ) -> Result<Self, RpcError> {
        let params = serde_json::to_value(params)
            .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
        Ok(Self { method: method.into(), params, id, jsonrpc: None })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RpcError> {
        #[derive(Serialize)]
        struct Wire<'a> {
            method: &'a str,
            params: &'a serde_json::Value,
            id: &'a serde_json::Value,
            jsonrpc: &'static str,
        }
        let wire = Wire { method: &self.method, params: &self.params, id: &self.id, jsonrpc: "2.0" };
        serde_json::to_vec(&wire).map_err(|e| RpcError::MalformedEnvelope(e.to_string()))
    }

    pub fn params_as<P: DeserializeOwned>(&self) -> Result<P, RpcError> {
        serde_json::from_value(self.params.clone())
            .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))
    }
}

impl ResponseEnvelope {
    pub fn new<R: Serialize>(id: serde_json::Value, result: R) -> Result<Self, RpcError> {
        let result = serde_json::to_value(result)
            .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
        Ok(Self { result, id: Some(id), jsonrpc: None })
    }

    /// Builds a server-pushed frame: a well-formed response envelope with no
    /// `id` field.
    pub fn push<R: Serialize>(result: R) -> Result<Self, RpcError> {
        let result = serde_json::to_value(result)
            .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
        Ok(Self { result, id: None, jsonrpc: None })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RpcError> {
        #[derive(Serialize)]
        struct Wire<'a> {
            result: &'a serde_json::Value,
            #[serde(skip_serializing_if = "Option::is_none")]
            id: &'a Option<serde_json::Value>,
            jsonrpc: &'static str,
        }
        let wire = Wire { result: &self.result, id: &self.id, jsonrpc: "2.0" };
        serde_json::to_vec(&wire).map_err(|e| RpcError::MalformedEnvelope(e.to_string()))
    }

    pub fn result_as<R: DeserializeOwned>(&self) -> Result<R, RpcError> {
        serde_json::from_value(self.result.clone())
            .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_json() {
        let req = RequestEnvelope::new("GetUser", serde_json::json!({"user_id": 1}), serde_json::json!(7)).unwrap();
        let bytes = req.to_bytes().unwrap();
        let parsed: RequestEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.method, "GetUser");
        assert_eq!(parsed.id, serde_json::json!(7));
    }

    #[test]
    fn response_without_id_serializes_without_id_field() {
        let resp = ResponseEnvelope::push(serde_json::json!({"message": "hi"})).unwrap();
        let bytes = resp.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn ignores_unexpected_jsonrpc_key_on_receive() {
        let raw = br#"{"method":"GetUser","params":{},"id":1,"jsonrpc":"2.0"}"#;
        let parsed: RequestEnvelope = serde_json::from_slice(raw).unwrap();
        assert_eq!(parsed.method, "GetUser");
    }
}
