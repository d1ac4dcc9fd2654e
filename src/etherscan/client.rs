use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Error produced by the Etherscan gateway: remote API errors, HTTP
/// failures, and non-JSON bodies all normalize into this one shape.
#[derive(Debug, Clone, Error)]
#[error("Etherscan API error: {message}")]
pub struct EtherscanApiError {
    pub message: String,
    pub code: Option<i64>,
    pub chain_id: String,
}

impl EtherscanApiError {
    fn new(message: impl Into<String>, code: Option<i64>, chain_id: &str) -> Self {
        Self {
            message: message.into(),
            code,
            chain_id: chain_id.to_string(),
        }
    }
}

/// Async client for the Etherscan-family explorer APIs.
///
/// Owns the single long-lived HTTP connection pool; constructed once at
/// startup and shared behind an `Arc`. All chains route through the same
/// base URL, selected per request via the `chainid` parameter of the v2 API.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl EtherscanClient {
    pub fn new(config: &Config) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!(
                "Etherscan API key is required. Set the ETHERSCAN_API_KEY environment \
                 variable or the api_key config field"
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            api_key: config.api_key.trim().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue an authenticated GET against the v1 (`/api`) or v2 (`/v2/api`)
    /// endpoint and normalize the response envelope down to its `result`
    /// payload.
    pub(crate) async fn request(
        &self,
        chain_id: &str,
        params: &[(&str, &str)],
        use_v2_api: bool,
    ) -> Result<Value, EtherscanApiError> {
        let endpoint = if use_v2_api { "/v2/api" } else { "/api" };
        let url = format!("{}{}", self.base_url, endpoint);

        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("apikey", &self.api_key));
        if use_v2_api && !params.iter().any(|(key, _)| *key == "chainid") {
            query.push(("chainid", chain_id));
        }

        debug!(chain_id, endpoint, "etherscan request");

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| EtherscanApiError::new(format!("HTTP error: {}", e), None, chain_id))?;

        let body: Value = response.json().await.map_err(|e| {
            EtherscanApiError::new(format!("Invalid JSON response: {}", e), None, chain_id)
        })?;

        normalize_envelope(body, chain_id)
    }
}

/// Collapse the two Etherscan envelope shapes into one success/error shape.
///
/// The v1 shape is `{"status": "1"|"0", "message": ..., "result": ...}`;
/// the v2/JSON-RPC shape is `{"result": ...}` or
/// `{"error": {"code": ..., "message": ...}}`. The shape is detected from
/// the keys present, so a v1-style error returned by the v2 endpoint is
/// still reported as an error.
fn normalize_envelope(body: Value, chain_id: &str) -> Result<Value, EtherscanApiError> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        let code = error.get("code").and_then(Value::as_i64);
        return Err(EtherscanApiError::new(message, code, chain_id));
    }

    if let Some(status) = body.get("status").and_then(Value::as_str) {
        if status == "1" {
            return Ok(body.get("result").cloned().unwrap_or(Value::Null));
        }
        let mut message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        if let Some(detail) = body.get("result").and_then(Value::as_str) {
            message = format!("{}: {}", message, detail);
        }
        return Err(EtherscanApiError::new(message, None, chain_id));
    }

    if let Some(result) = body.get("result") {
        return Ok(result.clone());
    }

    Err(EtherscanApiError::new(
        "Unexpected response shape",
        None,
        chain_id,
    ))
}

/// Render a `result` payload that is expected to be a bare string (balances,
/// hex quantities) without the quoting `Value::to_string` would add.
pub(crate) fn value_as_text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Parse an Ethereum hex quantity (`0x...`) or plain decimal string.
pub(crate) fn parse_quantity(text: &str) -> Option<u64> {
    if let Some(hex_part) = text.strip_prefix("0x") {
        u64::from_str_radix(hex_part, 16).ok()
    } else {
        text.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_v1_success_envelope() {
        let body = json!({"status": "1", "message": "OK", "result": "12345"});
        let result = normalize_envelope(body, "1").unwrap();
        assert_eq!(result, json!("12345"));
    }

    #[test]
    fn test_v1_error_appends_string_result() {
        let body = json!({"status": "0", "message": "NOTOK", "result": "Max rate limit reached"});
        let err = normalize_envelope(body, "1").unwrap_err();
        assert_eq!(err.message, "NOTOK: Max rate limit reached");
        assert_eq!(err.code, None);
        assert_eq!(err.chain_id, "1");
    }

    #[test]
    fn test_v1_error_with_list_result_keeps_message() {
        let body = json!({"status": "0", "message": "No transactions found", "result": []});
        let err = normalize_envelope(body, "137").unwrap_err();
        assert_eq!(err.message, "No transactions found");
    }

    #[test]
    fn test_v2_success_envelope() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": "0x121eac0"});
        let result = normalize_envelope(body, "1").unwrap();
        assert_eq!(result, json!("0x121eac0"));
    }

    #[test]
    fn test_v2_error_envelope() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "invalid argument"}});
        let err = normalize_envelope(body, "56").unwrap_err();
        assert_eq!(err.message, "invalid argument");
        assert_eq!(err.code, Some(-32602));
        assert_eq!(err.chain_id, "56");
    }

    #[test]
    fn test_unexpected_shape() {
        let err = normalize_envelope(json!({"weird": true}), "1").unwrap_err();
        assert_eq!(err.message, "Unexpected response shape");
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x121eac0"), Some(19_000_000));
        assert_eq!(parse_quantity("42"), Some(42));
        assert_eq!(parse_quantity("0x"), None);
        assert_eq!(parse_quantity("nope"), None);
    }

    #[test]
    fn test_value_as_text() {
        assert_eq!(value_as_text(&json!("abc")), "abc");
        assert_eq!(value_as_text(&json!(7)), "7");
    }
}
