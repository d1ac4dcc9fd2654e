use serde::Serialize;
use serde_json::Value;

use super::chains::network_name;
use super::client::{value_as_text, EtherscanClient};

#[derive(Debug, Clone, Serialize)]
pub struct GasOracle {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventLogs {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockByTimestamp {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
    pub closest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    pub network: String,
}

impl EtherscanClient {
    /// Current gas price recommendations from the gas tracker.
    pub async fn gas_oracle(&self, chain_id: &str) -> GasOracle {
        let params = [("module", "gastracker"), ("action", "gasoracle")];

        match self.request(chain_id, &params, false).await {
            Ok(result) => GasOracle {
                success: true,
                error: None,
                gas_price: Some(result),
                network: network_name(chain_id),
            },
            Err(e) => GasOracle {
                success: false,
                error: Some(e.to_string()),
                gas_price: None,
                network: network_name(chain_id),
            },
        }
    }

    /// Contract execution status of a transaction.
    pub async fn transaction_status(&self, chain_id: &str, tx_hash: &str) -> TransactionStatus {
        let params = [
            ("module", "transaction"),
            ("action", "getstatus"),
            ("txhash", tx_hash),
        ];

        match self.request(chain_id, &params, false).await {
            Ok(result) => TransactionStatus {
                success: true,
                error: None,
                tx_hash: tx_hash.to_string(),
                status: Some(result),
                network: network_name(chain_id),
            },
            Err(e) => TransactionStatus {
                success: false,
                error: Some(e.to_string()),
                tx_hash: tx_hash.to_string(),
                status: None,
                network: network_name(chain_id),
            },
        }
    }

    /// Event logs emitted by an address within a block range, optionally
    /// filtered by the first topic.
    pub async fn event_logs(
        &self,
        chain_id: &str,
        address: &str,
        from_block: Option<&str>,
        to_block: Option<&str>,
        topic0: Option<&str>,
        page: &str,
        offset: &str,
    ) -> EventLogs {
        // The logs module takes decimal block numbers (or "latest"), unlike
        // the proxy module's hex tags.
        let mut params = vec![
            ("module", "logs"),
            ("action", "getLogs"),
            ("address", address),
            ("fromBlock", from_block.unwrap_or("0")),
            ("toBlock", to_block.unwrap_or("latest")),
            ("page", page),
            ("offset", offset),
        ];
        if let Some(topic0) = topic0 {
            params.push(("topic0", topic0));
        }

        match self.request(chain_id, &params, true).await {
            Ok(result) => EventLogs {
                success: true,
                error: None,
                address: address.to_string(),
                logs: Some(result),
                network: network_name(chain_id),
            },
            Err(e) => EventLogs {
                success: false,
                error: Some(e.to_string()),
                address: address.to_string(),
                logs: None,
                network: network_name(chain_id),
            },
        }
    }

    /// Number of the block mined closest to a Unix timestamp.
    /// `closest` is `before` (default) or `after`.
    pub async fn block_by_timestamp(
        &self,
        chain_id: &str,
        timestamp: &str,
        closest: Option<&str>,
    ) -> BlockByTimestamp {
        let closest = closest.unwrap_or("before").to_string();
        let params = [
            ("module", "block"),
            ("action", "getblocknobytime"),
            ("timestamp", timestamp),
            ("closest", closest.as_str()),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => BlockByTimestamp {
                success: true,
                error: None,
                timestamp: timestamp.to_string(),
                closest,
                block_number: Some(value_as_text(&result)),
                network: network_name(chain_id),
            },
            Err(e) => BlockByTimestamp {
                success: false,
                error: Some(e.to_string()),
                timestamp: timestamp.to_string(),
                closest,
                block_number: None,
                network: network_name(chain_id),
            },
        }
    }
}
