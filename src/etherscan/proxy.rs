use serde::Serialize;
use serde_json::Value;

use super::chains::network_name;
use super::client::{parse_quantity, value_as_text, EtherscanClient};

/// Receipt batches fan out one sub-request per hash; cap the fan-out.
pub const MAX_RECEIPT_BATCH: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct EthCallResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestBlockNumber {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number_hex: Option<String>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockInfo {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionInfo {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionReceipt {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptEntry {
    pub tx_hash: String,
    pub success: bool,
    pub receipt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptBatch {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub requested_hashes: Vec<String>,
    pub receipts_info: Vec<ReceiptEntry>,
    pub successful_count: usize,
    pub total_requested: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionCount {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce_hex: Option<String>,
    pub network: String,
}

/// Normalize a block parameter to the JSON-RPC block-tag convention:
/// absent -> `latest`; the special tags pass through; decimal numbers become
/// `0x`-prefixed hex with no leading zeros; hex strings pass through as-is.
pub fn normalize_block_tag(tag: Option<&str>) -> String {
    match tag.map(str::trim) {
        None | Some("") => "latest".to_string(),
        Some(special @ ("latest" | "earliest" | "pending")) => special.to_string(),
        Some(hex) if hex.starts_with("0x") => hex.to_string(),
        Some(other) => match other.parse::<u64>() {
            Ok(number) => format!("{:#x}", number),
            Err(_) => other.to_string(),
        },
    }
}

impl EtherscanClient {
    /// Read-only contract call with pre-encoded call data.
    pub async fn eth_call(
        &self,
        chain_id: &str,
        to_address: &str,
        data: &str,
        tag: Option<&str>,
    ) -> EthCallResult {
        let tag = normalize_block_tag(tag);
        let params = [
            ("module", "proxy"),
            ("action", "eth_call"),
            ("to", to_address),
            ("data", data),
            ("tag", tag.as_str()),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => EthCallResult {
                success: true,
                error: None,
                result: Some(result),
                network: network_name(chain_id),
            },
            Err(e) => EthCallResult {
                success: false,
                error: Some(e.to_string()),
                result: None,
                network: network_name(chain_id),
            },
        }
    }

    pub async fn latest_block_number(&self, chain_id: &str) -> LatestBlockNumber {
        let params = [("module", "proxy"), ("action", "eth_blockNumber")];

        match self.request(chain_id, &params, true).await {
            Ok(result) => {
                let hex = value_as_text(&result);
                LatestBlockNumber {
                    success: true,
                    error: None,
                    block_number: parse_quantity(&hex),
                    block_number_hex: Some(hex),
                    network: network_name(chain_id),
                }
            }
            Err(e) => LatestBlockNumber {
                success: false,
                error: Some(e.to_string()),
                block_number: None,
                block_number_hex: None,
                network: network_name(chain_id),
            },
        }
    }

    /// Full block contents, transactions included.
    pub async fn block_by_number(&self, chain_id: &str, block_number: &str) -> BlockInfo {
        let tag = normalize_block_tag(Some(block_number));
        let params = [
            ("module", "proxy"),
            ("action", "eth_getBlockByNumber"),
            ("tag", tag.as_str()),
            ("boolean", "true"),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => BlockInfo {
                success: true,
                error: None,
                block: Some(result),
                network: network_name(chain_id),
            },
            Err(e) => BlockInfo {
                success: false,
                error: Some(e.to_string()),
                block: None,
                network: network_name(chain_id),
            },
        }
    }

    pub async fn transaction_by_hash(&self, chain_id: &str, tx_hash: &str) -> TransactionInfo {
        let params = [
            ("module", "proxy"),
            ("action", "eth_getTransactionByHash"),
            ("txhash", tx_hash),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => TransactionInfo {
                success: true,
                error: None,
                tx_hash: tx_hash.to_string(),
                transaction: Some(result),
                network: network_name(chain_id),
            },
            Err(e) => TransactionInfo {
                success: false,
                error: Some(e.to_string()),
                tx_hash: tx_hash.to_string(),
                transaction: None,
                network: network_name(chain_id),
            },
        }
    }

    pub async fn transaction_receipt(&self, chain_id: &str, tx_hash: &str) -> TransactionReceipt {
        let params = [
            ("module", "proxy"),
            ("action", "eth_getTransactionReceipt"),
            ("txhash", tx_hash),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => TransactionReceipt {
                success: true,
                error: None,
                tx_hash: tx_hash.to_string(),
                receipt: Some(result),
                network: network_name(chain_id),
            },
            Err(e) => TransactionReceipt {
                success: false,
                error: Some(e.to_string()),
                tx_hash: tx_hash.to_string(),
                receipt: None,
                network: network_name(chain_id),
            },
        }
    }

    /// Receipts for up to [`MAX_RECEIPT_BATCH`] transactions.
    ///
    /// Sub-requests run sequentially; a failing hash is recorded per item
    /// and never aborts its siblings. The batch reports `success: true` when
    /// it executed at all, alongside a per-item tally.
    pub async fn transaction_receipts(&self, chain_id: &str, tx_hashes: &[String]) -> ReceiptBatch {
        let network = network_name(chain_id);

        if tx_hashes.is_empty() {
            return ReceiptBatch {
                success: false,
                error: Some("Transaction hashes list cannot be empty".to_string()),
                requested_hashes: Vec::new(),
                receipts_info: Vec::new(),
                successful_count: 0,
                total_requested: 0,
                errors: None,
                network,
            };
        }

        if tx_hashes.len() > MAX_RECEIPT_BATCH {
            return ReceiptBatch {
                success: false,
                error: Some(format!(
                    "Maximum {} transaction hashes allowed",
                    MAX_RECEIPT_BATCH
                )),
                requested_hashes: tx_hashes.to_vec(),
                receipts_info: Vec::new(),
                successful_count: 0,
                total_requested: tx_hashes.len(),
                errors: None,
                network,
            };
        }

        let mut receipts_info = Vec::with_capacity(tx_hashes.len());
        let mut errors = Vec::new();

        for tx_hash in tx_hashes {
            let receipt = self.transaction_receipt(chain_id, tx_hash).await;
            if receipt.success {
                receipts_info.push(ReceiptEntry {
                    tx_hash: tx_hash.clone(),
                    success: true,
                    receipt: receipt.receipt,
                    error: None,
                });
            } else {
                let message = receipt.error.unwrap_or_else(|| "Unknown error".to_string());
                errors.push(format!("{}: {}", tx_hash, message));
                receipts_info.push(ReceiptEntry {
                    tx_hash: tx_hash.clone(),
                    success: false,
                    receipt: None,
                    error: Some(message),
                });
            }
        }

        let successful_count = receipts_info.iter().filter(|r| r.success).count();

        ReceiptBatch {
            success: true,
            error: None,
            requested_hashes: tx_hashes.to_vec(),
            receipts_info,
            successful_count,
            total_requested: tx_hashes.len(),
            errors: if errors.is_empty() { None } else { Some(errors) },
            network,
        }
    }

    /// Nonce (outgoing transaction count) of an address.
    pub async fn transaction_count(
        &self,
        chain_id: &str,
        address: &str,
        tag: Option<&str>,
    ) -> TransactionCount {
        let tag = normalize_block_tag(tag);
        let params = [
            ("module", "proxy"),
            ("action", "eth_getTransactionCount"),
            ("address", address),
            ("tag", tag.as_str()),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => {
                let hex = value_as_text(&result);
                TransactionCount {
                    success: true,
                    error: None,
                    address: address.to_string(),
                    nonce: parse_quantity(&hex),
                    nonce_hex: Some(hex),
                    network: network_name(chain_id),
                }
            }
            Err(e) => TransactionCount {
                success: false,
                error: Some(e.to_string()),
                address: address.to_string(),
                nonce: None,
                nonce_hex: None,
                network: network_name(chain_id),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_client() -> EtherscanClient {
        EtherscanClient::new(&Config {
            api_key: "test-key".to_string(),
            ..Config::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_receipt_batch_empty_fails_fast() {
        let result = test_client().transaction_receipts("1", &[]).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Transaction hashes list cannot be empty")
        );
        assert_eq!(result.total_requested, 0);
    }

    #[tokio::test]
    async fn test_receipt_batch_over_cap_fails_fast() {
        let hashes: Vec<String> = (0..21).map(|i| format!("0x{:064x}", i)).collect();
        let result = test_client().transaction_receipts("1", &hashes).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Maximum 20 transaction hashes allowed")
        );
        assert!(result.receipts_info.is_empty());
        assert_eq!(result.total_requested, 21);
    }

    #[test]
    fn test_normalize_block_tag() {
        assert_eq!(normalize_block_tag(None), "latest");
        assert_eq!(normalize_block_tag(Some("")), "latest");
        assert_eq!(normalize_block_tag(Some("latest")), "latest");
        assert_eq!(normalize_block_tag(Some("earliest")), "earliest");
        assert_eq!(normalize_block_tag(Some("pending")), "pending");
        assert_eq!(normalize_block_tag(Some("19000000")), "0x121eac0");
        assert_eq!(normalize_block_tag(Some(" 19000000 ")), "0x121eac0");
        assert_eq!(normalize_block_tag(Some("0")), "0x0");
        assert_eq!(normalize_block_tag(Some("0x121eac0")), "0x121eac0");
        // Unparseable input is passed through for the remote side to reject.
        assert_eq!(normalize_block_tag(Some("nonsense")), "nonsense");
    }
}
