use serde::Serialize;
use serde_json::Value;

use super::chains::network_name;
use super::client::{value_as_text, EtherscanClient};

#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_wei: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_eth: Option<f64>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionList {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InternalTransactionList {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_transactions: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenTransferList {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_transfers: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NftTransferList {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_transfers: Option<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenBalance {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub address: String,
    pub contract_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    pub network: String,
}

/// Paging window for the list endpoints. Etherscan caps `page * offset` at
/// 10000 records; callers page past that by narrowing the block range.
#[derive(Debug, Clone, Copy)]
pub struct Paging<'a> {
    pub start_block: Option<&'a str>,
    pub end_block: Option<&'a str>,
    pub page: &'a str,
    pub offset: &'a str,
}

impl Default for Paging<'_> {
    fn default() -> Self {
        Self {
            start_block: None,
            end_block: None,
            page: "1",
            offset: "10",
        }
    }
}

impl EtherscanClient {
    /// Native coin balance of an address, in wei and whole coins.
    pub async fn account_balance(&self, chain_id: &str, address: &str) -> AccountBalance {
        let params = [
            ("module", "account"),
            ("action", "balance"),
            ("address", address),
            ("tag", "latest"),
        ];

        match self.request(chain_id, &params, false).await {
            Ok(result) => {
                let balance_wei = value_as_text(&result);
                let balance_eth = balance_wei.parse::<f64>().ok().map(|wei| wei / 1e18);
                AccountBalance {
                    success: true,
                    error: None,
                    address: address.to_string(),
                    balance_wei: Some(balance_wei),
                    balance_eth,
                    network: network_name(chain_id),
                }
            }
            Err(e) => AccountBalance {
                success: false,
                error: Some(e.to_string()),
                address: address.to_string(),
                balance_wei: None,
                balance_eth: None,
                network: network_name(chain_id),
            },
        }
    }

    /// Normal (external) transactions involving an address, newest first.
    pub async fn transactions_by_address(
        &self,
        chain_id: &str,
        address: &str,
        paging: Paging<'_>,
    ) -> TransactionList {
        let result = self
            .address_list_request(chain_id, "txlist", address, None, paging)
            .await;
        match result {
            Ok(transactions) => TransactionList {
                success: true,
                error: None,
                address: address.to_string(),
                transactions: Some(transactions),
                network: network_name(chain_id),
            },
            Err(error) => TransactionList {
                success: false,
                error: Some(error),
                address: address.to_string(),
                transactions: None,
                network: network_name(chain_id),
            },
        }
    }

    /// Internal (message-call) transactions involving an address.
    pub async fn internal_transactions_by_address(
        &self,
        chain_id: &str,
        address: &str,
        paging: Paging<'_>,
    ) -> InternalTransactionList {
        let result = self
            .address_list_request(chain_id, "txlistinternal", address, None, paging)
            .await;
        match result {
            Ok(internal_transactions) => InternalTransactionList {
                success: true,
                error: None,
                address: address.to_string(),
                internal_transactions: Some(internal_transactions),
                network: network_name(chain_id),
            },
            Err(error) => InternalTransactionList {
                success: false,
                error: Some(error),
                address: address.to_string(),
                internal_transactions: None,
                network: network_name(chain_id),
            },
        }
    }

    /// ERC-20 transfers involving an address, optionally filtered to one
    /// token contract.
    pub async fn token_transfers_by_address(
        &self,
        chain_id: &str,
        address: &str,
        contract_address: Option<&str>,
        paging: Paging<'_>,
    ) -> TokenTransferList {
        let result = self
            .address_list_request(chain_id, "tokentx", address, contract_address, paging)
            .await;
        match result {
            Ok(token_transfers) => TokenTransferList {
                success: true,
                error: None,
                address: address.to_string(),
                token_transfers: Some(token_transfers),
                network: network_name(chain_id),
            },
            Err(error) => TokenTransferList {
                success: false,
                error: Some(error),
                address: address.to_string(),
                token_transfers: None,
                network: network_name(chain_id),
            },
        }
    }

    /// ERC-721 (NFT) transfers involving an address.
    pub async fn erc721_transfers_by_address(
        &self,
        chain_id: &str,
        address: &str,
        contract_address: Option<&str>,
        paging: Paging<'_>,
    ) -> NftTransferList {
        let result = self
            .address_list_request(chain_id, "tokennfttx", address, contract_address, paging)
            .await;
        match result {
            Ok(nft_transfers) => NftTransferList {
                success: true,
                error: None,
                address: address.to_string(),
                nft_transfers: Some(nft_transfers),
                network: network_name(chain_id),
            },
            Err(error) => NftTransferList {
                success: false,
                error: Some(error),
                address: address.to_string(),
                nft_transfers: None,
                network: network_name(chain_id),
            },
        }
    }

    /// ERC-20 balance of `address` for one token contract.
    pub async fn token_balance(
        &self,
        chain_id: &str,
        contract_address: &str,
        address: &str,
    ) -> TokenBalance {
        let params = [
            ("module", "account"),
            ("action", "tokenbalance"),
            ("contractaddress", contract_address),
            ("address", address),
            ("tag", "latest"),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => TokenBalance {
                success: true,
                error: None,
                address: address.to_string(),
                contract_address: contract_address.to_string(),
                balance: Some(value_as_text(&result)),
                network: network_name(chain_id),
            },
            Err(e) => TokenBalance {
                success: false,
                error: Some(e.to_string()),
                address: address.to_string(),
                contract_address: contract_address.to_string(),
                balance: None,
                network: network_name(chain_id),
            },
        }
    }

    /// Shared parameter building for the `account` module list actions.
    async fn address_list_request(
        &self,
        chain_id: &str,
        action: &str,
        address: &str,
        contract_address: Option<&str>,
        paging: Paging<'_>,
    ) -> Result<Value, String> {
        let mut params = vec![
            ("module", "account"),
            ("action", action),
            ("address", address),
            ("startblock", paging.start_block.unwrap_or("0")),
            ("endblock", paging.end_block.unwrap_or("99999999")),
            ("page", paging.page),
            ("offset", paging.offset),
            ("sort", "desc"),
        ];
        if let Some(contract) = contract_address {
            params.push(("contractaddress", contract));
        }

        self.request(chain_id, &params, false)
            .await
            .map_err(|e| e.to_string())
    }
}
