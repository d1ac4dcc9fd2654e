use anyhow::Result;
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    config::Config,
    etherscan::{account::Paging, EtherscanClient},
};

/// MCP server exposing the Etherscan gateway operations as tools.
///
/// The client is built once at startup and shared by every tool invocation;
/// it holds the only outbound connection pool in the process.
#[derive(Debug, Clone)]
pub struct EtherscanMcpServer {
    client: Arc<EtherscanClient>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ChainRequest {
    chain_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct AddressRequest {
    chain_id: String,
    address: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TransactionListRequest {
    chain_id: String,
    address: String,
    start_block: Option<String>,
    end_block: Option<String>,
    page: Option<String>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TransferListRequest {
    chain_id: String,
    address: String,
    contract_address: Option<String>,
    start_block: Option<String>,
    end_block: Option<String>,
    page: Option<String>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TokenBalanceRequest {
    chain_id: String,
    contract_address: String,
    address: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ContractRequest {
    chain_id: String,
    contract_address: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ContractCreationRequest {
    chain_id: String,
    /// Comma-separated list of contract addresses (max 5)
    contract_addresses: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ExecuteMethodRequest {
    chain_id: String,
    contract_address: String,
    /// JSON string containing the single-function method ABI
    method_abi: String,
    /// Comma-separated parameter values; values containing literal commas
    /// cannot be represented
    method_params: Option<String>,
    /// Block tag: latest, earliest, pending, or a block number
    tag: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct EthCallRequest {
    chain_id: String,
    to_address: String,
    /// Hex-encoded call data (0x...)
    data: String,
    tag: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct BlockRequest {
    chain_id: String,
    /// Block number (decimal, hex, or 'latest')
    block_number: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TxHashRequest {
    chain_id: String,
    tx_hash: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TxHashesRequest {
    chain_id: String,
    /// Comma-separated list of transaction hashes (max 20)
    tx_hashes: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TransactionCountRequest {
    chain_id: String,
    address: String,
    tag: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct EventLogsRequest {
    chain_id: String,
    address: String,
    from_block: Option<String>,
    to_block: Option<String>,
    topic0: Option<String>,
    page: Option<String>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct BlockByTimestampRequest {
    chain_id: String,
    /// Unix timestamp in seconds
    timestamp: String,
    /// 'before' (default) or 'after'
    closest: Option<String>,
}

impl EtherscanMcpServer {
    pub fn new(config: Config) -> Result<Self> {
        let client = EtherscanClient::new(&config)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting Etherscan MCP Server");

        let service = self.clone().serve(stdio()).await?;

        info!("Etherscan MCP Server started successfully");
        let _ = service.waiting().await;
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| "Failed to serialize result".to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn paging<'a>(
    start_block: &'a Option<String>,
    end_block: &'a Option<String>,
    page: &'a Option<String>,
    offset: &'a Option<String>,
) -> Paging<'a> {
    Paging {
        start_block: start_block.as_deref(),
        end_block: end_block.as_deref(),
        page: page.as_deref().unwrap_or("1"),
        offset: offset.as_deref().unwrap_or("10"),
    }
}

#[tool(tool_box)]
impl EtherscanMcpServer {
    #[tool(description = "Get the native coin balance of an address")]
    async fn get_account_balance(&self, #[tool(aggr)] request: AddressRequest) -> String {
        let result = self
            .client
            .account_balance(&request.chain_id, &request.address)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get account balance: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get the list of transactions for an address, newest first")]
    async fn get_transactions(&self, #[tool(aggr)] request: TransactionListRequest) -> String {
        let result = self
            .client
            .transactions_by_address(
                &request.chain_id,
                &request.address,
                paging(
                    &request.start_block,
                    &request.end_block,
                    &request.page,
                    &request.offset,
                ),
            )
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get transactions: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get the list of internal transactions for an address")]
    async fn get_internal_transactions(
        &self,
        #[tool(aggr)] request: TransactionListRequest,
    ) -> String {
        let result = self
            .client
            .internal_transactions_by_address(
                &request.chain_id,
                &request.address,
                paging(
                    &request.start_block,
                    &request.end_block,
                    &request.page,
                    &request.offset,
                ),
            )
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get internal transactions: {}", e);
        }
        to_json(&result)
    }

    #[tool(
        description = "Get ERC-20 token transfers for an address, optionally filtered to one token contract"
    )]
    async fn get_token_transfers(&self, #[tool(aggr)] request: TransferListRequest) -> String {
        let result = self
            .client
            .token_transfers_by_address(
                &request.chain_id,
                &request.address,
                request.contract_address.as_deref(),
                paging(
                    &request.start_block,
                    &request.end_block,
                    &request.page,
                    &request.offset,
                ),
            )
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get token transfers: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get ERC-721 (NFT) transfers for an address")]
    async fn get_erc721_transfers(&self, #[tool(aggr)] request: TransferListRequest) -> String {
        let result = self
            .client
            .erc721_transfers_by_address(
                &request.chain_id,
                &request.address,
                request.contract_address.as_deref(),
                paging(
                    &request.start_block,
                    &request.end_block,
                    &request.page,
                    &request.offset,
                ),
            )
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get ERC-721 transfers: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get the ERC-20 token balance of an address for a token contract")]
    async fn get_token_balance(&self, #[tool(aggr)] request: TokenBalanceRequest) -> String {
        let result = self
            .client
            .token_balance(
                &request.chain_id,
                &request.contract_address,
                &request.address,
            )
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get token balance: {}", e);
        }
        to_json(&result)
    }

    #[tool(
        description = "Get token details (name, symbol, decimals, total supply) by reading the standard ERC-20 view methods"
    )]
    async fn get_token_details(&self, #[tool(aggr)] request: ContractRequest) -> String {
        let result = self
            .client
            .token_details(&request.chain_id, &request.contract_address)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get token details: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get the ABI of a verified contract")]
    async fn get_contract_abi(&self, #[tool(aggr)] request: ContractRequest) -> String {
        let result = self
            .client
            .contract_abi(&request.chain_id, &request.contract_address)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get contract ABI: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get the verified source code of a contract")]
    async fn get_contract_source_code(&self, #[tool(aggr)] request: ContractRequest) -> String {
        let result = self
            .client
            .contract_source_code(&request.chain_id, &request.contract_address)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get contract source code: {}", e);
        }
        to_json(&result)
    }

    #[tool(
        description = "Get deployer address and creation transaction hash for up to 5 contracts (comma-separated addresses)"
    )]
    async fn get_contract_creation(
        &self,
        #[tool(aggr)] request: ContractCreationRequest,
    ) -> String {
        let addresses = split_list(&request.contract_addresses);
        let result = self
            .client
            .contract_creation(&request.chain_id, &addresses)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get contract creation info: {}", e);
        }
        to_json(&result)
    }

    #[tool(
        description = "Execute a read-only contract method with automatic ABI encoding of the parameters and decoding of the result"
    )]
    async fn execute_contract_method(&self, #[tool(aggr)] request: ExecuteMethodRequest) -> String {
        let result = self
            .client
            .execute_contract_method(
                &request.chain_id,
                &request.contract_address,
                &request.method_abi,
                request.method_params.as_deref().unwrap_or(""),
                request.tag.as_deref(),
            )
            .await;
        if let Some(e) = &result.error {
            error!("Failed to execute contract method: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Execute a raw eth_call against a contract with pre-encoded call data")]
    async fn eth_call(&self, #[tool(aggr)] request: EthCallRequest) -> String {
        let result = self
            .client
            .eth_call(
                &request.chain_id,
                &request.to_address,
                &request.data,
                request.tag.as_deref(),
            )
            .await;
        if let Some(e) = &result.error {
            error!("eth_call failed: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get the latest block number")]
    async fn get_latest_block_number(&self, #[tool(aggr)] request: ChainRequest) -> String {
        let result = self.client.latest_block_number(&request.chain_id).await;
        if let Some(e) = &result.error {
            error!("Failed to get latest block number: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get block information by block number, transactions included")]
    async fn get_block_by_number(&self, #[tool(aggr)] request: BlockRequest) -> String {
        let result = self
            .client
            .block_by_number(&request.chain_id, &request.block_number)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get block: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get transaction details by hash")]
    async fn get_transaction_by_hash(&self, #[tool(aggr)] request: TxHashRequest) -> String {
        let result = self
            .client
            .transaction_by_hash(&request.chain_id, &request.tx_hash)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get transaction: {}", e);
        }
        to_json(&result)
    }

    #[tool(
        description = "Get the receipt of a transaction, including status, gas usage, and logs"
    )]
    async fn get_transaction_receipt(&self, #[tool(aggr)] request: TxHashRequest) -> String {
        let result = self
            .client
            .transaction_receipt(&request.chain_id, &request.tx_hash)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get transaction receipt: {}", e);
        }
        to_json(&result)
    }

    #[tool(
        description = "Get receipts for up to 20 transactions (comma-separated hashes); failures are reported per hash"
    )]
    async fn get_transaction_receipts(&self, #[tool(aggr)] request: TxHashesRequest) -> String {
        let hashes = split_list(&request.tx_hashes);
        let result = self
            .client
            .transaction_receipts(&request.chain_id, &hashes)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get transaction receipts: {}", e);
        } else if let Some(errors) = &result.errors {
            info!(
                "Some receipts failed ({}/{} succeeded): {}",
                result.successful_count,
                result.total_requested,
                errors.join("; ")
            );
        }
        to_json(&result)
    }

    #[tool(description = "Get the contract execution status of a transaction")]
    async fn get_transaction_status(&self, #[tool(aggr)] request: TxHashRequest) -> String {
        let result = self
            .client
            .transaction_status(&request.chain_id, &request.tx_hash)
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get transaction status: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get the number of transactions sent from an address (its nonce)")]
    async fn get_transaction_count(
        &self,
        #[tool(aggr)] request: TransactionCountRequest,
    ) -> String {
        let result = self
            .client
            .transaction_count(
                &request.chain_id,
                &request.address,
                request.tag.as_deref(),
            )
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get transaction count: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get current gas price recommendations from the gas oracle")]
    async fn get_gas_oracle(&self, #[tool(aggr)] request: ChainRequest) -> String {
        let result = self.client.gas_oracle(&request.chain_id).await;
        if let Some(e) = &result.error {
            error!("Failed to get gas oracle: {}", e);
        }
        to_json(&result)
    }

    #[tool(
        description = "Get event logs emitted by an address within a block range, optionally filtered by topic0"
    )]
    async fn get_event_logs(&self, #[tool(aggr)] request: EventLogsRequest) -> String {
        let result = self
            .client
            .event_logs(
                &request.chain_id,
                &request.address,
                request.from_block.as_deref(),
                request.to_block.as_deref(),
                request.topic0.as_deref(),
                request.page.as_deref().unwrap_or("1"),
                request.offset.as_deref().unwrap_or("10"),
            )
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get event logs: {}", e);
        }
        to_json(&result)
    }

    #[tool(description = "Get the block number mined closest to a Unix timestamp")]
    async fn get_block_by_timestamp(
        &self,
        #[tool(aggr)] request: BlockByTimestampRequest,
    ) -> String {
        let result = self
            .client
            .block_by_timestamp(
                &request.chain_id,
                &request.timestamp,
                request.closest.as_deref(),
            )
            .await;
        if let Some(e) = &result.error {
            error!("Failed to get block by timestamp: {}", e);
        }
        to_json(&result)
    }
}

#[tool(tool_box)]
impl ServerHandler for EtherscanMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("MCP server for Etherscan-family blockchain explorer APIs. Supports account balances, transaction and transfer history, token data, contract ABI and source retrieval, read-only contract method execution with automatic ABI encoding/decoding, transaction receipts, gas oracle, and event logs across EVM chains via a chain_id parameter.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
