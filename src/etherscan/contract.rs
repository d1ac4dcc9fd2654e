use alloy::json_abi::JsonAbi;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::chains::network_name;
use super::client::EtherscanClient;
use super::codec::{self, DecodedResult};

/// Etherscan serves creation info for at most this many contracts per call.
pub const MAX_CREATION_BATCH: usize = 5;

const NAME_ABI: &str = r#"{"inputs":[],"name":"name","outputs":[{"internalType":"string","name":"","type":"string"}],"stateMutability":"view","type":"function"}"#;
const SYMBOL_ABI: &str = r#"{"inputs":[],"name":"symbol","outputs":[{"internalType":"string","name":"","type":"string"}],"stateMutability":"view","type":"function"}"#;
const DECIMALS_ABI: &str = r#"{"inputs":[],"name":"decimals","outputs":[{"internalType":"uint8","name":"","type":"uint8"}],"stateMutability":"view","type":"function"}"#;
const TOTAL_SUPPLY_ABI: &str = r#"{"inputs":[],"name":"totalSupply","outputs":[{"internalType":"uint256","name":"","type":"uint256"}],"stateMutability":"view","type":"function"}"#;

#[derive(Debug, Clone, Serialize)]
pub struct ContractAbi {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub contract_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<String>,
    pub functions: Vec<Value>,
    pub events: Vec<Value>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractSource {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub contract_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructor_arguments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swarm_source: Option<String>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreationInfo {
    pub contract_address: String,
    pub contract_creator: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractCreationBatch {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub requested_addresses: Vec<String>,
    pub creation_info: Vec<CreationInfo>,
    pub network: String,
}

/// Envelope for one contract-method execution: the raw call alongside the
/// codec's view of it.
#[derive(Debug, Clone, Serialize)]
pub struct MethodExecution {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub function_signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_call_data: Option<String>,
    pub input_params: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_result: Option<DecodedResult>,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenDetails {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub contract_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_details: Option<TokenInfo>,
    pub network: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<Value>,
}

impl EtherscanClient {
    /// ABI of a verified contract, with a function/event catalog parsed out
    /// of it for convenience.
    pub async fn contract_abi(&self, chain_id: &str, contract_address: &str) -> ContractAbi {
        let params = [
            ("module", "contract"),
            ("action", "getabi"),
            ("address", contract_address),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => {
                let abi_json = result
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| result.to_string());
                let (functions, events) = catalog_abi(&abi_json);
                ContractAbi {
                    success: true,
                    error: None,
                    contract_address: contract_address.to_string(),
                    abi: Some(abi_json),
                    functions,
                    events,
                    network: network_name(chain_id),
                }
            }
            Err(e) => ContractAbi {
                success: false,
                error: Some(e.to_string()),
                contract_address: contract_address.to_string(),
                abi: None,
                functions: Vec::new(),
                events: Vec::new(),
                network: network_name(chain_id),
            },
        }
    }

    /// Verified source code and compiler metadata of a contract.
    pub async fn contract_source_code(
        &self,
        chain_id: &str,
        contract_address: &str,
    ) -> ContractSource {
        let params = [
            ("module", "contract"),
            ("action", "getsourcecode"),
            ("address", contract_address),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => {
                // The endpoint answers with a one-element list; tolerate a
                // bare object as well.
                let info = match &result {
                    Value::Array(items) => items.first().cloned().unwrap_or(json!({})),
                    Value::Object(_) => result.clone(),
                    _ => json!({}),
                };
                ContractSource {
                    success: true,
                    error: None,
                    contract_address: contract_address.to_string(),
                    source_code: Some(field(&info, "SourceCode")),
                    contract_name: Some(field(&info, "ContractName")),
                    compiler_version: Some(field(&info, "CompilerVersion")),
                    optimization_used: Some(field(&info, "OptimizationUsed")),
                    runs: Some(field(&info, "Runs")),
                    constructor_arguments: Some(field(&info, "ConstructorArguments")),
                    library: Some(field(&info, "Library")),
                    license_type: Some(field(&info, "LicenseType")),
                    proxy: Some(field(&info, "Proxy")),
                    implementation: Some(field(&info, "Implementation")),
                    swarm_source: Some(field(&info, "SwarmSource")),
                    network: network_name(chain_id),
                }
            }
            Err(e) => ContractSource {
                success: false,
                error: Some(e.to_string()),
                contract_address: contract_address.to_string(),
                source_code: None,
                contract_name: None,
                compiler_version: None,
                optimization_used: None,
                runs: None,
                constructor_arguments: None,
                library: None,
                license_type: None,
                proxy: None,
                implementation: None,
                swarm_source: None,
                network: network_name(chain_id),
            },
        }
    }

    /// Deployer address and creation transaction for up to
    /// [`MAX_CREATION_BATCH`] contracts. The cap is enforced before any
    /// request is issued.
    pub async fn contract_creation(
        &self,
        chain_id: &str,
        contract_addresses: &[String],
    ) -> ContractCreationBatch {
        let network = network_name(chain_id);

        if contract_addresses.is_empty() {
            return ContractCreationBatch {
                success: false,
                error: Some("Contract addresses list cannot be empty".to_string()),
                requested_addresses: Vec::new(),
                creation_info: Vec::new(),
                network,
            };
        }

        if contract_addresses.len() > MAX_CREATION_BATCH {
            return ContractCreationBatch {
                success: false,
                error: Some(format!(
                    "Maximum {} contract addresses allowed",
                    MAX_CREATION_BATCH
                )),
                requested_addresses: contract_addresses.to_vec(),
                creation_info: Vec::new(),
                network,
            };
        }

        let addresses_param = contract_addresses.join(",");
        let params = [
            ("module", "contract"),
            ("action", "getcontractcreation"),
            ("contractaddresses", addresses_param.as_str()),
        ];

        match self.request(chain_id, &params, true).await {
            Ok(result) => {
                let creation_info = match &result {
                    Value::Array(items) => items.iter().map(creation_entry).collect(),
                    Value::Object(_) => vec![creation_entry(&result)],
                    _ => Vec::new(),
                };
                ContractCreationBatch {
                    success: true,
                    error: None,
                    requested_addresses: contract_addresses.to_vec(),
                    creation_info,
                    network,
                }
            }
            Err(e) => ContractCreationBatch {
                success: false,
                error: Some(e.to_string()),
                requested_addresses: contract_addresses.to_vec(),
                creation_info: Vec::new(),
                network,
            },
        }
    }

    /// Execute a read-only contract method: encode the call from its ABI
    /// fragment and parameter string, run it through `eth_call`, and decode
    /// the returned payload against the same fragment.
    pub async fn execute_contract_method(
        &self,
        chain_id: &str,
        contract_address: &str,
        method_abi: &str,
        method_params: &str,
        tag: Option<&str>,
    ) -> MethodExecution {
        // Reconstruct the signature even when encoding fails below, so the
        // failure result still identifies the attempted call.
        let function_signature = codec::parse_fragment(method_abi)
            .map(|fragment| fragment.signature())
            .unwrap_or_else(|_| "unknown".to_string());

        let call_data = match codec::encode_function_call(method_abi, method_params) {
            Ok(encoded) => format!("0x{}", encoded),
            Err(e) => {
                return MethodExecution {
                    success: false,
                    error: Some(format!("Error encoding function call: {}", e)),
                    result: None,
                    function_signature,
                    encoded_call_data: None,
                    input_params: method_params.to_string(),
                    decoded_result: None,
                    network: network_name(chain_id),
                }
            }
        };

        debug!(
            signature = function_signature.as_str(),
            contract_address, "executing contract method"
        );
        let call = self
            .eth_call(chain_id, contract_address, &call_data, tag)
            .await;

        let decoded_result = if call.success {
            call.result
                .as_ref()
                .and_then(Value::as_str)
                .filter(|raw| !raw.is_empty())
                .map(|raw| codec::decode_function_result(raw, method_abi))
        } else {
            None
        };

        MethodExecution {
            success: call.success,
            error: call.error,
            result: call.result,
            function_signature,
            encoded_call_data: Some(call_data),
            input_params: method_params.to_string(),
            decoded_result,
            network: network_name(chain_id),
        }
    }

    /// Token name, symbol, decimals, and total supply, read through the
    /// standard ERC-20 view methods.
    pub async fn token_details(&self, chain_id: &str, contract_address: &str) -> TokenDetails {
        let abi_result = self.contract_abi(chain_id, contract_address).await;
        if !abi_result.success {
            return TokenDetails {
                success: false,
                error: Some("Could not retrieve contract ABI".to_string()),
                contract_address: contract_address.to_string(),
                token_details: None,
                network: network_name(chain_id),
            };
        }

        let info = TokenInfo {
            name: self.read_token_field(chain_id, contract_address, NAME_ABI).await,
            symbol: self
                .read_token_field(chain_id, contract_address, SYMBOL_ABI)
                .await,
            decimals: self
                .read_token_field(chain_id, contract_address, DECIMALS_ABI)
                .await,
            total_supply: self
                .read_token_field(chain_id, contract_address, TOTAL_SUPPLY_ABI)
                .await,
        };

        TokenDetails {
            success: true,
            error: None,
            contract_address: contract_address.to_string(),
            token_details: Some(info),
            network: network_name(chain_id),
        }
    }

    async fn read_token_field(
        &self,
        chain_id: &str,
        contract_address: &str,
        method_abi: &str,
    ) -> Option<Value> {
        let execution = self
            .execute_contract_method(chain_id, contract_address, method_abi, "", None)
            .await;
        if !execution.success {
            return None;
        }
        execution
            .decoded_result
            .map(|decoded| decoded.decoded_data)
            .filter(|data| !data.is_null())
    }
}

fn catalog_abi(abi_json: &str) -> (Vec<Value>, Vec<Value>) {
    let abi: JsonAbi = match serde_json::from_str(abi_json) {
        Ok(abi) => abi,
        // An unparseable ABI still gets returned raw; only the catalog is lost.
        Err(_) => return (Vec::new(), Vec::new()),
    };

    let functions = abi
        .functions()
        .map(|function| {
            json!({
                "name": function.name,
                "inputs": serde_json::to_value(&function.inputs).unwrap_or_default(),
                "outputs": serde_json::to_value(&function.outputs).unwrap_or_default(),
                "stateMutability": serde_json::to_value(function.state_mutability).unwrap_or_default(),
            })
        })
        .collect();

    let events = abi
        .events()
        .map(|event| {
            json!({
                "name": event.name,
                "inputs": serde_json::to_value(&event.inputs).unwrap_or_default(),
            })
        })
        .collect();

    (functions, events)
}

fn creation_entry(item: &Value) -> CreationInfo {
    CreationInfo {
        contract_address: field(item, "contractAddress"),
        contract_creator: field(item, "contractCreator"),
        tx_hash: field(item, "txHash"),
    }
}

fn field(info: &Value, key: &str) -> String {
    info.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
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
    async fn test_creation_batch_empty_fails_fast() {
        let result = test_client().contract_creation("1", &[]).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Contract addresses list cannot be empty")
        );
    }

    #[tokio::test]
    async fn test_creation_batch_over_cap_fails_fast() {
        let six: Vec<String> = (0..6).map(|i| format!("0x{:040x}", i)).collect();
        let result = test_client().contract_creation("1", &six).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Maximum 5 contract addresses allowed")
        );
        assert!(result.creation_info.is_empty());
        assert_eq!(result.requested_addresses.len(), 6);
    }

    #[tokio::test]
    async fn test_execute_method_encoding_failure_skips_call() {
        let result = test_client()
            .execute_contract_method("1", "0x0000000000000000000000000000000000000000", "not json", "", None)
            .await;
        assert!(!result.success);
        assert_eq!(result.function_signature, "unknown");
        assert!(result
            .error
            .unwrap()
            .starts_with("Error encoding function call"));
        assert!(result.encoded_call_data.is_none());
        assert!(result.decoded_result.is_none());
    }

    #[tokio::test]
    async fn test_execute_method_arity_failure_keeps_signature() {
        let abi = r#"{"name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"type":"bool"}]}"#;
        let result = test_client()
            .execute_contract_method(
                "1",
                "0x0000000000000000000000000000000000000000",
                abi,
                "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
                None,
            )
            .await;
        assert!(!result.success);
        assert_eq!(result.function_signature, "transfer(address,uint256)");
        assert!(result.encoded_call_data.is_none());
    }

    #[test]
    fn test_catalog_abi() {
        let abi = r#"[
            {"type":"function","name":"decimals","inputs":[],"outputs":[{"name":"","type":"uint8"}],"stateMutability":"view"},
            {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
            {"type":"event","name":"Transfer","inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}],"anonymous":false}
        ]"#;
        let (functions, events) = catalog_abi(abi);
        assert_eq!(functions.len(), 2);
        assert_eq!(events.len(), 1);
        assert_eq!(functions[0]["name"], "decimals");
        assert_eq!(events[0]["name"], "Transfer");
    }

    #[test]
    fn test_catalog_abi_tolerates_garbage() {
        assert_eq!(catalog_abi("Contract source code not verified"), (Vec::new(), Vec::new()));
    }

    #[test]
    fn test_creation_entry_mapping() {
        let item = serde_json::json!({
            "contractAddress": "0xabc",
            "contractCreator": "0xdef",
            "txHash": "0x123"
        });
        let info = creation_entry(&item);
        assert_eq!(info.contract_address, "0xabc");
        assert_eq!(info.contract_creator, "0xdef");
        assert_eq!(info.tx_hash, "0x123");
    }
}
