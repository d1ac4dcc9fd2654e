/// Display names for the chains commonly routed through the Etherscan v2 API.
///
/// The v2 endpoint accepts any chain ID; this table only affects how results
/// are labelled for the caller, so unknown IDs fall back to a generic label
/// instead of failing.
const NETWORK_NAMES: &[(&str, &str)] = &[
    ("1", "Ethereum Mainnet"),
    ("56", "BSC Mainnet"),
    ("137", "Polygon Mainnet"),
    ("42161", "Arbitrum One"),
    ("10", "Optimism"),
    ("43114", "Avalanche C-Chain"),
    ("250", "Fantom Opera"),
    ("8453", "Base"),
    ("59144", "Linea"),
    ("534352", "Scroll"),
    ("1101", "Polygon zkEVM"),
    ("7777777", "Zora"),
    ("11155111", "Sepolia Testnet"),
    ("5", "Goerli Testnet"),
    ("11155420", "Optimism Sepolia"),
    ("421614", "Arbitrum Sepolia"),
    ("80001", "Mumbai Testnet"),
    ("97", "BSC Testnet"),
    ("43113", "Avalanche Fuji Testnet"),
    ("4002", "Fantom Testnet"),
];

/// Resolve a chain ID to a human-readable network name.
pub fn network_name(chain_id: &str) -> String {
    NETWORK_NAMES
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("Chain ID: {}", chain_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_networks() {
        assert_eq!(network_name("1"), "Ethereum Mainnet");
        assert_eq!(network_name("137"), "Polygon Mainnet");
        assert_eq!(network_name("42161"), "Arbitrum One");
        assert_eq!(network_name("11155111"), "Sepolia Testnet");
    }

    #[test]
    fn test_unknown_network_fallback() {
        assert_eq!(network_name("999999"), "Chain ID: 999999");
        assert_eq!(network_name(""), "Chain ID: ");
    }
}
