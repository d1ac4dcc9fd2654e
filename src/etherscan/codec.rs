use alloy::{
    dyn_abi::{DynSolType, DynSolValue, Word},
    primitives::{keccak256, Address, I256, U256},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

/// Failure while turning an ABI fragment plus parameter string into call data.
///
/// Carries the underlying cause as a plain message; callers wrap it into a
/// `success: false` result rather than propagating it further.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EncodingError(String);

impl EncodingError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A single-function ABI fragment as supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionFragment {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    #[allow(dead_code)]
    #[serde(default, rename = "stateMutability")]
    pub state_mutability: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl FunctionFragment {
    /// Canonical signature `name(type1,type2,...)` built from the declared
    /// input types in order.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.ty.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }
}

/// Parse a JSON-serialized single-function ABI fragment.
pub fn parse_fragment(method_abi: &str) -> Result<FunctionFragment, EncodingError> {
    serde_json::from_str(method_abi)
        .map_err(|e| EncodingError::new(format!("invalid method ABI: {}", e)))
}

/// The 4-byte function selector: first 4 bytes of Keccak-256 over the
/// canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Closed classification of ABI type spellings.
///
/// Derived once per type string; all encode/decode/format dispatch goes
/// through this instead of scattered prefix tests. Arrays and tuples fall
/// into `Other` and are handled best-effort only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Unsigned,
    Signed,
    Address,
    Bool,
    String,
    Bytes,
    Other,
}

impl TypeFamily {
    pub fn of(ty: &str) -> Self {
        if ty.ends_with(']') || ty == "tuple" || ty.starts_with("tuple(") {
            return Self::Other;
        }
        if ty.starts_with("uint") {
            Self::Unsigned
        } else if ty.starts_with("int") {
            Self::Signed
        } else if ty == "address" {
            Self::Address
        } else if ty == "bool" {
            Self::Bool
        } else if ty == "string" {
            Self::String
        } else if ty.starts_with("bytes") {
            Self::Bytes
        } else {
            Self::Other
        }
    }
}

/// Result of decoding an `eth_call` return payload.
///
/// `decoded_data` is a single formatted scalar when the ABI declares exactly
/// one output, and a name-keyed map (declaration order preserved) when it
/// declares more. Decode failures are reported through `error` while the raw
/// payload and type metadata stay available for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedResult {
    pub raw_data: String,
    pub decoded_data: Value,
    pub output_types: Vec<String>,
    pub output_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DecodedResult {
    fn undecoded(raw: &str, types: Vec<String>, names: Vec<String>, error: String) -> Self {
        Self {
            raw_data: raw.to_string(),
            decoded_data: Value::Null,
            output_types: types,
            output_names: names,
            values_count: None,
            error: Some(error),
            note: None,
        }
    }
}

/// Encode a function call: JSON ABI fragment + comma-separated parameter
/// values -> lowercase hex call data (selector plus arguments, no `0x`).
pub fn encode_function_call(method_abi: &str, method_params: &str) -> Result<String, EncodingError> {
    let fragment = parse_fragment(method_abi)?;
    encode_call(&fragment, method_params)
}

pub fn encode_call(fragment: &FunctionFragment, method_params: &str) -> Result<String, EncodingError> {
    let tokens = split_params(method_params);
    if tokens.len() < fragment.inputs.len() {
        return Err(EncodingError::new(format!(
            "function '{}' expects {} parameter(s), got {}",
            fragment.name,
            fragment.inputs.len(),
            tokens.len()
        )));
    }

    // Tokens beyond the declared input count are ignored.
    let mut values = Vec::with_capacity(fragment.inputs.len());
    for (i, (input, token)) in fragment.inputs.iter().zip(&tokens).enumerate() {
        let value = coerce_param(token, &input.ty)
            .map_err(|e| EncodingError::new(format!("parameter {} ('{}'): {}", i + 1, input.name, e)))?;
        values.push(value);
    }

    let mut call_data = selector(&fragment.signature()).to_vec();
    call_data.extend(DynSolValue::Tuple(values).abi_encode_params());
    Ok(hex::encode(call_data))
}

/// Split the flat parameter string on bare commas, trimming each token.
/// Values containing literal commas cannot be represented in this format.
fn split_params(method_params: &str) -> Vec<&str> {
    if method_params.trim().is_empty() {
        return Vec::new();
    }
    method_params.split(',').map(str::trim).collect()
}

/// Coerce one string token to the `DynSolValue` required by the declared
/// ABI type.
fn coerce_param(token: &str, ty: &str) -> Result<DynSolValue, EncodingError> {
    let sol_type = DynSolType::parse(ty)
        .map_err(|e| EncodingError::new(format!("unsupported type '{}': {}", ty, e)))?;

    match TypeFamily::of(ty) {
        TypeFamily::Unsigned => {
            let value = parse_u256(token)?;
            let bits = match sol_type {
                DynSolType::Uint(bits) => bits,
                _ => 256,
            };
            Ok(DynSolValue::Uint(value, bits))
        }
        TypeFamily::Signed => {
            let value = parse_i256(token)?;
            let bits = match sol_type {
                DynSolType::Int(bits) => bits,
                _ => 256,
            };
            Ok(DynSolValue::Int(value, bits))
        }
        TypeFamily::Address => token
            .parse::<Address>()
            .map(DynSolValue::Address)
            .map_err(|e| EncodingError::new(format!("invalid address '{}': {}", token, e))),
        TypeFamily::Bool => {
            let truthy = matches!(token.to_ascii_lowercase().as_str(), "true" | "1" | "yes");
            Ok(DynSolValue::Bool(truthy))
        }
        TypeFamily::String => Ok(DynSolValue::String(token.to_string())),
        TypeFamily::Bytes => {
            let bytes = if let Some(hex_part) = token.strip_prefix("0x") {
                hex::decode(hex_part)
                    .map_err(|e| EncodingError::new(format!("invalid hex '{}': {}", token, e)))?
            } else {
                token.as_bytes().to_vec()
            };
            match sol_type {
                DynSolType::FixedBytes(size) => {
                    let mut word = Word::ZERO;
                    let len = bytes.len().min(32);
                    word[..len].copy_from_slice(&bytes[..len]);
                    Ok(DynSolValue::FixedBytes(word, size))
                }
                _ => Ok(DynSolValue::Bytes(bytes)),
            }
        }
        // Arrays, tuples, and anything else we do not model: best effort via
        // the dyn-abi string coercion.
        TypeFamily::Other => sol_type
            .coerce_str(token)
            .map_err(|e| EncodingError::new(format!("cannot coerce '{}' as '{}': {}", token, ty, e))),
    }
}

fn parse_u256(token: &str) -> Result<U256, EncodingError> {
    let parsed = if let Some(hex_part) = token.strip_prefix("0x") {
        U256::from_str_radix(hex_part, 16)
    } else {
        U256::from_str_radix(token, 10)
    };
    parsed.map_err(|e| EncodingError::new(format!("invalid unsigned integer '{}': {}", token, e)))
}

fn parse_i256(token: &str) -> Result<I256, EncodingError> {
    let parsed = if let Some(hex_part) = token.strip_prefix("0x") {
        U256::from_str_radix(hex_part, 16)
            .map(I256::from_raw)
            .map_err(|e| e.to_string())
    } else {
        I256::from_str(token).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| EncodingError::new(format!("invalid signed integer '{}': {}", token, e)))
}

/// Decode an `eth_call` result against the fragment's declared outputs.
///
/// Never fails hard: malformed input or a decode mismatch produces a
/// `DecodedResult` with `decoded_data = null` and an `error` message, so the
/// caller can still inspect `raw_data` and the type metadata.
pub fn decode_function_result(result_hex: &str, method_abi: &str) -> DecodedResult {
    match parse_fragment(method_abi) {
        Ok(fragment) => decode_result(result_hex, &fragment),
        Err(e) => DecodedResult::undecoded(
            result_hex,
            Vec::new(),
            Vec::new(),
            format!("Error decoding result: {}", e),
        ),
    }
}

pub fn decode_result(result_hex: &str, fragment: &FunctionFragment) -> DecodedResult {
    let output_types: Vec<String> = fragment.outputs.iter().map(|o| o.ty.clone()).collect();
    let output_names: Vec<String> = fragment
        .outputs
        .iter()
        .enumerate()
        .map(|(i, o)| {
            if o.name.is_empty() {
                format!("output_{}", i)
            } else {
                o.name.clone()
            }
        })
        .collect();

    if result_hex.is_empty() || result_hex == "0x" || result_hex == "0x0" {
        let error = if result_hex == "0x" {
            "Empty result"
        } else {
            "No data to decode"
        };
        return DecodedResult::undecoded(result_hex, output_types, output_names, error.to_string());
    }

    // Without declared outputs there is nothing to decode against; hand the
    // raw payload back verbatim.
    if fragment.outputs.is_empty() {
        return DecodedResult {
            raw_data: result_hex.to_string(),
            decoded_data: Value::String(result_hex.to_string()),
            output_types,
            output_names,
            values_count: None,
            error: None,
            note: Some("No outputs defined in ABI".to_string()),
        };
    }

    let hex_data = result_hex.strip_prefix("0x").unwrap_or(result_hex);
    let bytes = match hex::decode(hex_data) {
        Ok(bytes) => bytes,
        Err(e) => {
            return DecodedResult::undecoded(
                result_hex,
                output_types,
                output_names,
                format!("Decode error: {}", e),
            )
        }
    };

    let mut sol_types = Vec::with_capacity(output_types.len());
    for ty in &output_types {
        match DynSolType::parse(ty) {
            Ok(sol_type) => sol_types.push(sol_type),
            Err(e) => {
                let msg = format!("Decode error: unsupported type '{}': {}", ty, e);
                return DecodedResult::undecoded(
                    result_hex,
                    output_types,
                    output_names,
                    msg,
                )
            }
        }
    }

    let decoded = match DynSolType::Tuple(sol_types).abi_decode_params(&bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            return DecodedResult::undecoded(
                result_hex,
                output_types,
                output_names,
                format!("Decode error: {}", e),
            )
        }
    };
    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        single => vec![single],
    };

    let values_count = values.len();
    let decoded_data = if values_count == 1 {
        format_value(&values[0])
    } else {
        let mut fields = Map::new();
        for (i, value) in values.iter().enumerate() {
            let key = output_names
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("output_{}", i));
            fields.insert(key, format_value(value));
        }
        Value::Object(fields)
    };

    DecodedResult {
        raw_data: result_hex.to_string(),
        decoded_data,
        output_types,
        output_names,
        values_count: Some(values_count),
        error: None,
        note: None,
    }
}

/// Render a decoded value by type family: addresses and bytes as `0x` hex,
/// integers as numbers (decimal strings past 64 bits), strings as text.
fn format_value(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(addr) => Value::String(format!("0x{:x}", addr)),
        DynSolValue::Uint(num, _) => match u64::try_from(*num) {
            Ok(small) => Value::Number(small.into()),
            Err(_) => Value::String(num.to_string()),
        },
        DynSolValue::Int(num, _) => match i64::try_from(*num) {
            Ok(small) => Value::Number(small.into()),
            Err(_) => Value::String(num.to_string()),
        },
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(format_value).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BALANCE_OF_ABI: &str = r#"{"name":"balanceOf","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}"#;
    const DECIMALS_ABI: &str = r#"{"name":"decimals","inputs":[],"outputs":[{"type":"uint8"}]}"#;
    const VITALIK: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    #[test]
    fn test_selector_derivation() {
        assert_eq!(selector("decimals()"), [0x31, 0x3c, 0xe5, 0x67]);
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_ne!(
            selector("transfer(address,uint256)"),
            selector("transfer(address,uint256,uint256)")
        );
    }

    #[test]
    fn test_type_family_classification() {
        assert_eq!(TypeFamily::of("uint256"), TypeFamily::Unsigned);
        assert_eq!(TypeFamily::of("uint8"), TypeFamily::Unsigned);
        assert_eq!(TypeFamily::of("int128"), TypeFamily::Signed);
        assert_eq!(TypeFamily::of("address"), TypeFamily::Address);
        assert_eq!(TypeFamily::of("bool"), TypeFamily::Bool);
        assert_eq!(TypeFamily::of("string"), TypeFamily::String);
        assert_eq!(TypeFamily::of("bytes32"), TypeFamily::Bytes);
        assert_eq!(TypeFamily::of("bytes"), TypeFamily::Bytes);
        assert_eq!(TypeFamily::of("uint256[]"), TypeFamily::Other);
        assert_eq!(TypeFamily::of("tuple"), TypeFamily::Other);
    }

    #[test]
    fn test_encode_no_params() {
        let data = encode_function_call(DECIMALS_ABI, "").unwrap();
        assert_eq!(data, "313ce567");
        // Blank parameter strings mean zero arguments.
        assert_eq!(encode_function_call(DECIMALS_ABI, "   ").unwrap(), "313ce567");
    }

    #[test]
    fn test_encode_address_param() {
        let data = encode_function_call(BALANCE_OF_ABI, VITALIK).unwrap();
        assert_eq!(
            data,
            concat!(
                "70a08231",
                "000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045"
            )
        );
    }

    #[test]
    fn test_encode_transfer() {
        let abi = r#"{"name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"type":"bool"}]}"#;
        let data = encode_function_call(abi, &format!("{}, 1000", VITALIK)).unwrap();
        assert_eq!(
            data,
            concat!(
                "a9059cbb",
                "000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045",
                "00000000000000000000000000000000000000000000000000000000000003e8"
            )
        );
    }

    #[test]
    fn test_encode_hex_integer_and_bool() {
        let abi = r#"{"name":"setFlag","inputs":[{"name":"slot","type":"uint256"},{"name":"on","type":"bool"}],"outputs":[]}"#;
        let data = encode_function_call(abi, "0xff, yes").unwrap();
        let args = &data[8..];
        assert!(args.starts_with(&"0".repeat(62)));
        assert_eq!(&args[62..64], "ff");
        assert_eq!(args[64..].to_string(), format!("{:0>64}", "1"));
    }

    #[test]
    fn test_encode_arity_mismatch_fails() {
        let abi = r#"{"name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[]}"#;
        let err = encode_function_call(abi, VITALIK).unwrap_err();
        assert!(err.to_string().contains("expects 2 parameter(s), got 1"));
    }

    #[test]
    fn test_encode_surplus_params_ignored() {
        let data = encode_function_call(DECIMALS_ABI, "42, extra").unwrap();
        assert_eq!(data, "313ce567");
    }

    #[test]
    fn test_encode_malformed_abi() {
        assert!(encode_function_call("not json", "").is_err());
        assert!(encode_function_call(r#"{"inputs":[]}"#, "").is_err()); // missing name
    }

    #[test]
    fn test_encode_bad_integer_fails() {
        let abi = r#"{"name":"f","inputs":[{"name":"n","type":"uint256"}],"outputs":[]}"#;
        let err = encode_function_call(abi, "not-a-number").unwrap_err();
        assert!(err.to_string().contains("not-a-number"));
    }

    #[test]
    fn test_decode_empty_result_markers() {
        let decoded = decode_function_result("0x", DECIMALS_ABI);
        assert_eq!(decoded.decoded_data, Value::Null);
        assert_eq!(decoded.error.as_deref(), Some("Empty result"));
        assert_eq!(decoded.output_types, vec!["uint8"]);

        for raw in ["", "0x0"] {
            let decoded = decode_function_result(raw, DECIMALS_ABI);
            assert_eq!(decoded.decoded_data, Value::Null);
            assert_eq!(decoded.error.as_deref(), Some("No data to decode"));
        }
    }

    #[test]
    fn test_decode_without_outputs_passes_through() {
        let abi = r#"{"name":"doThing","inputs":[],"outputs":[]}"#;
        let raw = "0x0000000000000000000000000000000000000000000000000000000000000001";
        let decoded = decode_function_result(raw, abi);
        assert_eq!(decoded.decoded_data, Value::String(raw.to_string()));
        assert_eq!(decoded.note.as_deref(), Some("No outputs defined in ABI"));
        assert!(decoded.error.is_none());
    }

    #[test]
    fn test_decode_single_output_is_scalar() {
        let raw = "0x0000000000000000000000000000000000000000000000000000000000000006";
        let decoded = decode_function_result(raw, DECIMALS_ABI);
        assert_eq!(decoded.decoded_data, json!(6));
        assert_eq!(decoded.values_count, Some(1));
        assert!(decoded.error.is_none());
    }

    #[test]
    fn test_decode_address_output() {
        let abi = r#"{"name":"owner","inputs":[],"outputs":[{"name":"owner","type":"address"}]}"#;
        let raw = "0x000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045";
        let decoded = decode_function_result(raw, abi);
        assert_eq!(
            decoded.decoded_data,
            json!("0xd8da6bf26964af9d7eed9e03e53415d37aa96045")
        );
    }

    #[test]
    fn test_decode_multiple_outputs_keyed_by_name() {
        let abi = r#"{"name":"info","inputs":[],"outputs":[{"name":"owner","type":"address"},{"type":"uint256"}]}"#;
        let raw = concat!(
            "0x",
            "000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045",
            "0000000000000000000000000000000000000000000000000000000000000007"
        );
        let decoded = decode_function_result(raw, abi);
        let fields = decoded.decoded_data.as_object().unwrap();
        assert_eq!(
            fields.get("owner"),
            Some(&json!("0xd8da6bf26964af9d7eed9e03e53415d37aa96045"))
        );
        assert_eq!(fields.get("output_1"), Some(&json!(7)));
        // Declaration order is preserved for iteration.
        let keys: Vec<&String> = fields.keys().collect();
        assert_eq!(keys, vec!["owner", "output_1"]);
        assert_eq!(decoded.values_count, Some(2));
    }

    #[test]
    fn test_decode_large_uint_as_decimal_string() {
        let abi = r#"{"name":"totalSupply","inputs":[],"outputs":[{"type":"uint256"}]}"#;
        // 2^128, past what a JSON number can carry losslessly.
        let raw = "0x0000000000000000000000000000000100000000000000000000000000000000";
        let decoded = decode_function_result(raw, abi);
        assert_eq!(
            decoded.decoded_data,
            json!("340282366920938463463374607431768211456")
        );
    }

    #[test]
    fn test_decode_error_is_soft() {
        let raw = "0x1234"; // too short for a uint256 word
        let decoded = decode_function_result(raw, DECIMALS_ABI);
        assert_eq!(decoded.decoded_data, Value::Null);
        assert!(decoded.error.as_deref().unwrap().starts_with("Decode error"));
        assert_eq!(decoded.raw_data, raw);
    }

    #[test]
    fn test_round_trip() {
        let abi = r#"{"name":"f",
            "inputs":[{"name":"a","type":"address"},{"name":"b","type":"uint256"},{"name":"c","type":"bool"},{"name":"d","type":"string"}],
            "outputs":[{"name":"a","type":"address"},{"name":"b","type":"uint256"},{"name":"c","type":"bool"},{"name":"d","type":"string"}]}"#;
        let encoded =
            encode_function_call(abi, &format!("{}, 123456789, true, hello world", VITALIK))
                .unwrap();
        // The argument bytes double as a return payload for the same types.
        let result_hex = format!("0x{}", &encoded[8..]);
        let decoded = decode_function_result(&result_hex, abi);
        assert!(decoded.error.is_none());
        assert_eq!(
            decoded.decoded_data,
            json!({
                "a": "0xd8da6bf26964af9d7eed9e03e53415d37aa96045",
                "b": 123456789,
                "c": true,
                "d": "hello world"
            })
        );
    }

    #[test]
    fn test_round_trip_bytes() {
        let abi = r#"{"name":"g",
            "inputs":[{"name":"fixed","type":"bytes32"},{"name":"dynamic","type":"bytes"}],
            "outputs":[{"name":"fixed","type":"bytes32"},{"name":"dynamic","type":"bytes"}]}"#;
        let encoded = encode_function_call(abi, "0xdeadbeef, 0xcafe").unwrap();
        let decoded = decode_function_result(&format!("0x{}", &encoded[8..]), abi);
        assert!(decoded.error.is_none());
        let fields = decoded.decoded_data.as_object().unwrap();
        assert_eq!(
            fields.get("fixed"),
            Some(&json!(format!("0xdeadbeef{}", "0".repeat(56))))
        );
        assert_eq!(fields.get("dynamic"), Some(&json!("0xcafe")));
    }

    #[test]
    fn test_signature_building() {
        let fragment = parse_fragment(
            r#"{"name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}]}"#,
        )
        .unwrap();
        assert_eq!(fragment.signature(), "transfer(address,uint256)");

        let bare = parse_fragment(r#"{"name":"decimals"}"#).unwrap();
        assert_eq!(bare.signature(), "decimals()");
        assert!(bare.inputs.is_empty());
    }
}
