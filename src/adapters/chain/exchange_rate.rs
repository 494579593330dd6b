//! Exchange Rate Contracts - Primary Market Rate via eth_call
//!
//! Implements the `PrimaryRateSource` port. The registry carries each
//! token's ABI fragment, so calls are encoded dynamically with
//! `alloy::dyn_abi` instead of compile-time `sol!` bindings: adding a token
//! with a new accessor is a registry change, not a code change.

use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::error::PriceError;
use crate::domain::token::PrimaryAccessor;
use crate::ports::primary_source::PrimaryRateSource;

use super::provider::RpcProviders;

/// Reads canonical exchange rates from token contracts.
pub struct ExchangeRateContracts {
    /// Shared RPC providers.
    providers: Arc<RpcProviders>,
    /// Upper bound for one eth_call.
    timeout: Duration,
}

impl ExchangeRateContracts {
    /// Create a rate reader over the given providers.
    pub const fn new(providers: Arc<RpcProviders>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }
}

/// Locate the accessor function in its ABI fragment.
fn accessor_function(accessor: &PrimaryAccessor) -> Result<Function, PriceError> {
    let abi: JsonAbi = serde_json::from_value(accessor.abi.clone())
        .map_err(|e| PriceError::SourceUnavailable(format!("malformed ABI: {e}")))?;

    abi.function(&accessor.function)
        .and_then(|overloads| overloads.iter().find(|f| f.inputs.is_empty()))
        .cloned()
        .ok_or_else(|| {
            PriceError::SourceUnavailable(format!(
                "ABI has no zero-argument function {}",
                accessor.function
            ))
        })
}

/// Decode the first return value as an unsigned base-unit amount.
fn decode_rate(function: &Function, output: &[u8]) -> Result<u128, PriceError> {
    let values = function
        .abi_decode_output(output, true)
        .map_err(|e| PriceError::SourceUnavailable(format!("undecodable output: {e}")))?;

    let rate: U256 = match values.first() {
        Some(DynSolValue::Uint(value, _)) => *value,
        Some(other) => {
            return Err(PriceError::SourceUnavailable(format!(
                "expected uint output, got {other:?}"
            )));
        }
        None => return Err(PriceError::SourceUnavailable("empty output".to_string())),
    };

    u128::try_from(rate)
        .map_err(|_| PriceError::SourceUnavailable(format!("rate {rate} out of range")))
}

#[async_trait]
impl PrimaryRateSource for ExchangeRateContracts {
    #[instrument(skip(self, accessor), fields(network = %accessor.network, function = %accessor.function))]
    async fn exchange_rate(&self, accessor: &PrimaryAccessor) -> Result<u128, PriceError> {
        let provider = self.providers.get(&accessor.network).ok_or_else(|| {
            PriceError::SourceUnavailable(format!("no RPC endpoint for {}", accessor.network))
        })?;

        let contract: Address = accessor.contract.parse().map_err(|e| {
            PriceError::SourceUnavailable(format!("invalid contract address {}: {e}", accessor.contract))
        })?;

        let function = accessor_function(accessor)?;
        let calldata = function
            .abi_encode_input(&[])
            .map_err(|e| PriceError::SourceUnavailable(format!("cannot encode call: {e}")))?;

        let tx = TransactionRequest::default()
            .to(contract)
            .input(Bytes::from(calldata).into());

        let output = tokio::time::timeout(self.timeout, provider.call(&tx))
            .await
            .map_err(|_| PriceError::SourceUnavailable(format!("eth_call timed out after {:?}", self.timeout)))?
            .map_err(|e| PriceError::SourceUnavailable(format!("eth_call failed: {e}")))?;

        let rate = decode_rate(&function, &output)?;
        debug!(contract = %contract, rate, "Primary rate resolved");
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn accessor(abi: serde_json::Value, function: &str) -> PrimaryAccessor {
        PrimaryAccessor {
            network: "ethereum".into(),
            contract: "0xae78736Cd615f374D3085123A210448E74Fc6393".into(),
            abi,
            function: function.into(),
        }
    }

    fn reth_abi() -> serde_json::Value {
        serde_json::json!([{
            "inputs": [],
            "name": "getExchangeRate",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "view",
            "type": "function"
        }])
    }

    #[test]
    fn test_encodes_selector_for_accessor() {
        let function = accessor_function(&accessor(reth_abi(), "getExchangeRate")).unwrap();
        let calldata = function.abi_encode_input(&[]).unwrap();
        let selector = alloy::primitives::keccak256(b"getExchangeRate()");
        assert_eq!(calldata, selector[..4].to_vec());
    }

    #[test]
    fn test_decodes_uint_output() {
        let function = accessor_function(&accessor(reth_abi(), "getExchangeRate")).unwrap();
        let encoded = U256::from(1_050_000_000_000_000_000u128).to_be_bytes::<32>();
        assert_eq!(decode_rate(&function, &encoded).unwrap(), 1_050_000_000_000_000_000);
    }

    #[test]
    fn test_missing_function_is_source_unavailable() {
        let err = accessor_function(&accessor(reth_abi(), "stEthPerToken")).unwrap_err();
        assert!(matches!(err, PriceError::SourceUnavailable(_)));

        let err = accessor_function(&accessor(serde_json::json!({"bad": true}), "f")).unwrap_err();
        assert!(matches!(err, PriceError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_network_is_source_unavailable() {
        let providers = Arc::new(RpcProviders::new(&BTreeMap::new()).unwrap());
        let source = ExchangeRateContracts::new(providers, Duration::from_secs(1));
        let err = source
            .exchange_rate(&accessor(reth_abi(), "getExchangeRate"))
            .await
            .unwrap_err();
        assert!(matches!(err, PriceError::SourceUnavailable(msg) if msg.contains("no RPC endpoint")));
    }
}
