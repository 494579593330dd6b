//! Chain Adapters - EVM Read-only Access Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC provider management per network
//! - Primary-market exchange rate calls (dynamic ABI)

pub mod exchange_rate;
pub mod provider;

pub use exchange_rate::ExchangeRateContracts;
pub use provider::RpcProviders;
