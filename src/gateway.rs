//! Chain access seam
//!
//! The four operations the sweep engine needs from a node, behind a trait so
//! the engine can run against a real endpoint or a scripted mock.

use crate::types::AssetKind;
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Endpoint unreachable or the request timed out. The cycle aborts and
    /// the next one retries against a rotated endpoint.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The endpoint answered but the response could not be decoded.
    #[error("protocol failure: {0}")]
    Protocol(String),

    /// The chain rejected a simulated transfer.
    #[error("gas estimation rejected: {0}")]
    Estimation(String),

    /// Broadcast rejected (nonce conflict, underpriced fee, ...).
    #[error("broadcast rejected: {0}")]
    Submission(String),
}

/// Fee-market snapshot, derived fresh each cycle. Absent fields mean the
/// endpoint does not expose that pricing model, which is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeQuote {
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub gas_price: Option<U256>,
}

/// Parameters attached to an outgoing transfer. The gas limit is fixed at
/// planning time so submission never re-estimates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeParams {
    pub gas_limit: U256,
    pub pricing: FeePricing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeePricing {
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
    Legacy {
        gas_price: U256,
    },
}

impl FeePricing {
    pub fn mode(&self) -> &'static str {
        match self {
            FeePricing::Eip1559 { .. } => "eip1559",
            FeePricing::Legacy { .. } => "legacy",
        }
    }
}

/// One chain endpoint, viewed through the four operations a sweep cycle
/// needs. All operations are idempotent except `submit_transfer`, which the
/// engine invokes at most once per triggered decision.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn get_balance(&self, address: Address, asset: &AssetKind) -> Result<U256, GatewayError>;

    async fn get_fee_data(&self) -> Result<FeeQuote, GatewayError>;

    async fn estimate_gas(
        &self,
        to: Address,
        amount: U256,
        asset: &AssetKind,
    ) -> Result<U256, GatewayError>;

    async fn submit_transfer(
        &self,
        to: Address,
        amount: U256,
        fees: &FeeParams,
        asset: &AssetKind,
    ) -> Result<H256, GatewayError>;
}

/// Builds a gateway against one endpoint. The engine takes a fresh gateway
/// per sweep cycle so endpoint rotation applies to every operation in it.
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    async fn connect(&self, endpoint: &Url) -> Result<Box<dyn ChainGateway>, GatewayError>;
}
