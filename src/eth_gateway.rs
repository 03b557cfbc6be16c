//! Production gateway over an EVM JSON-RPC endpoint.

use crate::gateway::{
    ChainGateway, FeeParams, FeePricing, FeeQuote, GatewayConnector, GatewayError,
};
use crate::types::AssetKind;
use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Eip1559TransactionRequest, TransactionRequest, H256, U256};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

abigen!(
    Erc20,
    r#"[
        function balanceOf(address owner) external view returns (uint256)
        function transfer(address to, uint256 value) external returns (bool)
        function decimals() external view returns (uint8)
    ]"#
);

type EthClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Connector for one EVM chain: the same signer across every endpoint, a
/// fresh provider per selected endpoint.
#[derive(Clone)]
pub struct EthConnector {
    wallet: LocalWallet,
    chain_id: u64,
    call_timeout: Duration,
}

impl EthConnector {
    pub fn new(wallet: LocalWallet, chain_id: u64, call_timeout: Duration) -> Self {
        Self {
            wallet,
            chain_id,
            call_timeout,
        }
    }
}

#[async_trait]
impl GatewayConnector for EthConnector {
    async fn connect(&self, endpoint: &Url) -> Result<Box<dyn ChainGateway>, GatewayError> {
        let provider = Provider::<Http>::try_from(endpoint.as_str())
            .map_err(|e| GatewayError::Transport(format!("bad endpoint {endpoint}: {e}")))?;
        let wallet = self.wallet.clone().with_chain_id(self.chain_id);
        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        Ok(Box::new(EthGateway {
            client,
            call_timeout: self.call_timeout,
        }))
    }
}

pub struct EthGateway {
    client: Arc<EthClient>,
    call_timeout: Duration,
}

/// Split transport failures from undecodable responses. Public endpoints
/// return enough nonstandard error shapes that the error text is the only
/// reliable signal.
fn classify_rpc_error(err: impl Display) -> GatewayError {
    let text = err.to_string();
    let lower = text.to_lowercase();
    if lower.contains("deserialization")
        || lower.contains("invalid type")
        || lower.contains("missing field")
        || lower.contains("expected value")
        || lower.contains("serde")
    {
        GatewayError::Protocol(text)
    } else {
        GatewayError::Transport(text)
    }
}

fn classify_submission_error(err: impl Display) -> GatewayError {
    let text = err.to_string();
    let lower = text.to_lowercase();
    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("transport")
    {
        GatewayError::Transport(text)
    } else {
        GatewayError::Submission(text)
    }
}

impl EthGateway {
    /// Bound a single RPC by the configured timeout; a timeout is the same
    /// failure as an unreachable endpoint.
    async fn bounded<T, E, F>(&self, what: &str, fut: F) -> Result<Result<T, E>, GatewayError>
    where
        F: Future<Output = Result<T, E>>,
    {
        timeout(self.call_timeout, fut)
            .await
            .map_err(|_| GatewayError::Transport(format!("{what} timed out")))
    }
}

#[async_trait]
impl ChainGateway for EthGateway {
    async fn get_balance(&self, address: Address, asset: &AssetKind) -> Result<U256, GatewayError> {
        match asset {
            AssetKind::Native { .. } => self
                .bounded("balance query", self.client.get_balance(address, None))
                .await?
                .map_err(classify_rpc_error),
            AssetKind::Token { contract, .. } => {
                let token = Erc20::new(*contract, self.client.clone());
                self.bounded("token balance query", token.balance_of(address).call())
                    .await?
                    .map_err(classify_rpc_error)
            }
        }
    }

    async fn get_fee_data(&self) -> Result<FeeQuote, GatewayError> {
        // Chains without a priority-fee market reject the fee-history call;
        // that is a legacy quote, not a failure.
        match self
            .bounded("fee query", self.client.estimate_eip1559_fees(None))
            .await?
        {
            Ok((max_fee, priority)) => Ok(FeeQuote {
                max_fee_per_gas: Some(max_fee),
                max_priority_fee_per_gas: Some(priority),
                gas_price: None,
            }),
            Err(_) => {
                let gas_price = self
                    .bounded("gas price query", self.client.get_gas_price())
                    .await?
                    .map_err(classify_rpc_error)?;
                Ok(FeeQuote {
                    max_fee_per_gas: None,
                    max_priority_fee_per_gas: None,
                    gas_price: Some(gas_price),
                })
            }
        }
    }

    async fn estimate_gas(
        &self,
        to: Address,
        amount: U256,
        asset: &AssetKind,
    ) -> Result<U256, GatewayError> {
        match asset {
            AssetKind::Native { .. } => {
                let tx = TypedTransaction::Eip1559(
                    Eip1559TransactionRequest::new().to(to).value(amount),
                );
                self.bounded("gas estimate", self.client.estimate_gas(&tx, None))
                    .await?
                    .map_err(|e| GatewayError::Estimation(e.to_string()))
            }
            AssetKind::Token { contract, .. } => {
                let token = Erc20::new(*contract, self.client.clone());
                self.bounded("gas estimate", token.transfer(to, amount).estimate_gas())
                    .await?
                    .map_err(|e| GatewayError::Estimation(e.to_string()))
            }
        }
    }

    async fn submit_transfer(
        &self,
        to: Address,
        amount: U256,
        fees: &FeeParams,
        asset: &AssetKind,
    ) -> Result<H256, GatewayError> {
        match asset {
            AssetKind::Native { .. } => {
                let tx = match fees.pricing {
                    FeePricing::Eip1559 {
                        max_fee_per_gas,
                        max_priority_fee_per_gas,
                    } => TypedTransaction::Eip1559(
                        Eip1559TransactionRequest::new()
                            .to(to)
                            .value(amount)
                            .gas(fees.gas_limit)
                            .max_fee_per_gas(max_fee_per_gas)
                            .max_priority_fee_per_gas(max_priority_fee_per_gas),
                    ),
                    FeePricing::Legacy { gas_price } => TypedTransaction::Legacy(
                        TransactionRequest::new()
                            .to(to)
                            .value(amount)
                            .gas(fees.gas_limit)
                            .gas_price(gas_price),
                    ),
                };

                let pending = self
                    .bounded("transfer broadcast", self.client.send_transaction(tx, None))
                    .await?
                    .map_err(classify_submission_error)?;
                Ok(*pending)
            }
            AssetKind::Token { contract, .. } => {
                let token = Erc20::new(*contract, self.client.clone());
                let mut call = token.transfer(to, amount).gas(fees.gas_limit);
                match fees.pricing {
                    FeePricing::Eip1559 {
                        max_fee_per_gas,
                        max_priority_fee_per_gas,
                    } => {
                        if let TypedTransaction::Eip1559(inner) = &mut call.tx {
                            inner.max_fee_per_gas = Some(max_fee_per_gas);
                            inner.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
                        }
                    }
                    FeePricing::Legacy { gas_price } => {
                        call = call.legacy().gas_price(gas_price);
                    }
                }

                let pending = self
                    .bounded("token transfer broadcast", call.send())
                    .await?
                    .map_err(classify_submission_error)?;
                Ok(*pending)
            }
        }
    }
}
