//! Scripted gateway used in tests.
//!
//! Responses for each operation are consumed front-to-back; when a script
//! runs dry the mock falls back to a sticky default. Submitted transfers and
//! connected endpoints are recorded for assertions.

use crate::gateway::{
    ChainGateway, FeeParams, FeeQuote, GatewayConnector, GatewayError,
};
use crate::types::AssetKind;
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// One recorded `submit_transfer` attempt.
#[derive(Debug, Clone)]
pub struct SubmittedTransfer {
    pub to: Address,
    pub amount: U256,
    pub fees: FeeParams,
    pub asset: AssetKind,
}

#[derive(Default)]
pub struct MockChain {
    native_balances: Mutex<VecDeque<Result<U256, GatewayError>>>,
    token_balances: Mutex<VecDeque<Result<U256, GatewayError>>>,
    fee_quotes: Mutex<VecDeque<Result<FeeQuote, GatewayError>>>,
    default_fee_quote: Mutex<FeeQuote>,
    gas_estimates: Mutex<VecDeque<Result<U256, GatewayError>>>,
    default_gas_estimate: Mutex<U256>,
    submissions: Mutex<VecDeque<Result<H256, GatewayError>>>,
    submitted: Mutex<Vec<SubmittedTransfer>>,
    connected: Mutex<Vec<String>>,
    balance_calls: AtomicUsize,
    fee_calls: AtomicUsize,
    estimate_calls: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_native_balance(&self, result: Result<U256, GatewayError>) {
        self.native_balances.lock().unwrap().push_back(result);
    }

    pub fn push_token_balance(&self, result: Result<U256, GatewayError>) {
        self.token_balances.lock().unwrap().push_back(result);
    }

    pub fn push_fee_quote(&self, result: Result<FeeQuote, GatewayError>) {
        self.fee_quotes.lock().unwrap().push_back(result);
    }

    pub fn set_default_fee_quote(&self, quote: FeeQuote) {
        *self.default_fee_quote.lock().unwrap() = quote;
    }

    pub fn push_gas_estimate(&self, result: Result<U256, GatewayError>) {
        self.gas_estimates.lock().unwrap().push_back(result);
    }

    pub fn set_default_gas_estimate(&self, gas: U256) {
        *self.default_gas_estimate.lock().unwrap() = gas;
    }

    pub fn push_submission(&self, result: Result<H256, GatewayError>) {
        self.submissions.lock().unwrap().push_back(result);
    }

    pub fn submitted(&self) -> Vec<SubmittedTransfer> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn connected_endpoints(&self) -> Vec<String> {
        self.connected.lock().unwrap().clone()
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::Relaxed)
    }

    pub fn fee_calls(&self) -> usize {
        self.fee_calls.load(Ordering::Relaxed)
    }

    pub fn estimate_calls(&self) -> usize {
        self.estimate_calls.load(Ordering::Relaxed)
    }

    fn pop_balance(&self, asset: &AssetKind) -> Result<U256, GatewayError> {
        self.balance_calls.fetch_add(1, Ordering::Relaxed);
        let queue = match asset {
            AssetKind::Native { .. } => &self.native_balances,
            AssetKind::Token { .. } => &self.token_balances,
        };
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(U256::zero()))
    }
}

#[derive(Clone)]
pub struct MockConnector {
    chain: Arc<MockChain>,
}

impl MockConnector {
    pub fn new(chain: Arc<MockChain>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl GatewayConnector for MockConnector {
    async fn connect(&self, endpoint: &Url) -> Result<Box<dyn ChainGateway>, GatewayError> {
        self.chain
            .connected
            .lock()
            .unwrap()
            .push(endpoint.to_string());
        Ok(Box::new(MockGateway {
            chain: self.chain.clone(),
        }))
    }
}

pub struct MockGateway {
    chain: Arc<MockChain>,
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn get_balance(
        &self,
        _address: Address,
        asset: &AssetKind,
    ) -> Result<U256, GatewayError> {
        self.chain.pop_balance(asset)
    }

    async fn get_fee_data(&self) -> Result<FeeQuote, GatewayError> {
        self.chain.fee_calls.fetch_add(1, Ordering::Relaxed);
        self.chain
            .fee_quotes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.chain.default_fee_quote.lock().unwrap().clone()))
    }

    async fn estimate_gas(
        &self,
        _to: Address,
        _amount: U256,
        _asset: &AssetKind,
    ) -> Result<U256, GatewayError> {
        self.chain.estimate_calls.fetch_add(1, Ordering::Relaxed);
        self.chain
            .gas_estimates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(*self.chain.default_gas_estimate.lock().unwrap()))
    }

    async fn submit_transfer(
        &self,
        to: Address,
        amount: U256,
        fees: &FeeParams,
        asset: &AssetKind,
    ) -> Result<H256, GatewayError> {
        self.chain.submitted.lock().unwrap().push(SubmittedTransfer {
            to,
            amount,
            fees: fees.clone(),
            asset: asset.clone(),
        });
        self.chain
            .submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(H256::zero()))
    }
}
