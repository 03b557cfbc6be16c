use chain_sweeper::baseline::BaselineStore;
use chain_sweeper::endpoint_pool::EndpointPool;
use chain_sweeper::engine::{CycleOutcome, SweepEngine};
use chain_sweeper::gateway::{FeePricing, FeeQuote, GatewayError};
use chain_sweeper::mock_gateway::{MockChain, MockConnector};
use chain_sweeper::types::{AssetKind, TrackedAccount};
use ethers::types::{Address, H256, U256};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

fn native_account(min_sweep: u64) -> TrackedAccount {
    TrackedAccount {
        chain: "testnet".to_string(),
        chain_id: 31337,
        label: "Hot Wallet".to_string(),
        address: Address::repeat_byte(0x11),
        destination: Address::repeat_byte(0x22),
        asset: AssetKind::Native {
            symbol: "ETH".to_string(),
            decimals: 18,
        },
        gas_asset: AssetKind::Native {
            symbol: "ETH".to_string(),
            decimals: 18,
        },
        min_sweep: U256::from(min_sweep),
        poll_interval: Duration::from_secs(1),
    }
}

fn token_account(min_sweep: u64) -> TrackedAccount {
    TrackedAccount {
        asset: AssetKind::Token {
            symbol: "USDC".to_string(),
            contract: Address::repeat_byte(0x33),
            decimals: 18,
        },
        label: "Hot Wallet USDC".to_string(),
        ..native_account(min_sweep)
    }
}

fn eip1559_quote(max_fee: u64, priority: u64) -> FeeQuote {
    FeeQuote {
        max_fee_per_gas: Some(U256::from(max_fee)),
        max_priority_fee_per_gas: Some(U256::from(priority)),
        gas_price: None,
    }
}

fn build_engine(
    chain: &Arc<MockChain>,
    account: TrackedAccount,
    num_endpoints: usize,
) -> (SweepEngine, Arc<BaselineStore>) {
    let urls = (0..num_endpoints)
        .map(|i| Url::parse(&format!("https://rpc{}.example.com", i)).unwrap())
        .collect();
    let store = Arc::new(BaselineStore::new());
    let engine = SweepEngine::new(
        account,
        Arc::new(EndpointPool::new(urls).unwrap()),
        Arc::new(MockConnector::new(chain.clone())),
        store.clone(),
    );
    (engine, store)
}

#[tokio::test]
async fn new_funds_above_threshold_are_swept() {
    let chain = MockChain::new();
    chain.push_native_balance(Ok(U256::from(500_000u64)));
    chain.push_fee_quote(Ok(eip1559_quote(2, 1)));
    chain.push_submission(Ok(H256::repeat_byte(0xab)));
    chain.push_native_balance(Ok(U256::from(42_000u64))); // post-sweep read

    let (engine, store) = build_engine(&chain, native_account(100_000), 1);

    let outcome = engine.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Swept {
            tx_hash: H256::repeat_byte(0xab),
            amount: U256::from(458_000u64),
        }
    );

    let submitted = chain.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].to, Address::repeat_byte(0x22));
    assert_eq!(submitted[0].amount, U256::from(458_000u64));
    assert_eq!(submitted[0].fees.gas_limit, U256::from(21_000u64));
    assert!(matches!(
        submitted[0].fees.pricing,
        FeePricing::Eip1559 { .. }
    ));
    // Native transfers use the flat gas cost, no simulation.
    assert_eq!(chain.estimate_calls(), 0);

    assert_eq!(
        store.baseline(&engine.account().id()),
        U256::from(42_000u64)
    );
}

#[tokio::test]
async fn unchanged_balance_skips_without_fee_queries() {
    let chain = MockChain::new();
    chain.push_native_balance(Ok(U256::from(1_000u64)));

    let (engine, store) = build_engine(&chain, native_account(100), 1);
    store.record_sweep(&engine.account().id(), U256::from(1_000u64));

    let outcome = engine.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::NoNewFunds {
            balance: U256::from(1_000u64)
        }
    );

    assert_eq!(chain.balance_calls(), 1);
    assert_eq!(chain.fee_calls(), 0);
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn below_threshold_skip_leaves_baseline() {
    let chain = MockChain::new();
    chain.push_native_balance(Ok(U256::from(50_000u64)));
    chain.push_native_balance(Ok(U256::from(50_000u64)));

    let (engine, store) = build_engine(&chain, native_account(100_000), 1);

    let outcome = engine.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::BelowThreshold {
            balance: U256::from(50_000u64),
            threshold: U256::from(100_000u64),
        }
    );
    assert_eq!(store.baseline(&engine.account().id()), U256::zero());
    assert_eq!(chain.fee_calls(), 0);

    // The baseline did not move, so the same excess is re-evaluated.
    let outcome = engine.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::BelowThreshold { .. }));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn fee_reservation_eating_balance_skips() {
    let chain = MockChain::new();
    chain.push_native_balance(Ok(U256::from(30_000u64)));
    chain.push_fee_quote(Ok(eip1559_quote(2, 1)));

    let (engine, store) = build_engine(&chain, native_account(1_000), 1);

    let outcome = engine.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::InsufficientFunds {
            required: U256::from(42_000u64),
            available: U256::from(30_000u64),
        }
    );
    assert!(chain.submitted().is_empty());
    assert_eq!(store.baseline(&engine.account().id()), U256::zero());
}

#[tokio::test]
async fn transport_failure_aborts_and_rotates() {
    let chain = MockChain::new();
    chain.push_native_balance(Err(GatewayError::Transport(
        "connection refused".to_string(),
    )));
    chain.push_native_balance(Ok(U256::zero()));

    let (engine, store) = build_engine(&chain, native_account(100), 2);

    let err = engine.run_cycle().await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
    assert_eq!(store.baseline(&engine.account().id()), U256::zero());
    assert!(chain.submitted().is_empty());

    // Next cycle runs against the next endpoint in rotation.
    engine.run_cycle().await.unwrap();
    assert_eq!(
        chain.connected_endpoints(),
        vec![
            "https://rpc0.example.com/".to_string(),
            "https://rpc1.example.com/".to_string(),
        ]
    );
}

#[tokio::test]
async fn successful_sweep_does_not_retrigger_on_unchanged_balance() {
    let chain = MockChain::new();
    chain.push_native_balance(Ok(U256::from(500_000u64)));
    chain.push_fee_quote(Ok(eip1559_quote(2, 1)));
    chain.push_submission(Ok(H256::repeat_byte(0x01)));
    chain.push_native_balance(Ok(U256::from(42_000u64))); // post-sweep read
    chain.push_native_balance(Ok(U256::from(42_000u64))); // next cycle, unchanged

    let (engine, _store) = build_engine(&chain, native_account(100_000), 1);

    let outcome = engine.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Swept { .. }));

    let outcome = engine.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::NoNewFunds {
            balance: U256::from(42_000u64)
        }
    );
    assert_eq!(chain.submitted().len(), 1);
}

#[tokio::test]
async fn failed_submission_leaves_baseline_for_retry() {
    let chain = MockChain::new();
    chain.set_default_fee_quote(eip1559_quote(2, 1));
    chain.push_native_balance(Ok(U256::from(500_000u64)));
    chain.push_submission(Err(GatewayError::Submission("nonce too low".to_string())));

    let (engine, store) = build_engine(&chain, native_account(100_000), 1);

    let err = engine.run_cycle().await.unwrap_err();
    assert!(matches!(err, GatewayError::Submission(_)));
    assert_eq!(store.baseline(&engine.account().id()), U256::zero());

    // Same balance on the next cycle triggers the retry.
    chain.push_native_balance(Ok(U256::from(500_000u64)));
    chain.push_submission(Ok(H256::repeat_byte(0x02)));
    chain.push_native_balance(Ok(U256::from(42_000u64)));

    let outcome = engine.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Swept {
            tx_hash: H256::repeat_byte(0x02),
            amount: U256::from(458_000u64),
        }
    );
    assert_eq!(chain.submitted().len(), 2);
}

#[tokio::test]
async fn failed_confirmation_read_keeps_baseline() {
    let chain = MockChain::new();
    chain.push_native_balance(Ok(U256::from(500_000u64)));
    chain.push_fee_quote(Ok(eip1559_quote(2, 1)));
    chain.push_submission(Ok(H256::repeat_byte(0x03)));
    chain.push_native_balance(Err(GatewayError::Transport("read timed out".to_string())));

    let (engine, store) = build_engine(&chain, native_account(100_000), 1);

    // The transfer itself succeeded.
    let outcome = engine.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Swept { .. }));

    // But the baseline only moves on a confirmed read.
    assert_eq!(store.baseline(&engine.account().id()), U256::zero());
    assert!(store.state(&engine.account().id()).is_none());
}

#[tokio::test]
async fn non_increasing_balances_never_submit() {
    let chain = MockChain::new();
    for balance in [100u64, 100, 50, 0] {
        chain.push_native_balance(Ok(U256::from(balance)));
    }

    let (engine, store) = build_engine(&chain, native_account(10), 1);
    store.record_sweep(&engine.account().id(), U256::from(100u64));

    for _ in 0..4 {
        let outcome = engine.run_cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::NoNewFunds { .. }));
    }
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn token_sweep_sends_full_balance_and_reserves_native_gas() {
    let chain = MockChain::new();
    chain.push_token_balance(Ok(U256::from(5_000u64)));
    chain.push_fee_quote(Ok(eip1559_quote(2, 1)));
    chain.push_gas_estimate(Ok(U256::from(60_000u64)));
    chain.push_native_balance(Ok(U256::from(1_000_000u64))); // gas funds
    chain.push_submission(Ok(H256::repeat_byte(0x04)));
    chain.push_token_balance(Ok(U256::zero())); // post-sweep read

    let (engine, store) = build_engine(&chain, token_account(1_000), 1);

    let outcome = engine.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Swept {
            tx_hash: H256::repeat_byte(0x04),
            amount: U256::from(5_000u64),
        }
    );

    let submitted = chain.submitted();
    assert_eq!(submitted.len(), 1);
    // The whole token balance goes out; fees are reserved in native coin.
    assert_eq!(submitted[0].amount, U256::from(5_000u64));
    assert_eq!(submitted[0].fees.gas_limit, U256::from(60_000u64));
    assert!(matches!(submitted[0].asset, AssetKind::Token { .. }));
    assert_eq!(chain.estimate_calls(), 1);

    let state = store.state(&engine.account().id()).unwrap();
    assert_eq!(state.baseline, U256::zero());
    assert_eq!(state.total_sweeps, 1);
}

#[tokio::test]
async fn token_sweep_skips_when_native_cannot_cover_gas() {
    let chain = MockChain::new();
    chain.set_default_gas_estimate(U256::from(60_000u64));
    chain.push_token_balance(Ok(U256::from(5_000u64)));
    chain.push_fee_quote(Ok(eip1559_quote(2, 1)));
    chain.push_native_balance(Ok(U256::from(100_000u64))); // reservation is 120_000

    let (engine, _store) = build_engine(&chain, token_account(1_000), 1);

    let outcome = engine.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::InsufficientFunds {
            required: U256::from(120_000u64),
            available: U256::from(100_000u64),
        }
    );
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn estimation_rejection_aborts_cycle() {
    let chain = MockChain::new();
    chain.push_token_balance(Ok(U256::from(5_000u64)));
    chain.push_fee_quote(Ok(eip1559_quote(2, 1)));
    chain.push_gas_estimate(Err(GatewayError::Estimation(
        "execution reverted".to_string(),
    )));

    let (engine, store) = build_engine(&chain, token_account(1_000), 1);

    let err = engine.run_cycle().await.unwrap_err();
    assert!(matches!(err, GatewayError::Estimation(_)));
    assert!(chain.submitted().is_empty());
    assert_eq!(store.baseline(&engine.account().id()), U256::zero());
}
