use chain_sweeper::baseline::BaselineStore;
use ethers::types::U256;
use std::sync::Arc;

#[test]
fn baseline_starts_at_zero() {
    let store = BaselineStore::new();

    assert_eq!(store.baseline("bsc:BNB:0x1234"), U256::zero());
    assert!(store.state("bsc:BNB:0x1234").is_none());
}

#[test]
fn record_sweep_advances_baseline_and_counters() {
    let store = BaselineStore::new();
    let id = "bsc:BNB:0x1234";

    store.record_sweep(id, U256::from(42_000u64));

    assert_eq!(store.baseline(id), U256::from(42_000u64));
    let state = store.state(id).unwrap();
    assert_eq!(state.total_sweeps, 1);
    assert!(state.last_sweep.is_some());

    store.record_sweep(id, U256::from(7u64));
    assert_eq!(store.baseline(id), U256::from(7u64));
    assert_eq!(store.state(id).unwrap().total_sweeps, 2);
}

#[test]
fn accounts_are_independent() {
    let store = BaselineStore::new();

    store.record_sweep("bsc:BNB:0xAAAA", U256::from(100u64));
    store.record_sweep("bsc:USDC:0xAAAA", U256::from(200u64));

    assert_eq!(store.baseline("bsc:BNB:0xAAAA"), U256::from(100u64));
    assert_eq!(store.baseline("bsc:USDC:0xAAAA"), U256::from(200u64));
    assert_eq!(store.baseline("bsc:BNB:0xBBBB"), U256::zero());
}

#[test]
fn snapshot_reports_all_accounts() {
    let store = BaselineStore::new();

    store.record_sweep("bsc:BNB:0xAAAA", U256::from(1u64));
    store.record_sweep("eth:ETH:0xBBBB", U256::from(2u64));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn concurrent_recording_keeps_counts() {
    let store = Arc::new(BaselineStore::new());
    let id = "bsc:BNB:0xConcurrent";

    let mut handles = Vec::new();
    for i in 0..10u64 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.record_sweep(id, U256::from(i));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.state(id).unwrap().total_sweeps, 10);
}
