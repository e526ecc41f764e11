use async_trait::async_trait;
use ethers::types::{Address, U256};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use swap_router::{
    AssetId, QuoteAggregator, QuoteEngine, SwapError, SwapExecutor, SwapRequest, ValidationError,
    VenueKind,
    dex::{ExchangeOrder, VenueClient, VenueRegistry},
    errors::{LedgerError, VenueError},
    ledger::InMemoryLedger,
    report::{MemorySink, RouterEvent},
};

// 6-decimal stablecoin in, 18-decimal asset out
const USDC: u64 = 0xA1;
const WETH: u64 = 0xB2;

#[derive(Debug, Default)]
struct MockPools {
    quoted: Mutex<HashMap<VenueKind, U256>>,
    // realized output differs from the quote when the pool moved in between
    realized: Mutex<HashMap<VenueKind, U256>>,
    calls: AtomicUsize,
}

impl MockPools {
    fn set(&self, kind: VenueKind, quoted: u64) {
        self.quoted.lock().unwrap().insert(kind, U256::from(quoted));
    }

    fn move_pool(&self, kind: VenueKind, realized: u64) {
        self.realized.lock().unwrap().insert(kind, U256::from(realized));
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VenueClient for MockPools {
    async fn pool_exists(
        &self,
        kind: VenueKind,
        _: AssetId,
        _: AssetId,
    ) -> Result<bool, VenueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.quoted.lock().unwrap().contains_key(&kind))
    }

    async fn quote_output(
        &self,
        kind: VenueKind,
        _: AssetId,
        _: AssetId,
        _: U256,
    ) -> Result<U256, VenueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quoted
            .lock()
            .unwrap()
            .get(&kind)
            .copied()
            .ok_or(VenueError::PoolNotFound(kind))
    }

    async fn exchange(&self, order: &ExchangeOrder) -> Result<U256, VenueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(realized) = self.realized.lock().unwrap().get(&order.venue) {
            return Ok(*realized);
        }
        self.quoted
            .lock()
            .unwrap()
            .get(&order.venue)
            .copied()
            .ok_or(VenueError::PoolNotFound(order.venue))
    }
}

struct Fixture {
    engine: Arc<QuoteEngine>,
    executor: SwapExecutor,
    pools: Arc<MockPools>,
    ledger: Arc<InMemoryLedger>,
    sink: Arc<MemorySink>,
}

fn token(id: u64) -> AssetId {
    AssetId::new(Address::from_low_u64_be(id))
}

fn user() -> Address {
    Address::from_low_u64_be(0x0123)
}

fn fixture() -> Fixture {
    let pools = Arc::new(MockPools::default());
    let client: Arc<dyn VenueClient> = pools.clone();
    let registry = VenueRegistry::uniswap(Some(client.clone()), client, &[500, 3000, 10000]);
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(QuoteEngine::new(
        QuoteAggregator::new(registry, Duration::from_secs(5)),
        sink.clone(),
    ));
    let ledger = Arc::new(InMemoryLedger::new());
    ledger
        .credit(user(), token(USDC), U256::from(1_000_000_000u64))
        .unwrap();
    ledger.approve(user(), token(USDC), U256::from(1_000_000_000u64));
    let executor = SwapExecutor::new(
        engine.clone(),
        ledger.clone(),
        Address::from_low_u64_be(0xF00D),
        Duration::from_secs(30),
    );
    Fixture {
        engine,
        executor,
        pools,
        ledger,
        sink,
    }
}

fn request(amount_in: u64, slippage_bps: u32) -> SwapRequest {
    SwapRequest::new(token(USDC), token(WETH), U256::from(amount_in), slippage_bps)
}

impl Fixture {
    fn balances(&self) -> (U256, U256) {
        (
            self.ledger.balance_of(user(), token(USDC)),
            self.ledger.balance_of(user(), token(WETH)),
        )
    }
}

#[tokio::test]
async fn quote_applies_five_percent_to_best_venue() {
    let f = fixture();
    f.pools.set(VenueKind::ConstantProduct, 1_980_000);
    f.pools.set(VenueKind::ConcentratedLiquidity(500), 2_000_000);
    f.pools.set(VenueKind::ConcentratedLiquidity(3000), 1_990_000);

    let min = f.engine.quote(&request(1_000_000, 500)).await.unwrap();
    assert_eq!(min, U256::from(1_900_000u64));

    let events = f.sink.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        RouterEvent::MinAmountOutCalculated {
            venue,
            best_amount_out,
            min_amount_out,
            ..
        } => {
            assert_eq!(*venue, VenueKind::ConcentratedLiquidity(500));
            assert_eq!(*best_amount_out, U256::from(2_000_000u64));
            assert_eq!(*min_amount_out, min);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn minimum_never_exceeds_best_and_equals_it_only_at_zero() {
    let f = fixture();
    f.pools.set(VenueKind::ConcentratedLiquidity(3000), 987_654_321);
    let best = U256::from(987_654_321u64);
    for bps in [0u32, 1, 30, 500, 5_000, 9_999] {
        let min = f.engine.quote(&request(1_000_000, bps)).await.unwrap();
        assert!(min <= best);
        assert_eq!(min == best, bps == 0, "bps {bps}");
    }
}

#[tokio::test]
async fn quote_is_idempotent() {
    let f = fixture();
    f.pools.set(VenueKind::ConstantProduct, 5_555);
    f.pools.set(VenueKind::ConcentratedLiquidity(10000), 5_554);
    let first = f.engine.quote(&request(10, 250)).await.unwrap();
    let second = f.engine.quote(&request(10, 250)).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn analyze_lists_every_quote_without_recording() {
    let f = fixture();
    f.pools.set(VenueKind::ConstantProduct, 10);
    f.pools.set(VenueKind::ConcentratedLiquidity(10000), 12);
    let report = f.engine.analyze(&request(1, 0)).await.unwrap();
    assert_eq!(report.quotes.len(), 2);
    assert_eq!(report.best.venue, VenueKind::ConcentratedLiquidity(10000));
    assert_eq!(report.min_amount_out, U256::from(12u64));
    assert!(f.sink.is_empty());
}

#[tokio::test]
async fn equal_quotes_resolve_to_registry_order() {
    let f = fixture();
    f.pools.set(VenueKind::ConcentratedLiquidity(10000), 42);
    f.pools.set(VenueKind::ConcentratedLiquidity(3000), 42);
    let report = f.engine.analyze(&request(1, 0)).await.unwrap();
    assert_eq!(report.best.venue, VenueKind::ConcentratedLiquidity(3000));
}

#[tokio::test]
async fn swap_settles_at_venue_reported_amount() {
    let f = fixture();
    f.pools.set(VenueKind::ConstantProduct, 2_000_000);
    f.pools.set(VenueKind::ConcentratedLiquidity(500), 1_999_999);
    f.pools.move_pool(VenueKind::ConstantProduct, 1_950_000);

    let (usdc_before, weth_before) = f.balances();
    let result = f
        .executor
        .execute_swap(user(), &request(1_000_000, 500))
        .await
        .unwrap();

    assert_eq!(result.venue_used, VenueKind::ConstantProduct);
    assert_eq!(result.amount_out, U256::from(1_950_000u64));
    assert_eq!(result.min_amount_out, U256::from(1_900_000u64));
    assert!(result.amount_out >= result.min_amount_out);

    let (usdc_after, weth_after) = f.balances();
    assert_eq!(usdc_before - usdc_after, U256::from(1_000_000u64));
    assert_eq!(weth_after - weth_before, result.amount_out);

    assert!(matches!(
        f.sink.events().as_slice(),
        [RouterEvent::SwapExecuted {
            caller,
            venue: VenueKind::ConstantProduct,
            ..
        }] if *caller == user()
    ));
}

#[tokio::test]
async fn identical_tokens_fail_without_touching_anything() {
    let f = fixture();
    f.pools.set(VenueKind::ConstantProduct, 2_000_000);
    let before = f.balances();
    let same = SwapRequest::new(token(USDC), token(USDC), U256::from(1_000u64), 500);

    let err = f.executor.execute_swap(user(), &same).await.unwrap_err();
    assert_eq!(err, SwapError::Validation(ValidationError::IdenticalTokens));
    assert_eq!(f.balances(), before);
    assert_eq!(f.pools.calls(), 0);
}

#[tokio::test]
async fn zero_amount_and_full_slippage_are_rejected() {
    let f = fixture();
    f.pools.set(VenueKind::ConstantProduct, 2_000_000);

    assert_eq!(
        f.engine.quote(&request(0, 500)).await,
        Err(SwapError::Validation(ValidationError::InvalidAmountIn))
    );
    assert_eq!(
        f.executor.execute_swap(user(), &request(0, 500)).await,
        Err(SwapError::Validation(ValidationError::InvalidAmountIn))
    );
    assert_eq!(
        f.engine.quote(&request(1_000, 10_000)).await,
        Err(SwapError::Validation(ValidationError::SlippageTooHigh))
    );
    assert_eq!(
        f.executor.execute_swap(user(), &request(1_000, 10_000)).await,
        Err(SwapError::Validation(ValidationError::SlippageTooHigh))
    );
    assert_eq!(f.pools.calls(), 0);
}

#[tokio::test]
async fn zero_address_is_invalid_token() {
    let f = fixture();
    let req = SwapRequest::new(AssetId::new(Address::zero()), token(WETH), U256::one(), 0);
    assert_eq!(
        f.engine.quote(&req).await,
        Err(SwapError::Validation(ValidationError::InvalidToken))
    );
}

#[tokio::test]
async fn no_pool_anywhere_is_no_liquidity() {
    let f = fixture();
    let before = f.balances();
    assert_eq!(
        f.engine.quote(&request(1_000_000, 500)).await,
        Err(SwapError::NoLiquidity)
    );
    let err = f
        .executor
        .execute_swap(user(), &request(1_000_000, 500))
        .await
        .unwrap_err();
    assert_eq!(err, SwapError::NoLiquidity);
    assert!(err.is_retryable());
    assert_eq!(f.balances(), before);
}

#[tokio::test]
async fn pool_moving_past_tolerance_aborts_with_balances_intact() {
    let f = fixture();
    f.pools.set(VenueKind::ConcentratedLiquidity(500), 2_000_000);
    f.pools.move_pool(VenueKind::ConcentratedLiquidity(500), 1_800_000);
    let before = f.balances();

    let err = f
        .executor
        .execute_swap(user(), &request(1_000_000, 500))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SwapError::SlippageViolation {
            realized: U256::from(1_800_000u64),
            minimum: U256::from(1_900_000u64),
        }
    );
    assert_eq!(f.balances(), before);
    assert_eq!(
        f.ledger.allowance(user(), token(USDC)),
        U256::from(1_000_000_000u64)
    );
    assert!(f.sink.is_empty());
}

#[tokio::test]
async fn concurrent_swaps_cannot_double_spend() {
    let f = fixture();
    f.pools.set(VenueKind::ConstantProduct, 2_000_000);
    let other = Address::from_low_u64_be(0x0456);
    f.ledger
        .credit(other, token(USDC), U256::from(1_000_000u64))
        .unwrap();
    f.ledger.approve(other, token(USDC), U256::from(1_000_000u64));

    let executor = Arc::new(f.executor);
    let swaps: Vec<_> = (0..2)
        .map(|_| {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor
                    .execute_swap(other, &request(1_000_000, 100))
                    .await
            })
        })
        .collect();

    let mut settled = 0;
    let mut rejected = 0;
    for swap in swaps {
        match swap.await.unwrap() {
            Ok(_) => settled += 1,
            Err(SwapError::TransferFailure(LedgerError::InsufficientBalance { .. })) => {
                rejected += 1
            }
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!((settled, rejected), (1, 1));
    assert_eq!(f.ledger.balance_of(other, token(USDC)), U256::zero());
    assert_eq!(
        f.ledger.balance_of(other, token(WETH)),
        U256::from(2_000_000u64)
    );
}
