use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use common::{ExchangeClient, Result};
use strategy::{
    classify_relationship, moving_average, Decision, MovingAverageSample, PositionMachine,
    PositionState, Relationship, StrategyFileConfig,
};

use crate::executor::{OrderExecutor, OrderOutcome};
use crate::feed::CandleFeed;

/// Waits between ticks. Swapped out in tests so many ticks run instantly.
#[async_trait]
pub trait Sleeper: Send {
    async fn sleep(&mut self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Everything one tick observed and did.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub short: MovingAverageSample,
    pub long: MovingAverageSample,
    pub relationship: Relationship,
    pub decision: Decision,
    /// `None` when the decision carried no order.
    pub outcome: Option<OrderOutcome>,
    /// State after the tick settled.
    pub state: PositionState,
}

/// The poll-decide-act loop.
///
/// Owns the position machine outright; exactly one tick runs at a time and
/// nothing else can observe the state mid-tick.
pub struct Engine<S: Sleeper = TokioSleeper> {
    strategy: StrategyFileConfig,
    machine: PositionMachine,
    feed: CandleFeed,
    executor: OrderExecutor,
    sleeper: S,
    ticks: u64,
}

impl Engine<TokioSleeper> {
    pub fn new(client: Arc<dyn ExchangeClient>, strategy: StrategyFileConfig) -> Self {
        Self::with_sleeper(client, strategy, TokioSleeper)
    }
}

impl<S: Sleeper> Engine<S> {
    pub fn with_sleeper(
        client: Arc<dyn ExchangeClient>,
        strategy: StrategyFileConfig,
        sleeper: S,
    ) -> Self {
        Self {
            machine: PositionMachine::new(strategy.trade_params()),
            feed: CandleFeed::new(client.clone()),
            executor: OrderExecutor::new(client),
            strategy,
            sleeper,
            ticks: 0,
        }
    }

    pub fn state(&self) -> &PositionState {
        self.machine.state()
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Run forever. The only way out is process termination.
    pub async fn run(mut self) {
        info!(
            product = %self.strategy.product_id,
            interval_secs = self.strategy.poll_interval_secs,
            "Engine running"
        );
        loop {
            self.iterate().await;
        }
    }

    /// Run exactly `n` iterations, sleeps included.
    pub async fn run_ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.iterate().await;
        }
    }

    /// One failure-isolated iteration followed by a full-interval sleep.
    async fn iterate(&mut self) {
        self.ticks += 1;
        match self.tick().await {
            Ok(report) => debug!(tick = self.ticks, state = ?report.state, "Tick complete"),
            Err(e) => error!(tick = self.ticks, error = %e, "Tick failed, skipping"),
        }
        self.sleeper.sleep(self.strategy.poll_interval()).await;
    }

    /// Fetch both candle series, classify, decide, maybe trade, settle.
    ///
    /// An `Err` means the tick was abandoned before anything was committed.
    pub async fn tick(&mut self) -> Result<TickReport> {
        let product = self.strategy.product_id.as_str();
        let short_leg = &self.strategy.short;
        let long_leg = &self.strategy.long;

        let short_candles = self
            .feed
            .fetch(product, short_leg.granularity, short_leg.lookback_secs)
            .await?;
        let long_candles = self
            .feed
            .fetch(product, long_leg.granularity, long_leg.lookback_secs)
            .await?;

        let short = moving_average(&short_candles, short_leg.window);
        let long = moving_average(&long_candles, long_leg.window);
        let relationship = classify_relationship(&short, &long);

        match relationship {
            Relationship::Unknown => warn!(
                short_candles = short_candles.len(),
                long_candles = long_candles.len(),
                short_ma = ?short.value(),
                long_ma = ?long.value(),
                "No usable moving-average relationship"
            ),
            _ => info!(short_ma = %short.value, long_ma = %long.value, %relationship, "Moving averages"),
        }

        let decision = self.machine.decide(relationship, &short);
        if let Decision::HoldForProfit {
            short_ma,
            min_sell_price,
        } = &decision
        {
            info!(%short_ma, %min_sell_price, "Short MA below long MA but not enough profit to cover fees");
        }

        let outcome = match decision.order() {
            Some(order) => Some(self.executor.submit(order).await),
            None => None,
        };
        let confirmed = outcome.as_ref().is_some_and(OrderOutcome::is_confirmed);

        self.machine.settle(relationship, &decision, confirmed);
        if confirmed {
            info!(state = ?self.machine.state(), "Position updated");
        }

        Ok(TickReport {
            short,
            long,
            relationship,
            decision,
            outcome,
            state: *self.machine.state(),
        })
    }
}
