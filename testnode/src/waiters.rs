// File: testnode/src/waiters.rs
//
// Height Waiters
//
// Replace sleep-based timing in chain tests: poll the status endpoint on a
// fixed cadence until a target height is committed or a deadline passes.
//
// Only "not at the target yet" is retried. A failed status query ends the
// wait immediately.

use crate::chain::ChainRpc;
use crate::config::WaitConfig;
use crate::error::{HarnessError, Result};
use crate::orchestrator::{Clock, SystemClock};
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Query the latest committed height once.
///
/// # Errors
///
/// Returns [`HarnessError::QueryFailure`] if the status query fails.
pub async fn latest_height<C>(chain: &C) -> Result<u64>
where
    C: ChainRpc + ?Sized,
{
    chain
        .status()
        .await
        .map(|status| status.latest_height)
        .map_err(HarnessError::QueryFailure)
}

/// Wait for `target` using the default cadence and timeout (1s / 10s).
///
/// Returns the height observed when the wait ended.
///
/// # Example
///
/// ```rust,ignore
/// let height = wait_for_height(&chain, 20).await?;
/// assert!(height >= 20);
/// ```
pub async fn wait_for_height<C>(chain: &C, target: u64) -> Result<u64>
where
    C: ChainRpc + ?Sized,
{
    HeightWaiter::default().wait_for_height(chain, target).await
}

/// Same as [`wait_for_height`] with a caller-provided timeout.
pub async fn wait_for_height_with_timeout<C>(chain: &C, target: u64, timeout: Duration) -> Result<u64>
where
    C: ChainRpc + ?Sized,
{
    HeightWaiter::default()
        .wait_for_height_with_timeout(chain, target, timeout)
        .await
}

/// Same as [`wait_for_height_with_timeout`], aborting at the next tick once
/// `cancel` fires.
pub async fn wait_for_height_until_cancelled<C>(
    chain: &C,
    target: u64,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<u64>
where
    C: ChainRpc + ?Sized,
{
    HeightWaiter::default()
        .wait_for_height_until_cancelled(chain, target, timeout, cancel)
        .await
}

/// Wait for the block after the current one to be committed.
pub async fn wait_for_next_block<C>(chain: &C) -> Result<u64>
where
    C: ChainRpc + ?Sized,
{
    HeightWaiter::default().wait_for_next_block(chain).await
}

/// Height poller with injectable cadence and clock
///
/// # Example
///
/// ```rust,ignore
/// let waiter = HeightWaiter::new(WaitConfig {
///     poll_interval_ms: 100,
///     default_timeout_ms: 5_000,
/// })?;
/// waiter.wait_for_next_block(&chain).await?;
/// ```
pub struct HeightWaiter {
    config: WaitConfig,
    clock: Arc<dyn Clock>,
}

impl HeightWaiter {
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] for a zero poll interval or a default
    /// timeout shorter than one interval.
    pub fn new(config: WaitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    pub async fn wait_for_height<C>(&self, chain: &C, target: u64) -> Result<u64>
    where
        C: ChainRpc + ?Sized,
    {
        self.poll(chain, target, self.config.default_timeout(), None)
            .await
    }

    pub async fn wait_for_height_with_timeout<C>(
        &self,
        chain: &C,
        target: u64,
        timeout: Duration,
    ) -> Result<u64>
    where
        C: ChainRpc + ?Sized,
    {
        self.poll(chain, target, timeout, None).await
    }

    pub async fn wait_for_height_until_cancelled<C>(
        &self,
        chain: &C,
        target: u64,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        C: ChainRpc + ?Sized,
    {
        self.poll(chain, target, timeout, Some(cancel)).await
    }

    /// Read the current height `h` once, then wait for `h + 1`.
    pub async fn wait_for_next_block<C>(&self, chain: &C) -> Result<u64>
    where
        C: ChainRpc + ?Sized,
    {
        let current = latest_height(chain).await?;
        self.wait_for_height(chain, current + 1).await
    }

    /// Tick every `poll_interval`, first tick one interval after the start.
    ///
    /// A tick that would land at or past the deadline is not taken: the wait
    /// sleeps out the remainder and reports a timeout. A timeout too large to
    /// represent as an instant means no deadline.
    async fn poll<C>(
        &self,
        chain: &C,
        target: u64,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<u64>
    where
        C: ChainRpc + ?Sized,
    {
        let interval = self.config.poll_interval();
        let start = self.clock.now();
        let deadline = start.checked_add(timeout);
        let mut last_height = 0;
        let mut ticks: u32 = 0;

        loop {
            ticks = ticks.saturating_add(1);
            let next_tick = interval
                .checked_mul(ticks)
                .and_then(|offset| start.checked_add(offset));

            if let Some(deadline) = deadline {
                if next_tick.map_or(true, |tick| tick >= deadline) {
                    self.clock.sleep_until(deadline).await;
                    log::debug!(
                        "timed out waiting for height {} after {:?} (last seen {})",
                        target,
                        timeout,
                        last_height
                    );
                    return Err(HarnessError::Timeout {
                        target,
                        last_height,
                    });
                }
            }

            match next_tick {
                Some(tick) => self.clock.sleep_until(tick).await,
                None => self.clock.sleep(interval).await,
            }

            if cancel.is_some_and(CancellationToken::is_cancelled) {
                log::debug!("wait for height {} cancelled at tick {}", target, ticks);
                return Err(HarnessError::Cancelled { last_height });
            }

            last_height = latest_height(chain).await?;
            if log::log_enabled!(log::Level::Trace) {
                log::trace!(
                    "tick {}: height {} (target {})",
                    ticks,
                    last_height,
                    target
                );
            }

            if last_height >= target {
                return Ok(last_height);
            }
        }
    }
}

impl Default for HeightWaiter {
    fn default() -> Self {
        Self {
            config: WaitConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{BlockInfo, ChainStatus, TxResponse, TxResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a script of heights, repeating the last one forever
    struct ScriptedNode {
        heights: Mutex<VecDeque<u64>>,
        queries: AtomicUsize,
        fail_on_query: Option<usize>,
    }

    impl ScriptedNode {
        fn new(heights: &[u64]) -> Self {
            Self {
                heights: Mutex::new(heights.iter().copied().collect()),
                queries: AtomicUsize::new(0),
                fail_on_query: None,
            }
        }

        fn failing_on(mut self, query: usize) -> Self {
            self.fail_on_query = Some(query);
            self
        }

        fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChainRpc for ScriptedNode {
        fn chain_id(&self) -> &str {
            "scripted"
        }

        async fn status(&self) -> anyhow::Result<ChainStatus> {
            let query = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_query == Some(query) {
                anyhow::bail!("connection refused");
            }

            let mut heights = self.heights.lock();
            let latest_height = if heights.len() > 1 {
                heights.pop_front().unwrap_or_default()
            } else {
                heights.front().copied().unwrap_or_default()
            };
            Ok(ChainStatus { latest_height })
        }

        async fn broadcast_tx_sync(&self, _raw_tx: Vec<u8>) -> anyhow::Result<TxResponse> {
            unreachable!("waiters never broadcast")
        }

        async fn block_by_height(&self, _height: u64) -> anyhow::Result<Option<BlockInfo>> {
            Ok(None)
        }

        async fn tx(&self, _hash: &[u8]) -> anyhow::Result<Option<TxResult>> {
            Ok(None)
        }
    }

    fn fast_waiter() -> HeightWaiter {
        HeightWaiter::new(WaitConfig {
            poll_interval_ms: 100,
            default_timeout_ms: 1_000,
        })
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reached_on_first_tick() {
        let node = ScriptedNode::new(&[100]);
        let height = fast_waiter().wait_for_height(&node, 100).await.unwrap();
        assert_eq!(height, 100);
        assert_eq!(node.queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_happens_after_one_interval() {
        let node = ScriptedNode::new(&[5]);
        let start = tokio::time::Instant::now();
        fast_waiter().wait_for_height(&node, 5).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_reached() {
        let node = ScriptedNode::new(&[1, 2, 3, 4]);
        let height = fast_waiter().wait_for_height(&node, 4).await.unwrap();
        assert_eq!(height, 4);
        assert_eq!(node.queries(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overshoot_returns_observed_height() {
        let node = ScriptedNode::new(&[3, 9]);
        let height = fast_waiter().wait_for_height(&node, 5).await.unwrap();
        assert_eq!(height, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_last_height() {
        let node = ScriptedNode::new(&[7]);
        let start = tokio::time::Instant::now();

        let err = fast_waiter().wait_for_height(&node, 8).await.unwrap_err();

        assert!(matches!(
            err,
            HarnessError::Timeout {
                target: 8,
                last_height: 7
            }
        ));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1_100));
        // ticks at 100..900ms; the 1000ms tick coincides with the deadline
        assert_eq!(node.queries(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_shorter_than_interval_never_polls() {
        let node = ScriptedNode::new(&[7]);
        let err = fast_waiter()
            .wait_for_height_with_timeout(&node, 8, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert_eq!(err.last_height(), Some(0));
        assert_eq!(node.queries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_failure_is_not_retried() {
        let node = ScriptedNode::new(&[1, 2, 3]).failing_on(2);
        let err = fast_waiter().wait_for_height(&node, 3).await.unwrap_err();

        assert!(matches!(err, HarnessError::QueryFailure(_)));
        assert_eq!(node.queries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_block_waits_for_increment() {
        let node = ScriptedNode::new(&[5, 5, 5, 6]);
        let height = fast_waiter().wait_for_next_block(&node).await.unwrap();
        assert_eq!(height, 6);
        assert_eq!(node.queries(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_block_propagates_initial_query_failure() {
        let node = ScriptedNode::new(&[5]).failing_on(1);
        let err = fast_waiter().wait_for_next_block(&node).await.unwrap_err();
        assert!(matches!(err, HarnessError::QueryFailure(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_takes_effect_at_tick_boundary() {
        let node = ScriptedNode::new(&[1]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let start = tokio::time::Instant::now();
        let err = fast_waiter()
            .wait_for_height_until_cancelled(&node, 10, Duration::from_secs(5), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, HarnessError::Cancelled { last_height: 0 }));
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_millis(200));
        assert_eq!(node.queries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_wait_keeps_last_height() {
        let node = Arc::new(ScriptedNode::new(&[1, 2, 3]));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(250)).await;
                cancel.cancel();
            })
        };

        let err = fast_waiter()
            .wait_for_height_until_cancelled(&*node, 10, Duration::from_secs(5), &cancel)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, HarnessError::Cancelled { last_height: 2 }));
        assert_eq!(node.queries(), 2);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = HeightWaiter::new(WaitConfig {
            poll_interval_ms: 0,
            default_timeout_ms: 100,
        });
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_timeout_shorter_than_interval_rejected() {
        let result = HeightWaiter::new(WaitConfig {
            poll_interval_ms: 500,
            default_timeout_ms: 100,
        });
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_waits_for_target() {
        let node = ScriptedNode::new(&[1, 1, 1, 2]);
        let height = fast_waiter()
            .wait_for_height_with_timeout(&node, 2, Duration::MAX)
            .await
            .unwrap();

        assert_eq!(height, 2);
        assert_eq!(node.queries(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_still_honours_cancel() {
        let node = ScriptedNode::new(&[1]);
        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                cancel.cancel();
            });
        }

        let err = fast_waiter()
            .wait_for_height_until_cancelled(&node, 2, Duration::MAX, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, HarnessError::Cancelled { last_height: 1 }));
    }
}
