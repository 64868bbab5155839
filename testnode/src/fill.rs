// File: testnode/src/fill.rs
//
// Block Filler
//
// Synthesizes enough pay-for-data transactions to push a block to a target
// square size and broadcasts them one at a time, one funded account per
// message.
//
// The estimate is crude on purpose: each message is sized to take roughly
// half a row of the target square, and `square_size / 4` of them are sent.

use crate::chain::{ChainRpc, TxResponse};
use crate::config::FillConfig;
use crate::error::{HarnessError, Result, SizingError};
use crate::orchestrator::TestRng;
use crate::signer::{PayForDataBuilder, SigningIdentity, TxOptions};
use tokio_util::sync::CancellationToken;

/// Number and size of the messages needed to reach a square size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillPlan {
    pub message_count: usize,
    pub payload_size: usize,
}

impl FillPlan {
    /// Derive the plan for `target_square_size` given `available` identities.
    ///
    /// - `message_count = target_square_size / 4`
    /// - `payload_size = (target_square_size / 2) * share_size - fixed_overhead`
    ///
    /// # Errors
    ///
    /// - [`SizingError::InsufficientAccounts`] if fewer than `message_count`
    ///   identities are available
    /// - [`SizingError::NonPositivePayload`] if the overhead swallows the
    ///   whole capacity
    pub fn new(
        target_square_size: usize,
        available: usize,
        config: &FillConfig,
    ) -> Result<Self, SizingError> {
        let message_count = target_square_size / 4;
        if available < message_count {
            return Err(SizingError::InsufficientAccounts {
                required: message_count,
                available,
            });
        }

        let capacity = (target_square_size / 2).saturating_mul(config.share_size);
        if capacity <= config.fixed_overhead {
            return Err(SizingError::NonPositivePayload {
                target_square_size,
                payload_size: i64::try_from(capacity)
                    .unwrap_or(i64::MAX)
                    .saturating_sub(i64::try_from(config.fixed_overhead).unwrap_or(i64::MAX)),
            });
        }

        Ok(Self {
            message_count,
            payload_size: capacity - config.fixed_overhead,
        })
    }

    /// Payload bytes submitted across all messages
    pub fn total_payload(&self) -> usize {
        self.message_count * self.payload_size
    }
}

/// Fill a block to `target_square_size` with the default sizing constants.
///
/// Returns one [`TxResponse`] per identity used, in identity order. Nothing
/// is returned on failure: the first error aborts the batch and transactions
/// already broadcast stay in flight.
///
/// # Example
///
/// ```rust,ignore
/// let responses = fill_block(&chain, &keyring, 16, &identities).await?;
/// wait_for_next_block(&chain).await?;
/// wait_for_next_block(&chain).await?;
/// verify_fill(&chain, &responses, 16).await?;
/// ```
pub async fn fill_block<C, B>(
    chain: &C,
    builder: &B,
    target_square_size: usize,
    identities: &[SigningIdentity],
) -> Result<Vec<TxResponse>>
where
    C: ChainRpc + ?Sized,
    B: PayForDataBuilder + ?Sized,
{
    BlockFiller::default()
        .fill_block(chain, builder, target_square_size, identities)
        .await
}

/// Same as [`fill_block`], checking `cancel` before every submission.
pub async fn fill_block_until_cancelled<C, B>(
    chain: &C,
    builder: &B,
    target_square_size: usize,
    identities: &[SigningIdentity],
    cancel: &CancellationToken,
) -> Result<Vec<TxResponse>>
where
    C: ChainRpc + ?Sized,
    B: PayForDataBuilder + ?Sized,
{
    BlockFiller::default()
        .fill_block_until_cancelled(chain, builder, target_square_size, identities, cancel)
        .await
}

/// Block filler with configurable sizing and a replayable RNG
pub struct BlockFiller {
    config: FillConfig,
    rng: TestRng,
}

impl BlockFiller {
    pub fn new(config: FillConfig) -> Self {
        Self {
            config,
            rng: TestRng::new_from_env_or_random(),
        }
    }

    pub fn with_rng(mut self, rng: TestRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    pub fn plan(&self, target_square_size: usize, available: usize) -> Result<FillPlan> {
        Ok(FillPlan::new(target_square_size, available, &self.config)?)
    }

    pub async fn fill_block<C, B>(
        &self,
        chain: &C,
        builder: &B,
        target_square_size: usize,
        identities: &[SigningIdentity],
    ) -> Result<Vec<TxResponse>>
    where
        C: ChainRpc + ?Sized,
        B: PayForDataBuilder + ?Sized,
    {
        self.fill(chain, builder, target_square_size, identities, None)
            .await
    }

    pub async fn fill_block_until_cancelled<C, B>(
        &self,
        chain: &C,
        builder: &B,
        target_square_size: usize,
        identities: &[SigningIdentity],
        cancel: &CancellationToken,
    ) -> Result<Vec<TxResponse>>
    where
        C: ChainRpc + ?Sized,
        B: PayForDataBuilder + ?Sized,
    {
        self.fill(chain, builder, target_square_size, identities, Some(cancel))
            .await
    }

    async fn fill<C, B>(
        &self,
        chain: &C,
        builder: &B,
        target_square_size: usize,
        identities: &[SigningIdentity],
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<TxResponse>>
    where
        C: ChainRpc + ?Sized,
        B: PayForDataBuilder + ?Sized,
    {
        let plan = self.plan(target_square_size, identities.len())?;
        let options = TxOptions {
            gas_limit: self.config.gas_limit,
        };

        log::info!(
            "filling square size {} with {} messages of {} bytes on {}",
            target_square_size,
            plan.message_count,
            plan.payload_size,
            chain.chain_id()
        );

        let mut responses = Vec::with_capacity(plan.message_count);
        for (index, identity) in identities.iter().take(plan.message_count).enumerate() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                log::warn!(
                    "block fill cancelled with {} of {} messages broadcast",
                    index,
                    plan.message_count
                );
                return Err(HarnessError::FillCancelled { submitted: index });
            }

            let response = self
                .submit_one(chain, builder, index, identity, &plan, &options)
                .await?;
            responses.push(response);
        }

        Ok(responses)
    }

    async fn submit_one<C, B>(
        &self,
        chain: &C,
        builder: &B,
        index: usize,
        identity: &SigningIdentity,
        plan: &FillPlan,
        options: &TxOptions,
    ) -> Result<TxResponse>
    where
        C: ChainRpc + ?Sized,
        B: PayForDataBuilder + ?Sized,
    {
        let namespace = self
            .rng
            .random_valid_namespace(self.config.max_namespace_attempts)?;
        let payload = self.rng.random_bytes(plan.payload_size);

        let unsigned = builder
            .build_pay_for_data(identity, namespace, payload, options)
            .await
            .map_err(HarnessError::ConstructionFailure)?;
        let signed = builder
            .sign(identity, unsigned, options)
            .map_err(HarnessError::ConstructionFailure)?;
        let raw_tx = builder
            .encode(identity, &signed)
            .map_err(HarnessError::ConstructionFailure)?;

        let response = chain
            .broadcast_tx_sync(raw_tx)
            .await
            .map_err(HarnessError::QueryFailure)?;

        if !response.is_ok() {
            log::warn!(
                "tx {} from {} rejected with code {}: {}",
                index,
                identity.name(),
                response.code,
                response.raw_log
            );
            return Err(HarnessError::BroadcastRejected {
                index,
                code: response.code,
                raw_log: response.raw_log,
            });
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "tx {} from {} in namespace {} broadcast as {}",
                index,
                identity.name(),
                namespace,
                response.hash
            );
        }
        Ok(response)
    }
}

impl Default for BlockFiller {
    fn default() -> Self {
        Self::new(FillConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plan_for_square_16() {
        let plan = FillPlan::new(16, 300, &FillConfig::default()).unwrap();
        assert_eq!(plan.message_count, 4);
        assert_eq!(plan.payload_size, 8 * 248 - 300);
        assert_eq!(plan.total_payload(), 4 * 1684);
    }

    #[test]
    fn test_plan_requires_enough_identities() {
        let err = FillPlan::new(16, 3, &FillConfig::default()).unwrap_err();
        assert_eq!(
            err,
            SizingError::InsufficientAccounts {
                required: 4,
                available: 3
            }
        );
    }

    #[test]
    fn test_plan_exact_identity_count_is_enough() {
        assert!(FillPlan::new(64, 16, &FillConfig::default()).is_ok());
    }

    #[test]
    fn test_plan_rejects_non_positive_payload() {
        // 1 * 248 - 300 < 0
        let err = FillPlan::new(2, 10, &FillConfig::default()).unwrap_err();
        assert_eq!(
            err,
            SizingError::NonPositivePayload {
                target_square_size: 2,
                payload_size: -52
            }
        );

        let config = FillConfig {
            fixed_overhead: 4 * 248,
            ..FillConfig::default()
        };
        assert!(matches!(
            FillPlan::new(8, 10, &config),
            Err(SizingError::NonPositivePayload { payload_size: 0, .. })
        ));
    }

    #[test]
    fn test_huge_overhead_reports_negative_payload() {
        let config = FillConfig {
            fixed_overhead: usize::MAX,
            ..FillConfig::default()
        };
        match FillPlan::new(16, 10, &config) {
            Err(SizingError::NonPositivePayload { payload_size, .. }) => {
                assert_eq!(payload_size, 8 * 248 - i64::MAX);
            }
            other => panic!("expected non-positive payload, got {other:?}"),
        }
    }

    #[test]
    fn test_account_check_precedes_payload_check() {
        let config = FillConfig {
            fixed_overhead: usize::MAX,
            ..FillConfig::default()
        };
        assert!(matches!(
            FillPlan::new(16, 0, &config),
            Err(SizingError::InsufficientAccounts { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_plan_matches_formula(square in 4usize..=512, available in 0usize..200) {
            let config = FillConfig::default();
            match FillPlan::new(square, available, &config) {
                Ok(plan) => {
                    prop_assert_eq!(plan.message_count, square / 4);
                    prop_assert!(plan.message_count <= available);
                    prop_assert_eq!(plan.payload_size + config.fixed_overhead, (square / 2) * config.share_size);
                }
                Err(SizingError::InsufficientAccounts { required, available: have }) => {
                    prop_assert_eq!(required, square / 4);
                    prop_assert!(have < required);
                }
                Err(SizingError::NonPositivePayload { .. }) => {
                    prop_assert!((square / 2) * config.share_size <= config.fixed_overhead);
                }
            }
        }
    }
}
