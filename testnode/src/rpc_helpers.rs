//! RPC assertion helpers for fill verification
//!
//! These helpers let a test confirm, once the chain has moved on, that the
//! transactions returned by [`fill_block`](crate::fill::fill_block) were
//! committed together in a block of the requested square size.

use crate::chain::{BlockInfo, ChainRpc, TxResponse, TxResult, CODE_TYPE_OK};
use anyhow::{Context, Result};

/// Look up a committed transaction by its hex hash, without a proof.
///
/// # Errors
///
/// Returns an error if:
/// - `hash_hex` is not valid hex
/// - RPC call fails
/// - The transaction is not committed
///
/// # Example
///
/// ```rust,ignore
/// let result = query_without_proof(&chain, &response.hash).await?;
/// assert_eq!(result.code, CODE_TYPE_OK);
/// ```
pub async fn query_without_proof<C>(chain: &C, hash_hex: &str) -> Result<TxResult>
where
    C: ChainRpc + ?Sized,
{
    let hash = hex::decode(hash_hex).with_context(|| format!("Invalid tx hash {}", hash_hex))?;

    chain
        .tx(&hash)
        .await
        .with_context(|| format!("Failed to query tx {}", hash_hex))?
        .with_context(|| format!("Tx {} not found", hash_hex))
}

/// Assert that a broadcast transaction was committed with an OK code.
///
/// Returns the committed result for further checks.
pub async fn assert_tx_committed<C>(chain: &C, response: &TxResponse) -> Result<TxResult>
where
    C: ChainRpc + ?Sized,
{
    let result = query_without_proof(chain, &response.hash).await?;

    if result.code != CODE_TYPE_OK {
        anyhow::bail!(
            "Tx {} committed with code {}: {}",
            result.hash,
            result.code,
            result.raw_log
        );
    }

    Ok(result)
}

/// Assert that all transactions were committed at the same height.
///
/// # Errors
///
/// Returns an error if `responses` is empty, if any transaction is missing or
/// failed, or if two transactions landed in different blocks.
pub async fn assert_same_inclusion_height<C>(chain: &C, responses: &[TxResponse]) -> Result<u64>
where
    C: ChainRpc + ?Sized,
{
    let mut inclusion_height = None;

    for response in responses {
        let result = assert_tx_committed(chain, response).await?;
        match inclusion_height {
            None => inclusion_height = Some(result.height),
            Some(height) if height != result.height => {
                anyhow::bail!(
                    "Tx {} included at height {}, expected {}",
                    result.hash,
                    result.height,
                    height
                );
            }
            Some(_) => {}
        }
    }

    inclusion_height.context("No transactions to check")
}

/// Assert that the block at `height` has the expected square size.
pub async fn assert_square_size<C>(chain: &C, height: u64, expected: u64) -> Result<BlockInfo>
where
    C: ChainRpc + ?Sized,
{
    let block = chain
        .block_by_height(height)
        .await
        .with_context(|| format!("Failed to get block {}", height))?
        .with_context(|| format!("Block {} not found", height))?;

    if block.square_size != expected {
        anyhow::bail!(
            "Square size mismatch at height {}: expected {}, got {}",
            height,
            expected,
            block.square_size
        );
    }

    Ok(block)
}

/// Check a completed fill: every transaction committed in one block whose
/// square size equals `target_square_size`.
///
/// Returns the inclusion height.
pub async fn verify_fill<C>(
    chain: &C,
    responses: &[TxResponse],
    target_square_size: usize,
) -> Result<u64>
where
    C: ChainRpc + ?Sized,
{
    let height = assert_same_inclusion_height(chain, responses).await?;
    assert_square_size(chain, height, target_square_size as u64).await?;
    Ok(height)
}

/// Assert that the chain's latest height is at least `min_height`.
pub async fn assert_height_at_least<C>(chain: &C, min_height: u64) -> Result<u64>
where
    C: ChainRpc + ?Sized,
{
    let actual = chain
        .status()
        .await
        .context("Failed to get status")?
        .latest_height;

    if actual < min_height {
        anyhow::bail!(
            "Height too low: expected >={}, got {}",
            min_height,
            actual
        );
    }

    Ok(actual)
}
