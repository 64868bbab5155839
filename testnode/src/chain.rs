//! Chain capability trait and the data it returns.
//!
//! The harness never owns a chain client. Every operation borrows a
//! [`ChainRpc`] for the duration of the call, whether it is backed by a real
//! node or by the in-process [`SimulatedChain`](crate::simulated::SimulatedChain).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Response code of an accepted transaction
pub const CODE_TYPE_OK: u32 = 0;

/// Node status as reported by the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
    pub latest_height: u64,
}

/// Outcome of a synchronous broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    /// Upper-case hex transaction hash
    pub hash: String,
    pub code: u32,
    /// Diagnostic text from the chain, set when `code` is not OK
    pub raw_log: String,
}

impl TxResponse {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_TYPE_OK
    }
}

/// A committed block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub chain_id: String,
    pub height: u64,
    /// Raw transactions in inclusion order
    pub txs: Vec<Vec<u8>>,
    /// Width of the block's data square
    pub square_size: u64,
}

/// Execution result of a committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub hash: String,
    pub height: u64,
    pub code: u32,
    pub raw_log: String,
}

/// Chain endpoint used by the waiters, the filler and the verification helpers.
///
/// Implementations report transport failures as errors. A broadcast the chain
/// refuses is not an error at this level: it comes back as a [`TxResponse`]
/// with a non-OK code.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Identifier of the chain this endpoint serves
    fn chain_id(&self) -> &str;

    /// Query node status.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unreachable or the query fails.
    async fn status(&self) -> Result<ChainStatus>;

    /// Submit a raw transaction and wait for the mempool check.
    ///
    /// # Errors
    ///
    /// Returns an error only if the request could not be delivered.
    async fn broadcast_tx_sync(&self, raw_tx: Vec<u8>) -> Result<TxResponse>;

    /// Fetch the block at `height`, or `None` if it is not committed yet.
    async fn block_by_height(&self, height: u64) -> Result<Option<BlockInfo>>;

    /// Look up a committed transaction by hash, without an inclusion proof.
    async fn tx(&self, hash: &[u8]) -> Result<Option<TxResult>>;
}

/// SHA3-256 hash of a raw transaction
pub fn tx_hash(raw_tx: &[u8]) -> [u8; 32] {
    Sha3_256::digest(raw_tx).into()
}

/// Hash of a raw transaction as reported in [`TxResponse::hash`]
pub fn tx_hash_hex(raw_tx: &[u8]) -> String {
    hex::encode_upper(tx_hash(raw_tx))
}
