//! SimulatedChain - in-process chain for harness tests
//!
//! Provides just enough of a node for the waiters and the filler to be
//! exercised end to end: an account table with sequences, a mempool fed by
//! `broadcast_tx_sync`, block production that lays transactions out in a data
//! square, and a tx index for lookups without proof.

use super::keyring::{sign_with_key, SignedPayForData, SimulatedKeyring, MAX_ACCOUNT_NAME_LEN};
use crate::chain::{
    tx_hash, BlockInfo, ChainRpc, ChainStatus, TxResponse, TxResult, CODE_TYPE_OK,
};
use crate::shares::{self, MAX_SQUARE_SIZE, MIN_SQUARE_SIZE};
use crate::signer::SigningIdentity;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use sha3::{Digest, Sha3_256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// The raw transaction could not be decoded
pub const CODE_TX_DECODE: u32 = 2;
/// Signature verification failed
pub const CODE_UNAUTHORIZED: u32 = 4;
/// The signer has no account
pub const CODE_UNKNOWN_ADDRESS: u32 = 9;
/// The message is malformed (reserved namespace, empty payload)
pub const CODE_INVALID_REQUEST: u32 = 18;
/// The transaction is already known
pub const CODE_TX_IN_MEMPOOL: u32 = 19;
/// The message cannot fit in the largest square
pub const CODE_TX_TOO_LARGE: u32 = 21;
/// The transaction sequence does not match the account
pub const CODE_WRONG_SEQUENCE: u32 = 32;

struct Account {
    key: [u8; 32],
    sequence: u64,
}

struct PendingTx {
    raw: Vec<u8>,
    hash: [u8; 32],
}

#[derive(Default)]
struct ChainState {
    /// Account names in funding order
    names: Vec<String>,
    accounts: HashMap<String, Account>,
    mempool: Vec<PendingTx>,
    blocks: Vec<BlockInfo>,
    tx_index: HashMap<[u8; 32], TxResult>,
}

struct Inner {
    chain_id: String,
    state: Mutex<ChainState>,
    halted: AtomicBool,
    status_failing: AtomicBool,
}

/// In-process chain implementing [`ChainRpc`]
///
/// Cloning is cheap and every clone observes the same chain.
///
/// # Example
///
/// ```rust,ignore
/// let chain = SimulatedChainBuilder::new()
///     .with_funded_accounts(["alice", "bob"])
///     .build()?;
///
/// let cancel = CancellationToken::new();
/// let producer = chain.spawn_producer(Duration::from_millis(100), cancel.clone());
///
/// wait_for_next_block(&chain).await?;
/// cancel.cancel();
/// producer.await?;
/// ```
#[derive(Clone)]
pub struct SimulatedChain {
    inner: Arc<Inner>,
}

impl SimulatedChain {
    /// Empty chain at height 0 with no accounts
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                chain_id: chain_id.into(),
                state: Mutex::new(ChainState::default()),
                halted: AtomicBool::new(false),
                status_failing: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.chain_id
    }

    /// Register a funded account and return its signing identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, longer than
    /// [`MAX_ACCOUNT_NAME_LEN`] or already funded.
    pub fn fund_account(&self, name: &str) -> Result<SigningIdentity> {
        if name.is_empty() || name.len() > MAX_ACCOUNT_NAME_LEN {
            anyhow::bail!(
                "account name must be 1..={} bytes, got {}",
                MAX_ACCOUNT_NAME_LEN,
                name.len()
            );
        }

        let mut state = self.inner.state.lock();
        if state.accounts.contains_key(name) {
            anyhow::bail!("account {} already funded", name);
        }

        let key = derive_key(&self.inner.chain_id, name);
        state
            .accounts
            .insert(name.to_string(), Account { key, sequence: 0 });
        state.names.push(name.to_string());

        Ok(SigningIdentity::new(name, self.inner.chain_id.clone()))
    }

    /// Signing identities of all funded accounts, in funding order
    pub fn identities(&self) -> Vec<SigningIdentity> {
        let state = self.inner.state.lock();
        state
            .names
            .iter()
            .map(|name| SigningIdentity::new(name.clone(), self.inner.chain_id.clone()))
            .collect()
    }

    /// Transaction pipeline signing with this chain's accounts
    pub fn keyring(&self) -> SimulatedKeyring {
        SimulatedKeyring::new(self.clone())
    }

    /// Next expected sequence of an account
    pub fn sequence(&self, name: &str) -> Option<u64> {
        self.inner
            .state
            .lock()
            .accounts
            .get(name)
            .map(|account| account.sequence)
    }

    pub(crate) fn account_key(&self, name: &str) -> Option<[u8; 32]> {
        self.inner
            .state
            .lock()
            .accounts
            .get(name)
            .map(|account| account.key)
    }

    pub fn height(&self) -> u64 {
        self.inner.state.lock().blocks.len() as u64
    }

    pub fn mempool_len(&self) -> usize {
        self.inner.state.lock().mempool.len()
    }

    /// Stop the background producer from committing blocks.
    pub fn halt(&self) {
        self.inner.halted.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.inner.halted.store(false, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.inner.halted.load(Ordering::SeqCst)
    }

    /// Make status queries fail as if the node were unreachable.
    pub fn set_status_failing(&self, failing: bool) {
        self.inner.status_failing.store(failing, Ordering::SeqCst);
    }

    /// Commit the next block.
    ///
    /// Pending transactions are included in arrival order for as long as the
    /// square stays within [`MAX_SQUARE_SIZE`]; the rest wait for a later
    /// block.
    pub fn produce_block(&self) -> BlockInfo {
        let mut state = self.inner.state.lock();
        let height = state.blocks.len() as u64 + 1;

        let mut lens = Vec::with_capacity(state.mempool.len());
        for tx in &state.mempool {
            lens.push(tx.raw.len());
            if shares::square_size_for(lens.iter().copied()).is_none() {
                lens.pop();
                break;
            }
        }
        let square_size =
            shares::square_size_for(lens.iter().copied()).unwrap_or(MIN_SQUARE_SIZE);
        let included: Vec<PendingTx> = state.mempool.drain(..lens.len()).collect();

        for tx in &included {
            state.tx_index.insert(
                tx.hash,
                TxResult {
                    hash: hex::encode_upper(tx.hash),
                    height,
                    code: CODE_TYPE_OK,
                    raw_log: String::new(),
                },
            );
        }

        let block = BlockInfo {
            chain_id: self.inner.chain_id.clone(),
            height,
            txs: included.into_iter().map(|tx| tx.raw).collect(),
            square_size,
        };
        state.blocks.push(block.clone());

        log::debug!(
            "committed block {} with {} txs (square size {}, {} pending)",
            height,
            block.txs.len(),
            square_size,
            state.mempool.len()
        );
        block
    }

    /// Commit a block every `interval` until `cancel` fires.
    ///
    /// Ticks are skipped while the chain is halted.
    pub fn spawn_producer(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let chain = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if !chain.is_halted() {
                    chain.produce_block();
                }
            }
            log::debug!("block producer for {} stopped", chain.id());
        })
    }

    /// Mempool admission: decode, authenticate and sequence-check the tx.
    fn check_tx(&self, raw: &[u8]) -> std::result::Result<(), (u32, String)> {
        let signed = SignedPayForData::from_bytes(raw)
            .map_err(|e| (CODE_TX_DECODE, format!("tx parse error: {:#}", e)))?;
        let tx = &signed.tx;

        if tx.namespace.is_reserved() {
            return Err((
                CODE_INVALID_REQUEST,
                format!("namespace {} is reserved", tx.namespace),
            ));
        }
        if tx.payload.is_empty() {
            return Err((CODE_INVALID_REQUEST, "empty message payload".to_string()));
        }
        if shares::shares_for(raw.len()) as u64 > MAX_SQUARE_SIZE / 2 {
            return Err((
                CODE_TX_TOO_LARGE,
                format!("tx of {} bytes cannot fit in a block", raw.len()),
            ));
        }

        let hash = tx_hash(raw);
        let mut state = self.inner.state.lock();
        if state.tx_index.contains_key(&hash) || state.mempool.iter().any(|p| p.hash == hash) {
            return Err((CODE_TX_IN_MEMPOOL, "tx already in mempool".to_string()));
        }

        let account = state.accounts.get_mut(&tx.signer).ok_or_else(|| {
            (
                CODE_UNKNOWN_ADDRESS,
                format!("account {} does not exist", tx.signer),
            )
        })?;
        let sign_bytes = tx
            .sign_bytes()
            .map_err(|e| (CODE_TX_DECODE, format!("tx encode error: {:#}", e)))?;
        if sign_with_key(&account.key, &sign_bytes) != signed.signature {
            return Err((
                CODE_UNAUTHORIZED,
                format!("signature verification failed for {}", tx.signer),
            ));
        }
        if tx.sequence != account.sequence {
            return Err((
                CODE_WRONG_SEQUENCE,
                format!(
                    "account sequence mismatch, expected {}, got {}",
                    account.sequence, tx.sequence
                ),
            ));
        }

        account.sequence += 1;
        state.mempool.push(PendingTx {
            raw: raw.to_vec(),
            hash,
        });
        Ok(())
    }
}

#[async_trait]
impl ChainRpc for SimulatedChain {
    fn chain_id(&self) -> &str {
        &self.inner.chain_id
    }

    async fn status(&self) -> Result<ChainStatus> {
        if self.inner.status_failing.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused: {} status endpoint unavailable", self.id());
        }
        Ok(ChainStatus {
            latest_height: self.height(),
        })
    }

    async fn broadcast_tx_sync(&self, raw_tx: Vec<u8>) -> Result<TxResponse> {
        let hash = hex::encode_upper(tx_hash(&raw_tx));
        let response = match self.check_tx(&raw_tx) {
            Ok(()) => TxResponse {
                hash,
                code: CODE_TYPE_OK,
                raw_log: String::new(),
            },
            Err((code, raw_log)) => TxResponse {
                hash,
                code,
                raw_log,
            },
        };
        Ok(response)
    }

    async fn block_by_height(&self, height: u64) -> Result<Option<BlockInfo>> {
        if height == 0 {
            return Ok(None);
        }
        let state = self.inner.state.lock();
        Ok(state.blocks.get((height - 1) as usize).cloned())
    }

    async fn tx(&self, hash: &[u8]) -> Result<Option<TxResult>> {
        let Ok(hash) = <[u8; 32]>::try_from(hash) else {
            anyhow::bail!("tx hash must be 32 bytes, got {}", hash.len());
        };
        Ok(self.inner.state.lock().tx_index.get(&hash).cloned())
    }
}

/// Deterministic per-account key for the simulated signature scheme
fn derive_key(chain_id: &str, name: &str) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(chain_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(name.as_bytes());
    hasher.finalize().into()
}
