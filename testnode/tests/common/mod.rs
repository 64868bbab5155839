// Shared mocks for the integration tests.
//
// RecordingChain accepts every broadcast unless told otherwise and keeps what
// it saw; RecordingBuilder builds plain byte messages and can fail on demand.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use testnode::chain::{
    tx_hash_hex, BlockInfo, ChainRpc, ChainStatus, TxResponse, TxResult, CODE_TYPE_OK,
};
use testnode::namespace::NamespaceId;
use testnode::signer::{PayForDataBuilder, SigningIdentity, TxOptions};
use tokio_util::sync::CancellationToken;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Mock node that records every broadcast
pub struct RecordingChain {
    height: AtomicU64,
    broadcasts: Mutex<Vec<Vec<u8>>>,
    /// Hashes of the broadcasts answered with an OK code
    accepted: Mutex<Vec<String>>,
    /// Broadcast attempt (0-based) answered with a rejection code
    reject_at: Option<(usize, u32)>,
    /// Broadcast attempt (0-based) that fails at the transport level
    fail_at: Option<usize>,
    /// Token cancelled right after the given attempt is accepted
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingChain {
    pub fn new() -> Self {
        Self {
            height: AtomicU64::new(1),
            broadcasts: Mutex::new(Vec::new()),
            accepted: Mutex::new(Vec::new()),
            reject_at: None,
            fail_at: None,
            cancel_after: None,
        }
    }

    pub fn rejecting_at(mut self, attempt: usize, code: u32) -> Self {
        self.reject_at = Some((attempt, code));
        self
    }

    pub fn failing_at(mut self, attempt: usize) -> Self {
        self.fail_at = Some(attempt);
        self
    }

    pub fn cancelling_after(mut self, attempt: usize, cancel: CancellationToken) -> Self {
        self.cancel_after = Some((attempt, cancel));
        self
    }

    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.broadcasts.lock().clone()
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().len()
    }

    pub fn accepted(&self) -> Vec<String> {
        self.accepted.lock().clone()
    }
}

#[async_trait]
impl ChainRpc for RecordingChain {
    fn chain_id(&self) -> &str {
        "recording"
    }

    async fn status(&self) -> Result<ChainStatus> {
        Ok(ChainStatus {
            latest_height: self.height.load(Ordering::SeqCst),
        })
    }

    async fn broadcast_tx_sync(&self, raw_tx: Vec<u8>) -> Result<TxResponse> {
        let hash = tx_hash_hex(&raw_tx);
        let attempt = {
            let mut broadcasts = self.broadcasts.lock();
            broadcasts.push(raw_tx);
            broadcasts.len() - 1
        };

        if self.fail_at == Some(attempt) {
            anyhow::bail!("connection reset by peer");
        }
        if let Some((at, code)) = self.reject_at {
            if at == attempt {
                return Ok(TxResponse {
                    hash,
                    code,
                    raw_log: "insufficient fees".to_string(),
                });
            }
        }
        if let Some((at, cancel)) = &self.cancel_after {
            if *at == attempt {
                cancel.cancel();
            }
        }

        self.accepted.lock().push(hash.clone());
        Ok(TxResponse {
            hash,
            code: CODE_TYPE_OK,
            raw_log: String::new(),
        })
    }

    async fn block_by_height(&self, _height: u64) -> Result<Option<BlockInfo>> {
        Ok(None)
    }

    async fn tx(&self, _hash: &[u8]) -> Result<Option<TxResult>> {
        Ok(None)
    }
}

/// A message as seen by [`RecordingBuilder`]
#[derive(Debug, Clone)]
pub struct BuiltMessage {
    pub signer: String,
    pub namespace: NamespaceId,
    pub payload_len: usize,
    pub gas_limit: u64,
}

/// Builder encoding `signer | namespace | payload` without real signing
pub struct RecordingBuilder {
    built: Mutex<Vec<BuiltMessage>>,
    fail_build_for: Option<String>,
    fail_sign_for: Option<String>,
    fail_encode_for: Option<String>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self {
            built: Mutex::new(Vec::new()),
            fail_build_for: None,
            fail_sign_for: None,
            fail_encode_for: None,
        }
    }

    pub fn failing_for(mut self, name: &str) -> Self {
        self.fail_build_for = Some(name.to_string());
        self
    }

    pub fn failing_sign_for(mut self, name: &str) -> Self {
        self.fail_sign_for = Some(name.to_string());
        self
    }

    pub fn failing_encode_for(mut self, name: &str) -> Self {
        self.fail_encode_for = Some(name.to_string());
        self
    }

    pub fn built(&self) -> Vec<BuiltMessage> {
        self.built.lock().clone()
    }
}

#[async_trait]
impl PayForDataBuilder for RecordingBuilder {
    type Unsigned = (String, NamespaceId, Vec<u8>);
    type Signed = Vec<u8>;

    async fn build_pay_for_data(
        &self,
        signer: &SigningIdentity,
        namespace: NamespaceId,
        payload: Vec<u8>,
        options: &TxOptions,
    ) -> Result<Self::Unsigned> {
        if self.fail_build_for.as_deref() == Some(signer.name()) {
            anyhow::bail!("account {} not found", signer.name());
        }
        self.built.lock().push(BuiltMessage {
            signer: signer.name().to_string(),
            namespace,
            payload_len: payload.len(),
            gas_limit: options.gas_limit,
        });
        Ok((signer.name().to_string(), namespace, payload))
    }

    fn sign(
        &self,
        signer: &SigningIdentity,
        unsigned: Self::Unsigned,
        _options: &TxOptions,
    ) -> Result<Self::Signed> {
        if self.fail_sign_for.as_deref() == Some(signer.name()) {
            anyhow::bail!("key {} is locked", signer.name());
        }
        let (name, namespace, payload) = unsigned;
        let mut raw = name.into_bytes();
        raw.extend_from_slice(namespace.as_bytes());
        raw.extend_from_slice(&payload);
        Ok(raw)
    }

    fn encode(&self, signer: &SigningIdentity, signed: &Self::Signed) -> Result<Vec<u8>> {
        if self.fail_encode_for.as_deref() == Some(signer.name()) {
            anyhow::bail!("cannot encode tx for {}", signer.name());
        }
        Ok(signed.clone())
    }
}

pub fn identities(count: usize) -> Vec<SigningIdentity> {
    (0..count)
        .map(|i| SigningIdentity::new(format!("account-{}", i), "recording"))
        .collect()
}
