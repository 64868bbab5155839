//! SimulatedKeyring - pay-for-data pipeline for the simulated chain
//!
//! Transactions are `bincode` with fixed-width integers and no trailing
//! bytes. The signature is SHA3-256 over the account key followed by the
//! encoded unsigned message. This is a stand-in for real signing and proves
//! nothing.

use super::chain::SimulatedChain;
use crate::namespace::{NamespaceId, NAMESPACE_SIZE};
use crate::signer::{PayForDataBuilder, SigningIdentity, TxOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bincode::Options;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

const SIGNATURE_SIZE: usize = 32;

/// Length prefix bincode writes before strings and byte vectors
const LEN_PREFIX_SIZE: usize = 8;

/// Largest raw transaction the codec will read or write
pub const MAX_TX_BYTES: u64 = 1 << 20;

/// Longest key name accepted by the simulated chain
pub const MAX_ACCOUNT_NAME_LEN: usize = 64;

/// Envelope bytes added around a payload signed by `name_len`-byte key name
pub const fn envelope_overhead(name_len: usize) -> usize {
    // signer, namespace, sequence, gas limit, payload prefix, signature
    LEN_PREFIX_SIZE + name_len + NAMESPACE_SIZE + 8 + 8 + LEN_PREFIX_SIZE + SIGNATURE_SIZE
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_TX_BYTES)
        .reject_trailing_bytes()
}

/// Pay-for-data message before signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedPayForData {
    pub signer: String,
    pub namespace: NamespaceId,
    pub sequence: u64,
    pub gas_limit: u64,
    pub payload: Vec<u8>,
}

impl UnsignedPayForData {
    /// Encoded message covered by the signature
    pub fn sign_bytes(&self) -> Result<Vec<u8>> {
        codec()
            .serialize(self)
            .context("failed to encode pay-for-data message")
    }
}

/// Pay-for-data message with its signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayForData {
    pub tx: UnsignedPayForData,
    pub signature: [u8; SIGNATURE_SIZE],
}

impl SignedPayForData {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec()
            .serialize(self)
            .context("failed to encode signed pay-for-data tx")
    }

    /// Parse a raw transaction.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        codec().deserialize(raw).context("malformed pay-for-data tx")
    }
}

/// Signature over `sign_bytes` with an account key
pub fn sign_with_key(key: &[u8; 32], sign_bytes: &[u8]) -> [u8; SIGNATURE_SIZE] {
    let mut hasher = Sha3_256::new();
    hasher.update(key);
    hasher.update(sign_bytes);
    hasher.finalize().into()
}

/// Keyring backed by the simulated chain's account table
///
/// Building a message reads the signer's current sequence from the chain,
/// the way a real client queries its account before signing.
#[derive(Clone)]
pub struct SimulatedKeyring {
    chain: SimulatedChain,
}

impl SimulatedKeyring {
    pub(crate) fn new(chain: SimulatedChain) -> Self {
        Self { chain }
    }

    fn check_chain(&self, signer: &SigningIdentity) -> Result<()> {
        if signer.chain_id() != self.chain.id() {
            anyhow::bail!(
                "key {} belongs to chain {}, keyring serves {}",
                signer.name(),
                signer.chain_id(),
                self.chain.id()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl PayForDataBuilder for SimulatedKeyring {
    type Unsigned = UnsignedPayForData;
    type Signed = SignedPayForData;

    async fn build_pay_for_data(
        &self,
        signer: &SigningIdentity,
        namespace: NamespaceId,
        payload: Vec<u8>,
        options: &TxOptions,
    ) -> Result<UnsignedPayForData> {
        self.check_chain(signer)?;
        let sequence = self
            .chain
            .sequence(signer.name())
            .with_context(|| format!("key {} not found", signer.name()))?;

        Ok(UnsignedPayForData {
            signer: signer.name().to_string(),
            namespace,
            sequence,
            gas_limit: options.gas_limit,
            payload,
        })
    }

    fn sign(
        &self,
        signer: &SigningIdentity,
        unsigned: UnsignedPayForData,
        _options: &TxOptions,
    ) -> Result<SignedPayForData> {
        self.check_chain(signer)?;
        if unsigned.signer != signer.name() {
            anyhow::bail!(
                "message built for {} cannot be signed by {}",
                unsigned.signer,
                signer.name()
            );
        }

        let key = self
            .chain
            .account_key(signer.name())
            .with_context(|| format!("key {} not found", signer.name()))?;
        let signature = sign_with_key(&key, &unsigned.sign_bytes()?);

        Ok(SignedPayForData {
            tx: unsigned,
            signature,
        })
    }

    fn encode(&self, _signer: &SigningIdentity, signed: &SignedPayForData) -> Result<Vec<u8>> {
        signed.to_bytes()
    }
}
