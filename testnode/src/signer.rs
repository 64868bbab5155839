//! Signing identities and the pay-for-data construction pipeline.

use crate::namespace::NamespaceId;
use anyhow::Result;
use async_trait::async_trait;

/// Gas limit applied to fill transactions, effectively unbounded for tests
pub const DEFAULT_GAS_LIMIT: u64 = 100_000_000_000_000;

/// A named, funded key in the external keyring
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SigningIdentity {
    name: String,
    chain_id: String,
}

impl SigningIdentity {
    pub fn new(name: impl Into<String>, chain_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain_id: chain_id.into(),
        }
    }

    /// Key name in the keyring
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }
}

/// One identity per account name, in the order given.
pub fn identities_for<I, S>(chain_id: &str, names: I) -> Vec<SigningIdentity>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(|name| SigningIdentity::new(name, chain_id))
        .collect()
}

/// Options applied while building and signing a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    pub gas_limit: u64,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

/// Builds, signs and encodes pay-for-data transactions.
///
/// Building is async because it usually queries the chain for the signer's
/// account number and sequence.
#[async_trait]
pub trait PayForDataBuilder: Send + Sync {
    type Unsigned: Send;
    type Signed: Send;

    async fn build_pay_for_data(
        &self,
        signer: &SigningIdentity,
        namespace: NamespaceId,
        payload: Vec<u8>,
        options: &TxOptions,
    ) -> Result<Self::Unsigned>;

    fn sign(
        &self,
        signer: &SigningIdentity,
        unsigned: Self::Unsigned,
        options: &TxOptions,
    ) -> Result<Self::Signed>;

    fn encode(&self, signer: &SigningIdentity, signed: &Self::Signed) -> Result<Vec<u8>>;
}
