//! Namespace identifiers for pay-for-data messages.

use crate::error::{HarnessError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a namespace identifier in bytes
pub const NAMESPACE_SIZE: usize = 8;

/// Upper bound of the reserved namespace range (inclusive)
pub const MAX_RESERVED_NAMESPACE: NamespaceId =
    NamespaceId([0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff]);

/// Tag partitioning message data into logical streams.
///
/// Ordering is lexicographic over the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespaceId([u8; NAMESPACE_SIZE]);

impl NamespaceId {
    pub const fn new(bytes: [u8; NAMESPACE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; NAMESPACE_SIZE] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; NAMESPACE_SIZE] {
        &self.0
    }

    /// True if the namespace falls inside the reserved range.
    pub fn is_reserved(&self) -> bool {
        *self <= MAX_RESERVED_NAMESPACE
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Draw random namespaces until one falls outside the reserved range.
///
/// The reserved range is tiny relative to the identifier space, so this
/// normally returns on the first draw. A source that keeps producing reserved
/// values fails with [`HarnessError::NamespaceExhausted`] after
/// `max_attempts` draws.
pub fn random_valid_namespace<R>(rng: &mut R, max_attempts: usize) -> Result<NamespaceId>
where
    R: Rng + ?Sized,
{
    let mut bytes = [0u8; NAMESPACE_SIZE];
    for _ in 0..max_attempts {
        rng.fill(&mut bytes);
        let candidate = NamespaceId(bytes);
        if !candidate.is_reserved() {
            return Ok(candidate);
        }
    }

    log::warn!(
        "randomness source produced {} reserved namespaces in a row",
        max_attempts
    );
    Err(HarnessError::NamespaceExhausted {
        attempts: max_attempts,
    })
}
