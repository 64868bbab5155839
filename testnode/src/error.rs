//! Error taxonomy for the harness.
//!
//! Collaborator traits ([`ChainRpc`](crate::chain::ChainRpc),
//! [`PayForDataBuilder`](crate::signer::PayForDataBuilder)) report failures as
//! `anyhow::Error`; the waiters and the filler wrap them into [`HarnessError`]
//! so callers can tell a slow chain from a broken one.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// A block fill that cannot be planned.
///
/// Returned before anything is built or broadcast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizingError {
    /// Fewer signing identities than messages required by the target.
    #[error("more funded accounts are needed: want >={required} have {available}")]
    InsufficientAccounts { required: usize, available: usize },

    /// The square size is too small to leave room for any payload.
    #[error("square size {target_square_size} leaves a non-positive payload size of {payload_size} bytes")]
    NonPositivePayload {
        target_square_size: usize,
        payload_size: i64,
    },
}

/// Errors returned by the waiters and the block filler.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The target height was not observed before the deadline.
    #[error("timeout exceeded waiting for block {target} (last seen height {last_height})")]
    Timeout { target: u64, last_height: u64 },

    /// The wait was cancelled at a tick boundary.
    #[error("wait for block cancelled (last seen height {last_height})")]
    Cancelled { last_height: u64 },

    /// The fill was cancelled between two submissions.
    ///
    /// Transactions broadcast before cancellation stay in flight.
    #[error("block fill cancelled after {submitted} broadcast transactions")]
    FillCancelled { submitted: usize },

    /// Status, broadcast or block query failed at the transport level.
    #[error("chain query failed: {0:#}")]
    QueryFailure(anyhow::Error),

    #[error(transparent)]
    SizingInfeasible(#[from] SizingError),

    /// The chain answered but refused the transaction.
    #[error("failure to broadcast tx sync at index {index} (code {code}): {raw_log}")]
    BroadcastRejected {
        index: usize,
        code: u32,
        raw_log: String,
    },

    /// Building, signing or encoding a pay-for-data transaction failed.
    #[error("failed to construct pay-for-data transaction: {0:#}")]
    ConstructionFailure(anyhow::Error),

    /// The randomness source kept producing reserved namespaces.
    #[error("no valid namespace generated after {attempts} attempts")]
    NamespaceExhausted { attempts: usize },

    #[error("invalid harness configuration: {0}")]
    Config(String),
}

impl HarnessError {
    /// True for errors meaning "the chain did not get there in time",
    /// including a cancelled wait.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled { .. })
    }

    /// Last height observed by a wait that did not reach its target.
    pub fn last_height(&self) -> Option<u64> {
        match self {
            Self::Timeout { last_height, .. } | Self::Cancelled { last_height } => {
                Some(*last_height)
            }
            _ => None,
        }
    }

    /// True if nothing reached the chain before the error was raised.
    pub fn is_sizing(&self) -> bool {
        matches!(self, Self::SizingInfeasible(_))
    }
}
