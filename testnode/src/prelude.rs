//! Prelude module for convenient imports
//!
//! ```rust,ignore
//! use testnode::prelude::*;
//! ```

// Orchestration
pub use crate::orchestrator::{Clock, PausedClock, SystemClock, TestRng};

// Chain surface
pub use crate::chain::{
    tx_hash, tx_hash_hex, BlockInfo, ChainRpc, ChainStatus, TxResponse, TxResult, CODE_TYPE_OK,
};
pub use crate::signer::{identities_for, PayForDataBuilder, SigningIdentity, TxOptions};

// Waiters
pub use crate::waiters::{
    latest_height, wait_for_height, wait_for_height_until_cancelled, wait_for_height_with_timeout,
    wait_for_next_block, HeightWaiter,
};

// Block filling
pub use crate::fill::{fill_block, fill_block_until_cancelled, BlockFiller, FillPlan};
pub use crate::namespace::{random_valid_namespace, NamespaceId, MAX_RESERVED_NAMESPACE};
pub use crate::shares::{MAX_SQUARE_SIZE, MSG_SHARE_SIZE, SHARE_SIZE};

// RPC assertions
pub use crate::rpc_helpers::{
    assert_height_at_least, assert_same_inclusion_height, assert_square_size, assert_tx_committed,
    query_without_proof, verify_fill,
};

// Simulated chain
pub use crate::simulated::{SimulatedChain, SimulatedChainBuilder, SimulatedKeyring};

// Configuration and errors
pub use crate::config::{FillConfig, HarnessConfig, WaitConfig};
pub use crate::error::{HarnessError, Result, SizingError};

// Re-export commonly used external types
pub use anyhow::Context;
pub use std::sync::Arc;
pub use tokio::time::Duration;
pub use tokio_util::sync::CancellationToken;
