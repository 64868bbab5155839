//! # testnode - chain integration test harness
//!
//! Helpers for tests that drive a running chain node through its RPC surface.
//!
//! ## Components
//!
//! - **Waiters**: poll the node's status until a target height is committed,
//!   replacing fixed sleeps ([`waiters`])
//! - **Block filler**: broadcast enough pay-for-data transactions to push a
//!   block to a target square size ([`fill`])
//! - **RPC helpers**: assertions over committed transactions and blocks
//!   ([`rpc_helpers`])
//! - **Simulated chain**: an in-process node for running all of the above
//!   without a network ([`simulated`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use testnode::prelude::*;
//!
//! #[tokio::test]
//! async fn test_fill_square_16() {
//!     let rng = TestRng::new_from_env_or_random();
//!     let chain = SimulatedChainBuilder::new()
//!         .with_random_accounts(300, &rng)
//!         .build()
//!         .unwrap();
//!
//!     let responses = fill_block(&chain, &chain.keyring(), 16, &chain.identities())
//!         .await
//!         .unwrap();
//!     // start block production, then:
//!     wait_for_next_block(&chain).await.unwrap();
//!     verify_fill(&chain, &responses, 16).await.unwrap();
//! }
//! ```
//!
//! ## Determinism
//!
//! Waiters take an injectable [`Clock`] and run under tokio's paused time.
//! Namespaces and payloads come from a seeded [`TestRng`]; set
//! `TESTNODE_SEED` to replay a run.

#![warn(clippy::all)]

/// Chain RPC surface consumed by the harness
pub mod chain;

pub mod config;

pub mod error;

/// Block filling to a target square size
pub mod fill;

pub mod namespace;

/// Core orchestration - provides Clock and seeded RNG
pub mod orchestrator;

pub mod rpc_helpers;

pub mod shares;

/// Key identities and the pay-for-data transaction pipeline
pub mod signer;

pub mod simulated;

/// Height waiters
pub mod waiters;

// Convenient re-exports for common usage
pub mod prelude;

pub use chain::{BlockInfo, ChainRpc, ChainStatus, TxResponse, TxResult};
pub use config::{FillConfig, HarnessConfig, WaitConfig};
pub use error::{HarnessError, Result, SizingError};
pub use fill::{fill_block, BlockFiller, FillPlan};
pub use namespace::NamespaceId;
pub use orchestrator::{Clock, PausedClock, SystemClock, TestRng};
pub use signer::{PayForDataBuilder, SigningIdentity, TxOptions};
pub use waiters::{wait_for_height, wait_for_next_block, HeightWaiter};

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
