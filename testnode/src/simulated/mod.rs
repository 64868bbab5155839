//! In-process chain for exercising the harness without a network
//!
//! [`SimulatedChain`] implements [`ChainRpc`](crate::chain::ChainRpc) and
//! [`SimulatedKeyring`] implements
//! [`PayForDataBuilder`](crate::signer::PayForDataBuilder) against it, so the
//! waiters and the block filler can run end to end inside one test.

pub mod builder;
pub mod chain;
pub mod keyring;

pub use builder::{SimulatedChainBuilder, DEFAULT_CHAIN_ID};
pub use chain::SimulatedChain;
pub use keyring::{SignedPayForData, SimulatedKeyring, UnsignedPayForData};
