// File: testnode/src/orchestrator/mod.rs
//
// Orchestrator Module
//
// Time and randomness sources injected into the waiters and the filler so
// tests can pause time and replay a run from its seed.

/// Clock abstractions for deterministic time control in tests
pub mod clock;
/// Deterministic random number generation for reproducible tests
pub mod rng;

pub use clock::{Clock, PausedClock, SystemClock};
pub use rng::TestRng;
