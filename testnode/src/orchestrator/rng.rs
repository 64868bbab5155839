// File: testnode/src/orchestrator/rng.rs
//
// Seeded Randomness
//
// Test-only pseudo-randomness for namespaces, payloads and account names.
// Never use it for key material.

use crate::error::Result;
use crate::namespace::{self, NamespaceId};
use parking_lot::Mutex;
use rand::distributions::{Alphanumeric, DistString, Distribution, Standard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Env var holding a seed to replay (`0x`-prefixed hex or decimal)
pub const SEED_ENV_VAR: &str = "TESTNODE_SEED";

/// Seeded RNG shared by reference
///
/// Every value drawn from the same seed is identical across runs, so a failing
/// fill can be replayed with `TESTNODE_SEED=0x... cargo test`.
pub struct TestRng {
    seed: u64,
    inner: Mutex<StdRng>,
}

impl TestRng {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Seed from `TESTNODE_SEED` if set and parseable, otherwise from entropy.
    ///
    /// The chosen seed is logged so the run can be replayed.
    pub fn new_from_env_or_random() -> Self {
        let seed = std::env::var(SEED_ENV_VAR)
            .ok()
            .and_then(|raw| parse_seed(&raw))
            .unwrap_or_else(|| rand::thread_rng().gen());

        log::info!(
            "TestRng seed: 0x{:016x} (replay with {}=0x{:016x})",
            seed,
            SEED_ENV_VAR,
            seed
        );
        Self::with_seed(seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn gen<T>(&self) -> T
    where
        Standard: Distribution<T>,
    {
        self.inner.lock().gen()
    }

    /// `len` random bytes
    pub fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.inner.lock().fill(&mut bytes[..]);
        bytes
    }

    /// Random alphanumeric string of `len` characters
    pub fn random_string(&self, len: usize) -> String {
        Alphanumeric.sample_string(&mut *self.inner.lock(), len)
    }

    /// `count` random account names of 9 characters each
    pub fn random_account_names(&self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.random_string(9)).collect()
    }

    pub fn random_valid_namespace(&self, max_attempts: usize) -> Result<NamespaceId> {
        namespace::random_valid_namespace(&mut *self.inner.lock(), max_attempts)
    }
}

impl Default for TestRng {
    fn default() -> Self {
        Self::new_from_env_or_random()
    }
}

impl std::fmt::Debug for TestRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRng")
            .field("seed", &format_args!("0x{:016x}", self.seed))
            .finish()
    }
}

fn parse_seed(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}
