//! SimulatedChainBuilder - Fluent API for configuring SimulatedChain instances

use super::chain::SimulatedChain;
use crate::orchestrator::TestRng;
use anyhow::Result;
use std::collections::HashSet;

/// Chain id used when none is set
pub const DEFAULT_CHAIN_ID: &str = "testnode-sim";

/// Builder for SimulatedChain instances with fluent API
///
/// # Example
///
/// ```rust,ignore
/// let rng = TestRng::new_from_env_or_random();
/// let chain = SimulatedChainBuilder::new()
///     .with_chain_id("private")
///     .with_funded_account("validator")
///     .with_random_accounts(300, &rng)
///     .build()?;
/// ```
pub struct SimulatedChainBuilder {
    chain_id: String,

    /// Account names in funding order
    accounts: Vec<String>,
}

impl SimulatedChainBuilder {
    /// Create new builder with defaults
    ///
    /// Default configuration:
    /// - chain id [`DEFAULT_CHAIN_ID`]
    /// - no funded accounts
    pub fn new() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            accounts: Vec::new(),
        }
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    /// Add a specific funded account
    pub fn with_funded_account(mut self, name: impl Into<String>) -> Self {
        self.accounts.push(name.into());
        self
    }

    pub fn with_funded_accounts<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accounts.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add `count` funded accounts with random names drawn from `rng`
    ///
    /// Names never repeat one already added to this builder.
    pub fn with_random_accounts(mut self, count: usize, rng: &TestRng) -> Self {
        let mut taken: HashSet<String> = self.accounts.iter().cloned().collect();
        let mut added = 0;
        while added < count {
            let name = rng.random_string(9);
            if taken.insert(name.clone()) {
                self.accounts.push(name);
                added += 1;
            }
        }
        self
    }

    /// Build the chain at height 0 with every account funded
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The chain id is empty
    /// - An account name is empty, too long or listed twice
    pub fn build(self) -> Result<SimulatedChain> {
        if self.chain_id.is_empty() {
            anyhow::bail!("chain id must not be empty");
        }

        let chain = SimulatedChain::new(self.chain_id);
        for name in &self.accounts {
            chain.fund_account(name)?;
        }

        log::debug!(
            "built simulated chain {} with {} funded accounts",
            chain.id(),
            self.accounts.len()
        );
        Ok(chain)
    }
}

impl Default for SimulatedChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}
