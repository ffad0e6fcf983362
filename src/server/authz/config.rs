use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

/// Authorization related configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthzConfig {
    /// Deadline for each repository lookup made while authorizing a request.
    /// A lookup that takes longer denies the request. Defaults to 2000.
    #[serde(default = "AuthzConfig::default_repository_timeout_ms")]
    pub repository_timeout_ms: u64,
}

impl CommonConfig for AuthzConfig {
    fn default() -> Self {
        Self {
            repository_timeout_ms: Self::default_repository_timeout_ms(),
        }
    }

    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        if self.repository_timeout_ms < Self::MIN_REPOSITORY_TIMEOUT_MS {
            bail!(
                "repository_timeout_ms must be greater than or equal to {}",
                Self::MIN_REPOSITORY_TIMEOUT_MS
            );
        }
        if self.repository_timeout_ms > Self::MAX_REPOSITORY_TIMEOUT_MS {
            bail!(
                "repository_timeout_ms must be less than or equal to {}",
                Self::MAX_REPOSITORY_TIMEOUT_MS
            );
        }
        Ok(())
    }
}

impl AuthzConfig {
    const MIN_REPOSITORY_TIMEOUT_MS: u64 = 10;
    const MAX_REPOSITORY_TIMEOUT_MS: u64 = 60_000;

    pub fn default_repository_timeout_ms() -> u64 {
        2000
    }
}
