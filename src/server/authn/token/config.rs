use std::fmt::{self, Debug};

use anyhow::{bail, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

/// Token configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenConfig {
    /// Shared HMAC secret used to sign and verify tokens. Supports env expansion.
    /// Default: ${JWT_SECRET}. Must not be empty.
    #[serde(default = "TokenConfig::default_secret", skip_serializing)]
    pub secret: TokenSecret,

    /// Token expiration time in seconds.
    /// Default: 3600 seconds (1 hour).
    #[serde(default = "TokenConfig::default_expiry")]
    pub expiry: u64,
}

/// Signing secret. Never printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);

impl TokenSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenSecret(***)")
    }
}

impl CommonConfig for TokenConfig {
    fn default() -> Self {
        Self {
            secret: Self::default_secret(),
            expiry: Self::default_expiry(),
        }
    }

    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        if self.expiry < Self::MIN_EXPIRY {
            bail!("token expiry must be greater than or equal to {}", Self::MIN_EXPIRY);
        }
        if self.expiry > Self::MAX_EXPIRY {
            bail!("token expiry must be less than or equal to {}", Self::MAX_EXPIRY);
        }

        let secret = expandenv("secret", &self.secret.0)?;
        if secret.is_empty() {
            bail!("token secret cannot be empty");
        }
        if secret.len() < Self::RECOMMENDED_SECRET_LENGTH {
            warn!(
                "Token secret is shorter than {} bytes, consider using a longer one",
                Self::RECOMMENDED_SECRET_LENGTH
            );
        }
        self.secret = TokenSecret(secret);

        Ok(())
    }
}

impl TokenConfig {
    const MIN_EXPIRY: u64 = 60;
    const MAX_EXPIRY: u64 = 60 * 60 * 24 * 365;
    const RECOMMENDED_SECRET_LENGTH: usize = 32;

    pub fn default_secret() -> TokenSecret {
        TokenSecret(String::from("${JWT_SECRET}"))
    }

    pub fn default_expiry() -> u64 {
        60 * 60 // 60 minutes
    }
}
