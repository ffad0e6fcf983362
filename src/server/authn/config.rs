use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

use super::token::config::TokenConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthnConfig {
    #[serde(default = "TokenConfig::default")]
    pub token: TokenConfig,

    /// Whether anyone may sign up with the elevated role. Keep this disabled
    /// unless the server is only reachable by trusted operators.
    #[serde(default = "AuthnConfig::default_allow_admin_signup")]
    pub allow_admin_signup: bool,
}

impl CommonConfig for AuthnConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            allow_admin_signup: Self::default_allow_admin_signup(),
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.token.complete(ps).context("token")?;
        Ok(())
    }
}

impl AuthnConfig {
    pub fn default_allow_admin_signup() -> bool {
        false
    }
}
