use anyhow::Result;

use super::config::TokenConfig;
use super::jwt::{JwtTokenIssuer, JwtTokenVerifier};

pub struct TokenFactory {
    secret: Vec<u8>,
    expiry: u64,
}

impl TokenFactory {
    pub fn new(cfg: &TokenConfig) -> Self {
        Self {
            secret: cfg.secret.as_bytes().to_vec(),
            expiry: cfg.expiry,
        }
    }

    pub fn build_token_issuer(&self) -> Result<JwtTokenIssuer> {
        JwtTokenIssuer::new(&self.secret, self.expiry)
    }

    pub fn build_token_verifier(&self) -> Result<JwtTokenVerifier> {
        JwtTokenVerifier::new(&self.secret)
    }
}

#[cfg(test)]
mod tests {
    use crate::server::authn::token::config::TokenSecret;
    use crate::server::authn::token::TokenVerifier;
    use crate::types::user::{Identity, Role};

    use super::*;

    #[test]
    fn test_factory() {
        let cfg = TokenConfig {
            secret: TokenSecret::new("factory-secret"),
            expiry: 120,
        };
        let factory = TokenFactory::new(&cfg);
        let issuer = factory.build_token_issuer().unwrap();
        let verifier = factory.build_token_verifier().unwrap();

        let identity = Identity {
            id: 42,
            role: Role::Elevated,
        };
        let resp = issuer.issue_at(&identity, 100).unwrap();
        assert_eq!(resp.expires_at, 220);
        let claims = verifier.verify_at(&resp.token, 150).unwrap();
        assert_eq!(claims.owner_id, 42);
        assert!(verifier.verify(&resp.token).is_err());

        let cfg = TokenConfig {
            secret: TokenSecret::new(""),
            expiry: 120,
        };
        let factory = TokenFactory::new(&cfg);
        assert!(factory.build_token_issuer().is_err());
        assert!(factory.build_token_verifier().is_err());
    }
}
