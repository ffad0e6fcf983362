pub mod config;
pub mod factory;
pub mod jwt;

use thiserror::Error;

use crate::types::token::LoginResponse;
use crate::types::user::Identity;

/// Claims carried by a verified credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claims {
    pub owner_id: i64,
    pub expires_at: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("empty token")]
    Empty,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Mints credentials for users that already proved who they are.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, identity: &Identity) -> Result<LoginResponse, IssueError>;
}

/// Checks a credential and extracts the identity it claims.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}
