use anyhow::{bail, Result};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::time::current_timestamp;
use crate::types::token::LoginResponse;
use crate::types::user::Identity;

use super::{AuthError, Claims, IssueError, TokenIssuer, TokenVerifier};

/// JWT issuer identifier
const ISSUER: &str = "bank/jwt-issuer";

/// Claims as they travel inside the token
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    #[serde(rename = "ownerId")]
    owner_id: i64, // Required. Id of the user the token speaks for
    exp: u64,    // Required. Token expiration time (timestamp)
    iat: u64,    // Time at which token was issued (timestamp)
    iss: String, // Required. Token issuer
}

/// Signs identities into HS256 JSON Web Tokens.
/// For more details, see: https://en.wikipedia.org/wiki/JSON_Web_Token
pub struct JwtTokenIssuer {
    key: EncodingKey,
    expiry: u64, // Token lifetime in seconds
}

impl JwtTokenIssuer {
    /// Creates an issuer signing with the shared `secret`.
    ///
    /// # Arguments
    /// * `secret` - HMAC secret, must not be empty
    /// * `expiry` - Token lifetime in seconds
    pub fn new(secret: &[u8], expiry: u64) -> Result<Self> {
        if secret.is_empty() {
            bail!("token secret cannot be empty");
        }
        Ok(Self {
            key: EncodingKey::from_secret(secret),
            expiry,
        })
    }

    #[cfg(test)]
    pub fn new_test() -> Self {
        Self::new(tests::TEST_SECRET.as_bytes(), 60).unwrap()
    }

    pub fn issue_at(&self, identity: &Identity, now: u64) -> Result<LoginResponse, IssueError> {
        let claims = WireClaims {
            owner_id: identity.id,
            exp: now + self.expiry,
            iat: now,
            iss: String::from(ISSUER),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;
        Ok(LoginResponse {
            id: identity.id,
            token,
            expires_at: claims.exp,
        })
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, identity: &Identity) -> Result<LoginResponse, IssueError> {
        self.issue_at(identity, current_timestamp())
    }
}

/// Verifies HS256 tokens produced by [`JwtTokenIssuer`] with the same secret.
pub struct JwtTokenVerifier {
    key: DecodingKey,
}

impl JwtTokenVerifier {
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            bail!("token secret cannot be empty");
        }
        Ok(Self {
            key: DecodingKey::from_secret(secret),
        })
    }

    #[cfg(test)]
    pub fn new_test() -> Self {
        Self::new(tests::TEST_SECRET.as_bytes()).unwrap()
    }

    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::Empty);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.validate_aud = false;
        // Expiry is checked below against the given clock
        validation.validate_exp = false;

        let claims = match decode::<WireClaims>(token, &self.key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return Err(match e.kind() {
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        AuthError::InvalidSignature
                    }
                    _ => AuthError::Malformed(e.to_string()),
                })
            }
        };

        if now >= claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(Claims {
            owner_id: claims.owner_id,
            expires_at: claims.exp,
        })
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, current_timestamp())
    }
}
