use serde::{Deserialize, Serialize};

/// Body returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "ID")]
    pub id: i64,

    pub token: String,

    #[serde(rename = "expiresAt")]
    pub expires_at: u64,
}
