use std::fmt::Display;
use std::str::FromStr;

use anyhow::{bail, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Caller classification used by authorization. Fixed when the user is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    #[default]
    Standard,

    #[serde(rename = "admin")]
    Elevated,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "user",
            Role::Elevated => "admin",
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Elevated)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::Standard),
            "admin" => Ok(Role::Elevated),
            _ => bail!("invalid role '{s}'"),
        }
    }
}

/// The resolved caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub role: Role,
}

/// Public view of a user, never carries password material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "name")]
    pub first_name: String,

    #[serde(rename = "lastName")]
    pub last_name: String,

    #[serde(rename = "memberSince")]
    pub member_since: u64,

    pub role: Role,
}

impl User {
    const SALT_LENGTH: usize = 30;

    pub fn get_password_hash(password: &str, salt: &str) -> String {
        let combined = format!("{password}{salt}");
        let hash = Sha256::digest(combined.as_bytes());
        format!("{:x}", hash)
    }

    pub fn generate_password_hash(password: &str) -> (String, String) {
        let salt = Self::generate_salt(Self::SALT_LENGTH);
        let hash = Self::get_password_hash(password, &salt);
        (hash, salt)
    }

    fn generate_salt(length: usize) -> String {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();

        (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}
