pub mod config;
pub mod gate;
pub mod repo;
pub mod target;

use actix_web::http::StatusCode;
use thiserror::Error;

use crate::types::user::Identity;

/// Outcome of checking a caller against an operation's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

/// Why a request was refused. Every reason is terminal for the request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    #[error("missing credential")]
    MissingCredential,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("unknown identity")]
    UnknownIdentity,

    #[error("malformed target")]
    MalformedTarget,

    #[error("insufficient role")]
    InsufficientRole,

    #[error("not the owner of the resource")]
    NotOwner,
}

impl DenyReason {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredential | Self::InvalidCredential | Self::UnknownIdentity => {
                StatusCode::UNAUTHORIZED
            }
            Self::MalformedTarget => StatusCode::BAD_REQUEST,
            Self::InsufficientRole | Self::NotOwner => StatusCode::FORBIDDEN,
        }
    }
}

/// Decides whether `caller` may run an operation against the resource owned by
/// `target`.
///
/// Elevated callers are allowed before the elevation requirement is looked at,
/// so `requires_elevated` only ever restricts standard callers. A missing
/// target is never owned by a standard caller.
pub fn decide(caller: &Identity, target: Option<i64>, requires_elevated: bool) -> AccessDecision {
    if caller.role.is_elevated() {
        return AccessDecision::Allow;
    }

    if requires_elevated {
        return AccessDecision::Deny(DenyReason::InsufficientRole);
    }

    match target {
        Some(owner) if owner == caller.id => AccessDecision::Allow,
        _ => AccessDecision::Deny(DenyReason::NotOwner),
    }
}
