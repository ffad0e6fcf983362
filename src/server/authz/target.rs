use std::collections::HashMap;

use actix_web::web::Query;
use actix_web::HttpRequest;
use thiserror::Error;

/// Path parameter holding a user id.
pub const USER_ID_PARAM: &str = "id";
/// Path parameter holding an account number.
pub const ACCOUNT_ID_PARAM: &str = "accId";
/// Query parameter naming the owner of a resource that does not exist yet.
pub const OWNER_ID_QUERY: &str = "ownerId";

/// Where an operation finds the resource it acts upon. Chosen when the
/// operation is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    /// Collection operations, nothing is targeted.
    None,
    /// The path `id` is the owning user.
    UserPath,
    /// The path `accId` is an account, its owner is looked up.
    AccountPath,
    /// Creation: the path `id` if present, otherwise the `ownerId` query.
    OwnerQuery,
}

/// The resource named by a request, before any lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRef {
    None,
    User(i64),
    Account(i64),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("missing parameter '{0}'")]
    Missing(&'static str),

    #[error("parameter '{0}' is not a valid id: '{1}'")]
    Invalid(&'static str, String),
}

/// Reads the target named by `req` according to `source`.
pub fn extract_target(req: &HttpRequest, source: TargetSource) -> Result<TargetRef, ExtractError> {
    match source {
        TargetSource::None => Ok(TargetRef::None),
        TargetSource::UserPath => path_param(req, USER_ID_PARAM).map(TargetRef::User),
        TargetSource::AccountPath => path_param(req, ACCOUNT_ID_PARAM).map(TargetRef::Account),
        TargetSource::OwnerQuery => {
            if req.match_info().get(USER_ID_PARAM).is_some() {
                return path_param(req, USER_ID_PARAM).map(TargetRef::User);
            }
            query_param(req, OWNER_ID_QUERY).map(TargetRef::User)
        }
    }
}

pub fn path_param(req: &HttpRequest, name: &'static str) -> Result<i64, ExtractError> {
    match req.match_info().get(name) {
        Some(value) => parse_id(name, value),
        None => Err(ExtractError::Missing(name)),
    }
}

pub fn query_param(req: &HttpRequest, name: &'static str) -> Result<i64, ExtractError> {
    let query = match Query::<HashMap<String, String>>::from_query(req.query_string()) {
        Ok(query) => query.into_inner(),
        Err(_) => return Err(ExtractError::Missing(name)),
    };
    match query.get(name) {
        Some(value) => parse_id(name, value),
        None => Err(ExtractError::Missing(name)),
    }
}

fn parse_id(name: &'static str, value: &str) -> Result<i64, ExtractError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ExtractError::Invalid(name, value.to_string()))
}
