pub mod accounts;
pub mod healthz;
pub mod login;
pub mod users;

use actix_web::web::Query;
use actix_web::HttpRequest;
use serde::de::DeserializeOwned;

use super::authz::target;
use super::response::Response;

fn parse_query<T: DeserializeOwned>(req: &HttpRequest) -> Result<T, Response> {
    match Query::<T>::from_query(req.query_string()) {
        Ok(query) => Ok(query.into_inner()),
        Err(e) => Err(Response::bad_request(format!("invalid query: {e}"))),
    }
}

/// Reads an id from the path. The gate already checked it, so a failure here
/// means the route and the operation disagree.
fn path_id(req: &HttpRequest, name: &'static str) -> Result<i64, Response> {
    target::path_param(req, name).map_err(|e| Response::bad_request(e.to_string()))
}

/// Treats empty query values the same as missing ones.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
