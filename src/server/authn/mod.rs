pub mod config;
pub mod token;

use actix_web::HttpRequest;

/// Header carrying the caller's token.
pub const HEADER_TOKEN: &str = "x-jwt-token";

/// What a request presents as its credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    Missing,
    /// The header exists but is not valid text
    Unreadable,
    Token(&'a str),
}

pub fn extract_credential(req: &HttpRequest) -> Credential<'_> {
    match req.headers().get(HEADER_TOKEN) {
        Some(value) => match value.to_str() {
            Ok(token) => Credential::Token(token.trim()),
            Err(_) => Credential::Unreadable,
        },
        None => Credential::Missing,
    }
}
