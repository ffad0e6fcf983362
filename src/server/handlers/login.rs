use std::sync::Arc;

use actix_web::HttpRequest;
use log::{error, info};
use serde::Deserialize;

use crate::server::authn::token::TokenIssuer;
use crate::server::db::Database;
use crate::server::response::{self, Response};
use crate::types::user::{Identity, User};

use super::{non_empty, parse_query};

#[derive(Debug, Deserialize)]
struct LoginQuery {
    id: Option<String>,
    password: Option<String>,
}

pub struct LoginHandler {
    issuer: Arc<dyn TokenIssuer>,
    db: Arc<Database>,
}

impl LoginHandler {
    pub fn new(issuer: Arc<dyn TokenIssuer>, db: Arc<Database>) -> Self {
        Self { issuer, db }
    }

    pub fn handle(&self, req: &HttpRequest) -> Response {
        let query: LoginQuery = match parse_query(req) {
            Ok(query) => query,
            Err(resp) => return resp,
        };

        let id = match non_empty(query.id).and_then(|id| id.trim().parse::<i64>().ok()) {
            Some(id) => id,
            None => return Response::unauthenticated("Invalid user id"),
        };
        let password = match non_empty(query.password) {
            Some(password) => password,
            None => return Response::unauthenticated("Password is required"),
        };

        let record = match self.db.with_transaction(|tx| tx.get_user(id)) {
            Ok(Some(record)) => record,
            Ok(None) => return Response::unauthenticated("User not found"),
            Err(e) => {
                error!("Failed to get user record for login: {e:#}");
                return Response::error(response::DATABASE_ERROR);
            }
        };

        let input_hash = User::get_password_hash(&password, &record.salt);
        if input_hash != record.hash {
            return Response::unauthenticated("Invalid password");
        }

        let identity = Identity {
            id: record.id,
            role: record.role,
        };
        let token = match self.issuer.issue(&identity) {
            Ok(token) => token,
            Err(e) => {
                error!("Failed to generate token: {e:#}");
                return Response::error(response::TOKEN_ERROR);
            }
        };

        info!("User {id} logged in");
        Response::json(token)
    }
}
