use std::sync::Arc;

use actix_web::HttpRequest;
use log::{error, info};
use serde::Deserialize;

use crate::guard_request;
use crate::server::authz::gate::{Gate, Operation};
use crate::server::authz::target::{TargetSource, USER_ID_PARAM};
use crate::server::db::{Database, UserRecord};
use crate::server::response::{self, Response};
use crate::time::current_timestamp;
use crate::types::user::{Role, User};

use super::{non_empty, parse_query, path_id};

const GET_USER: Operation = Operation::new("get user", false, TargetSource::UserPath);
const LIST_USER_ACCOUNTS: Operation =
    Operation::new("list user accounts", false, TargetSource::UserPath);
const DELETE_USER: Operation = Operation::new("delete user", true, TargetSource::UserPath);

#[derive(Debug, Deserialize)]
struct CreateUserQuery {
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name: Option<String>,
    password: Option<String>,
    role: Option<String>,
}

pub struct UsersHandler {
    gate: Arc<Gate>,
    db: Arc<Database>,
    allow_admin_signup: bool,
}

impl UsersHandler {
    pub fn new(gate: Arc<Gate>, db: Arc<Database>, allow_admin_signup: bool) -> Self {
        Self {
            gate,
            db,
            allow_admin_signup,
        }
    }

    /// Signs up a new user. Open to everyone.
    pub fn create(&self, req: &HttpRequest) -> Response {
        let query: CreateUserQuery = match parse_query(req) {
            Ok(query) => query,
            Err(resp) => return resp,
        };

        let (first_name, last_name, password) = match (
            non_empty(query.first_name),
            non_empty(query.last_name),
            non_empty(query.password),
        ) {
            (Some(first), Some(last), Some(password)) => (first, last, password),
            _ => return Response::bad_request("firstName, lastName and password are required"),
        };

        let role = match non_empty(query.role) {
            Some(role) => match role.parse::<Role>() {
                Ok(role) => role,
                Err(e) => return Response::bad_request(e.to_string()),
            },
            None => Role::default(),
        };
        if role.is_elevated() && !self.allow_admin_signup {
            return Response::forbidden("creating admin users is disabled");
        }

        let (hash, salt) = User::generate_password_hash(&password);
        let mut record = UserRecord {
            id: 0,
            first_name,
            last_name,
            member_since: current_timestamp(),
            hash,
            salt,
            role,
        };

        match self.db.with_transaction(|tx| tx.create_user(&record)) {
            Ok(id) => record.id = id,
            Err(e) => {
                error!("Failed to create user: {e:#}");
                return Response::error(response::DATABASE_ERROR);
            }
        }

        info!("Created {} user {}", record.role, record.id);
        Response::json(User::from(record))
    }

    pub async fn get(&self, req: HttpRequest) -> Response {
        guard_request!(self.gate, req, GET_USER);
        let id = match path_id(&req, USER_ID_PARAM) {
            Ok(id) => id,
            Err(resp) => return resp,
        };

        match self.db.with_transaction(|tx| tx.get_user(id)) {
            Ok(Some(record)) => Response::json(User::from(record)),
            Ok(None) => Response::not_found("No such user"),
            Err(e) => {
                error!("Failed to get user {id}: {e:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    pub async fn list_accounts(&self, req: HttpRequest) -> Response {
        guard_request!(self.gate, req, LIST_USER_ACCOUNTS);
        let id = match path_id(&req, USER_ID_PARAM) {
            Ok(id) => id,
            Err(resp) => return resp,
        };

        match self.db.with_transaction(|tx| tx.list_accounts(Some(id))) {
            Ok(accounts) => Response::json(accounts),
            Err(e) => {
                error!("Failed to list accounts of user {id}: {e:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    /// Removes a user together with all of their accounts.
    pub async fn delete(&self, req: HttpRequest) -> Response {
        let caller = guard_request!(self.gate, req, DELETE_USER);
        let id = match path_id(&req, USER_ID_PARAM) {
            Ok(id) => id,
            Err(resp) => return resp,
        };

        let result = self.db.with_transaction(|tx| {
            if !tx.is_user_exists(id)? {
                return Ok(None);
            }
            let count = tx.delete_user_accounts(id)?;
            tx.delete_user(id)?;
            Ok(Some(count))
        });
        match result {
            Ok(Some(count)) => {
                info!("User {id} and {count} account(s) deleted by {}", caller.id);
                Response::json("User deleted!")
            }
            Ok(None) => Response::not_found("No such user"),
            Err(e) => {
                error!("Failed to delete user {id}: {e:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }
}
