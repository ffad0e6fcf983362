use std::sync::Arc;

use actix_web::HttpRequest;
use log::{error, info};
use serde::Deserialize;

use crate::guard_request;
use crate::server::authz::gate::{Gate, Operation};
use crate::server::authz::target::{self, TargetSource, ACCOUNT_ID_PARAM, OWNER_ID_QUERY};
use crate::server::db::Database;
use crate::server::response::{self, Response};
use crate::time::current_timestamp;

use super::{non_empty, parse_query, path_id};

const LIST_ACCOUNTS: Operation = Operation::new("list accounts", true, TargetSource::None);
const CREATE_ACCOUNT: Operation = Operation::new("create account", false, TargetSource::OwnerQuery);
const GET_ACCOUNT: Operation = Operation::new("get account", false, TargetSource::AccountPath);
const UPDATE_ACCOUNT: Operation = Operation::new("update account", true, TargetSource::AccountPath);
const DELETE_ACCOUNT: Operation = Operation::new("delete account", true, TargetSource::AccountPath);

#[derive(Debug, Deserialize)]
struct UpdateAccountQuery {
    #[serde(rename = "newBalance")]
    new_balance: Option<String>,
}

pub struct AccountsHandler {
    gate: Arc<Gate>,
    db: Arc<Database>,
}

impl AccountsHandler {
    pub fn new(gate: Arc<Gate>, db: Arc<Database>) -> Self {
        Self { gate, db }
    }

    pub async fn list(&self, req: HttpRequest) -> Response {
        guard_request!(self.gate, req, LIST_ACCOUNTS);

        match self.db.with_transaction(|tx| tx.list_accounts(None)) {
            Ok(accounts) => Response::json(accounts),
            Err(e) => {
                error!("Failed to list accounts: {e:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    /// Opens an empty account for the user named by `ownerId`.
    pub async fn create(&self, req: HttpRequest) -> Response {
        let caller = guard_request!(self.gate, req, CREATE_ACCOUNT);
        let owner_id = match target::query_param(&req, OWNER_ID_QUERY) {
            Ok(id) => id,
            Err(e) => return Response::bad_request(e.to_string()),
        };

        let result = self.db.with_transaction(|tx| {
            if !tx.is_user_exists(owner_id)? {
                return Ok(None);
            }
            let account = tx.create_account(owner_id, current_timestamp())?;
            Ok(Some(account))
        });
        match result {
            Ok(Some(account)) => {
                info!(
                    "Account {} opened for user {owner_id} by {}",
                    account.number, caller.id
                );
                Response::json(account)
            }
            Ok(None) => Response::not_found("No such user"),
            Err(e) => {
                error!("Failed to create account for user {owner_id}: {e:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    pub async fn get(&self, req: HttpRequest) -> Response {
        guard_request!(self.gate, req, GET_ACCOUNT);
        let number = match path_id(&req, ACCOUNT_ID_PARAM) {
            Ok(number) => number,
            Err(resp) => return resp,
        };

        match self.db.with_transaction(|tx| tx.get_account(number)) {
            Ok(Some(account)) => Response::json(account),
            Ok(None) => Response::not_found("No such account"),
            Err(e) => {
                error!("Failed to get account {number}: {e:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    /// Overwrites the balance of an account with `newBalance`.
    pub async fn update(&self, req: HttpRequest) -> Response {
        let caller = guard_request!(self.gate, req, UPDATE_ACCOUNT);
        let number = match path_id(&req, ACCOUNT_ID_PARAM) {
            Ok(number) => number,
            Err(resp) => return resp,
        };

        let query: UpdateAccountQuery = match parse_query(&req) {
            Ok(query) => query,
            Err(resp) => return resp,
        };
        let balance = match non_empty(query.new_balance).map(|b| b.trim().parse::<f64>()) {
            Some(Ok(balance)) if balance.is_finite() => balance,
            _ => return Response::bad_request("newBalance must be a number"),
        };

        let result = self.db.with_transaction(|tx| {
            let mut account = match tx.get_account(number)? {
                Some(account) => account,
                None => return Ok(None),
            };
            tx.update_account_balance(number, balance)?;
            account.balance = balance;
            Ok(Some(account))
        });
        match result {
            Ok(Some(account)) => {
                info!("Balance of account {number} set to {balance} by {}", caller.id);
                Response::json(account)
            }
            Ok(None) => Response::not_found("No such account"),
            Err(e) => {
                error!("Failed to update account {number}: {e:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    pub async fn delete(&self, req: HttpRequest) -> Response {
        let caller = guard_request!(self.gate, req, DELETE_ACCOUNT);
        let number = match path_id(&req, ACCOUNT_ID_PARAM) {
            Ok(number) => number,
            Err(resp) => return resp,
        };

        let result = self.db.with_transaction(|tx| {
            if tx.get_account(number)?.is_none() {
                return Ok(false);
            }
            tx.delete_account(number)?;
            Ok(true)
        });
        match result {
            Ok(true) => {
                info!("Account {number} deleted by {}", caller.id);
                Response::json("Account successfully deleted!")
            }
            Ok(false) => Response::not_found("No such account"),
            Err(e) => {
                error!("Failed to delete account {number}: {e:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::body::to_bytes;
    use actix_web::test::TestRequest;
    use actix_web::HttpResponse;

    use crate::server::authn::token::jwt::{JwtTokenIssuer, JwtTokenVerifier};
    use crate::server::authn::HEADER_TOKEN;
    use crate::server::db::tests::mock_user;
    use crate::types::user::{Identity, Role};

    use super::*;

    struct Fixture {
        handler: AccountsHandler,
        db: Arc<Database>,
        user: i64,
        other: i64,
        admin: i64,
        user_account: i64,
        other_account: i64,
    }

    fn setup() -> Fixture {
        let db = Arc::new(Database::new_test());
        let (user, other, admin, user_account, other_account) = db
            .with_transaction(|tx| {
                let user = tx.create_user(&mock_user("Alice", Role::Standard))?;
                let other = tx.create_user(&mock_user("Bob", Role::Standard))?;
                let admin = tx.create_user(&mock_user("Root", Role::Elevated))?;
                let user_account = tx.create_account(user, 100)?.number;
                let other_account = tx.create_account(other, 200)?.number;
                Ok((user, other, admin, user_account, other_account))
            })
            .unwrap();
        let gate = Gate::new(
            Arc::new(JwtTokenVerifier::new_test()),
            db.clone(),
            Duration::from_secs(2),
        );
        Fixture {
            handler: AccountsHandler::new(Arc::new(gate), db.clone()),
            db,
            user,
            other,
            admin,
            user_account,
            other_account,
        }
    }

    fn token_for(id: i64) -> String {
        let identity = Identity {
            id,
            role: Role::Standard,
        };
        JwtTokenIssuer::new_test()
            .issue_at(&identity, current_timestamp())
            .unwrap()
            .token
    }

    fn account_request(caller: i64, uri: &str, number: i64) -> HttpRequest {
        TestRequest::with_uri(uri)
            .insert_header((HEADER_TOKEN, token_for(caller)))
            .param(ACCOUNT_ID_PARAM, number.to_string())
            .to_http_request()
    }

    fn query_request(caller: i64, uri: &str) -> HttpRequest {
        TestRequest::with_uri(uri)
            .insert_header((HEADER_TOKEN, token_for(caller)))
            .to_http_request()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let resp: HttpResponse = resp.into();
        let body = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[actix_web::test]
    async fn test_list() {
        let fx = setup();

        let resp = fx.handler.list(query_request(fx.admin, "/accounts")).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);

        let resp = fx.handler.list(query_request(fx.user, "/accounts")).await;
        assert_eq!(resp.status().as_u16(), 403);
    }

    #[actix_web::test]
    async fn test_create() {
        let fx = setup();

        let uri = format!("/accounts?ownerId={}", fx.user);
        let resp = fx.handler.create(query_request(fx.user, &uri)).await;
        assert_eq!(resp.status().as_u16(), 200);
        let body = json_body(resp).await;
        assert_eq!(body["ownerID"], fx.user);
        assert_eq!(body["balance"], 0.0);

        let uri = format!("/accounts?ownerId={}", fx.other);
        let resp = fx.handler.create(query_request(fx.user, &uri)).await;
        assert_eq!(resp.status().as_u16(), 403);

        let resp = fx.handler.create(query_request(fx.admin, &uri)).await;
        assert_eq!(resp.status().as_u16(), 200);

        let uri = format!("/accounts?ownerId={}", fx.admin + 100);
        let resp = fx.handler.create(query_request(fx.admin, &uri)).await;
        assert_eq!(resp.status().as_u16(), 404);

        let resp = fx.handler.create(query_request(fx.user, "/accounts")).await;
        assert_eq!(resp.status().as_u16(), 400);

        let count = fx
            .db
            .with_transaction(|tx| tx.list_accounts(None))
            .unwrap()
            .len();
        assert_eq!(count, 4);
    }

    #[actix_web::test]
    async fn test_get() {
        let fx = setup();

        let resp = fx
            .handler
            .get(account_request(fx.user, "/accounts", fx.user_account))
            .await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(json_body(resp).await["accountNumber"], fx.user_account);

        let resp = fx
            .handler
            .get(account_request(fx.user, "/accounts", fx.other_account))
            .await;
        assert_eq!(resp.status().as_u16(), 403);

        let resp = fx
            .handler
            .get(account_request(fx.admin, "/accounts", fx.other_account))
            .await;
        assert_eq!(resp.status().as_u16(), 200);

        // Unknown accounts reach only elevated callers
        let missing = fx.other_account + 100;
        let resp = fx
            .handler
            .get(account_request(fx.admin, "/accounts", missing))
            .await;
        assert_eq!(resp.status().as_u16(), 404);
        assert_eq!(json_body(resp).await["error"], "No such account");

        let resp = fx
            .handler
            .get(account_request(fx.user, "/accounts", missing))
            .await;
        assert_eq!(resp.status().as_u16(), 403);
    }

    #[actix_web::test]
    async fn test_update() {
        let fx = setup();

        let resp = fx
            .handler
            .update(account_request(
                fx.user,
                "/accounts?newBalance=10",
                fx.user_account,
            ))
            .await;
        assert_eq!(resp.status().as_u16(), 403);

        let resp = fx
            .handler
            .update(account_request(
                fx.admin,
                "/accounts?newBalance=99.5",
                fx.user_account,
            ))
            .await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(json_body(resp).await["balance"], 99.5);

        let account = fx
            .db
            .with_transaction(|tx| tx.get_account(fx.user_account))
            .unwrap()
            .unwrap();
        assert_eq!(account.balance, 99.5);

        for uri in [
            "/accounts",
            "/accounts?newBalance=",
            "/accounts?newBalance=lots",
            "/accounts?newBalance=NaN",
        ] {
            let resp = fx
                .handler
                .update(account_request(fx.admin, uri, fx.user_account))
                .await;
            assert_eq!(resp.status().as_u16(), 400, "{uri}");
        }

        let resp = fx
            .handler
            .update(account_request(
                fx.admin,
                "/accounts?newBalance=1",
                fx.other_account + 100,
            ))
            .await;
        assert_eq!(resp.status().as_u16(), 404);
    }

    #[actix_web::test]
    async fn test_delete() {
        let fx = setup();

        let resp = fx
            .handler
            .delete(account_request(fx.user, "/accounts", fx.user_account))
            .await;
        assert_eq!(resp.status().as_u16(), 403);

        let resp = fx
            .handler
            .delete(account_request(fx.admin, "/accounts", fx.user_account))
            .await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(json_body(resp).await, "Account successfully deleted!");

        let resp = fx
            .handler
            .delete(account_request(fx.admin, "/accounts", fx.user_account))
            .await;
        assert_eq!(resp.status().as_u16(), 404);

        let accounts = fx
            .db
            .with_transaction(|tx| tx.list_accounts(None))
            .unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].owner_id, fx.other);
    }
}
