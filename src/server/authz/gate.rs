use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use actix_web::HttpRequest;
use anyhow::{bail, Result};
use log::{debug, error};

use crate::server::authn::token::TokenVerifier;
use crate::server::authn::{extract_credential, Credential};
use crate::types::user::Identity;

use super::repo::Repository;
use super::target::{extract_target, TargetRef, TargetSource};
use super::{decide, AccessDecision, DenyReason};

/// Runs the gate for a protected operation. Evaluates to the caller's
/// [`Identity`] when allowed, otherwise returns the denial response from the
/// enclosing handler.
#[macro_export]
macro_rules! guard_request {
    ($gate:expr, $req:expr, $op:expr) => {
        match $gate.authorize(&$req, &$op).await {
            Ok(identity) => identity,
            Err(reason) => return $crate::server::response::Response::denied(reason),
        }
    };
}

/// A protected operation as registered on a route.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub requires_elevated: bool,
    pub target: TargetSource,
}

impl Operation {
    pub const fn new(name: &'static str, requires_elevated: bool, target: TargetSource) -> Self {
        Self {
            name,
            requires_elevated,
            target,
        }
    }
}

/// Decides, per request, whether the caller may run an operation.
///
/// Stages run strictly in order and stop at the first denial: read the
/// credential, verify it, load the identity, resolve the target owner, decide.
/// Nothing is cached between requests.
pub struct Gate {
    verifier: Arc<dyn TokenVerifier>,
    repo: Arc<dyn Repository>,
    timeout: Duration,
}

impl Gate {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        repo: Arc<dyn Repository>,
        timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            repo,
            timeout,
        }
    }

    pub async fn authorize(&self, req: &HttpRequest, op: &Operation) -> Result<Identity, DenyReason> {
        match self.authorize_raw(req, op).await {
            Ok(identity) => Ok(identity),
            Err(reason) => {
                debug!(
                    "Deny {} on {} {}: {reason}",
                    op.name,
                    req.method(),
                    req.uri().path()
                );
                Err(reason)
            }
        }
    }

    async fn authorize_raw(&self, req: &HttpRequest, op: &Operation) -> Result<Identity, DenyReason> {
        let token = match extract_credential(req) {
            Credential::Token(token) => token,
            Credential::Unreadable => return Err(DenyReason::InvalidCredential),
            Credential::Missing => return Err(DenyReason::MissingCredential),
        };

        let verifier = self.verifier.as_ref();
        let claims = match panic::catch_unwind(AssertUnwindSafe(|| verifier.verify(token))) {
            Ok(Ok(claims)) => claims,
            Ok(Err(e)) => {
                debug!("Token rejected: {e}");
                return Err(DenyReason::InvalidCredential);
            }
            Err(_) => {
                error!("Token verifier panicked");
                return Err(DenyReason::InvalidCredential);
            }
        };

        let owner_id = claims.owner_id;
        let identity = match self
            .call_repo(move |repo| repo.get_user_by_id(owner_id))
            .await
        {
            Ok(Some(identity)) => identity,
            Ok(None) => return Err(DenyReason::UnknownIdentity),
            Err(e) => {
                error!("Load identity {owner_id} failed: {e:#}");
                return Err(DenyReason::UnknownIdentity);
            }
        };

        let target = self.resolve_target_owner(req, op.target).await?;

        match decide(&identity, target, op.requires_elevated) {
            AccessDecision::Allow => Ok(identity),
            AccessDecision::Deny(reason) => Err(reason),
        }
    }

    /// Resolves the user owning the resource `req` acts upon. `None` when the
    /// operation targets no single resource.
    pub async fn resolve_target_owner(
        &self,
        req: &HttpRequest,
        source: TargetSource,
    ) -> Result<Option<i64>, DenyReason> {
        let target = match extract_target(req, source) {
            Ok(target) => target,
            Err(e) => {
                debug!("Extract target failed: {e}");
                return Err(DenyReason::MalformedTarget);
            }
        };

        match target {
            TargetRef::None => Ok(None),
            TargetRef::User(id) => Ok(Some(id)),
            TargetRef::Account(number) => {
                match self
                    .call_repo(move |repo| repo.get_account_owner(number))
                    .await
                {
                    Ok(Some(owner)) => Ok(Some(owner)),
                    // Unknown accounts have no owner, only elevated callers pass
                    Ok(None) => Ok(None),
                    Err(e) => {
                        error!("Resolve owner of account {number} failed: {e:#}");
                        Err(DenyReason::MalformedTarget)
                    }
                }
            }
        }
    }

    /// Runs a repository lookup on the blocking pool under the configured
    /// deadline. Panics and timeouts come back as errors.
    async fn call_repo<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Repository) -> Result<T> + Send + 'static,
    {
        let repo = self.repo.clone();
        let task = tokio::task::spawn_blocking(move || f(repo.as_ref()));
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => bail!("repository task failed: {e}"),
            Err(_) => bail!("repository call timed out after {:?}", self.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use crate::server::authn::token::jwt::{JwtTokenIssuer, JwtTokenVerifier};
    use crate::server::authn::token::{AuthError, Claims, TokenIssuer};
    use crate::server::authn::HEADER_TOKEN;
    use crate::server::authz::repo::tests::{Fault, MemoryRepository};
    use crate::server::authz::target::{ACCOUNT_ID_PARAM, USER_ID_PARAM};
    use crate::types::user::Role;

    use super::*;

    const GET_USER: Operation = Operation::new("get user", false, TargetSource::UserPath);
    const DELETE_USER: Operation = Operation::new("delete user", true, TargetSource::UserPath);
    const LIST_ACCOUNTS: Operation = Operation::new("list accounts", true, TargetSource::None);
    const LIST_OWN: Operation = Operation::new("list own", false, TargetSource::None);
    const GET_ACCOUNT: Operation = Operation::new("get account", false, TargetSource::AccountPath);
    const CREATE_ACCOUNT: Operation =
        Operation::new("create account", false, TargetSource::OwnerQuery);

    fn build_gate(repo: MemoryRepository) -> (Gate, Arc<MemoryRepository>) {
        let repo = Arc::new(repo);
        let gate = Gate::new(
            Arc::new(JwtTokenVerifier::new_test()),
            repo.clone(),
            Duration::from_millis(200),
        );
        (gate, repo)
    }

    fn default_repo() -> MemoryRepository {
        MemoryRepository::new()
            .with_user(1, Role::Elevated)
            .with_user(5, Role::Standard)
            .with_user(9, Role::Standard)
            .with_account(100, 5)
            .with_account(200, 9)
    }

    fn token_for(id: i64) -> String {
        let issuer = JwtTokenIssuer::new_test();
        let identity = Identity {
            id,
            role: Role::Standard,
        };
        issuer.issue(&identity).unwrap().token
    }

    fn user_request(token: &str, target: &str) -> TestRequest {
        TestRequest::default()
            .insert_header((HEADER_TOKEN, token))
            .param(USER_ID_PARAM, target.to_string())
    }

    #[actix_web::test]
    async fn test_missing_credential() {
        let (gate, repo) = build_gate(default_repo());
        let req = TestRequest::default()
            .param(USER_ID_PARAM, "5")
            .to_http_request();

        let result = gate.authorize(&req, &GET_USER).await;
        assert_eq!(result, Err(DenyReason::MissingCredential));
        assert_eq!(repo.calls(), 0);
    }

    #[actix_web::test]
    async fn test_invalid_credential() {
        let (gate, repo) = build_gate(default_repo());

        for token in ["", "garbage", "a.b.c"] {
            let req = user_request(token, "5").to_http_request();
            let result = gate.authorize(&req, &GET_USER).await;
            assert_eq!(result, Err(DenyReason::InvalidCredential));
        }

        // Signed with a different secret
        let issuer = JwtTokenIssuer::new(b"not-the-server-secret", 60).unwrap();
        let identity = Identity {
            id: 5,
            role: Role::Standard,
        };
        let token = issuer.issue(&identity).unwrap().token;
        let req = user_request(&token, "5").to_http_request();
        let result = gate.authorize(&req, &GET_USER).await;
        assert_eq!(result, Err(DenyReason::InvalidCredential));

        // Expired
        let token = JwtTokenIssuer::new_test()
            .issue_at(&identity, 1000)
            .unwrap()
            .token;
        let req = user_request(&token, "5").to_http_request();
        let result = gate.authorize(&req, &GET_USER).await;
        assert_eq!(result, Err(DenyReason::InvalidCredential));

        assert_eq!(repo.calls(), 0);
    }

    #[actix_web::test]
    async fn test_unknown_identity() {
        let (gate, _) = build_gate(default_repo());
        let req = user_request(&token_for(42), "42").to_http_request();
        let result = gate.authorize(&req, &GET_USER).await;
        assert_eq!(result, Err(DenyReason::UnknownIdentity));
    }

    #[actix_web::test]
    async fn test_owner() {
        let (gate, _) = build_gate(default_repo());

        let req = user_request(&token_for(5), "5").to_http_request();
        let identity = gate.authorize(&req, &GET_USER).await.unwrap();
        assert_eq!(
            identity,
            Identity {
                id: 5,
                role: Role::Standard
            }
        );

        let req = user_request(&token_for(5), "9").to_http_request();
        let result = gate.authorize(&req, &GET_USER).await;
        assert_eq!(result, Err(DenyReason::NotOwner));
        assert_eq!(result.unwrap_err().status().as_u16(), 403);
    }

    #[actix_web::test]
    async fn test_elevated() {
        let (gate, _) = build_gate(default_repo());

        let req = user_request(&token_for(1), "9").to_http_request();
        let identity = gate.authorize(&req, &DELETE_USER).await.unwrap();
        assert_eq!(identity.id, 1);
        assert_eq!(identity.role, Role::Elevated);

        let req = user_request(&token_for(1), "9").to_http_request();
        assert!(gate.authorize(&req, &GET_USER).await.is_ok());

        let req = TestRequest::default()
            .insert_header((HEADER_TOKEN, token_for(1)))
            .to_http_request();
        assert!(gate.authorize(&req, &LIST_ACCOUNTS).await.is_ok());

        // Account numbers need not belong to the caller
        let req = TestRequest::default()
            .insert_header((HEADER_TOKEN, token_for(1)))
            .param(ACCOUNT_ID_PARAM, "200")
            .to_http_request();
        assert!(gate.authorize(&req, &GET_ACCOUNT).await.is_ok());
    }

    #[actix_web::test]
    async fn test_insufficient_role() {
        let (gate, _) = build_gate(default_repo());

        // Even on their own resource
        let req = user_request(&token_for(5), "5").to_http_request();
        let result = gate.authorize(&req, &DELETE_USER).await;
        assert_eq!(result, Err(DenyReason::InsufficientRole));

        let req = TestRequest::default()
            .insert_header((HEADER_TOKEN, token_for(5)))
            .to_http_request();
        let result = gate.authorize(&req, &LIST_ACCOUNTS).await;
        assert_eq!(result, Err(DenyReason::InsufficientRole));

        let req = TestRequest::default()
            .insert_header((HEADER_TOKEN, token_for(5)))
            .to_http_request();
        let result = gate.authorize(&req, &LIST_OWN).await;
        assert_eq!(result, Err(DenyReason::NotOwner));
    }

    #[actix_web::test]
    async fn test_account_target() {
        let (gate, _) = build_gate(default_repo());

        let req = TestRequest::default()
            .insert_header((HEADER_TOKEN, token_for(5)))
            .param(ACCOUNT_ID_PARAM, "100")
            .to_http_request();
        assert_eq!(gate.authorize(&req, &GET_ACCOUNT).await.unwrap().id, 5);

        let req = TestRequest::default()
            .insert_header((HEADER_TOKEN, token_for(5)))
            .param(ACCOUNT_ID_PARAM, "200")
            .to_http_request();
        let result = gate.authorize(&req, &GET_ACCOUNT).await;
        assert_eq!(result, Err(DenyReason::NotOwner));

        let req = TestRequest::default()
            .insert_header((HEADER_TOKEN, token_for(5)))
            .param(ACCOUNT_ID_PARAM, "300")
            .to_http_request();
        let result = gate.authorize(&req, &GET_ACCOUNT).await;
        assert_eq!(result, Err(DenyReason::NotOwner));
        assert_eq!(result.unwrap_err().status().as_u16(), 403);

        let req = TestRequest::default()
            .insert_header((HEADER_TOKEN, token_for(1)))
            .param(ACCOUNT_ID_PARAM, "300")
            .to_http_request();
        assert_eq!(gate.authorize(&req, &GET_ACCOUNT).await.unwrap().id, 1);

        let req = TestRequest::default()
            .insert_header((HEADER_TOKEN, token_for(5)))
            .param(ACCOUNT_ID_PARAM, "abc")
            .to_http_request();
        let result = gate.authorize(&req, &GET_ACCOUNT).await;
        assert_eq!(result, Err(DenyReason::MalformedTarget));
        assert_eq!(result.unwrap_err().status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn test_owner_query_target() {
        let (gate, _) = build_gate(default_repo());

        let req = TestRequest::with_uri("/accounts?ownerId=5")
            .insert_header((HEADER_TOKEN, token_for(5)))
            .to_http_request();
        assert!(gate.authorize(&req, &CREATE_ACCOUNT).await.is_ok());

        let req = TestRequest::with_uri("/accounts?ownerId=9")
            .insert_header((HEADER_TOKEN, token_for(5)))
            .to_http_request();
        let result = gate.authorize(&req, &CREATE_ACCOUNT).await;
        assert_eq!(result, Err(DenyReason::NotOwner));

        let req = TestRequest::with_uri("/accounts")
            .insert_header((HEADER_TOKEN, token_for(5)))
            .to_http_request();
        let result = gate.authorize(&req, &CREATE_ACCOUNT).await;
        assert_eq!(result, Err(DenyReason::MalformedTarget));
    }

    #[actix_web::test]
    async fn test_repository_faults() {
        let cases = [
            Fault::Error,
            Fault::Panic,
            Fault::Sleep(Duration::from_millis(1000)),
        ];
        for fault in cases {
            let (gate, repo) = build_gate(default_repo().with_fault(fault));
            let req = user_request(&token_for(5), "5").to_http_request();
            let result = gate.authorize(&req, &GET_USER).await;
            assert_eq!(result, Err(DenyReason::UnknownIdentity), "{fault:?}");
            assert_eq!(repo.calls(), 1);
        }
    }

    struct PanicVerifier;

    impl TokenVerifier for PanicVerifier {
        fn verify(&self, _token: &str) -> Result<Claims, AuthError> {
            panic!("verifier exploded");
        }
    }

    #[actix_web::test]
    async fn test_verifier_panic() {
        let repo = Arc::new(default_repo());
        let gate = Gate::new(Arc::new(PanicVerifier), repo.clone(), Duration::from_secs(1));

        let req = user_request("anything", "5").to_http_request();
        let result = gate.authorize(&req, &GET_USER).await;
        assert_eq!(result, Err(DenyReason::InvalidCredential));
        assert_eq!(repo.calls(), 0);
    }

    #[actix_web::test]
    async fn test_reproducible() {
        let (gate, repo) = build_gate(default_repo());
        let token = token_for(9);
        for i in 0..3 {
            let req = user_request(&token, "9").to_http_request();
            assert_eq!(gate.authorize(&req, &GET_USER).await.unwrap().id, 9);
            // No caching: every request loads the identity again
            assert_eq!(repo.calls(), i + 1);
        }
    }
}
