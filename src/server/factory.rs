use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use openssl::ssl::{SslAcceptor, SslAcceptorBuilder, SslMethod};

use crate::server::authn::token::factory::TokenFactory;
use crate::server::authz::gate::Gate;
use crate::server::db::factory::DbFactory;
use crate::server::handlers::accounts::AccountsHandler;
use crate::server::handlers::healthz::HealthzHandler;
use crate::server::handlers::login::LoginHandler;
use crate::server::handlers::users::UsersHandler;

use super::config::ServerConfig;
use super::db::Database;
use super::restful::{RestfulContext, RestfulServer};

pub struct ServerFactory {
    db: Arc<Database>,
    cfg: ServerConfig,
}

impl ServerFactory {
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let db_factory = DbFactory::new();
        let db = db_factory.build_db(&cfg.db).context("init database")?;
        Ok(Self { cfg, db })
    }

    pub fn build_server(&self) -> Result<RestfulServer> {
        let ssl = self.build_ssl()?;
        let ctx = self.build_context()?;

        let mut srv = RestfulServer::new(self.cfg.bind.clone(), ssl, ctx);
        if self.cfg.keep_alive_secs > 0 {
            srv.set_keep_alive_secs(self.cfg.keep_alive_secs);
        }
        if self.cfg.workers > 0 {
            srv.set_workers(self.cfg.workers);
        }

        Ok(srv)
    }

    pub fn build_ssl(&self) -> Result<Option<SslAcceptorBuilder>> {
        if !self.cfg.ssl {
            return Ok(None);
        }

        let mut builder =
            SslAcceptor::mozilla_intermediate(SslMethod::tls()).context("init ssl acceptor")?;

        builder
            .set_private_key_file(&self.cfg.key_path, openssl::ssl::SslFiletype::PEM)
            .context("load ssl key file")?;
        builder
            .set_certificate_chain_file(&self.cfg.cert_path)
            .context("load ssl cert file")?;

        Ok(Some(builder))
    }

    pub fn build_context(&self) -> Result<Arc<RestfulContext>> {
        let token_factory = TokenFactory::new(&self.cfg.authn.token);
        let issuer = token_factory
            .build_token_issuer()
            .context("init token issuer")?;
        let verifier = token_factory
            .build_token_verifier()
            .context("init token verifier")?;

        let timeout = Duration::from_millis(self.cfg.authz.repository_timeout_ms);
        let gate = Arc::new(Gate::new(Arc::new(verifier), self.db.clone(), timeout));

        let login_handler = LoginHandler::new(Arc::new(issuer), self.db.clone());
        let users_handler = UsersHandler::new(
            gate.clone(),
            self.db.clone(),
            self.cfg.authn.allow_admin_signup,
        );
        let accounts_handler = AccountsHandler::new(gate, self.db.clone());
        let healthz_handler = HealthzHandler::new();

        let ctx = RestfulContext {
            login_handler,
            users_handler,
            accounts_handler,
            healthz_handler,
        };
        Ok(Arc::new(ctx))
    }
}
