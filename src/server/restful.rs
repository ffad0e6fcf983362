use std::sync::Arc;
use std::time::Duration;

use actix_web::web::{self, Data};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use log::{info, warn};
use openssl::ssl::SslAcceptorBuilder;
use sd_notify::NotifyState;

use crate::types::response::ErrorResponse;

use super::handlers::accounts::AccountsHandler;
use super::handlers::healthz::HealthzHandler;
use super::handlers::login::LoginHandler;
use super::handlers::users::UsersHandler;
use super::response::Response;

pub struct RestfulServer {
    ssl: Option<SslAcceptorBuilder>,
    ctx: Arc<RestfulContext>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,

    bind: String,
}

pub struct RestfulContext {
    pub login_handler: LoginHandler,
    pub users_handler: UsersHandler,
    pub accounts_handler: AccountsHandler,
    pub healthz_handler: HealthzHandler,
}

impl RestfulServer {
    pub fn new(bind: String, ssl: Option<SslAcceptorBuilder>, ctx: Arc<RestfulContext>) -> Self {
        Self {
            ssl,
            ctx,
            keep_alive_secs: None,
            workers: None,
            bind,
        }
    }

    pub fn set_keep_alive_secs(&mut self, keep_alive_secs: u64) {
        self.keep_alive_secs = Some(keep_alive_secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    pub async fn run(mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let mut srv = HttpServer::new(move || {
            App::new()
                .app_data(Data::new(ctx.clone()))
                .configure(Self::routes)
                .default_service(web::route().to(Self::default_handler))
        });

        if let Some(ssl) = self.ssl.take() {
            info!("Binding to https://{}", self.bind);
            srv = srv.bind_openssl(&self.bind, ssl).context("bind with ssl")?
        } else {
            warn!("Using HTTP (without SSL). THIS IS DANGEROUS, DO NOT USE IN PRODUCTION");
            info!("Binding to http://{}", self.bind);
            srv = srv.bind(&self.bind).context("bind without ssl")?
        };

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        sd_notify::notify(true, &[NotifyState::Ready]).context("notify systemd")?;
        info!("Starting restful server");
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }

    /// Registers every route. The app must carry a `Data<Arc<RestfulContext>>`.
    pub fn routes(cfg: &mut web::ServiceConfig) {
        cfg.service(
            web::resource("/login")
                .route(web::post().to(Self::handle_login))
                .default_service(web::to(Self::method_not_allowed)),
        )
        .service(
            web::resource("/healthz")
                .route(web::get().to(Self::handle_healthz))
                .default_service(web::to(Self::method_not_allowed)),
        )
        .service(
            web::resource("/users")
                .route(web::post().to(Self::handle_create_user))
                .default_service(web::to(Self::method_not_allowed)),
        )
        .service(
            web::resource("/users/{id}")
                .route(web::get().to(Self::handle_get_user))
                .route(web::delete().to(Self::handle_delete_user))
                .default_service(web::to(Self::method_not_allowed)),
        )
        .service(
            web::resource("/users/{id}/accounts")
                .route(web::get().to(Self::handle_list_user_accounts))
                .default_service(web::to(Self::method_not_allowed)),
        )
        .service(
            web::resource("/accounts")
                .route(web::get().to(Self::handle_list_accounts))
                .route(web::post().to(Self::handle_create_account))
                .default_service(web::to(Self::method_not_allowed)),
        )
        .service(
            web::resource("/accounts/{accId}")
                .route(web::get().to(Self::handle_get_account))
                .route(web::patch().to(Self::handle_update_account))
                .route(web::delete().to(Self::handle_delete_account))
                .default_service(web::to(Self::method_not_allowed)),
        );
    }

    async fn handle_login(req: HttpRequest, ctx: Data<Arc<RestfulContext>>) -> HttpResponse {
        ctx.login_handler.handle(&req).into()
    }

    async fn handle_healthz(ctx: Data<Arc<RestfulContext>>) -> HttpResponse {
        ctx.healthz_handler.handle().into()
    }

    async fn handle_create_user(req: HttpRequest, ctx: Data<Arc<RestfulContext>>) -> HttpResponse {
        ctx.users_handler.create(&req).into()
    }

    async fn handle_get_user(req: HttpRequest, ctx: Data<Arc<RestfulContext>>) -> HttpResponse {
        ctx.users_handler.get(req).await.into()
    }

    async fn handle_list_user_accounts(
        req: HttpRequest,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        ctx.users_handler.list_accounts(req).await.into()
    }

    async fn handle_delete_user(req: HttpRequest, ctx: Data<Arc<RestfulContext>>) -> HttpResponse {
        ctx.users_handler.delete(req).await.into()
    }

    async fn handle_list_accounts(req: HttpRequest, ctx: Data<Arc<RestfulContext>>) -> HttpResponse {
        ctx.accounts_handler.list(req).await.into()
    }

    async fn handle_create_account(
        req: HttpRequest,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        ctx.accounts_handler.create(req).await.into()
    }

    async fn handle_get_account(req: HttpRequest, ctx: Data<Arc<RestfulContext>>) -> HttpResponse {
        ctx.accounts_handler.get(req).await.into()
    }

    async fn handle_update_account(
        req: HttpRequest,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        ctx.accounts_handler.update(req).await.into()
    }

    async fn handle_delete_account(
        req: HttpRequest,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        ctx.accounts_handler.delete(req).await.into()
    }

    async fn method_not_allowed() -> HttpResponse {
        Response::method_not_allowed().into()
    }

    pub async fn default_handler(req: HttpRequest) -> HttpResponse {
        let path = req.uri().path().to_string();
        let method = req.method().as_str().to_string();
        let message = format!("No route to {method} {path}");
        HttpResponse::NotFound().json(ErrorResponse { error: message })
    }
}
