//! actix-web bindings for the deliberation engine's external interface
//! layer (spec §4.10, §6): request/response DTOs live in `dlb-dto`,
//! orchestration lives in `dlb-engine`/`dlb-assign`, this crate is just
//! the HTTP surface and route wiring over them.
//!
//! ## Submodules
//!
//! - [`state`] — [`AppState`], the shared `Store`/`Assigner` handle
//! - [`error`] — maps [`dlb_engine::EngineError`] to HTTP status codes
//! - [`handlers`] — one function per spec §6 verb
mod error;
mod handlers;
mod migrations;
mod state;

pub use state::AppState;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::web;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use std::sync::Arc;
use tokio_postgres::Client;

async fn health(client: web::Data<Arc<Client>>) -> impl Responder {
    match client
        .execute("SELECT 1", &[])
        .await
        .inspect_err(|e| log::error!("health check failed: {}", e))
    {
        Ok(_) => HttpResponse::Ok().body("ok"),
        Err(_) => HttpResponse::ServiceUnavailable().body("database unavailable"),
    }
}

#[rustfmt::skip]
pub async fn run() -> Result<(), std::io::Error> {
    let health_client = dlb_store::db().await;
    let store = dlb_store::Store::new(dlb_store::owned().await);
    migrations::run(&health_client).await.expect("schema migration failed");

    let scheduler = dlb_scheduler::spawn(store.clone(), dlb_assign::Assigner::new(store.clone()));

    let state = web::Data::new(AppState::new(store));
    let crypto = web::Data::new(dlb_auth::Crypto::from_env());
    let health_client = web::Data::new(health_client);
    log::info!("starting deliberation server");

    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(state.clone())
            .app_data(crypto.clone())
            .app_data(health_client.clone())
            .route("/health", web::get().to(health))
            .service(
                web::scope("/deliberations")
                    .route("", web::post().to(handlers::create_deliberation))
                    .route("/{id}", web::get().to(handlers::get_deliberation))
                    .route("/{id}/ideas", web::post().to(handlers::submit_idea))
                    .route("/{id}/join", web::post().to(handlers::join_deliberation))
                    .route("/{id}/enter-voting", web::post().to(handlers::enter_voting))
                    .route("/{id}/trigger-start-voting", web::post().to(handlers::trigger_start_voting))
                    .route("/{id}/force-close", web::post().to(handlers::force_close))
                    .route("/{id}/predictions", web::post().to(handlers::submit_prediction)),
            )
            .service(
                web::scope("/cells")
                    .route("/{id}/votes", web::post().to(handlers::cast_vote))
                    .route("/{id}/comments", web::post().to(handlers::post_comment)),
            )
            .service(
                web::scope("/comments")
                    .route("/{id}/upvote", web::post().to(handlers::upvote_comment)),
            )
    })
    .workers(6)
    .bind(std::env::var("BIND_ADDR").expect("BIND_ADDR must be set"))?
    .run()
    .await;

    scheduler.abort();
    result
}
