//! Deliberation engine server binary.
//!
//! Runs on `BIND_ADDR` (e.g. `0.0.0.0:8080`), reading `DB_URL` and
//! `JWT_SECRET` from the environment.

#[tokio::main]
async fn main() {
    dlb_core::init_logging();
    dlb_core::install_hard_shutdown();
    dlb_server::run().await.unwrap();
}
