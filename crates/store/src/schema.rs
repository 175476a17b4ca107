use super::StoreError;
use tokio_postgres::Client;

/// Table metadata and DDL generation for a persisted entity.
///
/// Mirrors the reference architecture's own `Schema` trait: methods
/// return `&'static str` built at compile time via
/// [`const_format::concatcp!`], so there is no runtime string-building
/// cost and table names can't drift between the DDL and the queries
/// that use them (both reference the same [`crate`] table constants).
///
/// Unlike a bulk-training pipeline, this store never needs binary
/// `COPY` ingestion or table freezing — every table here is a normal
/// read/write OLTP table — so this trait only carries the two things
/// every entity needs: its name and its DDL.
pub trait Schema {
    /// The table name in the database.
    fn name() -> &'static str;
    /// `CREATE TABLE IF NOT EXISTS` DDL.
    fn creates() -> &'static str;
    /// `CREATE INDEX IF NOT EXISTS` statements for this table.
    fn indices() -> &'static str;
}

/// Runs a fixed list of `Schema::creates()`/`Schema::indices()`
/// statements against `client`. Called once at startup; every
/// statement is `IF NOT EXISTS` so repeated calls (e.g. in tests) are
/// idempotent.
pub async fn migrate(client: &Client, statements: &[&'static str]) -> Result<(), StoreError> {
    for stmt in statements {
        client.batch_execute(stmt).await?;
    }
    Ok(())
}
