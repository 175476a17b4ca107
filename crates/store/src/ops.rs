use crate::StoreError;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;
use tokio_postgres::Row;
use tokio_postgres::Transaction;

/// The persistence seam the rest of the engine is built on (spec §4.1):
/// conditional updates, unique-constraint inserts, and transactions,
/// over a single PostgreSQL connection.
///
/// Single-statement calls (`conditional_update`, `insert_unique`,
/// `query`) only hold the connection lock for the duration of that one
/// statement, relying on PostgreSQL's own per-statement atomicity.
/// `transact` holds it for the lifetime of the closure, since a
/// multi-statement transaction needs the same connection throughout.
#[derive(Clone)]
pub struct Store {
    client: Arc<Mutex<Client>>,
}

impl Store {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
        }
    }

    /// `UPDATE ... WHERE <expected state>`. Returns `true` if the
    /// statement affected at least one row (the expected prior state
    /// still held when the update ran), `false` if it affected zero
    /// (another worker already made this transition — spec §5's
    /// "database-as-mutex": the caller treats this as Conflict and
    /// does not retry).
    pub async fn conditional_update(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<bool, StoreError> {
        let client = self.client.lock().await;
        let affected = client.execute(statement, params).await?;
        Ok(affected > 0)
    }

    /// Runs an insert against a table backed by a unique constraint.
    /// A constraint violation surfaces as `StoreError::Conflict` via
    /// `From<tokio_postgres::Error>`, not a raw driver error.
    pub async fn insert_unique(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<(), StoreError> {
        let client = self.client.lock().await;
        client.execute(statement, params).await?;
        Ok(())
    }

    pub async fn query(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, StoreError> {
        let client = self.client.lock().await;
        Ok(client.query(statement, params).await?)
    }

    pub async fn query_opt(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, StoreError> {
        let client = self.client.lock().await;
        Ok(client.query_opt(statement, params).await?)
    }

    /// Runs `body` inside a single transaction on this connection.
    /// Commits if `body` returns `Ok`, rolls back otherwise. Used for
    /// the Cell Processor's read-votes-then-flip-statuses sequence
    /// (spec §4.5), where the read must be causally inside the same
    /// transaction as the completion flip.
    ///
    /// `body` returns a boxed future rather than an `impl Future`
    /// because it borrows the `Transaction<'_>` it's handed: that
    /// borrow is higher-ranked (a fresh lifetime per call), which a
    /// single named `Fut` type parameter can't express. Callers write
    /// `|txn| Box::pin(async move { ... })`.
    pub async fn transact<F, T>(&self, body: F) -> Result<T, StoreError>
    where
        F: for<'a> FnOnce(&'a Transaction<'a>) -> BoxFuture<'a, Result<T, StoreError>>,
    {
        let mut client = self.client.lock().await;
        let txn = client.transaction().await?;
        match body(&txn).await {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let _ = txn.rollback().await;
                Err(err)
            }
        }
    }
}
