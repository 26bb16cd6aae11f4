//! Database session capability and transactions

use crate::error::RepoError;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, TransactionTrait,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Anything repositories can run statements on.
///
/// Implemented for pooled connections and for shared transaction handles,
/// so the same repository code runs inside and outside a transaction.
pub trait Session: Clone + Send + Sync + 'static {
    type Conn: ConnectionTrait + Send + Sync;

    fn conn(&self) -> &Self::Conn;

    fn backend(&self) -> DbBackend {
        self.conn().get_database_backend()
    }
}

impl Session for DatabaseConnection {
    type Conn = DatabaseConnection;

    fn conn(&self) -> &Self::Conn {
        self
    }
}

impl Session for Arc<DatabaseConnection> {
    type Conn = DatabaseConnection;

    fn conn(&self) -> &Self::Conn {
        self
    }
}

impl Session for Arc<DatabaseTransaction> {
    type Conn = DatabaseTransaction;

    fn conn(&self) -> &Self::Conn {
        self
    }
}

/// Run `work` inside a transaction.
///
/// Commits when `work` returns `Ok`, rolls back on `Err`. The transaction
/// handle must not outlive `work`; a handle still held elsewhere when `work`
/// finishes is dropped, which rolls it back. A successful `work` is then
/// reported as invalid input, a failed one keeps its own error.
pub async fn with_transaction<T, Err, F, Fut>(db: &DatabaseConnection, work: F) -> Result<T, Err>
where
    F: FnOnce(Arc<DatabaseTransaction>) -> Fut,
    Fut: Future<Output = Result<T, Err>>,
    Err: From<RepoError>,
{
    let txn = db
        .begin()
        .await
        .map_err(|e| RepoError::wrap(e, "begin transaction"))?;
    let txn = Arc::new(txn);

    let result = work(Arc::clone(&txn)).await;

    let txn = match Arc::try_unwrap(txn) {
        Ok(txn) => txn,
        Err(_) => {
            tracing::warn!("transaction handle outlived the unit of work; rolling back");
            result?;
            return Err(RepoError::invalid_input(
                "finish transaction",
                "transaction handle is still referenced after the unit of work",
            )
            .into());
        }
    };

    match result {
        Ok(value) => {
            txn.commit()
                .await
                .map_err(|e| RepoError::wrap(e, "commit transaction"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = txn.rollback().await {
                tracing::error!(error = %rollback, "transaction rollback failed");
            }
            Err(err)
        }
    }
}

/// Await a driver future, racing the cancellation token when one is bound.
pub(crate) async fn guarded<T, F>(
    cancel: Option<&CancellationToken>,
    context: String,
    fut: F,
) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, DbErr>>,
{
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(RepoError::cancelled(context)),
                result = fut => result.map_err(|e| RepoError::wrap(e, context)),
            }
        }
        None => fut.await.map_err(|e| RepoError::wrap(e, context)),
    }
}
