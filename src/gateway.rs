use std::{any::Any, panic::AssertUnwindSafe};

use futures::{FutureExt, future::BoxFuture};
use sqlx::{PgConnection, PgPool, migrate::MigrateError};

use crate::error::AppError;

/// Gateway
///
/// Runs one unit of work inside one transaction. The closure receives the live
/// transaction handle (`Tx`) and every repository call made with it shares the
/// same atomic scope:
///
/// - `Ok` commits (a failed commit surfaces as a database error),
/// - `Err` rolls back and the error propagates unchanged,
/// - a panic rolls back and becomes `AppError::Internal`.
///
/// The closure shape mirrors `sqlx::Connection::transaction`: it is generic over
/// the borrow of the handle, so the returned future may hold `&mut Tx` across awaits.
pub trait Gateway: Send + Sync + 'static {
    type Tx: Send + 'static;

    fn run<'a, T, F>(&'a self, work: F) -> BoxFuture<'a, Result<T, AppError>>
    where
        T: Send + 'a,
        F: for<'c> FnOnce(&'c mut Self::Tx) -> BoxFuture<'c, Result<T, AppError>> + Send + 'a;
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(_) => "unknown panic payload".to_string(),
    }
}

/// PgGateway
///
/// Production gateway over the shared connection pool. Each `run` checks out a
/// connection and opens a transaction on it. If the surrounding request future is
/// dropped mid-flight the `sqlx::Transaction` guard rolls back on drop.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations under `migrations/`.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

impl Gateway for PgGateway {
    type Tx = PgConnection;

    fn run<'a, T, F>(&'a self, work: F) -> BoxFuture<'a, Result<T, AppError>>
    where
        T: Send + 'a,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, AppError>> + Send + 'a,
    {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(|err| {
                tracing::error!(error = ?err, "failed to begin transaction");
                AppError::Database(err.to_string())
            })?;

            let outcome = AssertUnwindSafe(work(&mut *tx)).catch_unwind().await;

            match outcome {
                Ok(Ok(value)) => {
                    tx.commit().await.map_err(|err| {
                        tracing::error!(error = ?err, "failed to commit transaction");
                        AppError::Database(err.to_string())
                    })?;
                    Ok(value)
                }
                Ok(Err(err)) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::error!(error = ?rollback, "failed to roll back transaction");
                    }
                    tracing::debug!(error = %err, "unit of work failed, transaction rolled back");
                    Err(err)
                }
                Err(payload) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::error!(error = ?rollback, "failed to roll back transaction");
                    }
                    let message = panic_message(payload);
                    tracing::error!(panic = %message, "unit of work panicked, transaction rolled back");
                    Err(AppError::Internal(message))
                }
            }
        })
    }
}
