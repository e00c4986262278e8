//! Response envelope and the transaction exit path of mutating handlers.
//!
//! A mutating handler opens one transaction, runs its service call and hands
//! the outcome to [`commit_or_rollback`]. That is the only place a handler's
//! transaction ends: it commits on `Ok`, and on `Err` it rolls back before the
//! error is turned into a response.

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;

use quill_core::error::DomainError;
use quill_core::ports::Transaction;
use quill_shared::ApiResponse;

use crate::middleware::error::{AppError, AppResult};

/// Success envelope; `success` follows the status code.
pub fn success<T: Serialize>(status: StatusCode, message: &str, data: T) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse::new(status.as_u16(), message, Some(data)))
}

/// Failure envelope with optional detail data, e.g. the field error map.
pub fn failure<T: Serialize>(status: StatusCode, message: &str, data: Option<T>) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse::new(status.as_u16(), message, data))
}

/// Roll back `tx`, then hand back the error to report.
pub async fn rollback(tx: Box<dyn Transaction>, err: impl Into<AppError>) -> AppError {
    let err = err.into();

    if let Err(rollback_err) = tx.rollback().await {
        tracing::error!(error = %rollback_err, "Rollback failed");
    }
    tracing::debug!(error = %err, "Transaction rolled back");

    err
}

/// Commit on success, roll back on failure.
pub async fn commit_or_rollback<T>(
    tx: Box<dyn Transaction>,
    outcome: Result<T, DomainError>,
) -> AppResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| AppError::Internal(format!("commit failed: {e}")))?;
            Ok(value)
        }
        Err(err) => Err(rollback(tx, err).await),
    }
}
