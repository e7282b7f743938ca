pub mod member;
pub mod project;
pub mod task;

pub use member::MemberRepository;
pub use project::ProjectRepository;
pub use task::TaskRepository;

use serde::Serialize;
use serde_json::Value;

use crate::client::DatastoreError;
use crate::error::{AppError, AppResult};
use crate::models::Record;

/// Log a datastore failure for `T` and propagate it unchanged
pub(crate) fn datastore_failure<T: Record>(operation: &'static str, err: DatastoreError) -> AppError {
    tracing::error!(
        entity = T::KIND,
        operation = operation,
        error = %err,
        "Datastore request failed"
    );
    AppError::Datastore(err)
}

/// Like [`datastore_failure`], for requests that address one existing row by id.
///
/// Zero matching rows becomes `NotFound`; several rows stay a datastore error.
pub(crate) fn lookup_failure<T: Record>(operation: &'static str, err: DatastoreError) -> AppError {
    match datastore_failure::<T>(operation, err) {
        AppError::Datastore(DatastoreError::NotSingle { rows: 0 }) => {
            AppError::NotFound(T::KIND.to_string())
        }
        other => other,
    }
}

fn decode_failure<T: Record>(operation: &'static str, err: serde_json::Error) -> AppError {
    tracing::error!(
        entity = T::KIND,
        operation = operation,
        error = %err,
        "Failed to map datastore row"
    );
    AppError::Decode(err)
}

/// Decode list data; absent data is an empty list
pub(crate) fn decode_rows<T: Record>(operation: &'static str, data: Option<Value>) -> AppResult<Vec<T>> {
    match data {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(data) => serde_json::from_value(data).map_err(|e| decode_failure::<T>(operation, e)),
    }
}

pub(crate) fn decode_row<T: Record>(operation: &'static str, data: Value) -> AppResult<T> {
    serde_json::from_value(data).map_err(|e| decode_failure::<T>(operation, e))
}

/// Encode an input struct as a request body
pub(crate) fn encode<T: Record, I: Serialize>(operation: &'static str, input: &I) -> AppResult<Value> {
    serde_json::to_value(input).map_err(|e| {
        tracing::error!(
            entity = T::KIND,
            operation = operation,
            error = %e,
            "Failed to encode request body"
        );
        AppError::Decode(e)
    })
}

/// Log a rejected input for `T` and pass the error through
pub(crate) fn rejected<T: Record>(operation: &'static str, err: AppError) -> AppError {
    tracing::warn!(
        entity = T::KIND,
        operation = operation,
        error = %err,
        "Rejected invalid input"
    );
    err
}
