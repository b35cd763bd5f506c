//! Endpoint for deleting an income record.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, auth::UserID, database_id::DatabaseId, income::delete_income};

/// The state needed for deleting an income record.
#[derive(Debug, Clone)]
pub struct DeleteIncomeState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteIncomeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Delete the income record with `income_id` if it belongs to the current user.
///
/// Returns an empty 200 response so the client can remove the table row.
pub async fn delete_income_endpoint(
    State(state): State<DeleteIncomeState>,
    Extension(user_id): Extension<UserID>,
    Path(income_id): Path<DatabaseId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    match delete_income(income_id, user_id, &connection) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => {
            tracing::error!("Failed to delete income {income_id}: {error}");

            error.into_alert_response()
        }
    }
}
