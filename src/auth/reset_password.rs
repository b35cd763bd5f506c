//! The password reset page reached from the emailed link.
//!
//! The link token is checked before the form is shown, so a stale or tampered
//! link gets an error page instead of a form that cannot succeed.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    auth::{
        link_token::{LinkTokenKey, TokenPurpose, decode_user_reference, verify_link_token},
        log_in::NOTICE_PASSWORD_RESET,
        password::MIN_PASSWORD_LENGTH,
        user::{User, get_user_by_id, update_password},
    },
    endpoints,
    html::{base, error_view, log_in_register, password_input, submit_button},
    internal_server_error::InternalServerError,
};

/// The state needed to reset a user's password.
#[derive(Debug, Clone)]
pub struct ResetPasswordState {
    /// The key used to sign password reset link tokens.
    pub link_token_key: LinkTokenKey,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ResetPasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            link_token_key: state.link_token_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

fn invalid_link_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Html(
            error_view(
                "Invalid Link",
                "400",
                "This password reset link is invalid or has expired.",
                "Request a new link from the forgot password page.",
            )
            .into_string(),
        ),
    )
        .into_response()
}

/// Look up the user for a reset link and check the link's signature.
fn verify_reset_link(
    state: &ResetPasswordState,
    user_reference: &str,
    token: &str,
) -> Result<User, Error> {
    let user_id = decode_user_reference(user_reference)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_id(user_id, &connection)?;

    verify_link_token(
        &state.link_token_key,
        TokenPurpose::PasswordReset,
        &user,
        token,
    )?;

    Ok(user)
}

struct ResetPasswordFormErrors<'a> {
    old_password: Option<&'a str>,
    new_password: Option<&'a str>,
}

impl ResetPasswordFormErrors<'_> {
    fn none() -> Self {
        Self {
            old_password: None,
            new_password: None,
        }
    }
}

fn reset_password_form(
    user_reference: &str,
    token: &str,
    errors: ResetPasswordFormErrors,
) -> Markup {
    html! {
        form
            hx-post=(format!("/reset_password/{user_reference}/{token}"))
            hx-indicator="#indicator"
            hx-disabled-elt="#old_password, #new_password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (password_input("old_password", "Current password", 0, errors.old_password))
            (password_input(
                "new_password",
                "New password",
                MIN_PASSWORD_LENGTH as u8,
                errors.new_password,
            ))

            (submit_button("Reset password"))
        }
    }
}

/// Display the password reset form, or an error page when the link is bad.
pub async fn get_reset_password_page(
    State(state): State<ResetPasswordState>,
    Path((user_reference, token)): Path<(String, String)>,
) -> Response {
    match verify_reset_link(&state, &user_reference, &token) {
        Ok(_) => {
            let form = reset_password_form(&user_reference, &token, ResetPasswordFormErrors::none());
            let content = log_in_register("Choose a new password", &form);
            base("Reset Password", &content).into_response()
        }
        Err(Error::DatabaseLockError) => Error::DatabaseLockError.into_response(),
        Err(_) => invalid_link_response(),
    }
}

/// The raw data entered in the password reset form.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ResetPasswordForm {
    pub old_password: String,
    pub new_password: String,
}

/// Handler for password reset submissions via the POST method.
///
/// The link token is verified again and the current password is required, so
/// a leaked reset link alone is not enough to take over an account. Updating
/// the password invalidates the link because the token signs over the stored
/// hash.
pub async fn post_reset_password(
    State(state): State<ResetPasswordState>,
    Path((user_reference, token)): Path<(String, String)>,
    Form(form_data): Form<ResetPasswordForm>,
) -> Response {
    let user = match verify_reset_link(&state, &user_reference, &token) {
        Ok(user) => user,
        Err(Error::DatabaseLockError) => return Error::DatabaseLockError.into_response(),
        Err(_) => return invalid_link_response(),
    };

    let validated_password = match ValidatedPassword::new(&form_data.new_password) {
        Ok(password) => password,
        Err(error) => {
            let error_message = error.to_string();
            return reset_password_form(
                &user_reference,
                &token,
                ResetPasswordFormErrors {
                    old_password: None,
                    new_password: Some(&error_message),
                },
            )
            .into_response();
        }
    };

    match user.password_hash.verify(&form_data.old_password) {
        Ok(true) => {}
        Ok(false) => {
            return reset_password_form(
                &user_reference,
                &token,
                ResetPasswordFormErrors {
                    old_password: Some("The current password is incorrect."),
                    new_password: None,
                },
            )
            .into_response();
        }
        Err(error) => {
            tracing::error!("an error occurred while verifying a password: {error}");

            return InternalServerError::default().into_response();
        }
    }

    let new_password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST)
    {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");

            return InternalServerError::default().into_response();
        }
    };

    {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_response(),
        };

        if let Err(error) = update_password(user.id, &new_password_hash, &connection) {
            tracing::error!("An unhandled error occurred while updating a password: {error}");

            return InternalServerError::default().into_response();
        }
    }

    (
        StatusCode::SEE_OTHER,
        HxRedirect(format!(
            "{}?notice={}",
            endpoints::LOG_IN_VIEW,
            NOTICE_PASSWORD_RESET
        )),
        (),
    )
        .into_response()
}
