//! The forgot password page and the endpoint that emails a reset link.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use email_address::EmailAddress;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::{
        link_token::{LinkTokenKey, TokenPurpose, encode_user_reference, generate_link_token},
        user::{User, get_user_by_email},
    },
    email::{Mailer, password_reset_email},
    endpoints,
    html::{base, log_in_register, submit_button, text_input},
    internal_server_error::InternalServerError,
};

fn forgot_password_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::FORGOT_PASSWORD_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "Email", "email", email, error_message))

            (submit_button("Send reset link"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Remembered your password? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the forgot password page.
pub async fn get_forgot_password_page() -> Response {
    let form = forgot_password_form("", None);
    let content = log_in_register("Reset your password", &form);
    base("Forgot Password", &content).into_response()
}

/// The state needed to email password reset links.
#[derive(Debug, Clone)]
pub struct ForgotPasswordState {
    /// The key used to sign password reset link tokens.
    pub link_token_key: LinkTokenKey,
    /// The public base URL used to build links in emails.
    pub base_url: String,
    pub mailer: Mailer,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ForgotPasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            link_token_key: state.link_token_key.clone(),
            base_url: state.base_url.clone(),
            mailer: state.mailer.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw data entered in the forgot password form.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

pub(crate) fn build_reset_url(base_url: &str, key: &LinkTokenKey, user: &User) -> String {
    let user_reference = encode_user_reference(user.id);
    let token = generate_link_token(key, TokenPurpose::PasswordReset, user);

    format!(
        "{}/reset_password/{}/{}",
        base_url.trim_end_matches('/'),
        user_reference,
        token
    )
}

/// Handler for password reset requests via the POST method.
///
/// On success a reset link is emailed and the form is re-rendered with a
/// confirmation. An unknown email address re-renders the form with an error so
/// the user can spot typos.
pub async fn post_forgot_password(
    State(state): State<ForgotPasswordState>,
    Form(form_data): Form<ForgotPasswordForm>,
) -> Response {
    let email = match EmailAddress::from_str(&form_data.email) {
        Ok(email) => email,
        Err(_) => {
            return forgot_password_form(&form_data.email, Some("Please enter a valid email address."))
                .into_response();
        }
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_response(),
        };

        match get_user_by_email(&email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                return forgot_password_form(
                    &form_data.email,
                    Some("No account uses that email address."),
                )
                .into_response();
            }
            Err(error) => {
                tracing::error!("An unhandled error occurred while looking up a user: {error}");

                return InternalServerError::default().into_response();
            }
        }
    };

    let reset_url = build_reset_url(&state.base_url, &state.link_token_key, &user);
    state.mailer.send(password_reset_email(
        user.email.as_str(),
        &user.username,
        &reset_url,
    ));

    html! {
        (Alert::success(
            "Reset link sent.",
            "Check your email for a link to reset your password. The link expires in 3 days.",
        ).into_html())

        (forgot_password_form("", None))
    }
    .into_response()
}
