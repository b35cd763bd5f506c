//! The registration page and endpoint for creating a new account.
//!
//! New accounts start inactive. Registration sends an activation link to the
//! given email address and redirects to the log-in page.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use email_address::EmailAddress;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    auth::{
        link_token::{LinkTokenKey, TokenPurpose, encode_user_reference, generate_link_token},
        log_in::NOTICE_REGISTERED,
        password::MIN_PASSWORD_LENGTH,
        user::{User, create_user},
    },
    email::{Mailer, activation_email},
    endpoints,
    html::{base, log_in_register, password_input, submit_button, text_input},
    internal_server_error::InternalServerError,
};

struct RegistrationFormErrors<'a> {
    username: Option<&'a str>,
    email: Option<&'a str>,
    password: Option<&'a str>,
}

impl RegistrationFormErrors<'_> {
    fn none() -> Self {
        Self {
            username: None,
            email: None,
            password: None,
        }
    }
}

fn registration_form(username: &str, email: &str, errors: RegistrationFormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::REGISTER_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("username", "Username", "text", username, errors.username))
            (text_input("email", "Email", "email", email, errors.email))
            (password_input("password", "Password", MIN_PASSWORD_LENGTH as u8, errors.password))

            (submit_button("Create Account"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

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

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form("", "", RegistrationFormErrors::none());
    let content = log_in_register("Create an account", &registration_form);
    base("Register", &content).into_response()
}

/// The state needed for creating a new account.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key used to sign activation link tokens.
    pub link_token_key: LinkTokenKey,
    /// The public base URL used to build links in emails, e.g. "https://example.com".
    pub base_url: String,
    pub mailer: Mailer,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            link_token_key: state.link_token_key.clone(),
            base_url: state.base_url.clone(),
            mailer: state.mailer.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw data entered in the registration form.
#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub(crate) fn build_activation_url(base_url: &str, key: &LinkTokenKey, user: &User) -> String {
    let user_reference = encode_user_reference(user.id);
    let token = generate_link_token(key, TokenPurpose::Activation, user);

    format!(
        "{}/activate/{}/{}",
        base_url.trim_end_matches('/'),
        user_reference,
        token
    )
}

/// Handler for registration requests via the POST method.
///
/// On success an activation email is queued and the client is redirected to
/// the log-in page. Validation failures re-render the form with an error
/// message next to the offending field.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let validated_password = match ValidatedPassword::new(&user_data.password) {
        Ok(password) => password,
        Err(error) => {
            let error_message = error.to_string();
            return registration_form(
                &user_data.username,
                &user_data.email,
                RegistrationFormErrors {
                    username: None,
                    email: None,
                    password: Some(&error_message),
                },
            )
            .into_response();
        }
    };

    if user_data.username.is_empty() || !user_data.username.chars().all(char::is_alphanumeric) {
        let error_message = Error::InvalidUsername.to_string();
        return registration_form(
            &user_data.username,
            &user_data.email,
            RegistrationFormErrors {
                username: Some(&error_message),
                email: None,
                password: None,
            },
        )
        .into_response();
    }

    let email = match EmailAddress::from_str(&user_data.email) {
        Ok(email) => email,
        Err(_) => {
            return registration_form(
                &user_data.username,
                &user_data.email,
                RegistrationFormErrors {
                    username: None,
                    email: Some("Please enter a valid email address."),
                    password: None,
                },
            )
            .into_response();
        }
    };

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("an error occurred while hashing a password: {e}");

            return InternalServerError::default().into_response();
        }
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_response(),
        };

        match create_user(&user_data.username, email, password_hash, &connection) {
            Ok(user) => user,
            Err(Error::DuplicateUsername) => {
                return registration_form(
                    &user_data.username,
                    &user_data.email,
                    RegistrationFormErrors {
                        username: Some("The username is already in use."),
                        email: None,
                        password: None,
                    },
                )
                .into_response();
            }
            Err(Error::DuplicateEmail) => {
                return registration_form(
                    &user_data.username,
                    &user_data.email,
                    RegistrationFormErrors {
                        username: None,
                        email: Some("The email address is already in use."),
                        password: None,
                    },
                )
                .into_response();
            }
            Err(error) => {
                tracing::error!("An unhandled error occurred while inserting a new user: {error}");

                return InternalServerError::default().into_response();
            }
        }
    };

    let activation_url = build_activation_url(&state.base_url, &state.link_token_key, &user);
    state.mailer.send(activation_email(
        user.email.as_str(),
        &user.username,
        &activation_url,
    ));

    (
        StatusCode::SEE_OTHER,
        HxRedirect(format!(
            "{}?notice={}",
            endpoints::LOG_IN_VIEW,
            NOTICE_REGISTERED
        )),
        (),
    )
        .into_response()
}
