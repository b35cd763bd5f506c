//! Handler for the account activation links sent by email.
//!
//! Every outcome renders the log-in page with an alert explaining what
//! happened, so the user always ends up where they can act next.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::Response,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::{
        link_token::{LinkTokenKey, TokenPurpose, decode_user_reference, verify_link_token},
        log_in::render_log_in_page,
        user::{activate_user, get_user_by_id},
    },
};

/// The state needed to verify activation links.
#[derive(Debug, Clone)]
pub struct VerifyState {
    /// The key used to sign activation link tokens.
    pub link_token_key: LinkTokenKey,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for VerifyState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            link_token_key: state.link_token_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

fn invalid_link_alert() -> Alert<'static> {
    Alert::error(
        "Invalid activation link.",
        "Check that you copied the whole link from the email.",
    )
}

fn server_error_response() -> Response {
    render_log_in_page(
        Some(Alert::error(
            "Something went wrong.",
            "Try the link again later.",
        )),
        None,
    )
}

/// Handler for the activation link from the welcome email.
///
/// Activation links stay valid after use (they are bound to the password
/// hash, not consumed), so revisiting one simply reports that the account is
/// already active.
pub async fn get_verify_account(
    State(state): State<VerifyState>,
    Path((user_reference, token)): Path<(String, String)>,
) -> Response {
    let user_id = match decode_user_reference(&user_reference) {
        Ok(user_id) => user_id,
        Err(_) => return render_log_in_page(Some(invalid_link_alert()), None),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => {
            tracing::error!("Could not acquire database lock: {}", Error::DatabaseLockError);
            return server_error_response();
        }
    };

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return render_log_in_page(Some(invalid_link_alert()), None),
        Err(error) => {
            tracing::error!("Unhandled error while looking up account for activation: {error}");
            return server_error_response();
        }
    };

    if user.is_active {
        return render_log_in_page(
            Some(Alert::info(
                "Account already activated.",
                "You can log in below.",
            )),
            None,
        );
    }

    if verify_link_token(
        &state.link_token_key,
        TokenPurpose::Activation,
        &user,
        &token,
    )
    .is_err()
    {
        return render_log_in_page(
            Some(Alert::error(
                "Activation link is invalid or has expired.",
                "Register again to receive a new link.",
            )),
            None,
        );
    }

    match activate_user(user.id, &connection) {
        Ok(()) => render_log_in_page(
            Some(Alert::success(
                "Account activated.",
                "You can now log in.",
            )),
            None,
        ),
        Err(error) => {
            tracing::error!("Could not activate account: {error}");
            server_error_response()
        }
    }
}

#[cfg(test)]
mod verify_account_tests {
    use std::{
        str::FromStr,
        sync::{Arc, Mutex},
    };

    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use email_address::EmailAddress;
    use rusqlite::Connection;

    use crate::{
        PasswordHash,
        auth::{
            link_token::{
                LinkTokenKey, TokenPurpose, encode_user_reference, generate_link_token,
            },
            user::{User, activate_user, create_user, create_user_table, get_user_by_id},
        },
        endpoints,
    };

    use super::{VerifyState, get_verify_account};

    fn get_test_state() -> (VerifyState, User) {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_user_table(&connection).expect("Could not create user table");

        let user = create_user(
            "alice",
            EmailAddress::from_str("alice@example.com").unwrap(),
            PasswordHash::new_unchecked("somehash"),
            &connection,
        )
        .expect("Could not create test user");

        let state = VerifyState {
            link_token_key: LinkTokenKey::new("42"),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        (state, user)
    }

    fn get_test_server(state: VerifyState) -> TestServer {
        let app = Router::new()
            .route(endpoints::ACTIVATE_VIEW, get(get_verify_account))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn alert_text(body: &str) -> String {
        let document = scraper::Html::parse_document(body);
        let alert_selector = scraper::Selector::parse("div[role=alert]").unwrap();
        document
            .select(&alert_selector)
            .next()
            .expect("expected an alert on the page")
            .text()
            .collect::<String>()
    }

    #[tokio::test]
    async fn valid_link_activates_account() {
        let (state, user) = get_test_state();
        let token = generate_link_token(&state.link_token_key, TokenPurpose::Activation, &user);
        let db_connection = state.db_connection.clone();
        let server = get_test_server(state);

        let response = server
            .get(&format!(
                "/activate/{}/{}",
                encode_user_reference(user.id),
                token
            ))
            .await;

        response.assert_status_ok();
        assert!(alert_text(&response.text()).contains("Account activated."));

        let user = get_user_by_id(user.id, &db_connection.lock().unwrap()).unwrap();
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn revisiting_link_reports_already_activated() {
        let (state, user) = get_test_state();
        let token = generate_link_token(&state.link_token_key, TokenPurpose::Activation, &user);
        activate_user(user.id, &state.db_connection.lock().unwrap()).unwrap();
        let server = get_test_server(state);

        let response = server
            .get(&format!(
                "/activate/{}/{}",
                encode_user_reference(user.id),
                token
            ))
            .await;

        response.assert_status_ok();
        assert!(alert_text(&response.text()).contains("already activated"));
    }

    #[tokio::test]
    async fn undecodable_reference_shows_invalid_link() {
        let (state, user) = get_test_state();
        let token = generate_link_token(&state.link_token_key, TokenPurpose::Activation, &user);
        let db_connection = state.db_connection.clone();
        let server = get_test_server(state);

        let response = server.get(&format!("/activate/!!!/{token}")).await;

        response.assert_status_ok();
        assert!(alert_text(&response.text()).contains("Invalid activation link."));

        let user = get_user_by_id(user.id, &db_connection.lock().unwrap()).unwrap();
        assert!(!user.is_active, "account should not be activated");
    }

    #[tokio::test]
    async fn unknown_user_shows_invalid_link() {
        let (state, user) = get_test_state();
        let token = generate_link_token(&state.link_token_key, TokenPurpose::Activation, &user);
        let server = get_test_server(state);

        let response = server
            .get(&format!(
                "/activate/{}/{}",
                encode_user_reference(crate::UserID::new(999)),
                token
            ))
            .await;

        response.assert_status_ok();
        assert!(alert_text(&response.text()).contains("Invalid activation link."));
    }

    #[tokio::test]
    async fn tampered_token_shows_expired_link() {
        let (state, user) = get_test_state();
        let token = generate_link_token(&state.link_token_key, TokenPurpose::Activation, &user);
        let db_connection = state.db_connection.clone();
        let server = get_test_server(state);

        let response = server
            .get(&format!(
                "/activate/{}/{}x",
                encode_user_reference(user.id),
                token
            ))
            .await;

        response.assert_status_ok();
        assert!(alert_text(&response.text()).contains("invalid or has expired"));

        let user = get_user_by_id(user.id, &db_connection.lock().unwrap()).unwrap();
        assert!(!user.is_active, "account should not be activated");
    }
}
