//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_forgot_password_page, get_log_in_page, get_log_out,
        get_register_page, get_reset_password_page, get_verify_account, post_forgot_password,
        post_log_in, post_reset_password, register_user,
    },
    category::{create_category_endpoint, get_categories_page, get_new_category_page},
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_edit_expense_page,
        get_expenses_page, get_new_expense_page, update_expense_endpoint,
    },
    income::{
        create_income_endpoint, delete_income_endpoint, get_edit_income_page, get_incomes_page,
        get_new_income_page, update_income_endpoint,
    },
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::REGISTER_API, post(register_user))
        .route(
            endpoints::FORGOT_PASSWORD_VIEW,
            get(get_forgot_password_page),
        )
        .route(endpoints::FORGOT_PASSWORD_API, post(post_forgot_password))
        .route(endpoints::ACTIVATE_VIEW, get(get_verify_account))
        .route(
            endpoints::RESET_PASSWORD_VIEW,
            get(get_reset_password_page).post(post_reset_password),
        )
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::EXPENSES_VIEW, get(get_expenses_page))
        .route(endpoints::NEW_EXPENSE_VIEW, get(get_new_expense_page))
        .route(endpoints::EDIT_EXPENSE_VIEW, get(get_edit_expense_page))
        .route(endpoints::INCOMES_VIEW, get(get_incomes_page))
        .route(endpoints::NEW_INCOME_VIEW, get(get_new_income_page))
        .route(endpoints::EDIT_INCOME_VIEW, get(get_edit_income_page))
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/PUT/DELETE routes need to use the HX-REDIRECT header for
    // auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::EXPENSES_API, post(create_expense_endpoint))
            .route(
                endpoints::EXPENSE_API,
                put(update_expense_endpoint).delete(delete_expense_endpoint),
            )
            .route(endpoints::INCOMES_API, post(create_income_endpoint))
            .route(
                endpoints::INCOME_API,
                put(update_income_endpoint).delete(delete_income_endpoint),
            )
            .route(endpoints::CATEGORIES_API, post(create_category_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the expenses page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::EXPENSES_VIEW)
}

#[cfg(test)]
mod routing_tests {
    use std::{
        str::FromStr,
        sync::{Arc, Mutex},
    };

    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use email_address::EmailAddress;
    use rusqlite::Connection;

    use crate::{
        AppState, PaginationConfig,
        auth::{COOKIE_TOKEN, PasswordHash, activate_user, create_user},
        email::Mailer,
        endpoints,
    };

    use super::build_router;

    const TEST_PASSWORD: &str = "averysecurepassword";

    fn get_test_server() -> TestServer {
        let state = AppState::new(
            Connection::open_in_memory().expect("Could not open in-memory SQLite database"),
            "wowsosecret",
            "https://example.com",
            Mailer::Capture(Arc::new(Mutex::new(Vec::new()))),
            PaginationConfig::default(),
        )
        .expect("Could not create app state");

        {
            let connection = state.db_connection.lock().unwrap();
            let user = create_user(
                "alice",
                EmailAddress::from_str("alice@example.com").unwrap(),
                PasswordHash::from_raw_password(TEST_PASSWORD, 4).unwrap(),
                &connection,
            )
            .expect("Could not create test user");
            activate_user(user.id, &connection).expect("Could not activate test user");
        }

        TestServer::try_new(build_router(state)).expect("Could not create test server")
    }

    async fn log_in(server: &TestServer) -> Cookie<'static> {
        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("username", "alice"), ("password", TEST_PASSWORD)])
            .await;

        response.assert_status_see_other();

        response.cookie(COOKIE_TOKEN)
    }

    #[tokio::test]
    async fn root_redirects_unauthenticated_client_to_log_in() {
        let server = get_test_server();

        let response = server.get(endpoints::ROOT).await;

        response.assert_status_see_other();
        assert!(
            response
                .header("location")
                .to_str()
                .unwrap()
                .starts_with(endpoints::LOG_IN_VIEW)
        );
    }

    #[tokio::test]
    async fn root_redirects_logged_in_client_to_expenses() {
        let server = get_test_server();
        let auth_cookie = log_in(&server).await;

        let response = server
            .get(endpoints::ROOT)
            .add_cookie(auth_cookie)
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::EXPENSES_VIEW);
    }

    #[tokio::test]
    async fn logged_in_client_can_view_protected_pages() {
        let server = get_test_server();
        let auth_cookie = log_in(&server).await;

        for endpoint in [
            endpoints::EXPENSES_VIEW,
            endpoints::NEW_EXPENSE_VIEW,
            endpoints::INCOMES_VIEW,
            endpoints::NEW_INCOME_VIEW,
            endpoints::CATEGORIES_VIEW,
            endpoints::NEW_CATEGORY_VIEW,
        ] {
            let response = server.get(endpoint).add_cookie(auth_cookie.clone()).await;
            assert_eq!(
                response.status_code(),
                axum::http::StatusCode::OK,
                "want 200 from {endpoint}"
            );
        }
    }

    #[tokio::test]
    async fn unknown_route_returns_not_found_page() {
        let server = get_test_server();

        let response = server.get("/no/such/page").await;

        response.assert_status_not_found();
        assert!(response.text().contains("404"));
    }

    #[tokio::test]
    async fn api_routes_require_authentication() {
        let server = get_test_server();

        let response = server
            .post(endpoints::EXPENSES_API)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", endpoints::NEW_EXPENSE_VIEW)
            .form(&[
                ("amount", "1.0"),
                ("date", "2025-01-15"),
                ("description", "nope"),
            ])
            .await;

        response.assert_status_ok();
        assert!(
            response
                .header("hx-redirect")
                .to_str()
                .unwrap()
                .starts_with(endpoints::LOG_IN_VIEW)
        );
    }
}
