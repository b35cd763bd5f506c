//! Income editing page and update endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    database_id::DatabaseId,
    endpoints::{self, format_endpoint},
    html::{PAGE_CONTAINER_STYLE, base},
    income::{Income, IncomeForm, create::income_form, get_income, update_income},
    navigation::NavBar,
};

/// The state needed for editing an income record.
#[derive(Debug, Clone)]
pub struct EditIncomeState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditIncomeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the edit page for an income record, prefilled with its current values.
pub async fn get_edit_income_page(
    State(state): State<EditIncomeState>,
    Extension(user_id): Extension<UserID>,
    Path(income_id): Path<DatabaseId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let income = get_income(income_id, user_id, &connection)?;

    let nav_bar = NavBar::new(endpoints::INCOMES_VIEW).into_html();
    let form = income_form(
        &format_endpoint(endpoints::INCOME_API, income.id),
        "hx-put",
        "Save Income",
        Some(&income),
    );

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold" { "Edit Income" }

                (form)
            }
        }
    };

    Ok(base("Edit Income", &content).into_response())
}

/// Handle income edit form submissions.
pub async fn update_income_endpoint(
    State(state): State<EditIncomeState>,
    Extension(user_id): Extension<UserID>,
    Path(income_id): Path<DatabaseId>,
    Form(form_data): Form<IncomeForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    let income = Income {
        id: income_id,
        amount: form_data.amount,
        date: form_data.date,
        description: form_data.description,
        source: form_data.source,
        user_id,
    };

    match update_income(&income, &connection) {
        Ok(()) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::INCOMES_VIEW.to_owned()),
            (),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Failed to update income {income_id}: {error}");

            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod edit_income_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        auth::UserID,
        endpoints::{self, format_endpoint},
        income::{IncomeBuilder, create_income, create_income_table},
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::{EditIncomeState, get_edit_income_page};

    fn get_test_state() -> EditIncomeState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_income_table(&connection).expect("Could not create income table");

        EditIncomeState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn renders_prefilled_form() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        let income = {
            let connection = state.db_connection.lock().unwrap();
            create_income(
                IncomeBuilder {
                    amount: 1500.0,
                    date: date!(2025 - 01 - 15),
                    description: "January salary".to_owned(),
                    source: "Acme Corp".to_owned(),
                    user_id,
                },
                &connection,
            )
            .unwrap()
        };

        let response = get_edit_income_page(State(state), Extension(user_id), Path(income.id))
            .await
            .unwrap()
            .into_response();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form_selector = scraper::Selector::parse("form").unwrap();
        let form = html
            .select(&form_selector)
            .next()
            .expect("want a form on the page");
        assert_eq!(
            form.value().attr("hx-put").map(str::to_owned),
            Some(format_endpoint(endpoints::INCOME_API, income.id))
        );

        let source_selector = scraper::Selector::parse("input#source").unwrap();
        let source = form.select(&source_selector).next().unwrap();
        assert_eq!(source.value().attr("value"), Some("Acme Corp"));
    }

    #[tokio::test]
    async fn returns_not_found_for_other_users_income() {
        let state = get_test_state();
        let income = {
            let connection = state.db_connection.lock().unwrap();
            create_income(
                IncomeBuilder {
                    amount: 1.0,
                    date: date!(2025 - 01 - 15),
                    description: "Not yours".to_owned(),
                    source: "Elsewhere".to_owned(),
                    user_id: UserID::new(2),
                },
                &connection,
            )
            .unwrap()
        };

        let response = get_edit_income_page(State(state), Extension(UserID::new(1)), Path(income.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
