//! Income creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, submit_button},
    income::{Income, IncomeBuilder, IncomeForm, create_income},
    navigation::NavBar,
};

/// The state needed for creating an income record.
#[derive(Debug, Clone)]
pub struct CreateIncomeState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateIncomeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the income creation page.
pub async fn get_new_income_page() -> Response {
    let nav_bar = NavBar::new(endpoints::NEW_INCOME_VIEW).into_html();
    let form = income_form(endpoints::INCOMES_API, "hx-post", "Record Income", None);

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold" { "Record Income" }

                (form)
            }
        }
    };

    base("Record Income", &content).into_response()
}

/// Handle income creation form submissions.
pub async fn create_income_endpoint(
    State(state): State<CreateIncomeState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<IncomeForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    let builder = IncomeBuilder {
        amount: form_data.amount,
        date: form_data.date,
        description: form_data.description,
        source: form_data.source,
        user_id,
    };

    match create_income(builder, &connection) {
        Ok(_) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::INCOMES_VIEW.to_owned()),
            (),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while recording income: {error}");

            error.into_alert_response()
        }
    }
}

/// The shared form body for creating and editing an income record.
pub(super) fn income_form(
    endpoint: &str,
    method_attribute: &str,
    submit_label: &str,
    income: Option<&Income>,
) -> Markup {
    let amount = income.map(|income| income.amount.to_string());
    let date = income
        .map(|income| income.date)
        .unwrap_or_else(|| OffsetDateTime::now_utc().date());
    let description = income.map(|income| income.description.as_str());
    let source = income.map(|income| income.source.as_str());
    let hx_post = (method_attribute == "hx-post").then_some(endpoint);
    let hx_put = (method_attribute == "hx-put").then_some(endpoint);

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-indicator="#indicator"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    id="amount"
                    type="number"
                    name="amount"
                    step="0.01"
                    placeholder="0.00"
                    value=[amount.as_deref()]
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    id="date"
                    type="date"
                    name="date"
                    value=(date)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    id="description"
                    type="text"
                    name="description"
                    placeholder="e.g. January salary"
                    value=[description]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="source" class=(FORM_LABEL_STYLE) { "Source" }

                input
                    id="source"
                    type="text"
                    name="source"
                    placeholder="e.g. Acme Corp"
                    value=[source]
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (submit_button(submit_label))
        }
    }
}

#[cfg(test)]
mod new_income_page_tests {
    use crate::{
        endpoints,
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::get_new_income_page;

    #[tokio::test]
    async fn renders_income_form() {
        let response = get_new_income_page().await;

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form_selector = scraper::Selector::parse("form").unwrap();
        let form = html
            .select(&form_selector)
            .next()
            .expect("want a form on the page");
        assert_eq!(form.value().attr("hx-post"), Some(endpoints::INCOMES_API));

        for id in ["amount", "date", "description", "source"] {
            let selector_string = format!("input#{id}");
            let input_selector = scraper::Selector::parse(&selector_string).unwrap();
            assert_eq!(form.select(&input_selector).count(), 1, "want 1 input#{id}");
        }
    }
}

#[cfg(test)]
mod create_income_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        auth::UserID,
        endpoints,
        income::{IncomeForm, create_income_table, get_income},
        test_utils::assert_hx_redirect,
    };

    use super::{CreateIncomeState, create_income_endpoint};

    fn get_test_state() -> CreateIncomeState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_income_table(&connection).expect("Could not create income table");

        CreateIncomeState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn can_create_income() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        let form = IncomeForm {
            amount: 1500.0,
            date: date!(2025 - 01 - 15),
            description: "January salary".to_owned(),
            source: "Acme Corp".to_owned(),
        };

        let response = create_income_endpoint(State(state.clone()), Extension(user_id), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::INCOMES_VIEW);

        let income = get_income(1, user_id, &state.db_connection.lock().unwrap())
            .expect("Could not get created income");
        assert_eq!(income.amount, 1500.0);
        assert_eq!(income.source, "Acme Corp");
    }
}
