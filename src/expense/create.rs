//! Expense creation page and endpoint.

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
    category::{Category, get_categories_by_user},
    endpoints,
    expense::{ExpenseBuilder, ExpenseForm, create_expense},
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, submit_button},
    navigation::NavBar,
};

/// The state needed for creating an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the expense creation page with the user's categories.
pub async fn get_new_expense_page(
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_categories_by_user(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let nav_bar = NavBar::new(endpoints::NEW_EXPENSE_VIEW).into_html();
    let form = expense_form(
        endpoints::EXPENSES_API,
        "hx-post",
        "Create Expense",
        None,
        &categories,
    );

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold" { "Create Expense" }

                (form)
            }
        }
    };

    Ok(base("Create Expense", &content).into_response())
}

/// Handle expense creation form submissions.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<ExpenseForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    let builder = ExpenseBuilder {
        amount: form_data.amount,
        date: form_data.date,
        description: form_data.description,
        category_id: form_data.category_id,
        user_id,
    };

    match create_expense(builder, &connection) {
        Ok(_) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
            (),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating an expense: {error}");

            error.into_alert_response()
        }
    }
}

/// The shared form body for creating and editing an expense.
pub(super) fn expense_form(
    endpoint: &str,
    method_attribute: &str,
    submit_label: &str,
    expense: Option<&crate::expense::Expense>,
    categories: &[Category],
) -> Markup {
    let amount = expense.map(|expense| expense.amount.to_string());
    let date = expense
        .map(|expense| expense.date)
        .unwrap_or_else(|| OffsetDateTime::now_utc().date());
    let description = expense.map(|expense| expense.description.as_str());
    let selected_category = expense.and_then(|expense| expense.category_id);
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
                    placeholder="e.g. Weekly groceries"
                    value=[description]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

                select id="category_id" name="category_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "No category" }

                    @for category in categories {
                        option
                            value=(category.id)
                            selected[selected_category == Some(category.id)]
                        {
                            (category.name)
                        }
                    }
                }
            }

            (submit_button(submit_label))
        }
    }
}
