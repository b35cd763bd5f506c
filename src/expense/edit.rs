//! Expense editing page and update endpoint.

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
    category::get_categories_by_user,
    database_id::DatabaseId,
    endpoints::{self, format_endpoint},
    expense::{Expense, ExpenseForm, create::expense_form, get_expense, update_expense},
    html::{PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
};

/// The state needed for editing an expense.
#[derive(Debug, Clone)]
pub struct EditExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the edit page for an expense, prefilled with its current values.
pub async fn get_edit_expense_page(
    State(state): State<EditExpenseState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<DatabaseId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let expense = get_expense(expense_id, user_id, &connection)?;
    let categories = get_categories_by_user(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW).into_html();
    let form = expense_form(
        &format_endpoint(endpoints::EXPENSE_API, expense.id),
        "hx-put",
        "Save Expense",
        Some(&expense),
        &categories,
    );

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold" { "Edit Expense" }

                (form)
            }
        }
    };

    Ok(base("Edit Expense", &content).into_response())
}

/// Handle expense edit form submissions.
pub async fn update_expense_endpoint(
    State(state): State<EditExpenseState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<DatabaseId>,
    Form(form_data): Form<ExpenseForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    let expense = Expense {
        id: expense_id,
        amount: form_data.amount,
        date: form_data.date,
        description: form_data.description,
        category_id: form_data.category_id,
        user_id,
    };

    match update_expense(&expense, &connection) {
        Ok(()) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
            (),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Failed to update expense {expense_id}: {error}");

            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod edit_expense_page_tests {
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
        category::{CategoryName, create_category, create_category_table},
        endpoints::{self, format_endpoint},
        expense::{ExpenseBuilder, create_expense, create_expense_table},
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::{EditExpenseState, get_edit_expense_page};

    fn get_test_state() -> EditExpenseState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_category_table(&connection).expect("Could not create category table");
        create_expense_table(&connection).expect("Could not create expense table");

        EditExpenseState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn renders_prefilled_form() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        let expense = {
            let connection = state.db_connection.lock().unwrap();
            let category = create_category(
                CategoryName::new_unchecked("Groceries"),
                user_id,
                &connection,
            )
            .unwrap();

            create_expense(
                ExpenseBuilder {
                    amount: 12.5,
                    date: date!(2025 - 01 - 15),
                    description: "Weekly shop".to_owned(),
                    category_id: Some(category.id),
                    user_id,
                },
                &connection,
            )
            .unwrap()
        };

        let response = get_edit_expense_page(State(state), Extension(user_id), Path(expense.id))
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
            Some(format_endpoint(endpoints::EXPENSE_API, expense.id))
        );

        let amount_selector = scraper::Selector::parse("input#amount").unwrap();
        let amount = form.select(&amount_selector).next().unwrap();
        assert_eq!(amount.value().attr("value"), Some("12.5"));

        let selected_selector = scraper::Selector::parse("option[selected]").unwrap();
        let selected = form
            .select(&selected_selector)
            .next()
            .expect("want the category preselected");
        assert_eq!(selected.text().collect::<String>(), "Groceries");
    }

    #[tokio::test]
    async fn returns_not_found_for_other_users_expense() {
        let state = get_test_state();
        let expense = {
            let connection = state.db_connection.lock().unwrap();
            create_expense(
                ExpenseBuilder {
                    amount: 1.0,
                    date: date!(2025 - 01 - 15),
                    description: "Not yours".to_owned(),
                    category_id: None,
                    user_id: UserID::new(2),
                },
                &connection,
            )
            .unwrap()
        };

        let response = get_edit_expense_page(State(state), Extension(UserID::new(1)), Path(expense.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
