//! The paginated expenses listing page.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::get_categories_by_user,
    database_id::DatabaseId,
    endpoints::{self, format_endpoint},
    expense::{Expense, count_expenses, get_expenses_paginated},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, pagination_nav,
    },
    navigation::NavBar,
    pagination::{Pagination, PaginationConfig, create_pagination_indicators},
};

/// The state needed for the expenses listing page.
#[derive(Debug, Clone)]
pub struct ExpensesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// Configuration for pagination controls.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ExpensesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// Render one page of the user's expenses.
pub async fn get_expenses_page(
    State(state): State<ExpensesPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query_params): Query<Pagination>,
) -> Result<Response, Error> {
    let current_page = query_params
        .page
        .unwrap_or(state.pagination_config.default_page)
        .max(1);
    let per_page = query_params
        .per_page
        .unwrap_or(state.pagination_config.default_page_size)
        .max(1);

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let expense_count = count_expenses(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to count expenses: {error}"))?;
    let page_count = expense_count.div_ceil(per_page);

    let expenses = get_expenses_paginated(
        user_id,
        per_page,
        (current_page - 1) * per_page,
        &connection,
    )
    .inspect_err(|error| tracing::error!("Failed to retrieve expenses: {error}"))?;

    let category_names = get_categories_by_user(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?
        .into_iter()
        .map(|category| (category.id, category.name.to_string()))
        .collect::<HashMap<_, _>>();

    let indicators =
        create_pagination_indicators(current_page, page_count, state.pagination_config.max_pages);

    Ok(expenses_view(
        &expenses,
        &category_names,
        pagination_nav(endpoints::EXPENSES_VIEW, per_page, &indicators),
    )
    .into_response())
}

fn expenses_view(
    expenses: &[Expense],
    category_names: &HashMap<DatabaseId, String>,
    pagination: Markup,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW).into_html();

    let table_row = |expense: &Expense| {
        let category_name = expense
            .category_id
            .and_then(|category_id| category_names.get(&category_id).map(String::as_str))
            .unwrap_or("\u{2014}");
        let edit_url = format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id);
        let delete_url = format_endpoint(endpoints::EXPENSE_API, expense.id);

        html! {
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (format_currency(expense.amount)) }
                td class=(TABLE_CELL_STYLE) { (category_name) }
                td class=(TABLE_CELL_STYLE) { (expense.description) }
                td class=(TABLE_CELL_STYLE) { (expense.date) }
                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        a href=(edit_url) class=(LINK_STYLE) { "Edit" }

                        button
                            type="button"
                            hx-delete=(delete_url)
                            hx-confirm="Are you sure you want to delete this expense?"
                            hx-target="closest tr"
                            hx-swap="outerHTML"
                            class=(BUTTON_DELETE_STYLE)
                        {
                            "Delete"
                        }
                    }
                }
            }
        }
    };

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-4xl space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Expenses" }

                    a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE)
                    {
                        "Add Expense"
                    }
                }

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for expense in expenses {
                            (table_row(expense))
                        }

                        @if expenses.is_empty() {
                            tr
                            {
                                td
                                    colspan="5"
                                    class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                {
                                    "No expenses recorded yet. "
                                    a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE)
                                    {
                                        "Add your first expense"
                                    }
                                }
                            }
                        }
                    }
                }

                (pagination)
            }
        }
    };

    base("Expenses", &content)
}

#[cfg(test)]
mod expenses_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        auth::UserID,
        category::{CategoryName, create_category, create_category_table},
        expense::{ExpenseBuilder, create_expense, create_expense_table},
        pagination::{Pagination, PaginationConfig},
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::{ExpensesPageState, get_expenses_page};

    fn get_test_state() -> ExpensesPageState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_category_table(&connection).expect("Could not create category table");
        create_expense_table(&connection).expect("Could not create expense table");

        ExpensesPageState {
            db_connection: Arc::new(Mutex::new(connection)),
            pagination_config: PaginationConfig::default(),
        }
    }

    fn insert_expenses(state: &ExpensesPageState, user_id: UserID, count: u8) {
        let connection = state.db_connection.lock().unwrap();

        for day in 1..=count {
            create_expense(
                ExpenseBuilder {
                    amount: day as f64,
                    date: date!(2025 - 01 - 01).replace_day(day).unwrap(),
                    description: format!("expense {day}"),
                    category_id: None,
                    user_id,
                },
                &connection,
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn displays_expenses_with_category_names() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        {
            let connection = state.db_connection.lock().unwrap();
            let groceries = create_category(
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
                    category_id: Some(groceries.id),
                    user_id,
                },
                &connection,
            )
            .unwrap();
        }

        let response = get_expenses_page(
            State(state),
            Extension(user_id),
            Query(Pagination {
                page: None,
                per_page: None,
            }),
        )
        .await
        .unwrap()
        .into_response();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let row_selector = scraper::Selector::parse("tbody tr").unwrap();
        let row_text = html
            .select(&row_selector)
            .next()
            .expect("want a table row")
            .text()
            .collect::<String>();
        assert!(row_text.contains("$12.50"));
        assert!(row_text.contains("Groceries"));
        assert!(row_text.contains("Weekly shop"));
        assert!(row_text.contains("2025-01-15"));
    }

    #[tokio::test]
    async fn paginates_and_shows_indicator_strip() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        insert_expenses(&state, user_id, 5);

        let response = get_expenses_page(
            State(state),
            Extension(user_id),
            Query(Pagination {
                page: Some(2),
                per_page: Some(2),
            }),
        )
        .await
        .unwrap()
        .into_response();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        // Page 2 of 5 expenses at 2 per page holds days 3 and 2.
        let row_selector = scraper::Selector::parse("tbody tr").unwrap();
        let rows = html
            .select(&row_selector)
            .map(|row| row.text().collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("$3.00"));
        assert!(rows[1].contains("$2.00"));

        let current_selector = scraper::Selector::parse("span[aria-current=page]").unwrap();
        let current = html
            .select(&current_selector)
            .next()
            .expect("want a current page indicator");
        assert_eq!(current.text().collect::<String>(), "2");
    }

    #[tokio::test]
    async fn hides_other_users_expenses() {
        let state = get_test_state();
        insert_expenses(&state, UserID::new(2), 3);

        let response = get_expenses_page(
            State(state),
            Extension(UserID::new(1)),
            Query(Pagination {
                page: None,
                per_page: None,
            }),
        )
        .await
        .unwrap()
        .into_response();

        let html = parse_html_document(response).await;
        let cell_selector = scraper::Selector::parse("tbody td").unwrap();
        let text = html
            .select(&cell_selector)
            .next()
            .expect("want an empty-state row")
            .text()
            .collect::<String>();
        assert!(text.contains("No expenses recorded yet."));
    }
}
