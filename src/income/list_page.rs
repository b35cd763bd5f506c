//! The paginated incomes listing page.

use std::sync::{Arc, Mutex};

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
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, pagination_nav,
    },
    income::{Income, count_incomes, get_incomes_paginated},
    navigation::NavBar,
    pagination::{Pagination, PaginationConfig, create_pagination_indicators},
};

/// The state needed for the incomes listing page.
#[derive(Debug, Clone)]
pub struct IncomesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// Configuration for pagination controls.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for IncomesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// Render one page of the user's income records.
pub async fn get_incomes_page(
    State(state): State<IncomesPageState>,
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

    let income_count = count_incomes(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to count incomes: {error}"))?;
    let page_count = income_count.div_ceil(per_page);

    let incomes = get_incomes_paginated(
        user_id,
        per_page,
        (current_page - 1) * per_page,
        &connection,
    )
    .inspect_err(|error| tracing::error!("Failed to retrieve incomes: {error}"))?;

    let indicators =
        create_pagination_indicators(current_page, page_count, state.pagination_config.max_pages);

    Ok(incomes_view(
        &incomes,
        pagination_nav(endpoints::INCOMES_VIEW, per_page, &indicators),
    )
    .into_response())
}

fn incomes_view(incomes: &[Income], pagination: Markup) -> Markup {
    let nav_bar = NavBar::new(endpoints::INCOMES_VIEW).into_html();

    let table_row = |income: &Income| {
        let edit_url = format_endpoint(endpoints::EDIT_INCOME_VIEW, income.id);
        let delete_url = format_endpoint(endpoints::INCOME_API, income.id);

        html! {
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (format_currency(income.amount)) }
                td class=(TABLE_CELL_STYLE) { (income.source) }
                td class=(TABLE_CELL_STYLE) { (income.description) }
                td class=(TABLE_CELL_STYLE) { (income.date) }
                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        a href=(edit_url) class=(LINK_STYLE) { "Edit" }

                        button
                            type="button"
                            hx-delete=(delete_url)
                            hx-confirm="Are you sure you want to delete this income record?"
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
                    h1 class="text-xl font-bold" { "Incomes" }

                    a href=(endpoints::NEW_INCOME_VIEW) class=(LINK_STYLE)
                    {
                        "Record Income"
                    }
                }

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Source" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for income in incomes {
                            (table_row(income))
                        }

                        @if incomes.is_empty() {
                            tr
                            {
                                td
                                    colspan="5"
                                    class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                {
                                    "No income recorded yet. "
                                    a href=(endpoints::NEW_INCOME_VIEW) class=(LINK_STYLE)
                                    {
                                        "Record your first income"
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

    base("Incomes", &content)
}

#[cfg(test)]
mod incomes_page_tests {
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
        income::{IncomeBuilder, create_income, create_income_table},
        pagination::{Pagination, PaginationConfig},
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::{IncomesPageState, get_incomes_page};

    fn get_test_state() -> IncomesPageState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_income_table(&connection).expect("Could not create income table");

        IncomesPageState {
            db_connection: Arc::new(Mutex::new(connection)),
            pagination_config: PaginationConfig::default(),
        }
    }

    fn insert_incomes(state: &IncomesPageState, user_id: UserID, count: u8) {
        let connection = state.db_connection.lock().unwrap();

        for day in 1..=count {
            create_income(
                IncomeBuilder {
                    amount: day as f64,
                    date: date!(2025 - 01 - 01).replace_day(day).unwrap(),
                    description: format!("income {day}"),
                    source: "Acme Corp".to_owned(),
                    user_id,
                },
                &connection,
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn displays_income_rows() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        {
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
            .unwrap();
        }

        let response = get_incomes_page(
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
        assert!(row_text.contains("$1500.00"));
        assert!(row_text.contains("Acme Corp"));
        assert!(row_text.contains("January salary"));
        assert!(row_text.contains("2025-01-15"));
    }

    #[tokio::test]
    async fn paginates_income_rows() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        insert_incomes(&state, user_id, 5);

        let response = get_incomes_page(
            State(state),
            Extension(user_id),
            Query(Pagination {
                page: Some(3),
                per_page: Some(2),
            }),
        )
        .await
        .unwrap()
        .into_response();

        let html = parse_html_document(response).await;

        // Page 3 of 5 records at 2 per page holds only day 1.
        let row_selector = scraper::Selector::parse("tbody tr").unwrap();
        let rows = html
            .select(&row_selector)
            .map(|row| row.text().collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("$1.00"));
    }

    #[tokio::test]
    async fn hides_other_users_incomes() {
        let state = get_test_state();
        insert_incomes(&state, UserID::new(2), 3);

        let response = get_incomes_page(
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
        assert!(text.contains("No income recorded yet."));
    }
}
