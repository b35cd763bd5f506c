//! Expenses: the paginated listing page, the create/edit/delete endpoints,
//! and the database operations backing them.

mod create;
mod db;
mod delete;
mod edit;
mod list_page;

pub use create::{create_expense_endpoint, get_new_expense_page};
pub use db::{
    count_expenses, create_expense, create_expense_table, delete_expense, get_expense,
    get_expenses_paginated, update_expense,
};
pub use delete::delete_expense_endpoint;
pub use edit::{get_edit_expense_page, update_expense_endpoint};
pub use list_page::get_expenses_page;

use serde::{Deserialize, Deserializer, Serialize};
use time::Date;

use crate::{auth::UserID, database_id::DatabaseId};

/// Money spent by a user on a single occasion.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    /// The ID of the expense.
    pub id: DatabaseId,
    /// The amount of money spent in dollars.
    pub amount: f64,
    /// When the money was spent.
    pub date: Date,
    /// A text description of what the money was spent on.
    pub description: String,
    /// The category the expense belongs to, if any.
    pub category_id: Option<DatabaseId>,
    /// The user the expense belongs to.
    pub user_id: UserID,
}

/// The fields needed to insert an expense row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseBuilder {
    pub amount: f64,
    pub date: Date,
    pub description: String,
    pub category_id: Option<DatabaseId>,
    pub user_id: UserID,
}

/// The raw data entered in the expense create and edit forms.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpenseForm {
    /// The value of the expense in dollars.
    pub amount: f64,
    /// The date when the money was spent.
    pub date: Date,
    /// Text detailing the expense.
    pub description: String,
    /// The selected category, where the empty string means no category.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub category_id: Option<DatabaseId>,
}

// The "no category" option submits an empty string, which serde cannot parse
// as an Option<i64> on its own.
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<DatabaseId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;

    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(id_string) => id_string
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
