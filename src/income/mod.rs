//! Income records: the paginated listing page, the create/edit/delete
//! endpoints, and the database operations backing them.

mod create;
mod db;
mod delete;
mod edit;
mod list_page;

pub use create::{create_income_endpoint, get_new_income_page};
pub use db::{
    count_incomes, create_income, create_income_table, delete_income, get_income,
    get_incomes_paginated, update_income,
};
pub use delete::delete_income_endpoint;
pub use edit::{get_edit_income_page, update_income_endpoint};
pub use list_page::get_incomes_page;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{auth::UserID, database_id::DatabaseId};

/// Money received by a user on a single occasion.
#[derive(Debug, Clone, PartialEq)]
pub struct Income {
    /// The ID of the income record.
    pub id: DatabaseId,
    /// The amount of money received in dollars.
    pub amount: f64,
    /// When the money was received.
    pub date: Date,
    /// A text description of the income.
    pub description: String,
    /// Where the money came from, e.g. an employer's name.
    pub source: String,
    /// The user the income record belongs to.
    pub user_id: UserID,
}

/// The fields needed to insert an income row.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeBuilder {
    pub amount: f64,
    pub date: Date,
    pub description: String,
    pub source: String,
    pub user_id: UserID,
}

/// The raw data entered in the income create and edit forms.
#[derive(Debug, Serialize, Deserialize)]
pub struct IncomeForm {
    /// The value of the income in dollars.
    pub amount: f64,
    /// The date when the money was received.
    pub date: Date,
    /// Text detailing the income.
    pub description: String,
    /// Where the money came from.
    pub source: String,
}
