//! Database operations for expenses.
//!
//! Every query filters by the owning user's ID, so one user's expenses are
//! invisible to another's requests.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::UserID,
    database_id::DatabaseId,
    expense::{Expense, ExpenseBuilder},
};

/// Create an expense and return it with its generated ID.
pub fn create_expense(builder: ExpenseBuilder, connection: &Connection) -> Result<Expense, Error> {
    connection
        .prepare(
            "INSERT INTO expense (amount, date, description, category_id, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, amount, date, description, category_id, user_id",
        )?
        .query_row(
            (
                builder.amount,
                builder.date,
                builder.description,
                builder.category_id,
                builder.user_id.as_i64(),
            ),
            map_expense_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve a single expense owned by `user_id`.
pub fn get_expense(
    expense_id: DatabaseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    connection
        .prepare(
            "SELECT id, amount, date, description, category_id, user_id
             FROM expense WHERE id = :id AND user_id = :user_id;",
        )?
        .query_row(
            &[(":id", &expense_id), (":user_id", &user_id.as_i64())],
            map_expense_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve one page of a user's expenses, most recent first.
pub fn get_expenses_paginated(
    user_id: UserID,
    limit: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    let query = format!(
        "SELECT id, amount, date, description, category_id, user_id
         FROM expense WHERE user_id = :user_id
         ORDER BY date DESC, id DESC LIMIT {limit} OFFSET {offset}"
    );

    connection
        .prepare(&query)?
        .query_map(&[(":user_id", &user_id.as_i64())], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Get the total number of expenses owned by `user_id`.
pub fn count_expenses(user_id: UserID, connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM expense WHERE user_id = ?1;",
            (user_id.as_i64(),),
            |row| row.get::<_, i64>(0).map(|count| count as u64),
        )
        .map_err(|error| error.into())
}

/// Update the editable fields of an expense owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingExpense] if the expense does not exist or
/// belongs to another user.
pub fn update_expense(expense: &Expense, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE expense
         SET amount = ?1, date = ?2, description = ?3, category_id = ?4
         WHERE id = ?5 AND user_id = ?6",
        (
            expense.amount,
            expense.date,
            &expense.description,
            expense.category_id,
            expense.id,
            expense.user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingExpense);
    }

    Ok(())
}

/// Delete an expense owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingExpense] if the expense does not exist or
/// belongs to another user.
pub fn delete_expense(
    expense_id: DatabaseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND user_id = ?2",
        (expense_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingExpense);
    }

    Ok(())
}

/// Create the expense table and indexes.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            category_id INTEGER REFERENCES category(id),
            user_id INTEGER NOT NULL REFERENCES user(id)
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_id ON expense(user_id);",
    )?;

    Ok(())
}

fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        amount: row.get(1)?,
        date: row.get(2)?,
        description: row.get(3)?,
        category_id: row.get(4)?,
        user_id: UserID::new(row.get(5)?),
    })
}
