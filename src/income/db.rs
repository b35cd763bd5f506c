//! Database operations for income records.
//!
//! Every query filters by the owning user's ID, so one user's income records
//! are invisible to another's requests.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::UserID,
    database_id::DatabaseId,
    income::{Income, IncomeBuilder},
};

/// Create an income record and return it with its generated ID.
pub fn create_income(builder: IncomeBuilder, connection: &Connection) -> Result<Income, Error> {
    connection
        .prepare(
            "INSERT INTO income (amount, date, description, source, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, amount, date, description, source, user_id",
        )?
        .query_row(
            (
                builder.amount,
                builder.date,
                builder.description,
                builder.source,
                builder.user_id.as_i64(),
            ),
            map_income_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve a single income record owned by `user_id`.
pub fn get_income(
    income_id: DatabaseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Income, Error> {
    connection
        .prepare(
            "SELECT id, amount, date, description, source, user_id
             FROM income WHERE id = :id AND user_id = :user_id;",
        )?
        .query_row(
            &[(":id", &income_id), (":user_id", &user_id.as_i64())],
            map_income_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve one page of a user's income records, most recent first.
pub fn get_incomes_paginated(
    user_id: UserID,
    limit: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Vec<Income>, Error> {
    let query = format!(
        "SELECT id, amount, date, description, source, user_id
         FROM income WHERE user_id = :user_id
         ORDER BY date DESC, id DESC LIMIT {limit} OFFSET {offset}"
    );

    connection
        .prepare(&query)?
        .query_map(&[(":user_id", &user_id.as_i64())], map_income_row)?
        .map(|maybe_income| maybe_income.map_err(|error| error.into()))
        .collect()
}

/// Get the total number of income records owned by `user_id`.
pub fn count_incomes(user_id: UserID, connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM income WHERE user_id = ?1;",
            (user_id.as_i64(),),
            |row| row.get::<_, i64>(0).map(|count| count as u64),
        )
        .map_err(|error| error.into())
}

/// Update the editable fields of an income record owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingIncome] if the record does not exist or
/// belongs to another user.
pub fn update_income(income: &Income, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE income
         SET amount = ?1, date = ?2, description = ?3, source = ?4
         WHERE id = ?5 AND user_id = ?6",
        (
            income.amount,
            income.date,
            &income.description,
            &income.source,
            income.id,
            income.user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingIncome);
    }

    Ok(())
}

/// Delete an income record owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingIncome] if the record does not exist or
/// belongs to another user.
pub fn delete_income(
    income_id: DatabaseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM income WHERE id = ?1 AND user_id = ?2",
        (income_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingIncome);
    }

    Ok(())
}

/// Create the income table and indexes.
pub fn create_income_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS income (
            id INTEGER PRIMARY KEY,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            source TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES user(id)
        );

        CREATE INDEX IF NOT EXISTS idx_income_user_id ON income(user_id);",
    )?;

    Ok(())
}

fn map_income_row(row: &Row) -> Result<Income, rusqlite::Error> {
    Ok(Income {
        id: row.get(0)?,
        amount: row.get(1)?,
        date: row.get(2)?,
        description: row.get(3)?,
        source: row.get(4)?,
        user_id: UserID::new(row.get(5)?),
    })
}
