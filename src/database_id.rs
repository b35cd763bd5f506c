//! The ID type for rows in the application database.

/// The integer row ID assigned by SQLite.
pub type DatabaseId = i64;
