//! Expense categories: the listing page, the creation page and endpoint, and
//! the database operations backing them.

mod create;
mod db;
mod list_page;

pub use create::{create_category_endpoint, get_new_category_page};
pub use db::{create_category, create_category_table, get_categories_by_user, get_category};
pub use list_page::get_categories_page;

use crate::{Error, auth::UserID, database_id::DatabaseId};

/// The name of an expense category.
///
/// Guaranteed to contain at least one non-whitespace character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name from `name`.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyCategoryName] if `name` is empty or whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        if name.trim().is_empty() {
            return Err(Error::EmptyCategoryName);
        }

        Ok(Self(name.to_string()))
    }

    /// Create a category name without checking for emptiness.
    ///
    /// Intended for strings that were validated before being stored.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A label for grouping expenses, owned by a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: DatabaseId,
    pub name: CategoryName,
    pub user_id: UserID,
}

#[cfg(test)]
mod category_name_tests {
    use crate::Error;

    use super::CategoryName;

    #[test]
    fn new_fails_on_empty_string() {
        assert_eq!(CategoryName::new(""), Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        assert_eq!(CategoryName::new("\n\t \r"), Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_succeeds_on_non_empty_string() {
        assert!(CategoryName::new("Groceries").is_ok());
    }
}
