//! Database operations for expense categories.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::UserID,
    category::{Category, CategoryName},
    database_id::DatabaseId,
};

/// Create a category for `user_id` and return it with its generated ID.
pub fn create_category(
    name: CategoryName,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection.execute(
        "INSERT INTO category (name, user_id) VALUES (?1, ?2);",
        (name.as_ref(), user_id.as_i64()),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category { id, name, user_id })
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: DatabaseId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, user_id FROM category WHERE id = :id;")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve a user's categories ordered alphabetically by name.
pub fn get_categories_by_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, user_id FROM category WHERE user_id = :user_id ORDER BY name ASC;")?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES user(id)
        );

        CREATE INDEX IF NOT EXISTS idx_category_user_id ON category(user_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let user_id = UserID::new(row.get(2)?);

    Ok(Category {
        id,
        name: CategoryName::new_unchecked(&raw_name),
        user_id,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use crate::{Error, auth::UserID};

    use super::{
        CategoryName, create_category, create_category_table, get_categories_by_user, get_category,
    };

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        connection
    }

    #[test]
    fn create_category_succeeds() {
        let connection = get_test_db_connection();
        let name = CategoryName::new("Groceries").unwrap();
        let user_id = UserID::new(1);

        let category = create_category(name.clone(), user_id, &connection)
            .expect("Could not create category");

        assert!(category.id > 0);
        assert_eq!(category.name, name);
        assert_eq!(category.user_id, user_id);
    }

    #[test]
    fn get_category_succeeds() {
        let connection = get_test_db_connection();
        let inserted = create_category(
            CategoryName::new_unchecked("Rent"),
            UserID::new(1),
            &connection,
        )
        .expect("Could not create test category");

        let selected = get_category(inserted.id, &connection);

        assert_eq!(Ok(inserted), selected);
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let connection = get_test_db_connection();

        let selected = get_category(999, &connection);

        assert_eq!(selected, Err(Error::NotFound));
    }

    #[test]
    fn get_categories_by_user_only_returns_own_categories() {
        let connection = get_test_db_connection();
        let user_id = UserID::new(1);
        let other_user_id = UserID::new(2);

        let groceries = create_category(
            CategoryName::new_unchecked("Groceries"),
            user_id,
            &connection,
        )
        .unwrap();
        let rent =
            create_category(CategoryName::new_unchecked("Rent"), user_id, &connection).unwrap();
        create_category(
            CategoryName::new_unchecked("Travel"),
            other_user_id,
            &connection,
        )
        .unwrap();

        let categories = get_categories_by_user(user_id, &connection).unwrap();

        assert_eq!(categories, vec![groceries, rent]);
    }

    #[test]
    fn get_categories_by_user_orders_by_name() {
        let connection = get_test_db_connection();
        let user_id = UserID::new(1);

        create_category(CategoryName::new_unchecked("Zoo"), user_id, &connection).unwrap();
        create_category(CategoryName::new_unchecked("Apples"), user_id, &connection).unwrap();

        let names = get_categories_by_user(user_id, &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name.to_string())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["Apples", "Zoo"]);
    }
}
