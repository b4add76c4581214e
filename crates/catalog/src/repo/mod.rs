//! Store operations for books, their authors and their ratings.
//!
//! [`Book`](crate::models::Book) and [`Author`](crate::models::Author) are
//! plain data; [`Repository`] is the only thing that talks to the database.
//! Queries live in `queries/*.sql`, except the few whose shape depends on the
//! caller (filters, partial updates, batched inserts) which are assembled
//! with [`sqlx::QueryBuilder`].

mod authors;
mod books;
mod ratings;

use crate::Database;
use sqlx::SqlitePool;

/// Repository for books, authors and ratings in the catalog database.
///
/// # Relationships
///
/// - Books and authors are many-to-many through `book_authors`, which has no
///   identity of its own and allows the same pair more than once
/// - Ratings (`user_books`) hold one 0-5 score per reader and book
/// - Deleting a book or author cascades to its join records
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{Book, NewBook};
    use crate::{Database, Repository};

    pub(crate) async fn setup() -> (Database, Repository) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        (db, repo)
    }

    pub(crate) fn new_book(identifier: &str, title: &str, year: i16) -> NewBook {
        NewBook {
            title: title.to_string(),
            description: format!("All about {title}"),
            publication_year: year,
            cover_image: format!("covers/{identifier}.jpg"),
            identifier: identifier.to_string(),
        }
    }

    pub(crate) async fn create_book(repo: &Repository, identifier: &str) -> Book {
        repo.create(&new_book(identifier, "Teatime Cookbook", 1993)).await.unwrap()
    }

    pub(crate) async fn create_user(db: &Database, username: &str) -> i64 {
        sqlx::query_scalar("INSERT INTO users (username, email, password) VALUES (?, ?, 'hunter2') RETURNING id")
            .bind(username)
            .bind(format!("{username}@example.com"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }
}
