//! SQLite catalogue of books, authors and reader ratings.
//!
//! This crate owns the catalogue schema (as embedded, reversible migrations)
//! and every query run against it.
//!
//! # Architecture
//! - **[`Database`]**: the connection pool; applies and reverts migrations.
//! - **[`Repository`]**: CRUD for books, crediting authors on books, and
//!   ranking books by their weighted average rating.
//! - **[`models`]**: plain data ([`Book`], [`Author`], ...) with no handle on
//!   the database.
//! - **[`rating`]**: the weighted-average formula, shared between SQL and Rust.

mod db;
pub mod error;
pub mod models;
pub mod rating;
mod repo;

pub use crate::db::Database;
pub use crate::models::{Author, Book, BookFilter, BookPatch, NewAuthor, NewBook};
pub use crate::rating::Rating;
pub use crate::repo::Repository;
