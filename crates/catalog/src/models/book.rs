use crate::error::{Error, ErrorKind, Result};
use crate::models::{Author, parse_timestamp};
use exn::ResultExt;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use time::OffsetDateTime;

/// A catalogued book.
///
/// Plain data: every store operation goes through
/// [`Repository`](crate::Repository). `avg_rating` stays `None` until it has
/// been computed and `authors` stays empty until it has been populated;
/// neither is ever written back to the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub publication_year: i16,
    pub cover_image: String,
    pub identifier: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_rating: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
}
impl Book {
    /// Structural snapshot of the book, as handed to an API layer.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).or_raise(|| ErrorKind::Serialization)
    }

    /// Overwrite the fields present in `patch`.
    pub(crate) fn apply(&mut self, patch: &BookPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(year) = patch.publication_year {
            self.publication_year = year;
        }
        if let Some(cover_image) = &patch.cover_image {
            self.cover_image.clone_from(cover_image);
        }
        if let Some(identifier) = &patch.identifier {
            self.identifier.clone_from(identifier);
        }
    }
}

/// Data for creating a new book; identity and timestamps come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub description: String,
    pub publication_year: i16,
    pub cover_image: String,
    pub identifier: String,
}

/// A partial update: only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub publication_year: Option<i16>,
    pub cover_image: Option<String>,
    pub identifier: Option<String>,
}
impl BookPatch {
    /// Push `column = ?` assignments for every present field.
    pub(crate) fn push_assignments(&self, query: &mut QueryBuilder<'_, Sqlite>, updated_at: String) {
        let mut set = query.separated(", ");
        if let Some(title) = &self.title {
            set.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(description) = &self.description {
            set.push("description = ").push_bind_unseparated(description.clone());
        }
        if let Some(year) = self.publication_year {
            set.push("publication_year = ").push_bind_unseparated(year);
        }
        if let Some(cover_image) = &self.cover_image {
            set.push("cover_image = ").push_bind_unseparated(cover_image.clone());
        }
        if let Some(identifier) = &self.identifier {
            set.push("identifier = ").push_bind_unseparated(identifier.clone());
        }
        set.push("updated_at = ").push_bind_unseparated(updated_at);
    }
}

/// Equality criteria for looking books up; an empty filter matches every book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub publication_year: Option<i16>,
    pub cover_image: Option<String>,
    pub identifier: Option<String>,
}
impl BookFilter {
    pub fn id(id: i64) -> Self {
        Self { id: Some(id), ..Self::default() }
    }

    pub fn identifier(identifier: impl Into<String>) -> Self {
        Self { identifier: Some(identifier.into()), ..Self::default() }
    }

    pub fn publication_year(year: i16) -> Self {
        Self { publication_year: Some(year), ..Self::default() }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Push a ` WHERE a = ? AND b = ?` clause, or nothing for an empty filter.
    pub(crate) fn push_where(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        if self.is_empty() {
            return;
        }
        query.push(" WHERE ");
        let mut clause = query.separated(" AND ");
        if let Some(id) = self.id {
            clause.push("id = ").push_bind_unseparated(id);
        }
        if let Some(title) = &self.title {
            clause.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(description) = &self.description {
            clause.push("description = ").push_bind_unseparated(description.clone());
        }
        if let Some(year) = self.publication_year {
            clause.push("publication_year = ").push_bind_unseparated(year);
        }
        if let Some(cover_image) = &self.cover_image {
            clause.push("cover_image = ").push_bind_unseparated(cover_image.clone());
        }
        if let Some(identifier) = &self.identifier {
            clause.push("identifier = ").push_bind_unseparated(identifier.clone());
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) publication_year: i64,
    pub(crate) cover_image: String,
    pub(crate) identifier: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    /// Only present when the query aggregated ratings.
    #[sqlx(default)]
    pub(crate) avg_rating: Option<i64>,
}
impl TryFrom<BookRow> for Book {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            publication_year: i16::try_from(row.publication_year)
                .or_raise(|| ErrorKind::InvalidData("publication year"))?,
            cover_image: row.cover_image,
            identifier: row.identifier,
            created_at: parse_timestamp(&row.created_at, "book created at")?,
            updated_at: parse_timestamp(&row.updated_at, "book updated at")?,
            avg_rating: row.avg_rating,
            authors: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(avg_rating: Option<i64>) -> BookRow {
        BookRow {
            id: 1,
            title: "Winnie the Pooh's Teatime Cookbook".to_string(),
            description: "Recipes from the Hundred Acre Wood".to_string(),
            publication_year: 1993,
            cover_image: "covers/teatime.jpg".to_string(),
            identifier: "978-0525451617".to_string(),
            created_at: "2023-02-15T18:14:28.000Z".to_string(),
            updated_at: "2023-02-15T18:14:28.000Z".to_string(),
            avg_rating,
        }
    }

    #[test]
    fn test_row_to_model() {
        let book = Book::try_from(make_row(None)).unwrap();
        assert_eq!(book.publication_year, 1993);
        assert_eq!(book.avg_rating, None);
        assert!(book.authors.is_empty());
    }

    #[test]
    fn test_row_keeps_rating() {
        let book = Book::try_from(make_row(Some(4))).unwrap();
        assert_eq!(book.avg_rating, Some(4));
    }

    #[test]
    fn test_row_with_year_out_of_range() {
        let mut row = make_row(None);
        row.publication_year = 100_000;
        let err = Book::try_from(row).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("publication year"));
    }

    #[test]
    fn test_json_omits_unpopulated_fields() {
        let book = Book::try_from(make_row(None)).unwrap();
        let json = book.to_json().unwrap();
        assert_eq!(json["identifier"], "978-0525451617");
        assert_eq!(json["created_at"], "2023-02-15T18:14:28Z");
        assert!(json.get("avg_rating").is_none());
        assert!(json.get("authors").is_none());
    }

    #[test]
    fn test_json_includes_populated_fields() {
        let mut book = Book::try_from(make_row(Some(4))).unwrap();
        book.authors.push(Author {
            id: 3,
            name: "Virginia H. Ellison".to_string(),
            created_at: book.created_at,
            updated_at: book.updated_at,
        });
        let json = book.to_json().unwrap();
        assert_eq!(json["avg_rating"], 4);
        assert_eq!(json["authors"][0]["name"], "Virginia H. Ellison");
    }

    #[test]
    fn test_apply_patch() {
        let mut book = Book::try_from(make_row(None)).unwrap();
        book.apply(&BookPatch {
            title: Some("Teatime".to_string()),
            publication_year: Some(1994),
            ..BookPatch::default()
        });
        assert_eq!(book.title, "Teatime");
        assert_eq!(book.publication_year, 1994);
        assert_eq!(book.identifier, "978-0525451617");
    }

    #[test]
    fn test_empty_filter_has_no_where_clause() {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM books");
        BookFilter::default().push_where(&mut query);
        assert_eq!(query.sql(), "SELECT * FROM books");
    }

    #[test]
    fn test_filter_joins_conditions() {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM books");
        let filter = BookFilter {
            title: Some("Teatime".to_string()),
            publication_year: Some(1993),
            ..BookFilter::default()
        };
        filter.push_where(&mut query);
        assert_eq!(query.sql(), "SELECT * FROM books WHERE title = ? AND publication_year = ?");
    }

    #[test]
    fn test_patch_always_touches_updated_at() {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE books SET ");
        BookPatch::default().push_assignments(&mut query, "2023-02-15T18:14:28Z".to_string());
        assert_eq!(query.sql(), "UPDATE books SET updated_at = ?");
    }
}
