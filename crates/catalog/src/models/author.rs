use crate::error::Error;
use crate::models::parse_timestamp;
use serde::Serialize;
use time::OffsetDateTime;

/// A person credited on one or more books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Data for creating a new author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub name: String,
}
impl NewAuthor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AuthorRow {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}
impl TryFrom<AuthorRow> for Author {
    type Error = Error;
    fn try_from(row: AuthorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            created_at: parse_timestamp(&row.created_at, "author created at")?,
            updated_at: parse_timestamp(&row.updated_at, "author updated at")?,
        })
    }
}
