//! Command implementations. Each writes its JSON output to `out`.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelf_catalog::{BookFilter, Repository};
use std::io::Write;

/// Print one book, with its authors and weighted rating loaded.
pub(crate) async fn show_book(repo: &Repository, id: i64, out: &mut impl Write) -> Result<()> {
    let Some(mut book) = repo.fetch_one(&BookFilter::id(id)).await.or_raise(|| ErrorKind::Catalog)? else {
        exn::bail!(ErrorKind::NotFound(id));
    };
    repo.populate_authors(&mut book).await.or_raise(|| ErrorKind::Catalog)?;
    repo.get_avg_rating(&mut book).await.or_raise(|| ErrorKind::Catalog)?;
    let json = book.to_json().or_raise(|| ErrorKind::Catalog)?;
    write_json(out, &json)
}

/// Print rated books, best first, optionally keeping only the first `limit`.
pub(crate) async fn top_rated(repo: &Repository, limit: Option<usize>, out: &mut impl Write) -> Result<()> {
    let mut books = repo.list_by_avg_rating().await.or_raise(|| ErrorKind::Catalog)?;
    if let Some(limit) = limit {
        books.truncate(limit);
    }
    let json = books
        .iter()
        .map(|book| book.to_json())
        .collect::<shelf_catalog::error::Result<Vec<_>>>()
        .or_raise(|| ErrorKind::Catalog)?;
    write_json(out, &serde_json::Value::Array(json))
}

fn write_json(out: &mut impl Write, value: &serde_json::Value) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).or_raise(|| ErrorKind::Output)?;
    writeln!(out).or_raise(|| ErrorKind::Output)
}
