use crate::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{Book, BookFilter, BookPatch, BookRow, NewBook, now};
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite};
use tracing::instrument;

impl Repository {
    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert a new book, returning it with its generated id and timestamps.
    #[instrument(skip(self, data), fields(identifier = %data.identifier))]
    pub async fn create(&self, data: &NewBook) -> Result<Book> {
        let row: BookRow = sqlx::query_as(include_str!("../../queries/insert_book.sql"))
            .bind(data.title.as_str())
            .bind(data.description.as_str())
            .bind(data.publication_year)
            .bind(data.cover_image.as_str())
            .bind(data.identifier.as_str())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(id = row.id, "created book");
        row.try_into()
    }

    /// Insert several books at once.
    ///
    /// Runs in a single transaction: either every book is inserted or none
    /// is. The returned books are in the same order as `data`.
    #[instrument(skip(self, data), fields(count = data.len()))]
    pub async fn create_many(&self, data: &[NewBook]) -> Result<Vec<Book>> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let mut books = Vec::with_capacity(data.len());
        for book in data {
            let row: BookRow = sqlx::query_as(include_str!("../../queries/insert_book.sql"))
                .bind(book.title.as_str())
                .bind(book.description.as_str())
                .bind(book.publication_year)
                .bind(book.cover_image.as_str())
                .bind(book.identifier.as_str())
                .fetch_one(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            books.push(Book::try_from(row)?);
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(books)
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get the first book matching every criterion in `filter`.
    ///
    /// No match is `Ok(None)`, never an error.
    pub async fn fetch_one(&self, filter: &BookFilter) -> Result<Option<Book>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM books");
        filter.push_where(&mut query);
        query.push(" LIMIT 1");
        let row: Option<BookRow> = query
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Book::try_from).transpose()
    }

    /// Get every book matching every criterion in `filter`, in the order the
    /// store returns them.
    pub async fn fetch_all(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM books");
        filter.push_where(&mut query);
        let rows: Vec<BookRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Book::try_from).collect()
    }

    /// Run a custom query against the `books` table.
    ///
    /// `build` receives a builder already holding `SELECT * FROM books` and
    /// appends whatever clauses it needs.
    ///
    /// ```no_run
    /// # async fn example(repo: &shelf_catalog::Repository) -> shelf_catalog::error::Result<()> {
    /// let books = repo
    ///     .fetch_raw(|query| {
    ///         query.push(" WHERE title LIKE ").push_bind("%Pooh%").push(" ORDER BY publication_year");
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_raw<F>(&self, build: F) -> Result<Vec<Book>>
    where
        F: FnOnce(&mut QueryBuilder<'static, Sqlite>),
    {
        let mut query = QueryBuilder::new("SELECT * FROM books");
        build(&mut query);
        let rows: Vec<BookRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Book::try_from).collect()
    }

    /// Like [`fetch_raw`](Self::fetch_raw), keeping only the first book.
    pub async fn fetch_raw_one<F>(&self, build: F) -> Result<Option<Book>>
    where
        F: FnOnce(&mut QueryBuilder<'static, Sqlite>),
    {
        let mut query = QueryBuilder::new("SELECT * FROM books");
        build(&mut query);
        let row: Option<BookRow> = query
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Book::try_from).transpose()
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Persist every field of `book` and refresh its `updated_at`.
    ///
    /// Returns [`ErrorKind::BookNotFound`] if no row has the book's id.
    #[instrument(skip(self, book), fields(id = book.id))]
    pub async fn save(&self, book: &mut Book) -> Result<()> {
        let (now, updated_at) = now()?;
        let result = sqlx::query(include_str!("../../queries/update_book.sql"))
            .bind(book.title.as_str())
            .bind(book.description.as_str())
            .bind(book.publication_year)
            .bind(book.cover_image.as_str())
            .bind(book.identifier.as_str())
            .bind(updated_at)
            .bind(book.id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::BookNotFound(book.id));
        }
        book.updated_at = now;
        tracing::debug!("saved book");
        Ok(())
    }

    /// Apply `patch` to `book` and persist only the patched fields (plus
    /// `updated_at`).
    ///
    /// Returns [`ErrorKind::BookNotFound`] if no row has the book's id, in
    /// which case `book` is left untouched.
    #[instrument(skip(self, book, patch), fields(id = book.id))]
    pub async fn save_fields(&self, book: &mut Book, patch: &BookPatch) -> Result<()> {
        let (now, updated_at) = now()?;
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE books SET ");
        patch.push_assignments(&mut query, updated_at);
        query.push(" WHERE id = ").push_bind(book.id);
        let result = query.build().execute(&self.pool).await.or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::BookNotFound(book.id));
        }
        book.apply(patch);
        book.updated_at = now;
        tracing::debug!("saved book fields");
        Ok(())
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete the book's row; its author and rating records cascade with it.
    ///
    /// Returns [`ErrorKind::BookNotFound`] if no row has the book's id (for
    /// example because it was already removed).
    #[instrument(skip(self, book), fields(id = book.id))]
    pub async fn remove(&self, book: &Book) -> Result<()> {
        let result = sqlx::query(include_str!("../../queries/delete_book.sql"))
            .bind(book.id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::BookNotFound(book.id));
        }
        tracing::debug!("removed book");
        Ok(())
    }
}
