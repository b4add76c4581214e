use crate::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{Author, AuthorRow, Book, NewAuthor};
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite};
use tracing::instrument;

/// Join records per `INSERT`, keeping each statement well under SQLite's
/// bound-parameter limit (two per record).
const AUTHORS_PER_INSERT: usize = 400;

impl Repository {
    /// Insert a new author.
    pub async fn create_author(&self, data: &NewAuthor) -> Result<Author> {
        let row: AuthorRow = sqlx::query_as(include_str!("../../queries/insert_author.sql"))
            .bind(data.name.as_str())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.try_into()
    }

    pub async fn fetch_author(&self, id: i64) -> Result<Option<Author>> {
        let row: Option<AuthorRow> = sqlx::query_as(include_str!("../../queries/get_author.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Author::try_from).transpose()
    }

    /// Credit `authors` on `book`, in batched inserts within one transaction.
    ///
    /// Either every author is credited or none is. On success the authors are appended to `book.authors` after any that
    /// are already loaded, in the order given. Pairs are not deduplicated:
    /// crediting an author twice stores two join records and lists them twice.
    #[instrument(skip(self, book, authors), fields(book = book.id, count = authors.len()))]
    pub async fn add_authors(&self, book: &mut Book, authors: &[Author]) -> Result<()> {
        if authors.is_empty() {
            return Ok(());
        }
        let book_id = book.id;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for chunk in authors.chunks(AUTHORS_PER_INSERT) {
            let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO book_authors (book_id, author_id) ");
            query.push_values(chunk, |mut row, author| {
                row.push_bind(book_id).push_bind(author.id);
            });
            query.build().execute(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        book.authors.extend_from_slice(authors);
        tracing::debug!("credited authors");
        Ok(())
    }

    /// Credit a single author on `book`; see [`add_authors`](Self::add_authors).
    pub async fn add_author(&self, book: &mut Book, author: &Author) -> Result<()> {
        self.add_authors(book, std::slice::from_ref(author)).await
    }

    /// Load every author credited on `book`, replacing whatever `book.authors`
    /// held before.
    ///
    /// Authors come back in the order they were credited.
    pub async fn populate_authors<'b>(&self, book: &'b mut Book) -> Result<&'b [Author]> {
        let rows: Vec<AuthorRow> = sqlx::query_as(include_str!("../../queries/list_authors_for_book.sql"))
            .bind(book.id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        book.authors = rows.into_iter().map(Author::try_from).collect::<Result<Vec<_>>>()?;
        Ok(&book.authors)
    }
}

#[cfg(test)]
mod tests {
    use super::AUTHORS_PER_INSERT;
    use crate::error::ErrorKind;
    use crate::models::{BookFilter, NewAuthor};
    use crate::repo::fixtures::{create_book, setup};

    #[tokio::test]
    async fn test_create_and_fetch_author() {
        let (db, repo) = setup().await;
        let author = repo.create_author(&NewAuthor::new("A. A. Milne")).await.unwrap();
        assert_eq!(repo.fetch_author(author.id).await.unwrap(), Some(author));
        assert_eq!(repo.fetch_author(404).await.unwrap(), None);
        db.close().await;
    }

    #[tokio::test]
    async fn test_add_and_populate_authors() {
        let (db, repo) = setup().await;
        let mut book = create_book(&repo, "isbn-1").await;
        let milne = repo.create_author(&NewAuthor::new("A. A. Milne")).await.unwrap();
        let ellison = repo.create_author(&NewAuthor::new("Virginia H. Ellison")).await.unwrap();
        let shepard = repo.create_author(&NewAuthor::new("E. H. Shepard")).await.unwrap();

        repo.add_author(&mut book, &milne).await.unwrap();
        repo.add_authors(&mut book, &[ellison.clone(), shepard.clone()]).await.unwrap();
        assert_eq!(book.authors, vec![milne.clone(), ellison.clone(), shepard.clone()]);

        // A fresh copy starts without authors until populated.
        let mut stored = repo.fetch_one(&BookFilter::id(book.id)).await.unwrap().unwrap();
        assert!(stored.authors.is_empty());
        let populated = repo.populate_authors(&mut stored).await.unwrap();
        assert_eq!(populated, &[milne, ellison, shepard]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_populate_replaces_loaded_authors() {
        let (db, repo) = setup().await;
        let mut book = create_book(&repo, "isbn-1").await;
        let milne = repo.create_author(&NewAuthor::new("A. A. Milne")).await.unwrap();
        book.authors.push(milne);
        assert!(repo.populate_authors(&mut book).await.unwrap().is_empty());
        assert!(book.authors.is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_duplicate_authors_are_kept() {
        let (db, repo) = setup().await;
        let mut book = create_book(&repo, "isbn-1").await;
        let milne = repo.create_author(&NewAuthor::new("A. A. Milne")).await.unwrap();
        repo.add_author(&mut book, &milne).await.unwrap();
        repo.add_author(&mut book, &milne).await.unwrap();
        assert_eq!(book.authors.len(), 2);
        let populated = repo.populate_authors(&mut book).await.unwrap();
        assert_eq!(populated, &[milne.clone(), milne]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_add_no_authors_is_noop() {
        let (db, repo) = setup().await;
        let mut book = create_book(&repo, "isbn-1").await;
        repo.add_authors(&mut book, &[]).await.unwrap();
        assert!(book.authors.is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_add_unknown_author_fails_and_keeps_list() {
        let (db, repo) = setup().await;
        let mut book = create_book(&repo, "isbn-1").await;
        let mut ghost = repo.create_author(&NewAuthor::new("Nobody")).await.unwrap();
        ghost.id = 404;
        let err = repo.add_author(&mut book, &ghost).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database);
        assert!(book.authors.is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_removing_book_drops_join_records() {
        let (db, repo) = setup().await;
        let mut book = create_book(&repo, "isbn-1").await;
        let milne = repo.create_author(&NewAuthor::new("A. A. Milne")).await.unwrap();
        repo.add_author(&mut book, &milne).await.unwrap();
        repo.remove(&book).await.unwrap();
        let joins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_authors").fetch_one(db.pool()).await.unwrap();
        assert_eq!(joins, 0);
        assert!(repo.fetch_author(milne.id).await.unwrap().is_some());
        db.close().await;
    }

    #[tokio::test]
    async fn test_add_authors_across_several_inserts() {
        let (db, repo) = setup().await;
        let mut book = create_book(&repo, "isbn-1").await;
        let milne = repo.create_author(&NewAuthor::new("A. A. Milne")).await.unwrap();
        let authors = vec![milne; AUTHORS_PER_INSERT * 2 + 1];
        repo.add_authors(&mut book, &authors).await.unwrap();
        assert_eq!(book.authors.len(), authors.len());
        assert_eq!(repo.populate_authors(&mut book).await.unwrap().len(), authors.len());
        db.close().await;
    }

    #[tokio::test]
    async fn test_failed_later_insert_credits_nobody() {
        let (db, repo) = setup().await;
        let mut book = create_book(&repo, "isbn-1").await;
        let milne = repo.create_author(&NewAuthor::new("A. A. Milne")).await.unwrap();
        let mut ghost = milne.clone();
        ghost.id = 404;
        let mut authors = vec![milne; AUTHORS_PER_INSERT];
        authors.push(ghost);

        let err = repo.add_authors(&mut book, &authors).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database);
        assert!(book.authors.is_empty());
        let joins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_authors").fetch_one(db.pool()).await.unwrap();
        assert_eq!(joins, 0);
        db.close().await;
    }
}
