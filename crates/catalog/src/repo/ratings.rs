use crate::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{Book, BookRow};
use crate::rating::{Rating, with_weighted_average};
use exn::ResultExt;
use std::sync::LazyLock;
use tracing::instrument;

const RATING_COLUMN: &str = "user_books.rating";

static AVG_RATING_FOR_BOOK: LazyLock<String> =
    LazyLock::new(|| with_weighted_average(include_str!("../../queries/avg_rating_for_book.sql"), RATING_COLUMN));
static LIST_BY_AVG_RATING: LazyLock<String> =
    LazyLock::new(|| with_weighted_average(include_str!("../../queries/list_by_avg_rating.sql"), RATING_COLUMN));

impl Repository {
    /// Record `user_id`'s rating of a book, replacing any earlier rating by
    /// the same user.
    #[instrument(skip(self))]
    pub async fn rate(&self, user_id: i64, book_id: i64, rating: Rating) -> Result<()> {
        sqlx::query(include_str!("../../queries/upsert_rating.sql"))
            .bind(user_id)
            .bind(book_id)
            .bind(i64::from(rating))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Every rating recorded for a book, oldest first.
    pub async fn ratings_for_book(&self, book_id: i64) -> Result<Vec<Rating>> {
        let ratings: Vec<i64> = sqlx::query_scalar(include_str!("../../queries/list_ratings_for_book.sql"))
            .bind(book_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        ratings.into_iter().map(Rating::try_from).collect()
    }

    /// Compute the weighted average rating of `book` and store it in
    /// `book.avg_rating`.
    ///
    /// Returns `None`, leaving `book.avg_rating` as it was, if nobody has
    /// rated the book.
    #[instrument(skip(self, book), fields(id = book.id))]
    pub async fn get_avg_rating(&self, book: &mut Book) -> Result<Option<i64>> {
        let avg_rating: Option<i64> = sqlx::query_scalar(AVG_RATING_FOR_BOOK.as_str())
            .bind(book.id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if avg_rating.is_some() {
            book.avg_rating = avg_rating;
        }
        Ok(avg_rating)
    }

    /// Every rated book with its weighted average rating, best first.
    ///
    /// Books nobody has rated are left out entirely rather than listed with a
    /// rating of zero. Ties are broken by id.
    #[instrument(skip(self))]
    pub async fn list_by_avg_rating(&self) -> Result<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(LIST_BY_AVG_RATING.as_str())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Book::try_from).collect()
    }
}
