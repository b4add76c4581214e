//! Weighted average rating.
//!
//! Each rating is weighted by its own value, so a catalogue score leans
//! towards the higher ratings a book received:
//!
//! ```text
//! avg = SUM(weight(r)) / SUM(r)      (integer division, 0 when SUM(r) is 0)
//! ```
//!
//! The weights live in a single table, [`MULTIPLIERS`], which drives both the
//! SQL aggregate injected into the catalogue queries and the in-memory
//! [`weighted_average`].

use crate::error::{Error, ErrorKind, Result};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Multiplier applied to each rating value (indexed by the rating itself).
const MULTIPLIERS: [i64; 6] = [0, 1, 2, 3, 4, 5];

/// A reader's rating of a book, from 0 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            exn::bail!(ErrorKind::InvalidRating(i64::from(value)));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The rating's contribution to the numerator of the weighted average.
    pub fn weight(self) -> i64 {
        i64::from(self.0) * MULTIPLIERS[usize::from(self.0)]
    }
}

impl TryFrom<i64> for Rating {
    type Error = Error;
    fn try_from(value: i64) -> Result<Self> {
        match u8::try_from(value) {
            Ok(value) => Self::new(value),
            Err(_) => exn::bail!(ErrorKind::InvalidRating(value)),
        }
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

impl Display for Rating {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// Weighted average of the given ratings, truncated towards zero.
///
/// Returns `None` when there are no ratings at all, and `Some(0)` when every
/// rating is zero.
pub fn weighted_average(ratings: impl IntoIterator<Item = Rating>) -> Option<i64> {
    let mut ratings = ratings.into_iter().peekable();
    ratings.peek()?;
    let (numerator, denominator) = ratings.fold((0i64, 0i64), |(num, den), rating| {
        (num + rating.weight(), den + i64::from(rating))
    });
    Some(if denominator == 0 { 0 } else { numerator / denominator })
}

/// SQL aggregate computing [`weighted_average`] over `column`.
///
/// Both operands are integers, so SQLite's division already truncates.
pub(crate) fn weighted_average_sql(column: &str) -> String {
    let arms = MULTIPLIERS
        .iter()
        .enumerate()
        .map(|(rating, multiplier)| format!("WHEN {rating} THEN {column} * {multiplier}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("CAST(COALESCE(SUM(CASE {column} {arms} END) / NULLIF(SUM({column}), 0), 0) AS INTEGER)")
}

/// Substitute the `{avg_rating}` placeholder of a query template.
pub(crate) fn with_weighted_average(template: &str, column: &str) -> String {
    template.replace("{avg_rating}", &weighted_average_sql(column))
}
