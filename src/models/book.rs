//! Book catalog entity and its typed identifier.

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AppError;

/// Typed book identifier.
///
/// The local store assigns it as the SQLite integer rowid and the remote
/// mirror stores the same integer, so one id names the same logical book in
/// both places. Deserialization tolerates JSON numeric strings because the
/// remote mirror returns ids either way; serialization always emits a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BookId(pub i64);

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for BookId {
    fn from(raw: i64) -> Self {
        BookId(raw)
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(BookId(n)),
            Repr::Text(s) => s.trim().parse::<i64>().map(BookId).map_err(|_| {
                serde::de::Error::invalid_value(
                    serde::de::Unexpected::Str(&s),
                    &"an integer book id",
                )
            }),
        }
    }
}

/// A catalog book.
///
/// Optional fields serialize as explicit nulls so a PUT to the remote mirror
/// replaces the whole record rather than leaving stale values behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    /// Local file URI or remote URL
    #[serde(default)]
    pub image: Option<String>,
}

impl Book {
    /// Combine an identifier with draft fields into a full record.
    pub fn from_draft(id: BookId, draft: &BookDraft) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            author: draft.author.clone(),
            year: draft.year,
            description: draft.description.clone(),
            price: draft.price,
            image: draft.image.clone(),
        }
    }
}

/// Fields of a book create/update, without the identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
}

impl BookDraft {
    /// Check required fields before any store is touched.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if self.author.trim().is_empty() {
            return Err(AppError::Validation("Author is required".to_string()));
        }
        if let Some(price) = self.price {
            if !price.is_finite() {
                return Err(AppError::Validation(
                    "Price must be a finite number".to_string(),
                ));
            }
        }
        Ok(())
    }
}
