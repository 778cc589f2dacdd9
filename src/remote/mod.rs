//! HTTP client for the remote book collection.
//!
//! The remote store is a plain JSON REST resource mirroring the local catalog.
//! Records travel with their local integer id so both stores name the same
//! logical book; a probe-then-act shape makes delete and upsert safe to retry.

use reqwest::StatusCode;

use crate::errors::AppError;
use crate::models::{Book, BookId};

/// Client for the remote `/books` collection.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn item_url(&self, id: BookId) -> String {
        format!("{}/{}", self.base_url, id)
    }

    /// List every record in the collection.
    pub async fn list(&self) -> Result<Vec<Book>, AppError> {
        let books = self
            .client
            .get(&self.base_url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Book>>()
            .await?;
        Ok(books)
    }

    /// Fetch one record; a 404 maps to `None`.
    pub async fn fetch(&self, id: BookId) -> Result<Option<Book>, AppError> {
        let response = self.client.get(self.item_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let book = response.error_for_status()?.json::<Book>().await?;
        Ok(Some(book))
    }

    /// Create the record, sending the pre-assigned local id in the body.
    pub async fn create(&self, book: &Book) -> Result<(), AppError> {
        self.client
            .post(&self.base_url)
            .json(book)
            .send()
            .await?
            .error_for_status()?;
        tracing::info!("Book {} created in remote store", book.id);
        Ok(())
    }

    /// Replace the record at the book's id.
    pub async fn update(&self, id: BookId, book: &Book) -> Result<(), AppError> {
        self.client
            .put(self.item_url(id))
            .json(book)
            .send()
            .await?
            .error_for_status()?;
        tracing::info!("Book {} updated in remote store", id);
        Ok(())
    }

    /// Remove the record if the collection holds it.
    ///
    /// Probes with a GET first; a missing record is a successful no-op and
    /// returns `false`, indistinguishable from a delete to the caller's flow.
    pub async fn delete(&self, id: BookId) -> Result<bool, AppError> {
        if self.fetch(id).await?.is_none() {
            tracing::info!("Book {} not in remote store, nothing to delete", id);
            return Ok(false);
        }

        self.client
            .delete(self.item_url(id))
            .send()
            .await?
            .error_for_status()?;
        tracing::info!("Book {} deleted from remote store", id);
        Ok(true)
    }

    /// Create or replace, depending on whether the record already exists.
    pub async fn upsert(&self, book: &Book) -> Result<(), AppError> {
        if self.fetch(book.id).await?.is_some() {
            self.update(book.id, book).await
        } else {
            self.create(book).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_url_handles_trailing_slash() {
        let remote = RemoteCatalog::new("http://localhost:5000/books/");
        assert_eq!(remote.item_url(BookId(4)), "http://localhost:5000/books/4");
    }
}
