//! Catalog service: merged reads and outbox-backed writes.
//!
//! Mutations commit to the local store together with a durable outbox entry,
//! then the queue is drained towards the remote mirror. A remote failure never
//! fails the caller's mutation; the entry stays queued and is retried with
//! capped exponential backoff. Reads union both stores by id.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::config::Config;
use crate::db::{OutboxEntry, OutboxOp, Repository};
use crate::errors::AppError;
use crate::models::{Book, BookDraft, BookId};
use crate::remote::RemoteCatalog;

/// Outcome of an outbox drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries acknowledged by the remote store this run
    pub pushed: usize,
    /// Entries still queued afterwards
    pub pending: usize,
}

/// Catalog operations over the local store and the remote mirror.
#[derive(Clone)]
pub struct CatalogService {
    repo: Repository,
    remote: RemoteCatalog,
}

impl CatalogService {
    pub fn new(repo: Repository, remote: RemoteCatalog) -> Self {
        Self { repo, remote }
    }

    /// Wire up a service from configuration: open (or create) the local store
    /// and point the client at the configured mirror.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let pool = crate::db::init_database(&config.db_path).await?;
        Ok(Self::new(
            Repository::new(pool),
            RemoteCatalog::new(config.remote_url.clone()),
        ))
    }

    /// The underlying local repository.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ==================== WRITE PATH ====================

    /// Create a book: local insert + queued remote upsert, then a best-effort
    /// drain. Returns the record with its new id once the local commit holds.
    pub async fn create_book(&self, draft: &BookDraft) -> Result<Book, AppError> {
        draft.validate()?;
        let book = self.repo.create_book(draft).await?;
        self.try_flush().await;
        Ok(book)
    }

    /// Replace a book's fields in both stores.
    pub async fn update_book(&self, id: BookId, draft: &BookDraft) -> Result<(), AppError> {
        draft.validate()?;
        self.repo.update_book(id, draft).await?;
        self.try_flush().await;
        Ok(())
    }

    /// Delete a book from both stores; returns the local rows removed.
    pub async fn delete_book(&self, id: BookId) -> Result<u64, AppError> {
        let removed = self.repo.delete_book(id).await?;
        self.try_flush().await;
        Ok(removed)
    }

    // ==================== READ PATH ====================

    /// Get one book from the local store.
    pub async fn book(&self, id: BookId) -> Result<Option<Book>, AppError> {
        self.repo.get_book(id).await
    }

    /// The merged catalog: local records first, remote-only records appended.
    ///
    /// A remote failure propagates; `local_catalog` is the offline fallback.
    pub async fn catalog(&self) -> Result<Vec<Book>, AppError> {
        let local = self.repo.list_books().await?;
        let remote = self.remote.list().await?;
        Ok(merge_by_id(local, remote))
    }

    /// The local half of the catalog only.
    pub async fn local_catalog(&self) -> Result<Vec<Book>, AppError> {
        self.repo.list_books().await
    }

    /// Case-insensitive title/author filter over the merged catalog.
    pub async fn search(&self, query: &str) -> Result<Vec<Book>, AppError> {
        let needle = query.to_lowercase();
        Ok(self
            .catalog()
            .await?
            .into_iter()
            .filter(|book| {
                book.title.to_lowercase().contains(&needle)
                    || book.author.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Import remote-only records into the local store, preserving ids.
    ///
    /// Records whose id already exists locally are skipped; nothing is queued
    /// back to the mirror. Returns how many records were imported.
    pub async fn pull_remote(&self) -> Result<usize, AppError> {
        let mut imported = 0;
        for book in self.remote.list().await? {
            if self.repo.import_book(&book).await? {
                imported += 1;
            }
        }
        tracing::info!("Imported {} record(s) from remote store", imported);
        Ok(imported)
    }

    // ==================== OUTBOX ====================

    /// Count of mutations not yet acknowledged by the remote store.
    pub async fn pending_sync(&self) -> Result<i64, AppError> {
        self.repo.pending_outbox().await
    }

    /// Drain the outbox head-first.
    ///
    /// Entries are pushed in strict enqueue order; the drain stops at the
    /// first entry that is still backing off or that fails, so the upsert and
    /// delete sequence of any one book can never be reordered.
    pub async fn flush(&self) -> Result<SyncReport, AppError> {
        let now = Utc::now();
        let mut pushed = 0;

        for entry in self.repo.list_outbox().await? {
            if !is_due(&entry, now) {
                break;
            }
            match self.push_entry(&entry).await {
                Ok(()) => {
                    self.repo.complete_outbox(entry.id).await?;
                    pushed += 1;
                }
                Err(err) => {
                    let attempts = entry.attempts + 1;
                    let next = Utc::now() + backoff(attempts);
                    tracing::warn!(
                        "Push of outbox entry {} (book {}) failed on attempt {}: {}",
                        entry.id,
                        entry.book_id,
                        attempts,
                        err
                    );
                    self.repo
                        .defer_outbox(entry.id, attempts, &err.to_string(), next)
                        .await?;
                    break;
                }
            }
        }

        let pending = self.repo.pending_outbox().await? as usize;
        Ok(SyncReport { pushed, pending })
    }

    /// Drain after a mutation without failing the caller.
    async fn try_flush(&self) {
        match self.flush().await {
            Ok(report) if report.pending > 0 => {
                tracing::warn!("{} sync entries still pending", report.pending)
            }
            Ok(_) => {}
            Err(err) => tracing::warn!("Outbox drain failed: {}", err),
        }
    }

    async fn push_entry(&self, entry: &OutboxEntry) -> Result<(), AppError> {
        match entry.op {
            OutboxOp::Upsert => {
                let book = entry.payload.as_ref().ok_or_else(|| {
                    AppError::Persistence(format!("Outbox entry {} has no payload", entry.id))
                })?;
                self.remote.upsert(book).await
            }
            OutboxOp::Delete => self.remote.delete(entry.book_id).await.map(|_| ()),
        }
    }
}

/// Union the two listings by id.
///
/// All local records first, in storage order, then every remote record whose
/// id is not already present, in remote order. On a collision the local
/// version wins and the remote copy is dropped.
pub fn merge_by_id(local: Vec<Book>, remote: Vec<Book>) -> Vec<Book> {
    let seen: HashSet<BookId> = local.iter().map(|book| book.id).collect();
    let mut merged = local;
    merged.extend(remote.into_iter().filter(|book| !seen.contains(&book.id)));
    merged
}

fn is_due(entry: &OutboxEntry, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(&entry.next_attempt_at) {
        Ok(at) => at.with_timezone(&Utc) <= now,
        // An unreadable timestamp must not wedge the queue head
        Err(_) => true,
    }
}

/// Retry delay after `attempts` failed pushes: 2s, 4s, 8s... capped at 5 min.
fn backoff(attempts: i64) -> chrono::Duration {
    let secs = (1i64 << attempts.clamp(1, 9)).min(300);
    chrono::Duration::seconds(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str) -> Book {
        Book {
            id: BookId(id),
            title: title.to_string(),
            author: "Author".to_string(),
            year: None,
            description: None,
            price: None,
            image: None,
        }
    }

    #[test]
    fn merge_unions_by_id_and_keeps_local_first() {
        let local = vec![book(1, "local one"), book(2, "local two")];
        let remote = vec![book(2, "remote two"), book(3, "remote three")];

        let merged = merge_by_id(local, remote);

        let ids: Vec<i64> = merged.iter().map(|b| b.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        // The colliding id keeps the local record
        assert_eq!(merged[1].title, "local two");
    }

    #[test]
    fn merge_preserves_remote_order_for_remote_only_records() {
        let local = vec![book(10, "a")];
        let remote = vec![book(7, "x"), book(3, "y"), book(10, "dup")];

        let ids: Vec<i64> = merge_by_id(local, remote).iter().map(|b| b.id.0).collect();
        assert_eq!(ids, vec![10, 7, 3]);
    }

    #[test]
    fn merge_of_empty_sides() {
        assert!(merge_by_id(vec![], vec![]).is_empty());
        assert_eq!(merge_by_id(vec![book(1, "a")], vec![]).len(), 1);
        assert_eq!(merge_by_id(vec![], vec![book(1, "a")]).len(), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff(1), chrono::Duration::seconds(2));
        assert_eq!(backoff(2), chrono::Duration::seconds(4));
        assert_eq!(backoff(3), chrono::Duration::seconds(8));
        assert_eq!(backoff(50), chrono::Duration::seconds(300));
    }
}
