//! Database repository for the local store.
//!
//! Catalog mutations commit the row change and the matching outbox entry in
//! one transaction, so a failed local write never leaves anything queued for
//! the remote mirror.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Book, BookDraft, BookId, NewUser, Role, User};

/// Key of the single persisted session entry.
const SESSION_KEY: &str = "current_user";

/// Pending remote operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxOp {
    /// Push the payload book, creating or replacing the remote record
    Upsert,
    /// Remove the remote record if it exists
    Delete,
}

impl OutboxOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxOp::Upsert => "upsert",
            OutboxOp::Delete => "delete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "upsert" => Some(OutboxOp::Upsert),
            "delete" => Some(OutboxOp::Delete),
            _ => None,
        }
    }
}

/// A queued remote mutation, durable until acknowledged.
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub id: i64,
    pub op: OutboxOp,
    pub book_id: BookId,
    /// Full record for upserts; absent for deletes
    pub payload: Option<Book>,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub next_attempt_at: String,
    pub created_at: String,
}

/// Database repository for all local data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the underlying pool. Later operations fail with a persistence error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ==================== BOOK OPERATIONS ====================

    /// Insert a new book and enqueue its remote upsert.
    ///
    /// Returns the record with its freshly assigned id.
    pub async fn create_book(&self, draft: &BookDraft) -> Result<Book, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO books (title, author, year, description, price, image) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(draft.year)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.image)
        .execute(&mut *tx)
        .await?;

        let book = Book::from_draft(BookId(result.last_insert_rowid()), draft);
        enqueue_outbox(&mut tx, OutboxOp::Upsert, book.id, Some(&book)).await?;

        tx.commit().await?;

        tracing::info!("Book created, id: {}", book.id);
        Ok(book)
    }

    /// Get a book by id.
    pub async fn get_book(&self, id: BookId) -> Result<Option<Book>, AppError> {
        let row = sqlx::query(
            "SELECT id, title, author, year, description, price, image FROM books WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(book_from_row))
    }

    /// List all books in storage order.
    pub async fn list_books(&self) -> Result<Vec<Book>, AppError> {
        let rows =
            sqlx::query("SELECT id, title, author, year, description, price, image FROM books")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.iter().map(book_from_row).collect())
    }

    /// Replace a book's fields and enqueue the remote upsert.
    ///
    /// Succeeds even when the id has no local row: the merged catalog can show
    /// remote-only records, and their edits still have to reach the mirror.
    pub async fn update_book(&self, id: BookId, draft: &BookDraft) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"UPDATE books SET
                title = ?, author = ?, year = ?, description = ?, price = ?, image = ?
            WHERE id = ?"#,
        )
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(draft.year)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.image)
        .bind(id.0)
        .execute(&mut *tx)
        .await?;

        let book = Book::from_draft(id, draft);
        enqueue_outbox(&mut tx, OutboxOp::Upsert, id, Some(&book)).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a book and enqueue the remote delete.
    ///
    /// Returns the number of local rows removed (0 or 1). The delete is queued
    /// even at zero rows, for records only the mirror holds.
    pub async fn delete_book(&self, id: BookId) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        enqueue_outbox(&mut tx, OutboxOp::Delete, id, None).await?;

        tx.commit().await?;

        tracing::info!("Book {} deleted, rows removed: {}", id, result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Insert a record fetched from the remote mirror, keeping its id.
    ///
    /// Ignored when the id already exists locally, and never queued back to
    /// the mirror. Returns whether a row was inserted.
    pub async fn import_book(&self, book: &Book) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO books (id, title, author, year, description, price, image) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(book.id.0)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .bind(&book.description)
        .bind(book.price)
        .bind(&book.image)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // ==================== USER OPERATIONS ====================

    /// Create a new account.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (username, password, role, first_name, last_name, phone_number) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(new_user.role.as_str())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.phone_number)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!("User created, id: {}", id);

        Ok(User {
            id,
            username: new_user.username.clone(),
            role: new_user.role,
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            phone_number: new_user.phone_number.clone(),
        })
    }

    /// Look up an account and its stored password by username.
    pub async fn find_user_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, password, role, first_name, last_name, phone_number FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let password: String = row.get("password");
            (user_from_row(&row), password)
        }))
    }

    // ==================== SESSION OPERATIONS ====================

    /// Persist the authenticated identity.
    pub async fn save_session(&self, user: &User) -> Result<(), AppError> {
        let value = serde_json::to_string(user)?;
        sqlx::query("INSERT OR REPLACE INTO session (key, value) VALUES (?, ?)")
            .bind(SESSION_KEY)
            .bind(&value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Read the persisted identity, if any.
    pub async fn load_session(&self) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT value FROM session WHERE key = ?")
            .bind(SESSION_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let value: String = row.get("value");
                Ok(Some(serde_json::from_str(&value)?))
            }
            None => Ok(None),
        }
    }

    /// Drop the persisted identity.
    pub async fn clear_session(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM session WHERE key = ?")
            .bind(SESSION_KEY)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== OUTBOX OPERATIONS ====================

    /// All queued entries, in enqueue order.
    pub async fn list_outbox(&self) -> Result<Vec<OutboxEntry>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, op, book_id, payload, attempts, last_error, next_attempt_at, created_at
               FROM sync_outbox ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(outbox_from_row).collect()
    }

    /// Remove an acknowledged entry.
    pub async fn complete_outbox(&self, entry_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sync_outbox WHERE id = ?")
            .bind(entry_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a failed push and when to try again.
    pub async fn defer_outbox(
        &self,
        entry_id: i64,
        attempts: i64,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sync_outbox SET attempts = ?, last_error = ?, next_attempt_at = ? WHERE id = ?",
        )
        .bind(attempts)
        .bind(error)
        .bind(next_attempt_at.to_rfc3339())
        .bind(entry_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Count of queued entries, due or not.
    pub async fn pending_outbox(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS pending FROM sync_outbox")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("pending"))
    }
}

/// Queue a remote mutation inside the caller's transaction.
async fn enqueue_outbox(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    op: OutboxOp,
    book_id: BookId,
    payload: Option<&Book>,
) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    let payload_json = payload.map(serde_json::to_string).transpose()?;

    sqlx::query(
        "INSERT INTO sync_outbox (op, book_id, payload, attempts, next_attempt_at, created_at) VALUES (?, ?, ?, 0, ?, ?)",
    )
    .bind(op.as_str())
    .bind(book_id.0)
    .bind(&payload_json)
    .bind(&now)
    .bind(&now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// Helper functions for row conversion

fn book_from_row(row: &sqlx::sqlite::SqliteRow) -> Book {
    Book {
        id: BookId(row.get("id")),
        title: row.get("title"),
        author: row.get("author"),
        year: row.get("year"),
        description: row.get("description"),
        price: row.get("price"),
        image: row.get("image"),
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        username: row.get("username"),
        // Unknown roles fall back to the least-privileged one
        role: Role::from_str(&role).unwrap_or(Role::Client),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        phone_number: row.get("phone_number"),
    }
}

fn outbox_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<OutboxEntry, AppError> {
    let op: String = row.get("op");
    let op = OutboxOp::from_str(&op)
        .ok_or_else(|| AppError::Persistence(format!("Unknown outbox op: {}", op)))?;

    let payload: Option<String> = row.get("payload");
    let payload = payload
        .as_deref()
        .map(serde_json::from_str::<Book>)
        .transpose()?;

    Ok(OutboxEntry {
        id: row.get("id"),
        op,
        book_id: BookId(row.get("book_id")),
        payload,
        attempts: row.get("attempts"),
        last_error: row.get("last_error"),
        next_attempt_at: row.get("next_attempt_at"),
        created_at: row.get("created_at"),
    })
}
