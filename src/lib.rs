//! Bookstore Engine
//!
//! Offline-first data layer for a mobile book catalog and cart application.
//! The embedded SQLite store is the durable home of the catalog, user
//! accounts and session; a remote JSON REST collection mirrors the catalog
//! for cross-device sync. Mutations commit locally together with a durable
//! outbox entry and are pushed to the mirror with retry; reads union both
//! stores by book id. The cart is an in-memory working set owned by the
//! session.
//!
//! Screens, navigation and payment are out of scope: they sit on top of this
//! crate.

pub mod auth;
pub mod cart;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod remote;
pub mod sync;

pub use auth::Session;
pub use cart::{Cart, CartLine, Receipt};
pub use config::Config;
pub use db::{init_database, Repository};
pub use errors::AppError;
pub use models::{Book, BookDraft, BookId, NewUser, Role, User};
pub use remote::RemoteCatalog;
pub use sync::{CatalogService, SyncReport};
