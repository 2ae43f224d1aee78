//! In-memory document storage backend for docmap.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and mirrors the document
//! store's write and query semantics, which makes it the store double for tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Store semantics** - Generated `ObjectId` keys, duplicate-key and unique-index failures
//! - **Filter language** - Equality, comparison, element and logical operators
//! - **Update operators** - `$set`, `$unset`, `$inc`, `$push`, `$addToSet`, `$pull`
//!
//! # Quick Start
//!
//! ```ignore
//! use docmap::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Debug, Default, Record)]
//! pub struct User {
//!     pub id: Option<bson::oid::ObjectId>,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocmapResult<()> {
//!     StoreHandle::install(StoreHandle::build(InMemoryStore::builder()).await?);
//!
//!     let users = Adaptor::<User>::from_current("users")?;
//!     users.insert(&User { id: None, name: "Alice".into() }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_memory;

pub mod store;
pub(crate) mod evaluator;
pub(crate) mod update;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
