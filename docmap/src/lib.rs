//! Main docmap crate: a thin mapping between plain structs and store documents.
//!
//! This crate is the primary entry point for users of docmap. It re-exports the core
//! types from the sub-crates, the `Record` derive, and the available storage backends.
//!
//! # Features
//!
//! - **Record mapping** - `#[derive(Record)]` gives a struct a static field schema
//! - **Identifier handling** - Identifiers are stripped on writes and remapped on reads
//! - **Pass-through operations** - Insert, upsert, update, execute, fetch, find, remove
//! - **Replaceable store handle** - One process-wide handle, swappable for a test double
//!
//! # Quick Start
//!
//! ```ignore
//! use docmap::{prelude::*, memory::InMemoryStore};
//! use docmap::bson::{doc, oid::ObjectId};
//!
//! #[derive(Debug, Default, Record)]
//! pub struct User {
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//!     pub roles: Vec<String>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocmapResult<()> {
//!     // Install an in-memory store as the process-wide handle
//!     StoreHandle::install(StoreHandle::build(InMemoryStore::builder()).await?);
//!
//!     let users = Adaptor::<User>::from_current("users")?;
//!
//!     // The identifier is assigned by the store
//!     let id = users
//!         .insert(&User { id: None, name: "Alice".into(), roles: vec![] })
//!         .await?
//!         .inserted_id;
//!
//!     // Arbitrary update commands are passed through verbatim
//!     users
//!         .execute(doc! { "_id": id.clone() }, doc! { "$push": { "roles": "admin" } }, WriteOptions::new())
//!         .await?;
//!
//!     // Reads remap the primary key onto the identifier field
//!     let alice = users.fetch(doc! { "_id": id }, FindOptions::new()).await?;
//!     println!("{alice:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Reserved field names
//!
//! `_id` belongs to the identifier. A plain field that would map onto it is rejected
//! at compile time:
//!
//! ```compile_fail
//! use docmap::prelude::*;
//!
//! #[derive(Record)]
//! struct Clash {
//!     #[record(id)]
//!     key: String,
//!     #[record(rename = "_id")]
//!     other: String,
//! }
//! ```
//!
//! # Testing
//!
//! Tests swap the process-wide handle for one backed by [`memory::InMemoryStore`] with
//! [`StoreHandle::install`](handle::StoreHandle::install), or pass a handle to
//! [`Adaptor::new`](adaptor::Adaptor::new) directly.
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docmap;

pub mod prelude;

pub use docmap_core::{
    adaptor, backend, collection, error, handle, options, outcome, record, transform,
};
pub use docmap_macros::Record;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmap_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmap_mongodb::{
        MongoDbConfig, MongoDbStore, MongoDbStoreBuilder,
        config::{APP_NAME_VAR, DATABASE_VAR, DEFAULT_URI, URI_VAR},
    };
}
