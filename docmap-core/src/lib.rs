//! A thin struct-to-document mapping layer over schemaless document stores.
//!
//! This crate is the core of the docmap project and provides:
//!
//! - **Records** ([`record`]) - The trait and static schema describing a mapped struct
//! - **Identifier transform** ([`transform`]) - Stripping the identifier on writes, remapping it on reads
//! - **Options and outcomes** ([`options`], [`outcome`]) - Write concerns, upsert flags, projections and driver acknowledgments
//! - **Store backend abstraction** ([`backend`]) - The CRUD primitives every store driver must provide
//! - **Store handle** ([`handle`]) - The shared, replaceable connection to the store
//! - **Collections** ([`collection`]) - A store handle bound to one named collection
//! - **Adaptor** ([`adaptor`]) - Record-level insert, upsert, update, execute, fetch, find and remove
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docmap::{prelude::*, memory::InMemoryStore};
//! use docmap::bson::{doc, oid::ObjectId};
//!
//! #[derive(Debug, Default, Record)]
//! pub struct User {
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//! }
//!
//! let handle = StoreHandle::new(InMemoryStore::new());
//! let users = Adaptor::<User>::new("Users", handle);
//!
//! users.insert(&User { id: None, name: "Alice".into() }).await?;
//! let alice = users.fetch(doc! { "name": "Alice" }, FindOptions::default()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_core;

pub mod adaptor;
pub mod backend;
pub mod collection;
pub mod error;
pub mod handle;
pub mod options;
pub mod outcome;
pub mod record;
pub mod transform;

// Re-exported for code generated by `#[derive(Record)]`.
pub use bson;
