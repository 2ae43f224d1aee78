//! MongoDB backend implementation for docmap.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait. Every
//! primitive is delegated to the official driver unchanged: filters and update commands
//! are passed through verbatim, cursors are exposed as lazily realized streams, and
//! write concerns are mapped onto the driver's acknowledgment levels.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmap = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Errors
//!
//! Writes the server rejects (duplicate keys, validation failures) surface as
//! `DocmapError::Write`; every other driver failure surfaces as `DocmapError::Backend`.
//!
//! # Connection
//!
//! Connection settings come from the builder directly or from a [`MongoDbConfig`],
//! which can be read from the environment or from a JSON file.
//!
//! # Example
//!
//! ```ignore
//! use docmap::{handle::StoreHandle, mongodb::{MongoDbConfig, MongoDbStoreBuilder}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = MongoDbStoreBuilder::from_config(MongoDbConfig::from_env()?);
//!     StoreHandle::install(StoreHandle::build(builder).await?);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_mongodb;

pub mod config;
pub mod store;

pub use config::MongoDbConfig;
pub use store::{MongoDbStore, MongoDbStoreBuilder};
