//! Convenient re-exports of commonly used types from docmap.
//!
//! ```ignore
//! use docmap::prelude::*;
//! ```
//!
//! This provides access to:
//! - The `Record` trait and its derive
//! - Adaptors, selectors and the store handle
//! - Write, find and delete options with their outcomes
//! - Backend traits and error types

pub use docmap_core::{
    adaptor::{Adaptor, RecordStream, Selector},
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder},
    collection::Collection,
    error::{DocmapError, DocmapResult},
    handle::StoreHandle,
    options::{DeleteOptions, FindOptions, WriteConcern, WriteOptions},
    outcome::{DeleteOutcome, InsertOutcome, UpdateOutcome},
    record::{FieldDescriptor, Record, RecordSchema},
};
pub use docmap_macros::Record;
