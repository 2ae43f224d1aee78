//! A store handle bound to one named collection.
//!
//! [`Collection`] exposes the backend primitives without repeating the collection name.
//! It works on raw BSON documents; record mapping happens one level up in the
//! [`Adaptor`](crate::adaptor::Adaptor).
//!
//! # Example
//!
//! ```ignore
//! use docmap::{handle::StoreHandle, options::{FindOptions, WriteOptions}};
//! use bson::doc;
//!
//! let users = handle.collection("users");
//! users.insert(doc! { "name": "Alice" }, WriteOptions::safe()).await?;
//! let count = users.count(doc! {}).await?;
//! ```

use bson::Document;
use futures::TryStreamExt;

use crate::{
    backend::{DocumentStream, StoreBackend},
    error::DocmapResult,
    options::{DeleteOptions, FindOptions, WriteOptions},
    outcome::{DeleteOutcome, InsertOutcome, UpdateOutcome},
};

/// An untyped collection with a reference to a storage backend.
#[derive(Debug)]
pub struct Collection<'a> {
    name: String,
    backend: &'a dyn StoreBackend,
}

impl<'a> Collection<'a> {
    /// Creates a new collection reference (internal use).
    pub(crate) fn new(name: String, backend: &'a dyn StoreBackend) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts one document, letting the store assign `_id` if it is absent.
    pub async fn insert(&self, document: Document, options: WriteOptions) -> DocmapResult<InsertOutcome> {
        self.backend
            .insert_document(&self.name, document, options)
            .await
    }

    /// Applies `update` to the first document matching `filter`.
    pub async fn update_matching(
        &self,
        filter: Document,
        update: Document,
        options: WriteOptions,
    ) -> DocmapResult<UpdateOutcome> {
        self.backend
            .update_matching(&self.name, filter, update, options)
            .await
    }

    /// Deletes every document matching `filter`.
    pub async fn delete_matching(&self, filter: Document, options: DeleteOptions) -> DocmapResult<DeleteOutcome> {
        self.backend
            .delete_matching(&self.name, filter, options)
            .await
    }

    /// Streams every document matching `filter`.
    pub async fn find_matching(&self, filter: Document, options: FindOptions) -> DocmapResult<DocumentStream> {
        self.backend
            .find_matching(&self.name, filter, options)
            .await
    }

    /// Collects every document matching `filter`.
    pub async fn find_all(&self, filter: Document, options: FindOptions) -> DocmapResult<Vec<Document>> {
        self.find_matching(filter, options)
            .await?
            .try_collect()
            .await
    }

    /// Counts the documents matching `filter`.
    pub async fn count(&self, filter: Document) -> DocmapResult<u64> {
        self.backend
            .count_matching(&self.name, filter)
            .await
    }

    /// Creates an index on `field`, optionally enforcing uniqueness.
    pub async fn add_index(&self, field: &str, unique: bool) -> DocmapResult<()> {
        self.backend
            .add_index(&self.name, field, unique)
            .await
    }

    /// Drops this collection and all its documents.
    pub async fn drop(&self) -> DocmapResult<()> {
        self.backend.drop_collection(&self.name).await
    }
}
