//! Storage backend abstraction for the adaptor.
//!
//! This module defines the traits a document-store driver must satisfy to sit behind a
//! [`StoreHandle`](crate::handle::StoreHandle).
//!
//! # Overview
//!
//! The [`StoreBackend`] trait exposes the store's CRUD primitives over plain BSON
//! documents: insert one document, update the first document matching a filter, delete
//! every document matching a filter, and stream every document matching a filter.
//! Filters, update commands, projections and sorts are store-native documents passed
//! through verbatim; their semantics belong to the store.
//!
//! Implementations are required to be thread-safe (`Send + Sync`) and the trait is object
//! safe, so a handle can hold any backend as `Arc<dyn StoreBackend>`.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docmap::backend::StoreBackend;
//! use docmap::options::WriteOptions;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! let outcome = backend
//!     .insert_document("users", doc! { "name": "Alice" }, WriteOptions::safe())
//!     .await?;
//! println!("stored as {}", outcome.inserted_id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Document;
use futures::stream::BoxStream;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::DocmapResult,
    options::{DeleteOptions, FindOptions, WriteOptions},
    outcome::{DeleteOutcome, InsertOutcome, UpdateOutcome},
};

/// A lazily realized, ordered sequence of stored documents.
pub type DocumentStream = BoxStream<'static, DocmapResult<Document>>;

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. The handle adds no locking of its own.
///
/// # Error Handling
///
/// A write the store refuses to acknowledge (duplicate key, unique index violation)
/// must be reported as [`DocmapError::Write`](crate::error::DocmapError::Write). Other
/// driver failures are reported as [`DocmapError::Backend`](crate::error::DocmapError::Backend).
/// Filters that match nothing are never errors.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts one document into a collection.
    ///
    /// If the document has no `_id` the store assigns one. The collection is created
    /// automatically if it doesn't exist.
    ///
    /// # Returns
    ///
    /// The store's acknowledgment, including the identifier of the new document.
    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
        options: WriteOptions,
    ) -> DocmapResult<InsertOutcome>;

    /// Applies an update command to the first document matching `filter`.
    ///
    /// When `options.upsert` is set and nothing matches, a new document is created from
    /// the filter's equality fields with the update applied.
    ///
    /// # Returns
    ///
    /// Matched and modified counts, and the created identifier for upserts. A filter
    /// matching nothing yields zero counts rather than an error.
    async fn update_matching(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: WriteOptions,
    ) -> DocmapResult<UpdateOutcome>;

    /// Deletes every document matching `filter`.
    async fn delete_matching(
        &self,
        collection: &str,
        filter: Document,
        options: DeleteOptions,
    ) -> DocmapResult<DeleteOutcome>;

    /// Streams every document matching `filter` in the store's natural order, unless
    /// `options` specifies a sort.
    async fn find_matching(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocmapResult<DocumentStream>;

    /// Counts the documents matching `filter`.
    async fn count_matching(&self, collection: &str, filter: Document) -> DocmapResult<u64>;

    /// Creates an index on a field, optionally enforcing uniqueness.
    ///
    /// Writes violating a unique index fail with a write error.
    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocmapResult<()>;

    /// Drops a collection and all its documents. Dropping a missing collection is a no-op.
    async fn drop_collection(&self, name: &str) -> DocmapResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocmapResult<Vec<String>>;
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend + ?Sized,
{
    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
        options: WriteOptions,
    ) -> DocmapResult<InsertOutcome> {
        (**self)
            .insert_document(collection, document, options)
            .await
    }

    async fn update_matching(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: WriteOptions,
    ) -> DocmapResult<UpdateOutcome> {
        (**self)
            .update_matching(collection, filter, update, options)
            .await
    }

    async fn delete_matching(
        &self,
        collection: &str,
        filter: Document,
        options: DeleteOptions,
    ) -> DocmapResult<DeleteOutcome> {
        (**self)
            .delete_matching(collection, filter, options)
            .await
    }

    async fn find_matching(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocmapResult<DocumentStream> {
        (**self)
            .find_matching(collection, filter, options)
            .await
    }

    async fn count_matching(&self, collection: &str, filter: Document) -> DocmapResult<u64> {
        (**self)
            .count_matching(collection, filter)
            .await
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocmapResult<()> {
        (**self)
            .add_index(collection, field, unique)
            .await
    }

    async fn drop_collection(&self, name: &str) -> DocmapResult<()> {
        (**self).drop_collection(name).await
    }

    async fn list_collections(&self) -> DocmapResult<Vec<String>> {
        (**self).list_collections().await
    }
}

/// Factory trait for creating backend instances asynchronously.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocmapResult<Self::Backend>;
}
