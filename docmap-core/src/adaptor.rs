//! Record-level access to one collection.
//!
//! An [`Adaptor`] wraps one named collection and one [`Record`] type. Every operation is
//! a direct pass-through to the store primitives, with the identifier transform from
//! [`transform`](crate::transform) applied on the way in and on the way out:
//!
//! - writes never carry the identifier in their field payload
//! - reads are projected onto the declared fields and rebuilt into records
//! - every write defaults to acknowledged durability
//!
//! # Example
//!
//! ```ignore
//! use docmap::{prelude::*, memory::InMemoryStore};
//! use docmap::bson::{doc, oid::ObjectId};
//!
//! #[derive(Debug, Default, Record)]
//! pub struct Post {
//!     pub id: Option<ObjectId>,
//!     pub title: String,
//!     pub tags: Vec<String>,
//! }
//!
//! StoreHandle::configure(InMemoryStore::builder());
//! let posts = Adaptor::<Post>::connect("posts").await?;
//! let id = posts.insert(&post).await?.inserted_id;
//! posts.execute(doc! { "_id": id }, doc! { "$push": { "tags": "rust" } }, WriteOptions::new()).await?;
//! let post = posts.fetch(doc! { "_id": id }, FindOptions::new()).await?;
//! ```

use bson::{Document, doc};
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use std::marker::PhantomData;

use crate::{
    error::DocmapResult,
    handle::StoreHandle,
    options::{DeleteOptions, FindOptions, WriteOptions},
    outcome::{DeleteOutcome, InsertOutcome, UpdateOutcome},
    record::Record,
    transform::{build_record, identifier_filter, projection, strip_identifier},
};

/// A lazily realized, ordered sequence of reconstructed records.
pub type RecordStream<R> = BoxStream<'static, DocmapResult<R>>;

/// What an [`Adaptor::execute`] command applies to: a literal filter, or the stored
/// document of a record (matched by identifier).
#[derive(Debug)]
pub enum Selector<'a, R> {
    Query(Document),
    Record(&'a R),
}

impl<'a, R: Record> Selector<'a, R> {
    /// Resolves the selector into a filter document.
    pub fn into_filter(self) -> DocmapResult<Document> {
        match self {
            Selector::Query(query) => Ok(query),
            Selector::Record(record) => identifier_filter(record),
        }
    }
}

impl<'a, R> From<Document> for Selector<'a, R> {
    fn from(query: Document) -> Self {
        Selector::Query(query)
    }
}

impl<'a, R: Record> From<&'a R> for Selector<'a, R> {
    fn from(record: &'a R) -> Self {
        Selector::Record(record)
    }
}

/// Maps records of type `R` onto the documents of one collection.
///
/// The adaptor is stateless apart from its collection name and store handle: it caches
/// no documents and holds no transaction state, so it is cheap to clone and share.
#[derive(Debug)]
pub struct Adaptor<R: Record> {
    collection: String,
    handle: StoreHandle,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Adaptor<R> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            handle: self.handle.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Adaptor<R> {
    /// Creates an adaptor over the collection `name` (lowercased) on `handle`.
    pub fn new(name: &str, handle: StoreHandle) -> Self {
        Self {
            collection: name.to_lowercase(),
            handle,
            _record: PhantomData,
        }
    }

    /// Creates an adaptor over the collection `name` on the process-wide store handle.
    ///
    /// # Errors
    ///
    /// Returns an initialization error if no handle has been installed.
    pub fn from_current(name: &str) -> DocmapResult<Self> {
        Ok(Self::new(name, StoreHandle::current()?))
    }

    /// Creates an adaptor over the collection `name` on the process-wide store handle,
    /// initializing the handle from the configured builder on first access.
    ///
    /// # Errors
    ///
    /// Returns an initialization error if no handle is installed and none can be built.
    /// See [`StoreHandle::resolve`].
    pub async fn connect(name: &str) -> DocmapResult<Self> {
        Ok(Self::new(name, StoreHandle::resolve().await?))
    }

    /// Returns the name of the wrapped collection.
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Returns the store handle this adaptor writes through.
    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    /// Inserts `record` as a new document.
    ///
    /// The identifier is stripped, so the store always assigns a fresh one, which is
    /// returned in the outcome. The write is acknowledged.
    ///
    /// # Errors
    ///
    /// Returns a write error if the store rejects the document.
    pub async fn insert(&self, record: &R) -> DocmapResult<InsertOutcome> {
        let outcome = self.handle
            .collection(&self.collection)
            .insert(strip_identifier(record)?, WriteOptions::safe())
            .await?;

        tracing::debug!(
            collection = %self.collection,
            inserted_id = %outcome.inserted_id,
            "inserted record"
        );

        Ok(outcome)
    }

    /// Sets the record's fields on the document with the record's identifier, creating
    /// it if it does not exist.
    pub async fn upsert(&self, record: &R) -> DocmapResult<UpdateOutcome> {
        self.upsert_matching(record, identifier_filter(record)?).await
    }

    /// Sets the record's fields on the first document matching `query`, creating it if
    /// nothing matches.
    pub async fn upsert_matching(&self, record: &R, query: Document) -> DocmapResult<UpdateOutcome> {
        self.set_fields(record, query, true).await
    }

    /// Sets the record's fields on the document with the record's identifier.
    ///
    /// A missing document is reported as a zero matched count, not an error.
    pub async fn update(&self, record: &R) -> DocmapResult<UpdateOutcome> {
        self.update_matching(record, identifier_filter(record)?).await
    }

    /// Sets the record's fields on the first document matching `query`.
    pub async fn update_matching(&self, record: &R, query: Document) -> DocmapResult<UpdateOutcome> {
        self.set_fields(record, query, false).await
    }

    /// Applies a store-native update `command` verbatim to the first document selected by
    /// `target`.
    ///
    /// The defaults (acknowledged, no upsert) are overridden by anything set in
    /// `options`.
    pub async fn execute<'a>(
        &self,
        target: impl Into<Selector<'a, R>>,
        command: Document,
        options: WriteOptions,
    ) -> DocmapResult<UpdateOutcome> {
        let filter = target.into().into_filter()?;
        let options = WriteOptions::safe()
            .upsert(false)
            .merge(options);

        let outcome = self.handle
            .collection(&self.collection)
            .update_matching(filter, command, options)
            .await?;

        tracing::debug!(
            collection = %self.collection,
            matched = outcome.matched_count,
            modified = outcome.modified_count,
            upserted = outcome.was_upserted(),
            "executed update command"
        );

        Ok(outcome)
    }

    /// Fetches the first record matching `selector`, or `None` if nothing matches.
    pub async fn fetch(&self, selector: Document, options: FindOptions) -> DocmapResult<Option<R>> {
        let options = options.limit(1);

        self.find(selector, options)
            .await?
            .next()
            .await
            .transpose()
    }

    /// Streams every record matching `selector`, in the store's natural order unless
    /// `options` sorts.
    ///
    /// Documents are projected onto the declared fields (unless `options` carries its
    /// own projection) and rebuilt lazily as the stream is polled.
    pub async fn find(&self, selector: Document, options: FindOptions) -> DocmapResult<RecordStream<R>> {
        let options = FindOptions::new()
            .projection(projection::<R>())
            .merge(options);

        tracing::debug!(collection = %self.collection, "finding records");

        Ok(self.handle
            .collection(&self.collection)
            .find_matching(selector, options)
            .await?
            .map(|document| document.and_then(build_record::<R>))
            .boxed())
    }

    /// Collects every record matching `selector`.
    pub async fn find_all(&self, selector: Document, options: FindOptions) -> DocmapResult<Vec<R>> {
        self.find(selector, options)
            .await?
            .try_collect()
            .await
    }

    /// Deletes every document matching `selector`.
    pub async fn remove(&self, selector: Document, options: DeleteOptions) -> DocmapResult<DeleteOutcome> {
        let outcome = self.handle
            .collection(&self.collection)
            .delete_matching(selector, options)
            .await?;

        tracing::debug!(
            collection = %self.collection,
            deleted = outcome.deleted_count,
            "removed documents"
        );

        Ok(outcome)
    }

    /// Counts the documents matching `selector`.
    pub async fn count(&self, selector: Document) -> DocmapResult<u64> {
        self.handle
            .collection(&self.collection)
            .count(selector)
            .await
    }

    async fn set_fields(&self, record: &R, query: Document, upsert: bool) -> DocmapResult<UpdateOutcome> {
        let outcome = self.handle
            .collection(&self.collection)
            .update_matching(
                query,
                doc! { "$set": strip_identifier(record)? },
                WriteOptions::safe().upsert(upsert),
            )
            .await?;

        tracing::debug!(
            collection = %self.collection,
            upsert,
            matched = outcome.matched_count,
            modified = outcome.modified_count,
            upserted = outcome.was_upserted(),
            "set record fields"
        );

        Ok(outcome)
    }
}
