//! In-memory storage implementation for document stores.
//!
//! This module provides a small in-memory backend that keeps each collection as an
//! insertion-ordered list of BSON documents behind an async-aware read-write lock. It
//! follows the document store's write semantics closely enough to stand in for it in
//! tests: generated `ObjectId` primary keys, duplicate-key failures, unique indexes,
//! single-document updates with upsert, and projected, sorted, paged reads.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};

use docmap_core::{
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder},
    error::{DocmapError, DocmapResult},
    options::{DeleteOptions, FindOptions, WriteConcern, WriteOptions},
    outcome::{DeleteOutcome, InsertOutcome, UpdateOutcome},
    transform::ID_KEY,
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator, lookup, values_equal},
    update::{apply_update, seed_from_filter},
};

type StoreMap = HashMap<String, StoredCollection>;


#[derive(Default, Debug)]
struct StoredCollection {
    documents: Vec<Document>,
    unique_fields: Vec<String>,
}

impl StoredCollection {
    fn position(&self, filter: &Document) -> DocmapResult<Option<usize>> {
        for (index, document) in self.documents.iter().enumerate() {
            if DocumentEvaluator::new(document).evaluate(filter)? {
                return Ok(Some(index));
            }
        }

        Ok(None)
    }

    /// Fails if `candidate` would collide with another document on the primary key or
    /// on a unique field. The document at `skip` (the one being replaced) is ignored.
    fn check_keys(&self, collection: &str, candidate: &Document, skip: Option<usize>) -> DocmapResult<()> {
        let others = self.documents
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != skip)
            .map(|(_, document)| document);

        for other in others {
            for field in std::iter::once(ID_KEY).chain(self.unique_fields.iter().map(String::as_str)) {
                let left = lookup(candidate, field).unwrap_or(&Bson::Null);
                let right = lookup(other, field).unwrap_or(&Bson::Null);

                if values_equal(left, right) {
                    return Err(DocmapError::Write(format!(
                        "E11000 duplicate key error collection: {collection} index: {field} dup key: {{ {field}: {left} }}"
                    )));
                }
            }
        }

        Ok(())
    }
}


/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait entirely in memory. Documents are
/// kept per collection in insertion order, which is the natural order reads return them
/// in unless a sort is requested.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Every read and write scans the collection, and unique indexes are checked by a
/// scan as well. It is meant for tests and small datasets.
///
/// # Example
///
/// ```ignore
/// use docmap_memory::InMemoryStore;
/// use docmap::{backend::StoreBackend, options::{FindOptions, WriteOptions}};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
///
/// let outcome = store.insert_document("users", doc! { "name": "Alice" }, WriteOptions::safe()).await?;
/// let count = store.count_matching("users", doc! { "_id": outcome.inserted_id }).await?;
/// assert_eq!(count, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> ordered documents and index definitions
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use docmap::handle::StoreHandle;
    /// use docmap_memory::InMemoryStore;
    ///
    /// let handle = StoreHandle::build(InMemoryStore::builder()).await?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

/// Unacknowledged writes never report failures back to the caller.
fn acknowledge<T>(result: DocmapResult<T>, write_concern: Option<WriteConcern>, fallback: T) -> DocmapResult<T> {
    match (result, write_concern) {
        (Err(DocmapError::Write(message)), Some(WriteConcern::Unacknowledged)) => {
            tracing::warn!(%message, "unacknowledged write failed");
            Ok(fallback)
        }
        (result, _) => result,
    }
}

fn project(document: Document, projection: &Document) -> Document {
    let include = |value: &Bson| match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    };

    let keep_id = projection.get(ID_KEY).map(include).unwrap_or(true);
    // `{ _id: 1 }` on its own is an inclusion projection of just the primary key.
    let inclusive = projection
        .iter()
        .any(|(field, value)| field != ID_KEY && include(value))
        || (projection.len() == 1 && projection.contains_key(ID_KEY) && keep_id);

    document
        .into_iter()
        .filter(|(field, _)| {
            if field == ID_KEY {
                return keep_id;
            }

            match projection.get(field) {
                Some(value) => include(value),
                None => !inclusive,
            }
        })
        .collect()
}

fn compare_by(sort: &Document, left: &Document, right: &Document) -> Ordering {
    for (field, direction) in sort {
        let l = lookup(left, field).map(Comparable::from).unwrap_or(Comparable::Null);
        let r = lookup(right, field).map(Comparable::from).unwrap_or(Comparable::Null);

        let descending = match direction {
            Bson::Int32(n) => *n < 0,
            Bson::Int64(n) => *n < 0,
            Bson::Double(n) => *n < 0.0,
            _ => false,
        };

        let ordering = match descending {
            true => r.sort_cmp(&l),
            false => l.sort_cmp(&r),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_document(
        &self,
        collection: &str,
        mut document: Document,
        options: WriteOptions,
    ) -> DocmapResult<InsertOutcome> {
        let inserted_id = match document.remove(ID_KEY) {
            Some(id) => id,
            None => Bson::ObjectId(ObjectId::new()),
        };

        let mut stored = Document::new();
        stored.insert(ID_KEY, inserted_id.clone());
        stored.extend(document);

        let mut store = self.store.write().await;
        let state = store
            .entry(collection.to_string())
            .or_default();

        let result = state
            .check_keys(collection, &stored, None)
            .map(|_| state.documents.push(stored));

        acknowledge(result, options.write_concern, ())?;

        Ok(InsertOutcome { inserted_id })
    }

    async fn update_matching(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: WriteOptions,
    ) -> DocmapResult<UpdateOutcome> {
        let mut store = self.store.write().await;

        let position = match store.get(collection) {
            Some(state) => state.position(&filter)?,
            None => None,
        };

        let result = match position {
            Some(index) => {
                let state = store
                    .get_mut(collection)
                    .ok_or_else(|| DocmapError::Backend(format!("collection {collection} disappeared")))?;

                let mut updated = state.documents[index].clone();
                apply_update(&mut updated, &update, false)?;

                let modified = updated != state.documents[index];
                state
                    .check_keys(collection, &updated, Some(index))
                    .map(|_| {
                        state.documents[index] = updated;

                        UpdateOutcome {
                            matched_count: 1,
                            modified_count: modified as u64,
                            upserted_id: None,
                        }
                    })
            }
            None if options.is_upsert() => {
                let mut created = seed_from_filter(&filter)?;
                apply_update(&mut created, &update, true)?;

                let upserted_id = match created.remove(ID_KEY) {
                    Some(id) => id,
                    None => Bson::ObjectId(ObjectId::new()),
                };

                let mut stored = Document::new();
                stored.insert(ID_KEY, upserted_id.clone());
                stored.extend(created);

                let state = store
                    .entry(collection.to_string())
                    .or_default();

                state
                    .check_keys(collection, &stored, None)
                    .map(|_| {
                        state.documents.push(stored);

                        UpdateOutcome {
                            matched_count: 0,
                            modified_count: 0,
                            upserted_id: Some(upserted_id),
                        }
                    })
            }
            None => Ok(UpdateOutcome::default()),
        };

        acknowledge(result, options.write_concern, UpdateOutcome::default())
    }

    async fn delete_matching(
        &self,
        collection: &str,
        filter: Document,
        _options: DeleteOptions,
    ) -> DocmapResult<DeleteOutcome> {
        let mut store = self.store.write().await;
        let Some(state) = store.get_mut(collection) else {
            return Ok(DeleteOutcome::default());
        };

        let mut kept = Vec::with_capacity(state.documents.len());
        for document in &state.documents {
            if !DocumentEvaluator::new(document).evaluate(&filter)? {
                kept.push(document.clone());
            }
        }

        let deleted_count = (state.documents.len() - kept.len()) as u64;
        state.documents = kept;

        Ok(DeleteOutcome { deleted_count })
    }

    async fn find_matching(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocmapResult<DocumentStream> {
        let store = self.store.read().await;
        let Some(state) = store.get(collection) else {
            return Ok(stream::empty().boxed());
        };

        let mut documents = DocumentEvaluator::filter_documents(&state.documents, &filter)?;

        if let Some(sort) = &options.sort {
            documents.sort_by(|a, b| compare_by(sort, a, b));
        }

        // A limit of zero means no limit; negative limits are treated as their magnitude.
        let limit = match options.limit.map(i64::unsigned_abs) {
            None | Some(0) => usize::MAX,
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        };
        let skip = usize::try_from(options.skip.unwrap_or(0)).unwrap_or(usize::MAX);

        let documents = documents
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .map(|document| match &options.projection {
                Some(projection) => project(document, projection),
                None => document,
            })
            .map(Ok)
            .collect::<Vec<_>>();

        Ok(stream::iter(documents).boxed())
    }

    async fn count_matching(&self, collection: &str, filter: Document) -> DocmapResult<u64> {
        let store = self.store.read().await;

        match store.get(collection) {
            Some(state) => Ok(DocumentEvaluator::filter_documents(&state.documents, &filter)?.len() as u64),
            None => Ok(0),
        }
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocmapResult<()> {
        if !unique {
            // Plain indexes only affect performance, which a linear scan does not have.
            return Ok(());
        }

        let mut store = self.store.write().await;
        let state = store
            .entry(collection.to_string())
            .or_default();

        if state.unique_fields.iter().any(|existing| existing == field) {
            return Ok(());
        }

        for (index, earlier) in state.documents.iter().enumerate() {
            let value = lookup(earlier, field).unwrap_or(&Bson::Null);
            let duplicated = state.documents[index + 1..]
                .iter()
                .any(|later| values_equal(value, lookup(later, field).unwrap_or(&Bson::Null)));

            if duplicated {
                return Err(DocmapError::Backend(format!(
                    "cannot build unique index on {collection}.{field}: duplicate key {value}"
                )));
            }
        }

        state.unique_fields.push(field.to_string());

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocmapResult<()> {
        self.store
            .write()
            .await
            .remove(name);

        Ok(())
    }

    async fn list_collections(&self) -> DocmapResult<Vec<String>> {
        let mut names = self.store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();

        Ok(names)
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docmap_memory::InMemoryStore;
/// use docmap::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new, empty [`InMemoryStore`].
    async fn build(self) -> DocmapResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use futures::TryStreamExt;

    use super::*;

    async fn all(store: &InMemoryStore, collection: &str, options: FindOptions) -> Vec<Document> {
        store
            .find_matching(collection, doc! {}, options)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_generates_ids_and_rejects_duplicates() {
        let store = InMemoryStore::new();

        let generated = store
            .insert_document("users", doc! { "name": "a" }, WriteOptions::safe())
            .await
            .unwrap();
        assert!(matches!(generated.inserted_id, Bson::ObjectId(_)));

        store
            .insert_document("users", doc! { "_id": 7, "name": "b" }, WriteOptions::safe())
            .await
            .unwrap();

        let duplicate = store
            .insert_document("users", doc! { "_id": 7, "name": "c" }, WriteOptions::safe())
            .await;
        assert!(matches!(duplicate, Err(DocmapError::Write(_))));

        let names = all(&store, "users", FindOptions::new())
            .await
            .into_iter()
            .map(|d| d.get_str("name").unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["a", "b"]);
    }

    #[tokio::test]
    async fn unacknowledged_writes_swallow_failures() {
        let store = InMemoryStore::new();
        let options = WriteOptions::new().write_concern(WriteConcern::Unacknowledged);

        store.insert_document("c", doc! { "_id": 1 }, options.clone()).await.unwrap();
        store.insert_document("c", doc! { "_id": 1 }, options).await.unwrap();

        assert_eq!(store.count_matching("c", doc! {}).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unique_indexes_are_enforced() {
        let store = InMemoryStore::new();
        store.add_index("users", "email", true).await.unwrap();

        store.insert_document("users", doc! { "email": "a@x" }, WriteOptions::safe()).await.unwrap();
        let second = store.insert_document("users", doc! { "email": "b@x" }, WriteOptions::safe()).await.unwrap();

        let clash = store
            .update_matching(
                "users",
                doc! { "_id": second.inserted_id },
                doc! { "$set": { "email": "a@x" } },
                WriteOptions::safe(),
            )
            .await;
        assert!(matches!(clash, Err(DocmapError::Write(_))));

        store.insert_document("dupes", doc! { "k": 1 }, WriteOptions::safe()).await.unwrap();
        store.insert_document("dupes", doc! { "k": 1 }, WriteOptions::safe()).await.unwrap();
        assert!(store.add_index("dupes", "k", true).await.is_err());
    }

    #[tokio::test]
    async fn update_touches_first_match_and_reports_modification() {
        let store = InMemoryStore::new();
        for n in [1, 2, 3] {
            store.insert_document("n", doc! { "n": n, "odd": n % 2 == 1 }, WriteOptions::safe()).await.unwrap();
        }

        let outcome = store
            .update_matching("n", doc! { "odd": true }, doc! { "$inc": { "n": 10 } }, WriteOptions::safe())
            .await
            .unwrap();
        assert_eq!((outcome.matched_count, outcome.modified_count), (1, 1));

        let unchanged = store
            .update_matching("n", doc! { "n": 2 }, doc! { "$set": { "n": 2 } }, WriteOptions::safe())
            .await
            .unwrap();
        assert_eq!((unchanged.matched_count, unchanged.modified_count), (1, 0));

        let missing = store
            .update_matching("n", doc! { "n": 99 }, doc! { "$set": { "x": 1 } }, WriteOptions::safe())
            .await
            .unwrap();
        assert_eq!(missing, UpdateOutcome::default());

        let values = all(&store, "n", FindOptions::new())
            .await
            .into_iter()
            .map(|d| d.get_i32("n").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(values, [11, 2, 3]);
    }

    #[tokio::test]
    async fn upsert_seeds_from_the_filter() {
        let store = InMemoryStore::new();

        let outcome = store
            .update_matching(
                "people",
                doc! { "name": "Ann", "age": { "$gt": 1 } },
                doc! { "$set": { "city": "Oslo" } },
                WriteOptions::safe().upsert(true),
            )
            .await
            .unwrap();
        assert!(outcome.was_upserted());

        let documents = all(&store, "people", FindOptions::new()).await;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].get_str("name").unwrap(), "Ann");
        assert_eq!(documents[0].get_str("city").unwrap(), "Oslo");
        assert!(!documents[0].contains_key("age"));
        assert_eq!(documents[0].get(ID_KEY), outcome.upserted_id.as_ref());
    }

    #[tokio::test]
    async fn set_on_insert_only_fires_for_upserted_documents() {
        let store = InMemoryStore::new();
        let update = doc! { "$inc": { "visits": 1 }, "$setOnInsert": { "first": true } };

        for _ in 0..2 {
            store
                .update_matching("visits", doc! { "page": "home" }, update.clone(), WriteOptions::safe().upsert(true))
                .await
                .unwrap();
        }

        let mut documents = all(&store, "visits", FindOptions::new()).await;
        assert_eq!(documents.len(), 1);
        documents[0].remove(ID_KEY);
        assert_eq!(documents[0], doc! { "page": "home", "visits": 2, "first": true });
    }

    #[tokio::test]
    async fn identifier_only_projection_keeps_just_the_identifier() {
        let store = InMemoryStore::new();
        store
            .insert_document("p", doc! { "_id": 7, "name": "a", "age": 1 }, WriteOptions::safe())
            .await
            .unwrap();

        let only_id = all(&store, "p", FindOptions::new().projection(doc! { "_id": 1 })).await;
        assert_eq!(only_id, vec![doc! { "_id": 7 }]);

        let without_id = all(&store, "p", FindOptions::new().projection(doc! { "_id": 0 })).await;
        assert_eq!(without_id, vec![doc! { "name": "a", "age": 1 }]);
    }

    #[tokio::test]
    async fn find_sorts_pages_and_projects() {
        let store = InMemoryStore::new();
        for (name, age) in [("c", 30), ("a", 20), ("b", 40)] {
            store.insert_document("p", doc! { "name": name, "age": age }, WriteOptions::safe()).await.unwrap();
        }

        let documents = all(
            &store,
            "p",
            FindOptions::new()
                .sort(doc! { "age": -1 })
                .skip(1)
                .limit(1)
                .projection(doc! { "name": 1, "_id": 0 }),
        )
        .await;

        assert_eq!(documents, vec![doc! { "name": "c" }]);
        assert!(all(&store, "nothing", FindOptions::new()).await.is_empty());
    }

    #[tokio::test]
    async fn delete_count_and_collections() {
        let store = InMemoryStore::new();
        for n in 0..4 {
            store.insert_document("b", doc! { "n": n }, WriteOptions::safe()).await.unwrap();
        }
        store.insert_document("a", doc! {}, WriteOptions::safe()).await.unwrap();

        let deleted = store
            .delete_matching("b", doc! { "n": { "$gte": 2 } }, DeleteOptions::new())
            .await
            .unwrap();
        assert_eq!(deleted.deleted_count, 2);
        assert_eq!(store.count_matching("b", doc! {}).await.unwrap(), 2);
        assert_eq!(store.list_collections().await.unwrap(), ["a", "b"]);

        store.drop_collection("b").await.unwrap();
        store.drop_collection("b").await.unwrap();
        assert_eq!(store.list_collections().await.unwrap(), ["a"]);
    }
}
