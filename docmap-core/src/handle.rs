//! The shared connection to the document store.
//!
//! A [`StoreHandle`] is a cheaply cloneable reference to one backend. Handles can be
//! passed explicitly to every [`Adaptor`](crate::adaptor::Adaptor), or one handle can be
//! installed as the process-wide default:
//!
//! - [`StoreHandle::install`] replaces the default and returns the previous one
//! - [`StoreHandle::reset`] clears it
//! - [`StoreHandle::current`] returns it, failing if nothing was installed
//! - [`StoreHandle::get_or_try_init`] initializes it on first access
//! - [`StoreHandle::configure`] registers the builder [`StoreHandle::resolve`] uses
//!   to initialize it on first access
//!
//! Tests substitute a double by installing a handle over an in-memory backend.
//!
//! # Example
//!
//! ```ignore
//! use docmap::{handle::StoreHandle, mongodb::{MongoDbConfig, MongoDbStoreBuilder}};
//!
//! StoreHandle::configure(MongoDbStoreBuilder::from_config(MongoDbConfig::from_env()?));
//!
//! // Connects on the first call; later calls share the same handle.
//! let handle = StoreHandle::resolve().await?;
//! ```

use std::{
    future::Future,
    sync::{Arc, LazyLock, Mutex, PoisonError, RwLock},
};

use futures::{FutureExt, future::BoxFuture};
use mea::mutex::Mutex as AsyncMutex;

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Collection,
    error::{DocmapError, DocmapResult},
};

type Initializer = Arc<dyn Fn() -> BoxFuture<'static, DocmapResult<StoreHandle>> + Send + Sync>;

static CURRENT: RwLock<Option<StoreHandle>> = RwLock::new(None);
static INITIALIZER: Mutex<Option<Initializer>> = Mutex::new(None);
// Serializes first-access initialization so concurrent callers build one backend.
static INITIALIZING: LazyLock<AsyncMutex<()>> = LazyLock::new(|| AsyncMutex::new(()));

/// A shared, cloneable reference to a storage backend.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    backend: Arc<dyn StoreBackend>,
}

impl StoreHandle {
    /// Wraps a backend in a new handle.
    pub fn new<B: StoreBackend + 'static>(backend: B) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// Builds a backend and wraps it in a new handle.
    pub async fn build<T>(builder: T) -> DocmapResult<Self>
    where
        T: StoreBackendBuilder,
        T::Backend: 'static,
    {
        Ok(Self::new(builder.build().await?))
    }

    /// Returns the backend behind this handle.
    pub fn backend(&self) -> &dyn StoreBackend {
        &*self.backend
    }

    /// Gets a collection with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a> {
        Collection::new(name.to_string(), &*self.backend)
    }

    /// Returns `true` if both handles share the same backend.
    pub fn same_backend(&self, other: &StoreHandle) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
    }

    /// Returns the process-wide handle.
    ///
    /// # Errors
    ///
    /// Returns [`DocmapError::Initialization`] if no handle has been installed.
    pub fn current() -> DocmapResult<StoreHandle> {
        CURRENT
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| DocmapError::Initialization("no store handle has been installed".into()))
    }

    /// Installs `handle` as the process-wide handle, returning the one it replaces.
    pub fn install(handle: StoreHandle) -> Option<StoreHandle> {
        tracing::debug!("installing process-wide store handle");

        CURRENT
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
    }

    /// Clears the process-wide handle, returning it if one was installed.
    pub fn reset() -> Option<StoreHandle> {
        CURRENT
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Returns the process-wide handle, initializing it with `init` on first access.
    ///
    /// Concurrent first accesses wait for one another, so only one initializer runs at
    /// a time and the losers reuse the winner's handle. A failed initialization leaves
    /// the handle unset.
    pub async fn get_or_try_init<F, Fut>(init: F) -> DocmapResult<StoreHandle>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DocmapResult<StoreHandle>>,
    {
        if let Ok(handle) = Self::current() {
            return Ok(handle);
        }

        let _initializing = INITIALIZING.lock().await;
        if let Ok(handle) = Self::current() {
            return Ok(handle);
        }

        let handle = init().await?;
        let mut current = CURRENT.write().unwrap_or_else(PoisonError::into_inner);

        Ok(current.get_or_insert(handle).clone())
    }

    /// Registers `builder` as the way to create the process-wide handle on first access.
    ///
    /// Nothing is connected until [`StoreHandle::resolve`] runs. Configuring again
    /// replaces the builder but leaves an already initialized handle in place.
    pub fn configure<T>(builder: T)
    where
        T: StoreBackendBuilder + Clone + Send + Sync + 'static,
        T::Backend: 'static,
    {
        let initializer: Initializer = Arc::new(move || {
            StoreHandle::build(builder.clone()).boxed()
        });

        *INITIALIZER.lock().unwrap_or_else(PoisonError::into_inner) = Some(initializer);
    }

    /// Returns the process-wide handle, building it from the configured builder if it
    /// has not been initialized yet.
    ///
    /// # Errors
    ///
    /// Returns [`DocmapError::Initialization`] if no handle is installed and no builder
    /// has been configured, or whatever error building the backend produced.
    pub async fn resolve() -> DocmapResult<StoreHandle> {
        Self::get_or_try_init(|| async {
            let initializer = INITIALIZER
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
                .ok_or_else(|| {
                    DocmapError::Initialization("no store handle has been installed or configured".into())
                })?;

            tracing::info!("initializing process-wide store handle");
            initializer().await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bson::{Bson, Document};
    use futures::StreamExt;

    use super::*;
    use crate::{
        backend::DocumentStream,
        options::{DeleteOptions, FindOptions, WriteOptions},
        outcome::{DeleteOutcome, InsertOutcome, UpdateOutcome},
    };

    #[derive(Debug)]
    struct NullStore;

    #[async_trait]
    impl StoreBackend for NullStore {
        async fn insert_document(&self, _: &str, _: Document, _: WriteOptions) -> DocmapResult<InsertOutcome> {
            Ok(InsertOutcome { inserted_id: Bson::Null })
        }

        async fn update_matching(&self, _: &str, _: Document, _: Document, _: WriteOptions) -> DocmapResult<UpdateOutcome> {
            Ok(UpdateOutcome::default())
        }

        async fn delete_matching(&self, _: &str, _: Document, _: DeleteOptions) -> DocmapResult<DeleteOutcome> {
            Ok(DeleteOutcome::default())
        }

        async fn find_matching(&self, _: &str, _: Document, _: FindOptions) -> DocmapResult<DocumentStream> {
            Ok(futures::stream::empty().boxed())
        }

        async fn count_matching(&self, _: &str, _: Document) -> DocmapResult<u64> {
            Ok(0)
        }

        async fn add_index(&self, _: &str, _: &str, _: bool) -> DocmapResult<()> {
            Ok(())
        }

        async fn drop_collection(&self, _: &str) -> DocmapResult<()> {
            Ok(())
        }

        async fn list_collections(&self) -> DocmapResult<Vec<String>> {
            Ok(vec![])
        }
    }

    // The process-wide handle is shared by every test in this binary, so its whole
    // lifecycle is exercised in one test.
    #[tokio::test]
    async fn process_wide_handle_lifecycle() {
        StoreHandle::reset();
        assert!(matches!(StoreHandle::current(), Err(DocmapError::Initialization(_))));

        let first = StoreHandle::get_or_try_init(|| async { Ok(StoreHandle::new(NullStore)) })
            .await
            .unwrap();
        assert!(StoreHandle::current().unwrap().same_backend(&first));

        // Already initialized: the initializer is not consulted.
        let again = StoreHandle::get_or_try_init(|| async {
            Err(DocmapError::Initialization("must not run".into()))
        })
        .await
        .unwrap();
        assert!(again.same_backend(&first));

        let double = StoreHandle::new(NullStore);
        let replaced = StoreHandle::install(double.clone()).unwrap();
        assert!(replaced.same_backend(&first));
        assert!(StoreHandle::current().unwrap().same_backend(&double));

        assert!(StoreHandle::reset().unwrap().same_backend(&double));
        assert!(StoreHandle::current().is_err());

        let failed = StoreHandle::get_or_try_init(|| async {
            Err(DocmapError::Initialization("unreachable store".into()))
        })
        .await;
        assert!(failed.is_err());
        assert!(StoreHandle::current().is_err());
    }

    #[tokio::test]
    async fn collections_share_the_handle_backend() {
        let handle = StoreHandle::new(NullStore);
        let collection = handle.collection("events");

        assert_eq!(collection.name(), "events");
        assert_eq!(collection.count(bson::doc! {}).await.unwrap(), 0);
        assert!(collection.find_all(bson::doc! {}, FindOptions::default()).await.unwrap().is_empty());
    }
}
