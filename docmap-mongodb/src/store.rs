use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use bson::Document;
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    error::{Error as MongoError, ErrorKind},
    options::{
        ClientOptions, FindOptions as MongoFindOptions, IndexOptions,
        WriteConcern as MongoWriteConcern,
    },
};
use docmap_core::{
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder},
    error::{DocmapError, DocmapResult},
    options::{DeleteOptions, FindOptions, WriteConcern, WriteOptions},
    outcome::{DeleteOutcome, InsertOutcome, UpdateOutcome},
};

use crate::config::MongoDbConfig;


/// Translates a driver error, keeping rejected writes distinguishable from everything else.
pub(crate) fn map_error(error: MongoError) -> DocmapError {
    match error.kind.as_ref() {
        ErrorKind::Write(_) => DocmapError::Write(error.to_string()),
        _ => DocmapError::Backend(error.to_string()),
    }
}

pub(crate) fn write_concern(concern: WriteConcern) -> MongoWriteConcern {
    match concern {
        WriteConcern::Unacknowledged => MongoWriteConcern::nodes(0),
        WriteConcern::Acknowledged => MongoWriteConcern::nodes(1),
        WriteConcern::Majority => MongoWriteConcern::majority(),
        WriteConcern::Nodes(n) => MongoWriteConcern::nodes(n),
    }
}


#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(uri: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri, database)
    }

    /// Returns the name of the database every collection lives in.
    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
        options: WriteOptions,
    ) -> DocmapResult<InsertOutcome> {
        let target = self.get_collection(collection);
        let action = target.insert_one(document);
        let result = match options.write_concern {
            Some(concern) => action.write_concern(write_concern(concern)).await,
            None => action.await,
        }
        .map_err(map_error)?;

        Ok(InsertOutcome { inserted_id: result.inserted_id })
    }

    async fn update_matching(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: WriteOptions,
    ) -> DocmapResult<UpdateOutcome> {
        let target = self.get_collection(collection);
        let action = target
            .update_one(filter, update)
            .upsert(options.is_upsert());
        let result = match options.write_concern {
            Some(concern) => action.write_concern(write_concern(concern)).await,
            None => action.await,
        }
        .map_err(map_error)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_matching(
        &self,
        collection: &str,
        filter: Document,
        options: DeleteOptions,
    ) -> DocmapResult<DeleteOutcome> {
        let target = self.get_collection(collection);
        let action = target.delete_many(filter);
        let result = match options.write_concern {
            Some(concern) => action.write_concern(write_concern(concern)).await,
            None => action.await,
        }
        .map_err(map_error)?;

        Ok(DeleteOutcome { deleted_count: result.deleted_count })
    }

    async fn find_matching(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocmapResult<DocumentStream> {
        let mut find_options = MongoFindOptions::default();
        find_options.projection = options.projection;
        find_options.sort = options.sort;
        find_options.skip = options.skip;
        find_options.limit = options.limit;

        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(find_options)
                .await
                .map_err(map_error)?
                .map_err(map_error)
                .boxed()
        )
    }

    async fn count_matching(&self, collection: &str, filter: Document) -> DocmapResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(map_error)
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocmapResult<()> {
        self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                .keys(bson::doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                    .unique(unique)
                    .build()
                )
                .build()
            )
            .await
            .map_err(map_error)?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocmapResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(map_error)
    }

    async fn list_collections(&self) -> DocmapResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(map_error)
    }
}

#[derive(Debug, Clone)]
pub struct MongoDbStoreBuilder {
    uri: String,
    database: String,
    app_name: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
            app_name: None,
        }
    }

    pub fn from_config(config: MongoDbConfig) -> Self {
        Self {
            uri: config.uri,
            database: config.database,
            app_name: config.app_name,
        }
    }

    /// Sets the application name reported to the server.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_string());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocmapResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| DocmapError::Initialization(e.to_string()))?;

        if let Some(app_name) = self.app_name {
            if let Some(existing) = options.app_name.as_ref().filter(|existing| **existing != app_name) {
                tracing::warn!(
                    ignored = %existing,
                    app_name = %app_name,
                    "connection string appName is overridden by the configured app name"
                );
            }
            options.app_name = Some(app_name);
        }

        let client = Client::with_options(options)
            .map_err(|e| DocmapError::Initialization(e.to_string()))?;

        tracing::info!(database = %self.database, "connected to mongodb");

        Ok(MongoDbStore::new(client, self.database))
    }
}
