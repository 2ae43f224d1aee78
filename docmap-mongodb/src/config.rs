//! Connection settings for the MongoDB backend.
//!
//! A [`MongoDbConfig`] can be built in code, read from the environment, or loaded from a
//! JSON file:
//!
//! ```json
//! { "uri": "mongodb://db.internal:27017", "database": "app", "app_name": "billing" }
//! ```
//!
//! Only `database` is required; `uri` defaults to [`DEFAULT_URI`].

use std::{env, fs, path::Path};
use serde::Deserialize;

use docmap_core::error::{DocmapError, DocmapResult};

/// The connection string used when none is configured.
pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

pub const URI_VAR: &str = "DOCMAP_MONGODB_URI";
pub const DATABASE_VAR: &str = "DOCMAP_MONGODB_DATABASE";
pub const APP_NAME_VAR: &str = "DOCMAP_MONGODB_APP_NAME";

fn default_uri() -> String {
    DEFAULT_URI.to_string()
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MongoDbConfig {
    /// Connection string.
    #[serde(default = "default_uri")]
    pub uri: String,
    /// Database holding every collection.
    pub database: String,
    /// Application name reported to the server.
    #[serde(default)]
    pub app_name: Option<String>,
}

impl MongoDbConfig {
    /// Connects to `database` on the default local server.
    pub fn from_database(database: &str) -> Self {
        Self {
            uri: default_uri(),
            database: database.to_string(),
            app_name: None,
        }
    }

    /// Sets the connection string.
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    /// Sets the application name reported to the server.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_string());
        self
    }

    /// Reads the configuration from `DOCMAP_MONGODB_URI`, `DOCMAP_MONGODB_DATABASE` and
    /// `DOCMAP_MONGODB_APP_NAME`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the database variable is unset or empty.
    pub fn from_env() -> DocmapResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocmapResult<Self> {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database = present(DATABASE_VAR)
            .ok_or_else(|| DocmapError::Configuration(format!("{DATABASE_VAR} must be set")))?;

        Ok(Self {
            uri: present(URI_VAR).unwrap_or_else(default_uri),
            database,
            app_name: present(APP_NAME_VAR),
        })
    }

    /// Loads the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed, or names an
    /// empty database.
    pub fn from_file(path: impl AsRef<Path>) -> DocmapResult<Self> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()
    }

    fn validate(self) -> DocmapResult<Self> {
        if self.database.trim().is_empty() {
            return Err(DocmapError::Configuration("database name must not be empty".into()));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn from_database_uses_the_local_default() {
        let config = MongoDbConfig::from_database("app").app_name("tests");

        assert_eq!(config.uri, DEFAULT_URI);
        assert_eq!(config.database, "app");
        assert_eq!(config.app_name.as_deref(), Some("tests"));
    }

    #[test]
    fn environment_requires_a_database() {
        let config = MongoDbConfig::from_lookup(lookup(&[
            (DATABASE_VAR, "app"),
            (URI_VAR, "mongodb://db:27017"),
            (APP_NAME_VAR, ""),
        ]))
        .unwrap();

        assert_eq!(config, MongoDbConfig::from_database("app").uri("mongodb://db:27017"));
        assert!(matches!(
            MongoDbConfig::from_lookup(lookup(&[(URI_VAR, "mongodb://db:27017")])),
            Err(DocmapError::Configuration(_))
        ));
    }

    #[test]
    fn file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "database": "app" }}"#).unwrap();

        assert_eq!(MongoDbConfig::from_file(file.path()).unwrap(), MongoDbConfig::from_database("app"));
    }

    #[test]
    fn file_errors_are_configuration_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "database": "  " }}"#).unwrap();

        assert!(matches!(MongoDbConfig::from_file(file.path()), Err(DocmapError::Configuration(_))));
        assert!(matches!(
            MongoDbConfig::from_file("/nonexistent/docmap.json"),
            Err(DocmapError::Configuration(_))
        ));
    }
}
