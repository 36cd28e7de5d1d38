//! Connection settings loaded from configuration files or the environment.

use serde::Deserialize;

use doclink_core::error::{DocumentStoreError, DocumentStoreResult};

use crate::store::MongoDbDriverBuilder;

pub const ENV_URI: &str = "DOCLINK_MONGODB_URI";
pub const ENV_DATABASE: &str = "DOCLINK_MONGODB_DATABASE";
pub const ENV_APP_NAME: &str = "DOCLINK_MONGODB_APP_NAME";
pub const ENV_MAX_POOL_SIZE: &str = "DOCLINK_MONGODB_MAX_POOL_SIZE";

/// Settings for a [`MongoDbDriver`](crate::MongoDbDriver).
///
/// Deserializes from any serde format, so it can be embedded in an application's own
/// configuration:
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct AppConfig {
///     mongodb: doclink::mongodb::MongoDbConfig,
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MongoDbConfig {
    pub uri: String,
    pub database: String,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub max_pool_size: Option<u32>,
}

impl MongoDbConfig {
    /// Reads the `DOCLINK_MONGODB_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if the URI or database is unset,
    /// or if the pool size is not a number.
    pub fn from_env() -> DocumentStoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a caller-provided variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocumentStoreResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| DocumentStoreError::Initialization(format!("{key} is not set")))
        };

        let max_pool_size = match lookup(ENV_MAX_POOL_SIZE) {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|e| {
                DocumentStoreError::Initialization(format!("{ENV_MAX_POOL_SIZE}: {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            uri: required(ENV_URI)?,
            database: required(ENV_DATABASE)?,
            app_name: lookup(ENV_APP_NAME),
            max_pool_size,
        })
    }

    pub fn builder(&self) -> MongoDbDriverBuilder {
        MongoDbDriverBuilder::from(self.clone())
    }
}

impl From<MongoDbConfig> for MongoDbDriverBuilder {
    fn from(config: MongoDbConfig) -> Self {
        let mut builder = MongoDbDriverBuilder::new(&config.uri, &config.database);
        if let Some(app_name) = config.app_name {
            builder = builder.app_name(app_name);
        }
        if let Some(size) = config.max_pool_size {
            builder = builder.max_pool_size(size);
        }
        builder
    }
}
