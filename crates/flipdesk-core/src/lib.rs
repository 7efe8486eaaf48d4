pub mod app_config;
pub mod categories;
pub mod config;
pub mod flatten;

use thiserror::Error;

pub use app_config::{AppConfig, CategorySyncConfig, EbayEnvironment, Environment};
pub use categories::{
    build_suggestion_query, is_plausible_category_id, CategoryInfo, CategoryNode, CategoryRecord,
    LeafResolution, ResolutionSource, SUGGESTION_QUERY_MAX_CHARS,
};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use flatten::{flatten, flatten_under, MalformedTree};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
