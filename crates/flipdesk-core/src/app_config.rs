use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which eBay API host the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EbayEnvironment {
    Production,
    Sandbox,
}

impl EbayEnvironment {
    #[must_use]
    pub fn api_base_url(self) -> &'static str {
        match self {
            EbayEnvironment::Production => "https://api.ebay.com",
            EbayEnvironment::Sandbox => "https://api.sandbox.ebay.com",
        }
    }
}

impl std::fmt::Display for EbayEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EbayEnvironment::Production => write!(f, "production"),
            EbayEnvironment::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// Tunables for category sync and leaf resolution.
///
/// Passed explicitly so tests can run with small batches and their own
/// fallback category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySyncConfig {
    pub batch_size: usize,
    pub recent_window_hours: i64,
    pub fallback_category_id: String,
    pub fallback_category_name: String,
}

impl Default for CategorySyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            recent_window_hours: 24,
            fallback_category_id: "1249".to_string(),
            fallback_category_name: "Everything Else".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub api_keys: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub ebay_client_id: Option<String>,
    pub ebay_client_secret: Option<String>,
    pub ebay_user_token: Option<String>,
    pub ebay_environment: EbayEnvironment,
    pub ebay_marketplace_id: String,
    pub ebay_category_tree_id: Option<String>,
    pub ebay_site_id: u32,
    pub ebay_request_timeout_secs: u64,
    pub category_sync: CategorySyncConfig,
    pub category_sync_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("api_keys", &self.api_keys.as_ref().map(|_| "[redacted]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "ebay_client_id",
                &self.ebay_client_id.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "ebay_client_secret",
                &self.ebay_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "ebay_user_token",
                &self.ebay_user_token.as_ref().map(|_| "[redacted]"),
            )
            .field("ebay_environment", &self.ebay_environment)
            .field("ebay_marketplace_id", &self.ebay_marketplace_id)
            .field("ebay_category_tree_id", &self.ebay_category_tree_id)
            .field("ebay_site_id", &self.ebay_site_id)
            .field("ebay_request_timeout_secs", &self.ebay_request_timeout_secs)
            .field("category_sync", &self.category_sync)
            .field("category_sync_cron", &self.category_sync_cron)
            .finish()
    }
}
