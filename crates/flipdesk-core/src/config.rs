use crate::app_config::{AppConfig, CategorySyncConfig, EbayEnvironment, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns `ConfigError` if required vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset for optional secrets.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("FLIPDESK_ENV", "development"))?;

    let bind_addr = or_default("FLIPDESK_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("FLIPDESK_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("FLIPDESK_LOG_LEVEL", "info");
    let api_keys = optional("FLIPDESK_API_KEYS");

    let db_max_connections = parse_u32("FLIPDESK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FLIPDESK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FLIPDESK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let ebay_client_id = optional("EBAY_CLIENT_ID");
    let ebay_client_secret = optional("EBAY_CLIENT_SECRET");
    let ebay_user_token = optional("EBAY_USER_TOKEN");
    let ebay_environment = parse_ebay_environment(&or_default("EBAY_ENVIRONMENT", "production"))?;
    let ebay_marketplace_id = or_default("EBAY_MARKETPLACE_ID", "EBAY_US");
    let ebay_category_tree_id = optional("EBAY_CATEGORY_TREE_ID");
    let ebay_site_id = parse_u32("EBAY_SITE_ID", "0")?;
    let ebay_request_timeout_secs = parse_u64("EBAY_REQUEST_TIMEOUT_SECS", "30")?;

    let defaults = CategorySyncConfig::default();
    let batch_size = parse_usize(
        "FLIPDESK_CATEGORY_BATCH_SIZE",
        &defaults.batch_size.to_string(),
    )?;
    if batch_size == 0 {
        return Err(invalid(
            "FLIPDESK_CATEGORY_BATCH_SIZE",
            "must be greater than zero".to_string(),
        ));
    }
    let recent_window_hours = i64::from(parse_u32(
        "FLIPDESK_CATEGORY_RECENT_WINDOW_HOURS",
        &defaults.recent_window_hours.to_string(),
    )?);
    let fallback_category_id = or_default(
        "FLIPDESK_FALLBACK_CATEGORY_ID",
        &defaults.fallback_category_id,
    );
    if !crate::is_plausible_category_id(&fallback_category_id) {
        return Err(invalid(
            "FLIPDESK_FALLBACK_CATEGORY_ID",
            format!("'{fallback_category_id}' is not a numeric category id"),
        ));
    }
    let fallback_category_name = or_default(
        "FLIPDESK_FALLBACK_CATEGORY_NAME",
        &defaults.fallback_category_name,
    );
    let category_sync_cron = or_default("FLIPDESK_CATEGORY_SYNC_CRON", "0 0 3 * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        ebay_client_id,
        ebay_client_secret,
        ebay_user_token,
        ebay_environment,
        ebay_marketplace_id,
        ebay_category_tree_id,
        ebay_site_id,
        ebay_request_timeout_secs,
        category_sync: CategorySyncConfig {
            batch_size,
            recent_window_hours,
            fallback_category_id,
            fallback_category_name,
        },
        category_sync_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FLIPDESK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_ebay_environment(s: &str) -> Result<EbayEnvironment, ConfigError> {
    match s {
        "production" => Ok(EbayEnvironment::Production),
        "sandbox" => Ok(EbayEnvironment::Sandbox),
        other => Err(ConfigError::InvalidEnvVar {
            var: "EBAY_ENVIRONMENT".to_string(),
            reason: format!("expected 'production' or 'sandbox', got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
