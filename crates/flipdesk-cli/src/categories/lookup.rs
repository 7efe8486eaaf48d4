use std::sync::Arc;

use flipdesk_categories::{LeafResolver, ResolveRequest, StoredCategories};
use flipdesk_core::{build_suggestion_query, AppConfig, CategoryInfo};
use flipdesk_ebay::SuggestedCategory;

use super::{ebay_client, fmt_path};

/// Runs `f` against a resolver backed by eBay (`live`) or the stored table.
macro_rules! with_resolver {
    ($config:expr, $live:expr, |$resolver:ident| $body:expr) => {
        if $live {
            let $resolver = LeafResolver::new(ebay_client($config)?, &$config.category_sync);
            $body
        } else {
            let pool = crate::connect($config).await?;
            let ebay = ebay_client($config).ok().map(Arc::new);
            let $resolver =
                LeafResolver::new(StoredCategories::new(pool, ebay), &$config.category_sync);
            $body
        }
    };
}

/// Prints the leaf resolution for `request` as JSON.
///
/// # Errors
///
/// Returns an error only if the selected source cannot be set up; the
/// resolution itself always succeeds.
pub(super) async fn run_resolve(
    config: &AppConfig,
    request: &ResolveRequest,
    live: bool,
) -> anyhow::Result<()> {
    let resolution = with_resolver!(config, live, |resolver| resolver.resolve(request).await);
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}

/// Prints whether `category_id` exists and is a leaf.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub(super) async fn run_validate(
    config: &AppConfig,
    category_id: &str,
    live: bool,
) -> anyhow::Result<()> {
    let validation = with_resolver!(config, live, |resolver| resolver
        .validate(category_id)
        .await
        .map_err(|e| anyhow::anyhow!("validate {category_id}: {e}"))?);

    if validation.exists {
        println!(
            "{} {} ({})",
            validation.category_id,
            if validation.is_leaf { "is a leaf" } else { "is not a leaf" },
            fmt_path(&validation.path)
        );
    } else {
        println!("{} does not exist", validation.category_id);
    }
    Ok(())
}

/// Prints the direct leaf children of `parent_id`.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub(super) async fn run_leaf_children(
    config: &AppConfig,
    parent_id: &str,
    live: bool,
) -> anyhow::Result<()> {
    let children = with_resolver!(config, live, |resolver| resolver
        .leaf_children(parent_id)
        .await
        .map_err(|e| anyhow::anyhow!("leaf children of {parent_id}: {e}"))?);

    if children.is_empty() {
        println!("no leaf children under {parent_id}");
        return Ok(());
    }
    print_categories(&children);
    Ok(())
}

/// Prints eBay's ranked suggestions for a title and description, with the
/// share of matching listings eBay found in each.
///
/// # Errors
///
/// Returns an error if eBay credentials are missing or the call fails.
pub(super) async fn run_suggest(
    config: &AppConfig,
    title: &str,
    description: Option<&str>,
) -> anyhow::Result<()> {
    let Some(query) = build_suggestion_query(Some(title), description) else {
        println!("no suggestions");
        return Ok(());
    };
    let ebay = ebay_client(config)?;
    let suggestions = ebay.get_suggested_categories(&query).await?;

    if suggestions.is_empty() {
        println!("no suggestions");
        return Ok(());
    }
    println!("{:<12}{:<6}{:<9}PATH", "ID", "LEAF", "MATCH");
    for suggestion in suggestions {
        println!("{}", suggestion_row(suggestion));
    }
    Ok(())
}

fn suggestion_row(suggestion: SuggestedCategory) -> String {
    let found = suggestion
        .percent_item_found
        .map_or_else(|| "-".to_string(), |p| format!("{p}%"));
    let info = suggestion.into_info();
    format!(
        "{:<12}{:<6}{:<9}{}",
        info.category_id,
        if info.leaf { "yes" } else { "no" },
        found,
        fmt_path(&info.path)
    )
}

/// Prints categories from Trading `GetCategories`.
///
/// # Errors
///
/// Returns an error if eBay credentials are missing or the call fails.
pub(super) async fn run_browse(
    config: &AppConfig,
    parent_id: Option<&str>,
    level_limit: u32,
) -> anyhow::Result<()> {
    let ebay = ebay_client(config)?;
    let categories = ebay.get_categories(parent_id, Some(level_limit)).await?;

    println!("{:<12}{:<7}{:<6}NAME", "ID", "LEVEL", "LEAF");
    for category in &categories {
        println!(
            "{:<12}{:<7}{:<6}{}{}",
            category.category_id,
            category.level,
            if category.leaf { "yes" } else { "no" },
            "  ".repeat(usize::try_from(category.level.saturating_sub(1)).unwrap_or(0)),
            category.category_name
        );
    }
    Ok(())
}

fn print_categories(categories: &[CategoryInfo]) {
    println!("{:<12}{:<6}PATH", "ID", "LEAF");
    for category in categories {
        println!(
            "{:<12}{:<6}{}",
            category.category_id,
            if category.leaf { "yes" } else { "no" },
            fmt_path(&category.path)
        );
    }
}
