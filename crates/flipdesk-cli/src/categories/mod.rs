//! `categories` command handlers.
//!
//! Sync commands write through the run ledger; lookups read the stored
//! table unless `--live` asks for eBay directly.

mod lookup;
mod sync;

use clap::Subcommand;
use flipdesk_core::AppConfig;
use flipdesk_ebay::EbayClient;

/// Sub-commands available under `categories`.
#[derive(Debug, Subcommand)]
pub enum CategoriesCommands {
    /// Fetch the eBay category tree and upsert it
    Sync {
        /// Ignore the freshness window and retire categories eBay dropped
        #[arg(long)]
        full: bool,
        /// Only sync the subtree under this category id
        #[arg(long, conflicts_with = "full")]
        parent: Option<String>,
    },
    /// List recent sync runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Print categories straight from the Trading API
    Browse {
        /// Start below this category id (top level when omitted)
        #[arg(long)]
        parent: Option<String>,
        /// Deepest level to include
        #[arg(long, default_value = "1")]
        level_limit: u32,
    },
    /// Resolve what is known about a listing to a leaf category
    Resolve {
        #[arg(long)]
        category_id: Option<String>,
        #[arg(long)]
        category_name: Option<String>,
        /// Trust `--category-id` as an already-resolved leaf
        #[arg(long)]
        known_leaf: bool,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Look categories up on eBay instead of the stored table
        #[arg(long)]
        live: bool,
    },
    /// Report whether a category id exists and is a leaf
    Validate {
        category_id: String,
        #[arg(long)]
        live: bool,
    },
    /// List the leaf children of a category
    LeafChildren {
        parent_id: String,
        #[arg(long)]
        live: bool,
    },
    /// Show eBay's category suggestions for a title
    Suggest {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
}

/// Dispatches a `categories` sub-command.
///
/// # Errors
///
/// Returns an error if the database or eBay cannot be reached, or eBay
/// credentials are required but missing.
pub(crate) async fn run(config: &AppConfig, command: CategoriesCommands) -> anyhow::Result<()> {
    match command {
        CategoriesCommands::Sync { full, parent } => sync::run_sync(config, full, parent).await,
        CategoriesCommands::Runs { limit } => sync::run_list_runs(config, limit).await,
        CategoriesCommands::Browse {
            parent,
            level_limit,
        } => lookup::run_browse(config, parent.as_deref(), level_limit).await,
        CategoriesCommands::Resolve {
            category_id,
            category_name,
            known_leaf,
            title,
            description,
            live,
        } => {
            let request = flipdesk_categories::ResolveRequest {
                category_id,
                category_name,
                known_leaf,
                title,
                description,
            };
            lookup::run_resolve(config, &request, live).await
        }
        CategoriesCommands::Validate { category_id, live } => {
            lookup::run_validate(config, &category_id, live).await
        }
        CategoriesCommands::LeafChildren { parent_id, live } => {
            lookup::run_leaf_children(config, &parent_id, live).await
        }
        CategoriesCommands::Suggest { title, description } => {
            lookup::run_suggest(config, &title, description.as_deref()).await
        }
    }
}

fn ebay_client(config: &AppConfig) -> anyhow::Result<EbayClient> {
    EbayClient::from_app_config(config)
        .map_err(|e| anyhow::anyhow!("{e}; set EBAY_CLIENT_ID and EBAY_CLIENT_SECRET"))
}

fn fmt_path(path: &[String]) -> String {
    path.join(" > ")
}
