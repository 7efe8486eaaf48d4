//! [`CategorySource`] implementations: eBay directly, or the synced
//! `ebay_categories` table with eBay only for suggestions.

use std::sync::Arc;

use flipdesk_core::{CategoryInfo, CategoryNode};
use flipdesk_db::{CategoryRow, DbError};
use flipdesk_ebay::{EbayClient, EbayError};
use sqlx::PgPool;
use thiserror::Error;

use crate::resolver::{CategoryBranch, CategorySource};

fn node_info(node: &CategoryNode, parent_id: Option<&str>, path: Vec<String>) -> CategoryInfo {
    CategoryInfo {
        category_id: node.category_id.clone(),
        category_name: node.category_name.clone(),
        leaf: node.is_leaf(),
        parent_id: parent_id.map(str::to_string),
        path,
    }
}

/// eBay answers an unknown category id with a client error.
fn is_unknown_category(err: &EbayError) -> bool {
    matches!(err, EbayError::Upstream { status: 400 | 404, .. })
}

impl CategorySource for EbayClient {
    type Error = EbayError;

    async fn branch(&self, category_id: &str) -> Result<Option<CategoryBranch>, EbayError> {
        let subtree = match self.fetch_category_tree(Some(category_id)).await {
            Ok(subtree) => subtree,
            Err(e) if is_unknown_category(&e) => return Ok(None),
            Err(e) => return Err(e),
        };

        let node = node_info(&subtree, None, vec![subtree.category_name.clone()]);
        let children = subtree
            .children
            .iter()
            .map(|child| {
                node_info(
                    child,
                    Some(&subtree.category_id),
                    node.child_path(&child.category_name),
                )
            })
            .collect();

        Ok(Some(CategoryBranch { node, children }))
    }

    async fn suggest(&self, query: &str) -> Result<Vec<CategoryInfo>, EbayError> {
        let suggestions = self.get_suggested_categories(query).await?;
        Ok(suggestions
            .into_iter()
            .map(flipdesk_ebay::SuggestedCategory::into_info)
            .collect())
    }
}

#[derive(Debug, Error)]
pub enum StoredSourceError {
    #[error("category lookup failed: {0}")]
    Db(#[from] DbError),
    #[error("category suggestion failed: {0}")]
    Ebay(#[from] EbayError),
}

/// Reads categories from the synced table. Suggestions need eBay; without a
/// client they come back empty.
#[derive(Clone)]
pub struct StoredCategories {
    pool: PgPool,
    ebay: Option<Arc<EbayClient>>,
}

impl StoredCategories {
    #[must_use]
    pub fn new(pool: PgPool, ebay: Option<Arc<EbayClient>>) -> Self {
        Self { pool, ebay }
    }
}

fn row_info(row: CategoryRow, path: Vec<String>) -> CategoryInfo {
    CategoryInfo {
        category_id: row.ebay_category_id,
        category_name: row.category_name,
        leaf: row.leaf_category,
        parent_id: row.parent_ebay_category_id,
        path,
    }
}

impl CategorySource for StoredCategories {
    type Error = StoredSourceError;

    async fn branch(&self, category_id: &str) -> Result<Option<CategoryBranch>, StoredSourceError> {
        let Some(row) = flipdesk_db::get_category(&self.pool, category_id).await? else {
            return Ok(None);
        };

        let mut path = flipdesk_db::category_path(&self.pool, category_id).await?;
        if path.is_empty() {
            path.push(row.category_name.clone());
        }
        let node = row_info(row, path);

        let children = flipdesk_db::list_child_categories(&self.pool, category_id)
            .await?
            .into_iter()
            .map(|child| {
                let path = node.child_path(&child.category_name);
                row_info(child, path)
            })
            .collect();

        Ok(Some(CategoryBranch { node, children }))
    }

    async fn suggest(&self, query: &str) -> Result<Vec<CategoryInfo>, StoredSourceError> {
        let Some(ebay) = self.ebay.as_ref() else {
            tracing::debug!("no eBay client configured; skipping suggestions");
            return Ok(Vec::new());
        };
        Ok(ebay.suggest(query).await?)
    }
}
