//! Leaf-category resolution for listings.
//!
//! eBay only accepts listings in leaf categories. [`LeafResolver::resolve`]
//! turns whatever the caller knows (a cached leaf, a candidate id, a title)
//! into a leaf, trying in order:
//!
//! 1. a caller-confirmed leaf id,
//! 2. the candidate id itself,
//! 3. the first leaf among the candidate's direct children,
//! 4. eBay's top suggestion for the title and description (descending once
//!    if it is not a leaf),
//! 5. the configured catch-all category.
//!
//! Source failures are logged and skipped, so resolution always ends in a
//! leaf.

use std::fmt::Display;

use flipdesk_core::{
    build_suggestion_query, is_plausible_category_id, CategoryInfo, CategorySyncConfig,
    LeafResolution, ResolutionSource,
};
use serde::{Deserialize, Serialize};

/// A category together with its direct children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBranch {
    pub node: CategoryInfo,
    pub children: Vec<CategoryInfo>,
}

impl CategoryBranch {
    /// First direct child flagged leaf, in source order.
    #[must_use]
    pub fn first_leaf_child(&self) -> Option<&CategoryInfo> {
        self.children.iter().find(|child| child.leaf)
    }
}

/// Where the resolver looks categories up.
#[allow(async_fn_in_trait)]
pub trait CategorySource {
    type Error: Display;

    /// The category and its direct children, or `None` if the id is unknown.
    async fn branch(&self, category_id: &str) -> Result<Option<CategoryBranch>, Self::Error>;

    /// Ranked category suggestions for a free-text query.
    async fn suggest(&self, query: &str) -> Result<Vec<CategoryInfo>, Self::Error>;
}

/// What the caller knows about a listing's category.
///
/// Field names are snake_case; the camelCase spellings are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    #[serde(default, alias = "categoryId")]
    pub category_id: Option<String>,
    #[serde(default, alias = "categoryName")]
    pub category_name: Option<String>,
    /// Set when `category_id` came from an earlier resolution.
    #[serde(default, alias = "knownLeaf")]
    pub known_leaf: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Outcome of [`LeafResolver::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryValidation {
    pub category_id: String,
    pub exists: bool,
    pub is_leaf: bool,
    pub category_name: Option<String>,
    pub path: Vec<String>,
}

pub struct LeafResolver<S> {
    source: S,
    fallback_id: String,
    fallback_name: String,
}

impl<S: CategorySource> LeafResolver<S> {
    #[must_use]
    pub fn new(source: S, config: &CategorySyncConfig) -> Self {
        Self {
            source,
            fallback_id: config.fallback_category_id.clone(),
            fallback_name: config.fallback_category_name.clone(),
        }
    }

    /// Resolves `request` to a leaf category. Never fails.
    pub async fn resolve(&self, request: &ResolveRequest) -> LeafResolution {
        let candidate = request
            .category_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        if let Some(id) = candidate {
            if request.known_leaf {
                let name = request
                    .category_name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| id.to_string());
                tracing::debug!(category_id = id, "accepting pre-resolved leaf");
                return LeafResolution::new(id, name, Vec::new(), ResolutionSource::PreResolved);
            }

            if is_plausible_category_id(id) {
                if let Some(resolution) = self.check_candidate(id).await {
                    return resolution;
                }
            } else {
                tracing::debug!(
                    category_id = id,
                    "candidate id is not numeric; skipping lookup"
                );
            }
        }

        if let Some(resolution) = self.suggest_leaf(request).await {
            return resolution;
        }

        tracing::info!(
            category_id = candidate.unwrap_or(""),
            fallback = %self.fallback_id,
            "using fallback category"
        );
        LeafResolution::new(
            self.fallback_id.clone(),
            self.fallback_name.clone(),
            Vec::new(),
            ResolutionSource::Fallback,
        )
    }

    /// Steps 2 and 3: the candidate itself, then its first leaf child.
    async fn check_candidate(&self, id: &str) -> Option<LeafResolution> {
        let branch = match self.source.branch(id).await {
            Ok(Some(branch)) => branch,
            Ok(None) => {
                tracing::info!(category_id = id, "candidate category not found");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    step = "candidate_check",
                    category_id = id,
                    error = %e,
                    "category lookup failed"
                );
                return None;
            }
        };

        if branch.node.leaf {
            return Some(LeafResolution::from_info(&branch.node, ResolutionSource::Candidate));
        }

        let descended = descend(&branch);
        if descended.is_none() {
            tracing::info!(
                step = "descend_to_leaf",
                category_id = id,
                children = branch.children.len(),
                "no leaf among direct children"
            );
        }
        descended
    }

    /// Step 4: eBay's top suggestion, descending once when it is not a leaf.
    async fn suggest_leaf(&self, request: &ResolveRequest) -> Option<LeafResolution> {
        let query =
            build_suggestion_query(request.title.as_deref(), request.description.as_deref())?;

        let top = match self.source.suggest(&query).await {
            Ok(suggestions) => suggestions.into_iter().next()?,
            Err(e) => {
                tracing::warn!(step = "query_suggestion", error = %e, "category suggestion failed");
                return None;
            }
        };

        if top.leaf {
            return Some(LeafResolution::from_info(&top, ResolutionSource::Suggested));
        }

        match self.source.branch(&top.category_id).await {
            Ok(Some(mut branch)) => {
                // Suggestions carry the full ancestry; stored lookups may not.
                if branch.node.path.len() < top.path.len() {
                    branch.node.path = top.path;
                }
                descend(&branch)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    step = "descend_to_leaf",
                    category_id = %top.category_id,
                    error = %e,
                    "suggested category lookup failed"
                );
                None
            }
        }
    }

    /// Reports whether `category_id` exists and is a leaf.
    ///
    /// # Errors
    ///
    /// Propagates the source's lookup error.
    pub async fn validate(&self, category_id: &str) -> Result<CategoryValidation, S::Error> {
        let id = category_id.trim();
        if !is_plausible_category_id(id) {
            return Ok(CategoryValidation {
                category_id: id.to_string(),
                exists: false,
                is_leaf: false,
                category_name: None,
                path: Vec::new(),
            });
        }

        let validation = match self.source.branch(id).await? {
            Some(branch) => CategoryValidation {
                category_id: branch.node.category_id,
                exists: true,
                is_leaf: branch.node.leaf,
                category_name: Some(branch.node.category_name),
                path: branch.node.path,
            },
            None => CategoryValidation {
                category_id: id.to_string(),
                exists: false,
                is_leaf: false,
                category_name: None,
                path: Vec::new(),
            },
        };
        Ok(validation)
    }

    /// Direct children of `parent_id` that are leaves. Empty for an unknown
    /// parent.
    ///
    /// # Errors
    ///
    /// Propagates the source's lookup error.
    pub async fn leaf_children(&self, parent_id: &str) -> Result<Vec<CategoryInfo>, S::Error> {
        let Some(branch) = self.source.branch(parent_id.trim()).await? else {
            return Ok(Vec::new());
        };
        let parent = branch.node;
        Ok(branch
            .children
            .into_iter()
            .filter(|child| child.leaf)
            .map(|mut child| {
                child.path = parent.child_path(&child.category_name);
                child
            })
            .collect())
    }

    /// Raw suggestion list for a title and description; empty when both are
    /// blank.
    ///
    /// # Errors
    ///
    /// Propagates the source's suggestion error.
    pub async fn suggest(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Vec<CategoryInfo>, S::Error> {
        match build_suggestion_query(Some(title), Some(description)) {
            Some(query) => self.source.suggest(&query).await,
            None => Ok(Vec::new()),
        }
    }
}

fn descend(branch: &CategoryBranch) -> Option<LeafResolution> {
    let child = branch.first_leaf_child()?;
    Some(LeafResolution::new(
        child.category_id.clone(),
        child.category_name.clone(),
        branch.node.child_path(&child.category_name),
        ResolutionSource::Descended,
    ))
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
