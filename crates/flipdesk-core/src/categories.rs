//! Category domain types shared by the eBay client, the database layer and
//! the sync/resolver pipeline.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Character limit of the legacy `GetSuggestedCategories` query.
pub const SUGGESTION_QUERY_MAX_CHARS: usize = 350;

static CATEGORY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,10}$").expect("valid category id regex"));

/// A node of the eBay taxonomy tree as returned by the Taxonomy API.
///
/// Decodes the wire shape
/// `{"category": {"categoryId", "categoryName"}, "childCategoryTreeNodes": [...]}`.
/// A missing or empty child list marks a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "WireCategoryNode")]
pub struct CategoryNode {
    pub category_id: String,
    pub category_name: String,
    pub children: Vec<CategoryNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCategoryNode {
    category: WireCategory,
    #[serde(default)]
    child_category_tree_nodes: Option<Vec<CategoryNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCategory {
    category_id: String,
    category_name: String,
}

impl From<WireCategoryNode> for CategoryNode {
    fn from(wire: WireCategoryNode) -> Self {
        Self {
            category_id: wire.category.category_id,
            category_name: wire.category.category_name,
            children: wire.child_category_tree_nodes.unwrap_or_default(),
        }
    }
}

impl CategoryNode {
    /// Builds a node directly; mostly useful for fixtures.
    #[must_use]
    pub fn new(id: &str, name: &str, children: Vec<CategoryNode>) -> Self {
        Self {
            category_id: id.to_string(),
            category_name: name.to_string(),
            children,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// One flattened category, ready to be upserted into `ebay_categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub ebay_category_id: String,
    pub category_name: String,
    pub parent_ebay_category_id: Option<String>,
    pub leaf_category: bool,
    pub is_active: bool,
}

/// What a category source knows about a single category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub category_id: String,
    pub category_name: String,
    pub leaf: bool,
    pub parent_id: Option<String>,
    /// Ancestor names root→self; may hold only the category's own name when
    /// the source does not expose ancestry.
    pub path: Vec<String>,
}

impl CategoryInfo {
    /// Path of `child` when reached from `self`.
    #[must_use]
    pub fn child_path(&self, child_name: &str) -> Vec<String> {
        let mut path = if self.path.is_empty() {
            vec![self.category_name.clone()]
        } else {
            self.path.clone()
        };
        path.push(child_name.to_string());
        path
    }
}

/// Which resolver step produced a [`LeafResolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    PreResolved,
    Candidate,
    Descended,
    Suggested,
    Fallback,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionSource::PreResolved => write!(f, "pre_resolved"),
            ResolutionSource::Candidate => write!(f, "candidate"),
            ResolutionSource::Descended => write!(f, "descended"),
            ResolutionSource::Suggested => write!(f, "suggested"),
            ResolutionSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// A leaf category chosen for a listing. `is_leaf` is always `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafResolution {
    pub category_id: String,
    pub category_name: String,
    pub is_leaf: bool,
    pub path: Vec<String>,
    pub source: ResolutionSource,
}

impl LeafResolution {
    #[must_use]
    pub fn new(
        category_id: impl Into<String>,
        category_name: impl Into<String>,
        path: Vec<String>,
        source: ResolutionSource,
    ) -> Self {
        let category_name = category_name.into();
        let path = if path.is_empty() {
            vec![category_name.clone()]
        } else {
            path
        };
        Self {
            category_id: category_id.into(),
            category_name,
            is_leaf: true,
            path,
            source,
        }
    }

    #[must_use]
    pub fn from_info(info: &CategoryInfo, source: ResolutionSource) -> Self {
        Self::new(
            info.category_id.clone(),
            info.category_name.clone(),
            info.path.clone(),
            source,
        )
    }
}

/// Returns `true` when `id` has the shape of an eBay category id.
#[must_use]
pub fn is_plausible_category_id(id: &str) -> bool {
    CATEGORY_ID_RE.is_match(id)
}

/// Builds the free-text query sent to the suggestion endpoint.
///
/// Joins title and description, collapses whitespace and truncates to
/// [`SUGGESTION_QUERY_MAX_CHARS`] characters. Returns `None` when nothing
/// usable remains.
#[must_use]
pub fn build_suggestion_query(title: Option<&str>, description: Option<&str>) -> Option<String> {
    let joined = [title, description]
        .into_iter()
        .flatten()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    let truncated: String = joined.chars().take(SUGGESTION_QUERY_MAX_CHARS).collect();
    let truncated = truncated.trim_end().to_string();

    if truncated.is_empty() {
        None
    } else {
        Some(truncated)
    }
}
