//! Wire and result types for the eBay Taxonomy, Identity and Trading APIs.

use flipdesk_core::{CategoryInfo, CategoryNode};
use serde::Deserialize;

/// Response of `POST /identity/v1/oauth2/token`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Envelope of `getCategoryTree` and `getCategorySubtree`.
///
/// The full tree arrives as `rootCategoryNode`, a subtree as
/// `categorySubtreeNode`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CategoryTreeEnvelope {
    #[serde(default)]
    pub category_tree_id: Option<String>,
    #[serde(default)]
    pub category_tree_version: Option<String>,
    #[serde(
        default,
        rename = "rootCategoryNode",
        alias = "categorySubtreeNode",
        alias = "categoryTreeNode"
    )]
    pub node: Option<CategoryNode>,
}

/// Response of `getDefaultCategoryTreeId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DefaultTreeIdResponse {
    pub category_tree_id: String,
}

/// One `<Category>` of a Trading API `GetCategories` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradingCategory {
    pub category_id: String,
    pub category_name: String,
    /// `None` for top-level categories, which eBay reports as their own parent.
    pub parent_id: Option<String>,
    pub level: u32,
    pub leaf: bool,
}

/// One `<SuggestedCategory>` of a `GetSuggestedCategories` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestedCategory {
    pub category_id: String,
    pub category_name: String,
    /// Ancestor ids, root first.
    pub parent_ids: Vec<String>,
    /// Ancestor names, root first.
    pub parent_names: Vec<String>,
    /// `LeafCategory` as reported by eBay; `None` when the element is absent.
    pub leaf: Option<bool>,
    pub percent_item_found: Option<u32>,
}

impl SuggestedCategory {
    /// Suggestions without a `LeafCategory` element are treated as leaves.
    #[must_use]
    pub fn into_info(self) -> CategoryInfo {
        let mut path = self.parent_names;
        path.push(self.category_name.clone());
        CategoryInfo {
            category_id: self.category_id,
            category_name: self.category_name,
            leaf: self.leaf.unwrap_or(true),
            parent_id: self.parent_ids.last().cloned(),
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_tree_envelope_decodes_root_node() {
        let body = serde_json::json!({
            "categoryTreeId": "0",
            "categoryTreeVersion": "130",
            "rootCategoryNode": {
                "category": { "categoryId": "0", "categoryName": "Root" },
                "childCategoryTreeNodes": [
                    { "category": { "categoryId": "6000", "categoryName": "eBay Motors" } }
                ]
            }
        });
        let envelope: CategoryTreeEnvelope = serde_json::from_value(body).expect("decode");
        let node = envelope.node.expect("node present");
        assert_eq!(node.category_id, "0");
        assert_eq!(node.children.len(), 1);
        assert!(node.children[0].is_leaf());
        assert_eq!(envelope.category_tree_version.as_deref(), Some("130"));
    }

    #[test]
    fn subtree_envelope_decodes_subtree_node() {
        let body = serde_json::json!({
            "categoryTreeId": "0",
            "categorySubtreeNode": {
                "category": { "categoryId": "6000", "categoryName": "eBay Motors" },
                "childCategoryTreeNodes": []
            }
        });
        let envelope: CategoryTreeEnvelope = serde_json::from_value(body).expect("decode");
        assert_eq!(envelope.node.expect("node").category_id, "6000");
    }

    #[test]
    fn envelope_without_node_decodes_to_none() {
        let envelope: CategoryTreeEnvelope =
            serde_json::from_value(serde_json::json!({ "categoryTreeId": "0" })).expect("decode");
        assert!(envelope.node.is_none());
    }

    #[test]
    fn suggestion_path_runs_root_to_self() {
        let suggestion = SuggestedCategory {
            category_id: "33615".to_string(),
            category_name: "Brakes".to_string(),
            parent_ids: vec!["6000".to_string(), "6028".to_string()],
            parent_names: vec!["eBay Motors".to_string(), "Parts & Accessories".to_string()],
            leaf: None,
            percent_item_found: Some(62),
        };
        let info = suggestion.into_info();
        assert_eq!(info.path, vec!["eBay Motors", "Parts & Accessories", "Brakes"]);
        assert_eq!(info.parent_id.as_deref(), Some("6028"));
        assert!(info.leaf);
    }

    #[test]
    fn suggestion_keeps_non_leaf_flag() {
        let suggestion = SuggestedCategory {
            category_id: "6028".to_string(),
            category_name: "Parts & Accessories".to_string(),
            parent_ids: vec!["6000".to_string()],
            parent_names: vec!["eBay Motors".to_string()],
            leaf: Some(false),
            percent_item_found: None,
        };
        assert!(!suggestion.into_info().leaf);
    }
}
