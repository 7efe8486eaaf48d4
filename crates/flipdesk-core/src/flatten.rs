//! Flattening of a nested taxonomy tree into storable category records.

use std::collections::HashSet;

use thiserror::Error;

use crate::categories::{CategoryNode, CategoryRecord};

/// A category id appeared twice while walking the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed category tree: category {category_id} appears more than once")]
pub struct MalformedTree {
    pub category_id: String,
}

/// Flattens `root` into one record per node, parents before children.
///
/// # Errors
///
/// Returns [`MalformedTree`] if a category id repeats.
pub fn flatten(root: &CategoryNode) -> Result<Vec<CategoryRecord>, MalformedTree> {
    flatten_under(root, None)
}

/// Flattens a subtree whose root hangs below `parent_id`.
///
/// Traversal is depth-first pre-order with an explicit stack: each record is
/// emitted before any of its children, and siblings keep their API order.
///
/// # Errors
///
/// Returns [`MalformedTree`] if a category id repeats.
pub fn flatten_under(
    root: &CategoryNode,
    parent_id: Option<&str>,
) -> Result<Vec<CategoryRecord>, MalformedTree> {
    let mut records = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<(&CategoryNode, Option<&str>)> = vec![(root, parent_id)];

    while let Some((node, parent)) = stack.pop() {
        if !seen.insert(node.category_id.as_str()) {
            return Err(MalformedTree {
                category_id: node.category_id.clone(),
            });
        }

        records.push(CategoryRecord {
            ebay_category_id: node.category_id.clone(),
            category_name: node.category_name.clone(),
            parent_ebay_category_id: parent.map(str::to_string),
            leaf_category: node.is_leaf(),
            is_active: true,
        });

        // Reversed so the first child is popped next.
        for child in node.children.iter().rev() {
            stack.push((child, Some(node.category_id.as_str())));
        }
    }

    Ok(records)
}
