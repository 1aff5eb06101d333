//! Category Model
//!
//! Categories form a tree stored as a materialized path: every row keeps the
//! chain of ids from the root down to itself (`/3/8/21/`). Subtree reads are
//! prefix matches on `path`, and moving a node rewrites the prefix of every
//! path below it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use super::double_option;

/// Category entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    /// Materialized path, e.g. `/1/4/`
    pub path: String,
    /// 0 for roots
    pub depth: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Minimal category reference (breadcrumbs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<&Category> for CategoryRef {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
        }
    }
}

/// Category with its ancestor chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    /// Root first, parent last
    pub ancestors: Vec<CategoryRef>,
    pub children_count: i64,
}

/// Tree node returned by the tree endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Average price over the active products of a category subtree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPriceStats {
    pub category: String,
    pub product_count: i64,
    pub average_price: Option<Decimal>,
}

/// Create category payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    /// Parent slug
    pub parent: Option<String>,
    pub is_active: Option<bool>,
}

/// Update category payload
///
/// `parent: null` moves the category to the root; an absent `parent` leaves
/// it where it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CategoryUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Materialized path helpers
pub mod path {
    /// Path of a root category
    pub fn root_path(id: i64) -> String {
        format!("/{id}/")
    }

    /// Path of a child placed under `parent_path`
    pub fn child_path(parent_path: &str, id: i64) -> String {
        format!("{parent_path}{id}/")
    }

    /// Ids along the path, root first (the node itself last)
    pub fn ids(path: &str) -> Vec<i64> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect()
    }

    /// Depth of the node (root = 0)
    pub fn depth(path: &str) -> i64 {
        (ids(path).len() as i64 - 1).max(0)
    }

    /// Ancestor ids, root first, excluding the node itself
    pub fn ancestor_ids(path: &str) -> Vec<i64> {
        let mut ids = ids(path);
        ids.pop();
        ids
    }

    /// True if `path` is `ancestor_path` itself or lies below it
    pub fn is_within(path: &str, ancestor_path: &str) -> bool {
        path.starts_with(ancestor_path)
    }

    /// Replace `old_prefix` with `new_prefix`; paths outside the subtree are
    /// returned unchanged.
    pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> String {
        match path.strip_prefix(old_prefix) {
            Some(rest) => format!("{new_prefix}{rest}"),
            None => path.to_string(),
        }
    }
}

/// Assemble a nested tree from a flat list.
///
/// Siblings are sorted by name. A category whose parent is not part of the
/// list (e.g. an inactive parent was filtered out) is promoted to a root.
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let present: std::collections::HashSet<i64> = categories.iter().map(|c| c.id).collect();

    let mut children_of: HashMap<Option<i64>, Vec<Category>> = HashMap::new();
    for cat in categories {
        let key = match cat.parent_id {
            Some(pid) if present.contains(&pid) => Some(pid),
            _ => None,
        };
        children_of.entry(key).or_default().push(cat);
    }

    fn attach(
        parent: Option<i64>,
        children_of: &mut HashMap<Option<i64>, Vec<Category>>,
    ) -> Vec<CategoryNode> {
        let mut level = children_of.remove(&parent).unwrap_or_default();
        level.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        level
            .into_iter()
            .map(|category| {
                let children = attach(Some(category.id), children_of);
                CategoryNode { category, children }
            })
            .collect()
    }

    attach(None, &mut children_of)
}
