//! Category tree (materialized path)
//!
//! Every row stores `path` (`/1/4/9/`) and `depth`. Subtree reads use
//! `path LIKE '<prefix>%'`; moving a node rewrites the prefix of the whole
//! subtree inside one transaction.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::category::path;
use shared::models::{Category, CategoryCreate, CategoryPriceStats, CategoryRef, CategoryUpdate};
use shared::util::slugify;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::str::FromStr;

use crate::error::ServiceResult;
use crate::util::now_millis;

/// Slugs that collide with fixed routes under `/api/categories/`
pub const RESERVED_SLUGS: &[&str] = &["tree"];

const COLUMNS: &str =
    "id, name, slug, description, parent_id, path, depth, is_active, created_at, updated_at";

/// Flat listing options
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    /// Only direct children of this category
    pub parent_id: Option<i64>,
    /// Only roots
    pub roots_only: bool,
    pub include_inactive: bool,
}

pub async fn list(pool: &SqlitePool, filter: ListFilter) -> Result<Vec<Category>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM categories WHERE 1 = 1"));
    if let Some(parent_id) = filter.parent_id {
        qb.push(" AND parent_id = ").push_bind(parent_id);
    } else if filter.roots_only {
        qb.push(" AND parent_id IS NULL");
    }
    if !filter.include_inactive {
        qb.push(" AND is_active = 1");
    }
    qb.push(" ORDER BY path");
    qb.build_query_as::<Category>().fetch_all(pool).await
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories WHERE slug = ?"))
        .bind(slug)
        .fetch_optional(pool)
        .await
}

/// Like [`find_by_slug`] but a missing row is a `CategoryNotFound` error
pub async fn get_by_slug(pool: &SqlitePool, slug: &str) -> ServiceResult<Category> {
    find_by_slug(pool, slug).await?.ok_or_else(|| {
        AppError::new(ErrorCode::CategoryNotFound)
            .with_detail("slug", slug)
            .into()
    })
}

/// Ancestors of a category, root first
pub async fn ancestors(pool: &SqlitePool, category: &Category) -> Result<Vec<CategoryRef>, sqlx::Error> {
    let ids = path::ancestor_ids(&category.path);
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM categories WHERE id IN ("));
    let mut separated = qb.separated(", ");
    for id in &ids {
        separated.push_bind(*id);
    }
    qb.push(") ORDER BY depth");
    let rows = qb.build_query_as::<Category>().fetch_all(pool).await?;
    Ok(rows.iter().map(CategoryRef::from).collect())
}

pub async fn children_count(pool: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE parent_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Every category below `category` (the node itself excluded), ordered by path
pub async fn descendants(
    pool: &SqlitePool,
    category: &Category,
    include_inactive: bool,
) -> Result<Vec<Category>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM categories WHERE path LIKE "));
    qb.push_bind(format!("{}%", category.path))
        .push(" AND id <> ")
        .push_bind(category.id);
    if !include_inactive {
        qb.push(" AND is_active = 1");
    }
    qb.push(" ORDER BY path");
    qb.build_query_as::<Category>().fetch_all(pool).await
}

async fn find_by_id_in(conn: &mut SqliteConnection, id: i64) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Parent by slug on an open transaction
async fn parent_in(conn: &mut SqliteConnection, slug: &str) -> ServiceResult<Category> {
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories WHERE slug = ?"))
        .bind(slug)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::ParentCategoryNotFound)
                .with_detail("parent", slug)
                .into()
        })
}

/// Create a category under an optional parent slug
pub async fn create(pool: &SqlitePool, data: &CategoryCreate) -> ServiceResult<Category> {
    // Parent path and slug availability are read under the write lock
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    let parent = match data.parent.as_deref() {
        Some(slug) => Some(parent_in(&mut *tx, slug).await?),
        None => None,
    };
    let slug = super::unique_slug(&mut *tx, "categories", &slugify(&data.name), RESERVED_SLUGS).await?;
    let now = now_millis();

    let id = sqlx::query(
        "INSERT INTO categories (name, slug, description, parent_id, path, depth, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, '', 0, ?, ?, ?)",
    )
    .bind(data.name.trim())
    .bind(&slug)
    .bind(&data.description)
    .bind(parent.as_ref().map(|p| p.id))
    .bind(data.is_active.unwrap_or(true))
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| super::slug_conflict(e, &slug))?
    .last_insert_rowid();

    let node_path = match &parent {
        Some(p) => path::child_path(&p.path, id),
        None => path::root_path(id),
    };
    sqlx::query("UPDATE categories SET path = ?, depth = ? WHERE id = ?")
        .bind(&node_path)
        .bind(path::depth(&node_path))
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let created = sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories WHERE id = ?"))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(id, slug = %created.slug, path = %created.path, "Category created");
    Ok(created)
}

/// Apply a partial update. A parent change moves the whole subtree.
///
/// The write lock is taken up front (`BEGIN IMMEDIATE`) and the node and
/// its new parent are re-read under it, so concurrent moves see each
/// other's paths and cannot form a cycle.
pub async fn update(
    pool: &SqlitePool,
    current: &Category,
    data: &CategoryUpdate,
) -> ServiceResult<Category> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    let current = find_by_id_in(&mut *tx, current.id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::CategoryNotFound).with_detail("slug", current.slug.as_str())
    })?;

    let new_parent: Option<Option<Category>> = match &data.parent {
        None => None,
        Some(None) => Some(None),
        Some(Some(slug)) => {
            let parent = parent_in(&mut *tx, slug).await?;
            if path::is_within(&parent.path, &current.path) {
                return Err(AppError::with_message(
                    ErrorCode::CategoryCycle,
                    "A category cannot be moved under itself or one of its descendants",
                )
                .with_detail("category", current.slug.as_str())
                .with_detail("parent", slug.as_str())
                .into());
            }
            Some(Some(parent))
        }
    };

    let now = now_millis();
    let name = data.name.as_deref().map(str::trim).unwrap_or(&current.name);
    let description = match &data.description {
        Some(d) => d.clone(),
        None => current.description.clone(),
    };
    let is_active = data.is_active.unwrap_or(current.is_active);

    sqlx::query("UPDATE categories SET name = ?, description = ?, is_active = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(&description)
        .bind(is_active)
        .bind(now)
        .bind(current.id)
        .execute(&mut *tx)
        .await?;

    if let Some(parent) = new_parent {
        let new_path = match &parent {
            Some(p) => path::child_path(&p.path, current.id),
            None => path::root_path(current.id),
        };
        if new_path != current.path {
            let depth_delta = path::depth(&new_path) - current.depth;
            // Prefix rewrite of the node and everything below it
            let moved = sqlx::query(
                "UPDATE categories
                    SET path = ? || substr(path, ?), depth = depth + ?, updated_at = ?
                    WHERE path LIKE ?",
            )
            .bind(&new_path)
            .bind(current.path.len() as i64 + 1)
            .bind(depth_delta)
            .bind(now)
            .bind(format!("{}%", current.path))
            .execute(&mut *tx)
            .await?
            .rows_affected();

            tracing::info!(
                id = current.id,
                from = %current.path,
                to = %new_path,
                moved,
                "Category subtree moved"
            );
        }
        sqlx::query("UPDATE categories SET parent_id = ? WHERE id = ?")
            .bind(parent.as_ref().map(|p| p.id))
            .bind(current.id)
            .execute(&mut *tx)
            .await?;
    }

    let updated = find_by_id_in(&mut *tx, current.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    tx.commit().await?;
    Ok(updated)
}

/// Delete an empty category (no children, no products)
pub async fn delete(pool: &SqlitePool, category: &Category) -> ServiceResult<()> {
    let children = children_count(pool, category.id).await?;
    if children > 0 {
        return Err(AppError::new(ErrorCode::CategoryHasChildren)
            .with_detail("children", children)
            .into());
    }

    let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?")
        .bind(category.id)
        .fetch_one(pool)
        .await?;
    if products > 0 {
        return Err(AppError::new(ErrorCode::CategoryHasProducts)
            .with_detail("products", products)
            .into());
    }

    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(category.id)
        .execute(pool)
        .await?;
    tracing::info!(id = category.id, slug = %category.slug, "Category deleted");
    Ok(())
}

/// Average price of the active products in the category subtree
pub async fn price_stats(pool: &SqlitePool, category: &Category) -> ServiceResult<CategoryPriceStats> {
    let prices: Vec<String> = sqlx::query_scalar(
        "SELECT p.price FROM products p
            JOIN categories c ON c.id = p.category_id
            WHERE c.path LIKE ? AND p.is_active = 1",
    )
    .bind(format!("{}%", category.path))
    .fetch_all(pool)
    .await?;

    let mut sum = Decimal::ZERO;
    for raw in &prices {
        sum += Decimal::from_str(raw)
            .map_err(|e| AppError::internal(format!("Corrupt price {raw:?}: {e}")))?;
    }
    let count = prices.len() as i64;
    let average_price = (count > 0).then(|| shared::util::round_money(sum / Decimal::from(count)));

    Ok(CategoryPriceStats {
        category: category.name.clone(),
        product_count: count,
        average_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SqlitePool {
        let pool = crate::db::connect("sqlite::memory:").await.unwrap();
        crate::db::migrate(&pool).await.unwrap();
        pool
    }

    fn new_cat(name: &str, parent: Option<&str>) -> CategoryCreate {
        CategoryCreate {
            name: name.into(),
            description: None,
            parent: parent.map(String::from),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_paths() {
        let pool = pool().await;
        let root = create(&pool, &new_cat("Electronics", None)).await.unwrap();
        let child = create(&pool, &new_cat("Phones", Some("electronics"))).await.unwrap();
        let leaf = create(&pool, &new_cat("Smartphones", Some("phones"))).await.unwrap();

        assert_eq!(root.path, format!("/{}/", root.id));
        assert_eq!(child.path, format!("/{}/{}/", root.id, child.id));
        assert_eq!(leaf.depth, 2);
        assert_eq!(leaf.parent_id, Some(child.id));

        let crumbs = ancestors(&pool, &leaf).await.unwrap();
        let names: Vec<_> = crumbs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Electronics", "Phones"]);
    }

    #[tokio::test]
    async fn test_slug_dedup_and_reserved_words() {
        let pool = pool().await;
        let a = create(&pool, &new_cat("Audio", None)).await.unwrap();
        let b = create(&pool, &new_cat("Audio", None)).await.unwrap();
        let c = create(&pool, &new_cat("audio!", None)).await.unwrap();
        let t = create(&pool, &new_cat("Tree", None)).await.unwrap();
        assert_eq!(a.slug, "audio");
        assert_eq!(b.slug, "audio-2");
        assert_eq!(c.slug, "audio-3");
        assert_eq!(t.slug, "tree-2");
    }

    #[tokio::test]
    async fn test_move_subtree_rewrites_paths() {
        let pool = pool().await;
        let a = create(&pool, &new_cat("A", None)).await.unwrap();
        let b = create(&pool, &new_cat("B", None)).await.unwrap();
        let a1 = create(&pool, &new_cat("A1", Some("a"))).await.unwrap();
        let a11 = create(&pool, &new_cat("A11", Some("a1"))).await.unwrap();

        let update_data = CategoryUpdate {
            parent: Some(Some("b".into())),
            ..Default::default()
        };
        let moved = update(&pool, &a1, &update_data).await.unwrap();
        assert_eq!(moved.path, format!("/{}/{}/", b.id, a1.id));
        assert_eq!(moved.parent_id, Some(b.id));

        let leaf = find_by_slug(&pool, &a11.slug).await.unwrap().unwrap();
        assert_eq!(leaf.path, format!("/{}/{}/{}/", b.id, a1.id, a11.id));
        assert_eq!(leaf.depth, 2);
        assert!(descendants(&pool, &a, true).await.unwrap().is_empty());

        // back to root
        let to_root = CategoryUpdate {
            parent: Some(None),
            ..Default::default()
        };
        let root = update(&pool, &moved, &to_root).await.unwrap();
        assert_eq!(root.path, format!("/{}/", a1.id));
        assert_eq!(root.parent_id, None);
        let leaf = find_by_slug(&pool, &a11.slug).await.unwrap().unwrap();
        assert_eq!(leaf.depth, 1);
    }

    #[tokio::test]
    async fn test_move_under_descendant_is_a_cycle() {
        let pool = pool().await;
        let a = create(&pool, &new_cat("A", None)).await.unwrap();
        create(&pool, &new_cat("A1", Some("a"))).await.unwrap();

        for target in ["a", "a1"] {
            let data = CategoryUpdate {
                parent: Some(Some(target.into())),
                ..Default::default()
            };
            let err: AppError = update(&pool, &a, &data).await.unwrap_err().into();
            assert_eq!(err.code, ErrorCode::CategoryCycle);
        }
    }

    /// File database so several connections write concurrently
    async fn file_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let url = format!("sqlite://{}", dir.path().join("store.db").display());
        let pool = crate::db::connect(&url).await.unwrap();
        crate::db::migrate(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_concurrent_cross_moves_cannot_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir).await;
        let a = create(&pool, &new_cat("A", None)).await.unwrap();
        let b = create(&pool, &new_cat("B", None)).await.unwrap();

        let under = |slug: &str| CategoryUpdate {
            parent: Some(Some(slug.into())),
            ..Default::default()
        };
        let (to_b, to_a) = (under("b"), under("a"));
        let (a_under_b, b_under_a) = tokio::join!(
            update(&pool, &a, &to_b),
            update(&pool, &b, &to_a),
        );
        let failures: Vec<AppError> = [a_under_b, b_under_a]
            .into_iter()
            .filter_map(|r| r.err().map(AppError::from))
            .collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].code, ErrorCode::CategoryCycle);

        let a = find_by_slug(&pool, "a").await.unwrap().unwrap();
        let b = find_by_slug(&pool, "b").await.unwrap().unwrap();
        let roots = [&a, &b].iter().filter(|c| c.parent_id.is_none()).count();
        assert_eq!(roots, 1);
        for c in [&a, &b] {
            assert_eq!(c.depth, path::depth(&c.path));
            assert!(c.path.ends_with(&format!("/{}/", c.id)));
        }
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_distinct_slugs() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir).await;

        let data = new_cat("Audio", None);
        let (r1, r2, r3, r4) = tokio::join!(
            create(&pool, &data),
            create(&pool, &data),
            create(&pool, &data),
            create(&pool, &data),
        );
        let mut slugs: Vec<String> = [r1, r2, r3, r4].into_iter().map(|r| r.unwrap().slug).collect();
        slugs.sort();
        assert_eq!(slugs, ["audio", "audio-2", "audio-3", "audio-4"]);
    }

    #[tokio::test]
    async fn test_delete_requires_empty_category() {
        let pool = pool().await;
        let a = create(&pool, &new_cat("A", None)).await.unwrap();
        let a1 = create(&pool, &new_cat("A1", Some("a"))).await.unwrap();

        let err: AppError = delete(&pool, &a).await.unwrap_err().into();
        assert_eq!(err.code, ErrorCode::CategoryHasChildren);

        delete(&pool, &a1).await.unwrap();
        delete(&pool, &a).await.unwrap();
        assert!(find_by_slug(&pool, "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_price_stats_empty_subtree() {
        let pool = pool().await;
        let a = create(&pool, &new_cat("A", None)).await.unwrap();
        let stats = price_stats(&pool, &a).await.unwrap();
        assert_eq!(stats.product_count, 0);
        assert!(stats.average_price.is_none());
    }
}
