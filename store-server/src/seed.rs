//! Demo data
//!
//! `run` is idempotent: the catalog is only loaded into an empty category
//! table and the demo customer only when its email is unused.

use rust_decimal::Decimal;
use shared::models::{CategoryCreate, CustomerCreate, ProductCreate};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::util::{hash_password, normalize_email};

const DEMO_EMAIL: &str = "demo@anthonystore.local";
const DEMO_PASSWORD: &str = "demo12345";

/// (name, parent name, description)
const CATEGORIES: &[(&str, Option<&str>, &str)] = &[
    ("Electronics", None, "Phones, computers and audio"),
    ("Laptops", Some("Electronics"), "Notebooks and ultrabooks"),
    ("Phones", Some("Electronics"), "Smartphones and feature phones"),
    ("Audio", Some("Electronics"), "Headphones and speakers"),
    ("Clothing", None, "Apparel for everyone"),
    ("Men", Some("Clothing"), "Menswear"),
    ("Women", Some("Clothing"), "Womenswear"),
    ("Home & Kitchen", None, "Cookware and appliances"),
];

/// (name, sku, price cents, category name, stock)
const PRODUCTS: &[(&str, &str, i64, &str, i64)] = &[
    ("UltraBook 14", "LAP-001", 8999900, "Laptops", 12),
    ("WorkStation 16", "LAP-002", 15499900, "Laptops", 4),
    ("Galaxy Lite", "PHN-001", 2450000, "Phones", 30),
    ("Pixel Pro", "PHN-002", 9800000, "Phones", 8),
    ("Studio Headphones", "AUD-001", 1250050, "Audio", 25),
    ("Bluetooth Speaker", "AUD-002", 650000, "Audio", 3),
    ("Cotton Shirt", "MEN-001", 180000, "Men", 60),
    ("Kitenge Dress", "WMN-001", 320000, "Women", 18),
    ("Non-stick Pan", "HOM-001", 240000, "Home & Kitchen", 40),
    ("Electric Kettle", "HOM-002", 350000, "Home & Kitchen", 0),
];

/// What a seed run actually wrote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub categories: usize,
    pub products: usize,
    pub demo_customer: bool,
}

/// Create a staff account, or promote an existing user and reset its
/// password. Returns `true` when a new account was created.
pub async fn ensure_admin(pool: &SqlitePool, email: &str, password: &str) -> anyhow::Result<bool> {
    let email = normalize_email(email);
    let hash = hash_password(password).map_err(|e| anyhow::anyhow!("hash password: {e}"))?;

    match db::users::find_credentials(pool, &email).await? {
        Some(existing) => {
            db::users::promote_to_staff(pool, existing.id, &hash).await?;
            tracing::info!(email = %email, "Existing user promoted to staff");
            Ok(false)
        }
        None => {
            let id = db::users::insert(pool, &email, &hash, true).await?;
            tracing::info!(id, email = %email, "Staff user created");
            Ok(true)
        }
    }
}

async fn seed_catalog(pool: &SqlitePool, report: &mut SeedReport) -> anyhow::Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        tracing::info!(existing, "Catalog already present, skipping");
        return Ok(());
    }

    let mut slugs = std::collections::HashMap::new();
    for (name, parent, description) in CATEGORIES {
        let parent = match parent {
            Some(p) => Some(
                slugs
                    .get(p)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("parent {p} listed after its child"))?,
            ),
            None => None,
        };
        let category = db::categories::create(
            pool,
            &CategoryCreate {
                name: (*name).to_string(),
                description: Some((*description).to_string()),
                parent,
                is_active: None,
            },
        )
        .await?;
        slugs.insert(*name, category.slug);
        report.categories += 1;
    }

    for (name, sku, cents, category, stock) in PRODUCTS {
        let category = slugs
            .get(category)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown category {category}"))?;
        db::products::create(
            pool,
            &ProductCreate {
                name: (*name).to_string(),
                sku: (*sku).to_string(),
                description: None,
                price: Decimal::new(*cents, 2),
                category,
                stock: Some(*stock),
                is_active: None,
            },
        )
        .await?;
        report.products += 1;
    }
    Ok(())
}

async fn seed_demo_customer(pool: &SqlitePool) -> anyhow::Result<bool> {
    if db::users::email_exists(pool, DEMO_EMAIL).await? {
        return Ok(false);
    }
    let hash = hash_password(DEMO_PASSWORD).map_err(|e| anyhow::anyhow!("hash password: {e}"))?;

    let mut tx = pool.begin().await?;
    let user_id = db::users::insert(&mut *tx, DEMO_EMAIL, &hash, false).await?;
    db::customers::insert(
        &mut *tx,
        Some(user_id),
        &CustomerCreate {
            first_name: "Jane".into(),
            last_name: "Wanjiku".into(),
            email: DEMO_EMAIL.into(),
            phone: Some("+254700000001".into()),
            address: Some("Moi Avenue 12".into()),
            city: Some("Nairobi".into()),
            country: Some("Kenya".into()),
        },
    )
    .await?;
    tx.commit().await?;
    Ok(true)
}

/// Load the admin account, a category tree with products and a demo
/// customer
pub async fn run(pool: &SqlitePool, config: &Config) -> anyhow::Result<SeedReport> {
    let admin_password = config
        .seed_admin_password()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut report = SeedReport {
        admin_created: ensure_admin(pool, &config.admin_email, &admin_password).await?,
        ..Default::default()
    };
    seed_catalog(pool, &mut report).await?;
    report.demo_customer = seed_demo_customer(pool).await?;

    tracing::info!(
        admin_created = report.admin_created,
        categories = report.categories,
        products = report.products,
        demo_customer = report.demo_customer,
        "Seed finished"
    );
    Ok(report)
}
