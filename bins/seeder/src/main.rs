//! Database seeder for Trellis development and testing.
//!
//! Seeds the eleven platform pool accounts plus a few demo users and
//! products so the settlement flows can be exercised locally.
//!
//! Usage: cargo run --bin seeder

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set,
};
use trellis_core::PoolAccount;
use trellis_db::entities::{finance_accounts, products, users};
use trellis_shared::AppConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = AppConfig::load().expect("Failed to load configuration");

    println!("Connecting to database...");
    let db = trellis_db::connect(&config.database)
        .await
        .expect("Failed to connect to database");

    println!("Seeding pool accounts...");
    seed_pool_accounts(&db).await;

    println!("Seeding demo users...");
    let merchant_id = seed_demo_users(&db).await;

    println!("Seeding demo products...");
    seed_demo_products(&db, merchant_id, config.settlement.member_product_price).await;

    println!("Seeding complete!");
}

/// Seeds one finance account per pool, skipping any that exist.
async fn seed_pool_accounts(db: &DatabaseConnection) {
    for pool in PoolAccount::all() {
        let existing = finance_accounts::Entity::find()
            .filter(finance_accounts::Column::AccountType.eq(pool.as_str()))
            .one(db)
            .await
            .ok()
            .flatten();
        if existing.is_some() {
            println!("  Pool {pool} already exists, skipping...");
            continue;
        }

        let account = finance_accounts::ActiveModel {
            id: NotSet,
            account_name: Set(pool.display_name().to_owned()),
            account_type: Set(pool.as_str().to_owned()),
            balance: Set(Decimal::ZERO),
            created_at: Set(Utc::now().into()),
        };
        match account.insert(db).await {
            Ok(_) => println!("  Created pool account: {pool}"),
            Err(e) => eprintln!("Failed to insert pool account {pool}: {e}"),
        }
    }
}

/// Seeds a demo buyer and a demo merchant; returns the merchant id.
async fn seed_demo_users(db: &DatabaseConnection) -> i64 {
    let buyer = seed_user(db, "13800138001", "Demo Buyer").await;
    let merchant = seed_user(db, "13800138004", "Demo Merchant").await;
    println!("  Demo buyer id: {buyer}, demo merchant id: {merchant}");
    merchant
}

async fn seed_user(db: &DatabaseConnection, mobile: &str, name: &str) -> i64 {
    if let Ok(Some(existing)) = users::Entity::find()
        .filter(users::Column::Mobile.eq(mobile))
        .one(db)
        .await
    {
        println!("  User {mobile} already exists, skipping...");
        return existing.id;
    }

    let now = Utc::now().into();
    let user = users::ActiveModel {
        id: NotSet,
        mobile: Set(mobile.to_owned()),
        name: Set(name.to_owned()),
        member_level: Set(0),
        points: Set(0),
        promotion_balance: Set(Decimal::ZERO),
        merchant_points: Set(0),
        merchant_balance: Set(Decimal::ZERO),
        status: Set(1),
        level_changed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match user.insert(db).await {
        Ok(created) => {
            println!("  Created user: {name} ({mobile})");
            created.id
        }
        Err(e) => {
            eprintln!("Failed to insert user {mobile}: {e}");
            0
        }
    }
}

/// Seeds the member product (platform-owned) and one normal product
/// sold by the demo merchant.
async fn seed_demo_products(db: &DatabaseConnection, merchant_id: i64, member_price: Decimal) {
    seed_product(db, "MEMBER-001", "Membership Package", member_price, true, 0).await;
    seed_product(
        db,
        "NORMAL-001",
        "Everyday Product",
        Decimal::new(500_00, 2),
        false,
        merchant_id,
    )
    .await;
}

async fn seed_product(
    db: &DatabaseConnection,
    sku: &str,
    name: &str,
    price: Decimal,
    is_member_product: bool,
    merchant_id: i64,
) {
    if product_exists(db, sku).await {
        println!("  Product {sku} already exists, skipping...");
        return;
    }

    let product = products::ActiveModel {
        id: NotSet,
        sku: Set(sku.to_owned()),
        name: Set(name.to_owned()),
        price: Set(price),
        stock: Set(10_000),
        is_member_product: Set(is_member_product),
        status: Set(1),
        merchant_id: Set(merchant_id),
        created_at: Set(Utc::now().into()),
    };
    match product.insert(db).await {
        Ok(_) => println!("  Created product: {sku} ({name})"),
        Err(e) => eprintln!("Failed to insert product {sku}: {e}"),
    }
}

async fn product_exists(db: &DatabaseConnection, sku: &str) -> bool {
    products::Entity::find()
        .filter(products::Column::Sku.eq(sku))
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
}
