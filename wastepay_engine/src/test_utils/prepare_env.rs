use chrono::NaiveDate;
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    db_types::{NewGarbageOrder, PickupOption},
    traits::PaymentGatewayDatabase,
    SqliteDatabase,
};

/// Creates a fresh, migrated database at `url` and returns a connection to it.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
    db
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/wastepay_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("Error dropping database {url}: {e:?}");
        }
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// Moves the creation time of an order back by `minutes`, so that it looks like it has been waiting for that long.
pub async fn backdate_order(db: &SqliteDatabase, order_id: i64, minutes: i64) {
    let modifier = format!("-{minutes} minutes");
    sqlx::query("UPDATE garbage_orders SET created_at = datetime('now', $1) WHERE id = $2")
        .bind(modifier)
        .bind(order_id)
        .execute(db.pool())
        .await
        .expect("Error backdating order");
}

/// Closes the connection pool and deletes the database file.
pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not drop {url}: {e}");
    }
}

/// A plain pickup order for the given group, split between `participants`.
pub fn new_order(group_id: i64, participants: Vec<i64>) -> NewGarbageOrder {
    NewGarbageOrder {
        group_id,
        pickup_option: PickupOption::Pickup,
        container_size: None,
        pickup_date: NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid date"),
        drop_off_date: None,
        is_high_priority: false,
        collecting_service: false,
        participants,
    }
}
