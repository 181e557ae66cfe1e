use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Error, SqlitePool};

use crate::configs::schema::SchemaManager;
use crate::configs::settings::Database;

/// Shared SQLite pool. Repositories write through it directly.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(database: Database, schema_manager: SchemaManager) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(&database.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // An in-memory database lives as long as its last connection
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.prepare(&schema_manager, &database).await?;

        Ok(storage)
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn prepare(&self, schema: &SchemaManager, database: &Database) -> Result<(), Error> {
        if database.clean_start {
            let mut drops = vec![String::from("DROP TABLE IF EXISTS _sqlx_migrations;")];
            drops.extend(schema.dispose_schema());
            sqlx::query(&drops.join("\n")).execute(&self.pool).await?;

            tracing::warn!("clean start requested, schema dropped and recreated");
        }

        sqlx::query(&schema.create_schema().join("\n"))
            .execute(&self.pool)
            .await?;

        if let Some(migration_path) = &database.migration_path {
            Migrator::new(Path::new(migration_path))
                .await?
                .run(&self.pool)
                .await?;

            tracing::info!("migrations applied from {}", migration_path);
        }

        Ok(())
    }
}
