use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite};
use time::{Duration, OffsetDateTime};

use crate::configs::Storage;
use crate::models::CapturedImage;

#[derive(Clone)]
pub struct CapturedImageRepository {
    storage: Arc<Storage>,
}

impl CapturedImageRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl CapturedImageRepository {
    pub async fn create(&self, item: &CapturedImage) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO captured_images
                (alert_id, file_path, file_name, image_size, width, height, chunks_total, capture_trigger, capture_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(item.alert_id)
        .bind(&item.file_path)
        .bind(&item.file_name)
        .bind(item.image_size)
        .bind(item.width)
        .bind(item.height)
        .bind(item.chunks_total)
        .bind(item.capture_trigger.as_str())
        .bind(item.capture_time)
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<CapturedImage>, Error> {
        let image: Option<CapturedImage> =
            sqlx::query_as("SELECT * FROM captured_images WHERE id = $1")
                .bind(id)
                .fetch_optional(self.get_pool())
                .await?;

        Ok(image)
    }

    pub async fn find_by_alert(&self, alert_id: i32) -> Result<Vec<CapturedImage>, Error> {
        let images: Vec<CapturedImage> = sqlx::query_as(
            "SELECT * FROM captured_images WHERE alert_id = $1 ORDER BY capture_time DESC",
        )
        .bind(alert_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(images)
    }

    pub async fn find_recent(&self, limit: i64) -> Result<Vec<CapturedImage>, Error> {
        let images: Vec<CapturedImage> = sqlx::query_as(
            "SELECT * FROM captured_images ORDER BY capture_time DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.get_pool())
        .await?;

        Ok(images)
    }

    /// Drops records captured more than `days` ago. Files on disk are left alone.
    pub async fn delete_older_than(&self, days: i64) -> Result<u64, Error> {
        let threshold = OffsetDateTime::now_utc() - Duration::days(days);
        let deleted = sqlx::query("DELETE FROM captured_images WHERE capture_time < $1")
            .bind(threshold)
            .execute(self.get_pool())
            .await?
            .rows_affected();

        Ok(deleted)
    }
}
