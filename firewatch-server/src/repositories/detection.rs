use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite};
use time::Date;

use super::day_bounds;
use crate::configs::Storage;
use crate::models::Detection;

#[derive(Clone)]
pub struct DetectionRepository {
    storage: Arc<Storage>,
}

impl DetectionRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl DetectionRepository {
    pub async fn create(&self, item: &Detection) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO detections (sensor_type, detected, confidence, sensor_timestamp, time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&item.sensor_type)
        .bind(item.detected)
        .bind(item.confidence)
        .bind(item.sensor_timestamp)
        .bind(item.time)
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Detection>, Error> {
        let detection: Option<Detection> = sqlx::query_as("SELECT * FROM detections WHERE id = $1")
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?;

        Ok(detection)
    }

    pub async fn find_recent(&self, limit: i64) -> Result<Vec<Detection>, Error> {
        let detections: Vec<Detection> =
            sqlx::query_as("SELECT * FROM detections ORDER BY time DESC, id DESC LIMIT $1")
                .bind(limit)
                .fetch_all(self.get_pool())
                .await?;

        Ok(detections)
    }

    pub async fn find_by_date(&self, date: Date) -> Result<Vec<Detection>, Error> {
        let (start, end) = day_bounds(date);
        let detections: Vec<Detection> = sqlx::query_as(
            r#"
            SELECT * FROM detections
            WHERE time >= $1 AND time < $2
            ORDER BY time DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.get_pool())
        .await?;

        Ok(detections)
    }
}
