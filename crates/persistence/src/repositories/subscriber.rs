//! Subscriber repository for database operations.

use chrono::Utc;
use domain::models::{Subscriber, SubscriberStatus};
use sqlx::SqlitePool;

use crate::entities::{SubscriberEntity, SubscriberStatusDb};
use crate::error::StoreError;

const SUBSCRIBER_COLUMNS: &str = "id, uuid, email, name, status, verify_token, \
     unsubscribe_token, created_at, verified_at, updated_at";

/// Input for inserting a subscriber. Row id and timestamps are filled
/// by the store.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub uuid: String,
    pub email: String,
    pub name: String,
    pub status: SubscriberStatus,
    pub verify_token: Option<String>,
    pub unsubscribe_token: String,
}

/// Repository for subscriber-related database operations.
#[derive(Clone)]
pub struct SubscriberRepository {
    pool: SqlitePool,
}

impl SubscriberRepository {
    /// Creates a new SubscriberRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new subscriber. Fails with [`StoreError::Duplicate`] if
    /// the email already exists (case-insensitively).
    pub async fn create(&self, new: NewSubscriber) -> Result<Subscriber, StoreError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, SubscriberEntity>(&format!(
            r#"
            INSERT INTO subscribers
                (uuid, email, name, status, verify_token, unsubscribe_token,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {SUBSCRIBER_COLUMNS}
            "#
        ))
        .bind(&new.uuid)
        .bind(&new.email)
        .bind(&new.name)
        .bind(SubscriberStatusDb::from(new.status))
        .bind(&new.verify_token)
        .bind(&new.unsubscribe_token)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Looks up a subscriber by external UUID.
    pub async fn by_uuid(&self, uuid: &str) -> Result<Subscriber, StoreError> {
        self.fetch_one_where("uuid = ?", uuid).await
    }

    /// Looks up a subscriber by email, case-insensitively.
    pub async fn by_email(&self, email: &str) -> Result<Subscriber, StoreError> {
        self.fetch_one_where("email = ?", email).await
    }

    /// Looks up a subscriber by verification token.
    pub async fn by_verify_token(&self, token: &str) -> Result<Subscriber, StoreError> {
        self.fetch_one_where("verify_token = ?", token).await
    }

    /// Looks up a subscriber by unsubscribe token.
    pub async fn by_unsubscribe_token(&self, token: &str) -> Result<Subscriber, StoreError> {
        self.fetch_one_where("unsubscribe_token = ?", token).await
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Subscriber, StoreError> {
        let row = sqlx::query_as::<_, SubscriberEntity>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE {clause}"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    /// Lists subscribers with optional status filter and offset paging,
    /// newest first. Returns the page and the total matching count
    /// before paging.
    pub async fn list(
        &self,
        status: Option<SubscriberStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Subscriber>, i64), StoreError> {
        let offset = (page - 1) * per_page;

        let (rows, total) = match status {
            Some(status) => {
                let status = SubscriberStatusDb::from(status);
                let total = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM subscribers WHERE status = ?",
                )
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

                let rows = sqlx::query_as::<_, SubscriberEntity>(&format!(
                    r#"
                    SELECT {SUBSCRIBER_COLUMNS} FROM subscribers
                    WHERE status = ?
                    ORDER BY created_at DESC, id DESC
                    LIMIT ? OFFSET ?
                    "#
                ))
                .bind(status)
                .bind(per_page)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                (rows, total)
            }
            None => {
                let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers")
                    .fetch_one(&self.pool)
                    .await?;

                let rows = sqlx::query_as::<_, SubscriberEntity>(&format!(
                    r#"
                    SELECT {SUBSCRIBER_COLUMNS} FROM subscribers
                    ORDER BY created_at DESC, id DESC
                    LIMIT ? OFFSET ?
                    "#
                ))
                .bind(per_page)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                (rows, total)
            }
        };

        Ok((rows.into_iter().map(Subscriber::from).collect(), total))
    }

    /// Updates a subscriber's status. `verified_at` is stamped on the
    /// first transition to `verified` and never overwritten.
    pub async fn update_status(
        &self,
        id: i64,
        status: SubscriberStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET status = ?,
                verified_at = CASE
                    WHEN ? = 'verified' AND verified_at IS NULL THEN ?
                    ELSE verified_at
                END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(SubscriberStatusDb::from(status))
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Hard-deletes a subscriber. Log rows cascade.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM subscribers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Returns every verified subscriber in deterministic snapshot order
    /// (oldest first). Campaign sends iterate this exact order.
    pub async fn all_verified(&self) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriberEntity>(&format!(
            r#"
            SELECT {SUBSCRIBER_COLUMNS} FROM subscribers
            WHERE status = 'verified'
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    /// Total number of subscribers.
    pub async fn count_all(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of subscribers in the given status.
    pub async fn count_by_status(&self, status: SubscriberStatus) -> Result<i64, StoreError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers WHERE status = ?")
                .bind(SubscriberStatusDb::from(status))
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
