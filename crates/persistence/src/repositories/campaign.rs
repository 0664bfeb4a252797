//! Campaign repository: campaigns, per-recipient logs and the journal.

use chrono::Utc;
use domain::models::{Campaign, CampaignJournal, CampaignLog, CampaignStatus, JournalKind, LogOutcome};
use sqlx::SqlitePool;

use crate::entities::{
    CampaignEntity, CampaignJournalEntity, CampaignLogEntity, CampaignStatusDb, JournalKindDb,
    LogOutcomeDb,
};
use crate::error::StoreError;

const CAMPAIGN_COLUMNS: &str = "id, uuid, subject, body_text, body_html, status, \
     total_count, sent_count, failed_count, created_at, started_at, completed_at";

/// Input for inserting a campaign. New campaigns always start in `draft`.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub uuid: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

/// Repository for campaign-related database operations.
#[derive(Clone)]
pub struct CampaignRepository {
    pool: SqlitePool,
}

impl CampaignRepository {
    /// Creates a new CampaignRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Campaigns
    // =========================================================================

    /// Inserts a new draft campaign.
    pub async fn create(&self, new: NewCampaign) -> Result<Campaign, StoreError> {
        let row = sqlx::query_as::<_, CampaignEntity>(&format!(
            r#"
            INSERT INTO campaigns (uuid, subject, body_text, body_html, status, created_at)
            VALUES (?, ?, ?, ?, 'draft', ?)
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(&new.uuid)
        .bind(&new.subject)
        .bind(&new.body_text)
        .bind(&new.body_html)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Looks up a campaign by internal row id.
    pub async fn by_id(&self, id: i64) -> Result<Campaign, StoreError> {
        let row = sqlx::query_as::<_, CampaignEntity>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    /// Looks up a campaign by external UUID.
    pub async fn by_uuid(&self, uuid: &str) -> Result<Campaign, StoreError> {
        let row = sqlx::query_as::<_, CampaignEntity>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE uuid = ?"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    /// Lists all campaigns, newest first.
    pub async fn list(&self) -> Result<Vec<Campaign>, StoreError> {
        let rows = sqlx::query_as::<_, CampaignEntity>(&format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS} FROM campaigns
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Campaign::from).collect())
    }

    /// Updates the editable fields of a campaign. Callers must ensure the
    /// campaign is still in `draft`.
    pub async fn update_fields(
        &self,
        id: i64,
        subject: &str,
        body_text: &str,
        body_html: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE campaigns SET subject = ?, body_text = ?, body_html = ? WHERE id = ?",
        )
        .bind(subject)
        .bind(body_text)
        .bind(body_html)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Updates a campaign's status. `started_at` is stamped on the first
    /// entry to `sending`; `completed_at` on entry to any terminal status.
    pub async fn update_status(&self, id: i64, status: CampaignStatus) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = ?,
                started_at = CASE
                    WHEN ? = 'sending' AND started_at IS NULL THEN ?
                    ELSE started_at
                END,
                completed_at = CASE
                    WHEN ? IN ('sent', 'failed', 'cancelled') THEN ?
                    ELSE completed_at
                END
            WHERE id = ?
            "#,
        )
        .bind(CampaignStatusDb::from(status))
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Overwrites the progress counters.
    pub async fn update_counters(
        &self,
        id: i64,
        total: i64,
        sent: i64,
        failed: i64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE campaigns SET total_count = ?, sent_count = ?, failed_count = ? WHERE id = ?",
        )
        .bind(total)
        .bind(sent)
        .bind(failed)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Hard-deletes a campaign. Logs and journal entries cascade.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Total number of campaigns.
    pub async fn count_all(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM campaigns")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of campaigns in the given status.
    pub async fn count_by_status(&self, status: CampaignStatus) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM campaigns WHERE status = ?")
            .bind(CampaignStatusDb::from(status))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Campaign logs
    // =========================================================================

    /// Appends one per-recipient delivery record. The store enforces at
    /// most one row per `(campaign, subscriber)` pair.
    pub async fn append_log(
        &self,
        campaign_id: i64,
        subscriber_id: i64,
        outcome: LogOutcome,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO campaign_logs (campaign_id, subscriber_id, outcome, error, sent_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(campaign_id)
        .bind(subscriber_id)
        .bind(LogOutcomeDb::from(outcome))
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns all delivery records for a campaign, newest first.
    pub async fn list_logs(&self, campaign_id: i64) -> Result<Vec<CampaignLog>, StoreError> {
        let rows = sqlx::query_as::<_, CampaignLogEntity>(
            r#"
            SELECT id, campaign_id, subscriber_id, outcome, error, sent_at
            FROM campaign_logs
            WHERE campaign_id = ?
            ORDER BY sent_at DESC, id DESC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CampaignLog::from).collect())
    }

    // =========================================================================
    // Campaign journal
    // =========================================================================

    /// Appends one lifecycle event to the journal.
    pub async fn append_journal(
        &self,
        campaign_id: i64,
        kind: JournalKind,
        message: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO campaign_journal (campaign_id, event_type, message, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(campaign_id)
        .bind(JournalKindDb::from(kind))
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the journal for a campaign, oldest first.
    pub async fn list_journal(
        &self,
        campaign_id: i64,
    ) -> Result<Vec<CampaignJournal>, StoreError> {
        let rows = sqlx::query_as::<_, CampaignJournalEntity>(
            r#"
            SELECT id, campaign_id, event_type, message, created_at
            FROM campaign_journal
            WHERE campaign_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CampaignJournal::from).collect())
    }
}
