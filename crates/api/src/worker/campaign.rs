//! Campaign delivery engine.
//!
//! Drives a campaign from `draft` through `sending` to a terminal status:
//! snapshots the verified subscriber set, fans out rate-limited sends with
//! retries, writes one log row per attempted recipient, flushes progress
//! counters in batches, journals lifecycle events and honors cooperative
//! cancellation at every suspension point.

use domain::models::{Campaign, CampaignStatus, JournalKind, LogOutcome, Subscriber};
use persistence::repositories::{CampaignRepository, SubscriberRepository};
use persistence::StoreError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::SendingConfig;
use crate::services::email::Mailer;

/// Error returned when starting a campaign send.
#[derive(Debug, Error)]
pub enum SendCampaignError {
    #[error("campaign is already being sent")]
    AlreadySending,

    #[error("campaign is not in draft status")]
    WrongStatus,

    #[error("no verified subscribers to send to")]
    NoRecipients,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error returned when cancelling a campaign that is not in flight.
#[derive(Debug, Error)]
#[error("campaign is not currently sending")]
pub struct NotSendingError;

type SendingRegistry = Arc<Mutex<HashMap<i64, CancellationToken>>>;

/// Removes a campaign from the sending registry when the send finishes,
/// on every exit path.
struct RegistryGuard {
    campaign_id: i64,
    registry: SendingRegistry,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry
            .lock()
            .expect("sending registry lock poisoned")
            .remove(&self.campaign_id);
    }
}

/// Replaces `{{name}}` and `{{email}}` in text. Every occurrence is
/// replaced, left to right, non-recursively.
pub fn replace_template_vars(text: &str, name: &str, email: &str) -> String {
    text.replace("{{name}}", name).replace("{{email}}", email)
}

/// Terminal status rule: cancellation wins, then `failed` only when not a
/// single message went out, `sent` otherwise (including mixed outcomes).
fn terminal_status(cancelled: bool, sent: i64, failed: i64) -> CampaignStatus {
    if cancelled {
        CampaignStatus::Cancelled
    } else if failed > 0 && sent == 0 {
        CampaignStatus::Failed
    } else {
        CampaignStatus::Sent
    }
}

/// The campaign delivery engine.
///
/// Cloning is cheap; all clones share one sending registry.
#[derive(Clone)]
pub struct CampaignWorker {
    campaigns: CampaignRepository,
    subscribers: SubscriberRepository,
    mailer: Arc<dyn Mailer>,
    config: SendingConfig,
    public_url: String,
    sending: SendingRegistry,
}

impl CampaignWorker {
    pub fn new(
        campaigns: CampaignRepository,
        subscribers: SubscriberRepository,
        mailer: Arc<dyn Mailer>,
        config: SendingConfig,
        public_url: &str,
    ) -> Self {
        CampaignWorker {
            campaigns,
            subscribers,
            mailer,
            config,
            public_url: public_url.trim_end_matches('/').to_string(),
            sending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts sending a campaign to all verified subscribers.
    ///
    /// Claims the campaign in the sending registry, snapshots the
    /// recipient set, transitions the campaign to `sending` and spawns the
    /// delivery loop. Returns once the transition is persisted; the loop
    /// runs in the background.
    pub async fn send(&self, campaign_id: i64) -> Result<(), SendCampaignError> {
        let cancel = CancellationToken::new();
        {
            let mut sending = self.sending.lock().expect("sending registry lock poisoned");
            if sending.contains_key(&campaign_id) {
                return Err(SendCampaignError::AlreadySending);
            }
            sending.insert(campaign_id, cancel.clone());
        }
        let guard = RegistryGuard {
            campaign_id,
            registry: Arc::clone(&self.sending),
        };

        let campaign = match self.campaigns.by_id(campaign_id).await {
            Ok(campaign) => campaign,
            Err(err) => {
                self.journal(
                    campaign_id,
                    JournalKind::Error,
                    &format!("Failed to get campaign: {err}"),
                )
                .await;
                return Err(err.into());
            }
        };

        if campaign.status != CampaignStatus::Draft {
            self.journal(
                campaign_id,
                JournalKind::Error,
                "Campaign is not in draft status",
            )
            .await;
            return Err(SendCampaignError::WrongStatus);
        }

        let recipients = match self.subscribers.all_verified().await {
            Ok(recipients) => recipients,
            Err(err) => {
                self.journal(
                    campaign_id,
                    JournalKind::Error,
                    &format!("Failed to get subscribers: {err}"),
                )
                .await;
                return Err(err.into());
            }
        };

        if recipients.is_empty() {
            self.journal(
                campaign_id,
                JournalKind::Error,
                "No verified subscribers to send to",
            )
            .await;
            return Err(SendCampaignError::NoRecipients);
        }

        self.journal(
            campaign_id,
            JournalKind::Info,
            &format!("Started sending to {} subscribers", recipients.len()),
        )
        .await;

        if let Err(err) = self
            .campaigns
            .update_status(campaign_id, CampaignStatus::Sending)
            .await
        {
            self.journal(
                campaign_id,
                JournalKind::Error,
                &format!("Failed to update status: {err}"),
            )
            .await;
            return Err(err.into());
        }

        let total = recipients.len() as i64;
        if let Err(err) = self.campaigns.update_counters(campaign_id, total, 0, 0).await {
            warn!(campaign_id, error = %err, "failed to reset campaign counters");
        }

        let worker = self.clone();
        tokio::spawn(async move {
            worker.run(guard, campaign, recipients, cancel).await;
        });

        Ok(())
    }

    /// Signals cancellation to a campaign currently in flight.
    pub fn cancel(&self, campaign_id: i64) -> Result<(), NotSendingError> {
        let sending = self.sending.lock().expect("sending registry lock poisoned");
        match sending.get(&campaign_id) {
            Some(token) => {
                token.cancel();
                Ok(())
            }
            None => Err(NotSendingError),
        }
    }

    /// True while the campaign is registered as sending.
    pub fn is_sending(&self, campaign_id: i64) -> bool {
        self.sending
            .lock()
            .expect("sending registry lock poisoned")
            .contains_key(&campaign_id)
    }

    /// The recipient loop. The registry guard is dropped when this
    /// returns, after the terminal status has been persisted.
    async fn run(
        &self,
        _guard: RegistryGuard,
        campaign: Campaign,
        recipients: Vec<Subscriber>,
        cancel: CancellationToken,
    ) {
        let total = recipients.len() as i64;
        let mut sent: i64 = 0;
        let mut failed: i64 = 0;
        let mut cancelled = false;

        let period = Duration::from_secs_f64(1.0 / f64::from(self.config.rate_limit));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for subscriber in &recipients {
            // Rate-limit gate, raced against cancellation.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                }
                _ = ticker.tick() => {}
            }
            if cancelled {
                self.journal_cancelled(campaign.id, sent, failed, total).await;
                break;
            }

            let subject =
                replace_template_vars(&campaign.subject, &subscriber.name, &subscriber.email);
            let body_text =
                replace_template_vars(&campaign.body_text, &subscriber.name, &subscriber.email);
            let body_html = campaign
                .body_html
                .as_deref()
                .map(|html| replace_template_vars(html, &subscriber.name, &subscriber.email));
            let unsubscribe_url = format!(
                "{}/api/unsubscribe/{}",
                self.public_url, subscriber.unsubscribe_token
            );

            let mut attempt_result = Ok(());
            for attempt in 0..=self.config.max_retries {
                attempt_result = self
                    .mailer
                    .send_campaign(
                        &cancel,
                        &subscriber.email,
                        &subscriber.name,
                        &subject,
                        &body_text,
                        body_html.as_deref(),
                        &unsubscribe_url,
                    )
                    .await;
                if attempt_result.is_ok() || cancel.is_cancelled() {
                    break;
                }
                if attempt < self.config.max_retries {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.config.retry_delay()) => {}
                    }
                }
            }

            // A recipient interrupted by cancellation gets no log row and
            // no counter increment.
            if cancel.is_cancelled() {
                cancelled = true;
                self.journal_cancelled(campaign.id, sent, failed, total).await;
                break;
            }

            let (outcome, error_text) = match &attempt_result {
                Ok(()) => (LogOutcome::Sent, None),
                Err(err) => (LogOutcome::Failed, Some(err.to_string())),
            };
            if let Err(err) = self
                .campaigns
                .append_log(campaign.id, subscriber.id, outcome, error_text.as_deref())
                .await
            {
                warn!(
                    campaign_id = campaign.id,
                    subscriber_id = subscriber.id,
                    error = %err,
                    "failed to append campaign log"
                );
            }
            match outcome {
                LogOutcome::Sent => sent += 1,
                LogOutcome::Failed => failed += 1,
            }

            if (sent + failed) % i64::from(self.config.batch_size) == 0 {
                if let Err(err) = self
                    .campaigns
                    .update_counters(campaign.id, total, sent, failed)
                    .await
                {
                    warn!(campaign_id = campaign.id, error = %err, "failed to flush campaign counters");
                }
            }
        }

        if let Err(err) = self
            .campaigns
            .update_counters(campaign.id, total, sent, failed)
            .await
        {
            warn!(campaign_id = campaign.id, error = %err, "failed to flush final campaign counters");
        }

        let status = terminal_status(cancelled, sent, failed);
        if let Err(err) = self.campaigns.update_status(campaign.id, status).await {
            self.journal(
                campaign.id,
                JournalKind::Error,
                &format!("Failed to update final status: {err}"),
            )
            .await;
            error!(
                campaign_id = campaign.id,
                error = %err,
                "failed to persist terminal campaign status"
            );
            return;
        }

        match status {
            CampaignStatus::Cancelled => {
                info!(campaign_id = campaign.id, sent, failed, "campaign cancelled");
            }
            _ if failed == 0 => {
                self.journal(
                    campaign.id,
                    JournalKind::Success,
                    &format!("Completed: {sent} emails sent successfully"),
                )
                .await;
                info!(campaign_id = campaign.id, sent, failed, "campaign completed");
            }
            _ if sent == 0 => {
                self.journal(
                    campaign.id,
                    JournalKind::Error,
                    &format!("Failed: all {failed} emails failed to send"),
                )
                .await;
                info!(campaign_id = campaign.id, sent, failed, "campaign completed");
            }
            _ => {
                self.journal(
                    campaign.id,
                    JournalKind::Warning,
                    &format!("Completed with errors: {sent} sent, {failed} failed"),
                )
                .await;
                info!(campaign_id = campaign.id, sent, failed, "campaign completed");
            }
        }
    }

    async fn journal_cancelled(&self, campaign_id: i64, sent: i64, failed: i64, total: i64) {
        let remaining = total - sent - failed;
        self.journal(
            campaign_id,
            JournalKind::Warning,
            &format!("Cancelled: {sent} sent, {failed} failed, {remaining} remaining"),
        )
        .await;
    }

    /// Journal writes are best-effort; a store failure never fails the
    /// campaign.
    async fn journal(&self, campaign_id: i64, kind: JournalKind, message: &str) {
        if let Err(err) = self.campaigns.append_journal(campaign_id, kind, message).await {
            warn!(campaign_id, error = %err, "failed to append journal entry");
        }
    }
}
