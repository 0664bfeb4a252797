//! Integration tests for the campaign API and the delivery engine:
//! CRUD restrictions, the full send lifecycle, partial failures,
//! cancellation, double-send rejection, journal, settings and stats.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    authed_json_request, authed_request, body_json, create_test_app, wait_for_terminal,
    RecordingMailer, TEST_PUBLIC_URL,
};
use domain::models::{LogOutcome, SubscriberStatus};
use persistence::repositories::{
    CampaignRepository, NewSubscriber, SettingRepository, SubscriberRepository,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tinylist_api::app::create_app;
use tower::ServiceExt;
use uuid::Uuid;

/// Seeds one verified subscriber and returns its unsubscribe token.
async fn add_verified(pool: &SqlitePool, email: &str, name: &str) -> String {
    let subscribers = SubscriberRepository::new(pool.clone());
    let subscriber = subscribers
        .create(NewSubscriber {
            uuid: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            status: SubscriberStatus::Pending,
            verify_token: Some(Uuid::new_v4().to_string()),
            unsubscribe_token: Uuid::new_v4().to_string(),
        })
        .await
        .unwrap();
    subscribers
        .update_status(subscriber.id, SubscriberStatus::Verified)
        .await
        .unwrap();
    subscriber.unsubscribe_token
}

async fn create_draft(app: &axum::Router, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(authed_json_request(
            Method::POST,
            "/api/private/campaigns",
            body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn post_send(app: &axum::Router, id: &str) -> axum::response::Response {
    app.clone()
        .oneshot(authed_request(
            Method::POST,
            &format!("/api/private/campaigns/{id}/send"),
        ))
        .await
        .unwrap()
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn create_validates_subject_and_body() {
    let (app, _pool, _mailer) = create_test_app().await;

    let cases = [
        json!({"subject": "  ", "body_text": "Body"}),
        json!({"subject": "s".repeat(501), "body_text": "Body"}),
        json!({"subject": "Subject", "body_text": "   "}),
    ];
    for body in cases {
        let response = app
            .clone()
            .oneshot(authed_json_request(
                Method::POST,
                "/api/private/campaigns",
                body.clone(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn create_trims_fields_and_drops_empty_html() {
    let (app, _pool, _mailer) = create_test_app().await;

    let campaign = create_draft(
        &app,
        json!({"subject": "  Hello  ", "body_text": " Body ", "body_html": "   "}),
    )
    .await;
    assert_eq!(campaign["subject"], "Hello");
    assert_eq!(campaign["body_text"], "Body");
    assert!(campaign.get("body_html").is_none());
    assert_eq!(campaign["status"], "draft");
    assert_eq!(campaign["total_count"], 0);
}

#[tokio::test]
async fn update_and_delete_are_draft_only() {
    let (app, pool, _mailer) = create_test_app().await;

    let campaign = create_draft(&app, json!({"subject": "Hi", "body_text": "Body"})).await;
    let id = campaign["id"].as_str().unwrap().to_string();

    // Editing a draft works.
    let response = app
        .clone()
        .oneshot(authed_json_request(
            Method::PUT,
            &format!("/api/private/campaigns/{id}"),
            json!({"subject": "Updated"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["subject"], "Updated");
    assert_eq!(body["body_text"], "Body");

    // Force the campaign out of draft, then edit and delete must fail.
    let campaigns = CampaignRepository::new(pool);
    let row = campaigns.by_uuid(&id).await.unwrap();
    campaigns
        .update_status(row.id, domain::models::CampaignStatus::Sent)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(authed_json_request(
            Method::PUT,
            &format!("/api/private/campaigns/{id}"),
            json!({"subject": "Nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(authed_request(
            Method::DELETE,
            &format!("/api/private/campaigns/{id}"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_campaign_is_404() {
    let (app, _pool, _mailer) = create_test_app().await;

    let response = app
        .oneshot(authed_request(
            Method::GET,
            &format!("/api/private/campaigns/{}", Uuid::new_v4()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Send lifecycle
// ============================================================================

#[tokio::test]
async fn happy_path_send_substitutes_and_completes() {
    let (app, pool, mailer) = create_test_app().await;
    let unsubscribe_token = add_verified(&pool, "a@x.io", "Al").await;

    let campaign = create_draft(
        &app,
        json!({"subject": "Hi {{name}}", "body_text": "You are {{email}}"}),
    )
    .await;
    let id = campaign["id"].as_str().unwrap().to_string();

    let response = post_send(&app, &id).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "campaign sending started");
    assert_eq!(body["id"], id.as_str());

    let terminal = wait_for_terminal(&pool, &id).await;
    assert_eq!(terminal.status, domain::models::CampaignStatus::Sent);
    assert_eq!(terminal.total_count, 1);
    assert_eq!(terminal.sent_count, 1);
    assert_eq!(terminal.failed_count, 0);
    assert!(terminal.started_at.is_some());
    assert!(terminal.completed_at.is_some());

    let sends = mailer.campaign_sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].to, "a@x.io");
    assert_eq!(sends[0].subject, "Hi Al");
    assert!(sends[0].body_text.contains("You are a@x.io"));
    assert_eq!(
        sends[0].url.as_deref(),
        Some(format!("{TEST_PUBLIC_URL}/api/unsubscribe/{unsubscribe_token}").as_str())
    );

    let campaigns = CampaignRepository::new(pool);
    let logs = campaigns.list_logs(terminal.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].outcome, LogOutcome::Sent);
    assert!(logs[0].error.is_none());

    let journal = campaigns.list_journal(terminal.id).await.unwrap();
    let messages: Vec<_> = journal.iter().map(|entry| entry.message.as_str()).collect();
    assert_eq!(
        messages,
        [
            "Started sending to 1 subscribers",
            "Completed: 1 emails sent successfully",
        ]
    );
}

#[tokio::test]
async fn partial_failure_still_completes_as_sent() {
    let (app, pool, mailer) = create_test_app().await;
    for email in ["b1@x.io", "b2@x.io", "b3@x.io"] {
        add_verified(&pool, email, "").await;
    }
    mailer.fail_for("b2@x.io");

    let campaign = create_draft(&app, json!({"subject": "Hi", "body_text": "Body"})).await;
    let id = campaign["id"].as_str().unwrap().to_string();

    assert_eq!(post_send(&app, &id).await.status(), StatusCode::ACCEPTED);
    let terminal = wait_for_terminal(&pool, &id).await;

    assert_eq!(terminal.status, domain::models::CampaignStatus::Sent);
    assert_eq!(terminal.sent_count, 2);
    assert_eq!(terminal.failed_count, 1);
    assert_eq!(terminal.total_count, 3);

    let campaigns = CampaignRepository::new(pool);
    let logs = campaigns.list_logs(terminal.id).await.unwrap();
    assert_eq!(logs.len(), 3);
    let failed: Vec<_> = logs
        .iter()
        .filter(|log| log.outcome == LogOutcome::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].error.as_deref().unwrap().contains("permanent failure"));

    let journal = campaigns.list_journal(terminal.id).await.unwrap();
    let last = journal.last().unwrap();
    assert_eq!(last.kind, domain::models::JournalKind::Warning);
    assert_eq!(last.message, "Completed with errors: 2 sent, 1 failed");
}

#[tokio::test]
async fn all_failures_terminate_as_failed() {
    let (app, pool, mailer) = create_test_app().await;
    for email in ["f1@x.io", "f2@x.io"] {
        add_verified(&pool, email, "").await;
        mailer.fail_for(email);
    }

    let campaign = create_draft(&app, json!({"subject": "Hi", "body_text": "Body"})).await;
    let id = campaign["id"].as_str().unwrap().to_string();

    assert_eq!(post_send(&app, &id).await.status(), StatusCode::ACCEPTED);
    let terminal = wait_for_terminal(&pool, &id).await;

    assert_eq!(terminal.status, domain::models::CampaignStatus::Failed);
    assert_eq!(terminal.sent_count, 0);
    assert_eq!(terminal.failed_count, 2);

    let campaigns = CampaignRepository::new(pool);
    let journal = campaigns.list_journal(terminal.id).await.unwrap();
    let last = journal.last().unwrap();
    assert_eq!(last.kind, domain::models::JournalKind::Error);
    assert_eq!(last.message, "Failed: all 2 emails failed to send");
}

#[tokio::test]
async fn empty_verified_set_keeps_campaign_in_draft() {
    let (app, pool, _mailer) = create_test_app().await;

    let campaign = create_draft(&app, json!({"subject": "Hi", "body_text": "Body"})).await;
    let id = campaign["id"].as_str().unwrap().to_string();

    let response = post_send(&app, &id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "no verified subscribers to send to");

    let campaigns = CampaignRepository::new(pool);
    let row = campaigns.by_uuid(&id).await.unwrap();
    assert_eq!(row.status, domain::models::CampaignStatus::Draft);
    assert!(row.started_at.is_none());

    let journal = campaigns.list_journal(row.id).await.unwrap();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].kind, domain::models::JournalKind::Error);
    assert_eq!(journal[0].message, "No verified subscribers to send to");
}

#[tokio::test]
async fn second_send_is_rejected_while_in_flight() {
    let (app, pool, mailer) = create_test_app().await;
    for email in ["d1@x.io", "d2@x.io", "d3@x.io"] {
        add_verified(&pool, email, "").await;
    }
    mailer.delay_sends(Duration::from_millis(50));

    let campaign = create_draft(&app, json!({"subject": "Hi", "body_text": "Body"})).await;
    let id = campaign["id"].as_str().unwrap().to_string();

    assert_eq!(post_send(&app, &id).await.status(), StatusCode::ACCEPTED);

    let second = post_send(&app, &id).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body = body_json(second).await;
    assert_eq!(body["message"], "campaign is already being sent");

    let terminal = wait_for_terminal(&pool, &id).await;
    assert_eq!(terminal.status, domain::models::CampaignStatus::Sent);

    // The rejected send left no extra log rows behind.
    let campaigns = CampaignRepository::new(pool);
    assert_eq!(campaigns.list_logs(terminal.id).await.unwrap().len(), 3);

    // And a send in a terminal status is refused outright.
    let after = post_send(&app, &id).await;
    assert_eq!(after.status(), StatusCode::BAD_REQUEST);
    let body = body_json(after).await;
    assert_eq!(body["message"], "can only send draft campaigns");
}

#[tokio::test]
async fn cancel_mid_flight_terminates_as_cancelled() {
    let (app, pool, mailer) = create_test_app().await;
    for i in 0..10 {
        add_verified(&pool, &format!("c{i}@x.io"), "").await;
    }
    mailer.delay_sends(Duration::from_millis(25));

    let campaign = create_draft(&app, json!({"subject": "Hi", "body_text": "Body"})).await;
    let id = campaign["id"].as_str().unwrap().to_string();
    assert_eq!(post_send(&app, &id).await.status(), StatusCode::ACCEPTED);

    // Let a few recipients through, then cancel.
    for _ in 0..500 {
        if mailer.campaign_sends().len() >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let response = app
        .clone()
        .oneshot(authed_request(
            Method::POST,
            &format!("/api/private/campaigns/{id}/cancel"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "campaign cancellation requested");

    let terminal = wait_for_terminal(&pool, &id).await;
    assert_eq!(terminal.status, domain::models::CampaignStatus::Cancelled);
    assert!(terminal.completed_at.is_some());
    // At most one more recipient may complete after the cancel.
    assert!(terminal.sent_count <= terminal.total_count);
    assert!(terminal.sent_count + terminal.failed_count < 10);

    let campaigns = CampaignRepository::new(pool);
    let journal = campaigns.list_journal(terminal.id).await.unwrap();
    let warning = journal
        .iter()
        .find(|entry| entry.kind == domain::models::JournalKind::Warning)
        .expect("cancellation must be journaled");
    assert!(warning.message.starts_with("Cancelled: "));

    // "Cancelled: X sent, Y failed, Z remaining" accounts for everyone.
    let numbers: Vec<i64> = warning
        .message
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().unwrap())
        .collect();
    assert_eq!(numbers.len(), 3);
    assert_eq!(numbers.iter().sum::<i64>(), 10);

    // The loop exited, so a second cancel is rejected.
    let response = app
        .oneshot(authed_request(
            Method::POST,
            &format!("/api/private/campaigns/{id}/cancel"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "campaign is not currently sending");
}

#[tokio::test]
async fn cancel_requires_a_sending_campaign() {
    let (app, _pool, _mailer) = create_test_app().await;

    let campaign = create_draft(&app, json!({"subject": "Hi", "body_text": "Body"})).await;
    let id = campaign["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(authed_request(
            Method::POST,
            &format!("/api/private/campaigns/{id}/cancel"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn journal_endpoint_returns_events_oldest_first() {
    let (app, pool, _mailer) = create_test_app().await;
    add_verified(&pool, "j@x.io", "").await;

    let campaign = create_draft(&app, json!({"subject": "Hi", "body_text": "Body"})).await;
    let id = campaign["id"].as_str().unwrap().to_string();
    assert_eq!(post_send(&app, &id).await.status(), StatusCode::ACCEPTED);
    wait_for_terminal(&pool, &id).await;

    let response = app
        .oneshot(authed_request(
            Method::GET,
            &format!("/api/private/campaigns/{id}/journal"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["event_type"], "info");
    assert_eq!(entries[1]["event_type"], "success");
    assert!(entries[0].get("created_at").is_some());
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
async fn smtp_settings_round_trip_masks_password() {
    let (app, pool, _mailer) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed_json_request(
            Method::PUT,
            "/api/private/settings/smtp",
            json!({
                "host": "smtp.test",
                "port": 2525,
                "username": "mailer",
                "password": "hunter2",
                "from_email": "news@lists.test",
                "from_name": "TinyList",
                "tls": false
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed_request(Method::GET, "/api/private/settings/smtp"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["host"], "smtp.test");
    assert_eq!(body["port"], 2525);
    assert_eq!(body["password"], "***");
    assert_eq!(body["tls"], false);

    // A masked password on update keeps the stored one.
    let response = app
        .clone()
        .oneshot(authed_json_request(
            Method::PUT,
            "/api/private/settings/smtp",
            json!({
                "host": "smtp.test",
                "port": 2525,
                "username": "mailer",
                "password": "***",
                "from_email": "news@lists.test",
                "from_name": "TinyList",
                "tls": false
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let settings = SettingRepository::new(pool);
    assert_eq!(
        settings.get("smtp_password").await.unwrap().as_deref(),
        Some("hunter2")
    );
}

#[tokio::test]
async fn smtp_update_requires_host_and_sender() {
    let (app, _pool, _mailer) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed_json_request(
            Method::PUT,
            "/api/private/settings/smtp",
            json!({"host": "", "from_email": "news@lists.test"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(authed_json_request(
            Method::PUT,
            "/api/private/settings/smtp",
            json!({"host": "smtp.test", "from_email": ""}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn smtp_test_sends_self_test_email() {
    let (app, _pool, mailer) = create_test_app().await;

    let response = app
        .oneshot(authed_json_request(
            Method::POST,
            "/api/private/settings/smtp/test",
            json!({"email": "probe@x.io"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = mailer.sent_emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "probe@x.io");
}

#[tokio::test]
async fn smtp_test_requires_configuration() {
    let pool = common::create_test_pool().await;
    let mailer = Arc::new(RecordingMailer::unconfigured());
    let app = create_app(common::test_config(), pool, mailer);

    let response = app
        .oneshot(authed_json_request(
            Method::POST,
            "/api/private/settings/smtp/test",
            json!({"email": "probe@x.io"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "SMTP is not configured");
}

// ============================================================================
// Stats
// ============================================================================

#[tokio::test]
async fn stats_reflect_store_contents() {
    let (app, pool, _mailer) = create_test_app().await;

    add_verified(&pool, "v@x.io", "").await;
    let subscribers = SubscriberRepository::new(pool.clone());
    subscribers
        .create(NewSubscriber {
            uuid: Uuid::new_v4().to_string(),
            email: "p@x.io".to_string(),
            name: String::new(),
            status: SubscriberStatus::Pending,
            verify_token: Some(Uuid::new_v4().to_string()),
            unsubscribe_token: Uuid::new_v4().to_string(),
        })
        .await
        .unwrap();

    let campaign = create_draft(&app, json!({"subject": "Hi", "body_text": "Body"})).await;
    let id = campaign["id"].as_str().unwrap().to_string();
    assert_eq!(post_send(&app, &id).await.status(), StatusCode::ACCEPTED);
    wait_for_terminal(&pool, &id).await;

    let response = app
        .oneshot(authed_request(Method::GET, "/api/private/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalSubscribers"], 2);
    assert_eq!(body["verifiedSubscribers"], 1);
    assert_eq!(body["pendingSubscribers"], 1);
    assert_eq!(body["totalCampaigns"], 1);
    assert_eq!(body["sentCampaigns"], 1);
}
