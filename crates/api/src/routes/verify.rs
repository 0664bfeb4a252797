//! Public email verification endpoint (second half of double opt-in).
//!
//! Responses are standalone HTML pages so the capability link works
//! directly in a browser.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};
use domain::models::SubscriberStatus;
use persistence::StoreError;
use tracing::info;

use crate::app::AppState;

const RESULT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>%TITLE%</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            padding: 20px;
        }
        .card {
            background: white;
            border-radius: 16px;
            padding: 48px;
            text-align: center;
            max-width: 420px;
            box-shadow: 0 25px 50px -12px rgba(0, 0, 0, 0.25);
        }
        .icon {
            width: 80px;
            height: 80px;
            border-radius: 50%;
            background: %ICON_COLOR%;
            color: white;
            font-size: 40px;
            display: flex;
            align-items: center;
            justify-content: center;
            margin: 0 auto 24px;
        }
        h1 {
            color: #1f2937;
            font-size: 24px;
            margin-bottom: 12px;
        }
        p {
            color: #6b7280;
            font-size: 16px;
            line-height: 1.6;
        }
    </style>
</head>
<body>
    <div class="card">
        <div class="icon">%ICON%</div>
        <h1>%TITLE%</h1>
        <p>%MESSAGE%</p>
    </div>
</body>
</html>"#;

/// Renders the verification result card.
fn result_page(
    status: StatusCode,
    title: &str,
    message: &str,
    is_success: bool,
) -> (StatusCode, Html<String>) {
    let (icon, icon_color) = if is_success {
        ("\u{2713}", "#22c55e")
    } else {
        ("\u{2715}", "#ef4444")
    };

    let page = RESULT_PAGE
        .replace("%TITLE%", title)
        .replace("%MESSAGE%", message)
        .replace("%ICON_COLOR%", icon_color)
        .replace("%ICON%", icon);

    (status, Html(page))
}

/// GET /api/verify/{token}
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> (StatusCode, Html<String>) {
    let subscriber = match state.subscribers.by_verify_token(&token).await {
        Ok(subscriber) => subscriber,
        Err(StoreError::NotFound) => {
            return result_page(
                StatusCode::NOT_FOUND,
                "Invalid Link",
                "This verification link is invalid or has expired.",
                false,
            );
        }
        Err(_) => {
            return result_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error",
                "Something went wrong. Please try again later.",
                false,
            );
        }
    };

    match subscriber.status {
        SubscriberStatus::Verified => result_page(
            StatusCode::OK,
            "Already Verified",
            "Your email address has already been verified.",
            true,
        ),
        SubscriberStatus::Unsubscribed => result_page(
            StatusCode::BAD_REQUEST,
            "Unsubscribed",
            "This email address has been unsubscribed from our list.",
            false,
        ),
        SubscriberStatus::Pending => {
            if state
                .subscribers
                .update_status(subscriber.id, SubscriberStatus::Verified)
                .await
                .is_err()
            {
                return result_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error",
                    "Something went wrong. Please try again later.",
                    false,
                );
            }

            info!(email = %subscriber.email, "email verified");

            result_page(
                StatusCode::OK,
                "Email Verified",
                "Thank you! Your email address has been verified successfully.",
                true,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_page_carries_check_mark() {
        let (status, Html(page)) =
            result_page(StatusCode::OK, "Email Verified", "Thank you!", true);
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Email Verified"));
        assert!(page.contains("Thank you!"));
        assert!(page.contains("#22c55e"));
        assert!(page.contains('\u{2713}'));
    }

    #[test]
    fn failure_page_carries_cross_mark() {
        let (status, Html(page)) =
            result_page(StatusCode::NOT_FOUND, "Invalid Link", "Expired.", false);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(page.contains("#ef4444"));
        assert!(page.contains('\u{2715}'));
    }

    #[test]
    fn css_gradient_survives_templating() {
        let (_, Html(page)) = result_page(StatusCode::OK, "T", "M", true);
        assert!(page.contains("linear-gradient(135deg, #667eea 0%, #764ba2 100%)"));
    }
}
