//! Email sending over SMTP with lettre.
//!
//! The mailer is reconfigurable at runtime: the admin settings endpoint
//! swaps the configuration atomically while in-flight sends keep the
//! transport they captured at the call site. Campaign sends race the SMTP
//! round-trip against the per-campaign cancellation signal and a fixed
//! deadline.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Deadline applied to every SMTP dial-and-send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP configuration, persisted in the settings table.
#[derive(Debug, Clone, Default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub tls: bool,
}

impl SmtpConfig {
    /// The mailer is usable once a host and a sender address are known.
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.from_email.is_empty()
    }
}

/// Errors that can occur while sending email.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP is not configured")]
    NotConfigured,

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("send cancelled")]
    Cancelled,

    #[error("send timed out")]
    Timeout,

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Outbound email transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Replaces the current SMTP configuration atomically.
    fn configure(&self, config: SmtpConfig);

    /// True once a host and sender address are configured.
    fn is_configured(&self) -> bool;

    /// Sends a fixed self-test message to verify the configuration.
    async fn send_test(&self, to_email: &str) -> Result<(), MailError>;

    /// Sends a double opt-in verification message.
    async fn send_verification(
        &self,
        to_email: &str,
        to_name: &str,
        verify_url: &str,
    ) -> Result<(), MailError>;

    /// Sends one campaign message. The unsubscribe URL is appended to the
    /// text part and injected into the HTML part. Respects the
    /// cancellation signal and the internal send deadline.
    #[allow(clippy::too_many_arguments)]
    async fn send_campaign(
        &self,
        cancel: &CancellationToken,
        to_email: &str,
        to_name: &str,
        subject: &str,
        body_text: &str,
        body_html: Option<&str>,
        unsubscribe_url: &str,
    ) -> Result<(), MailError>;
}

/// How the connection to the relay is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TlsMode {
    /// Implicit TLS from the first byte (SMTPS).
    Implicit,
    /// Plaintext connection upgraded via STARTTLS.
    StartTls,
    /// No encryption.
    None,
}

/// Implicit TLS only on the dedicated SMTPS port; STARTTLS everywhere
/// else when TLS is requested.
fn tls_mode(tls: bool, port: u16) -> TlsMode {
    if tls && port == 465 {
        TlsMode::Implicit
    } else if tls {
        TlsMode::StartTls
    } else {
        TlsMode::None
    }
}

/// Appends the plain-text unsubscribe footer.
fn append_unsubscribe_footer(body_text: &str, unsubscribe_url: &str) -> String {
    format!("{body_text}\n\n---\nTo unsubscribe, visit: {unsubscribe_url}")
}

/// Inserts an unsubscribe paragraph immediately before the last `</body>`
/// tag (matched case-insensitively), or appends it when no such tag
/// exists.
fn insert_unsubscribe_html(body_html: &str, unsubscribe_url: &str) -> String {
    let block = format!(
        "<p style=\"color: #999; font-size: 12px; margin-top: 40px; \
         border-top: 1px solid #eee; padding-top: 20px;\">\n\
         <a href=\"{unsubscribe_url}\" style=\"color: #999;\">Unsubscribe</a></p>"
    );

    let needle = b"</body>";
    match body_html
        .as_bytes()
        .windows(needle.len())
        .rposition(|window| window.eq_ignore_ascii_case(needle))
    {
        Some(idx) => format!("{}{}{}", &body_html[..idx], block, &body_html[idx..]),
        None => format!("{body_html}{block}"),
    }
}

/// A built transport plus the sender identity it was configured with.
struct SmtpClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    from_name: String,
}

/// Production [`Mailer`] backed by lettre.
pub struct SmtpMailer {
    client: RwLock<Option<Arc<SmtpClient>>>,
}

impl SmtpMailer {
    pub fn new() -> Self {
        SmtpMailer {
            client: RwLock::new(None),
        }
    }

    fn client(&self) -> Option<Arc<SmtpClient>> {
        self.client.read().expect("mailer lock poisoned").clone()
    }

    fn build_client(config: &SmtpConfig) -> Result<SmtpClient, MailError> {
        let from_address = config
            .from_email
            .parse::<Address>()
            .map_err(|_| MailError::InvalidAddress(config.from_email.clone()))?;
        let from_name = (!config.from_name.is_empty()).then(|| config.from_name.clone());
        let from = Mailbox::new(from_name, from_address);

        let builder = match tls_mode(config.tls, config.port) {
            TlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|err| MailError::Smtp(err.to_string()))?,
            TlsMode::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|err| MailError::Smtp(err.to_string()))?
            }
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(DEFAULT_SEND_TIMEOUT));
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(SmtpClient {
            transport: builder.build(),
            from,
            from_name: config.from_name.clone(),
        })
    }

    fn build_message(
        client: &SmtpClient,
        to_email: &str,
        to_name: &str,
        subject: &str,
        body_text: &str,
        body_html: Option<&str>,
    ) -> Result<Message, MailError> {
        let to_address = to_email
            .parse::<Address>()
            .map_err(|_| MailError::InvalidAddress(to_email.to_string()))?;
        let to = Mailbox::new((!to_name.is_empty()).then(|| to_name.to_string()), to_address);

        let builder = Message::builder()
            .from(client.from.clone())
            .to(to)
            .subject(subject);

        let message = match body_html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                body_text.to_string(),
                html.to_string(),
            )),
            None => builder.singlepart(SinglePart::plain(body_text.to_string())),
        };

        message.map_err(|err| MailError::Build(err.to_string()))
    }

    /// Blocking send without a cancellation signal; the transport's own
    /// deadline still applies.
    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        body_text: &str,
        body_html: Option<&str>,
    ) -> Result<(), MailError> {
        let client = self.client().ok_or(MailError::NotConfigured)?;
        let message =
            Self::build_message(&client, to_email, to_name, subject, body_text, body_html)?;
        client
            .transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|err| MailError::Smtp(err.to_string()))
    }
}

impl Default for SmtpMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn configure(&self, config: SmtpConfig) {
        let client = if config.is_configured() {
            match Self::build_client(&config) {
                Ok(client) => Some(Arc::new(client)),
                Err(err) => {
                    tracing::warn!(host = %config.host, error = %err, "rejecting SMTP configuration");
                    None
                }
            }
        } else {
            None
        };

        *self.client.write().expect("mailer lock poisoned") = client;
    }

    fn is_configured(&self) -> bool {
        self.client().is_some()
    }

    async fn send_test(&self, to_email: &str) -> Result<(), MailError> {
        let client = self.client().ok_or(MailError::NotConfigured)?;
        let subject = "TinyList - Test Email";
        let body_text = format!(
            "This is a test email from TinyList.\n\n\
             If you received this email, your SMTP configuration is working correctly.\n\n\
             Best regards,\n{}",
            client.from_name
        );
        let body_html = format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"></head>\n\
             <body style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;\">\n\
             <h2>TinyList - Test Email</h2>\n\
             <p>This is a test email from TinyList.</p>\n\
             <p>If you received this email, your SMTP configuration is working correctly.</p>\n\
             <p style=\"margin-top: 40px;\">Best regards,<br>{}</p>\n\
             </body>\n</html>",
            client.from_name
        );

        self.send(to_email, "", subject, &body_text, Some(&body_html))
            .await
    }

    async fn send_verification(
        &self,
        to_email: &str,
        to_name: &str,
        verify_url: &str,
    ) -> Result<(), MailError> {
        let client = self.client().ok_or(MailError::NotConfigured)?;
        let subject = "Please verify your email address";
        let body_text = format!(
            "Hi {to_name},\n\n\
             Thanks for subscribing! Please verify your email address by clicking the link below:\n\n\
             {verify_url}\n\n\
             If you didn't subscribe to this list, you can safely ignore this email.\n\n\
             Best regards,\n{}",
            client.from_name
        );
        let body_html = format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"></head>\n\
             <body style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;\">\n\
             <h2>Verify your email address</h2>\n\
             <p>Hi {to_name},</p>\n\
             <p>Thanks for subscribing! Please verify your email address by clicking the button below:</p>\n\
             <p style=\"margin: 30px 0;\">\n\
             <a href=\"{verify_url}\" style=\"background-color: #4CAF50; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;\">Verify Email</a>\n\
             </p>\n\
             <p>Or copy and paste this link into your browser:</p>\n\
             <p style=\"word-break: break-all; color: #666;\">{verify_url}</p>\n\
             <p style=\"color: #999; font-size: 12px; margin-top: 40px;\">\n\
             If you didn't subscribe to this list, you can safely ignore this email.\n\
             </p>\n\
             </body>\n</html>"
        );

        self.send(to_email, to_name, subject, &body_text, Some(&body_html))
            .await
    }

    async fn send_campaign(
        &self,
        cancel: &CancellationToken,
        to_email: &str,
        to_name: &str,
        subject: &str,
        body_text: &str,
        body_html: Option<&str>,
        unsubscribe_url: &str,
    ) -> Result<(), MailError> {
        let client = self.client().ok_or(MailError::NotConfigured)?;

        let body_text = append_unsubscribe_footer(body_text, unsubscribe_url);
        let body_html = body_html.map(|html| insert_unsubscribe_html(html, unsubscribe_url));

        let message = Self::build_message(
            &client,
            to_email,
            to_name,
            subject,
            &body_text,
            body_html.as_deref(),
        )?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MailError::Cancelled),
            result = tokio::time::timeout(DEFAULT_SEND_TIMEOUT, client.transport.send(message)) => {
                match result {
                    Err(_) => Err(MailError::Timeout),
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err(err)) => Err(MailError::Smtp(err.to_string())),
                }
            }
        }
    }
}
