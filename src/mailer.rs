use anyhow::Context;
use axum::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::config::MailConfig;

/// Outbound-mail collaborator. The auth flow only ever needs to deliver a
/// reset link; everything about the transport stays behind this trait.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset_link(&self, to: &str, link: &str) -> anyhow::Result<()>;
}

/// Builds the link the user clicks: `{base}/reset-password/{token}`.
pub fn reset_link(base_url: &str, token: &str) -> String {
    format!("{}/reset-password/{}", base_url.trim_end_matches('/'), token)
}

/// Delivers through an HTTP mail relay (JSON body, bearer auth).
pub struct HttpMailer {
    config: MailConfig,
    client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_reset_link(&self, to: &str, link: &str) -> anyhow::Result<()> {
        let body = json!({
            "from": self.config.from,
            "to": to,
            "subject": "Password Reset Request",
            "html": format!(
                "<p>You requested a password reset.</p>\
                 <p>Click <a href=\"{link}\">here</a> to reset your password.</p>\
                 <p>This link will expire in 15 minutes.</p>"
            ),
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .context("mail relay request failed")?;
        response
            .error_for_status()
            .context("mail relay rejected the message")?;

        debug!(to = %to, "reset email handed to relay");
        Ok(())
    }
}

/// Dev fallback when no mail transport is configured: logs the link and
/// reports success.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_reset_link(&self, to: &str, link: &str) -> anyhow::Result<()> {
        info!(to = %to, link = %link, "mail transport not configured, logging reset link");
        Ok(())
    }
}
