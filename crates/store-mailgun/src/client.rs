//! # Mailgun Client
//!
//! Delivery-email sending over the Mailgun messages API. Only delivery is
//! implemented here; what the email says is the caller's business.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::env;
use std::sync::Arc;
use store_core::{StoreError, StoreResult};
use store_doppler::{names, SecretCache};
use tracing::{debug, error, info, instrument};

/// A file attached to a delivery email
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

/// Mailgun configuration (non-secret; the API key comes from the cache)
#[derive(Debug, Clone)]
pub struct MailgunConfig {
    /// Full messages endpoint, e.g.
    /// `https://api.mailgun.net/v3/mg.example.com/messages`
    pub messages_url: String,

    /// From address, e.g. `orders@example.com`
    pub from_address: String,

    /// Display name used in the From header
    pub from_name: String,
}

impl MailgunConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `MAILGUN_MESSAGES_URL`
    /// - `MAILGUN_FROM_ADDRESS`
    ///
    /// `MAILGUN_FROM_NAME` defaults to "Storefront".
    pub fn from_env() -> StoreResult<Self> {
        dotenvy::dotenv().ok();

        let messages_url = env::var("MAILGUN_MESSAGES_URL")
            .map_err(|_| StoreError::Configuration("MAILGUN_MESSAGES_URL not set".to_string()))?;
        let from_address = env::var("MAILGUN_FROM_ADDRESS")
            .map_err(|_| StoreError::Configuration("MAILGUN_FROM_ADDRESS not set".to_string()))?;
        let from_name = env::var("MAILGUN_FROM_NAME").unwrap_or_else(|_| "Storefront".to_string());

        Ok(Self {
            messages_url,
            from_address,
            from_name,
        })
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_address)
    }
}

/// Client for the Mailgun messages API
pub struct MailgunClient {
    config: MailgunConfig,
    secrets: Arc<SecretCache>,
    client: Client,
}

impl MailgunClient {
    /// Create a new Mailgun client
    pub fn new(config: MailgunConfig, secrets: Arc<SecretCache>) -> Self {
        let client = Client::builder()
            // Attachment uploads can be slow; match the longer timeout
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            secrets,
            client,
        }
    }

    /// Send a fulfillment email with the purchased items attached.
    ///
    /// Failures are email-class errors; the dispatcher treats them as
    /// fulfillment failures.
    #[instrument(skip(self, html_body, attachments), fields(attachments = attachments.len()))]
    pub async fn send_fulfillment(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachments: Vec<EmailAttachment>,
    ) -> StoreResult<()> {
        let api_key = self.secrets.get(names::MAILGUN_API_KEY).await?;

        let mut form = Form::new()
            .text("from", self.config.from_header())
            .text("to", recipient.to_string())
            .text("subject", subject.to_string())
            .text("html", html_body.to_string());

        for attachment in attachments {
            let part = Part::bytes(attachment.content)
                .file_name(attachment.filename)
                .mime_str(&attachment.content_type)
                .map_err(|e| StoreError::Email(format!("invalid attachment type: {}", e)))?;
            form = form.part("attachment", part);
        }

        debug!(recipient, "Sending fulfillment email");

        let response = self
            .client
            .post(&self.config.messages_url)
            .basic_auth("api", Some(&api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Mailgun API error: status={}, body={}", status, body);
            return Err(StoreError::Email(format!("HTTP {}: {}", status, body)));
        }

        info!(recipient, "Fulfillment email sent");
        Ok(())
    }
}
