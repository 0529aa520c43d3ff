//! # Order Fulfillment
//!
//! The webhook handler that turns a successful payment into a delivery
//! email. Fulfillment is stateless: the customer email and purchased
//! price ids ride in the event payload, placed there when
//! the checkout session was created.

use async_trait::async_trait;
use std::sync::Arc;
use store_core::{PriceCatalog, StoreError, StoreResult, WebhookEvent};
use store_mailgun::{EmailAttachment, MailgunClient};
use store_stripe::WebhookHandler;
use tracing::{info, instrument, warn};

/// Fulfills paid orders by emailing the purchased items
pub struct FulfillmentHandler {
    mailgun: Arc<MailgunClient>,
    catalog: Arc<PriceCatalog>,
}

impl FulfillmentHandler {
    pub fn new(mailgun: Arc<MailgunClient>, catalog: Arc<PriceCatalog>) -> Self {
        Self { mailgun, catalog }
    }

    /// Resolve the purchased price ids to deliverable attachments.
    ///
    /// A price id missing from the catalog is a fulfillment failure: the
    /// customer paid for something we cannot deliver, which must surface
    /// in the logs rather than silently shipping a partial order.
    async fn assemble_attachments(
        &self,
        price_ids: &[String],
    ) -> StoreResult<(Vec<EmailAttachment>, Vec<String>)> {
        let mut attachments = Vec::new();
        let mut names = Vec::new();

        for price_id in price_ids {
            let item = self
                .catalog
                .get(price_id)
                .ok_or_else(|| StoreError::InvalidPriceId {
                    price_id: price_id.clone(),
                })?;
            names.push(item.name.clone());

            if let Some(ref file) = item.file {
                let content = tokio::fs::read(file).await.map_err(|e| {
                    StoreError::Internal(format!("deliverable {} unreadable: {}", file, e))
                })?;
                let filename = std::path::Path::new(file)
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.clone());
                attachments.push(EmailAttachment {
                    filename,
                    content,
                    content_type: item
                        .content_type
                        .clone()
                        .unwrap_or_else(|| "application/pdf".to_string()),
                });
            }
        }

        Ok((attachments, names))
    }
}

#[async_trait]
impl WebhookHandler for FulfillmentHandler {
    #[instrument(skip(self, event), fields(event_id = %event.event_id))]
    async fn on_payment_succeeded(&self, event: &WebhookEvent) -> StoreResult<()> {
        let recipient = event.customer_email().ok_or_else(|| {
            StoreError::MalformedPayload("payment event carries no customer email".to_string())
        })?;

        let price_ids = event.price_ids();
        if price_ids.is_empty() {
            // Payment from outside our checkout flow (no mirrored metadata);
            // nothing to deliver.
            warn!("Payment event has no price ids in metadata, skipping delivery");
            return Ok(());
        }

        let (attachments, names) = self.assemble_attachments(&price_ids).await?;

        let body = delivery_body(&names);
        self.mailgun
            .send_fulfillment(recipient, "Your order - items attached", &body, attachments)
            .await?;

        info!(
            recipient,
            items = names.len(),
            "Order fulfilled"
        );
        Ok(())
    }
}

fn delivery_body(item_names: &[String]) -> String {
    let mut body = String::from("<p>Thank you for your purchase!</p><ul>");
    for name in item_names {
        body.push_str(&format!("<li>{}</li>", name));
    }
    body.push_str("</ul><p>Your items are attached to this email.</p>");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use store_core::WebhookEventType;
    use store_doppler::{SecretCache, SecretFetcher};
    use store_mailgun::MailgunConfig;
    use store_stripe::dispatch_event;

    struct NoSecrets;

    #[async_trait]
    impl SecretFetcher for NoSecrets {
        async fn fetch_secrets(&self) -> StoreResult<HashMap<String, String>> {
            Ok(HashMap::new())
        }
    }

    fn handler_with_catalog(catalog_toml: &str) -> FulfillmentHandler {
        let secrets = Arc::new(SecretCache::with_default_ttl(Arc::new(NoSecrets)));
        let mailgun = MailgunClient::new(
            MailgunConfig {
                // Unroutable: these tests never get as far as sending
                messages_url: "http://127.0.0.1:1/messages".to_string(),
                from_address: "orders@example.com".to_string(),
                from_name: "Storefront".to_string(),
            },
            secrets,
        );
        FulfillmentHandler::new(
            Arc::new(mailgun),
            Arc::new(PriceCatalog::from_toml(catalog_toml).unwrap()),
        )
    }

    fn payment_event(data: serde_json::Value) -> WebhookEvent {
        WebhookEvent {
            event_id: "evt_f".to_string(),
            event_type: WebhookEventType::PaymentSucceeded,
            livemode: false,
            created: 1_700_000_000,
            data: data.as_object().cloned().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_missing_customer_email_fails_fulfillment() {
        let handler = handler_with_catalog("products = []");
        let event = payment_event(json!({ "metadata": { "price_ids": "price_a" } }));

        let err = handler.on_payment_succeeded(&event).await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_foreign_payment_without_metadata_is_skipped() {
        let handler = handler_with_catalog("products = []");
        let event = payment_event(json!({ "receipt_email": "buyer@example.com" }));

        // No price ids in metadata: nothing to deliver, not an error
        assert!(handler.on_payment_succeeded(&event).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_price_id_fails_fulfillment() {
        let handler = handler_with_catalog(
            r#"
            [[products]]
            price_id = "price_a"
            name = "Program A"
            "#,
        );
        let event = payment_event(json!({
            "receipt_email": "buyer@example.com",
            "metadata": { "price_ids": "price_a,price_unknown" }
        }));

        let err = handler.on_payment_succeeded(&event).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPriceId { .. }));
    }

    #[tokio::test]
    async fn test_fulfillment_failure_surfaces_as_failed_dispatch() {
        // Catalog resolves, but the mailgun send cannot proceed (no API key
        // in the cache), so the handler errors and dispatch reports Failed
        // without propagating.
        let handler = handler_with_catalog(
            r#"
            [[products]]
            price_id = "price_a"
            name = "Program A"
            "#,
        );
        let event = payment_event(json!({
            "receipt_email": "buyer@example.com",
            "metadata": { "price_ids": "price_a" }
        }));

        let outcome = dispatch_event(&handler, &event).await;
        assert_eq!(outcome, store_core::DispatchOutcome::Failed);
    }

    #[test]
    fn test_delivery_body_lists_items() {
        let body = delivery_body(&["Program A".to_string(), "Program B".to_string()]);
        assert!(body.contains("<li>Program A</li>"));
        assert!(body.contains("<li>Program B</li>"));
    }
}
