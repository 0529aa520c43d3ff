//! # Webhook Event Dispatch
//!
//! Routes a verified event to exactly one fulfillment action per event
//! type. By the time dispatch runs, the HTTP layer has already acknowledged
//! the delivery, so a handler failure is reported to the logs and nowhere
//! else; the provider cannot be told.

use async_trait::async_trait;
use store_core::{DispatchOutcome, StoreResult, WebhookEvent};
use tracing::{debug, error, info, warn};

/// Per-event-type fulfillment actions.
///
/// Default implementations are record-only: they log the event and succeed.
/// Override `on_payment_succeeded` to run actual fulfillment.
#[async_trait]
#[allow(unused_variables)]
pub trait WebhookHandler: Send + Sync {
    /// Payment succeeded: run fulfillment
    async fn on_payment_succeeded(&self, event: &WebhookEvent) -> StoreResult<()> {
        info!(
            event_id = %event.event_id,
            object = event.object_id().unwrap_or("unknown"),
            "Payment succeeded"
        );
        Ok(())
    }

    /// Checkout session completed
    async fn on_checkout_completed(&self, event: &WebhookEvent) -> StoreResult<()> {
        info!(
            event_id = %event.event_id,
            session = event.object_id().unwrap_or("unknown"),
            "Checkout session completed"
        );
        Ok(())
    }

    /// Checkout session expired without payment
    async fn on_checkout_expired(&self, event: &WebhookEvent) -> StoreResult<()> {
        info!(
            event_id = %event.event_id,
            session = event.object_id().unwrap_or("unknown"),
            "Checkout session expired"
        );
        Ok(())
    }

    /// Payment failed
    async fn on_payment_failed(&self, event: &WebhookEvent) -> StoreResult<()> {
        warn!(
            event_id = %event.event_id,
            object = event.object_id().unwrap_or("unknown"),
            "Payment failed"
        );
        Ok(())
    }
}

/// Default handler: record-only for every event type
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch a verified event to its handler.
///
/// Unrecognized event types terminate as `Ignored` without invoking the
/// handler at all. A handler error terminates as `Failed`; it is logged,
/// never propagated, because the fast-ack reply already went out. There is
/// no retry here: replaying a failed event is an operator action against
/// the provider's dashboard.
pub async fn dispatch_event(handler: &dyn WebhookHandler, event: &WebhookEvent) -> DispatchOutcome {
    use store_core::WebhookEventType::*;

    let result = match &event.event_type {
        PaymentSucceeded => handler.on_payment_succeeded(event).await,
        CheckoutCompleted => handler.on_checkout_completed(event).await,
        CheckoutExpired => handler.on_checkout_expired(event).await,
        PaymentFailed => handler.on_payment_failed(event).await,
        Unknown(raw) => {
            debug!(event_id = %event.event_id, "Ignoring unrecognized webhook event type: {}", raw);
            return DispatchOutcome::Ignored;
        }
    };

    match result {
        Ok(()) => DispatchOutcome::Completed,
        Err(e) => {
            error!(
                event_id = %event.event_id,
                event_type = event.event_type.as_provider_str(),
                "Webhook handler failed: {}", e
            );
            DispatchOutcome::Failed
        }
    }
}
