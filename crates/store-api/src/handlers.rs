//! # Request Handlers
//!
//! Axum request handlers for the storefront API: token issuance, checkout
//! session creation, and the Stripe webhook endpoint.

use crate::fulfillment::FulfillmentHandler;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use store_core::{IssuedToken, StoreError, DEFAULT_TOKEN_LIFETIME_SECS};
use store_stripe::{dispatch_event, CheckoutSession};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Generate-token request
#[derive(Debug, Deserialize)]
pub struct GenerateTokenRequest {
    /// Price ids the checkout attempt is for
    pub price_ids: Vec<String>,
}

/// Create-checkout-session request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    /// Token from /payments/generate-token
    pub token: String,
    /// Quantity per line item
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Override the configured success redirect
    #[serde(default)]
    pub success_url: Option<String>,
    /// Override the configured cancel redirect
    #[serde(default)]
    pub cancel_url: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// Webhook acknowledgment
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was received
    pub received: bool,
    /// Type of the event
    pub event_type: String,
    /// Unique event id from the provider
    pub event_id: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Issue a checkout token for an allow-listed set of price ids
#[instrument(skip(state, request), fields(ids = request.price_ids.len()))]
pub async fn generate_token(
    State(state): State<AppState>,
    Json(request): Json<GenerateTokenRequest>,
) -> Result<Json<IssuedToken>, (StatusCode, Json<ErrorResponse>)> {
    // Allow-list validation happens here, one layer above the codec
    state
        .catalog
        .validate_price_ids(&request.price_ids)
        .map_err(|e| {
            warn!("Token request rejected: {}", e);
            store_error_to_response(e)
        })?;

    let issued = state
        .codec
        .issue(&request.price_ids, DEFAULT_TOKEN_LIFETIME_SECS)
        .await
        .map_err(|e| {
            error!("Failed to issue checkout token: {}", e);
            store_error_to_response(e)
        })?;

    info!(expires_at = issued.expires_at, "Issued checkout token");
    Ok(Json(issued))
}

/// Create a checkout session from a verified token
#[instrument(skip(state, request))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutSessionRequest>,
) -> Result<(StatusCode, Json<CheckoutSession>), (StatusCode, Json<ErrorResponse>)> {
    // The token carries the price ids; the request cannot widen them
    let payload = state.codec.verify(&request.token).await.map_err(|e| {
        warn!("Token verification failed: {}", e);
        store_error_to_response(e)
    })?;

    let success_url = request
        .success_url
        .unwrap_or_else(|| state.config.success_url.clone());
    let cancel_url = request
        .cancel_url
        .unwrap_or_else(|| state.config.cancel_url.clone());

    let session = state
        .stripe
        .create_checkout_session(&payload.price_ids, request.quantity, &success_url, &cancel_url)
        .await
        .map_err(|e| {
            error!("Failed to create checkout session: {}", e);
            store_error_to_response(e)
        })?;

    info!(session_id = %session.session_id, "Created checkout session");
    Ok((StatusCode::CREATED, Json(session)))
}

/// Handle a Stripe webhook delivery.
///
/// The signature is verified synchronously; dispatch runs on a spawned
/// task after the acknowledgment below has been produced. Stripe expects a
/// fast reply, and a slow fulfillment (file reads, email send) must not
/// cause delivery timeouts and provider-side retries of an event we
/// already accepted.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<ErrorResponse>)> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing Stripe-Signature header", 400)),
            )
        })?;

    let event = state.verifier.verify(&body, signature).await.map_err(|e| {
        warn!("Webhook verification failed: {}", e);
        store_error_to_response(e)
    })?;

    info!(
        event_id = %event.event_id,
        event_type = event.event_type.as_provider_str(),
        livemode = event.livemode,
        "Received webhook"
    );

    let response = WebhookResponse {
        received: true,
        event_type: event.event_type.as_provider_str().to_string(),
        event_id: event.event_id.clone(),
    };

    // Fast-ack: dispatch after replying. A handler failure past this point
    // is observable only in our logs; the provider has already been told
    // `received=true` and will not retry.
    let handler = FulfillmentHandler::new(state.mailgun.clone(), state.catalog.clone());
    tokio::spawn(async move {
        let outcome = dispatch_event(&handler, &event).await;
        info!(event_id = %event.event_id, ?outcome, "Webhook dispatched");
    });

    Ok(Json(response))
}
