//! # store-mailgun
//!
//! Fulfillment email delivery for the storefront, over the Mailgun
//! messages API.
//!
//! ```rust,ignore
//! use store_mailgun::{EmailAttachment, MailgunClient, MailgunConfig};
//!
//! let mailgun = MailgunClient::new(MailgunConfig::from_env()?, secrets);
//! mailgun.send_fulfillment(
//!     "buyer@example.com",
//!     "Your order",
//!     "<p>Your items are attached.</p>",
//!     attachments,
//! ).await?;
//! ```

pub mod client;

// Re-exports
pub use client::{EmailAttachment, MailgunClient, MailgunConfig};
