//! Webhook Reconciler
//!
//! Verifies provider-signed events over the raw body and applies each one to
//! exactly one payment. Redeliveries are acknowledged without re-mutating.

pub mod event;
pub mod reconciler;
pub mod signature;

pub use event::{EventData, WebhookEvent};
pub use reconciler::WebhookReconciler;
pub use signature::{SIGNATURE_HEADER, SignatureVerifier};
