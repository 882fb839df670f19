//! Outbound verification-request delivery.
//!
//! Email sending is an external collaborator with a simple contract: send a
//! templated message to an address with a structured payload, succeed or
//! fail. The default implementation records the request in the log; a real
//! deployment swaps in a delivery service behind the same trait.

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::AppError;

/// Which verification-request template an outbound message uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    DbsRequest,
    OfstedCheck,
    AuthorityCheck,
    ReferenceRequest,
}

impl EmailTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailTemplate::DbsRequest => "dbs_request",
            EmailTemplate::OfstedCheck => "ofsted_check",
            EmailTemplate::AuthorityCheck => "authority_check",
            EmailTemplate::ReferenceRequest => "reference_request",
        }
    }
}

/// A templated email carrying a satellite form token and structured payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEmail {
    pub recipient: String,
    pub template: EmailTemplate,
    pub form_token: String,
    pub payload: serde_json::Value,
}

/// Delivery boundary for verification requests.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), AppError>;
}

/// Default notifier: records outgoing requests via tracing only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: &OutboundEmail) -> Result<(), AppError> {
        tracing::info!(
            template = email.template.as_str(),
            recipient = %email.recipient,
            form_token = %email.form_token,
            "Outbound verification request"
        );
        Ok(())
    }
}
