//! Attachment ingestion seam.
//!
//! Receipt/document extraction is an external collaborator; the pipeline
//! only turns its suggestions into a clarification message. An attachment
//! never mutates the ledger directly: the operator must confirm with an
//! ordinary text command, which then flows through the normal pipeline.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use tally_core::Intent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentRef {
    pub file_name: String,
    pub media_type: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SuggestedFields {
    pub intent: Option<Intent>,
    pub amount: Option<Decimal>,
    pub counterparty_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("attachment extraction unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AttachmentService: Send + Sync {
    async fn extract(&self, attachment: &AttachmentRef) -> Result<SuggestedFields, AttachmentError>;
}

/// Placeholder used until an extraction backend is wired in.
#[derive(Debug, Default)]
pub struct NoopAttachmentService;

#[async_trait]
impl AttachmentService for NoopAttachmentService {
    async fn extract(
        &self,
        _attachment: &AttachmentRef,
    ) -> Result<SuggestedFields, AttachmentError> {
        Err(AttachmentError::Unavailable("no extraction backend configured".to_string()))
    }
}

/// Clarification asking the operator to confirm by typing a command.
pub fn confirmation_prompt(attachment: &AttachmentRef, fields: &SuggestedFields) -> String {
    let mut parts = Vec::new();
    if let Some(intent) = fields.intent {
        parts.push(format!("type: {intent}"));
    }
    if let Some(amount) = fields.amount {
        parts.push(format!("amount: {amount}"));
    }
    if let Some(name) = &fields.counterparty_name {
        parts.push(format!("name: {name}"));
    }
    if let Some(description) = &fields.description {
        parts.push(format!("description: {description}"));
    }

    if parts.is_empty() {
        format!(
            "I couldn't read anything usable from {}. \
             Please type the entry yourself, e.g. \"Add expense of 200 for supplies\".",
            attachment.file_name
        )
    } else {
        format!(
            "From {} I read: {}. Nothing has been recorded - \
             if this looks right, confirm it as a command, \
             e.g. \"Add expense of 200 for supplies\".",
            attachment.file_name,
            parts.join(", ")
        )
    }
}
