//! Résumé persistence gateway, the wizard's only route to stored résumés.
//!
//! The wizard talks to `dyn ResumePersistenceGateway`. Production wires in
//! [`HttpResumeGateway`] against the remote résumé API; local runs and tests
//! use [`InMemoryGateway`]. No retries happen at this layer: a failed call is
//! reported once and re-issued only by the user.
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::models::resume::ResumeDocument;

pub mod auth;
pub mod http;
pub mod memory;

pub use auth::AuthContext;
pub use http::HttpResumeGateway;
pub use memory::InMemoryGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Resume not found: {0}")]
    NotFound(String),

    #[error("Rejected by the resume API: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Resume API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resume API unavailable: {0}")]
    Unavailable(String),

    #[error("Could not decode resume API response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// The message the remote API gave, when it gave one.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            GatewayError::NotFound(m)
            | GatewayError::Validation(m)
            | GatewayError::Unauthorized(m)
            | GatewayError::Api { message: m, .. } => {
                Some(m.as_str()).filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Network-level failure rather than an answer from the API.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Http(_) | GatewayError::Unavailable(_))
    }
}

#[async_trait]
pub trait ResumePersistenceGateway: Send + Sync {
    async fn fetch_by_id(&self, id: &str) -> Result<ResumeDocument, GatewayError>;

    /// Stores a new résumé and returns the id the API assigned.
    async fn create(&self, doc: &ResumeDocument) -> Result<String, GatewayError>;

    async fn update(&self, id: &str, doc: &ResumeDocument) -> Result<(), GatewayError>;

    /// Résumés owned by the authenticated user.
    async fn list(&self) -> Result<Vec<ResumeDocument>, GatewayError>;

    async fn delete(&self, id: &str) -> Result<(), GatewayError>;

    /// Rendered PDF bytes; rendering itself happens on the remote side.
    async fn download_pdf(&self, id: &str) -> Result<Bytes, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_message_skips_blank() {
        let err = GatewayError::Api {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(err.remote_message(), None);

        let err = GatewayError::Validation("Email already used".to_string());
        assert_eq!(err.remote_message(), Some("Email already used"));

        assert_eq!(GatewayError::Unavailable("down".into()).remote_message(), None);
    }

    #[test]
    fn test_transport_classification() {
        assert!(GatewayError::Unavailable("down".into()).is_transport());
        assert!(!GatewayError::NotFound("x".into()).is_transport());
    }
}
