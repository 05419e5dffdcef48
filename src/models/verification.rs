use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::validation::syntax::domain_part;

/// Three-way verdict for a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Status {
    Valid,
    Invalid,
    Unverifiable,
}

/// # Verification Result
///
/// One entry of the `/verify` response. Built once by the verifier and never
/// mutated afterwards, so the fields are only exposed through accessors.
///
/// ## Example JSON
/// ```json
/// { "email": "user@example.com", "status": "Valid", "domain": "example.com" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerificationResult {
    email: String,
    status: Status,
    domain: String,
}

impl VerificationResult {
    pub fn new(email: &str, status: Status) -> Self {
        Self {
            email: email.to_string(),
            status,
            domain: domain_part(email).to_string(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub emails: Vec<String>,
}

/// Body of every client error response.
#[derive(Debug, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
