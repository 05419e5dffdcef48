use async_trait::async_trait;

use crate::models::Status;

/// Strict syntax validation of email addresses.
///
/// # Examples
/// ```
/// use email_verifier::validation::syntax::is_valid_email;
///
/// assert!(is_valid_email("user.name+tag@example.com"));
/// assert!(!is_valid_email("invalid@ex_mple.com"));
/// ```
pub mod syntax;

/// Domain check through DNS MX records.
///
/// NXDOMAIN maps to `Invalid`, at least one MX record to `Valid`, and an
/// empty answer to `Unverifiable`. Every other resolver failure is reported
/// as an error so the caller can log it.
pub mod dnsmx;

/// Mailbox check through a minimal SMTP dialogue (no mail is sent).
pub mod smtp;

/// Delegation to the AbstractAPI email validation service.
pub mod provider;

mod error;

pub use error::{DnsLookupError, VerifyError};

/// An address that passed the syntax check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// The address exactly as submitted.
    pub raw: String,
    pub local: String,
    /// Lowercased domain, or a bracketed IPv4 literal.
    pub domain: String,
}

impl Address {
    /// The IPv4 literal inside `[...]`, if the domain is one.
    pub fn domain_literal(&self) -> Option<&str> {
        self.domain
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
    }
}

/// A single deliverability strategy.
///
/// Implementations answer for one address at a time and hold no per-request
/// state. `Ok(Status::Unverifiable)` and `Err(_)` both mean "no verdict"; the
/// verifier moves on to the next configured check.
#[async_trait]
pub trait DeliverabilityCheck: Send + Sync {
    /// Short name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Whether a `Valid` from this check speaks for the mailbox itself.
    ///
    /// Domain-level checks return `false`: their `Valid` is provisional and
    /// never overrides an earlier inconclusive answer nor stops a later
    /// mailbox-level check from running.
    fn speaks_for_mailbox(&self) -> bool {
        true
    }

    async fn check(&self, address: &Address) -> Result<Status, VerifyError>;
}
