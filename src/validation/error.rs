use std::time::Duration;

use thiserror::Error;

/// Outcome of an MX lookup that produced no usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsLookupError {
    /// NXDOMAIN: the domain does not exist.
    #[error("domain does not exist")]
    NotFound,
    #[error("DNS lookup timed out")]
    Timeout,
    #[error("DNS lookup failed: {0}")]
    Failed(String),
}

/// Failure of a single deliverability check. Never leaves the verifier: each
/// one is logged and degrades the affected address to `Unverifiable`.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Dns(#[from] DnsLookupError),
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SMTP protocol error: {0}")]
    Smtp(String),
    #[error("{stage} timed out after {after:?}")]
    Timeout {
        stage: &'static str,
        after: Duration,
    },
    #[error("verification provider credentials are not configured")]
    MissingCredentials,
    #[error("verification provider error: {0}")]
    Provider(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}
