use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
    system_conf::read_system_conf,
};

use crate::models::Status;
use crate::validation::{Address, DeliverabilityCheck, DnsLookupError, VerifyError};

/// A mail exchanger for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxHost {
    /// Host name without the trailing root dot.
    pub exchange: String,
    pub preference: u16,
}

/// MX lookup capability.
///
/// Returns the exchangers sorted by preference, an empty list when the domain
/// exists but publishes no MX records, or a typed error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MxResolver: Send + Sync {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, DnsLookupError>;
}

/// [`MxResolver`] backed by the trust-dns async resolver.
pub struct TrustDnsMxResolver {
    resolver: TokioAsyncResolver,
}

impl TrustDnsMxResolver {
    /// Builds a resolver from the system configuration, falling back to the
    /// library default upstreams when it cannot be read.
    ///
    /// `timeout` and `attempts` apply per query.
    pub fn new(timeout: Duration, attempts: usize) -> Self {
        let (config, mut opts) = match read_system_conf() {
            Ok(system) => system,
            Err(err) => {
                warn!(error = %err, "system resolver configuration unavailable, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;
        opts.attempts = attempts;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl MxResolver for TrustDnsMxResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, DnsLookupError> {
        match self.resolver.mx_lookup(fully_qualified(domain).as_str()).await {
            Ok(lookup) => {
                let mut hosts: Vec<MxHost> = lookup
                    .iter()
                    .map(|mx| MxHost {
                        exchange: mx.exchange().to_utf8().trim_end_matches('.').to_string(),
                        preference: mx.preference(),
                    })
                    // RFC 7505 null MX: the domain explicitly accepts no mail.
                    .filter(|host| !host.exchange.is_empty())
                    .collect();
                hosts.sort_by_key(|host| host.preference);
                Ok(hosts)
            }
            Err(err) => match classify_resolve_error(&err) {
                Some(lookup_err) => Err(lookup_err),
                None => Ok(Vec::new()),
            },
        }
    }
}

/// Appends the root label so resolv.conf search domains are never tried.
pub(crate) fn fully_qualified(domain: &str) -> String {
    format!("{}.", domain.trim_end_matches('.'))
}

/// Maps a resolver error onto [`DnsLookupError`]. `None` means the domain
/// exists but has no MX records.
pub fn classify_resolve_error(err: &ResolveError) -> Option<DnsLookupError> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            if *response_code == ResponseCode::NXDomain {
                Some(DnsLookupError::NotFound)
            } else if *response_code == ResponseCode::NoError {
                None
            } else {
                Some(DnsLookupError::Failed(format!("server responded {response_code}")))
            }
        }
        ResolveErrorKind::Timeout => Some(DnsLookupError::Timeout),
        _ => Some(DnsLookupError::Failed(err.to_string())),
    }
}

pub(crate) enum MailHosts {
    /// Non-empty, sorted by preference.
    Found(Vec<MxHost>),
    /// The lookup alone decides: `Invalid` for NXDOMAIN, `Unverifiable` when
    /// there are no MX records.
    Settled(Status),
}

pub(crate) async fn resolve_mail_hosts(
    resolver: &dyn MxResolver,
    address: &Address,
) -> Result<MailHosts, VerifyError> {
    match resolver.lookup_mx(&address.domain).await {
        Ok(hosts) if hosts.is_empty() => {
            debug!(domain = %address.domain, "no MX records");
            Ok(MailHosts::Settled(Status::Unverifiable))
        }
        Ok(hosts) => Ok(MailHosts::Found(hosts)),
        Err(DnsLookupError::NotFound) => {
            debug!(domain = %address.domain, "domain does not exist");
            Ok(MailHosts::Settled(Status::Invalid))
        }
        Err(err) => Err(err.into()),
    }
}

/// Domain-level check: does the domain publish mail exchangers?
pub struct DnsMxCheck {
    resolver: Arc<dyn MxResolver>,
}

impl DnsMxCheck {
    pub fn new(resolver: Arc<dyn MxResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl DeliverabilityCheck for DnsMxCheck {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn speaks_for_mailbox(&self) -> bool {
        false
    }

    async fn check(&self, address: &Address) -> Result<Status, VerifyError> {
        if address.domain_literal().is_some() {
            debug!(email = %address.raw, "address literal has no MX records to check");
            return Ok(Status::Unverifiable);
        }

        Ok(match resolve_mail_hosts(self.resolver.as_ref(), address).await? {
            MailHosts::Found(_) => Status::Valid,
            MailHosts::Settled(status) => status,
        })
    }
}

#[cfg(test)]
#[path = "dnsmx_test.rs"]
mod tests;
