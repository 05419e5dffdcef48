use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, StrategyKind};
use crate::models::{Status, VerificationResult};
use crate::validation::dnsmx::{DnsMxCheck, MxResolver, TrustDnsMxResolver};
use crate::validation::provider::ProviderCheck;
use crate::validation::smtp::{SmtpCheck, TcpSmtpProber};
use crate::validation::{Address, DeliverabilityCheck, VerifyError, syntax};

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(15);

/// The email-verification decision function.
///
/// Runs the syntax check, then each configured [`DeliverabilityCheck`] in
/// order. `Invalid` from any check and `Valid` from a mailbox-level check end
/// the chain. A domain-level `Valid` only counts when no other check was
/// inconclusive. Every failure path ends in a [`VerificationResult`]; nothing
/// is propagated to the caller.
#[derive(Clone)]
pub struct Verifier {
    checks: Arc<[Arc<dyn DeliverabilityCheck>]>,
    timeout: Duration,
}

impl Verifier {
    pub fn new(checks: Vec<Arc<dyn DeliverabilityCheck>>) -> Self {
        Self {
            checks: checks.into(),
            timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    /// Bound on the whole check chain for one address.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Assembles the check chain named by `config.strategy`. DNS and SMTP
    /// checks share one resolver.
    pub fn from_config(config: &AppConfig) -> Result<Self, VerifyError> {
        let mut resolver: Option<Arc<dyn MxResolver>> = None;
        let mut shared_resolver = || {
            resolver
                .get_or_insert_with(|| -> Arc<dyn MxResolver> {
                    Arc::new(TrustDnsMxResolver::new(config.dns.timeout, config.dns.attempts))
                })
                .clone()
        };

        let mut checks: Vec<Arc<dyn DeliverabilityCheck>> = Vec::new();
        for kind in &config.strategy {
            let check: Arc<dyn DeliverabilityCheck> = match kind {
                StrategyKind::Dns => Arc::new(DnsMxCheck::new(shared_resolver())),
                StrategyKind::Smtp => Arc::new(SmtpCheck::new(
                    shared_resolver(),
                    Arc::new(TcpSmtpProber::new(config.smtp.clone())),
                    config.smtp.max_hosts,
                )),
                StrategyKind::Api => {
                    if config.provider.api_key.is_none() {
                        warn!("api strategy enabled without ABSTRACT_API_KEY; its answers will be Unverifiable");
                    }
                    Arc::new(ProviderCheck::new(config.provider.clone())?)
                }
            };
            checks.push(check);
        }

        let verifier = Self::new(checks).with_timeout(config.check_timeout);
        info!(checks = ?verifier.check_names(), timeout = ?verifier.timeout, "verifier ready");
        Ok(verifier)
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Verifies one address. Never fails and never panics outward.
    pub async fn verify(&self, email: &str) -> VerificationResult {
        let Some(address) = syntax::parse_address(email) else {
            debug!(email = %email, "failed syntax check");
            return VerificationResult::new(email, Status::Invalid);
        };

        let guarded = AssertUnwindSafe(self.run_checks(&address)).catch_unwind();
        let status = match tokio::time::timeout(self.timeout, guarded).await {
            Ok(Ok(status)) => status,
            Ok(Err(_)) => {
                error!(email = %email, "verification check panicked");
                Status::Unverifiable
            }
            Err(_) => {
                warn!(email = %email, timeout = ?self.timeout, "verification timed out");
                Status::Unverifiable
            }
        };

        debug!(email = %email, status = ?status, "verified");
        VerificationResult::new(email, status)
    }

    async fn run_checks(&self, address: &Address) -> Status {
        if self.checks.is_empty() {
            return Status::Valid;
        }

        // A domain-level Valid only stands if no check was inconclusive.
        let mut provisional = false;
        let mut inconclusive = false;

        for check in self.checks.iter() {
            match check.check(address).await {
                Ok(Status::Invalid) => return Status::Invalid,
                Ok(Status::Valid) if check.speaks_for_mailbox() => return Status::Valid,
                Ok(Status::Valid) => {
                    debug!(check = check.name(), email = %address.raw, "provisionally valid");
                    provisional = true;
                }
                Ok(Status::Unverifiable) => {
                    debug!(check = check.name(), email = %address.raw, "inconclusive, trying next check");
                    inconclusive = true;
                }
                Err(err) => {
                    warn!(check = check.name(), email = %address.raw, error = %err, "check failed");
                    inconclusive = true;
                }
            }
        }

        if provisional && !inconclusive {
            Status::Valid
        } else {
            Status::Unverifiable
        }
    }
}
