use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use trust_dns_resolver::Name;
use uuid::Uuid;

use crate::models::Status;
use crate::validation::dnsmx::{MailHosts, MxResolver, resolve_mail_hosts};
use crate::validation::{Address, DeliverabilityCheck, VerifyError};

/// Knobs for the SMTP handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpProbeOptions {
    pub port: u16,
    pub helo_domain: String,
    /// Envelope sender; empty means the null sender `<>`.
    pub mail_from: String,
    /// Deadline for one whole conversation with one host.
    pub timeout: Duration,
    pub max_hosts: usize,
    /// Send a second `RCPT TO` with a random local part to detect catch-all servers.
    pub catch_all_probe: bool,
}

impl Default for SmtpProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_domain: "localhost".to_string(),
            mail_from: String::new(),
            timeout: Duration::from_secs(10),
            max_hosts: 3,
            catch_all_probe: true,
        }
    }
}

/// What one mail host said about a mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Accepted,
    Rejected,
    /// The host accepts any local part, so acceptance proves nothing.
    CatchAll,
    Inconclusive(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    /// RFC 3463 enhanced status code (`class.subject.detail`) leading the
    /// first line, when the server sends one.
    pub fn enhanced_code(&self) -> Option<(u8, u16, u16)> {
        let token = self.lines.first()?.split_whitespace().next()?;
        let mut parts = token.split('.');
        let class = parts.next()?.parse::<u8>().ok()?;
        let subject = parts.next()?.parse::<u16>().ok()?;
        let detail = parts.next()?.parse::<u16>().ok()?;
        if parts.next().is_some() || !matches!(class, 2 | 4 | 5) {
            return None;
        }
        Some((class, subject, detail))
    }

    /// A permanent refusal of the mailbox itself.
    ///
    /// With an enhanced code only addressing failures (`5.1.x`) count,
    /// except `5.1.3` which blames the address syntax; policy blocks such as
    /// `5.7.1` do not. Without one, plain 550 and 551 count.
    pub fn is_mailbox_rejection(&self) -> bool {
        if !(500..600).contains(&self.code) {
            return false;
        }
        match self.enhanced_code() {
            Some((5, 1, detail)) => detail != 3,
            Some(_) => false,
            None => matches!(self.code, 550 | 551),
        }
    }

    /// Whether an EHLO reply advertises `extension`.
    pub fn advertises(&self, extension: &str) -> bool {
        self.lines.iter().skip(1).any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|keyword| keyword.eq_ignore_ascii_case(extension))
        })
    }
}

/// ASCII form of a recipient domain: IDNA labels become `xn--`, address
/// literals pass through untouched.
fn ascii_domain(domain: &str) -> String {
    if domain.starts_with('[') {
        return domain.to_string();
    }
    Name::from_utf8(domain)
        .map(|name| name.to_ascii().trim_end_matches('.').to_string())
        .unwrap_or_else(|_| domain.to_string())
}

/// Splits one reply line into its code, whether more lines follow, and text.
fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), VerifyError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let code = line
        .get(..3)
        .and_then(|digits| digits.parse::<u16>().ok())
        .ok_or_else(|| VerifyError::Smtp(format!("malformed reply line: {line:?}")))?;
    let continues = line.as_bytes().get(3) == Some(&b'-');
    let text = line.get(4..).unwrap_or("");
    Ok((code, continues, text))
}

struct SmtpSession {
    stream: BufReader<TcpStream>,
}

impl SmtpSession {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    async fn read_reply(&mut self) -> Result<SmtpReply, VerifyError> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            if self.stream.read_line(&mut line).await? == 0 {
                return Err(VerifyError::Smtp("connection closed by server".to_string()));
            }
            debug!("< {}", line.trim_end());
            let (code, continues, text) = parse_reply_line(&line)?;
            lines.push(text.to_string());
            if !continues {
                return Ok(SmtpReply { code, lines });
            }
        }
    }

    async fn command(&mut self, command: &str) -> Result<SmtpReply, VerifyError> {
        debug!("> {}", command);
        let stream = self.stream.get_mut();
        stream.write_all(command.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        self.read_reply().await
    }

    async fn quit(&mut self) {
        let _ = self.command("QUIT").await;
    }
}

/// Mailbox probing capability against a single mail host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmtpProber: Send + Sync {
    async fn probe(&self, host: &str, address: &Address) -> Result<ProbeOutcome, VerifyError>;
}

/// [`SmtpProber`] speaking plain SMTP over TCP.
pub struct TcpSmtpProber {
    options: SmtpProbeOptions,
}

impl TcpSmtpProber {
    pub fn new(options: SmtpProbeOptions) -> Self {
        Self { options }
    }

    async fn converse(&self, host: &str, address: &Address) -> Result<ProbeOutcome, VerifyError> {
        let stream = TcpStream::connect((host, self.options.port))
            .await
            .map_err(|source| VerifyError::Connect {
                host: host.to_string(),
                source,
            })?;
        let mut session = SmtpSession::new(stream);

        let banner = session.read_reply().await?;
        if !banner.is_positive_completion() {
            session.quit().await;
            return Ok(ProbeOutcome::Inconclusive(format!(
                "banner refused with {}",
                banner.code
            )));
        }

        let ehlo = session
            .command(&format!("EHLO {}", self.options.helo_domain))
            .await?;
        let smtputf8 = if ehlo.is_positive_completion() {
            ehlo.advertises("SMTPUTF8")
        } else {
            let helo = session
                .command(&format!("HELO {}", self.options.helo_domain))
                .await?;
            if !helo.is_positive_completion() {
                session.quit().await;
                return Ok(ProbeOutcome::Inconclusive(format!(
                    "greeting refused with {}",
                    helo.code
                )));
            }
            false
        };

        // A UTF-8 local part cannot be sent without SMTPUTF8, and any refusal
        // would then say nothing about the mailbox.
        let needs_utf8 = !address.local.is_ascii();
        if needs_utf8 && !smtputf8 {
            session.quit().await;
            return Ok(ProbeOutcome::Inconclusive(
                "UTF-8 local part but SMTPUTF8 not offered".to_string(),
            ));
        }

        let mail_from = if needs_utf8 {
            format!("MAIL FROM:<{}> SMTPUTF8", self.options.mail_from)
        } else {
            format!("MAIL FROM:<{}>", self.options.mail_from)
        };
        let mail = session.command(&mail_from).await?;
        if !mail.is_positive_completion() {
            session.quit().await;
            return Ok(ProbeOutcome::Inconclusive(format!(
                "MAIL FROM refused with {}",
                mail.code
            )));
        }

        let domain = ascii_domain(&address.domain);
        let target = session
            .command(&format!("RCPT TO:<{}@{}>", address.local, domain))
            .await?;
        let outcome = if target.is_mailbox_rejection() {
            ProbeOutcome::Rejected
        } else if !target.is_positive_completion() {
            let kind = if target.is_transient_failure() {
                "temporary failure"
            } else {
                "unexpected reply"
            };
            ProbeOutcome::Inconclusive(format!("{kind} {}", target.code))
        } else if self.options.catch_all_probe {
            self.probe_catch_all(&mut session, &domain).await?
        } else {
            ProbeOutcome::Accepted
        };

        let _ = session.command("RSET").await;
        session.quit().await;
        Ok(outcome)
    }

    async fn probe_catch_all(
        &self,
        session: &mut SmtpSession,
        domain: &str,
    ) -> Result<ProbeOutcome, VerifyError> {
        let random_local = format!("probe-{}", Uuid::new_v4().simple());
        let reply = session
            .command(&format!("RCPT TO:<{}@{}>", random_local, domain))
            .await?;

        Ok(if reply.is_positive_completion() {
            ProbeOutcome::CatchAll
        } else if reply.is_mailbox_rejection() {
            ProbeOutcome::Accepted
        } else {
            ProbeOutcome::Inconclusive(format!("catch-all probe answered {}", reply.code))
        })
    }
}

#[async_trait]
impl SmtpProber for TcpSmtpProber {
    async fn probe(&self, host: &str, address: &Address) -> Result<ProbeOutcome, VerifyError> {
        tokio::time::timeout(self.options.timeout, self.converse(host, address))
            .await
            .map_err(|_| VerifyError::Timeout {
                stage: "SMTP handshake",
                after: self.options.timeout,
            })?
    }
}

/// Mailbox-level check: MX resolution followed by an SMTP handshake against
/// the preferred hosts.
pub struct SmtpCheck {
    resolver: Arc<dyn MxResolver>,
    prober: Arc<dyn SmtpProber>,
    max_hosts: usize,
}

impl SmtpCheck {
    pub fn new(resolver: Arc<dyn MxResolver>, prober: Arc<dyn SmtpProber>, max_hosts: usize) -> Self {
        Self {
            resolver,
            prober,
            max_hosts: max_hosts.max(1),
        }
    }
}

#[async_trait]
impl DeliverabilityCheck for SmtpCheck {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn check(&self, address: &Address) -> Result<Status, VerifyError> {
        let hosts: Vec<String> = match address.domain_literal() {
            Some(literal) => vec![literal.to_string()],
            None => match resolve_mail_hosts(self.resolver.as_ref(), address).await? {
                MailHosts::Found(hosts) => hosts.into_iter().map(|mx| mx.exchange).collect(),
                MailHosts::Settled(status) => return Ok(status),
            },
        };

        for host in hosts.iter().take(self.max_hosts) {
            match self.prober.probe(host, address).await {
                Ok(ProbeOutcome::Accepted) => return Ok(Status::Valid),
                Ok(ProbeOutcome::Rejected) => return Ok(Status::Invalid),
                Ok(ProbeOutcome::CatchAll) => {
                    debug!(email = %address.raw, host = %host, "catch-all mail host");
                    return Ok(Status::Unverifiable);
                }
                Ok(ProbeOutcome::Inconclusive(reason)) => {
                    debug!(email = %address.raw, host = %host, reason = %reason, "inconclusive probe");
                }
                Err(err) => {
                    warn!(email = %address.raw, host = %host, error = %err, "SMTP probe failed");
                }
            }
        }

        Ok(Status::Unverifiable)
    }
}

#[cfg(test)]
#[path = "smtp_test.rs"]
mod tests;
