use std::net::Ipv4Addr;

use crate::validation::Address;

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 63;

/// Validates an email address against a strict RFC 5322 subset.
///
/// Accepts dot-atom or quoted-string local parts, and either a domain name
/// with at least two labels or a bracketed IPv4 literal. Internationalized
/// (UTF-8) local parts and labels are allowed.
///
/// # Examples
/// ```
/// use email_verifier::validation::syntax::is_valid_email;
///
/// assert!(is_valid_email("user.name+tag@example.com"));
/// assert!(is_valid_email("user@[192.0.2.1]"));
/// assert!(!is_valid_email("not-an-email"));
/// assert!(!is_valid_email("user@localhost"));
/// ```
pub fn is_valid_email(email: &str) -> bool {
    parse_address(email).is_some()
}

/// Splits a syntactically valid address into its parts, or `None` when the
/// address fails validation.
pub fn parse_address(email: &str) -> Option<Address> {
    if email.len() > MAX_ADDRESS_LEN {
        return None;
    }

    let split_index = find_separator(email)?;
    let (local_part, domain_part) = email.split_at(split_index);
    let domain_part = &domain_part[1..];

    if local_part.len() > MAX_LOCAL_LEN || !is_valid_local_part(local_part) {
        return None;
    }
    if !is_valid_domain_part(domain_part) {
        return None;
    }

    Some(Address {
        raw: email.to_string(),
        local: local_part.to_string(),
        domain: domain_part.to_lowercase(),
    })
}

/// Best-effort domain extraction: everything after the first `@`, or an
/// empty string when there is none.
pub fn domain_part(email: &str) -> &str {
    email.split_once('@').map(|(_, domain)| domain).unwrap_or("")
}

/// Position of the `@` separating local and domain parts, skipping any `@`
/// inside a quoted local part.
fn find_separator(email: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escape = false;

    for (i, c) in email.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escape = true,
            '"' => in_quotes = !in_quotes,
            '@' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_valid_local_part(local: &str) -> bool {
    if local.len() >= 2 && local.starts_with('"') && local.ends_with('"') {
        is_valid_quoted_string(local)
    } else {
        is_valid_dot_atom(local)
    }
}

fn is_valid_domain_part(domain: &str) -> bool {
    match domain.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(literal) => literal.parse::<Ipv4Addr>().is_ok(),
        None => is_valid_domain_name(domain),
    }
}

/// Quoted-string from RFC 5322 section 3.4.1; only `\\` and `\"` escapes.
fn is_valid_quoted_string(quoted: &str) -> bool {
    let content = &quoted[1..quoted.len() - 1];
    if content.is_empty() {
        return false;
    }
    let mut escape = false;

    for c in content.chars() {
        if escape {
            if !matches!(c, '\\' | '"') {
                return false;
            }
            escape = false;
        } else if c == '\\' {
            escape = true;
        } else if c == '"' || c.is_control() {
            return false;
        }
    }
    !escape
}

fn is_valid_dot_atom(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c))
        })
}

fn is_valid_domain_name(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    });

    // Top-level label: two characters minimum and not purely numeric, which
    // also keeps bare IPv4 addresses out.
    let tld = labels[labels.len() - 1];
    labels_ok && tld.chars().count() >= 2 && !tld.chars().all(|c| c.is_ascii_digit())
}
