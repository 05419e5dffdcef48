use super::*;
use crate::validation::syntax::parse_address;
use trust_dns_resolver::Name;
use trust_dns_resolver::error::ResolveError;
use trust_dns_resolver::proto::op::Query;
use trust_dns_resolver::proto::rr::RecordType;

fn mx(exchange: &str, preference: u16) -> MxHost {
    MxHost {
        exchange: exchange.to_string(),
        preference,
    }
}

fn check_with(resolver: MockMxResolver) -> DnsMxCheck {
    DnsMxCheck::new(Arc::new(resolver))
}

#[tokio::test]
async fn test_domain_with_mx_records_is_valid() {
    let mut resolver = MockMxResolver::new();
    resolver.expect_lookup_mx().times(1).returning(|domain| {
        assert_eq!(domain, "example.com");
        Ok(vec![mx("mx1.example.com", 10), mx("mx2.example.com", 20)])
    });

    let address = parse_address("user@example.com").unwrap();
    let status = check_with(resolver).check(&address).await.unwrap();
    assert_eq!(status, Status::Valid);
}

#[tokio::test]
async fn test_lookup_uses_lowercased_domain() {
    let mut resolver = MockMxResolver::new();
    resolver.expect_lookup_mx().times(1).returning(|domain| {
        assert_eq!(domain, "example.com");
        Ok(vec![mx("mx.example.com", 5)])
    });

    let address = parse_address("User@EXAMPLE.Com").unwrap();
    assert_eq!(
        check_with(resolver).check(&address).await.unwrap(),
        Status::Valid
    );
}

#[tokio::test]
async fn test_nonexistent_domain_is_invalid() {
    let mut resolver = MockMxResolver::new();
    resolver
        .expect_lookup_mx()
        .returning(|_| Err(DnsLookupError::NotFound));

    let address = parse_address("user@thisdomaindoesnotexist12345.test").unwrap();
    let status = check_with(resolver).check(&address).await.unwrap();
    assert_eq!(status, Status::Invalid);
}

#[tokio::test]
async fn test_domain_without_mx_records_is_unverifiable() {
    let mut resolver = MockMxResolver::new();
    resolver.expect_lookup_mx().returning(|_| Ok(Vec::new()));

    let address = parse_address("user@no-mail.example").unwrap();
    let status = check_with(resolver).check(&address).await.unwrap();
    assert_eq!(status, Status::Unverifiable);
}

#[tokio::test]
async fn test_timeout_is_reported_as_error() {
    let mut resolver = MockMxResolver::new();
    resolver
        .expect_lookup_mx()
        .returning(|_| Err(DnsLookupError::Timeout));

    let address = parse_address("user@slow.example").unwrap();
    let result = check_with(resolver).check(&address).await;
    assert!(matches!(
        result,
        Err(VerifyError::Dns(DnsLookupError::Timeout))
    ));
}

#[tokio::test]
async fn test_servfail_is_reported_as_error() {
    let mut resolver = MockMxResolver::new();
    resolver
        .expect_lookup_mx()
        .returning(|_| Err(DnsLookupError::Failed("server responded SERVFAIL".to_string())));

    let address = parse_address("user@broken.example").unwrap();
    let result = check_with(resolver).check(&address).await;
    assert!(matches!(result, Err(VerifyError::Dns(DnsLookupError::Failed(_)))));
}

#[tokio::test]
async fn test_address_literal_skips_lookup() {
    let mut resolver = MockMxResolver::new();
    resolver.expect_lookup_mx().times(0);

    let address = parse_address("user@[192.0.2.1]").unwrap();
    let status = check_with(resolver).check(&address).await.unwrap();
    assert_eq!(status, Status::Unverifiable);
}

#[test]
fn test_classify_timeout() {
    let err = ResolveError::from(ResolveErrorKind::Timeout);
    assert_eq!(classify_resolve_error(&err), Some(DnsLookupError::Timeout));
}

#[test]
fn test_classify_other_errors_as_failed() {
    let err = ResolveError::from(ResolveErrorKind::Message("no connections available"));
    assert!(matches!(
        classify_resolve_error(&err),
        Some(DnsLookupError::Failed(_))
    ));
}

#[test]
fn test_check_name() {
    let resolver = MockMxResolver::new();
    assert_eq!(check_with(resolver).name(), "dns");
}

fn no_records(response_code: ResponseCode) -> ResolveError {
    ResolveError::from(ResolveErrorKind::NoRecordsFound {
        query: Box::new(Query::query(
            Name::from_ascii("example.com.").unwrap(),
            RecordType::MX,
        )),
        soa: None,
        negative_ttl: None,
        response_code,
        trusted: true,
    })
}

#[test]
fn test_classify_nxdomain_as_not_found() {
    assert_eq!(
        classify_resolve_error(&no_records(ResponseCode::NXDomain)),
        Some(DnsLookupError::NotFound)
    );
}

#[test]
fn test_classify_noerror_without_records_as_empty() {
    assert_eq!(classify_resolve_error(&no_records(ResponseCode::NoError)), None);
}

#[test]
fn test_classify_servfail_as_failed() {
    assert!(matches!(
        classify_resolve_error(&no_records(ResponseCode::ServFail)),
        Some(DnsLookupError::Failed(_))
    ));
}

#[test]
fn test_lookup_name_is_fully_qualified() {
    assert_eq!(fully_qualified("example.com"), "example.com.");
    assert_eq!(fully_qualified("example.com."), "example.com.");
}
