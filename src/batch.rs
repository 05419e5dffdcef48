use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::info;

use crate::models::VerificationResult;
use crate::verifier::Verifier;

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Applies a [`Verifier`] to a whole batch.
///
/// At most `width` addresses are in flight at once, and results come back in
/// input order whatever order the checks finish in.
#[derive(Clone)]
pub struct BatchVerifier {
    verifier: Verifier,
    width: usize,
}

impl BatchVerifier {
    pub fn new(verifier: Verifier, width: usize) -> Self {
        Self {
            verifier,
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub async fn verify_batch(&self, emails: &[String]) -> Vec<VerificationResult> {
        let started = Instant::now();

        let results: Vec<VerificationResult> = stream::iter(emails)
            .map(|email| self.verifier.verify(email))
            .buffered(self.width)
            .collect()
            .await;

        info!(
            batch_size = emails.len(),
            width = self.width,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch verified"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use crate::validation::{Address, DeliverabilityCheck, VerifyError};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers by the first character of the local part, sleeping longer for
    /// earlier addresses so completions arrive out of order.
    struct ByLocalPart {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DeliverabilityCheck for ByLocalPart {
        fn name(&self) -> &'static str {
            "by-local-part"
        }

        async fn check(&self, address: &Address) -> Result<Status, VerifyError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay: u64 = address.local[1..].parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(50 - delay * 5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match address.local.chars().next() {
                Some('v') => Ok(Status::Valid),
                Some('i') => Ok(Status::Invalid),
                _ => Err(VerifyError::Smtp("no answer".to_string())),
            }
        }
    }

    fn batch(width: usize) -> (BatchVerifier, Arc<ByLocalPart>) {
        let check = Arc::new(ByLocalPart {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let shared: Arc<dyn DeliverabilityCheck> = check.clone();
        let verifier = Verifier::new(vec![shared]);
        (BatchVerifier::new(verifier, width), check)
    }

    #[tokio::test]
    async fn test_order_and_length_preserved() {
        let (batch, _) = batch(4);
        let emails: Vec<String> = vec![
            "v0@example.com",
            "i1@example.com",
            "not-an-email",
            "u3@example.com",
            "v4@example.com",
            "i5@example.com",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let results = batch.verify_batch(&emails).await;

        assert_eq!(results.len(), emails.len());
        let echoed: Vec<&str> = results.iter().map(|r| r.email()).collect();
        assert_eq!(echoed, emails.iter().map(String::as_str).collect::<Vec<_>>());
        let statuses: Vec<Status> = results.iter().map(|r| r.status()).collect();
        assert_eq!(
            statuses,
            vec![
                Status::Valid,
                Status::Invalid,
                Status::Invalid,
                Status::Unverifiable,
                Status::Valid,
                Status::Invalid,
            ]
        );
    }

    #[tokio::test]
    async fn test_width_bounds_in_flight_checks() {
        let (batch, check) = batch(2);
        let emails: Vec<String> = (0..8).map(|i| format!("v{i}@example.com")).collect();

        let results = batch.verify_batch(&emails).await;

        assert_eq!(results.len(), 8);
        assert!(check.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_duplicates_are_verified_individually() {
        let (batch, _) = batch(3);
        let emails = vec!["v1@example.com".to_string(), "v1@example.com".to_string()];
        let results = batch.verify_batch(&emails).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn test_empty_batch() {
        let (batch, _) = batch(5);
        let results = tokio_test::block_on(batch.verify_batch(&[]));
        assert!(results.is_empty());
    }

    #[test]
    fn test_zero_width_is_clamped() {
        let (batch, _) = batch(0);
        assert_eq!(batch.width(), 1);
    }
}
