/// # Verification Payloads
///
/// Request and response types of the `/verify` endpoint:
/// - [`VerifyRequest`]: `{ "emails": [...] }`
/// - [`VerificationResult`]: `{ "email", "status", "domain" }` per address
/// - [`ErrorMessage`]: `{ "message" }` for 4xx responses
///
/// [`VerifyRequest`]: crate::models::verification::VerifyRequest
/// [`VerificationResult`]: crate::models::verification::VerificationResult
/// [`ErrorMessage`]: crate::models::verification::ErrorMessage
pub mod verification;

pub use verification::{ErrorMessage, Status, VerificationResult, VerifyRequest};
