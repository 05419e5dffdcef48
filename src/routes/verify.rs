use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse, Responder, post, web};
use tracing::debug;

use crate::batch::BatchVerifier;
use crate::models::{ErrorMessage, VerificationResult, VerifyRequest};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub const BAD_REQUEST_MESSAGE: &str = "Request body must be an array of emails.";
pub const TOO_LARGE_MESSAGE: &str = "Request body too large.";

/// Verifies a batch of addresses.
///
/// Every input address gets exactly one entry in the response, in input
/// order. Per-address failures never fail the request; they show up as
/// `Unverifiable`.
#[utoipa::path(
    post,
    path = "/verify",
    request_body = VerifyRequest,
    params(
        ("x-api-key" = Option<String>, Header, description = "Shared secret, required when the server has one configured")
    ),
    responses(
        (status = 200, description = "One result per input address, in input order", body = [VerificationResult]),
        (status = 400, description = "`emails` missing or malformed", body = ErrorMessage),
        (status = 401, description = "Missing or invalid API key", body = ErrorMessage),
        (status = 413, description = "Request body too large", body = ErrorMessage)
    ),
    tag = "Email Verification"
)]
#[post("/verify")]
pub async fn verify_emails(
    req: web::Json<VerifyRequest>,
    batch: web::Data<BatchVerifier>,
) -> impl Responder {
    let request = req.into_inner();
    let results: Vec<VerificationResult> = batch.verify_batch(&request.emails).await;
    HttpResponse::Ok().json(results)
}

/// JSON extractor settings for `/verify`: the body limit plus the mapping of
/// every extraction failure onto the API's `{ message }` error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .error_handler(reject_payload)
}

fn reject_payload(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!(path = %req.path(), error = %err, "rejected request body");

    let response = match &err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            HttpResponse::PayloadTooLarge().json(ErrorMessage::new(TOO_LARGE_MESSAGE))
        }
        _ => HttpResponse::BadRequest().json(ErrorMessage::new(BAD_REQUEST_MESSAGE)),
    };
    InternalError::from_response(err, response).into()
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(verify_emails);
}

#[cfg(test)]
#[path = "verify_test.rs"]
mod tests;
