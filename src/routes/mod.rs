use actix_web::web;

/// # Email Verification Endpoint
///
/// `POST /verify` takes `{ "emails": [...] }` and answers with one
/// `{ email, status, domain }` entry per input address, in input order.
///
/// ## Responses
/// - **200 OK**: every address was processed
/// - **400 Bad Request**: `emails` missing, not an array, or not all strings
/// - **401 Unauthorized**: `x-api-key` missing or wrong (when a key is configured)
/// - **413 Payload Too Large**: body over 1 MiB
pub mod verify;

/// Registers the API routes together with the JSON extractor configuration
/// they depend on.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(verify::json_config())
        .configure(verify::configure_routes);
}
