use utoipa::OpenApi;

/// OpenAPI description of the verification API.
///
/// Served at `/api-docs/openapi.json` with a Swagger UI at `/swagger-ui/`
/// when `ENABLE_DOCS=true`. Neither route exists otherwise.
#[derive(OpenApi)]
#[openapi(
    paths(crate::routes::verify::verify_emails),
    components(
        schemas(
            crate::models::VerifyRequest,
            crate::models::VerificationResult,
            crate::models::Status,
            crate::models::ErrorMessage
        )
    ),
    tags(
        (name = "Email Verification", description = "Batch email address verification")
    ),
    info(
        description = "Classifies email addresses as Valid, Invalid or Unverifiable using syntax, DNS MX, SMTP and third-party checks",
        title = "Email Verifier API",
        version = "0.1.0",
    )
)]
pub struct ApiDoc;
