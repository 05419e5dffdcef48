use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use email_verifier::auth::ApiKeyAuth;
use email_verifier::batch::BatchVerifier;
use email_verifier::config::AppConfig;
use email_verifier::logging::init_logger;
use email_verifier::openapi::ApiDoc;
use email_verifier::verifier::Verifier;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Email Verifier Service Entry Point
///
/// Loads `.env`, reads the configuration from the environment, builds the
/// verification chain and serves `POST /verify`.
///
/// # Endpoints
/// - Verification: `POST /verify`
/// - Swagger UI: `/swagger-ui/` (only with `ENABLE_DOCS=true`)
/// - OpenAPI document: `/api-docs/openapi.json` (only with `ENABLE_DOCS=true`)
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;
    init_logger(config.log_format);

    if config.api_key.is_none() {
        warn!("API_KEY is not set; /verify accepts unauthenticated requests");
    }

    let verifier = Verifier::from_config(&config).map_err(std::io::Error::other)?;
    let batch = web::Data::new(BatchVerifier::new(verifier, config.concurrency));

    info!(
        host = %config.host,
        port = config.port,
        concurrency = config.concurrency,
        docs = config.docs_enabled,
        "starting email verifier"
    );

    let api_key = config.api_key.clone();
    let docs_enabled = config.docs_enabled;

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(batch.clone())
            .configure(|cfg| {
                if docs_enabled {
                    cfg.service(
                        SwaggerUi::new("/swagger-ui/{_:.*}")
                            .url("/api-docs/openapi.json", ApiDoc::openapi()),
                    );
                }
            })
            .service(
                web::scope("")
                    .wrap(ApiKeyAuth::new(api_key.clone()))
                    .configure(email_verifier::routes::configure),
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
