use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::models::Status;
use crate::validation::{Address, DeliverabilityCheck, VerifyError};

pub const DEFAULT_PROVIDER_URL: &str = "https://emailvalidation.abstractapi.com/v1/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOptions {
    /// Missing credentials are not a startup error: every check through the
    /// provider then degrades to `Unverifiable`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    deliverability: Option<String>,
    #[serde(default)]
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Maps the provider's deliverability label onto a [`Status`].
///
/// `CATCH_ALL`, `RISKY`, `UNKNOWN` and anything unrecognised stay
/// `Unverifiable`.
pub fn classify_deliverability(label: &str) -> Status {
    match label.trim().to_ascii_uppercase().as_str() {
        "DELIVERABLE" | "VALID" => Status::Valid,
        "UNDELIVERABLE" | "INVALID" => Status::Invalid,
        _ => Status::Unverifiable,
    }
}

/// Check delegated to the AbstractAPI email validation endpoint.
pub struct ProviderCheck {
    client: Client,
    options: ProviderOptions,
}

impl ProviderCheck {
    pub fn new(options: ProviderOptions) -> Result<Self, VerifyError> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl DeliverabilityCheck for ProviderCheck {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn check(&self, address: &Address) -> Result<Status, VerifyError> {
        let api_key = self
            .options
            .api_key
            .as_deref()
            .ok_or(VerifyError::MissingCredentials)?;

        // The body is decoded whatever the HTTP status: error payloads carry
        // their own `error` object.
        let body: ProviderResponse = self
            .client
            .get(&self.options.base_url)
            .query(&[("api_key", api_key), ("email", address.raw.as_str())])
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = body.error {
            return Err(VerifyError::Provider(
                error
                    .message
                    .unwrap_or_else(|| "unspecified provider error".to_string()),
            ));
        }

        let label = body.deliverability.unwrap_or_default();
        debug!(email = %address.raw, deliverability = %label, "provider verdict");
        Ok(classify_deliverability(&label))
    }
}
