use std::future::{Ready, ready};
use std::pin::Pin;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::{Error, HttpResponse};
use tracing::warn;

use crate::models::ErrorMessage;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared-secret guard for the API.
///
/// Requests whose `x-api-key` header is missing or differs from the
/// configured key are answered with `401` before the wrapped service (and
/// therefore the body extractor) ever runs. Built with `None`, the guard lets
/// everything through.
pub struct ApiKeyAuth {
    expected: Option<Arc<str>>,
}

impl ApiKeyAuth {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            expected: api_key.map(Arc::from),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyMiddleware {
            service,
            expected: self.expected.clone(),
        }))
    }
}

pub struct ApiKeyMiddleware<S> {
    service: S,
    expected: Option<Arc<str>>,
}

impl<S> ApiKeyMiddleware<S> {
    fn is_authorized(&self, req: &ServiceRequest) -> bool {
        let Some(expected) = self.expected.as_deref() else {
            return true;
        };

        req.headers()
            .get(API_KEY_HEADER)
            .is_some_and(|presented| keys_match(expected.as_bytes(), presented.as_bytes()))
    }
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !self.is_authorized(&req) {
            warn!(
                method = %req.method(),
                path = %req.path(),
                "rejected request with missing or invalid API key"
            );
            let response = req
                .into_response(HttpResponse::Unauthorized().json(ErrorMessage::new("Invalid API key")))
                .map_into_right_body();
            return Box::pin(async move { Ok(response) });
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

// Length leaks, content does not.
fn keys_match(expected: &[u8], presented: &[u8]) -> bool {
    expected.len() == presented.len()
        && expected
            .iter()
            .zip(presented)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}


#[cfg(test)]
mod key_comparison_tests {
    use super::keys_match;

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"abc", b"abc"));
        assert!(!keys_match(b"abc", b"abd"));
        assert!(!keys_match(b"abc", b"abcd"));
        assert!(!keys_match(b"", b"a"));
    }
}
