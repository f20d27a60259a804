//! Request size limit.
//!
//! Requests announcing a body above the configured limit are answered with
//! a `MALFORMED_MESSAGE` rejection before the multipart body is read.

use crate::domain::config::LimitsConfig;
use crate::domain::envelope::Correlation;
use crate::domain::reason::RejectionReason;
use crate::multipart::MultipartBody;
use crate::response::ResponseBuilder;
use axum::{
    body::Body,
    http::{header::CONTENT_LENGTH, header::CONTENT_TYPE, Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

/// Size limit layer
#[derive(Clone)]
pub struct RequestLimitLayer {
    config: Arc<LimitsConfig>,
    responses: ResponseBuilder,
}

impl RequestLimitLayer {
    pub fn new(config: LimitsConfig, responses: ResponseBuilder) -> Self {
        Self {
            config: Arc::new(config),
            responses,
        }
    }
}

impl<S> Layer<S> for RequestLimitLayer {
    type Service = RequestLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLimitService {
            inner,
            config: Arc::clone(&self.config),
            responses: self.responses.clone(),
        }
    }
}

/// Size limit service
#[derive(Clone)]
pub struct RequestLimitService<S> {
    inner: S,
    config: Arc<LimitsConfig>,
    responses: ResponseBuilder,
}

impl<S> Service<Request<Body>> for RequestLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let responses = self.responses.clone();
        // the clone is not ready; keep the service poll_ready drove
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if let Some(len) = content_length(&req) {
                if len > config.max_request_size {
                    warn!(
                        size = len,
                        max = config.max_request_size,
                        "Request too large (from header)"
                    );
                    return Ok(too_large(&responses));
                }
            }
            inner.call(req).await
        })
    }
}

fn content_length<B>(req: &Request<B>) -> Option<usize> {
    req.headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<usize>()
        .ok()
}

fn too_large(responses: &ResponseBuilder) -> Response {
    let encoded = responses
        .rejection_response(RejectionReason::MalformedMessage, &Correlation::none())
        .ok()
        .and_then(|r| MultipartBody::from_response(&r).ok());
    match encoded {
        Some(body) => (
            StatusCode::PAYLOAD_TOO_LARGE,
            [(CONTENT_TYPE, body.content_type())],
            body.encode(),
        )
            .into_response(),
        None => StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    }
}
