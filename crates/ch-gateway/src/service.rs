//! Gateway service - HTTP surface and component wiring.
//!
//! | Route                          | Message type         |
//! |--------------------------------|----------------------|
//! | `POST /messages/log/:pid`      | `ids:LogMessage`     |
//! | `POST /process/:pid`           | `ids:RequestMessage` |
//! | `POST /messages/query/:pid`    | `ids:QueryMessage`   |
//! | `GET  /health`                 | -                    |
//!
//! The three message routes are also mounted without `:pid` so that a
//! missing pid is answered with a rejection envelope instead of a 404.

use crate::backend::{BackendSender, BackendTransport, HttpTransport};
use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::domain::ids::IdGenerator;
use crate::domain::paging::PagingQuery;
use crate::domain::request::{HandlerResponse, Route};
use crate::handler::MessageHandler;
use crate::middleware::{RequestLimitLayer, TracingLayer};
use crate::multipart::{MultipartBody, HEADER_PART, PAYLOAD_PART};
use crate::pipeline::{InboundMessage, Validator};
use crate::ports::{SystemTimeSource, TimeSource};
use crate::response::ResponseBuilder;
use crate::strategy::StrategyRegistry;
use crate::token::{verifier_from_config, DatVerifier, GatewayIdentity, TokenMinter};
use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, DefaultBodyLimit, Multipart,
        Path, Query, State,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{error, info, warn};

/// Gateway service
pub struct GatewayService {
    config: GatewayConfig,
    state: AppState,
}

impl GatewayService {
    /// Create the service with production collaborators.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let transport = HttpTransport::new(config.backend.timeout)
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        let verifier = verifier_from_config(&config.dat);
        Self::with_components(
            config,
            verifier,
            Arc::new(transport),
            Arc::new(SystemTimeSource),
        )
    }

    /// Create the service with explicit collaborators.
    pub fn with_components(
        config: GatewayConfig,
        verifier: Arc<dyn DatVerifier>,
        transport: Arc<dyn BackendTransport>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        if config.backend.legacy_page_param {
            warn!("Legacy page parameter enabled: query URLs carry the size value as page");
        }

        let ids = IdGenerator::new(config.identity.id_base.clone());
        let minter = Arc::new(TokenMinter::new(&config.service_token, clock));
        let identity = Arc::new(GatewayIdentity::new(
            &config.identity,
            Arc::clone(&minter),
            ids.clone(),
        ));
        let responses = ResponseBuilder::new(identity);

        let registry = Arc::new(StrategyRegistry::with_defaults(
            config.backend.legacy_page_param,
        ));
        info!(strategies = ?registry.names(), "Message strategies registered");
        let handler = MessageHandler::new(
            registry,
            minter,
            BackendSender::new(transport),
            responses.clone(),
            config.backend.base_url(),
        );

        let state = AppState {
            validator: Arc::new(Validator::new(verifier, ids)),
            handler: Arc::new(handler),
            responses,
        };

        Ok(Self { config, state })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// HTTP router with middleware
    pub fn router(&self) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(TracingLayer::new())
            .layer(RequestLimitLayer::new(
                self.config.limits.clone(),
                self.state.responses.clone(),
            ));

        Router::new()
            .route("/messages/log/:pid", post(log_message))
            .route("/messages/log", post(log_message_without_pid))
            .route("/process/:pid", post(create_process))
            .route("/process", post(create_process_without_pid))
            .route("/messages/query/:pid", post(query_messages))
            .route("/messages/query", post(query_messages_without_pid))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::max(self.config.limits.max_request_size))
            .layer(middleware)
            .with_state(self.state.clone())
    }

    /// Bind and serve until Ctrl+C.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{}: {}", addr, e)))?;
        info!(addr = %addr, backend = %self.config.backend.base_url(), "Gateway listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Serve(e.to_string()))?;

        info!("Gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    validator: Arc<Validator>,
    handler: Arc<MessageHandler>,
    responses: ResponseBuilder,
}

type MultipartResult = Result<Multipart, MultipartRejection>;
type PagingResult = Result<Query<PagingQuery>, QueryRejection>;

fn paging_query(paging: PagingResult) -> Result<PagingQuery, String> {
    paging.map(|Query(q)| q).map_err(|e| e.body_text())
}

async fn log_message(
    State(state): State<AppState>,
    Path(pid): Path<String>,
    multipart: MultipartResult,
) -> Response {
    process(state, Route::Log, Some(pid), Ok(PagingQuery::default()), multipart).await
}

async fn log_message_without_pid(
    State(state): State<AppState>,
    multipart: MultipartResult,
) -> Response {
    process(state, Route::Log, None, Ok(PagingQuery::default()), multipart).await
}

async fn create_process(
    State(state): State<AppState>,
    Path(pid): Path<String>,
    multipart: MultipartResult,
) -> Response {
    process(
        state,
        Route::CreateProcess,
        Some(pid),
        Ok(PagingQuery::default()),
        multipart,
    )
    .await
}

async fn create_process_without_pid(
    State(state): State<AppState>,
    multipart: MultipartResult,
) -> Response {
    process(
        state,
        Route::CreateProcess,
        None,
        Ok(PagingQuery::default()),
        multipart,
    )
    .await
}

async fn query_messages(
    State(state): State<AppState>,
    Path(pid): Path<String>,
    paging: PagingResult,
    multipart: MultipartResult,
) -> Response {
    process(state, Route::Query, Some(pid), paging_query(paging), multipart).await
}

async fn query_messages_without_pid(
    State(state): State<AppState>,
    paging: PagingResult,
    multipart: MultipartResult,
) -> Response {
    process(state, Route::Query, None, paging_query(paging), multipart).await
}

/// Validate, dispatch and encode one inbound message
async fn process(
    state: AppState,
    route: Route,
    pid: Option<String>,
    paging: Result<PagingQuery, String>,
    multipart: MultipartResult,
) -> Response {
    let mut inbound = InboundMessage::new(route, pid);
    match paging {
        Ok(paging) => inbound.paging = paging,
        Err(e) => inbound.paging_error = Some(e),
    }

    match multipart {
        Ok(mut multipart) => match read_parts(&mut multipart).await {
            Ok((header, payload)) => {
                inbound.header = header;
                inbound.payload = payload;
            }
            Err(e) => warn!(route = %route, error = %e, "Unreadable multipart body"),
        },
        Err(e) => warn!(route = %route, error = %e, "Request is not multipart"),
    }

    let (status, response) = match state.validator.validate(inbound).await {
        Ok(request) => match state.handler.handle(request).await {
            Ok(response) => (StatusCode::CREATED, response),
            Err(e) => return internal_error(e),
        },
        Err(rejection) => match state
            .responses
            .rejection_response(rejection.reason, &rejection.correlation)
        {
            Ok(response) => (rejection.status, response),
            Err(e) => return internal_error(GatewayError::Internal(e.to_string())),
        },
    };

    multipart_response(status, &response)
}

async fn read_parts(
    multipart: &mut Multipart,
) -> Result<(Option<Bytes>, Option<String>), axum::extract::multipart::MultipartError> {
    let mut header = None;
    let mut payload = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(HEADER_PART) => header = Some(field.bytes().await?),
            Some(PAYLOAD_PART) => payload = Some(field.text().await?),
            _ => {}
        }
    }
    Ok((header, payload))
}

fn multipart_response(status: StatusCode, response: &HandlerResponse) -> Response {
    match MultipartBody::from_response(response) {
        Ok(body) => (status, [(CONTENT_TYPE, body.content_type())], body.encode()).into_response(),
        Err(e) => internal_error(GatewayError::Internal(e.to_string())),
    }
}

fn internal_error(e: GatewayError) -> Response {
    error!(error = %e, "Request could not be answered with an envelope");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION
    }))
}
