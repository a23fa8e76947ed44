//! HTTP server setup and routing

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use deck_store::{ParseOptions, ParsedTemplate};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{authenticate, AuthUser};
use crate::config::Config;
use crate::error::{ApiError, Error, Result};
use crate::fetch::is_remote_url;
use crate::state::{AppState, SharedState};
use crate::storage::{sanitize_file_name, storage_key};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    templates: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseTemplateRequest {
    pub template_id: Option<String>,
    pub template_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ParseTemplateResponse {
    pub success: bool,
    pub template: ParsedTemplate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePresentationRequest {
    pub template_id: Option<String>,
    pub template_url: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
    pub output_file_name: Option<String>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePresentationResponse {
    pub success: bool,
    pub file_url: String,
    pub file_name: String,
    pub file_size: usize,
}

/// A template location resolved from a request
struct ResolvedTemplate {
    url: String,
    file_name: Option<String>,
}

/// Direct URLs win over catalog ids. Only catalog entries may point at
/// local files.
fn resolve_template(
    state: &AppState,
    template_id: Option<&str>,
    template_url: Option<&str>,
    missing_status: axum::http::StatusCode,
) -> ApiResult<ResolvedTemplate> {
    if let Some(url) = template_url.filter(|u| !u.trim().is_empty()) {
        if !is_remote_url(url) {
            return Err(ApiError::BadRequest("templateUrl must be an http(s) URL".to_string()));
        }
        return Ok(ResolvedTemplate { url: url.to_string(), file_name: None });
    }
    let id = template_id.filter(|id| !id.trim().is_empty()).ok_or(ApiError::MissingIdentifier)?;
    let entry = state.templates.get(id).ok_or_else(|| ApiError::MissingTemplate {
        id: id.to_string(),
        status: missing_status,
    })?;
    Ok(ResolvedTemplate { url: entry.url.clone(), file_name: Some(entry.file_name.clone()) })
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Last path segment of a URL, without query or fragment
fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    path.rsplit('/').next().filter(|name| !name.is_empty()).map(str::to_string)
}

/// Run blocking package work off the async executor
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthResponse { status: "ok", templates: state.templates.len() })
}

/// Describe a template's structure and fields
async fn parse_template(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ParseTemplateResponse>> {
    let user = authenticate(&headers, state.verifier.as_ref())?;
    let request: ParseTemplateRequest = parse_body(&body)?;

    let template = resolve_template(
        &state,
        request.template_id.as_deref(),
        request.template_url.as_deref(),
        axum::http::StatusCode::BAD_REQUEST,
    )?;
    let file_name = request
        .file_name
        .or(template.file_name)
        .or_else(|| file_name_from_url(&template.url))
        .unwrap_or_else(|| "template.pptx".to_string());

    info!(user = %user.id, url = %template.url, file = %file_name, "parsing template");
    let bytes = state.source.fetch(&template.url).await?;

    let mut options = ParseOptions::new(file_name)
        .with_limits(state.limits)
        .with_container_limits(state.container_limits)
        .with_catalog(state.fields.clone());
    if let Some(size) = request.file_size {
        options = options.with_file_size(size);
    }

    let template = blocking(move || {
        deck_store::parse_template(bytes, &options).map_err(ApiError::parse_failure)
    })
    .await?;

    Ok(Json(ParseTemplateResponse { success: true, template }))
}

/// Render a template with data and store the result
async fn generate_presentation(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<GeneratePresentationResponse>> {
    let user: AuthUser = authenticate(&headers, state.verifier.as_ref())?;
    let request: GeneratePresentationRequest = parse_body(&body)?;

    let template = resolve_template(
        &state,
        request.template_id.as_deref(),
        request.template_url.as_deref(),
        axum::http::StatusCode::NOT_FOUND,
    )?;

    info!(user = %user.id, url = %template.url, strict = request.strict, "generating presentation");
    let bytes = state.source.fetch(&template.url).await?;

    let options = state.render_options(request.strict);
    let data = request.data;
    let deck = blocking(move || {
        deck_store::render_template(bytes, &data, &options).map_err(ApiError::render_failure)
    })
    .await?;

    let file_name = sanitize_file_name(request.output_file_name.as_deref());
    let key = storage_key(&user.id, &file_name, chrono::Utc::now().timestamp_millis());
    let file_size = deck.bytes.len();
    let file_url = state.storage.put(&key, deck.bytes).await?;

    info!(
        user = %user.id,
        key = %key,
        size = file_size,
        rendered = deck.parts_rendered,
        "presentation stored"
    );

    Ok(Json(GeneratePresentationResponse { success: true, file_url, file_name, file_size }))
}

/// Build the axum router
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/functions/parse-template", post(parse_template))
        .route("/functions/generate-presentation", post(generate_presentation))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the service.
///
/// Generated decks are also served from `/files`, matching the default
/// public base URL. This function blocks until the server is shut down.
pub async fn run_server(config: Config) -> Result<()> {
    let addr = config.addr();
    let state = Arc::new(AppState::from_config(&config)?);

    let router = build_router(state).nest_service("/files", ServeDir::new(&config.storage_dir));

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "deck generation service listening");

    axum::serve(listener, router).await.map_err(|e| Error::Server(e.to_string()))?;

    Ok(())
}
