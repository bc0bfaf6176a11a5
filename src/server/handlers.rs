use anyhow::{Context, Result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tera::{Context as TeraContext, Tera};
use tracing::{info, warn};

use super::models::{ProcessForm, ServerError};
use super::state::ServerState;
use crate::overlay::{list_sample_images, resolve_sample_path, FontCatalog, SampleLookupError};
use crate::settings;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html.tera");
const OUTPUT_FILE_NAME: &str = "image_with_text.jpg";

pub fn build_router(state: Arc<ServerState>) -> Router {
    let body_limit = state.settings.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/sample_image/:filename", get(sample_image))
        .route("/process", post(process))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn run_server(settings: settings::Settings) -> Result<()> {
    settings.ensure_dirs()?;
    let addr = settings.addr.clone();
    info!(
        "samples: {}, fonts: {}",
        settings.sample_dir.display(),
        settings.font_dir.display()
    );
    let app = build_router(Arc::new(ServerState::new(settings)));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn index(State(state): State<Arc<ServerState>>) -> Result<Html<String>, ServerError> {
    let samples = list_sample_images(&state.settings.sample_dir)?;
    let fonts = FontCatalog::scan(&state.settings.font_dir)?.names();
    let mut context = TeraContext::new();
    context.insert("sample_images", &samples);
    context.insert("fonts", &fonts);
    let html = Tera::one_off(INDEX_TEMPLATE, &context, true)
        .with_context(|| "failed to render index template")?;
    Ok(Html(html))
}

async fn sample_image(
    State(state): State<Arc<ServerState>>,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    let path = resolve_sample_path(&state.settings.sample_dir, &filename).map_err(|err| {
        match err {
            SampleLookupError::Forbidden(_) => ServerError::forbidden(err.to_string()),
            SampleLookupError::Empty | SampleLookupError::NotFound(_) => {
                ServerError::not_found(err.to_string())
            }
        }
    })?;
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read sample image: {}", path.display()))?;
    let mime = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");
    Ok(([(header::CONTENT_TYPE, mime)], bytes).into_response())
}

async fn process(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServerError> {
    let result = process_request(state, multipart).await;
    if let Err(err) = &result {
        warn!("process failed ({}): {}", err.status, err.message);
    }
    result
}

async fn process_request(
    state: Arc<ServerState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServerError> {
    let multipart = multipart.map_err(|err| ServerError::bad_request(err.body_text()))?;
    let form = ProcessForm::read(multipart).await?;
    let params = form.params()?;
    let source = form.image_source();

    let renderer = state.renderer.clone();
    let bytes = tokio::task::spawn_blocking(move || renderer.render(source, &params))
        .await
        .map_err(|err| ServerError::internal(format!("render task failed: {}", err)))??;

    let disposition = format!("attachment; filename=\"{}\"", OUTPUT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
