//! Web UI for the studio.
//!
//! One page plus a small JSON API. Every action locks the single studio and
//! runs on the blocking pool, so requests are handled strictly one at a time.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::studio::Studio;

const INDEX_HTML: &str = include_str!("index.html");

/// Shared state across all handlers.
#[derive(Clone)]
pub struct AppState {
    studio: Arc<Mutex<Studio>>,
}

impl AppState {
    pub fn new(studio: Studio) -> Self {
        Self {
            studio: Arc::new(Mutex::new(studio)),
        }
    }

    /// Run a studio action on the blocking pool.
    async fn with_studio<T, F>(&self, action: F) -> Result<T, StatusCode>
    where
        T: Send + 'static,
        F: FnOnce(&mut Studio) -> T + Send + 'static,
    {
        let studio = Arc::clone(&self.studio);
        tokio::task::spawn_blocking(move || {
            let mut guard = studio.lock();
            action(&mut *guard)
        })
        .await
        .map_err(|e| {
            log::error!("Studio action panicked: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }
}

/// Create the application router. Generated files are served from `output_dir`.
pub fn create_router(state: AppState, output_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/voices", get(voices))
        .route("/api/speech", post(generate_speech))
        .route("/api/waveform", post(generate_waveform))
        .nest_service("/output", ServeDir::new(output_dir))
        .with_state(state)
}

/// Bind and serve until Ctrl+C.
pub async fn serve(studio: Studio, host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = studio.output_dir().to_path_buf();
    std::fs::create_dir_all(&output_dir)?;
    let state = AppState::new(studio);
    let app = create_router(state.clone(), &output_dir);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Studio listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Engines may own a model server and a blocking HTTP client; release them
    // off the async worker threads.
    tokio::task::spawn_blocking(move || drop(state)).await?;
    log::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Received Ctrl+C, shutting down"),
        Err(e) => log::error!("Failed to listen for Ctrl+C: {e}"),
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
struct VoicesResponse {
    speakers: Vec<String>,
    languages: Vec<String>,
    default_speaker: Option<String>,
    default_language: Option<String>,
}

async fn voices(State(state): State<AppState>) -> Result<Json<VoicesResponse>, StatusCode> {
    state
        .with_studio(|studio| {
            let catalog = studio.catalog();
            VoicesResponse {
                speakers: catalog.speakers().to_vec(),
                languages: catalog
                    .localizations()
                    .iter()
                    .map(|l| l.label.clone())
                    .collect(),
                default_speaker: catalog.default_speaker().map(str::to_string),
                default_language: catalog.default_localization().map(|l| l.label.clone()),
            }
        })
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
struct SpeechRequest {
    #[serde(default)]
    text: String,
    speaker: String,
    language: String,
}

#[derive(Debug, Serialize)]
struct SpeechResponse {
    audio_url: Option<String>,
    info: String,
    status: String,
    waveform_enabled: bool,
}

async fn generate_speech(
    State(state): State<AppState>,
    Json(request): Json<SpeechRequest>,
) -> Result<Json<SpeechResponse>, StatusCode> {
    let outcome = state
        .with_studio(move |studio| {
            studio.generate_speech(&request.text, &request.speaker, &request.language)
        })
        .await?;

    Ok(Json(SpeechResponse {
        audio_url: outcome.audio_path.as_deref().and_then(output_url),
        info: outcome.info,
        status: outcome.status,
        waveform_enabled: outcome.waveform_enabled,
    }))
}

#[derive(Debug, Serialize)]
struct WaveformResponse {
    image_url: Option<String>,
    status: String,
}

async fn generate_waveform(State(state): State<AppState>) -> Result<Json<WaveformResponse>, StatusCode> {
    let outcome = state.with_studio(|studio| studio.generate_waveform()).await?;

    Ok(Json(WaveformResponse {
        image_url: outcome.image_path.as_deref().and_then(output_url),
        status: outcome.status,
    }))
}

/// URL of a generated file under `/output`.
///
/// File names are fixed and overwritten, so a version query keeps browsers
/// from showing a cached earlier take.
fn output_url(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let version = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    Some(format!("/output/{name}?v={version}"))
}

#[cfg(test)]
mod tests {
    use super::output_url;
    use std::path::Path;

    #[test]
    fn output_urls_point_at_the_file_name() {
        let url = output_url(Path::new("output/generated_speech.wav")).unwrap();
        assert!(url.starts_with("/output/generated_speech.wav?v="));
    }

    #[test]
    fn paths_without_file_name_have_no_url() {
        assert_eq!(output_url(Path::new("/")), None);
    }
}
