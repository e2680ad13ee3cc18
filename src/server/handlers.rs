//! HTTP request handlers.

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use super::AppState;
use crate::embedder::TaggedAudio;
use crate::error::{EmbedError, Result};
use crate::fetch::CHUNK_SIZE;
use crate::models::{GenerateAudioParams, CONTENT_TYPE};

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

impl IntoResponse for EmbedError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// GET / - informational page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health - liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /generate-audio - fetch, tag and return one song
///
/// Repeated keys keep their first value.
pub async fn generate_audio(
    State(state): State<AppState>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response> {
    let Query(pairs) = query.map_err(|e| EmbedError::InvalidQuery(e.body_text()))?;
    let params = GenerateAudioParams::from_query_pairs(pairs);
    let span = info_span!("generate_audio", request_id = %Uuid::new_v4().simple());

    async move {
        let audio = state.embedder.embed(&params).await?;
        audio_response(audio).await
    }
    .instrument(span)
    .await
    .inspect_err(|e| error!("Request failed: {}", e))
}

async fn audio_response(audio: TaggedAudio) -> Result<Response> {
    let file = audio.scratch.open().await?;
    let disposition = content_disposition(&audio.filename)?;

    // The scratch guard rides along with the body and is dropped after the file handle.
    let scratch = audio.scratch;
    let stream = ReaderStream::with_capacity(file, CHUNK_SIZE).map(move |chunk| {
        let _guard = &scratch;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, audio.size)
        .body(Body::from_stream(stream))
        .map_err(|e| EmbedError::Unexpected(e.to_string()))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(filename: &str) -> Result<HeaderValue> {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect();

    let value = if ascii == filename {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(filename)
        )
    };

    HeaderValue::from_str(&value).map_err(|e| EmbedError::Unexpected(e.to_string()))
}
