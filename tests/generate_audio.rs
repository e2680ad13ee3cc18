//! Integration tests for `GET /generate-audio`.
//!
//! Each test starts a throwaway upstream server on 127.0.0.1 that serves audio
//! and images, then drives the service router with `oneshot`.

use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use lofty::picture::MimeType;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use m4a_embed::server::{router, AppState};
use m4a_embed::tagging::read_metadata;
use m4a_embed::{Config, TaggingPolicy};

const GARBAGE_AUDIO: &[u8] = b"this is not an mp4 container at all";

fn atom(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

fn minimal_m4a() -> Vec<u8> {
    let mut ftyp = Vec::new();
    ftyp.extend_from_slice(b"M4A ");
    ftyp.extend_from_slice(&0u32.to_be_bytes());
    ftyp.extend_from_slice(b"M4A isommp42");

    let mut mvhd = vec![0u8; 100];
    mvhd[12..16].copy_from_slice(&1000u32.to_be_bytes());
    mvhd[20..24].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    mvhd[24..26].copy_from_slice(&0x0100u16.to_be_bytes());
    mvhd[36..40].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    mvhd[52..56].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    mvhd[68..72].copy_from_slice(&0x4000_0000u32.to_be_bytes());
    mvhd[96..100].copy_from_slice(&1u32.to_be_bytes());

    let mut out = atom(b"ftyp", &ftyp);
    out.extend(atom(b"moov", &atom(b"mvhd", &mvhd)));
    out.extend(atom(b"mdat", &[0u8; 64]));
    out
}

fn encode_image(format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_fn(16, 16, |x, y| Rgba([x as u8 * 15, y as u8 * 15, 200, 90]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buffer), format)
        .unwrap();
    buffer
}

/// Upstream host serving fixtures and counting audio requests.
struct Upstream {
    addr: SocketAddr,
    audio_hits: Arc<AtomicUsize>,
}

impl Upstream {
    async fn start() -> Self {
        let audio_hits = Arc::new(AtomicUsize::new(0));

        let app = Router::new()
            .route("/a.m4a", get(serve_m4a))
            .route("/garbage.m4a", get(serve_garbage))
            .route("/b.webp", get(|| async { encode_image(ImageFormat::WebP) }))
            .route("/b.png", get(|| async { encode_image(ImageFormat::Png) }))
            .route("/page.html", get(|| async { "<html>not an image</html>" }))
            .with_state(audio_hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, audio_hits }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn audio_hits(&self) -> usize {
        self.audio_hits.load(Ordering::SeqCst)
    }
}

async fn serve_m4a(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    minimal_m4a()
}

async fn serve_garbage(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    GARBAGE_AUDIO
}

struct Harness {
    app: Router,
    scratch: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with_policy(TaggingPolicy::BestEffort)
    }

    fn with_policy(policy: TaggingPolicy) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let config = Config::default()
            .with_scratch_dir(scratch.path())
            .with_tagging_policy(policy);
        let app = router(AppState::new(config).unwrap());
        Self { app, scratch }
    }

    async fn get(&self, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, headers, body.to_vec())
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.scratch.path()).unwrap().next().is_none()
    }
}

fn query(pairs: &[(&str, &str)]) -> String {
    let encoded: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    format!("/generate-audio?{}", encoded.join("&"))
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn save(dir: &Path, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join("downloaded.m4a");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(bytes).unwrap();
    path
}

#[tokio::test]
async fn test_missing_audio_url_is_rejected() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let (status, _, body) = harness
        .get(&query(&[("imageUrl", &upstream.url("/b.png")), ("songName", "X")]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Audio URL is required");
    assert_eq!(upstream.audio_hits(), 0);
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_full_scenario_with_webp_cover() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let (status, headers, body) = harness
        .get(&query(&[
            ("audioUrl", &upstream.url("/a.m4a")),
            ("imageUrl", &upstream.url("/b.webp")),
            ("songName", "Test"),
            ("artist", "A"),
            ("album", "B"),
            ("year", "2024"),
        ]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mp4");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Test.m4a\""
    );
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        body.len().to_string().as_str()
    );
    assert!(harness.scratch_is_empty());

    let out = tempfile::tempdir().unwrap();
    let stored = read_metadata(save(out.path(), &body)).unwrap();
    assert_eq!(stored.metadata.title.as_deref(), Some("Test"));
    assert_eq!(stored.metadata.artist.as_deref(), Some("A"));
    assert_eq!(stored.metadata.album.as_deref(), Some("B"));
    assert_eq!(stored.metadata.year.as_deref(), Some("2024"));
    assert_eq!(stored.cover_mime_type, Some(MimeType::Jpeg));

    let cover = stored.metadata.cover_art.unwrap();
    assert!(cover.starts_with(&[0xFF, 0xD8, 0xFF]));
    assert_ne!(cover, encode_image(ImageFormat::WebP));
    let decoded = image::load_from_memory_with_format(&cover, ImageFormat::Jpeg).unwrap();
    assert_eq!(decoded.color().channel_count(), 3);
}

#[tokio::test]
async fn test_png_cover_is_embedded_unchanged() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let (status, _, body) = harness
        .get(&query(&[
            ("audioUrl", &upstream.url("/a.m4a")),
            ("imageUrl", &upstream.url("/b.png")),
        ]))
        .await;

    assert_eq!(status, StatusCode::OK);

    let out = tempfile::tempdir().unwrap();
    let stored = read_metadata(save(out.path(), &body)).unwrap();
    assert_eq!(stored.metadata.cover_art, Some(encode_image(ImageFormat::Png)));
    assert_eq!(stored.cover_mime_type, Some(MimeType::Jpeg));
}

#[tokio::test]
async fn test_without_image_has_no_cover_and_defaults() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let (status, headers, body) = harness
        .get(&query(&[("audioUrl", &upstream.url("/a.m4a"))]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Unknown.m4a\""
    );

    let out = tempfile::tempdir().unwrap();
    let stored = read_metadata(save(out.path(), &body)).unwrap();
    assert_eq!(stored.metadata.title.as_deref(), Some("Unknown"));
    assert_eq!(stored.metadata.artist.as_deref(), Some("Unknown"));
    assert_eq!(stored.metadata.album.as_deref(), Some("Unknown"));
    assert_eq!(stored.metadata.year.as_deref(), Some("Unknown"));
    assert_eq!(stored.metadata.cover_art, None);
    assert_eq!(stored.cover_mime_type, None);
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_untaggable_audio_is_sent_unmodified() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let (status, _, body) = harness
        .get(&query(&[
            ("audioUrl", &upstream.url("/garbage.m4a")),
            ("imageUrl", &upstream.url("/b.png")),
            ("songName", "Broken"),
        ]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, GARBAGE_AUDIO);
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_untaggable_audio_fails_under_strict_policy() {
    let upstream = Upstream::start().await;
    let harness = Harness::with_policy(TaggingPolicy::Strict);

    let (status, _, body) = harness
        .get(&query(&[("audioUrl", &upstream.url("/garbage.m4a"))]))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json(&body)["error"].is_string());
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_broken_image_url_skips_audio() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let (status, _, body) = harness
        .get(&query(&[
            ("audioUrl", &upstream.url("/a.m4a")),
            ("imageUrl", &upstream.url("/broken")),
        ]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json(&body),
        serde_json::json!({ "error": "Invalid or inaccessible image URL" })
    );
    assert_eq!(upstream.audio_hits(), 0);
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_non_image_payload_is_rejected() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let (status, _, body) = harness
        .get(&query(&[
            ("audioUrl", &upstream.url("/a.m4a")),
            ("imageUrl", &upstream.url("/page.html")),
        ]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Invalid or inaccessible image URL");
    assert_eq!(upstream.audio_hits(), 0);
}

#[tokio::test]
async fn test_missing_audio_is_server_error() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let (status, _, body) = harness
        .get(&query(&[
            ("audioUrl", &upstream.url("/missing")),
            ("imageUrl", &upstream.url("/b.webp")),
        ]))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json(&body)["error"],
        "Failed to fetch data from the provided URL"
    );
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_repeated_query_key_keeps_first_value() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let uri = format!(
        "{}&songName=a&songName=b",
        query(&[("audioUrl", &upstream.url("/a.m4a"))])
    );
    let (status, headers, body) = harness.get(&uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"a.m4a\""
    );

    let out = tempfile::tempdir().unwrap();
    let stored = read_metadata(save(out.path(), &body)).unwrap();
    assert_eq!(stored.metadata.title.as_deref(), Some("a"));
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_unread_response_releases_scratch_file() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();

    let request = Request::builder()
        .uri(query(&[
            ("audioUrl", &upstream.url("/a.m4a")),
            ("songName", "Abandoned"),
        ]))
        .body(Body::empty())
        .unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!harness.scratch_is_empty());

    drop(response);
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_with_same_song_name() {
    let upstream = Upstream::start().await;
    let harness = Harness::new();
    let uri = query(&[
        ("audioUrl", &upstream.url("/a.m4a")),
        ("songName", "Same Song"),
    ]);

    let (first, second) = tokio::join!(harness.get(&uri), harness.get(&uri));

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(first.2, second.2);
    assert_eq!(upstream.audio_hits(), 2);
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_index_and_health() {
    let harness = Harness::new();

    let (status, headers, body) = harness.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(String::from_utf8(body).unwrap().contains("/generate-audio"));

    let (status, _, body) = harness.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
