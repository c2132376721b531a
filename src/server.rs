//! HTTP service exposing the pipeline to a web front end.
//!
//! | Route                      | Body                                  | Response            |
//! |----------------------------|---------------------------------------|---------------------|
//! | `POST /api/fines/analyze`  | raw file, `Content-Type` = MIME type  | `FineRecord` JSON   |
//! | `POST /api/appeals`        | `{fineData, appealOptions}`           | `{appealText}`      |
//! | `POST /api/appeals/export` | `{fineData, appealText, title?}`      | `application/pdf`   |
//! | `GET /health`              |                                       | `OK`                |
//!
//! Failures are JSON `{error, kind, status}` with the status taken from
//! [`ErrorKind::http_status`]. The service starts even when no LLM provider
//! is configured: export keeps working and the inference routes answer 503.

use crate::compose::AppealComposer;
use crate::config::AppealConfig;
use crate::error::{AppealError, ErrorKind};
use crate::model::{AppealDocument, AppealOptions, AppealType, FineRecord, UploadedFile};
use crate::render::{export_file_name, export_pdf, LayoutConfig};
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Header carrying the original upload file name.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Extra room above the upload limit so the validator, not the transport,
/// reports slightly oversized files.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

// ── State ────────────────────────────────────────────────────────────────

/// Shared, read-only state of the service.
#[derive(Clone)]
pub struct AppState {
    composer: Option<Arc<AppealComposer>>,
    unavailable: Option<(String, String)>,
    layout: Arc<LayoutConfig>,
    max_upload_bytes: u64,
}

impl AppState {
    pub fn new(composer: AppealComposer, layout: LayoutConfig) -> Self {
        let max_upload_bytes = composer.config().max_upload_bytes;
        Self {
            composer: Some(Arc::new(composer)),
            unavailable: None,
            layout: Arc::new(layout),
            max_upload_bytes,
        }
    }

    /// Resolve the provider now; on failure keep the reason for 503 replies.
    pub fn from_config(config: AppealConfig, layout: LayoutConfig) -> Self {
        let max_upload_bytes = config.max_upload_bytes;
        match AppealComposer::from_config(config) {
            Ok(composer) => Self::new(composer, layout),
            Err(e) => {
                warn!("Inference disabled: {}", e);
                let reason = match e {
                    AppealError::ProviderNotConfigured { provider, hint } => (provider, hint),
                    other => ("auto".to_string(), other.to_string()),
                };
                Self {
                    composer: None,
                    unavailable: Some(reason),
                    layout: Arc::new(layout),
                    max_upload_bytes,
                }
            }
        }
    }

    fn composer(&self) -> Result<&AppealComposer, ApiError> {
        match (&self.composer, &self.unavailable) {
            (Some(composer), _) => Ok(composer),
            (None, Some((provider, hint))) => Err(AppealError::ProviderNotConfigured {
                provider: provider.clone(),
                hint: hint.clone(),
            }
            .into()),
            (None, None) => Err(AppealError::Internal("no composer configured".into()).into()),
        }
    }
}

/// Build the router with tracing, CORS and body-size layers.
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/fines/analyze", post(analyze_fine))
        .route("/api/appeals", post(generate_appeal))
        .route("/api/appeals/export", post(export_appeal))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ── Errors ───────────────────────────────────────────────────────────────

/// An [`AppealError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(AppealError);

impl From<AppealError> for ApiError {
    fn from(e: AppealError) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AppealError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status =
            StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("{} error: {}", status.as_u16(), self.0);
        } else {
            warn!("{} error: {}", status.as_u16(), self.0);
        }

        let body = Json(json!({
            "error": self.0.to_string(),
            "kind": kind,
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        self.0.kind()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppealRequest {
    pub fine_data: FineRecord,
    pub appeal_options: AppealOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppealResponse {
    pub appeal_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub fine_data: FineRecord,
    pub appeal_text: String,
    #[serde(default)]
    pub title: Option<String>,
}

async fn health() -> &'static str {
    "OK"
}

async fn analyze_fine(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<FineRecord>, ApiError> {
    let composer = state.composer()?;

    let mime_type = header_str(&headers, header::CONTENT_TYPE.as_str())
        .ok_or_else(|| AppealError::MissingField("Content-Type header".into()))?;
    let mut file = UploadedFile::new(body.to_vec(), mime_type);
    if let Some(size) =
        header_str(&headers, header::CONTENT_LENGTH.as_str()).and_then(|v| v.parse().ok())
    {
        file = file.with_declared_size(size);
    }
    if let Some(name) = header_str(&headers, FILE_NAME_HEADER) {
        file = file.with_file_name(name);
    }

    let record = composer.analyze_fine(file).await?;
    Ok(Json(record))
}

async fn generate_appeal(
    State(state): State<AppState>,
    payload: Result<Json<AppealRequest>, JsonRejection>,
) -> Result<Json<AppealResponse>, ApiError> {
    let composer = state.composer()?;
    let Json(request) = payload?;

    let appeal = composer
        .generate_appeal(&request.fine_data, &request.appeal_options)
        .await?;
    Ok(Json(AppealResponse {
        appeal_text: appeal.appeal_text,
    }))
}

async fn export_appeal(
    State(state): State<AppState>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.appeal_text.trim().is_empty() {
        return Err(AppealError::MissingField("appealText".into()).into());
    }

    let mut layout = (*state.layout).clone();
    if let Some(title) = request.title.filter(|t| !t.trim().is_empty()) {
        layout.title = title;
    }

    let doc = AppealDocument::new(request.appeal_text, &request.fine_data, AppealType::default());
    let bytes = export_pdf(&doc, &layout)?;
    let file_name = export_file_name(&doc.reference_number);
    info!("Exported {} ({} bytes)", file_name, bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtractedContent, FileKind};
    use crate::pipeline::extract::ContentExtractor;
    use crate::pipeline::llm::InferenceGateway;
    use crate::prompts::PromptSpec;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct CannedGateway;

    #[async_trait]
    impl InferenceGateway for CannedGateway {
        async fn extract_structured(&self, _prompt: &PromptSpec) -> Result<String, AppealError> {
            Ok(r#"{"referenceNumber":"PCN-1","date":"2024-03-02","amount":"70","location":"High St","reason":"Parking","vehicle":"AB12CDE"}"#.into())
        }

        async fn generate_text(&self, _prompt: &PromptSpec) -> Result<String, AppealError> {
            Ok("Dear Sir or Madam,\n\nI **dispute** this notice.".into())
        }
    }

    struct CannedExtractor;

    impl ContentExtractor for CannedExtractor {
        fn extract(
            &self,
            _file: &UploadedFile,
            _kind: FileKind,
        ) -> Result<ExtractedContent, AppealError> {
            Ok(ExtractedContent::Text("PCN-1".into()))
        }
    }

    fn app() -> Router {
        let composer = AppealComposer::new(Arc::new(CannedGateway), AppealConfig::default())
            .with_extractor(Arc::new(CannedExtractor));
        router(AppState::new(composer, LayoutConfig::default()))
    }

    fn unconfigured_app() -> Router {
        router(AppState {
            composer: None,
            unavailable: Some(("openai".into(), "Set OPENAI_API_KEY".into())),
            layout: Arc::new(LayoutConfig::default()),
            max_upload_bytes: crate::config::DEFAULT_MAX_UPLOAD_BYTES,
        })
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn fine_json() -> serde_json::Value {
        json!({
            "referenceNumber": "PCN-1",
            "date": "2024-03-02",
            "amount": "70",
            "location": "High St",
            "reason": "Parking",
            "vehicle": "AB12CDE"
        })
    }

    #[tokio::test]
    async fn health_is_ok() {
        let resp = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn analyze_returns_fine_record() {
        let req = Request::post("/api/fines/analyze")
            .header(header::CONTENT_TYPE, "application/pdf")
            .header(FILE_NAME_HEADER, "notice.pdf")
            .body(Body::from(b"%PDF-1.4 stub".to_vec()))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["referenceNumber"], "PCN-1");
        assert_eq!(json["additionalInfo"], "");
    }

    #[tokio::test]
    async fn unsupported_upload_is_400() {
        let req = Request::post("/api/fines/analyze")
            .header(header::CONTENT_TYPE, "image/gif")
            .body(Body::from(b"GIF89a".to_vec()))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["status"], 400);
    }

    #[tokio::test]
    async fn generate_returns_appeal_text() {
        let req = json_post(
            "/api/appeals",
            json!({ "fineData": fine_json(), "appealOptions": { "appealType": "factual" } }),
        );
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(json["appealText"].as_str().unwrap().contains("**dispute**"));
    }

    #[tokio::test]
    async fn malformed_appeal_request_is_400() {
        let req = json_post("/api/appeals", json!({ "fineData": fine_json() }));
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["kind"], "validation");
    }

    #[tokio::test]
    async fn export_returns_pdf_attachment() {
        let req = json_post(
            "/api/appeals/export",
            json!({ "fineData": fine_json(), "appealText": "I **dispute** this." }),
        );
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains("appeal-PCN-1.pdf"), "got {disposition}");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn empty_export_text_is_400() {
        let req = json_post(
            "/api/appeals/export",
            json!({ "fineData": fine_json(), "appealText": "   " }),
        );
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_provider_is_503_but_export_works() {
        let req = Request::post("/api/fines/analyze")
            .header(header::CONTENT_TYPE, "application/pdf")
            .body(Body::from(b"%PDF-1.4".to_vec()))
            .unwrap();
        let resp = unconfigured_app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["kind"], "configuration");

        let req = json_post(
            "/api/appeals/export",
            json!({ "fineData": fine_json(), "appealText": "Body", "title": "My appeal" }),
        );
        let resp = unconfigured_app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
