//! Route handler functions for all API endpoints.
//!
//! Handlers only translate between HTTP and the pipeline, synthesizer and
//! aggregate services held in [`AppState`]; no business rule lives here.

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use sym_core::types::{
    CustomerDetails, Sentiment, SentimentTrendPoint, UnitCount, UnitSentimentCount,
};
use sym_ingest::{AnalysisOutcome, StepFailure};
use sym_whisper::sanitize_filename;

use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

/// Multipart field carrying the audio file.
const AUDIO_FIELD: &str = "file";

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    pub transcription: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateDetailsRequest {
    pub record_id: i64,
    #[serde(alias = "nome_cliente")]
    pub name: String,
    pub email: String,
    #[serde(alias = "unidade")]
    pub unit: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(alias = "meta")]
    pub goal: String,
    pub query: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub total_records: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub transcription: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub message: String,
    pub sentiment: Sentiment,
    pub record_id: i64,
    pub vector_persisted: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StepFailure>,
    /// Only set when the analysis started from audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
}

impl AnalyzeResponse {
    fn from_outcome(outcome: AnalysisOutcome, include_transcript: bool) -> Self {
        Self {
            message: "Análise concluída e sentimento gravado.".to_string(),
            sentiment: outcome.sentiment,
            record_id: outcome.record_id,
            vector_persisted: outcome.vector_persisted,
            warnings: outcome.warnings,
            transcription: include_transcript.then_some(outcome.transcript),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateDetailsResponse {
    pub message: String,
    pub record_updated: bool,
    pub vector_updated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_error: Option<ErrorBody>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: String,
}

// =============================================================================
// Liveness
// =============================================================================

/// GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Backend SYM-Gestor funcionando corretamente!".to_string(),
    })
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let total_records = state.records.count()?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        total_records,
    }))
}

// =============================================================================
// Audio intake
// =============================================================================

/// Pull the audio field out of a multipart body.
///
/// Returns the sanitized file name and the raw bytes.
async fn read_audio_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(String, Bytes), ApiError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let raw_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file field has no file name".to_string()))?;
        let filename = sanitize_filename(&raw_name)?;
        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
        }
        return Ok((filename, data));
    }
    Err(ApiError::BadRequest(format!(
        "missing multipart field '{}'",
        AUDIO_FIELD
    )))
}

/// POST /upload-audio
///
/// Transcribes the upload and keeps both the audio and the transcript on
/// disk. Nothing is written to either store.
pub async fn upload_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let (filename, audio) = read_audio_field(multipart).await?;
    let transcription = state.pipeline.transcribe(&audio, &filename).await?;
    state.archive.save(&filename, &audio, &transcription).await?;

    info!(filename = %filename, bytes = audio.len(), "Audio upload transcribed");

    Ok(Json(UploadResponse {
        message: format!("Arquivo recebido: {}", filename),
        transcription,
    }))
}

/// POST /analyze-audio
pub async fn analyze_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let (filename, audio) = read_audio_field(multipart).await?;
    let outcome = state.pipeline.analyze_audio(&audio, &filename).await?;
    Ok(Json(AnalyzeResponse::from_outcome(outcome, true)))
}

// =============================================================================
// Analysis and enrichment
// =============================================================================

/// POST /analyze-sentiment?transcription=<text>
pub async fn analyze_sentiment(
    State(state): State<AppState>,
    params: Result<Query<AnalyzeParams>, QueryRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Query(params) = params?;
    let transcription = params
        .transcription
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("transcription must not be empty".to_string()))?;

    let outcome = state.pipeline.analyze(&transcription).await?;
    Ok(Json(AnalyzeResponse::from_outcome(outcome, false)))
}

/// POST /update-user-details
pub async fn update_user_details(
    State(state): State<AppState>,
    payload: Result<Json<UpdateDetailsRequest>, JsonRejection>,
) -> Result<Json<UpdateDetailsResponse>, ApiError> {
    let Json(req) = payload?;
    let details = CustomerDetails {
        name: req.name,
        email: req.email,
        unit: req.unit,
    };

    let outcome = state.pipeline.enrich(req.record_id, &details).await?;

    let response = match outcome.vector_error {
        None => UpdateDetailsResponse {
            message: "Dados atualizados com sucesso.".to_string(),
            record_updated: true,
            vector_updated: outcome.vector_updated,
            vector_error: None,
        },
        Some(failure) => UpdateDetailsResponse {
            message: "Dados atualizados no banco relacional; o banco vetorial não foi atualizado."
                .to_string(),
            record_updated: true,
            vector_updated: false,
            vector_error: Some(ErrorBody {
                error: failure.error,
                message: failure.message,
            }),
        },
    };
    Ok(Json(response))
}

// =============================================================================
// Reports
// =============================================================================

/// POST /api/generate-report
pub async fn generate_report(
    State(state): State<AppState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Json(req) = payload?;
    let report = state.reports.generate_report(&req.goal, &req.query).await?;
    Ok(Json(ReportResponse { report }))
}

// =============================================================================
// Dashboard aggregates
// =============================================================================

/// GET /api/dashboard/comments-by-unit
pub async fn comments_by_unit(
    State(state): State<AppState>,
) -> Result<Json<Vec<UnitCount>>, ApiError> {
    Ok(Json(state.aggregates.comments_by_unit()?))
}

/// GET /api/dashboard/sentiment-by-unit
pub async fn sentiment_by_unit(
    State(state): State<AppState>,
) -> Result<Json<Vec<UnitSentimentCount>>, ApiError> {
    Ok(Json(state.aggregates.sentiment_by_unit()?))
}

/// GET /api/dashboard/sentiment-trend
pub async fn sentiment_trend(
    State(state): State<AppState>,
) -> Result<Json<Vec<SentimentTrendPoint>>, ApiError> {
    Ok(Json(state.aggregates.sentiment_trend()?))
}
