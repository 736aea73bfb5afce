//! Integration tests for the sym-api router.
//!
//! Each test builds the full service graph with in-process doubles and
//! drives the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use sym_api::error::ErrorBody;
use sym_api::handlers::{
    AnalyzeResponse, HealthResponse, MessageResponse, ReportResponse, UpdateDetailsResponse,
    UploadResponse,
};
use sym_api::{create_router, AppState};
use sym_core::config::{ConsistencyMode, SymConfig, TimeoutConfig};
use sym_core::types::{Sentiment, SentimentTrendPoint, UnitCount, UnitSentimentCount};
use sym_ingest::{FeedbackPipeline, PolicyTable};
use sym_insight::ReportSynthesizer;
use sym_llm::{MockLanguageModel, SentimentClassifier};
use sym_storage::{AggregateQueries, AggregateStore, Database, FeedbackRepository, RecordStore};
use sym_vector::{MockEmbedding, SemanticSearch, VectorBackend, VectorIndex, VectorStoreAdapter};
use sym_whisper::{MockTranscriptionService, TranscriptArchive};

const NS: &str = "comentarios_namespace";
const BOUNDARY: &str = "sym-test-boundary";

// =============================================================================
// Helpers
// =============================================================================

struct TestCtx {
    app: Router,
    index: VectorIndex,
    repo: Arc<FeedbackRepository>,
    model: Arc<MockLanguageModel>,
    archive_dir: TempDir,
}

fn make_ctx(transcript: &str, mode: ConsistencyMode) -> TestCtx {
    let config = SymConfig::default();
    let db = Arc::new(Database::in_memory().unwrap());
    let repo = Arc::new(FeedbackRepository::new(db.clone()));
    let aggregates: Arc<dyn AggregateStore> = Arc::new(AggregateQueries::new(db));
    let index = VectorIndex::with_namespace(NS);
    let embedder = Arc::new(MockEmbedding::new(32));
    let model = Arc::new(
        MockLanguageModel::new("neutro")
            .with_rule("Metas da empresa", "Metas parcialmente atingidas.")
            .with_rule("banco vetorial", "Sem tendências relevantes.")
            .with_rule("Ótimo", "Positivo.")
            .with_rule("lento", "NEGATIVO"),
    );

    let backend: Arc<dyn VectorBackend> = Arc::new(index.clone());
    let vectors = VectorStoreAdapter::new(backend, NS, Duration::from_secs(5));
    let classifier = SentimentClassifier::new(model.clone(), Duration::from_secs(5));
    let pipeline = FeedbackPipeline::new(
        repo.clone() as Arc<dyn RecordStore>,
        vectors.clone(),
        classifier,
        embedder.clone(),
        Arc::new(MockTranscriptionService::with_text(transcript)),
        PolicyTable::new(mode),
        TimeoutConfig::default(),
    );
    let search = SemanticSearch::new(vectors, embedder, 3, 0.8, Duration::from_secs(5));
    let reports = ReportSynthesizer::new(
        aggregates.clone(),
        search,
        model.clone(),
        Duration::from_secs(5),
    );

    let archive_dir = TempDir::new().unwrap();
    let archive = TranscriptArchive::new(archive_dir.path());
    let state = AppState::new(config, pipeline, reports, aggregates, repo.clone(), archive);

    TestCtx {
        app: create_router(state),
        index,
        repo,
        model,
        archive_dir,
    }
}

fn make_default_ctx() -> TestCtx {
    make_ctx("Ótimo atendimento!", ConsistencyMode::BestEffort)
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_post(uri: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/mpeg\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn percent_encode(text: &str) -> String {
    text.bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() {
                (b as char).to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect()
}

async fn analyze(app: &Router, text: &str) -> AnalyzeResponse {
    let uri = format!("/analyze-sentiment?transcription={}", percent_encode(text));
    let resp = app
        .clone()
        .oneshot(Request::post(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

// =============================================================================
// Liveness
// =============================================================================

#[tokio::test]
async fn test_root_message() {
    let ctx = make_default_ctx();
    let resp = ctx
        .app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: MessageResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body.message, "Backend SYM-Gestor funcionando corretamente!");
}

#[tokio::test]
async fn test_health_reports_record_count() {
    let ctx = make_default_ctx();
    ctx.repo.create_comment("primeiro").unwrap();

    let resp = ctx
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(health.total_records, 1);
}

// =============================================================================
// Analyze
// =============================================================================

#[tokio::test]
async fn test_analyze_positive_comment_end_to_end() {
    let ctx = make_default_ctx();
    let body = analyze(&ctx.app, "Ótimo atendimento!").await;

    assert_eq!(body.message, "Análise concluída e sentimento gravado.");
    assert_eq!(body.sentiment, Sentiment::Positive);
    assert!(body.record_id > 0);
    assert!(body.vector_persisted);
    assert!(body.warnings.is_empty());
    assert!(body.transcription.is_none());

    let record = ctx.repo.find_by_id(body.record_id).unwrap().unwrap();
    assert_eq!(record.comment_text, "Ótimo atendimento!");
    assert_eq!(record.sentiment, Some(Sentiment::Positive));

    let metadata = ctx
        .index
        .metadata(NS, &body.record_id.to_string())
        .expect("vector entry should exist");
    assert_eq!(metadata["sentimento"], "positive");
    assert_eq!(metadata["comentario"], "Ótimo atendimento!");
}

#[tokio::test]
async fn test_analyze_empty_transcription_rejected() {
    let ctx = make_default_ctx();
    let resp = ctx
        .app
        .clone()
        .oneshot(
            Request::post("/analyze-sentiment?transcription=%20%20")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(err.error, "bad_request");
    assert_eq!(ctx.repo.count().unwrap(), 0);
}

#[tokio::test]
async fn test_analyze_missing_transcription_rejected() {
    let ctx = make_default_ctx();
    let resp = ctx
        .app
        .oneshot(Request::post("/analyze-sentiment").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_sends_classifier_prompt() {
    let ctx = make_default_ctx();
    let body = analyze(&ctx.app, "qualquer coisa").await;
    assert_eq!(body.sentiment, Sentiment::Neutral);
    assert!(ctx.model.prompts()[0].starts_with("Leia e classifique o seguinte texto: qualquer coisa"));
}

// =============================================================================
// Audio intake
// =============================================================================

#[tokio::test]
async fn test_upload_audio_archives_transcript() {
    let ctx = make_default_ctx();
    let req = multipart_post("/upload-audio", "file", "../../gravacao.mp3", b"ID3 fake audio");
    let resp = ctx.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: UploadResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body.message, "Arquivo recebido: gravacao.mp3");
    assert_eq!(body.transcription, "Ótimo atendimento!");

    let upload_dir = std::fs::read_dir(ctx.archive_dir.path())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let transcript = std::fs::read_to_string(upload_dir.join("gravacao.txt")).unwrap();
    assert_eq!(transcript, "Ótimo atendimento!");
    assert!(upload_dir.join("gravacao.mp3").exists());
    assert_eq!(ctx.repo.count().unwrap(), 0);
}

#[tokio::test]
async fn test_upload_without_file_field_rejected() {
    let ctx = make_default_ctx();
    let req = multipart_post("/upload-audio", "audio", "a.mp3", b"data");
    let resp = ctx.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_audio_creates_record() {
    let ctx = make_default_ctx();
    let req = multipart_post("/analyze-audio", "file", "a.wav", b"RIFF fake");
    let resp = ctx.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: AnalyzeResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body.sentiment, Sentiment::Positive);
    assert_eq!(body.transcription.as_deref(), Some("Ótimo atendimento!"));
    assert_eq!(ctx.repo.count().unwrap(), 1);
}

#[tokio::test]
async fn test_analyze_audio_empty_transcript_creates_nothing() {
    let ctx = make_ctx("   ", ConsistencyMode::BestEffort);
    let req = multipart_post("/analyze-audio", "file", "a.wav", b"RIFF fake");
    let resp = ctx.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let err: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(err.error, "transcription_error");
    assert_eq!(ctx.repo.count().unwrap(), 0);
    assert!(ctx.index.is_empty(NS));
}

// =============================================================================
// Enrichment
// =============================================================================

#[tokio::test]
async fn test_update_details_updates_both_stores() {
    let ctx = make_default_ctx();
    let analyzed = analyze(&ctx.app, "Ótimo atendimento!").await;

    let resp = ctx
        .app
        .clone()
        .oneshot(json_post(
            "/update-user-details",
            serde_json::json!({
                "record_id": analyzed.record_id,
                "nome_cliente": "Ana",
                "email": "ana@example.com",
                "unidade": "Centro"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: UpdateDetailsResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body.message, "Dados atualizados com sucesso.");
    assert!(body.record_updated);
    assert!(body.vector_updated);
    assert!(body.vector_error.is_none());

    let record = ctx.repo.find_by_id(analyzed.record_id).unwrap().unwrap();
    assert_eq!(record.unit.as_deref(), Some("Centro"));
    let metadata = ctx.index.metadata(NS, &analyzed.record_id.to_string()).unwrap();
    assert_eq!(metadata["nome"], "Ana");
    assert_eq!(metadata["unidade"], "Centro");
    assert_eq!(metadata["sentimento"], "positive");
}

#[tokio::test]
async fn test_update_details_without_vector_entry_is_partial() {
    let ctx = make_default_ctx();
    let id = ctx.repo.create_comment("sem vetor").unwrap();

    let resp = ctx
        .app
        .clone()
        .oneshot(json_post(
            "/update-user-details",
            serde_json::json!({
                "record_id": id,
                "name": "Bruno",
                "email": "bruno@example.com",
                "unit": "Norte"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: UpdateDetailsResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(body.record_updated);
    assert!(!body.vector_updated);
    assert_eq!(body.vector_error.unwrap().error, "not_found");

    assert_eq!(
        ctx.repo.find_by_id(id).unwrap().unwrap().customer_name.as_deref(),
        Some("Bruno")
    );
    assert!(ctx.index.metadata(NS, &id.to_string()).is_none());
}

#[tokio::test]
async fn test_update_details_strict_mode_surfaces_vector_failure() {
    let ctx = make_ctx("x", ConsistencyMode::Strict);
    let id = ctx.repo.create_comment("sem vetor").unwrap();

    let resp = ctx
        .app
        .oneshot(json_post(
            "/update-user-details",
            serde_json::json!({"record_id": id, "name": "C", "email": "c@x.com", "unit": "Sul"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(err.error, "vector_not_found");
    assert_eq!(
        ctx.repo.find_by_id(id).unwrap().unwrap().unit.as_deref(),
        Some("Sul")
    );
}

#[tokio::test]
async fn test_update_details_unknown_record() {
    let ctx = make_default_ctx();
    let resp = ctx
        .app
        .oneshot(json_post(
            "/update-user-details",
            serde_json::json!({"record_id": 999, "name": "X", "email": "x@x.com", "unit": "U"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(err.error, "not_found");
}

#[tokio::test]
async fn test_update_details_malformed_body() {
    let ctx = make_default_ctx();
    let resp = ctx
        .app
        .oneshot(json_post(
            "/update-user-details",
            serde_json::json!({"name": "sem id"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(err.error, "bad_request");
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn test_generate_report_with_empty_vector_store() {
    let ctx = make_default_ctx();
    let resp = ctx
        .app
        .oneshot(json_post(
            "/api/generate-report",
            serde_json::json!({
                "meta": "Reduzir reclamações em 10%",
                "query": "atendimento lento"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: ReportResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(body.report.starts_with("### Análise de Metas\n"));
    assert!(body.report.contains("\n\n### Análise de Mercado\n"));
    assert!(body.report.contains("Metas parcialmente atingidas."));
    assert!(body.report.contains("Sem tendências relevantes."));
}

#[tokio::test]
async fn test_generate_report_blank_goal_rejected() {
    let ctx = make_default_ctx();
    let resp = ctx
        .app
        .oneshot(json_post(
            "/api/generate-report",
            serde_json::json!({"goal": "", "query": "q"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_aggregates() {
    let ctx = make_default_ctx();
    let first = analyze(&ctx.app, "Ótimo atendimento!").await;
    analyze(&ctx.app, "atendimento lento").await;
    ctx.app
        .clone()
        .oneshot(json_post(
            "/update-user-details",
            serde_json::json!({"record_id": first.record_id, "name": "A", "email": "a@x.com", "unit": "Centro"}),
        ))
        .await
        .unwrap();

    let resp = ctx
        .app
        .clone()
        .oneshot(
            Request::get("/api/dashboard/comments-by-unit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let mut by_unit: Vec<UnitCount> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    by_unit.sort_by(|a, b| a.unit.cmp(&b.unit));
    assert_eq!(by_unit.len(), 2);
    assert_eq!(by_unit[0].unit, None);
    assert_eq!(by_unit[1].unit.as_deref(), Some("Centro"));

    let resp = ctx
        .app
        .clone()
        .oneshot(
            Request::get("/api/dashboard/sentiment-by-unit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let rows: Vec<UnitSentimentCount> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(rows.iter().any(|r| r.unit.as_deref() == Some("Centro")
        && r.sentiment == Some(Sentiment::Positive)
        && r.count == 1));
    assert!(rows
        .iter()
        .any(|r| r.unit.is_none() && r.sentiment == Some(Sentiment::Negative)));
}

#[tokio::test]
async fn test_sentiment_trend_dates_are_plain_strings() {
    let ctx = make_default_ctx();
    analyze(&ctx.app, "Ótimo atendimento!").await;

    let resp = ctx
        .app
        .oneshot(
            Request::get("/api/dashboard/sentiment-trend")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let raw: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let date = raw[0]["date"].as_str().expect("date should be a string");
    assert_eq!(date, chrono::Utc::now().format("%Y-%m-%d").to_string());

    let points: Vec<SentimentTrendPoint> = serde_json::from_value(raw).unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].sentiment, Some(Sentiment::Positive));
}
