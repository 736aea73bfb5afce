//! Service construction.
//!
//! Every long-lived handle (database, vector backend, model clients) is
//! built here once and injected into the pipeline, the report synthesizer
//! and the API state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sym_api::AppState;
use sym_core::config::{SymConfig, VectorBackendKind};
use sym_core::error::Result;
use sym_ingest::{FeedbackPipeline, PolicyTable};
use sym_insight::ReportSynthesizer;
use sym_llm::{LanguageModel, MockLanguageModel, OpenAiChat, SentimentClassifier};
use sym_storage::{
    AggregateQueries, AggregateStore, Database, FeedbackRepository, RecordStore,
    VectorEntryRepository,
};
use sym_vector::{
    EmbeddingService, MockEmbedding, OpenAiEmbedding, PineconeBackend, SemanticSearch,
    VectorBackend, VectorIndex, VectorStoreAdapter,
};
use sym_whisper::{MockTranscriptionService, TranscriptArchive, TranscriptionService, WhisperService};

/// Expand a leading `~/` to the home directory.
pub fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if let Some(rest) = data_dir
        .strip_prefix("~/")
        .or_else(|| data_dir.strip_prefix("~\\"))
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(data_dir)
}

/// Collaborators the pipeline and the synthesizer talk to.
struct Collaborators {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn EmbeddingService>,
    transcriber: Arc<dyn TranscriptionService>,
    classifier_model: Arc<dyn LanguageModel>,
    report_model: Arc<dyn LanguageModel>,
}

/// The in-memory backend, persisted in the same SQLite database as the
/// records so entries survive a restart.
fn memory_backend(config: &SymConfig, db: &Arc<Database>) -> Result<Arc<dyn VectorBackend>> {
    let journal = Arc::new(VectorEntryRepository::new(Arc::clone(db)));
    Ok(Arc::new(VectorIndex::persistent(journal, &config.vector.namespace)?))
}

fn mock_collaborators(config: &SymConfig, db: &Arc<Database>) -> Result<Collaborators> {
    let model: Arc<dyn LanguageModel> = Arc::new(
        MockLanguageModel::new("neutro")
            .with_rule("Metas da empresa", "Análise de metas indisponível no modo simulado.")
            .with_rule("banco vetorial", "Análise de mercado indisponível no modo simulado.")
            .with_rule("ótimo", "positivo")
            .with_rule("Ótimo", "positivo")
            .with_rule("excelente", "positivo")
            .with_rule("ruim", "negativo")
            .with_rule("lento", "negativo"),
    );
    Ok(Collaborators {
        backend: memory_backend(config, db)?,
        embedder: Arc::new(MockEmbedding::new(config.vector.dimension)),
        transcriber: Arc::new(MockTranscriptionService::new()),
        classifier_model: model.clone(),
        report_model: model,
    })
}

fn live_collaborators(config: &SymConfig, db: &Arc<Database>) -> Result<Collaborators> {
    let backend: Arc<dyn VectorBackend> = match config.vector.backend {
        VectorBackendKind::Memory => memory_backend(config, db)?,
        VectorBackendKind::Pinecone => Arc::new(PineconeBackend::from_config(&config.vector)?),
    };
    Ok(Collaborators {
        backend,
        embedder: Arc::new(OpenAiEmbedding::from_config(
            &config.openai,
            config.vector.dimension,
        )?),
        transcriber: Arc::new(WhisperService::from_config(&config.openai)?),
        classifier_model: Arc::new(OpenAiChat::classifier_from_config(&config.openai)?),
        report_model: Arc::new(OpenAiChat::reporter_from_config(&config.openai)?),
    })
}

/// Build the full API state.
///
/// `data_dir` must already be resolved. Relative `transcripts_dir` values
/// are placed under it.
pub fn build_state(config: SymConfig, data_dir: &Path, mock_services: bool) -> Result<AppState> {
    let db = Arc::new(Database::new(&data_dir.join(&config.storage.database_file))?);
    tracing::info!(path = %data_dir.join(&config.storage.database_file).display(), "SQLite database opened");

    let records = Arc::new(FeedbackRepository::new(Arc::clone(&db)));
    let aggregates: Arc<dyn AggregateStore> = Arc::new(AggregateQueries::new(Arc::clone(&db)));

    let collaborators = if mock_services {
        tracing::info!("Using mock collaborators");
        mock_collaborators(&config, &db)?
    } else {
        live_collaborators(&config, &db)?
    };
    tracing::info!(
        backend = ?config.vector.backend,
        namespace = %config.vector.namespace,
        "Vector store ready"
    );

    let timeouts = config.timeouts.clone();
    let vectors = VectorStoreAdapter::new(
        collaborators.backend,
        &config.vector.namespace,
        timeouts.vector(),
    );
    let classifier = SentimentClassifier::new(collaborators.classifier_model, timeouts.classification());
    let policy = PolicyTable::new(config.pipeline.consistency);
    tracing::info!(mode = ?policy.mode(), "Consistency mode");

    let pipeline = FeedbackPipeline::new(
        Arc::clone(&records) as Arc<dyn RecordStore>,
        vectors.clone(),
        classifier,
        Arc::clone(&collaborators.embedder),
        collaborators.transcriber,
        policy,
        timeouts.clone(),
    );

    let search = SemanticSearch::new(
        vectors,
        collaborators.embedder,
        config.vector.top_k,
        config.vector.similarity_threshold,
        timeouts.embedding(),
    );
    let reports = ReportSynthesizer::new(
        Arc::clone(&aggregates),
        search,
        collaborators.report_model,
        timeouts.generation(),
    );

    let transcripts_dir = {
        let dir = PathBuf::from(&config.pipeline.transcripts_dir);
        if dir.is_absolute() {
            dir
        } else {
            data_dir.join(dir)
        }
    };
    let archive = TranscriptArchive::new(transcripts_dir);

    Ok(AppState::new(config, pipeline, reports, aggregates, records, archive))
}
