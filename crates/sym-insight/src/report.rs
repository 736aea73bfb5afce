//! Report synthesis.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use sym_core::bounded;
use sym_core::error::{Result, SymError};
use sym_llm::LanguageModel;
use sym_storage::AggregateStore;
use sym_vector::SemanticSearch;

use crate::prompts;

pub const GOALS_HEADER: &str = "### Análise de Metas";
pub const MARKET_HEADER: &str = "### Análise de Mercado";

/// Builds the two-part narrative report. Any failure aborts the whole
/// report; there is no partial output.
pub struct ReportSynthesizer {
    aggregates: Arc<dyn AggregateStore>,
    search: SemanticSearch,
    model: Arc<dyn LanguageModel>,
    generation_timeout: Duration,
}

impl ReportSynthesizer {
    pub fn new(
        aggregates: Arc<dyn AggregateStore>,
        search: SemanticSearch,
        model: Arc<dyn LanguageModel>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            aggregates,
            search,
            model,
            generation_timeout,
        }
    }

    pub async fn generate_report(&self, goal: &str, query: &str) -> Result<String> {
        if goal.trim().is_empty() || query.trim().is_empty() {
            return Err(SymError::Validation(
                "goal and query must not be empty".to_string(),
            ));
        }

        let rows = self
            .aggregates
            .sentiment_by_unit()
            .inspect_err(|e| error!(error = %e, "Report aggregate query failed"))?;
        let hits = self
            .search
            .search(query)
            .await
            .inspect_err(|e| error!(error = %e, "Report semantic search failed"))?;

        let summary = prompts::render_summary(&rows);
        let examples = prompts::render_examples(&hits);
        let goals_prompt = prompts::goals_prompt(goal, &summary);
        let market_prompt = prompts::market_prompt(&summary, &examples);

        let (goals, market) = tokio::try_join!(
            bounded("generation.goals", self.generation_timeout, self.model.generate(&goals_prompt)),
            bounded("generation.market", self.generation_timeout, self.model.generate(&market_prompt)),
        )
        .inspect_err(|e| error!(error = %e, "Report generation failed"))?;

        info!(
            aggregate_rows = rows.len(),
            retained_hits = hits.len(),
            "Report generated"
        );

        Ok(format!(
            "{}\n{}\n\n{}\n{}",
            GOALS_HEADER, goals, MARKET_HEADER, market
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sym_core::types::{Metadata, Sentiment, SentimentTrendPoint, UnitCount, UnitSentimentCount};
    use sym_llm::MockLanguageModel;
    use sym_storage::{AggregateQueries, Database, FeedbackRepository, RecordStore};
    use sym_vector::{EmbeddingService, MockEmbedding, VectorBackend, VectorIndex, VectorStoreAdapter};

    const NS: &str = "comentarios_namespace";

    fn search_over(index: &VectorIndex, embedder: Arc<MockEmbedding>) -> SemanticSearch {
        let store = VectorStoreAdapter::new(Arc::new(index.clone()), NS, Duration::from_secs(5));
        SemanticSearch::new(store, embedder, 3, 0.8, Duration::from_secs(5))
    }

    fn seeded_aggregates() -> Arc<AggregateQueries> {
        let db = Arc::new(Database::in_memory().unwrap());
        let repo = FeedbackRepository::new(db.clone());
        let id = repo.create_comment("atendimento lento").unwrap();
        repo.set_sentiment(id, Sentiment::Negative).unwrap();
        Arc::new(AggregateQueries::new(db))
    }

    fn model() -> Arc<MockLanguageModel> {
        Arc::new(
            MockLanguageModel::new("?")
                .with_rule("Metas da empresa", "As metas não foram atingidas.")
                .with_rule("banco vetorial", "Tendência de lentidão."),
        )
    }

    #[tokio::test]
    async fn test_report_with_empty_vector_store_has_both_sections() {
        let index = VectorIndex::with_namespace(NS);
        let model = model();
        let synthesizer = ReportSynthesizer::new(
            seeded_aggregates(),
            search_over(&index, Arc::new(MockEmbedding::new(16))),
            model.clone(),
            Duration::from_secs(5),
        );

        let report = synthesizer
            .generate_report("Reduzir reclamações em 10%", "atendimento lento")
            .await
            .unwrap();

        assert_eq!(
            report,
            "### Análise de Metas\nAs metas não foram atingidas.\n\n### Análise de Mercado\nTendência de lentidão."
        );
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts
            .iter()
            .any(|p| p.contains("unidade=-, sentimento=negative, total=1")));
    }

    #[tokio::test]
    async fn test_report_includes_retained_hits_only() {
        let index = VectorIndex::with_namespace(NS);
        let embedder = Arc::new(MockEmbedding::new(16));
        for (id, text) in [("1", "atendimento lento"), ("2", "preço alto")] {
            let mut metadata = Metadata::new();
            metadata.insert("comentario".into(), text.into());
            index
                .upsert(NS, id, embedder.embed(text).await.unwrap(), metadata)
                .await
                .unwrap();
        }

        let model = model();
        let synthesizer = ReportSynthesizer::new(
            seeded_aggregates(),
            search_over(&index, embedder),
            model.clone(),
            Duration::from_secs(5),
        );
        synthesizer
            .generate_report("Meta", "atendimento lento")
            .await
            .unwrap();

        let market = model
            .prompts()
            .into_iter()
            .find(|p| p.contains("banco vetorial"))
            .unwrap();
        assert!(market.contains("- atendimento lento"));
        assert!(!market.contains("preço alto"));
    }

    #[tokio::test]
    async fn test_generation_failure_aborts_report() {
        let synthesizer = ReportSynthesizer::new(
            seeded_aggregates(),
            search_over(&VectorIndex::with_namespace(NS), Arc::new(MockEmbedding::new(8))),
            Arc::new(MockLanguageModel::failing("rate limited")),
            Duration::from_secs(5),
        );
        let err = synthesizer.generate_report("Meta", "q").await.unwrap_err();
        assert!(matches!(err, SymError::Generation(_)));
    }

    struct BrokenAggregates;

    impl AggregateStore for BrokenAggregates {
        fn comments_by_unit(&self) -> Result<Vec<UnitCount>> {
            Err(SymError::Storage("down".into()))
        }
        fn sentiment_by_unit(&self) -> Result<Vec<UnitSentimentCount>> {
            Err(SymError::Storage("down".into()))
        }
        fn sentiment_trend(&self) -> Result<Vec<SentimentTrendPoint>> {
            Err(SymError::Storage("down".into()))
        }
    }

    #[tokio::test]
    async fn test_aggregate_failure_aborts_before_generation() {
        let model = model();
        let synthesizer = ReportSynthesizer::new(
            Arc::new(BrokenAggregates),
            search_over(&VectorIndex::with_namespace(NS), Arc::new(MockEmbedding::new(8))),
            model.clone(),
            Duration::from_secs(5),
        );
        let err = synthesizer.generate_report("Meta", "q").await.unwrap_err();
        assert!(matches!(err, SymError::Storage(_)));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_blank_inputs_rejected() {
        let synthesizer = ReportSynthesizer::new(
            seeded_aggregates(),
            search_over(&VectorIndex::with_namespace(NS), Arc::new(MockEmbedding::new(8))),
            model(),
            Duration::from_secs(5),
        );
        let err = synthesizer.generate_report("Meta", "  ").await.unwrap_err();
        assert!(matches!(err, SymError::Validation(_)));
    }
}
