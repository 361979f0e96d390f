//! Analysis service coordinating extraction, normalization, binding, and dispatch.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    config::Config,
    extraction::extract_text_blocking,
    llm::{LlmClient, OpenAiCompatibleClient, ProviderSettings},
    logging::preview,
    metrics::{AnalysisMetrics, MetricsSnapshot},
    processing::{
        dispatch::{AnalysisDispatcher, RetryPolicy},
        normalize::collapse_spaces,
        types::{AnalysisError, AnalysisQuery, AnalysisResult, SetupError},
    },
    prompts::{DocumentBudget, PromptBinder},
    upload::TransientDocument,
};

/// Runs the full pipeline for one document: extract → normalize → bind → dispatch.
///
/// The service owns the validated templates, the provider client, and the metrics registry.
/// Construct it once at startup and share it through an `Arc`; nothing in it changes per
/// request, and nothing is cached between requests.
pub struct AnalysisService {
    binder: PromptBinder,
    dispatcher: AnalysisDispatcher,
    metrics: Arc<AnalysisMetrics>,
}

/// Abstraction over the analysis pipeline used by the HTTP surface.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Analyze an uploaded document against `query`.
    async fn analyze(
        &self,
        document: &TransientDocument,
        query: &AnalysisQuery,
    ) -> Result<AnalysisResult, AnalysisError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl AnalysisService {
    /// Assemble a service from already-built parts.
    pub fn new(
        binder: PromptBinder,
        client: Arc<dyn LlmClient>,
        retry: RetryPolicy,
        call_timeout: Duration,
    ) -> Self {
        let metrics = Arc::new(AnalysisMetrics::new());
        let dispatcher = AnalysisDispatcher::new(client, retry, call_timeout, metrics.clone());
        Self {
            binder,
            dispatcher,
            metrics,
        }
    }

    /// Build the production pipeline from configuration.
    ///
    /// Fails when the built-in templates do not validate or the tokenizer or HTTP client cannot
    /// be initialized.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        let budget = DocumentBudget::new(config.document_token_budget)?;
        let binder = PromptBinder::with_default_templates(budget)?;
        tracing::info!(
            budget = config.document_token_budget,
            "Role templates validated"
        );
        let client = OpenAiCompatibleClient::new(ProviderSettings::from(config))?;
        let retry = RetryPolicy {
            max_retries: config.llm_max_retries,
            base_delay: config.llm_retry_base_delay,
        };
        Ok(Self::new(
            binder,
            Arc::new(client),
            retry,
            config.llm_timeout,
        ))
    }

    /// Analyze the document stored at `path`, reporting it under `filename`.
    pub async fn analyze_file(
        &self,
        path: &Path,
        filename: &str,
        query: &AnalysisQuery,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let outcome = self.run_pipeline(path, filename, query).await;
        match &outcome {
            Ok(result) => {
                self.metrics.record_completed();
                tracing::info!(
                    file = filename,
                    query = %preview(query.as_str()),
                    stages = result.stages.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis completed"
                );
            }
            Err(error) => {
                self.metrics.record_failed();
                tracing::warn!(
                    file = filename,
                    error = %error,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis failed"
                );
            }
        }
        outcome
    }

    async fn run_pipeline(
        &self,
        path: &Path,
        filename: &str,
        query: &AnalysisQuery,
    ) -> Result<AnalysisResult, AnalysisError> {
        let text = load_document_text(path, filename).await?;
        let instructions = self.binder.bind(&text, query.as_str());
        let outcome = self.dispatcher.dispatch(&instructions).await?;
        Ok(AnalysisResult {
            query: query.as_str().to_string(),
            analysis: outcome.analysis,
            file_processed: filename.to_string(),
            stages: outcome.stages,
        })
    }
}

#[async_trait]
impl AnalysisApi for AnalysisService {
    async fn analyze(
        &self,
        document: &TransientDocument,
        query: &AnalysisQuery,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_file(document.path(), document.original_filename(), query)
            .await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Extract and normalize a document, rejecting documents without usable text.
pub async fn load_document_text(path: &Path, filename: &str) -> Result<String, AnalysisError> {
    let raw = extract_text_blocking(path.to_path_buf()).await?;
    let text = collapse_spaces(&raw);
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyDocument {
            filename: filename.to_string(),
        });
    }
    tracing::debug!(file = filename, chars = text.len(), "Document text normalized");
    Ok(text)
}
