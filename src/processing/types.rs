//! Core data types and error definitions for the analysis pipeline.

use std::fmt;
use thiserror::Error;

use super::dispatch::{DispatchError, StageOutput};
use crate::extraction::ExtractionError;
use crate::prompts::{BudgetError, TemplateError};

/// Query used when the caller supplies none.
pub const DEFAULT_QUERY: &str = "give a full summary of this document.";

/// Errors emitted by the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The document could not be read or parsed.
    #[error(transparent)]
    DocumentRead(#[from] ExtractionError),
    /// The document parsed but contained no usable text.
    #[error("Document {filename} contains no extractable text")]
    EmptyDocument {
        /// Original name of the uploaded file.
        filename: String,
    },
    /// The role sequence failed against the provider.
    #[error("Analysis failed: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Errors raised while assembling the pipeline at startup.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A role template failed validation.
    #[error("Invalid role template: {0}")]
    Template(#[from] TemplateError),
    /// The document token budget could not be built.
    #[error("Invalid document budget: {0}")]
    Budget(#[from] BudgetError),
    /// The provider HTTP client could not be constructed.
    #[error("Failed to build provider client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// User query bound to every role; never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisQuery(String);

impl AnalysisQuery {
    /// Trim the supplied query, falling back to [`DEFAULT_QUERY`] when absent or blank.
    pub fn from_input(input: Option<String>) -> Self {
        match input {
            Some(value) if !value.trim().is_empty() => Self(value.trim().to_string()),
            _ => Self(DEFAULT_QUERY.to_string()),
        }
    }

    /// Query text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take ownership of the query text.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for AnalysisQuery {
    fn default() -> Self {
        Self::from_input(None)
    }
}

impl fmt::Display for AnalysisQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Completed analysis of one document.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Query the analysis answers.
    pub query: String,
    /// Final role's output.
    pub analysis: String,
    /// Original name of the processed file.
    pub file_processed: String,
    /// Every role's output, in execution order.
    pub stages: Vec<StageOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_or_missing_query_uses_default() {
        assert_eq!(AnalysisQuery::from_input(None).as_str(), DEFAULT_QUERY);
        assert_eq!(
            AnalysisQuery::from_input(Some("  \n\t ".into())).as_str(),
            DEFAULT_QUERY
        );
    }

    #[test]
    fn supplied_query_is_trimmed() {
        let query = AnalysisQuery::from_input(Some("  What is the debt ratio?  ".into()));
        assert_eq!(query.as_str(), "What is the debt ratio?");
        assert_eq!(query.into_inner(), "What is the debt ratio?");
    }
}
