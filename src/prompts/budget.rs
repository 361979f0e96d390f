//! Token budget applied to the document excerpt embedded in each prompt.
//!
//! Documents are measured with the `cl100k_base` encoding. Text within the budget is passed
//! through untouched; longer text is cut to the decoded head of the first `max_tokens` tokens
//! and followed by a marker line so the model knows the rest was omitted. The cut is
//! deterministic: the same text and budget always produce the same excerpt.

use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::{CoreBPE, cl100k_base};

/// Reasons a [`DocumentBudget`] cannot be built.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// A zero-token budget would drop every document.
    #[error("document token budget must be greater than zero")]
    ZeroLimit,
    /// The `cl100k_base` encoding could not be loaded.
    #[error("failed to load cl100k_base tokenizer: {0}")]
    Tokenizer(String),
}

/// Token limit for document excerpts, with the tokenizer used to enforce it.
#[derive(Clone)]
pub struct DocumentBudget {
    max_tokens: usize,
    encoding: Arc<CoreBPE>,
}

/// Document text as it will appear in the prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentExcerpt<'a> {
    /// Text handed to the model, including the truncation marker when present.
    pub text: Cow<'a, str>,
    /// Token count of the full normalized document.
    pub total_tokens: usize,
    /// Number of document tokens kept in the excerpt.
    pub kept_tokens: usize,
}

impl DocumentExcerpt<'_> {
    /// Whether the document was cut to fit the budget.
    pub fn is_truncated(&self) -> bool {
        self.kept_tokens < self.total_tokens
    }
}

impl DocumentBudget {
    /// Load the tokenizer and build a budget of `max_tokens` document tokens.
    pub fn new(max_tokens: usize) -> Result<Self, BudgetError> {
        if max_tokens == 0 {
            return Err(BudgetError::ZeroLimit);
        }
        let encoding =
            cl100k_base().map_err(|error| BudgetError::Tokenizer(error.to_string()))?;
        Ok(Self {
            max_tokens,
            encoding: Arc::new(encoding),
        })
    }

    /// Configured token limit.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Fit `text` into the budget.
    pub fn excerpt<'a>(&self, text: &'a str) -> DocumentExcerpt<'a> {
        let tokens = self.encoding.encode_ordinary(text);
        let total_tokens = tokens.len();
        if total_tokens <= self.max_tokens {
            return DocumentExcerpt {
                text: Cow::Borrowed(text),
                total_tokens,
                kept_tokens: total_tokens,
            };
        }

        // A cut can land inside a multi-byte character; step back until the head decodes.
        let mut kept_tokens = self.max_tokens;
        let head = loop {
            match self.encoding.decode(tokens[..kept_tokens].to_vec()) {
                Ok(head) => break head,
                Err(_) if kept_tokens > 0 => kept_tokens -= 1,
                Err(_) => break String::new(),
            }
        };

        tracing::debug!(
            total_tokens,
            kept_tokens,
            "Document exceeds token budget; truncating"
        );

        DocumentExcerpt {
            text: Cow::Owned(format!(
                "{}\n[document truncated: showing the first {kept_tokens} of {total_tokens} tokens]",
                head.trim_end()
            )),
            total_tokens,
            kept_tokens,
        }
    }
}
