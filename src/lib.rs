#![deny(missing_docs)]

//! Core library for the LedgerLens financial document analyzer.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF text extraction.
pub mod extraction;
/// Chat-completion provider abstraction and the OpenAI-compatible adapter.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Analysis metrics helpers.
pub mod metrics;
/// Document analysis pipeline.
pub mod processing;
/// Role templates, document budgeting, and prompt binding.
pub mod prompts;
/// Transient storage for uploaded documents.
pub mod upload;
