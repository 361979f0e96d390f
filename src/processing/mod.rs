//! Analysis pipeline: normalization, role dispatch, and orchestration.

mod dispatch;
mod normalize;
mod service;
mod types;

pub use dispatch::{
    AnalysisDispatcher, DispatchError, DispatchOutcome, RetryPolicy, StageOutput,
};
pub use normalize::collapse_spaces;
pub use service::{AnalysisApi, AnalysisService, load_document_text};
pub use types::{AnalysisError, AnalysisQuery, AnalysisResult, DEFAULT_QUERY, SetupError};
