//! Role templates and prompt binding.
//!
//! Each request is framed by four fixed roles executed as Verifier → Analyst → RiskAssessor →
//! Advisor. Templates are typed records validated once at startup; a template whose grounding
//! clause is missing is rejected before the server accepts traffic.

mod binder;
mod budget;
mod roles;

pub use binder::{BoundInstruction, PromptBinder, TemplateError};
pub use budget::{BudgetError, DocumentBudget, DocumentExcerpt};
pub use roles::{
    AgentRole, GROUNDING_CLAUSE, REQUIRED_GROUNDING_PHRASES, RoleTemplate, default_templates,
};
