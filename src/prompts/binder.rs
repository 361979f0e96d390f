//! Binds a query and document text to the validated role templates.

use std::collections::BTreeMap;
use thiserror::Error;

use super::budget::DocumentBudget;
use super::roles::{AgentRole, REQUIRED_GROUNDING_PHRASES, RoleTemplate, default_templates};

/// Reasons a set of role templates is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// No template was supplied for a role in the sequence.
    #[error("no template defined for role {0}")]
    MissingRole(AgentRole),
    /// More than one template was supplied for the same role.
    #[error("role {0} is defined more than once")]
    DuplicateRole(AgentRole),
    /// A required text field is blank.
    #[error("template for role {role} has an empty {field}")]
    EmptyField {
        /// Role whose template is incomplete.
        role: AgentRole,
        /// Name of the blank field.
        field: &'static str,
    },
    /// The grounding clause does not contain a required phrase.
    #[error("template for role {role} lacks a grounding clause requiring \"{phrase}\"")]
    MissingGrounding {
        /// Role whose template is ungrounded.
        role: AgentRole,
        /// Phrase the grounding clause must contain.
        phrase: &'static str,
    },
}

/// A role-specific instruction ready to be sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInstruction {
    /// Role this instruction frames.
    pub role: AgentRole,
    /// System message: persona plus grounding clause.
    pub system_prompt: String,
    /// User message: goal, query, and document excerpt.
    pub user_prompt: String,
}

/// Validated role templates plus the document token budget.
pub struct PromptBinder {
    templates: Vec<RoleTemplate>,
    budget: DocumentBudget,
}

impl PromptBinder {
    /// Validate `templates` and order them by [`AgentRole::SEQUENCE`].
    pub fn new(templates: Vec<RoleTemplate>, budget: DocumentBudget) -> Result<Self, TemplateError> {
        let mut by_role = BTreeMap::new();
        for template in templates {
            validate(&template)?;
            let role = template.role;
            if by_role.insert(role, template).is_some() {
                return Err(TemplateError::DuplicateRole(role));
            }
        }

        let mut ordered = Vec::with_capacity(AgentRole::SEQUENCE.len());
        for role in AgentRole::SEQUENCE {
            let template = by_role
                .remove(&role)
                .ok_or(TemplateError::MissingRole(role))?;
            ordered.push(template);
        }

        Ok(Self {
            templates: ordered,
            budget,
        })
    }

    /// Binder over the built-in financial templates.
    pub fn with_default_templates(budget: DocumentBudget) -> Result<Self, TemplateError> {
        Self::new(default_templates(), budget)
    }

    /// Produce one instruction per role, in sequence order.
    pub fn bind(&self, document_text: &str, query: &str) -> Vec<BoundInstruction> {
        let excerpt = self.budget.excerpt(document_text);
        if excerpt.is_truncated() {
            tracing::info!(
                total_tokens = excerpt.total_tokens,
                kept_tokens = excerpt.kept_tokens,
                budget = self.budget.max_tokens(),
                "Document truncated to fit prompt budget"
            );
        }

        self.templates
            .iter()
            .map(|template| BoundInstruction {
                role: template.role,
                system_prompt: format!(
                    "You are the {}.\n{}\n\n{}",
                    template.name.trim(),
                    template.persona.trim(),
                    template.grounding.trim()
                ),
                user_prompt: format!(
                    "Goal: {}\n\nUser query: {}\n\nDocument text:\n\"\"\"\n{}\n\"\"\"",
                    template.goal.trim(),
                    query,
                    excerpt.text
                ),
            })
            .collect()
    }
}

fn validate(template: &RoleTemplate) -> Result<(), TemplateError> {
    let fields = [
        ("name", &template.name),
        ("persona", &template.persona),
        ("goal", &template.goal),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(TemplateError::EmptyField {
                role: template.role,
                field,
            });
        }
    }

    let grounding = template.grounding.to_lowercase();
    for &phrase in REQUIRED_GROUNDING_PHRASES {
        if !grounding.contains(phrase) {
            return Err(TemplateError::MissingGrounding {
                role: template.role,
                phrase,
            });
        }
    }
    Ok(())
}
