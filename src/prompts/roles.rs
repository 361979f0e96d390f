//! Agent roles and their fixed instruction templates.

use std::fmt;

/// Grounding clause shared by every built-in role template.
pub const GROUNDING_CLAUSE: &str = "Ground every claim in figures and statements taken from the supplied document text. \
Do not fabricate data, invent external sources, or rely on outside market knowledge. \
When the document lacks the figures needed to answer, say \"not enough information\" instead of guessing.";

/// Phrases a grounding clause must contain for a template to be accepted.
pub const REQUIRED_GROUNDING_PHRASES: &[&str] = &["not enough information", "figures"];

/// One of the fixed roles that frame a single LLM invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentRole {
    /// Checks that the upload is a financial document at all.
    Verifier,
    /// Produces the substantive financial analysis.
    Analyst,
    /// Identifies risks disclosed or implied by the figures.
    RiskAssessor,
    /// Turns findings and risks into investment guidance.
    Advisor,
}

impl AgentRole {
    /// Execution order of the role sequence.
    pub const SEQUENCE: [AgentRole; 4] = [
        AgentRole::Verifier,
        AgentRole::Analyst,
        AgentRole::RiskAssessor,
        AgentRole::Advisor,
    ];

    /// Stable identifier used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verifier => "verifier",
            Self::Analyst => "analyst",
            Self::RiskAssessor => "risk_assessor",
            Self::Advisor => "advisor",
        }
    }

    /// Earlier roles whose outputs are threaded into this role's context.
    pub fn context_roles(&self) -> &'static [AgentRole] {
        match self {
            Self::Verifier => &[],
            Self::Analyst => &[AgentRole::Verifier],
            Self::RiskAssessor => &[AgentRole::Verifier, AgentRole::Analyst],
            Self::Advisor => &[
                AgentRole::Verifier,
                AgentRole::Analyst,
                AgentRole::RiskAssessor,
            ],
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static persona, goal, and grounding clause bound to a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTemplate {
    /// Role this template frames.
    pub role: AgentRole,
    /// Display name the model is asked to act as.
    pub name: String,
    /// Background describing who the model is.
    pub persona: String,
    /// What the role must produce.
    pub goal: String,
    /// Instruction restricting claims to the supplied text.
    pub grounding: String,
}

impl RoleTemplate {
    /// Build a template carrying the shared [`GROUNDING_CLAUSE`].
    pub fn grounded(
        role: AgentRole,
        name: impl Into<String>,
        persona: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            role,
            name: name.into(),
            persona: persona.into(),
            goal: goal.into(),
            grounding: GROUNDING_CLAUSE.to_string(),
        }
    }
}

/// Built-in financial analysis templates, one per role.
pub fn default_templates() -> Vec<RoleTemplate> {
    vec![
        RoleTemplate::grounded(
            AgentRole::Verifier,
            "Financial Document Verifier",
            "You are a meticulous compliance reviewer who confirms whether an uploaded file is a \
             genuine financial document before anyone relies on it.",
            "State whether the document is financial in nature (for example an annual report, \
             quarterly statement, or earnings release). Identify the document type, the \
             reporting period, and the entities involved. Begin your answer with \
             \"VERIFIED\" or \"NOT VERIFIED\" followed by a short justification.",
        ),
        RoleTemplate::grounded(
            AgentRole::Analyst,
            "Senior Financial Analyst",
            "You are a professional financial analyst specializing in corporate financial \
             reports. You extract key metrics, evaluate performance, and assess financial \
             health strictly from document content.",
            "Address the user query with a structured analysis covering: document overview, \
             financial performance (revenue trends, profitability, cash flow, growth), \
             financial health (liquidity, debt levels, operational efficiency), and key \
             findings (significant changes, notable trends, anomalies). If the verifier did \
             not verify the document as financial, say so and limit the analysis accordingly.",
        ),
        RoleTemplate::grounded(
            AgentRole::RiskAssessor,
            "Financial Risk Assessor",
            "You are a risk officer who reviews financial disclosures for operational, \
             financial, and market exposures.",
            "List the operational, financial, and market risks mentioned in or implied by the \
             document figures, rate each as low, medium, or high, and cite the passage or \
             figure behind every rating.",
        ),
        RoleTemplate::grounded(
            AgentRole::Advisor,
            "Investment Advisor",
            "You are a balanced investment advisor who turns analyst findings and identified \
             risks into measured, evidence-based guidance.",
            "Answer the user query with an executive summary, key financial metrics, and \
             balanced investment considerations that reference the analyst's findings and the \
             identified risks. Do not recommend specific products or promise returns.",
        ),
    ]
}
