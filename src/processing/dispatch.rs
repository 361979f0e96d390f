//! Sequential execution of bound role instructions against the provider.
//!
//! Roles run strictly in the order they were bound. Each role sees the outputs of the earlier
//! roles listed in [`AgentRole::context_roles`]. The first role that fails terminally aborts
//! the sequence; nothing produced so far is returned.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::llm::{CompletionRequest, LlmClient, LlmClientError};
use crate::metrics::AnalysisMetrics;
use crate::prompts::{AgentRole, BoundInstruction};

/// Bounded retry schedule for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first call.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_before_retry(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Output of a single role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    /// Role that produced the text.
    pub role: AgentRole,
    /// Model reply for that role.
    pub output: String,
}

/// Result of a complete role sequence.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Output of the final role.
    pub analysis: String,
    /// Every role's output, in execution order.
    pub stages: Vec<StageOutput>,
}

/// Reasons a role sequence did not complete.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A role failed terminally; remaining roles were not run.
    #[error("{role} stage failed after {attempts} attempt(s): {source}")]
    Stage {
        /// Role whose provider call failed.
        role: AgentRole,
        /// Attempts made for that role, retries included.
        attempts: u32,
        /// Final provider error.
        #[source]
        source: LlmClientError,
    },
    /// There was nothing to dispatch.
    #[error("no instructions to dispatch")]
    NoInstructions,
}

/// Runs role instructions in order with context threading, retries, and per-call timeouts.
pub struct AnalysisDispatcher {
    client: Arc<dyn LlmClient>,
    retry: RetryPolicy,
    call_timeout: Duration,
    metrics: Arc<AnalysisMetrics>,
}

impl AnalysisDispatcher {
    /// Build a dispatcher around a shared provider client.
    pub fn new(
        client: Arc<dyn LlmClient>,
        retry: RetryPolicy,
        call_timeout: Duration,
        metrics: Arc<AnalysisMetrics>,
    ) -> Self {
        Self {
            client,
            retry,
            call_timeout,
            metrics,
        }
    }

    /// Execute `instructions` in order and return the final role's output.
    pub async fn dispatch(
        &self,
        instructions: &[BoundInstruction],
    ) -> Result<DispatchOutcome, DispatchError> {
        let mut stages: Vec<StageOutput> = Vec::with_capacity(instructions.len());

        for instruction in instructions {
            let request = CompletionRequest {
                system: instruction.system_prompt.clone(),
                user: with_context(&instruction.user_prompt, instruction.role, &stages),
            };
            let output = self.call_with_retry(instruction.role, &request).await?;
            tracing::debug!(
                role = %instruction.role,
                output_chars = output.len(),
                "Role completed"
            );
            stages.push(StageOutput {
                role: instruction.role,
                output,
            });
        }

        let analysis = stages
            .last()
            .map(|stage| stage.output.clone())
            .ok_or(DispatchError::NoInstructions)?;
        Ok(DispatchOutcome { analysis, stages })
    }

    async fn call_with_retry(
        &self,
        role: AgentRole,
        request: &CompletionRequest,
    ) -> Result<String, DispatchError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            self.metrics.record_provider_call();

            let result = match tokio::time::timeout(self.call_timeout, self.client.complete(request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(LlmClientError::Timeout(self.call_timeout)),
            };

            match result {
                Ok(output) => return Ok(output),
                Err(error) if error.is_retryable() && attempts <= self.retry.max_retries => {
                    let delay = self.retry.delay_before_retry(attempts);
                    tracing::warn!(
                        role = %role,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Provider call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    tracing::error!(role = %role, attempts, error = %error, "Provider call failed");
                    return Err(DispatchError::Stage {
                        role,
                        attempts,
                        source: error,
                    });
                }
            }
        }
    }
}

fn with_context(user_prompt: &str, role: AgentRole, stages: &[StageOutput]) -> String {
    let relevant: Vec<&StageOutput> = stages
        .iter()
        .filter(|stage| role.context_roles().contains(&stage.role))
        .collect();
    if relevant.is_empty() {
        return user_prompt.to_string();
    }

    let mut prompt = String::from(user_prompt);
    prompt.push_str("\n\nFindings from earlier reviewers:");
    for stage in relevant {
        prompt.push_str(&format!("\n\n### {} output\n{}", stage.role, stage.output));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String, LlmClientError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, LlmClientError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmClientError> {
            self.requests.lock().expect("lock").push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(LlmClientError::InvalidResponse("script exhausted".into())))
        }
    }

    fn instructions() -> Vec<BoundInstruction> {
        AgentRole::SEQUENCE
            .iter()
            .map(|role| BoundInstruction {
                role: *role,
                system_prompt: format!("system for {role}"),
                user_prompt: format!("task for {role}"),
            })
            .collect()
    }

    fn dispatcher(client: Arc<ScriptedClient>, metrics: Arc<AnalysisMetrics>) -> AnalysisDispatcher {
        AnalysisDispatcher::new(
            client,
            RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
            },
            Duration::from_secs(5),
            metrics,
        )
    }

    fn ok(text: &str) -> Result<String, LlmClientError> {
        Ok(text.to_string())
    }

    #[tokio::test]
    async fn threads_prior_outputs_into_later_roles() {
        let client = Arc::new(ScriptedClient::new(vec![
            ok("VERIFIED annual report"),
            ok("revenue grew"),
            ok("debt is high"),
            ok("hold"),
        ]));
        let outcome = dispatcher(client.clone(), Arc::new(AnalysisMetrics::new()))
            .dispatch(&instructions())
            .await
            .expect("dispatch");

        assert_eq!(outcome.analysis, "hold");
        assert_eq!(outcome.stages.len(), 4);

        let requests = client.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].user, "task for verifier");
        assert!(requests[1].user.contains("VERIFIED annual report"));
        assert!(!requests[1].user.contains("revenue grew"));
        assert!(requests[2].user.contains("VERIFIED annual report"));
        assert!(requests[2].user.contains("revenue grew"));
        assert!(requests[3].user.contains("revenue grew"));
        assert!(requests[3].user.contains("debt is high"));
        assert_eq!(requests[3].system, "system for advisor");
    }

    #[tokio::test]
    async fn auth_failure_aborts_without_retry() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(LlmClientError::Auth("401".into())),
            ok("never used"),
        ]));
        let metrics = Arc::new(AnalysisMetrics::new());
        let error = dispatcher(client.clone(), metrics.clone())
            .dispatch(&instructions())
            .await
            .expect_err("auth failure");

        assert!(matches!(
            error,
            DispatchError::Stage {
                role: AgentRole::Verifier,
                attempts: 1,
                source: LlmClientError::Auth(_),
            }
        ));
        assert_eq!(client.requests().len(), 1);
        assert_eq!(metrics.snapshot().provider_calls, 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_then_succeed() {
        let client = Arc::new(ScriptedClient::new(vec![
            ok("VERIFIED"),
            Err(LlmClientError::Transient("429".into())),
            Err(LlmClientError::Transient("502".into())),
            ok("analysis"),
            ok("risks"),
            ok("advice"),
        ]));
        let outcome = dispatcher(client.clone(), Arc::new(AnalysisMetrics::new()))
            .dispatch(&instructions())
            .await
            .expect("dispatch");

        assert_eq!(outcome.analysis, "advice");
        assert_eq!(client.requests().len(), 6);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_transient_error() {
        let client = Arc::new(ScriptedClient::new(vec![
            ok("VERIFIED"),
            ok("analysis"),
            Err(LlmClientError::Transient("429".into())),
            Err(LlmClientError::Transient("429".into())),
            Err(LlmClientError::Transient("429".into())),
            ok("never used"),
        ]));
        let error = dispatcher(client.clone(), Arc::new(AnalysisMetrics::new()))
            .dispatch(&instructions())
            .await
            .expect_err("retries exhausted");

        assert!(matches!(
            error,
            DispatchError::Stage {
                role: AgentRole::RiskAssessor,
                attempts: 3,
                source: LlmClientError::Transient(_),
            }
        ));
        assert_eq!(client.requests().len(), 5);
    }

    #[tokio::test]
    async fn malformed_response_is_not_retried() {
        let client = Arc::new(ScriptedClient::new(vec![
            ok("VERIFIED"),
            Err(LlmClientError::InvalidResponse("no content".into())),
        ]));
        let error = dispatcher(client.clone(), Arc::new(AnalysisMetrics::new()))
            .dispatch(&instructions())
            .await
            .expect_err("malformed");

        assert!(matches!(
            error,
            DispatchError::Stage {
                role: AgentRole::Analyst,
                attempts: 1,
                ..
            }
        ));
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn slow_calls_time_out_as_transient_failures() {
        let mut client = ScriptedClient::new(vec![ok("late"), ok("late"), ok("late")]);
        client.delay = Some(Duration::from_millis(200));
        let client = Arc::new(client);
        let dispatcher = AnalysisDispatcher::new(
            client.clone(),
            RetryPolicy {
                max_retries: 1,
                base_delay: Duration::from_millis(1),
            },
            Duration::from_millis(20),
            Arc::new(AnalysisMetrics::new()),
        );

        let error = dispatcher
            .dispatch(&instructions())
            .await
            .expect_err("timeout");
        assert!(matches!(
            error,
            DispatchError::Stage {
                role: AgentRole::Verifier,
                attempts: 2,
                source: LlmClientError::Timeout(_),
            }
        ));
    }

    #[tokio::test]
    async fn empty_instruction_list_is_an_error() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let error = dispatcher(client, Arc::new(AnalysisMetrics::new()))
            .dispatch(&[])
            .await
            .expect_err("nothing to do");
        assert!(matches!(error, DispatchError::NoInstructions));
    }

    #[test]
    fn retry_delay_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(100));
        assert_eq!(policy.delay_before_retry(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before_retry(3), Duration::from_millis(400));
    }
}
