//! Hand-off to a pipeline executor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::factory::{Environment, PipelineFactory};

/// Per-invocation execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    /// Restrict execution to these step ids; empty runs every enabled step.
    pub only_steps: Vec<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            only_steps: Vec::new(),
        }
    }

    pub fn with_only_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the step with `id` is selected.
    pub fn selects(&self, id: &str) -> bool {
        self.only_steps.is_empty() || self.only_steps.iter().any(|s| s == id)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single step execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepResult {
    pub step_id: String,

    /// Exit code (0 = success, -1 when the process could not run).
    pub exit_code: i32,

    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub success: bool,
}

impl StepResult {
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub run_id: Uuid,

    /// Whether all executed steps passed.
    pub success: bool,

    pub steps: Vec<StepResult>,
    pub duration_ms: u64,

    /// Digest of the executed config.
    pub config_digest: String,
}

impl PipelineOutcome {
    pub fn passed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed()).count()
    }
}

/// External collaborator that performs build/test/publish steps.
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    /// Run the pipeline described by `config`.
    async fn pipeline(
        &self,
        config: PipelineConfig,
        context: &ExecutionContext,
    ) -> anyhow::Result<PipelineOutcome>;
}

/// Build the config and hand it to `executor`.
///
/// Configuration errors abort before anything is handed off; executor
/// errors are returned as-is.
pub async fn run_pipeline(
    factory: &PipelineFactory,
    executor: &dyn PipelineExecutor,
    env: &Environment,
    context: &ExecutionContext,
) -> anyhow::Result<PipelineOutcome> {
    let config = factory.get(env, context)?;
    info!(run_id = %context.run_id, project = %config.project().name, "Handing pipeline to executor");

    let outcome = executor.pipeline(config, context).await?;
    if outcome.success {
        info!(run_id = %outcome.run_id, passed = outcome.passed_count(), "Pipeline completed successfully");
    } else {
        warn!(run_id = %outcome.run_id, failed = outcome.failed_count(), "Pipeline failed");
    }
    Ok(outcome)
}
