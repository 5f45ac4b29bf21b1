//! In-memory executor fake (testing only)
//!
//! `RecordingExecutor` keeps every config it is handed and reports each
//! selected step as passed, or fails the whole run when told to.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::executor::{ExecutionContext, PipelineExecutor, PipelineOutcome, StepResult};

#[derive(Debug, Default)]
pub struct RecordingExecutor {
    received: Mutex<Vec<PipelineConfig>>,
    failure: Option<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor whose every run fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    /// Configs received so far, in call order.
    pub fn received(&self) -> Vec<PipelineConfig> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineExecutor for RecordingExecutor {
    async fn pipeline(
        &self,
        config: PipelineConfig,
        context: &ExecutionContext,
    ) -> anyhow::Result<PipelineOutcome> {
        let config_digest = config.digest()?;
        let steps = config
            .steps()
            .iter()
            .filter(|s| s.enabled && context.selects(&s.id))
            .map(|s| StepResult {
                step_id: s.id.clone(),
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: 0,
                success: true,
            })
            .collect();
        self.received.lock().unwrap().push(config);

        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }

        Ok(PipelineOutcome {
            run_id: context.run_id,
            success: true,
            steps,
            duration_ms: 0,
            config_digest,
        })
    }
}
