//! Shell-based executor running each step command in the project directory.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::info;

use crate::config::PipelineConfig;
use crate::executor::{ExecutionContext, PipelineExecutor, PipelineOutcome, StepResult};
use crate::step::BuildStep;

/// Runs enabled steps in order through `sh -c`, stopping at the first failure.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    workdir: PathBuf,
    shell: String,
}

impl ShellExecutor {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            shell: "sh".to_string(),
        }
    }

    /// Execute a single step and capture its output.
    pub async fn execute_step(&self, step: &BuildStep) -> anyhow::Result<StepResult> {
        let start = Instant::now();

        if step.run.trim().is_empty() {
            anyhow::bail!("Step {} has an empty command", step.id);
        }

        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(&step.run)
            .current_dir(&self.workdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = if step.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(step.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                anyhow::anyhow!("Step {} timed out after {} seconds", step.id, step.timeout_secs)
            })??
        } else {
            child.wait_with_output().await?
        };

        Ok(StepResult {
            step_id: step.id.clone(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            success: output.status.success(),
        })
    }
}

#[async_trait]
impl PipelineExecutor for ShellExecutor {
    async fn pipeline(
        &self,
        config: PipelineConfig,
        context: &ExecutionContext,
    ) -> anyhow::Result<PipelineOutcome> {
        let start = Instant::now();
        let config_digest = config.digest()?;
        let mut results = Vec::new();
        let mut all_passed = true;

        for step in config.steps() {
            if !step.enabled || !context.selects(&step.id) {
                info!(step = %step.id, "Skipping step");
                continue;
            }
            info!(run_id = %context.run_id, step = %step.id, "Executing step");

            let step_start = Instant::now();
            let result = match self.execute_step(step).await {
                Ok(r) => r,
                Err(e) => StepResult {
                    step_id: step.id.clone(),
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                    duration_ms: step_start.elapsed().as_millis() as u64,
                    success: false,
                },
            };
            let passed = result.passed();
            results.push(result);
            if !passed {
                all_passed = false;
                info!(step = %step.id, "Step failed, stopping pipeline");
                break;
            }
        }

        Ok(PipelineOutcome {
            run_id: context.run_id,
            success: all_passed,
            steps: results,
            duration_ms: start.elapsed().as_millis() as u64,
            config_digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_simple_command() {
        let runner = ShellExecutor::new(".");
        let result = runner
            .execute_step(&BuildStep::new("echo", "echo hello"))
            .await
            .expect("execute failed");
        assert!(result.passed());
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let runner = ShellExecutor::new(".");
        let result = runner
            .execute_step(&BuildStep::new("fail", "exit 3"))
            .await
            .expect("execute failed");
        assert!(!result.passed());
        assert_eq!(result.exit_code, 3);
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let runner = ShellExecutor::new(".");
        assert!(runner.execute_step(&BuildStep::new("noop", "  ")).await.is_err());
    }

    fn config(steps: Vec<BuildStep>) -> PipelineConfig {
        use crate::bundle::{BundleSpec, ModuleSpec};
        use crate::config::{PipelineConfigBuilder, Target};
        use crate::dependencies::DependencySpec;
        use crate::descriptor::ProjectDescriptor;

        let project = ProjectDescriptor::parse(r#"{"name":"pkg","version":"1.0.0"}"#).unwrap();
        let deps = DependencySpec::default();
        let bundles = BundleSpec::new(ModuleSpec::main("index.ts"), vec![], &deps).unwrap();
        PipelineConfigBuilder::new(project, deps, bundles, Target::JsBundle { links: vec![] })
            .default_steps(steps)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_failed_spawn_duration_is_per_step() {
        let runner = ShellExecutor::new(".");
        let steps = vec![BuildStep::new("slow", "sleep 1"), BuildStep::new("broken", " ")];
        let outcome = runner
            .pipeline(config(steps), &ExecutionContext::new())
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.steps.len(), 2);
        assert!(outcome.steps[0].passed());
        assert_eq!(outcome.steps[1].exit_code, -1);
        assert!(outcome.steps[1].duration_ms < 1000);
    }

    #[tokio::test]
    async fn test_timeout_reported() {
        let runner = ShellExecutor::new(".");
        let err = runner
            .execute_step(&BuildStep::new("slow", "sleep 5").with_timeout(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
