use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::path::PathBuf;

use crate::pipeline::stage::TaskSpec;
use crate::pipeline::state::{Event, RunState, StageStatus};
use crate::pipeline::{Evaluation, Pipeline};
use crate::services::{find_service, Service};
use crate::util::slug::stage_log_name;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOptions {
    /// Log tasks instead of calling services.
    pub dry_run: bool,
    pub state_file: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStage {
    pub stage: String,
    pub reason: String,
    /// Skipped only because upstream output was not there yet.
    pub not_ready: bool,
}

#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    pub skipped: Vec<SkippedStage>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        let failed = self
            .state
            .records()
            .iter()
            .any(|r| r.status == StageStatus::Failure);
        !failed && self.skipped.iter().all(|s| s.not_ready)
    }
}

/// Drives a [`Pipeline`]: feeds events through its triggers and dispatches
/// ready stages to services one at a time.
pub struct Engine {
    pipeline: Pipeline,
    services: Vec<Box<dyn Service>>,
    options: EngineOptions,
}

impl Engine {
    pub fn new(pipeline: Pipeline, services: Vec<Box<dyn Service>>, options: EngineOptions) -> Self {
        Self {
            pipeline,
            services,
            options,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let mut state = RunState::new();
        let mut skipped: Vec<SkippedStage> = Vec::new();
        let mut events = VecDeque::from([Event::EngineStarted]);

        tracing::info!(
            pipeline = %self.pipeline.name,
            dry_run = self.options.dry_run,
            "engine started"
        );

        while let Some(event) = events.pop_front() {
            for evaluation in self.pipeline.evaluate(&event, &state) {
                match evaluation {
                    Evaluation::Skipped { stage, error } => {
                        if error.is_not_ready() {
                            tracing::debug!(stage, reason = %error, "stage not ready");
                        } else {
                            tracing::warn!(stage, error = %error, "stage skipped");
                        }
                        skipped.retain(|s| s.stage != stage);
                        skipped.push(SkippedStage {
                            stage: stage.to_string(),
                            reason: error.to_string(),
                            not_ready: error.is_not_ready(),
                        });
                    }
                    Evaluation::Run { stage, task } => {
                        skipped.retain(|s| s.stage != stage);
                        self.run_stage(stage, &task, &mut state).await?;
                        events.push_back(Event::StageFinished {
                            stage: stage.to_string(),
                        });
                    }
                }
            }

            if events.is_empty() && event != Event::EngineFinished {
                events.push_back(Event::EngineFinished);
            }
        }

        tracing::info!(
            stages = state.records().len(),
            skipped = skipped.len(),
            "engine finished"
        );

        if let Some(path) = &self.options.state_file {
            let json = serde_json::to_string_pretty(&state)?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write state to {}", path.display()))?;
        }

        Ok(RunReport { state, skipped })
    }

    async fn run_stage(&self, stage: &str, task: &TaskSpec, state: &mut RunState) -> Result<()> {
        tracing::info!(stage, service = %task.service, endpoint = %task.endpoint, "stage triggered");
        state.begin(stage)?;

        // The record is closed before any log I/O so a log failure cannot leave it pending.
        let log_contents = match self.execute(task).await {
            Ok(output) => {
                tracing::info!(stage, status = %StageStatus::Success, "stage finished");
                let contents = output.clone().unwrap_or_default();
                state.finish(stage, StageStatus::Success, output, None)?;
                contents
            }
            Err(err) => {
                let message = format!("{err:#}");
                tracing::error!(stage, status = %StageStatus::Failure, error = %message, "stage finished");
                state.finish(stage, StageStatus::Failure, None, Some(message.clone()))?;
                message
            }
        };

        if let Err(err) = self.write_stage_log(stage, &log_contents) {
            tracing::warn!(stage, error = %format!("{err:#}"), "failed to write stage log");
        }
        Ok(())
    }

    async fn execute(&self, task: &TaskSpec) -> Result<Option<String>> {
        if self.options.dry_run {
            let keys: Vec<&str> = task.arguments.iter().map(|a| a.key.as_str()).collect();
            tracing::info!(
                service = %task.service,
                endpoint = %task.endpoint,
                arguments = ?keys,
                "dry run, not calling service"
            );
            return Ok(None);
        }

        let service = find_service(&self.services, &task.service)
            .ok_or_else(|| anyhow!("No service named {} is configured", task.service))?;
        let output = service.call(&task.endpoint, &task.arguments).await?;
        Ok(Some(output))
    }

    fn write_stage_log(&self, stage: &str, contents: &str) -> Result<()> {
        let Some(dir) = &self.options.logs_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let path = dir.join(stage_log_name(stage));
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
