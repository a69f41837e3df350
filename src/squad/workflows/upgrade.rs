//! Upgrade Workflow (C6): evolve an existing codebase via the Evolution
//! Loop.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use crate::squad::agent::{Agent, AgentTask, ModelBackedAgent};
use crate::squad::config::SquadRuntimeConfig;
use crate::squad::document_context::SharedDocumentContext;
use crate::squad::error::{RuntimeError, RuntimeResult};
use crate::squad::model_invoker::ModelInvoker;
use crate::squad::orchestrator::{EvolutionResult, Squad, SquadResult, Strategy};
use crate::squad::report;

use super::EXECUTION_CATALOG;

#[derive(Debug, Clone)]
pub struct UpgradeConfig {
    pub project_path: String,
    pub output_dir: Option<PathBuf>,
    pub runtime_config: SquadRuntimeConfig,
}

impl UpgradeConfig {
    pub fn new(project_path: impl Into<String>) -> Self {
        UpgradeConfig {
            project_path: project_path.into(),
            output_dir: None,
            runtime_config: SquadRuntimeConfig::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Drives the Evolution Loop over an existing project path. A thin
/// composition: construct the runtime, register all fourteen catalog
/// agents under `EvolutionLoop`, and run.
pub struct UpgradeWorkflow {
    runtime: Arc<crate::squad::runtime::AgentRuntime>,
    squad: Squad,
    config: UpgradeConfig,
}

impl UpgradeWorkflow {
    pub fn new(invoker: Arc<dyn ModelInvoker>, config: UpgradeConfig) -> RuntimeResult<Self> {
        if config.project_path.trim().is_empty() {
            return Err(RuntimeError::ConfigurationError("project_path must not be empty".to_string()));
        }

        let runtime = Arc::new(crate::squad::runtime::AgentRuntime::new(
            config.runtime_config.clone(),
            invoker,
            SharedDocumentContext::new(),
        ));

        let mut squad = Squad::new(Arc::clone(&runtime), Strategy::EvolutionLoop);
        Self::register_catalog(&mut squad);

        Ok(UpgradeWorkflow { runtime, squad, config })
    }

    fn register_catalog(squad: &mut Squad) {
        for name in EXECUTION_CATALOG {
            let agent: Arc<dyn Agent> = Arc::new(ModelBackedAgent::new(*name));
            squad.register_agent(*name, agent);
        }
        squad.set_execution_order(EXECUTION_CATALOG.iter().map(|s| s.to_string()).collect());
    }

    pub fn documents(&self) -> &SharedDocumentContext {
        self.runtime.documents()
    }

    pub fn metrics(&self) -> crate::squad::runtime::MetricsSnapshot {
        self.runtime.metrics_snapshot()
    }

    /// Run the Evolution Loop to completion and, if `output_dir` is
    /// configured, persist the final report and per-agent documents.
    pub async fn execute_evolution_loop(&self, requirements: &str) -> RuntimeResult<EvolutionResult> {
        let task = AgentTask::new("", "upgrade", format!("Requirements:\n{requirements}"))
            .with_description("evolve an existing codebase toward the stated requirements")
            .with_input_data(json!({
                "requirements": requirements,
                "project_path": self.config.project_path,
            }));

        let result = self.squad.execute_squad(task).await?;
        let evolution = match result {
            SquadResult::Evolution(evo) => evo,
            _ => unreachable!("UpgradeWorkflow always runs under EvolutionLoop"),
        };

        if let Some(output_dir) = &self.config.output_dir {
            let metrics = self.runtime.metrics_snapshot();
            report::persist(output_dir, "upgrade", &evolution, self.runtime.documents(), &metrics)
                .map_err(|e| RuntimeError::ConfigurationError(format!("failed to persist report: {e}")))?;
        }

        Ok(evolution)
    }
}
