//! Squad Orchestrator (C5): drives a registered set of agents under a
//! chosen strategy, including the gap-driven Evolution Loop.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use super::agent::{Agent, AgentOutput, AgentTask};
use super::error::RuntimeResult;
use super::runtime::AgentRuntime;

/// The five execution strategies a [`Squad`] can run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Parallel,
    Hybrid,
    AiDriven,
    EvolutionLoop,
}

/// How `Hybrid` splits its registered agents. The spec requires the
/// workflow to declare these explicitly rather than have the orchestrator
/// infer them; this default mirrors the one concrete Hybrid split observed
/// in the reference implementation.
#[derive(Debug, Clone)]
pub struct HybridSubsets {
    pub parallel_phase: Vec<String>,
    pub sequential_phase: Vec<String>,
}

impl Default for HybridSubsets {
    fn default() -> Self {
        HybridSubsets {
            parallel_phase: vec![
                "RequirementAnalyzer".to_string(),
                "StaticAnalyzer".to_string(),
                "CodeAnalysisAgent".to_string(),
            ],
            sequential_phase: vec![
                "PlannerAgent".to_string(),
                "TaskCreatorAgent".to_string(),
                "CodeGenerator".to_string(),
            ],
        }
    }
}

const CURRENT_STATE_FAN_OUT: &[&str] = &[
    "StaticAnalyzer",
    "CodeAnalysisAgent",
    "BehaviorAnalyzer",
    "ImpactAnalyzer",
    "QualityGate",
];

const IMPROVEMENT_CHAIN: &[&str] = &[
    "SystemArchitect",
    "OrchestratorDesigner",
    "PlannerAgent",
    "TaskCreatorAgent",
    "CodeGenerator",
    "TestAgent",
];

/// One completed Evolution Loop iteration: its number, the gap observed at
/// the end of it, and every agent output produced during it.
#[derive(Debug, Clone)]
pub struct IterationBundle {
    pub iteration: u32,
    pub gap_score: f64,
    pub outputs: HashMap<String, AgentOutput>,
}

/// The outcome of running `EvolutionLoop`.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    pub iterations: u32,
    pub converged: bool,
    pub final_gap_score: f64,
    pub bundles: Vec<IterationBundle>,
}

/// The outcome of running `Sequential`, `Parallel`, `Hybrid`, or
/// `AiDriven`.
pub type AgentResultMap = HashMap<String, RuntimeResult<AgentOutput>>;

/// The overall result of [`Squad::execute_squad`].
#[derive(Debug, Clone)]
pub enum SquadResult {
    Agents(AgentResultMap),
    Evolution(EvolutionResult),
}

#[derive(Debug, Deserialize)]
struct AiDrivenDecision {
    next_agents: Vec<String>,
    execution_type: String,
}

/// Drives a registered set of agents under one [`Strategy`].
pub struct Squad {
    runtime: Arc<AgentRuntime>,
    agents: HashMap<String, Arc<dyn Agent>>,
    execution_order: Vec<String>,
    strategy: Strategy,
    hybrid_subsets: HybridSubsets,
    max_iterations: u32,
    convergence_threshold: f64,
}

impl Squad {
    pub fn new(runtime: Arc<AgentRuntime>, strategy: Strategy) -> Self {
        let max_iterations = runtime.config().max_evolution_iterations;
        let convergence_threshold = runtime.config().convergence_threshold;
        Squad {
            runtime,
            agents: HashMap::new(),
            execution_order: Vec::new(),
            strategy,
            hybrid_subsets: HybridSubsets::default(),
            max_iterations,
            convergence_threshold,
        }
    }

    pub fn with_hybrid_subsets(mut self, subsets: HybridSubsets) -> Self {
        self.hybrid_subsets = subsets;
        self
    }

    pub fn runtime(&self) -> &AgentRuntime {
        &self.runtime
    }

    /// Signal a parent cancellation (user stop) to every agent call this
    /// squad dispatches, in flight or still to come.
    pub fn cancel(&self) {
        self.runtime.cancel();
    }

    /// Register an agent callable under `name`. The persona, if any, is
    /// resolved separately by the runtime's persona registry at dispatch
    /// time — registration here only wires up the callable.
    pub fn register_agent(&mut self, name: impl Into<String>, agent: Arc<dyn Agent>) {
        let name = name.into();
        if !self.agents.contains_key(&name) {
            self.execution_order.push(name.clone());
        }
        self.agents.insert(name, agent);
    }

    pub fn set_execution_order(&mut self, order: Vec<String>) {
        self.execution_order = order;
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    fn registered_order(&self) -> Vec<String> {
        self.execution_order
            .iter()
            .filter(|n| self.agents.contains_key(*n))
            .cloned()
            .collect()
    }

    fn task_for(&self, initial: &AgentTask, agent_name: &str) -> AgentTask {
        let mut task = initial.clone();
        task.agent_name = agent_name.to_string();
        task.retry_count = 0;
        task
    }

    /// Run the squad under its configured strategy.
    pub async fn execute_squad(&self, initial_task: AgentTask) -> RuntimeResult<SquadResult> {
        match self.strategy {
            Strategy::Sequential => Ok(SquadResult::Agents(self.execute_sequential(&initial_task, &self.registered_order()).await)),
            Strategy::Parallel => Ok(SquadResult::Agents(self.execute_parallel_named(&initial_task, &self.registered_order()).await)),
            Strategy::Hybrid => Ok(SquadResult::Agents(self.execute_hybrid(&initial_task).await)),
            Strategy::AiDriven => Ok(SquadResult::Agents(self.execute_ai_driven(&initial_task).await?)),
            Strategy::EvolutionLoop => Ok(SquadResult::Evolution(self.execute_evolution_loop(&initial_task, 0).await?)),
        }
    }

    /// Run the Evolution Loop starting its iteration counter at
    /// `start_iteration` instead of zero. The NewBuild workflow uses this
    /// to hand off from its special first iteration (run separately, under
    /// `AiDriven`) into the standard phase chain for iteration 2 onward,
    /// without recounting iteration 1.
    pub async fn execute_evolution_loop_from(&self, initial_task: &AgentTask, start_iteration: u32) -> RuntimeResult<EvolutionResult> {
        self.execute_evolution_loop(initial_task, start_iteration).await
    }

    async fn execute_sequential(&self, initial: &AgentTask, names: &[String]) -> AgentResultMap {
        let mut results = AgentResultMap::new();
        for name in names {
            let agent = self.agents.get(name).expect("filtered to registered names");
            let task = self.task_for(initial, name);
            let result = self.runtime.execute_agent(agent.as_ref(), task).await;
            results.insert(name.clone(), result);
        }
        results
    }

    async fn execute_parallel_named(&self, initial: &AgentTask, names: &[String]) -> AgentResultMap {
        let pairs: Vec<(Arc<dyn Agent>, AgentTask)> = names
            .iter()
            .map(|name| (Arc::clone(self.agents.get(name).expect("filtered to registered names")), self.task_for(initial, name)))
            .collect();
        let results = self.runtime.execute_parallel(pairs).await;
        names.iter().cloned().zip(results).collect()
    }

    async fn execute_hybrid(&self, initial: &AgentTask) -> AgentResultMap {
        let parallel_names: Vec<String> = self
            .hybrid_subsets
            .parallel_phase
            .iter()
            .filter(|n| self.agents.contains_key(*n))
            .cloned()
            .collect();
        let sequential_names: Vec<String> = self
            .hybrid_subsets
            .sequential_phase
            .iter()
            .filter(|n| self.agents.contains_key(*n))
            .cloned()
            .collect();

        let mut results = self.execute_parallel_named(initial, &parallel_names).await;
        let seq_results = self.execute_sequential(initial, &sequential_names).await;
        results.extend(seq_results);
        results
    }

    async fn execute_ai_driven(&self, initial: &AgentTask) -> RuntimeResult<AgentResultMap> {
        let mut remaining = self.registered_order();
        let mut results = AgentResultMap::new();

        while !remaining.is_empty() {
            let decision = self.decide_next_agents(initial, &remaining).await;
            let (chosen, parallel) = decision;

            let chosen: Vec<String> = chosen.into_iter().filter(|n| remaining.contains(n)).collect();
            let chosen = if chosen.is_empty() {
                vec![remaining[0].clone()]
            } else {
                chosen
            };

            let batch_results = if parallel {
                self.execute_parallel_named(initial, &chosen).await
            } else {
                self.execute_sequential(initial, &chosen).await
            };

            for name in &chosen {
                remaining.retain(|n| n != name);
            }
            results.extend(batch_results);
        }

        Ok(results)
    }

    /// Ask the model invoker which agent(s) to run next. Returns the
    /// chosen names and whether to run them in parallel. Falls back
    /// deterministically to "first remaining agent, sequential" on any
    /// decode failure instead of masking the error silently.
    async fn decide_next_agents(&self, initial: &AgentTask, remaining: &[String]) -> (Vec<String>, bool) {
        let prompt = format!(
            "Given the task '{}' and remaining agents {:?}, decide which agent(s) to run next. \
             Respond with JSON: {{\"next_agents\": [\"name\", ...], \"execution_type\": \"parallel\"|\"sequential\"}}.",
            initial.prompt, remaining
        );

        let response = self
            .runtime
            .invoke_model(&prompt)
            .await
            .unwrap_or_default();

        match parse_ai_decision(&response) {
            Some(decision) => (decision.next_agents, decision.execution_type == "parallel"),
            None => {
                warn!(
                    "AI-driven decision could not be parsed from model response; falling back to next remaining agent, sequential"
                );
                (vec![remaining[0].clone()], false)
            }
        }
    }

    async fn execute_evolution_loop(&self, initial: &AgentTask, start_iteration: u32) -> RuntimeResult<EvolutionResult> {
        let mut iteration = start_iteration;
        let mut gap: f64 = 1.0;
        let mut bundles = Vec::new();

        loop {
            iteration += 1;
            info!("evolution loop iteration {} starting", iteration);
            let mut outputs = HashMap::new();

            if let Some(agent) = self.agents.get("RequirementAnalyzer") {
                let task = self.task_for(initial, "RequirementAnalyzer");
                if let Ok(out) = self.runtime.execute_agent(agent.as_ref(), task).await {
                    outputs.insert("RequirementAnalyzer".to_string(), out);
                }
            }

            let fan_out_names: Vec<String> = CURRENT_STATE_FAN_OUT
                .iter()
                .filter(|n| self.agents.contains_key(**n))
                .map(|s| s.to_string())
                .collect();
            if !fan_out_names.is_empty() {
                for (name, result) in self.execute_parallel_named(initial, &fan_out_names).await {
                    if let Ok(out) = result {
                        outputs.insert(name, out);
                    }
                }
            }

            if let Some(agent) = self.agents.get("ExternalResearcher") {
                let task = self.task_for(initial, "ExternalResearcher");
                if let Ok(out) = self.runtime.execute_agent(agent.as_ref(), task).await {
                    outputs.insert("ExternalResearcher".to_string(), out);
                }
            }

            if let Some(agent) = self.agents.get("GapAnalyzer") {
                let task = self.task_for(initial, "GapAnalyzer");
                if let Ok(out) = self.runtime.execute_agent(agent.as_ref(), task).await {
                    if let Some(reported) = out.content.get("gap_score").and_then(Value::as_f64) {
                        gap = reported.clamp(0.0, 1.0);
                    }
                    outputs.insert("GapAnalyzer".to_string(), out);
                }
            }

            let converged = gap <= (1.0 - self.convergence_threshold);

            if !converged {
                for name in IMPROVEMENT_CHAIN {
                    if let Some(agent) = self.agents.get(*name) {
                        let task = self.task_for(initial, name);
                        if let Ok(out) = self.runtime.execute_agent(agent.as_ref(), task).await {
                            outputs.insert((*name).to_string(), out);
                        }
                    }
                }
            }

            bundles.push(IterationBundle { iteration, gap_score: gap, outputs });

            // The terminal iteration's documents stay in the current loop
            // rather than being archived, so a report persisted right
            // after this call still sees one file per agent for the loop
            // that actually converged or exhausted the budget.
            if converged {
                return Ok(EvolutionResult { iterations: iteration, converged: true, final_gap_score: gap, bundles });
            }
            if iteration >= self.max_iterations {
                return Ok(EvolutionResult { iterations: iteration, converged: false, final_gap_score: gap, bundles });
            }

            self.runtime.documents().start_new_loop();
        }
    }
}

fn parse_ai_decision(response: &str) -> Option<AiDrivenDecision> {
    serde_json::from_str::<AiDrivenDecision>(response).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squad::agent::ModelBackedAgent;
    use crate::squad::config::SquadRuntimeConfig;
    use crate::squad::document_context::SharedDocumentContext;
    use crate::squad::model_invoker::test_support::ScriptedModelInvoker;

    fn squad_with(strategy: Strategy, invoker: ScriptedModelInvoker) -> Squad {
        let runtime = Arc::new(AgentRuntime::new(
            SquadRuntimeConfig { retry_delay_seconds: 0, ..SquadRuntimeConfig::default() },
            Arc::new(invoker),
            SharedDocumentContext::new(),
        ));
        Squad::new(runtime, strategy)
    }

    #[tokio::test]
    async fn sequential_runs_registered_order() {
        let mut squad = squad_with(Strategy::Sequential, ScriptedModelInvoker::ok(vec!["a", "b"]));
        squad.register_agent("RequirementAnalyzer", Arc::new(ModelBackedAgent::new("RequirementAnalyzer")));
        squad.register_agent("StaticAnalyzer", Arc::new(ModelBackedAgent::new("StaticAnalyzer")));

        let task = AgentTask::new("", "upgrade", "do the thing");
        let result = squad.execute_squad(task).await.unwrap();
        match result {
            SquadResult::Agents(map) => assert_eq!(map.len(), 2),
            _ => panic!("expected agent map"),
        }
    }

    #[tokio::test]
    async fn evolution_loop_converges_on_second_iteration() {
        // GapAnalyzer is the only agent whose output matters: 0.8 then 0.02.
        let invoker = ScriptedModelInvoker::ok(vec![
            "{\"gap_score\": 0.8}",
            "{\"gap_score\": 0.02}",
        ]);
        let mut squad = squad_with(Strategy::EvolutionLoop, invoker);
        squad.register_agent("GapAnalyzer", Arc::new(ModelBackedAgent::new("GapAnalyzer")));

        let task = AgentTask::new("", "upgrade", "evolve");
        let result = squad.execute_squad(task).await.unwrap();
        match result {
            SquadResult::Evolution(evo) => {
                assert_eq!(evo.iterations, 2);
                assert!(evo.converged);
                assert_eq!(evo.final_gap_score, 0.02);
            }
            _ => panic!("expected evolution result"),
        }
    }

    #[tokio::test]
    async fn evolution_loop_exhausts_without_convergence() {
        let invoker = ScriptedModelInvoker::ok(vec!["{\"gap_score\": 0.5}", "{\"gap_score\": 0.5}", "{\"gap_score\": 0.5}"]);
        let runtime = Arc::new(AgentRuntime::new(
            SquadRuntimeConfig {
                retry_delay_seconds: 0,
                max_evolution_iterations: 3,
                convergence_threshold: 0.95,
                ..SquadRuntimeConfig::default()
            },
            Arc::new(invoker),
            SharedDocumentContext::new(),
        ));
        let mut squad = Squad::new(runtime, Strategy::EvolutionLoop);
        squad.register_agent("GapAnalyzer", Arc::new(ModelBackedAgent::new("GapAnalyzer")));

        let task = AgentTask::new("", "upgrade", "evolve");
        let result = squad.execute_squad(task).await.unwrap();
        match result {
            SquadResult::Evolution(evo) => {
                assert_eq!(evo.iterations, 3);
                assert!(!evo.converged);
                assert_eq!(evo.final_gap_score, 0.5);
            }
            _ => panic!("expected evolution result"),
        }
    }

    #[tokio::test]
    async fn evolution_loop_without_gap_analyzer_always_exhausts() {
        let runtime = Arc::new(AgentRuntime::new(
            SquadRuntimeConfig {
                retry_delay_seconds: 0,
                max_evolution_iterations: 2,
                ..SquadRuntimeConfig::default()
            },
            Arc::new(ScriptedModelInvoker::ok(vec![])),
            SharedDocumentContext::new(),
        ));
        let squad = Squad::new(runtime, Strategy::EvolutionLoop);
        let task = AgentTask::new("", "upgrade", "evolve");
        let result = squad.execute_squad(task).await.unwrap();
        match result {
            SquadResult::Evolution(evo) => {
                assert_eq!(evo.iterations, 2);
                assert!(!evo.converged);
                assert_eq!(evo.final_gap_score, 1.0);
            }
            _ => panic!("expected evolution result"),
        }
    }
}
