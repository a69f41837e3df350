use std::sync::Arc;

use agentsquad::squad::agent::{AgentTask, ModelBackedAgent};
use agentsquad::squad::config::SquadRuntimeConfig;
use agentsquad::squad::document_context::SharedDocumentContext;
use agentsquad::squad::model_invoker::test_support::ScriptedModelInvoker;
use agentsquad::squad::model_invoker::ModelInvoker;
use agentsquad::squad::orchestrator::{EvolutionResult, Squad, SquadResult};
use agentsquad::{AgentRuntime, Strategy};

fn squad_with(invoker: ScriptedModelInvoker, config: SquadRuntimeConfig) -> Squad {
    let runtime = Arc::new(AgentRuntime::new(config, Arc::new(invoker) as Arc<dyn ModelInvoker>, SharedDocumentContext::new()));
    Squad::new(runtime, Strategy::EvolutionLoop)
}

fn evolution_of(result: SquadResult) -> EvolutionResult {
    match result {
        SquadResult::Evolution(evo) => evo,
        _ => panic!("expected an Evolution result"),
    }
}

/// S1 — converges on iteration 2: GapAnalyzer reports 0.8 then 0.02,
/// threshold 0.95 means "stop once gap <= 0.05".
#[tokio::test]
async fn converges_on_iteration_two() {
    let invoker = ScriptedModelInvoker::ok(vec!["{\"gap_score\": 0.8}", "{\"gap_score\": 0.02}"]);
    let config = SquadRuntimeConfig {
        retry_delay_seconds: 0,
        convergence_threshold: 0.95,
        max_evolution_iterations: 10,
        ..SquadRuntimeConfig::default()
    };
    let mut squad = squad_with(invoker, config);
    squad.register_agent("GapAnalyzer", Arc::new(ModelBackedAgent::new("GapAnalyzer")));

    let result = evolution_of(squad.execute_squad(AgentTask::new("", "upgrade", "evolve")).await.unwrap());

    assert_eq!(result.iterations, 2);
    assert!(result.converged);
    assert_eq!(result.final_gap_score, 0.02);
}

/// S2 — exhausts without convergence: GapAnalyzer always reports 0.5,
/// which never clears the 0.05 bar, so the loop runs out its iteration
/// budget instead.
#[tokio::test]
async fn exhausts_without_convergence() {
    let invoker = ScriptedModelInvoker::ok(vec!["{\"gap_score\": 0.5}", "{\"gap_score\": 0.5}", "{\"gap_score\": 0.5}"]);
    let config = SquadRuntimeConfig {
        retry_delay_seconds: 0,
        convergence_threshold: 0.95,
        max_evolution_iterations: 3,
        ..SquadRuntimeConfig::default()
    };
    let mut squad = squad_with(invoker, config);
    squad.register_agent("GapAnalyzer", Arc::new(ModelBackedAgent::new("GapAnalyzer")));

    let result = evolution_of(squad.execute_squad(AgentTask::new("", "upgrade", "evolve")).await.unwrap());

    assert_eq!(result.iterations, 3);
    assert!(!result.converged);
    assert_eq!(result.final_gap_score, 0.5);
}

/// Invariant 5 restated for a threshold of exactly 1.0: convergence
/// requires gap == 0 exactly, so a loop that never sees a zero gap must
/// run to exhaustion.
#[tokio::test]
async fn threshold_of_one_requires_exact_zero_gap() {
    let invoker = ScriptedModelInvoker::ok(vec!["{\"gap_score\": 0.001}", "{\"gap_score\": 0.001}"]);
    let config = SquadRuntimeConfig {
        retry_delay_seconds: 0,
        convergence_threshold: 1.0,
        max_evolution_iterations: 2,
        ..SquadRuntimeConfig::default()
    };
    let mut squad = squad_with(invoker, config);
    squad.register_agent("GapAnalyzer", Arc::new(ModelBackedAgent::new("GapAnalyzer")));

    let result = evolution_of(squad.execute_squad(AgentTask::new("", "upgrade", "evolve")).await.unwrap());

    assert_eq!(result.iterations, 2);
    assert!(!result.converged);
}
