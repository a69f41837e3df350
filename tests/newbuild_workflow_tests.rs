use std::sync::Arc;

use agentsquad::squad::model_invoker::test_support::ScriptedModelInvoker;
use agentsquad::squad::model_invoker::ModelInvoker;
use agentsquad::squad::workflows::newbuild::{NewBuildConfig, NewBuildWorkflow, SeedProductConfig};
use agentsquad::squad::workflows::CURRENT_STATE_ANALYSIS;

/// S5 — NewBuild's first iteration skips current-state analysis
/// entirely; those five agents only start getting invoked from iteration
/// 2 onward.
#[tokio::test]
async fn first_iteration_skips_current_state() {
    let invoker: Arc<dyn ModelInvoker> = Arc::new(ScriptedModelInvoker::ok(vec![
        // Iteration 1 (AiDriven over the 9-agent hint order).
        "noop", "noop", "noop", "noop", "noop", "noop", "noop", "noop", "noop",
        // Iteration 2 (standard chain): Requirement + 5-agent fan-out +
        // ExternalResearcher, then GapAnalyzer converges immediately.
        "noop", "noop", "noop", "noop", "noop", "noop", "noop", "{\"gap_score\": 0.01}",
    ]));

    let workflow = NewBuildWorkflow::new(invoker, NewBuildConfig::new(SeedProductConfig::new("demo-service"))).unwrap();
    let result = workflow.create_seed_product().await.unwrap();

    let iteration_one = &result.bundles[0];
    assert_eq!(iteration_one.iteration, 1);
    for name in CURRENT_STATE_ANALYSIS {
        assert!(!iteration_one.outputs.contains_key(*name), "{name} should not run during iteration 1");
    }

    assert!(result.bundles.iter().skip(1).any(|bundle| {
        CURRENT_STATE_ANALYSIS.iter().all(|name| bundle.outputs.contains_key(*name))
    }));

    assert!(result.converged);
    assert_eq!(result.iterations, 2);
}

#[tokio::test]
async fn rejects_blank_seed_name() {
    let invoker: Arc<dyn ModelInvoker> = Arc::new(ScriptedModelInvoker::ok(vec![]));
    let err = NewBuildWorkflow::new(invoker, NewBuildConfig::new(SeedProductConfig::new("   "))).unwrap_err();
    assert!(matches!(err, agentsquad::RuntimeError::ConfigurationError(_)));
}
