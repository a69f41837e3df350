use std::sync::Arc;
use std::time::Duration;

use agentsquad::squad::agent::{Agent, AgentOutput, AgentTask, UnaryAgent};
use agentsquad::squad::config::SquadRuntimeConfig;
use agentsquad::squad::document_context::SharedDocumentContext;
use agentsquad::squad::error::{RuntimeError, RuntimeResult};
use agentsquad::squad::model_invoker::test_support::ScriptedModelInvoker;
use agentsquad::squad::model_invoker::ModelInvoker;
use agentsquad::AgentRuntime;

fn runtime_with(invoker: ScriptedModelInvoker) -> AgentRuntime {
    AgentRuntime::new(
        SquadRuntimeConfig { retry_delay_seconds: 0, ..SquadRuntimeConfig::default() },
        Arc::new(invoker) as Arc<dyn ModelInvoker>,
        SharedDocumentContext::new(),
    )
}

/// S3 — parallel fan-out ordering: result indexes must match the input
/// order, regardless of which agent's task actually finishes first.
#[tokio::test]
async fn parallel_preserves_input_order() {
    let rt = runtime_with(ScriptedModelInvoker::ok(vec!["a", "b", "c"]));

    let fast_stub = |name: &'static str| -> Arc<dyn Agent> {
        Arc::new(UnaryAgent::new(name, |task: AgentTask| async move {
            Ok(serde_json::json!({ "from": task.agent_name }))
        }))
    };
    let slow_b: Arc<dyn Agent> = Arc::new(UnaryAgent::new("B", |task: AgentTask| async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok(serde_json::json!({ "from": task.agent_name }))
    }));

    let agents_and_tasks: Vec<(Arc<dyn Agent>, AgentTask)> = vec![
        (fast_stub("A"), AgentTask::new("A", "t", "p").without_ai()),
        (slow_b, AgentTask::new("B", "t", "p").without_ai()),
        (fast_stub("C"), AgentTask::new("C", "t", "p").without_ai()),
    ];

    let results = rt.execute_parallel(agents_and_tasks).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().agent_name, "A");
    assert_eq!(results[1].as_ref().unwrap().agent_name, "B");
    assert_eq!(results[2].as_ref().unwrap().agent_name, "C");
}

/// S4 — retry then succeed: agent X fails its first attempt, succeeds on
/// its second, with RetryCount = 3.
#[tokio::test]
async fn retry_then_succeed() {
    let attempts = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let attempts_clone = Arc::clone(&attempts);

    let flaky = UnaryAgent::new("X", move |_task: AgentTask| {
        let attempts = Arc::clone(&attempts_clone);
        async move {
            let n = attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n == 0 {
                Err(RuntimeError::AgentFailure { agent: "X".to_string(), reason: "first attempt fails".to_string() })
            } else {
                Ok(serde_json::json!({ "status": "ok" }))
            }
        }
    });

    let config = SquadRuntimeConfig { retry_delay_seconds: 0, retry_count: 3, ..SquadRuntimeConfig::default() };
    let rt = AgentRuntime::new(config, Arc::new(ScriptedModelInvoker::ok(vec![])) as Arc<dyn ModelInvoker>, SharedDocumentContext::new());

    let task = AgentTask::new("X", "t", "p").without_ai();
    let output: RuntimeResult<AgentOutput> = rt.execute_agent(&flaky, task).await;

    assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
    let output = output.unwrap();
    assert_eq!(output.content, serde_json::json!({ "status": "ok" }));

    let snapshot = rt.metrics_snapshot();
    assert_eq!(snapshot.total_executions, 1);
    assert_eq!(snapshot.successful, 1);
    assert_eq!(snapshot.failed, 0);
}
