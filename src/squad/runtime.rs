//! Agent runtime (C4, part two): the one place persona injection, shared
//! document context, retries, and metrics happen, so every agent gets them
//! uniformly instead of reimplementing them.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::warn;
use tokio::sync::watch;

use super::agent::{Agent, AgentOutput, AgentTask};
use super::config::SquadRuntimeConfig;
use super::document_context::SharedDocumentContext;
use super::error::{RuntimeError, RuntimeResult};
use super::model_invoker::ModelInvoker;
use super::persona;

/// How many historical loops get folded into a built prompt's shared
/// context, summarized. Bounds the budget `RenderForModel` renders instead
/// of dumping the entire run history into every prompt.
const PROMPT_HISTORY_LOOPS: usize = 2;

const METRICS_HISTORY_CAP: usize = 10;

/// One completed agent execution, kept for the rolling metrics history.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub agent_name: String,
    pub task_type: String,
    pub success: bool,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Default)]
struct MetricsInner {
    total_executions: u64,
    successful: u64,
    failed: u64,
    duration_sum_ms: u64,
    active_agents: HashSet<String>,
    history: VecDeque<ExecutionRecord>,
}

/// A point-in-time snapshot of [`AgentRuntime`] execution metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_executions: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub average_duration_ms: f64,
    pub active_agents: Vec<String>,
    pub recent_history: Vec<ExecutionRecord>,
}

/// Executes agents uniformly: builds the persona- and context-aware
/// prompt, calls the model (or the agent's own local processing) with
/// retries, records the result into the shared document context, and
/// tracks metrics.
pub struct AgentRuntime {
    config: SquadRuntimeConfig,
    invoker: Arc<dyn ModelInvoker>,
    documents: SharedDocumentContext,
    metrics: Mutex<MetricsInner>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl AgentRuntime {
    pub fn new(config: SquadRuntimeConfig, invoker: Arc<dyn ModelInvoker>, documents: SharedDocumentContext) -> Self {
        let (cancel_tx, _cancel_rx) = watch::channel(false);
        AgentRuntime {
            config,
            invoker,
            documents,
            metrics: Mutex::new(MetricsInner::default()),
            cancel_tx: Arc::new(cancel_tx),
        }
    }

    /// Build a runtime that shares its cancellation signal with `self`
    /// instead of minting a fresh one. Used by [`Self::execute_parallel`]
    /// so that a user-stop signalled on the parent reaches every in-flight
    /// child agent call too.
    fn with_shared_cancel(
        config: SquadRuntimeConfig,
        invoker: Arc<dyn ModelInvoker>,
        documents: SharedDocumentContext,
        cancel_tx: Arc<watch::Sender<bool>>,
    ) -> Self {
        AgentRuntime {
            config,
            invoker,
            documents,
            metrics: Mutex::new(MetricsInner::default()),
            cancel_tx,
        }
    }

    pub fn config(&self) -> &SquadRuntimeConfig {
        &self.config
    }

    /// Signal a parent cancellation (user stop). Every in-flight and
    /// future `execute_agent`/`execute_parallel` call sharing this
    /// runtime's cancellation signal stops retrying and returns an error;
    /// documents already written to the shared context are left in place.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.subscribe().borrow()
    }

    /// Invoke the model directly with a caller-built prompt, bypassing
    /// persona/context injection. Used by the orchestrator's `AiDriven`
    /// strategy to ask "what should run next" — a planning question, not
    /// an agent task.
    pub async fn invoke_model(&self, prompt: &str) -> RuntimeResult<String> {
        self.invoker.invoke(prompt, self.config.max_tokens, self.config.temperature).await
    }

    pub fn documents(&self) -> &SharedDocumentContext {
        &self.documents
    }

    fn build_prompt_with_context(&self, agent_name: &str, task_prompt: &str) -> String {
        let persona_prefix = if self.config.enable_personas {
            persona::get(agent_name).map(|p| p.render()).unwrap_or_default()
        } else {
            String::new()
        };

        let context_value = self.documents.context_for_model(true, PROMPT_HISTORY_LOOPS);
        let context_str = serde_json::to_string_pretty(&context_value)
            .unwrap_or_else(|_| context_value.to_string());

        format!(
            "{persona_prefix}\n### Shared Document Context:\n{context_str}\n\n### Task:\n{task_prompt}"
        )
    }

    /// Execute a single agent's task, retrying on failure up to
    /// `config.retry_count` times with `config.retry_delay_seconds`
    /// between attempts. On success the output is recorded into the
    /// shared document context under the task's `task_type`.
    pub async fn execute_agent(&self, agent: &dyn Agent, mut task: AgentTask) -> RuntimeResult<AgentOutput> {
        let agent_name = agent.name().to_string();
        {
            let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
            metrics.active_agents.insert(agent_name.clone());
        }

        let started_at = Utc::now();
        let start = Instant::now();
        let mut last_err: Option<RuntimeError> = None;
        let mut cancel_rx = self.cancel_tx.subscribe();

        let outcome = loop {
            if *cancel_rx.borrow() {
                last_err = Some(RuntimeError::AgentFailure {
                    agent: agent_name.clone(),
                    reason: "cancelled by parent before this attempt started".to_string(),
                });
                break Err(());
            }

            let attempt_result = tokio::select! {
                biased;
                _ = cancel_rx.changed() => Err(RuntimeError::AgentFailure {
                    agent: agent_name.clone(),
                    reason: "cancelled by parent".to_string(),
                }),
                timed = tokio::time::timeout(self.config.timeout(), self.attempt_once(agent, &task)) => {
                    match timed {
                        Ok(inner) => inner,
                        Err(_elapsed) => Err(RuntimeError::DeadlineExceeded {
                            agent: agent_name.clone(),
                            seconds: self.config.timeout_seconds,
                        }),
                    }
                }
            };

            match attempt_result {
                Ok(content) => break Ok(content),
                Err(e) => {
                    let cancelled = matches!(&e, RuntimeError::AgentFailure { reason, .. } if reason.starts_with("cancelled"));
                    if cancelled || task.retry_count >= self.config.retry_count {
                        last_err = Some(e);
                        break Err(());
                    }
                    warn!(
                        "agent '{}' attempt {} failed, retrying: {}",
                        agent_name, task.retry_count, e
                    );
                    task.retry_count += 1;
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let success = outcome.is_ok();

        {
            let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
            metrics.active_agents.remove(&agent_name);
            metrics.total_executions += 1;
            metrics.duration_sum_ms += duration_ms;
            if success {
                metrics.successful += 1;
            } else {
                metrics.failed += 1;
            }
            if metrics.history.len() == METRICS_HISTORY_CAP {
                metrics.history.pop_front();
            }
            metrics.history.push_back(ExecutionRecord {
                agent_name: agent_name.clone(),
                task_type: task.task_type.clone(),
                success,
                duration_ms,
                started_at,
            });
        }

        match outcome {
            Ok(content) => {
                if self.config.share_all_documents {
                    self.documents.add(&agent_name, &task.task_type, content.clone());
                }
                Ok(AgentOutput {
                    agent_name,
                    task_type: task.task_type,
                    content,
                    duration_ms,
                })
            }
            Err(()) => Err(last_err.unwrap_or_else(|| RuntimeError::AgentFailure {
                agent: agent_name,
                reason: "exhausted retries".to_string(),
            })),
        }
    }

    async fn attempt_once(&self, agent: &dyn Agent, task: &AgentTask) -> RuntimeResult<serde_json::Value> {
        if task.requires_ai {
            let prompt = self.build_prompt_with_context(&task.agent_name, &task.prompt);
            let text = self
                .invoker
                .invoke(&prompt, self.config.max_tokens, self.config.temperature)
                .await?;
            // Agents that report structured fields (GapAnalyzer's
            // `gap_score` chief among them) are expected to answer in
            // JSON; fall back to the raw text for agents whose output is
            // genuinely free-form prose.
            Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
        } else {
            let context = self.documents.context_for_model(true, PROMPT_HISTORY_LOOPS);
            agent.call(task, &context).await
        }
    }

    /// Run every `(agent, task)` pair concurrently, bounded to
    /// `config.max_parallel_agents` in flight at once, returning results in
    /// the same order the pairs were given. A failing agent's error is
    /// captured in its slot rather than aborting the others (mirrors
    /// gather-with-exceptions-captured, not fail-fast).
    pub async fn execute_parallel(
        &self,
        agents_and_tasks: Vec<(Arc<dyn Agent>, AgentTask)>,
    ) -> Vec<RuntimeResult<AgentOutput>> {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_parallel_agents.max(1)));
        let mut handles = Vec::with_capacity(agents_and_tasks.len());

        for (agent, task) in agents_and_tasks {
            let semaphore = Arc::clone(&semaphore);
            let agent = Arc::clone(&agent);
            let config = self.config.clone();
            let invoker = Arc::clone(&self.invoker);
            let documents = self.documents.clone();
            let cancel_tx = Arc::clone(&self.cancel_tx);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let runtime = AgentRuntime::with_shared_cancel(config, invoker, documents, cancel_tx);
                runtime.execute_agent(agent.as_ref(), task).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_err) => results.push(Err(RuntimeError::AgentFailure {
                    agent: "unknown".to_string(),
                    reason: format!("task panicked: {join_err}"),
                })),
            }
        }
        results
    }

    /// A snapshot of execution metrics: totals, success rate, average
    /// duration, currently active agents, and the last ten executions.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let metrics = self.metrics.lock().expect("metrics lock poisoned");
        let success_rate = if metrics.total_executions > 0 {
            metrics.successful as f64 / metrics.total_executions as f64
        } else {
            0.0
        };
        let average_duration_ms = if metrics.total_executions > 0 {
            metrics.duration_sum_ms as f64 / metrics.total_executions as f64
        } else {
            0.0
        };
        MetricsSnapshot {
            total_executions: metrics.total_executions,
            successful: metrics.successful,
            failed: metrics.failed,
            success_rate,
            average_duration_ms,
            active_agents: metrics.active_agents.iter().cloned().collect(),
            recent_history: metrics.history.iter().cloned().collect(),
        }
    }
}
