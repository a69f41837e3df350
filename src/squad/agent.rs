//! Agent trait and task/output types (C4, part one — execution plumbing
//! lives in [`crate::squad::runtime`]).
//!
//! An [`Agent`] is deliberately thin: it knows how to do its own
//! non-model-backed processing (`process`), if it has any. Everything that
//! is the same for every agent — persona prefixing, shared-context
//! injection, the actual model call, retries, metrics — lives once in
//! [`crate::squad::runtime::AgentRuntime`] instead of being duplicated
//! across fourteen implementations.

use async_trait::async_trait;
use serde_json::Value;

use super::error::{RuntimeError, RuntimeResult};

/// A unit of work dispatched to a single agent.
#[derive(Debug, Clone)]
pub struct AgentTask {
    pub agent_name: String,
    pub task_type: String,
    pub description: String,
    pub input_data: Value,
    pub prompt: String,
    /// Whether this task needs a model call at all. Some catalog agents
    /// (e.g. a test runner) can answer from local computation alone.
    pub requires_ai: bool,
    pub retry_count: u32,
}

impl AgentTask {
    pub fn new(agent_name: impl Into<String>, task_type: impl Into<String>, prompt: impl Into<String>) -> Self {
        AgentTask {
            agent_name: agent_name.into(),
            task_type: task_type.into(),
            description: String::new(),
            input_data: Value::Null,
            prompt: prompt.into(),
            requires_ai: true,
            retry_count: 0,
        }
    }

    pub fn with_input_data(mut self, input_data: Value) -> Self {
        self.input_data = input_data;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn without_ai(mut self) -> Self {
        self.requires_ai = false;
        self
    }
}

/// What an agent produced for a single task.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub agent_name: String,
    pub task_type: String,
    pub content: Value,
    pub duration_ms: u64,
}

/// The one call shape every agent implements, whether it is backed by a
/// model or by local computation. `context` is the shared document
/// context rendered to JSON (`SharedDocumentContext::context_for_model`);
/// agents that don't need it (unary legacy callables) simply ignore the
/// argument rather than the runtime needing two call conventions.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Domain-specific, non-model-backed processing. Only invoked for
    /// tasks with `requires_ai == false`; the default implementation
    /// refuses, since most catalog agents have no such path and are only
    /// ever dispatched through a model call.
    async fn call(&self, task: &AgentTask, context: &Value) -> RuntimeResult<Value> {
        let _ = context;
        Err(RuntimeError::ConfigurationError(format!(
            "agent '{}' has no non-AI call path but was given a task with requires_ai = false",
            self.name()
        )))
    }
}

/// Adapts a plain async closure into an [`Agent`] for agents whose entire
/// behavior is local computation (no model call), e.g. a test runner that
/// shells out to a real test suite instead of asking a model to imagine
/// one. The closure ignores the shared-context argument, unifying legacy
/// unary callables with the two-argument call convention.
pub struct UnaryAgent<F> {
    name: String,
    call_fn: F,
}

impl<F> UnaryAgent<F> {
    pub fn new(name: impl Into<String>, call_fn: F) -> Self {
        UnaryAgent { name: name.into(), call_fn }
    }
}

#[async_trait]
impl<F, Fut> Agent for UnaryAgent<F>
where
    F: Fn(AgentTask) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = RuntimeResult<Value>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, task: &AgentTask, _context: &Value) -> RuntimeResult<Value> {
        (self.call_fn)(task.clone()).await
    }
}

/// An [`Agent`] whose behavior is exactly "send this prompt to the model,
/// no local processing." Used for every catalog agent whose persona is its
/// whole personality and whose substance comes entirely from the model.
pub struct ModelBackedAgent {
    name: String,
}

impl ModelBackedAgent {
    pub fn new(name: impl Into<String>) -> Self {
        ModelBackedAgent { name: name.into() }
    }
}

#[async_trait]
impl Agent for ModelBackedAgent {
    fn name(&self) -> &str {
        &self.name
    }
}
