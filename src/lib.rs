// src/lib.rs

pub mod squad;

pub use squad::agent::{Agent, AgentOutput, AgentTask};
pub use squad::document_context::SharedDocumentContext;
pub use squad::error::{RuntimeError, RuntimeResult};
pub use squad::orchestrator::{Squad, Strategy};
pub use squad::runtime::AgentRuntime;
