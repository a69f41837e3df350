//! The gap-driven multi-agent orchestration runtime.
//!
//! Dependency order, leaves first: [`persona`] and [`document_context`]
//! have no internal dependencies; [`model_invoker`] renders context from
//! [`document_context`]; [`agent`] and [`runtime`] depend on all three;
//! [`orchestrator`] depends on [`runtime`]; [`workflows`] composes
//! [`orchestrator`] into the Upgrade and NewBuild flows.

pub mod agent;
pub mod config;
pub mod document_context;
pub mod error;
pub mod model_invoker;
pub mod orchestrator;
pub mod persona;
pub mod report;
pub mod runtime;
pub mod workflows;
