//! Workflow orchestrators (C6, C7): compose the Persona Registry, Shared
//! Document Context, Model Invoker, Agent Runtime, and Squad Orchestrator
//! into the two supported top-level flows.

pub mod newbuild;
pub mod upgrade;

/// The fourteen agent names the Evolution Loop phase chain references,
/// in the default registration/execution order both workflows use.
pub const EXECUTION_CATALOG: &[&str] = &[
    "RequirementAnalyzer",
    "StaticAnalyzer",
    "CodeAnalysisAgent",
    "BehaviorAnalyzer",
    "ImpactAnalyzer",
    "QualityGate",
    "ExternalResearcher",
    "GapAnalyzer",
    "SystemArchitect",
    "OrchestratorDesigner",
    "PlannerAgent",
    "TaskCreatorAgent",
    "CodeGenerator",
    "TestAgent",
];

/// The current-state analysis agents NewBuild's first iteration must not
/// invoke at all (there is nothing to analyze yet).
pub const CURRENT_STATE_ANALYSIS: &[&str] = &[
    "StaticAnalyzer",
    "CodeAnalysisAgent",
    "BehaviorAnalyzer",
    "ImpactAnalyzer",
    "QualityGate",
];

/// NewBuild's first-iteration order hints (not enforced — `AiDriven` still
/// makes the actual per-step decision, but this is the execution order
/// handed to the squad as a sensible fallback/tie-break order).
pub const NEWBUILD_FIRST_ITERATION_ORDER: &[&str] = &[
    "RequirementAnalyzer",
    "ExternalResearcher",
    "GapAnalyzer",
    "SystemArchitect",
    "OrchestratorDesigner",
    "PlannerAgent",
    "TaskCreatorAgent",
    "CodeGenerator",
    "TestAgent",
];
