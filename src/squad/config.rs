//! Ambient runtime configuration.
//!
//! `SquadRuntimeConfig` is a plain struct with a `Default` impl, the same
//! shape the teacher crate uses for its own settings: no TOML/YAML parsing
//! dependency is introduced, values are read from the environment where the
//! original draws them from environment variables, and everything else
//! falls back to the defaults below.

use std::env;
use std::time::Duration;

/// Runtime-wide settings shared by every workflow and agent invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SquadRuntimeConfig {
    pub region: String,
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_parallel_agents: usize,
    pub timeout_seconds: u64,
    pub retry_count: u32,
    pub retry_delay_seconds: u64,
    pub max_evolution_iterations: u32,
    pub convergence_threshold: f64,
    pub gap_tolerance: f64,
    pub enable_personas: bool,
    pub share_all_documents: bool,
}

impl Default for SquadRuntimeConfig {
    fn default() -> Self {
        SquadRuntimeConfig {
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            model_id: env::var("BEDROCK_MODEL_ID")
                .unwrap_or_else(|_| "anthropic.claude-3-5-sonnet-20241022-v2:0".to_string()),
            max_tokens: 4096,
            temperature: 0.7,
            max_parallel_agents: 5,
            timeout_seconds: 300,
            retry_count: 3,
            retry_delay_seconds: 5,
            max_evolution_iterations: 10,
            convergence_threshold: 0.95,
            gap_tolerance: 0.01,
            enable_personas: true,
            share_all_documents: true,
        }
    }
}

impl SquadRuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    /// The NewBuild workflow nudges temperature up slightly relative to the
    /// shared default, favoring creativity over the Upgrade workflow's
    /// stability-first stance.
    pub fn for_new_build(mut self) -> Self {
        self.temperature = 0.8;
        self
    }
}
