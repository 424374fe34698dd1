//! Agent configuration, built the way `ReactConfig` is in
//! `neuron-op-react`: every knob has a sane default and a builder
//! method, and `build()` is infallible.

use wick_autonomy::{AutonomyBudget, AutonomyLevel};

/// Tunables for an [`crate::Agent`]. Every field has a documented
/// default; construct one with [`AgentConfigBuilder`] rather than the
/// struct literal so future fields don't break callers.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Hard cap on tool-call loop iterations within a single `run`.
    pub max_tool_iterations: u32,
    /// How many recent messages context compaction keeps verbatim;
    /// also the keep-last window passed to `wick_context::compact`.
    pub max_history_messages: usize,
    /// Tool results longer than this (in chars) are truncated before
    /// being stored as a `tool_result` event.
    pub max_result_length: usize,
    /// Token-estimate threshold above which compaction kicks in.
    pub compaction_threshold: usize,
    /// Soft ceiling on total context size; crossing it after
    /// compaction only logs a warning, it isn't enforced.
    pub context_limit: usize,
    /// Capacity of the memory store's query-embedding cache.
    pub recall_cache_max: usize,
    /// How long a recall result is trusted before an opportunistic
    /// hygiene sweep runs ahead of the next recall.
    pub recall_cache_ttl_ms: i64,
    /// Starting autonomy level.
    pub autonomy_level: AutonomyLevel,
    /// Starting autonomy budget.
    pub autonomy_budget: AutonomyBudget,
    /// Path prefix the safety pipeline treats as the credential vault.
    pub vault_prefix: String,
    /// Base system prompt (before any hook-injected addendum).
    pub system_prompt: String,
    /// Model name passed to the provider when no per-call override is
    /// set. `None` lets the provider pick its own default.
    pub default_model: Option<String>,
    /// `max_tokens` sent on every provider request.
    pub default_max_tokens: u32,
    /// Timeout for a single code-execution sandbox invocation (spec.md
    /// §4.5's "per-evaluation timeout, default 300 seconds").
    pub sandbox_timeout_ms: u64,
    /// Timeout for a single local tool-registry call.
    pub local_tool_timeout_ms: u64,
    /// Timeout for a single remote tool invocation.
    pub remote_tool_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 20,
            max_history_messages: 50,
            max_result_length: 1500,
            compaction_threshold: 12_000,
            context_limit: 128_000,
            recall_cache_max: 256,
            recall_cache_ttl_ms: 60_000,
            autonomy_level: AutonomyLevel::Supervised,
            autonomy_budget: AutonomyBudget::default(),
            vault_prefix: "/vault".to_string(),
            system_prompt: "You are a helpful autonomous agent.".to_string(),
            default_model: None,
            default_max_tokens: 4096,
            sandbox_timeout_ms: 300_000,
            local_tool_timeout_ms: 30_000,
            remote_tool_timeout_ms: 30_000,
        }
    }
}

/// Fluent builder for [`AgentConfig`]. Every setter is optional; fields
/// left unset keep `AgentConfig::default()`'s value.
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self { config: AgentConfig::default() }
    }

    /// Set `max_tool_iterations`.
    pub fn max_tool_iterations(mut self, n: u32) -> Self {
        self.config.max_tool_iterations = n;
        self
    }

    /// Set `max_history_messages`.
    pub fn max_history_messages(mut self, n: usize) -> Self {
        self.config.max_history_messages = n;
        self
    }

    /// Set `max_result_length`.
    pub fn max_result_length(mut self, n: usize) -> Self {
        self.config.max_result_length = n;
        self
    }

    /// Set `compaction_threshold`.
    pub fn compaction_threshold(mut self, n: usize) -> Self {
        self.config.compaction_threshold = n;
        self
    }

    /// Set `context_limit`.
    pub fn context_limit(mut self, n: usize) -> Self {
        self.config.context_limit = n;
        self
    }

    /// Set `recall_cache_max`.
    pub fn recall_cache_max(mut self, n: usize) -> Self {
        self.config.recall_cache_max = n;
        self
    }

    /// Set `recall_cache_ttl_ms`.
    pub fn recall_cache_ttl_ms(mut self, ms: i64) -> Self {
        self.config.recall_cache_ttl_ms = ms;
        self
    }

    /// Set the starting autonomy level.
    pub fn autonomy_level(mut self, level: AutonomyLevel) -> Self {
        self.config.autonomy_level = level;
        self
    }

    /// Set the starting autonomy budget.
    pub fn autonomy_budget(mut self, budget: AutonomyBudget) -> Self {
        self.config.autonomy_budget = budget;
        self
    }

    /// Set the credential-vault path prefix.
    pub fn vault_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.vault_prefix = prefix.into();
        self
    }

    /// Set the base system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Set the default model name.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = Some(model.into());
        self
    }

    /// Set the default `max_tokens` sent with every request.
    pub fn default_max_tokens(mut self, n: u32) -> Self {
        self.config.default_max_tokens = n;
        self
    }

    /// Set the sandbox execution timeout.
    pub fn sandbox_timeout_ms(mut self, ms: u64) -> Self {
        self.config.sandbox_timeout_ms = ms;
        self
    }

    /// Set the local tool-call timeout.
    pub fn local_tool_timeout_ms(mut self, ms: u64) -> Self {
        self.config.local_tool_timeout_ms = ms;
        self
    }

    /// Set the remote tool call timeout.
    pub fn remote_tool_timeout_ms(mut self, ms: u64) -> Self {
        self.config.remote_tool_timeout_ms = ms;
        self
    }

    /// Finish building. Infallible — every field already has a default.
    pub fn build(self) -> AgentConfig {
        self.config
    }
}
