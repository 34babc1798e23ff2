use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Serde default helper — returns `true`.
///
/// Used for config fields that should be enabled unless the user explicitly
/// sets them to `false`.  `#[serde(default)]` on a `bool` always falls back
/// to `bool::default()` (i.e. `false`), so a named function is required.
fn default_true() -> bool {
    true
}

/// Current config schema version. Bump whenever a breaking field rename or
/// restructuring happens, and add a branch to [`crate::migrate::migrate`].
pub const CURRENT_SCHEMA_VERSION: &str = "2";

fn default_schema_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version this file was written against. Older versions are
    /// migrated deterministically by [`crate::migrate::migrate`] before the
    /// rest of this struct is deserialized.
    #[serde(default = "default_schema_version")]
    pub version: String,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Named, fully-declared agents forming the delegation graph (§6
    /// AgentSpec). Empty for single-agent use: the CLI then synthesizes one
    /// root agent from `model`/`agent`/`tools` above.
    #[serde(default)]
    pub agents: HashMap<String, crate::agentspec::AgentSpec>,
    /// Named model configurations, referenced from `AgentSpec::model` or
    /// from `--model <key>` / `--model <key>/<model>`.
    ///
    /// ```yaml
    /// models:
    ///   my_ollama:
    ///     provider: openai        # uses the OpenAI-compatible wire format
    ///     base_url: http://localhost:11434/v1
    ///     name: llama3.2
    ///   work_anthropic:
    ///     provider: anthropic
    ///     api_key_env: WORK_ANTHROPIC_KEY
    ///     name: claude-opus-4-5
    /// ```
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_schema_version(),
            model: ModelConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            agents: HashMap::new(),
            models: HashMap::new(),
        }
    }
}

/// A {tokens} or {effort} thinking-budget hint forwarded to providers that
/// support extended/internal reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThinkingBudget {
    Tokens { tokens: u32 },
    Effort { effort: ThinkingEffort },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingEffort {
    Minimal,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier: "openai" | "anthropic" | "google" | "dmr" |
    /// "mistral" | "xai" | "nebius" | "amazon-bedrock" | "custom" | "mock"
    pub provider: String,
    /// Model name forwarded to the provider API
    pub name: String,
    /// Environment variable that holds the API key (read at runtime)
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files
    pub api_key: Option<String>,
    /// Base URL override. Useful for local proxies or self-hosted gateways.
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0-2.0)
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    /// Reasoning/thinking budget hint, provider-dependent.
    pub thinking_budget: Option<ThinkingBudget>,

    // Azure OpenAI
    pub azure_resource: Option<String>,
    pub azure_deployment: Option<String>,
    pub azure_api_version: Option<String>,

    // AWS Bedrock
    pub aws_region: Option<String>,

    // Prompt caching (Anthropic-specific; no-ops for providers that cache
    // automatically, e.g. OpenAI/Google).
    /// Attach an explicit cache-control marker to the system message.
    #[serde(default = "default_true")]
    pub cache_system_prompt: bool,
    /// Use the extended (1-hour) cache TTL instead of the default 5-minute
    /// window. Sends `anthropic-beta: extended-cache-ttl-2025-04-11`.
    #[serde(default)]
    pub extended_cache_time: bool,
    /// Cache tool definitions (stable across requests within a session).
    #[serde(default = "default_true")]
    pub cache_tools: bool,
    /// Cache conversation history up to the last message.
    #[serde(default = "default_true")]
    pub cache_conversation: bool,
    /// Cache image content blocks in conversation history.
    #[serde(default = "default_true")]
    pub cache_images: bool,
    /// Cache large tool results (eligible above ~4096 chars).
    #[serde(default = "default_true")]
    pub cache_tool_results: bool,

    /// Free-form provider-specific options forwarded as-is to the driver.
    #[serde(default)]
    pub provider_opts: serde_json::Value,

    /// Path to YAML mock-responses file (used when provider = "mock").
    pub mock_responses_file: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            name: "gpt-4o".into(),
            // Intentionally None: resolve_api_key() falls through to the
            // driver registry, which already knows the canonical env-var
            // name for each provider. Hard-coding it here would shadow that
            // lookup whenever the provider is overridden per-agent.
            api_key_env: None,
            api_key: None,
            base_url: None,
            max_tokens: Some(4096),
            temperature: Some(0.2),
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            thinking_budget: None,
            azure_resource: None,
            azure_deployment: None,
            azure_api_version: None,
            aws_region: None,
            cache_system_prompt: true,
            extended_cache_time: false,
            cache_tools: true,
            cache_conversation: true,
            cache_images: true,
            cache_tool_results: true,
            provider_opts: serde_json::Value::Null,
            mock_responses_file: None,
        }
    }
}

fn default_agent_mode() -> AgentMode {
    AgentMode::Agent
}
fn default_max_tool_rounds() -> u32 {
    200
}
fn default_compaction_threshold() -> f32 {
    0.85
}

/// Strategy used when compacting the session context (§4.8a).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompactionStrategy {
    #[default]
    Structured,
    Narrative,
}

impl std::fmt::Display for CompactionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompactionStrategy::Structured => write!(f, "structured"),
            CompactionStrategy::Narrative => write!(f, "narrative"),
        }
    }
}

/// Runtime tuning knobs that apply uniformly across agents, distinct from
/// the per-agent declarative [`crate::agentspec::AgentSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_mode")]
    pub default_mode: AgentMode,
    /// Maximum number of autonomous tool-call rounds before stopping.
    /// Corresponds to `max_iterations` on an individual AgentSpec when the
    /// latter leaves it unset (0 = unlimited there; this is the CLI-wide
    /// fallback).
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Token fraction at which proactive compaction triggers (0.0-1.0).
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: f32,
    /// Number of recent non-system messages preserved verbatim during
    /// compaction.
    #[serde(default = "default_compaction_keep_recent")]
    pub compaction_keep_recent: usize,
    #[serde(default)]
    pub compaction_strategy: CompactionStrategy,
    /// Maximum tokens allowed for a single tool result before it is
    /// deterministically truncated. 0 disables per-result truncation.
    #[serde(default = "default_tool_result_token_cap")]
    pub tool_result_token_cap: usize,
    /// Fraction of the context window reserved for tool schemas and
    /// measurement error in the token approximation.
    #[serde(default = "default_compaction_overhead_reserve")]
    pub compaction_overhead_reserve: f32,
    /// System prompt override; leave None to use the built-in prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Per-step wall-clock timeout in seconds (0 = no limit).
    #[serde(default)]
    pub max_step_timeout_secs: u64,
    /// Total run wall-clock timeout in seconds (0 = no limit).
    #[serde(default)]
    pub max_run_timeout_secs: u64,
}

fn default_compaction_keep_recent() -> usize {
    6
}
fn default_tool_result_token_cap() -> usize {
    4000
}
fn default_compaction_overhead_reserve() -> f32 {
    0.10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_mode: AgentMode::Agent,
            max_tool_rounds: 200,
            compaction_threshold: 0.85,
            compaction_keep_recent: default_compaction_keep_recent(),
            compaction_strategy: CompactionStrategy::Structured,
            tool_result_token_cap: default_tool_result_token_cap(),
            compaction_overhead_reserve: default_compaction_overhead_reserve(),
            system_prompt: None,
            max_step_timeout_secs: 0,
            max_run_timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Pure research - read-only tools, no writes
    Research,
    /// Generate a structured plan, no code changes
    Plan,
    /// Full agent with read/write tools
    Agent,
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentMode::Research => write!(f, "research"),
            AgentMode::Plan => write!(f, "plan"),
            AgentMode::Agent => write!(f, "agent"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Automatically approve shell commands matching these glob patterns
    pub auto_approve_patterns: Vec<String>,
    /// Block shell commands matching these glob patterns
    pub deny_patterns: Vec<String>,
    /// Timeout in seconds for a single tool call
    pub timeout_secs: u64,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            auto_approve_patterns: vec![
                "cat *".into(),
                "ls *".into(),
                "find *".into(),
                "rg *".into(),
                "grep *".into(),
            ],
            deny_patterns: vec!["rm -rf /*".into(), "dd if=*".into()],
            timeout_secs: 30,
            web: WebConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebSearchConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default)]
    pub search: WebSearchConfig,
    /// Default maximum characters read back from `fetch` (default 50000)
    pub fetch_max_chars: usize,
    /// Default timeout in seconds for `fetch`
    pub timeout_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            search: WebSearchConfig::default(),
            fetch_max_chars: 50_000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Path to the memory note file (default: ~/.config/conclave/memory.md)
    pub memory_file: Option<String>,
}

// Unit tests
