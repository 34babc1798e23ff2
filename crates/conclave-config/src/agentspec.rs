//! Declarative agent graph (§6 AgentSpec / ToolsetSpec) and its validation.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::Config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// A `models` key, an inline `provider/model` string, or a
    /// comma-separated fallback list of either form.
    pub model: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instruction: String,
    /// Names of agents this agent may `transfer_task` to. Each must exist
    /// as a key in the enclosing `agents` map.
    #[serde(default)]
    pub sub_agents: Vec<String>,
    #[serde(default)]
    pub toolsets: Vec<ToolsetSpec>,
    #[serde(default)]
    pub add_date: bool,
    #[serde(default)]
    pub add_environment_info: bool,
    /// 0 = unlimited.
    #[serde(default)]
    pub max_iterations: u32,
    /// History-window size in items; 0 means "all" (the Runtime default).
    #[serde(default)]
    pub num_history_items: usize,
    #[serde(default)]
    pub code_mode_tools: bool,
    #[serde(default)]
    pub structured_output: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolsetSpec {
    Think {
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
    Todo {
        #[serde(default)]
        shared: bool,
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
    Memory {
        path: String,
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
    Filesystem {
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
    Shell {
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
    Fetch {
        #[serde(default)]
        timeout: Option<u64>,
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
    Script {
        shell: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
    Mcp {
        #[serde(flatten)]
        transport: McpTransport,
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
    Api {
        api_config: ApiConfig,
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum McpTransport {
    /// `docker:<name>` resolved against an external gateway registry.
    Ref { r#ref: String },
    /// Local subprocess speaking MCP stdio JSON-RPC.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Remote MCP server over HTTP/SSE.
    Remote {
        remote: RemoteMcp,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteMcp {
    pub url: String,
    pub transport_type: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ToolsetSpec {
    pub fn whitelist(&self) -> &[String] {
        match self {
            ToolsetSpec::Think { tools, .. }
            | ToolsetSpec::Todo { tools, .. }
            | ToolsetSpec::Memory { tools, .. }
            | ToolsetSpec::Filesystem { tools, .. }
            | ToolsetSpec::Shell { tools, .. }
            | ToolsetSpec::Fetch { tools, .. }
            | ToolsetSpec::Script { tools, .. }
            | ToolsetSpec::Mcp { tools, .. }
            | ToolsetSpec::Api { tools, .. } => tools,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("agent '{agent}' declares unknown sub_agent '{target}'")]
    UnknownSubAgent { agent: String, target: String },
    #[error("agent '{agent}' references unknown model '{model_ref}'")]
    UnknownModelRef { agent: String, model_ref: String },
    #[error(
        "provider '{provider}' requires an API key; set it via the '{env_var}' \
         environment variable or the model's api_key_env/api_key field"
    )]
    MissingApiKey { provider: String, env_var: String },
    #[error("agent delegation graph contains a cycle: {0}")]
    DelegationCycle(String),
}

/// Canonical `<PROVIDER>_API_KEY` env var name for a provider identifier.
pub fn default_api_key_env(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "google" => Some("GOOGLE_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "xai" => Some("XAI_API_KEY"),
        "nebius" => Some("NEBIUS_API_KEY"),
        _ => None,
    }
}

/// Validate the declarative agent graph: every `sub_agents` entry exists,
/// every `model` reference resolves (inline `provider/model`, a `models`
/// key, or a comma-separated fallback list of either), and every provider
/// that needs an API key has one available.
///
/// Returns every violation found rather than stopping at the first, so a
/// misconfigured file reports everything wrong with it in one pass.
pub fn validate(config: &Config) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    let known_agents: HashSet<&str> = config.agents.keys().map(String::as_str).collect();

    for (name, spec) in &config.agents {
        for target in &spec.sub_agents {
            if !known_agents.contains(target.as_str()) {
                errors.push(ConfigValidationError::UnknownSubAgent {
                    agent: name.clone(),
                    target: target.clone(),
                });
            }
        }
        for model_ref in spec.model.split(',').map(str::trim) {
            if let Err(e) = resolve_model_ref(config, model_ref) {
                errors.push(match e {
                    ConfigValidationError::UnknownModelRef { .. } => {
                        ConfigValidationError::UnknownModelRef {
                            agent: name.clone(),
                            model_ref: model_ref.to_string(),
                        }
                    }
                    other => other,
                });
            }
        }
    }

    for model_cfg in config.models.values().chain(std::iter::once(&config.model)) {
        if model_cfg.provider == "mock" || model_cfg.provider == "custom" {
            continue;
        }
        let has_key = model_cfg.api_key.is_some()
            || model_cfg
                .api_key_env
                .as_ref()
                .map(|var| std::env::var(var).is_ok())
                .unwrap_or(false);
        if has_key {
            continue;
        }
        if let Some(env_var) = default_api_key_env(&model_cfg.provider) {
            if std::env::var(env_var).is_err() {
                errors.push(ConfigValidationError::MissingApiKey {
                    provider: model_cfg.provider.clone(),
                    env_var: env_var.to_string(),
                });
            }
        }
    }

    errors.extend(find_delegation_cycle(config));

    errors
}

/// Detect a cycle in the `sub_agents` delegation graph via DFS with a
/// recursion stack. `transfer_task` is only ever allowed along these edges,
/// so an acyclic graph here is what guarantees the Delegator's structural
/// cycle-avoidance; the Runtime's recursion-depth counter is a backstop on
/// top of this, not a substitute for it.
fn find_delegation_cycle(config: &Config) -> Option<ConfigValidationError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        name: &'a str,
        config: &'a Config,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<String> {
        match marks.get(name) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                stack.push(name);
                let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                return Some(stack[start..].join(" -> "));
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        stack.push(name);
        if let Some(spec) = config.agents.get(name) {
            for target in &spec.sub_agents {
                if let Some(cycle) = visit(target, config, marks, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        None
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for name in config.agents.keys() {
        let mut stack = Vec::new();
        if marks.get(name.as_str()) == Some(&Mark::Done) {
            continue;
        }
        if let Some(cycle) = visit(name, config, &mut marks, &mut stack) {
            return Some(ConfigValidationError::DelegationCycle(cycle));
        }
    }
    None
}

/// Resolve a `model` field entry: either a `models` map key, or an inline
/// `provider/model` pair. Ambiguity between a named key and a `provider/model`
/// string that happens to also match a key is resolved in favor of the named
/// key (named entries are explicit; inline strings are the fallback form).
fn resolve_model_ref(config: &Config, model_ref: &str) -> Result<(), ConfigValidationError> {
    if config.models.contains_key(model_ref) {
        return Ok(());
    }
    if model_ref.contains('/') {
        return Ok(());
    }
    Err(ConfigValidationError::UnknownModelRef {
        agent: String::new(),
        model_ref: model_ref.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_with_agents(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn validate_accepts_empty_agents_map() {
        let c = Config::default();
        // mock/custom providers skip the API-key check; default is openai
        // which would normally need OPENAI_API_KEY, but there is nothing to
        // validate when `agents` is empty besides the top-level model.
        let errors = validate(&c);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ConfigValidationError::MissingApiKey { .. })));
    }

    #[test]
    fn validate_flags_unknown_sub_agent() {
        let c = cfg_with_agents(
            "agents:\n  root:\n    model: mock\n    sub_agents: [ghost]\n",
        );
        let errors = validate(&c);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigValidationError::UnknownSubAgent { target, .. } if target == "ghost")));
    }

    #[test]
    fn validate_accepts_known_sub_agent() {
        let c = cfg_with_agents(
            "models:\n  m:\n    provider: mock\n    name: mock-model\nagents:\n  root:\n    model: m\n    sub_agents: [child]\n  child:\n    model: m\n",
        );
        let errors = validate(&c);
        assert!(errors
            .iter()
            .all(|e| !matches!(e, ConfigValidationError::UnknownSubAgent { .. })));
    }

    #[test]
    fn validate_accepts_inline_provider_model() {
        let c = cfg_with_agents("agents:\n  root:\n    model: mock/echo\n");
        let errors = validate(&c);
        assert!(errors
            .iter()
            .all(|e| !matches!(e, ConfigValidationError::UnknownModelRef { .. })));
    }

    #[test]
    fn validate_flags_unresolvable_model_ref() {
        let c = cfg_with_agents("agents:\n  root:\n    model: nonexistent\n");
        let errors = validate(&c);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigValidationError::UnknownModelRef { .. })));
    }

    #[test]
    fn toolset_spec_whitelist_accessor() {
        let spec = ToolsetSpec::Shell {
            instruction: None,
            tools: vec!["run_terminal_command".into()],
        };
        assert_eq!(spec.whitelist(), &["run_terminal_command".to_string()]);
    }

    #[test]
    fn mcp_toolset_stdio_round_trip() {
        let yaml = "type: mcp\ncommand: mcp-server\nargs: [--flag]\n";
        let spec: ToolsetSpec = serde_yaml::from_str(yaml).unwrap();
        match spec {
            ToolsetSpec::Mcp {
                transport: McpTransport::Stdio { command, args, .. },
                ..
            } => {
                assert_eq!(command, "mcp-server");
                assert_eq!(args, vec!["--flag".to_string()]);
            }
            _ => panic!("expected stdio mcp toolset"),
        }
    }

    #[test]
    fn validate_flags_self_referencing_cycle() {
        let c = cfg_with_agents(
            "models:\n  m:\n    provider: mock\n    name: mock-model\n\
             agents:\n  root:\n    model: m\n    sub_agents: [root]\n",
        );
        let errors = validate(&c);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigValidationError::DelegationCycle(_))));
    }

    #[test]
    fn validate_flags_two_agent_cycle() {
        let c = cfg_with_agents(
            "models:\n  m:\n    provider: mock\n    name: mock-model\n\
             agents:\n  a:\n    model: m\n    sub_agents: [b]\n  b:\n    model: m\n    sub_agents: [a]\n",
        );
        let errors = validate(&c);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigValidationError::DelegationCycle(_))));
    }

    #[test]
    fn validate_accepts_acyclic_tree() {
        let c = cfg_with_agents(
            "models:\n  m:\n    provider: mock\n    name: mock-model\n\
             agents:\n  root:\n    model: m\n    sub_agents: [a, b]\n  a:\n    model: m\n  b:\n    model: m\n",
        );
        let errors = validate(&c);
        assert!(errors
            .iter()
            .all(|e| !matches!(e, ConfigValidationError::DelegationCycle(_))));
    }

    #[test]
    fn default_api_key_env_known_providers() {
        assert_eq!(default_api_key_env("openai"), Some("OPENAI_API_KEY"));
        assert_eq!(default_api_key_env("anthropic"), Some("ANTHROPIC_API_KEY"));
        assert_eq!(default_api_key_env("dmr"), None);
    }
}
