// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Headless CLI runner implementing the `run`/`exec` external interface
//! (SPEC_FULL §6): a single positional prompt driven to completion (or
//! streamed turn-by-turn interactively) against a config-resolved agent,
//! with clean exit codes (0 = clean stop, 1 = fatal error, 130 = cancelled).

use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, Mutex};

use conclave_bootstrap::{AgentBuilder, RuntimeContext, ToolSetProfile};
use conclave_config::{AgentMode, Config};
use conclave_core::AgentEvent;
use conclave_tools::events::TodoItem;

use crate::output::{finalise_stdout, write_stderr, write_stdout};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_CANCELLED: i32 = 130;

/// Options shared by `run` and `exec`.
#[derive(Debug)]
pub struct CiOptions {
    pub mode: AgentMode,
    /// Initial prompt. `exec` requires one (from the CLI positional arg or
    /// stdin); `run` treats it as the first turn of an interactive session.
    pub prompt: Option<String>,
    /// `--agent N`: select the Nth entry of `config.agents` (sorted by key)
    /// as the root agent for this invocation. `None` uses the single
    /// `config.model`/`config.agent` root.
    pub agent_index: Option<usize>,
    pub project_root: Option<PathBuf>,
    /// Pre-approve every tool call for the session (`--yes`).
    pub tools_approved: bool,
    /// Mirrors the CLI's repeated `-v` count; forwarded to stderr tracing,
    /// not consumed here directly (the subscriber is installed by the binary).
    pub verbose: u8,
}

/// Resolve `--agent N` against `config.agents`, sorted by key for determinism.
fn select_agent<'a>(
    config: &'a Config,
    index: Option<usize>,
) -> anyhow::Result<Option<(&'a str, &'a conclave_config::AgentSpec)>> {
    let Some(idx) = index else { return Ok(None) };
    let mut entries: Vec<(&str, &conclave_config::AgentSpec)> = config
        .agents
        .iter()
        .map(|(k, v)| (k.as_str(), v))
        .collect();
    entries.sort_by_key(|(name, _)| *name);
    entries
        .get(idx)
        .copied()
        .map(Some)
        .ok_or_else(|| anyhow::anyhow!("--agent {idx} out of range ({} agent(s) declared)", entries.len()))
}

/// Headless runner driving a single agent through `run`/`exec`.
pub struct CiRunner {
    config: Arc<Config>,
}

impl CiRunner {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Build the agent for this invocation, applying `--agent N` overrides
    /// (model, instruction, agent name for delegation) on top of the base
    /// config.
    async fn build_agent(
        &self,
        opts: &CiOptions,
    ) -> anyhow::Result<conclave_core::Agent> {
        let selected = select_agent(&self.config, opts.agent_index)?;

        let (agent_name, model_cfg, instruction, toolsets, num_history_items) = match selected {
            Some((name, spec)) => {
                let model_cfg = conclave_model::resolve_model_from_config(&self.config, &spec.model);
                (
                    name.to_string(),
                    model_cfg,
                    Some(spec.instruction.clone()),
                    Some(spec.toolsets.clone()),
                    spec.num_history_items,
                )
            }
            None => (
                "root".to_string(),
                self.config.model.clone(),
                self.config.agent.system_prompt.clone(),
                None,
                0,
            ),
        };

        let model = conclave_model::from_config(&model_cfg)
            .context("failed to initialise model provider")?;
        let model: Arc<dyn conclave_model::ModelProvider> = Arc::from(model);

        let runtime_ctx = RuntimeContext {
            project_root: opts.project_root.clone(),
            git_context: opts.project_root.as_ref().map(|r| conclave_runtime::collect_git_context(r)),
            ci_context: Some(conclave_runtime::detect_ci_context()),
            project_context_file: opts
                .project_root
                .as_ref()
                .and_then(|r| conclave_runtime::load_project_context_file(r)),
            append_system_prompt: instruction.filter(|s| !s.is_empty()),
            system_prompt_override: None,
        };

        let todos: Arc<Mutex<Vec<TodoItem>>> = Arc::new(Mutex::new(Vec::new()));
        let task_depth = Arc::new(AtomicUsize::new(0));
        let profile = ToolSetProfile::Full {
            todos,
            task_depth,
            agent_name: agent_name.clone(),
            toolsets,
        };

        let (mut agent, _confirmation_tx) = AgentBuilder::new(self.config.clone())
            .with_runtime_context(runtime_ctx)
            .build(opts.mode, model, profile)
            .await
            .context("failed to build agent")?;
        agent.set_agent_name(agent_name);
        agent.set_history_window(num_history_items);

        // Headless has no interactive confirmation consumer: without `--yes`
        // the dropped confirmation sender denies every Ask-policy tool call
        // outright; `--yes` pre-approves the session instead (SPEC_FULL §6).
        if opts.tools_approved {
            agent.set_tools_approved(true);
        }

        Ok(agent)
    }

    /// `exec <config>`: non-interactive, single turn driven to completion.
    /// Returns the process exit code (never panics/exits itself).
    pub async fn exec(&self, opts: CiOptions) -> i32 {
        let mut agent = match self.build_agent(&opts).await {
            Ok(a) => a,
            Err(e) => {
                write_stderr(&format!("[conclave:fatal] {e:#}"));
                return EXIT_FATAL;
            }
        };

        let prompt = match &opts.prompt {
            Some(p) if !p.trim().is_empty() => p.clone(),
            _ => {
                write_stderr("[conclave:error] exec requires a prompt (positional argument or stdin)");
                return EXIT_FATAL;
            }
        };

        let (tx, mut rx) = mpsc::channel::<AgentEvent>(128);
        let submit_fut = agent.submit(&prompt, tx);
        tokio::pin!(submit_fut);

        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = cancel_tx.send(()).await;
            }
        });

        let mut failed = false;
        let mut response_text = String::new();
        loop {
            tokio::select! {
                biased;

                _ = cancel_rx.recv() => {
                    write_stderr("[conclave:cancelled] Ctrl+C received");
                    return EXIT_CANCELLED;
                }

                Some(event) = rx.recv() => {
                    handle_event(event, &mut failed, &mut response_text, opts.verbose);
                }

                result = &mut submit_fut => {
                    if let Err(e) = result {
                        write_stderr(&format!("[conclave:fatal] {e:#}"));
                        return EXIT_FATAL;
                    }
                    while let Ok(ev) = rx.try_recv() {
                        handle_event(ev, &mut failed, &mut response_text, opts.verbose);
                    }
                    break;
                }
            }
        }
        finalise_stdout(&response_text);

        if failed {
            EXIT_FATAL
        } else {
            EXIT_SUCCESS
        }
    }

    /// `run <config> [--agent N]`: interactive streaming. Each line read from
    /// stdin (after the initial prompt, if any) is submitted as a new turn;
    /// EOF ends the session cleanly.
    pub async fn run(&self, opts: CiOptions) -> i32 {
        let mut agent = match self.build_agent(&opts).await {
            Ok(a) => a,
            Err(e) => {
                write_stderr(&format!("[conclave:fatal] {e:#}"));
                return EXIT_FATAL;
            }
        };

        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = cancel_tx.send(()).await;
            }
        });

        let mut pending = opts.prompt.clone();
        let stdin = io::stdin();
        loop {
            let input = match pending.take() {
                Some(p) => p,
                None => {
                    write_stdout("> ");
                    let _ = io::stdout().flush();
                    let mut line = String::new();
                    let mut locked = stdin.lock();
                    match locked.read_line(&mut line) {
                        Ok(0) => return EXIT_SUCCESS, // EOF: clean stop
                        Ok(_) => {
                            let trimmed = line.trim();
                            if trimmed.is_empty() {
                                continue;
                            }
                            trimmed.to_string()
                        }
                        Err(e) => {
                            write_stderr(&format!("[conclave:fatal] reading stdin: {e}"));
                            return EXIT_FATAL;
                        }
                    }
                }
            };

            let (tx, mut rx) = mpsc::channel::<AgentEvent>(128);
            let submit_fut = agent.submit(&input, tx);
            tokio::pin!(submit_fut);

            let mut failed = false;
            let mut response_text = String::new();
            loop {
                tokio::select! {
                    biased;

                    _ = cancel_rx.recv() => {
                        write_stderr("[conclave:cancelled] Ctrl+C received");
                        return EXIT_CANCELLED;
                    }

                    Some(event) = rx.recv() => {
                        handle_event(event, &mut failed, &mut response_text, opts.verbose);
                    }

                    result = &mut submit_fut => {
                        if let Err(e) = result {
                            write_stderr(&format!("[conclave:fatal] {e:#}"));
                            return EXIT_FATAL;
                        }
                        while let Ok(ev) = rx.try_recv() {
                            handle_event(ev, &mut failed, &mut response_text, opts.verbose);
                        }
                        break;
                    }
                }
            }
            finalise_stdout(&response_text);
            if failed {
                return EXIT_FATAL;
            }
        }
    }
}

/// Translate an `AgentEvent` into stdout/stderr output for a headless run.
fn handle_event(event: AgentEvent, failed: &mut bool, response_text: &mut String, trace_level: u8) {
    match event {
        AgentEvent::StreamStarted { .. } => {}
        AgentEvent::Forwarded { agent_name, event } => {
            if let AgentEvent::TextDelta(delta) = event.as_ref() {
                write_stderr(&format!("[conclave:delegate:{agent_name}] {delta}"));
            } else {
                handle_event(*event, failed, response_text, trace_level);
            }
        }
        AgentEvent::TextDelta(delta) => {
            write_stdout(&delta);
            response_text.push_str(&delta);
        }
        AgentEvent::TextComplete(_) => {}
        AgentEvent::ToolCallStarted(tc) => {
            write_stderr(&format!(
                "[conclave:tool:call] id=\"{}\" name=\"{}\" args={}",
                tc.id,
                tc.name,
                serde_json::to_string(&tc.args).unwrap_or_default()
            ));
        }
        AgentEvent::ToolCallConfirmation { call } => {
            // Headless runs pre-approve via set_tools_approved; this event
            // should not fire, but deny defensively if it ever does.
            write_stderr(&format!(
                "[conclave:warn] unexpected confirmation request for tool \"{}\"",
                call.name
            ));
        }
        AgentEvent::ToolCallFinished { call_id, tool_name, is_error, output } => {
            if is_error {
                write_stderr(&format!(
                    "[conclave:tool:result] id=\"{call_id}\" name=\"{tool_name}\" success=false output={output:?}"
                ));
            } else {
                let output_snippet = if trace_level >= 1 && !output.is_empty() {
                    const LIMIT: usize = 1500;
                    let preview: String = output.chars().take(LIMIT).collect();
                    if output.chars().count() > LIMIT {
                        format!(" output={:?}...[+{} chars]", preview, output.chars().count() - LIMIT)
                    } else {
                        format!(" output={output:?}")
                    }
                } else {
                    String::new()
                };
                write_stderr(&format!(
                    "[conclave:tool:result] id=\"{call_id}\" name=\"{tool_name}\" success=true size={}{}",
                    output.len(),
                    output_snippet
                ));
            }
        }
        AgentEvent::ContextCompacted { tokens_before, tokens_after, .. } => {
            write_stderr(&format!("[conclave:context:compacted] {tokens_before} -> {tokens_after} tokens"));
        }
        AgentEvent::TokenUsage { input, output, cache_read, cache_write, .. } => {
            if cache_read > 0 || cache_write > 0 {
                write_stderr(&format!(
                    "[conclave:tokens] input={input} output={output} cache_read={cache_read} cache_write={cache_write}"
                ));
            } else {
                write_stderr(&format!("[conclave:tokens] input={input} output={output}"));
            }
        }
        AgentEvent::TurnComplete => {}
        AgentEvent::Aborted { .. } => {
            write_stderr("[conclave:cancelled] turn aborted before completion");
        }
        AgentEvent::Error(msg) => {
            write_stderr(&format!("[conclave:agent:error] {msg}"));
            *failed = true;
        }
        AgentEvent::TodoUpdate(todos) => {
            let lines: Vec<String> = todos
                .iter()
                .map(|t| {
                    let icon = match t.status.as_str() {
                        "completed" => "done",
                        "in_progress" => "active",
                        "cancelled" => "cancelled",
                        _ => "pending",
                    };
                    format!("  [{icon}] {}", t.content)
                })
                .collect();
            write_stderr(&format!("[conclave:todos]\n{}", lines.join("\n")));
        }
        AgentEvent::ModeChanged(mode) => {
            write_stderr(&format!("[conclave:mode:changed] now in {mode} mode"));
        }
        AgentEvent::Question { questions, .. } => {
            write_stderr(&format!("[conclave:questions] {}", questions.join(" | ")));
        }
        AgentEvent::ThinkingDelta(_) => {}
        AgentEvent::ThinkingComplete(content) => {
            if trace_level >= 1 {
                write_stderr(&format!("[conclave:thinking] {content}"));
            }
        }
        AgentEvent::QuestionAnswer { .. } => {}
    }
}
