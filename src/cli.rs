// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

use conclave_config::AgentMode;

#[derive(Parser, Debug)]
#[command(
    name = "conclave",
    about = "A multi-agent AI coding runtime for CLI and CI",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Explicit config layer, highest precedence (overrides auto-discovery).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (repeatable: -v = debug, -vv = trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Pre-approve every tool call for the session, so the run proceeds
    /// without an interactive confirmation consumer attached.
    #[arg(long, global = true)]
    pub yes: bool,

    /// Agent mode for the root agent.
    #[arg(long, short = 'm', value_enum, default_value = "agent", global = true)]
    pub mode: AgentMode,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive streaming session against a config-resolved agent.
    ///
    /// Reads prompts line-by-line from stdin (after the initial prompt, if
    /// given) and streams each turn's output to stdout. EOF ends the session
    /// cleanly (exit 0); Ctrl+C cancels (exit 130).
    Run {
        /// Path to the agent config file (merged as the highest-precedence
        /// layer on top of auto-discovered config).
        config: PathBuf,
        /// Optional first turn's prompt. If omitted, the first turn is also
        /// read from stdin.
        prompt: Option<String>,
        /// Select the Nth declared agent (sorted by name) as the root agent
        /// for this invocation, instead of the single `model`/`agent` root.
        #[arg(long, value_name = "N")]
        agent: Option<usize>,
    },

    /// Non-interactive: drive a single turn to completion and exit.
    ///
    /// The prompt comes from the positional argument, or from stdin if
    /// omitted. Exit codes: 0 clean stop, 1 fatal error, 130 cancelled.
    Exec {
        /// Path to the agent config file (merged as the highest-precedence
        /// layer on top of auto-discovered config).
        config: PathBuf,
        /// The prompt to submit. Read from stdin if omitted.
        prompt: Option<String>,
        /// Select the Nth declared agent (sorted by name) as the root agent
        /// for this invocation, instead of the single `model`/`agent` root.
        #[arg(long, value_name = "N")]
        agent: Option<usize>,
    },

    /// Generate a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the effective configuration and exit.
    ShowConfig,

    /// List available models for the configured provider(s).
    ///
    /// By default the static built-in catalog is shown.
    /// With --refresh the configured provider API is queried for live data.
    ListModels {
        /// Filter by provider name (e.g. "openai", "anthropic", "groq")
        #[arg(long, short = 'p')]
        provider: Option<String>,
        /// Query the provider API for the live list of available models
        #[arg(long)]
        refresh: bool,
        /// Output as JSON instead of a formatted table
        #[arg(long)]
        json: bool,
    },

    /// List all supported model providers.
    ///
    /// Shows each provider's id, name, description, and default API key
    /// environment variable. Use the provider id in your config file under
    /// `model.provider`.
    ListProviders {
        /// Show detailed information for each provider
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Resolve the effective config path for a `run`/`exec` invocation: the
    /// global `--config` flag overrides the subcommand's positional path.
    pub fn effective_config_path<'a>(&'a self, subcommand_config: &'a PathBuf) -> &'a PathBuf {
        self.config.as_ref().unwrap_or(subcommand_config)
    }
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "conclave", &mut std::io::stdout());
}

/// TTY detection for stdin, used to decide whether `exec`/`run` should read
/// a prompt from stdin when none is given positionally.
pub trait IsTerminal {
    fn is_terminal(&self) -> bool;
}

impl IsTerminal for std::io::Stdin {
    fn is_terminal(&self) -> bool {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe { libc::isatty(self.as_raw_fd()) != 0 }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}
