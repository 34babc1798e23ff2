// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod runner;
mod output;
pub mod context;
pub mod template;

pub use runner::{CiOptions, CiRunner, EXIT_CANCELLED, EXIT_FATAL, EXIT_SUCCESS};
// Re-export runtime detection utilities for callers that import from conclave_ci
pub use conclave_runtime::{find_project_root, detect_ci_context, collect_git_context, load_project_context_file, ci_template_vars, GitContext};
