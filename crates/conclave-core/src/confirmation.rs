//! Confirmation gating for tool calls (policy resolution only).
//!
//! This module decides *whether* a tool call needs interactive confirmation
//! and what to do with the caller's answer; it does not own the channel that
//! carries the question to a TUI/CI consumer and the `Decision` back — that
//! plumbing lives in the agent loop's tool-dispatch phase, which holds the
//! `mpsc::Sender<AgentEvent>` the question is announced on and the matching
//! response channel.

use conclave_tools::{ApprovalPolicy, ToolCall, ToolOutput};

/// The caller's answer to a `ToolCallConfirmation` event.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Run this one call, ask again next time.
    ApproveOnce,
    /// Run this call and every subsequent call for the rest of the session
    /// without asking again (`Session.tools_approved = true`).
    ApproveSession,
    /// Refuse to run the call; `reason` is surfaced to the model as the tool
    /// result so it can adjust course.
    Reject(String),
}

/// What the agent loop should do with a pending tool call before invoking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Run the call without asking.
    Run,
    /// Block and emit `AgentEvent::ToolCallConfirmation`, then await a `Decision`.
    AwaitConfirmation,
    /// Refuse outright; no confirmation is offered.
    Deny,
}

/// Resolve the gate for a tool call given its declared/effective policy and
/// whether this session has already blanket-approved tool calls.
///
/// `transfer_task` is never gated — SPEC_FULL treats delegation as always
/// auto-approved regardless of the tool's own declared policy, since it has
/// no side effect of its own beyond invoking another agent (which is gated
/// by its own tools independently).
pub fn resolve_gate(tool_name: &str, policy: ApprovalPolicy, tools_approved: bool) -> Gate {
    if tool_name == "transfer_task" {
        return Gate::Run;
    }
    match policy {
        ApprovalPolicy::Deny => Gate::Deny,
        ApprovalPolicy::Auto => Gate::Run,
        ApprovalPolicy::Ask => {
            if tools_approved {
                Gate::Run
            } else {
                Gate::AwaitConfirmation
            }
        }
    }
}

/// Build the synthesized tool-role error result for a denied or rejected call.
pub fn denial_result(call: &ToolCall, reason: &str) -> ToolOutput {
    ToolOutput::err(&call.id, format!("tool call denied: {reason}"))
}

/// Apply a `Decision` to a pending call: `Some(true)` means "flip the
/// session's blanket-approval flag on", `None` means leave it unchanged,
/// `Some(false)` is never produced (approval is monotonic — once granted for
/// the session it is never revoked mid-session).
pub fn decision_sets_session_approval(decision: &Decision) -> bool {
    matches!(decision, Decision::ApproveSession)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_task_always_runs() {
        assert_eq!(
            resolve_gate("transfer_task", ApprovalPolicy::Ask, false),
            Gate::Run
        );
        assert_eq!(
            resolve_gate("transfer_task", ApprovalPolicy::Deny, false),
            Gate::Run
        );
    }

    #[test]
    fn deny_policy_denies_regardless_of_approval() {
        assert_eq!(
            resolve_gate("shell", ApprovalPolicy::Deny, true),
            Gate::Deny
        );
    }

    #[test]
    fn auto_policy_runs_without_confirmation() {
        assert_eq!(
            resolve_gate("read_file", ApprovalPolicy::Auto, false),
            Gate::Run
        );
    }

    #[test]
    fn ask_policy_awaits_confirmation_until_session_approved() {
        assert_eq!(
            resolve_gate("shell", ApprovalPolicy::Ask, false),
            Gate::AwaitConfirmation
        );
        assert_eq!(
            resolve_gate("shell", ApprovalPolicy::Ask, true),
            Gate::Run
        );
    }

    #[test]
    fn approve_session_sets_flag_approve_once_does_not() {
        assert!(decision_sets_session_approval(&Decision::ApproveSession));
        assert!(!decision_sets_session_approval(&Decision::ApproveOnce));
        assert!(!decision_sets_session_approval(&Decision::Reject(
            "no".into()
        )));
    }

    #[test]
    fn denial_result_is_an_error_with_reason() {
        let call = ToolCall {
            id: "t1".into(),
            name: "shell".into(),
            args: serde_json::json!({}),
        };
        let out = denial_result(&call, "user declined");
        assert!(out.is_error);
        assert!(out.content.contains("user declined"));
    }
}
