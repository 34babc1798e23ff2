use conclave_config::AgentMode;

/// A structured todo item managed by the todo tool.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    /// One of: "pending", "in_progress", "completed", "cancelled"
    pub status: String,
}

/// A minimal, crate-local mirror of the subset of `conclave_core::AgentEvent`
/// that a delegation (`transfer_task`) forwards from its child agent to the
/// caller's event channel. Kept independent of `conclave_core` (which depends
/// on this crate, not the other way around); `conclave-core::Agent` converts
/// this back into a real `AgentEvent::Forwarded` wrapper.
#[derive(Debug, Clone)]
pub enum ForwardedAgentEvent {
    StreamStarted { session_id: String },
    TextDelta(String),
    TextComplete(String),
    ThinkingDelta(String),
    ThinkingComplete(String),
    ToolCallStarted {
        id: String,
        name: String,
        args: serde_json::Value,
    },
    ToolCallFinished {
        id: String,
        name: String,
        output: String,
        is_error: bool,
    },
    TurnComplete,
    Aborted {
        partial_text: String,
    },
    Error(String),
}

/// One role/text entry of a completed delegation's transcript, recorded in
/// the caller's `Session` as a `SessionItem::SubSession` once the child
/// finishes (SPEC_FULL §4.7 step 5).
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub role: String,
    pub text: String,
}

/// Events emitted by tools to communicate state changes back to the agent loop.
/// The agent translates these into `AgentEvent` variants for the UI.
#[derive(Debug)]
pub enum ToolEvent {
    TodoUpdate(Vec<TodoItem>),
    ModeChanged(AgentMode),
    /// A single event forwarded from a running `transfer_task` delegation,
    /// tagged with the child agent's declared name.
    Delegated {
        agent_name: String,
        event: ForwardedAgentEvent,
    },
    /// Sent once a delegation finishes: the child's full transcript, to be
    /// appended to the caller's `Session` as a `SubSession` item.
    DelegationComplete {
        agent_name: String,
        transcript: Vec<TranscriptEntry>,
    },
}
