use conclave_config::AgentMode;
use conclave_tools::{events::TodoItem, ToolCall};

/// Which compaction strategy actually ran for a given `ContextCompacted` event.
///
/// Distinct from `conclave_config::CompactionStrategy` (the user's configured
/// preference): a configured `Structured`/`Narrative` strategy still falls
/// through to `Emergency` if the summarisation call fails, returns an empty
/// summary, or the session is too large to fit even the compaction prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionStrategyUsed {
    Structured,
    Narrative,
    Emergency,
}

/// Events emitted by the agent during a single turn.
/// Consumers (CI runner, TUI) subscribe to these to drive their output.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// First event emitted for any agent invocation (SPEC_FULL §4.6).
    StreamStarted { session_id: String, agent_name: String },
    /// A text chunk streamed from the model
    TextDelta(String),
    /// A complete text response from the model (after streaming finishes)
    TextComplete(String),
    /// A thinking/reasoning chunk from the model (extended thinking API).
    /// Consumers should accumulate deltas and finalise them into a Thinking
    /// segment when the model signals the end of the reasoning block.
    ThinkingDelta(String),
    /// A complete thinking/reasoning block (accumulated from ThinkingDelta events).
    ThinkingComplete(String),
    /// The model has requested a tool call
    ToolCallStarted(ToolCall),
    /// A tool call is gated behind a confirmation and awaits a `Decision`
    /// delivered out of band (e.g. over a TUI prompt or CI auto-policy).
    ToolCallConfirmation { call: ToolCall },
    /// A tool call finished
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        output: String,
        is_error: bool,
    },
    /// Context was compacted; statistics for the UI
    ContextCompacted {
        tokens_before: usize,
        tokens_after: usize,
        strategy: CompactionStrategyUsed,
        turn: u32,
    },
    /// Current token usage update
    TokenUsage {
        input: u32,
        output: u32,
        /// Tokens served from the provider's prompt cache this turn.
        cache_read: u32,
        /// Tokens written into the provider's prompt cache this turn.
        cache_write: u32,
        /// Running total of cache-read tokens for the session.
        cache_read_total: u32,
        /// Running total of cache-write tokens for the session.
        cache_write_total: u32,
        /// The session's current context window size.
        max_tokens: usize,
    },
    /// The agent has finished processing the current user turn
    TurnComplete,
    /// The turn was cancelled before the model finished; carries whatever
    /// assistant text had streamed so far.
    Aborted { partial_text: String },
    /// A recoverable error occurred
    Error(String),
    /// The todo list was updated
    TodoUpdate(Vec<TodoItem>),
    /// The agent mode was changed
    ModeChanged(AgentMode),
    /// The agent is asking the user a question (id links to QuestionAnswer)
    Question { id: String, questions: Vec<String> },
    /// Answer to a previous Question event
    QuestionAnswer { id: String, answer: String },
    /// An event forwarded verbatim from a child `transfer_task` delegation,
    /// tagged with the child agent's declared name. Arrives interleaved with
    /// the parent's own events on the parent's channel (SPEC_FULL §4.7 step 4).
    Forwarded {
        agent_name: String,
        event: Box<AgentEvent>,
    },
}
