mod agent;
mod compact;
mod confirmation;
mod events;
mod prompts;
mod runtime_context;
mod session;

pub use agent::Agent;
pub use compact::{
    compact_session, compact_session_with_strategy, emergency_compact, smart_truncate,
};
pub use confirmation::{decision_sets_session_approval, denial_result, resolve_gate, Decision, Gate};
pub use events::{AgentEvent, CompactionStrategyUsed};
pub use prompts::system_prompt;
pub use runtime_context::AgentRuntimeContext;
pub use session::{Session, TurnRecord};
