use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use conclave_model::Message;
use conclave_tools::events::TranscriptEntry;
use uuid::Uuid;

/// One saved turn in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub role: String,
    pub content: String,
}

/// One ordered item of a `Session` (SPEC_FULL §3): either a plain `Message`,
/// a nested conversation produced by delegation, or a compacted summary.
#[derive(Debug, Clone)]
pub enum SessionItem {
    Message(Message),
    SubSession(SubSession),
    Summary(String),
}

/// A nested conversation produced by a `transfer_task` delegation. Recorded
/// as a single item in the parent `Session` — the parent's own `messages`
/// already carries the synthesized tool-result text, so this is the
/// structural record of what actually happened inside the child.
#[derive(Debug, Clone)]
pub struct SubSession {
    pub agent_name: String,
    pub transcript: Vec<TranscriptEntry>,
}

/// Branch metadata recorded on a `Session` produced by [`Session::branch`].
#[derive(Debug, Clone)]
pub struct SessionParent {
    pub parent_id: String,
    pub split_position: usize,
}

/// In-memory conversation session.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    /// Approximate total token count for the current message list
    pub token_count: usize,
    /// Maximum context tokens (set from model config / provider limits)
    pub max_tokens: usize,
    /// Maximum output tokens the provider will generate in one completion;
    /// subtracted from `max_tokens` when computing the input budget.
    pub max_output_tokens: usize,
    /// Estimated token cost of the tool schemas + dynamic context block sent
    /// with every request but never pushed onto `messages`.
    pub schema_overhead: usize,
    /// Running total of cache-read tokens reported by the provider this session.
    pub cache_read_total: u32,
    /// Running total of cache-write tokens reported by the provider this session.
    pub cache_write_total: u32,
    /// Correction factor applied to the chars/4 token estimate, calibrated
    /// against the provider's actual reported input token counts.
    pub calibration_factor: f32,
    /// Set once the user answers a confirmation with `Decision::ApproveSession`.
    /// Bypasses the confirmation gate for every subsequent tool call this
    /// session (monotonic — never reset back to `false`).
    pub tools_approved: bool,
    /// Ordered log mirroring `messages`, plus any `SubSession`/`Summary`
    /// items that have no individual `Message` counterpart (SPEC_FULL §3).
    pub items: Vec<SessionItem>,
    /// Set when this session was produced by [`Session::branch`].
    pub parent: Option<SessionParent>,
}

impl Session {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            token_count: 0,
            max_tokens,
            max_output_tokens: 0,
            schema_overhead: 0,
            cache_read_total: 0,
            cache_write_total: 0,
            calibration_factor: 1.0,
            tools_approved: false,
            items: Vec::new(),
            parent: None,
        }
    }

    /// Tokens available for input: the context window minus the reserved
    /// output budget. Never underflows; 0 means "no budget left at all".
    pub fn input_budget(&self) -> usize {
        self.max_tokens.saturating_sub(self.max_output_tokens)
    }

    /// Accumulate cache-read/cache-write tokens reported by the provider.
    pub fn add_cache_usage(&mut self, read: u32, write: u32) {
        self.cache_read_total += read;
        self.cache_write_total += write;
    }

    /// Nudge `calibration_factor` towards the ratio of actual-to-estimated
    /// input tokens for the turn just completed. Exponentially smoothed so a
    /// single noisy turn can't swing the factor too far; clamped to a sane
    /// range so a near-zero estimate can't blow it up.
    pub fn update_calibration(&mut self, actual_input: u32, estimated: usize) {
        if estimated == 0 {
            return;
        }
        let observed = actual_input as f32 / estimated as f32;
        let observed = observed.clamp(0.25, 4.0);
        self.calibration_factor = self.calibration_factor * 0.8 + observed * 0.2;
    }

    pub fn push(&mut self, msg: Message) {
        self.token_count += msg.approx_tokens();
        self.items.push(SessionItem::Message(msg.clone()));
        self.messages.push(msg);
    }

    pub fn push_many(&mut self, msgs: impl IntoIterator<Item = Message>) {
        for m in msgs { self.push(m); }
    }

    /// Append a completed delegation's transcript as a `SubSession` item
    /// (SPEC_FULL §4.7 step 5). The corresponding tool-result `Message`
    /// pushed onto `messages` separately is what the model actually sees;
    /// this is the structural record of what happened inside the child.
    pub fn append_subsession(&mut self, agent_name: String, transcript: Vec<TranscriptEntry>) {
        self.items.push(SessionItem::SubSession(SubSession { agent_name, transcript }));
    }

    /// Deep-clone items `[0, position)` into a new `Session` (SPEC_FULL §4.8
    /// `Branch`). `messages` is independently truncated to match so the
    /// branch never shares mutable state with its source. Accumulators are
    /// recomputed from scratch rather than copied.
    pub fn branch(&self, position: usize) -> Session {
        let position = position.min(self.items.len());
        let items: Vec<SessionItem> = self.items[..position].to_vec();
        let message_count = items
            .iter()
            .filter(|i| matches!(i, SessionItem::Message(_)))
            .count();
        let messages: Vec<Message> = self.messages[..message_count.min(self.messages.len())].to_vec();

        let mut branched = Session::new(self.max_tokens);
        branched.max_output_tokens = self.max_output_tokens;
        branched.tools_approved = self.tools_approved;
        branched.messages = messages;
        branched.items = items;
        branched.recalculate_tokens();
        branched.parent = Some(SessionParent {
            parent_id: self.id.clone(),
            split_position: position,
        });
        branched
    }

    /// Fraction of context window consumed (0.0–1.0)
    pub fn context_fraction(&self) -> f32 {
        if self.max_tokens == 0 { return 0.0; }
        (self.token_count as f32) / (self.max_tokens as f32)
    }

    pub fn is_near_limit(&self, threshold: f32) -> bool {
        self.context_fraction() >= threshold
    }

    /// Recalculate token count from scratch (call after compaction).
    pub fn recalculate_tokens(&mut self) {
        self.token_count = self.messages.iter().map(|m| m.approx_tokens()).sum();
    }

    /// Rebuild `items` as a flat `Message` mirror of the current `messages`.
    /// Compaction rewrites `messages` directly (summarising across whatever
    /// `SubSession` items existed in that span), so any pre-compaction
    /// `SubSession`/`Summary` items are collapsed along with the messages
    /// they summarised. Call after any compaction pass.
    pub fn resync_items_from_messages(&mut self) {
        self.items = self.messages.iter().cloned().map(SessionItem::Message).collect();
    }

    /// Replace the message list and recalculate token count (for resubmit /
    /// edit / compaction). Any `SubSession`/`Summary` items that carried no
    /// `Message` counterpart are dropped along with the rest of the old log —
    /// callers that rewrite `messages` wholesale are replacing the
    /// conversation, not editing around existing delegations.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.items = messages.iter().cloned().map(SessionItem::Message).collect();
        self.messages = messages;
        self.recalculate_tokens();
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
