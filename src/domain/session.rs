/// Conversation position for one sender, including any state-specific data.
///
/// The candidate lists hold the guardian's registered student ids in the
/// order they were shown, so a numeric reply can be resolved by index.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConversationState {
    #[default]
    MainMenu,
    AwaitingId,
    AwaitingPin {
        student_id: String,
    },
    SelectingStudent {
        candidates: Vec<String>,
    },
    RemovingStudent {
        candidates: Vec<String>,
    },
}

/// A sender's stored session: state plus the last-transition timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub state: ConversationState,
    pub touched_ms: i64,
}
