use crate::domain::ports::ClockRef;
use crate::domain::session::{ConversationState, Session};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Idle sessions are discarded when read after this long without a
/// transition.
pub const SESSION_TTL_MS: i64 = 10 * 60 * 1000;

/// Per-sender conversation state with lazy expiry.
///
/// Expiry is evaluated on read rather than by a background sweep, so idle
/// sessions hold no timer resources. `Clone` shares the underlying map.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    clock: ClockRef,
}

impl SessionStore {
    pub fn new(clock: ClockRef) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Current state for `sender`; an unknown or expired sender is back at
    /// the main menu with no auxiliary data.
    pub async fn get(&self, sender: &str) -> ConversationState {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(sender) {
            if self.clock.now_millis() - session.touched_ms > SESSION_TTL_MS {
                sessions.remove(sender);
            } else {
                return session.state.clone();
            }
        }
        ConversationState::default()
    }

    /// Records a transition, stamping the current time.
    pub async fn set(&self, sender: &str, state: ConversationState) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            sender.to_string(),
            Session {
                state,
                touched_ms: self.clock.now_millis(),
            },
        );
    }
}
