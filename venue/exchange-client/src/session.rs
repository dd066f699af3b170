//! Session state machine: `None -> Creating -> Live -> Expiring -> None`.
//!
//! `Creating` and `Expiring` are held only for the duration of an in-flight
//! `create_session` call; there is no concurrent access to worry about since
//! the session is owned exclusively by `ExchangeClient` in a single-threaded
//! tick (see the concurrency model).

use chrono::{DateTime, Duration, Utc};
use signer::EphemeralKey;

pub struct LiveSession {
    pub session_id: String,
    pub ephemeral: EphemeralKey,
    pub expiry: DateTime<Utc>,
}

impl LiveSession {
    pub fn is_near_expiry(&self, now: DateTime<Utc>, renew_before: Duration) -> bool {
        now + renew_before > self.expiry
    }
}

#[derive(Default)]
pub enum SessionState {
    #[default]
    None,
    Creating,
    Live(LiveSession),
    Expiring(LiveSession),
}

impl SessionState {
    pub fn live(&self) -> Option<&LiveSession> {
        match self {
            SessionState::Live(s) => Some(s),
            _ => None,
        }
    }
}
