//! The receipt is a discriminated union over outcome kinds: one JSON object
//! tagged by `"kind"`, exhaustively matched at every call site rather than
//! treated as a loosely-typed blob (see spec's note on modeling the source's
//! dynamically-typed receipt as a tagged variant).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Receipt {
    #[serde(rename = "session_created")]
    SessionCreated {
        session_id: String,
        expires_in_seconds: i64,
    },
    #[serde(rename = "order_placed")]
    OrderPlaced { client_order_id: u32 },
    #[serde(rename = "order_cancelled")]
    OrderCancelled { client_order_id: u32 },
    #[serde(rename = "order_not_found")]
    OrderNotFound,
    #[serde(rename = "post_only_would_match")]
    PostOnlyWouldMatch,
    #[serde(rename = "session_expired")]
    SessionExpired,
    #[serde(rename = "auth_failure")]
    AuthFailure { reason: String },
    #[serde(rename = "top_of_book")]
    TopOfBook { best_bid: i64, best_ask: i64 },
    #[serde(rename = "cancel_all_acknowledged")]
    CancelAllAcknowledged,
}
