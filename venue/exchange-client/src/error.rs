use thiserror::Error;

/// Error kinds from the wire protocol and session/order lifecycle. Only
/// `OrderNotFound` (on cancel) and `PostOnlyWouldMatch` are swallowed by this
/// crate; everything else propagates to the caller per the error-handling
/// design.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] varint::VarintError),

    #[error("auth failure: {0}")]
    AuthFailure(String),

    #[error("session expired")]
    SessionExpired,

    #[error("order not found")]
    OrderNotFound,

    #[error("post-only order would have matched immediately")]
    PostOnlyWouldMatch,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("receipt JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signer error: {0}")]
    Signer(#[from] signer::SignerError),

    #[error("no live session; call ensure_session first")]
    NoSession,

    #[error("repeated session expiry within one tick")]
    RepeatedExpiry,
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
