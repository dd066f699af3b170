//! Builds and parses the wire frames of §6: a request body is
//! `varint(len(P)) ‖ P ‖ sig`; a response body is `varint(len(R)) ‖ R` with
//! bytes after `R` ignored.

use signer::{EphemeralKey, IdentityKey};

use crate::error::{ExchangeError, Result};
use crate::receipt::Receipt;

pub fn build_user_signed_frame(payload: &[u8], identity: &IdentityKey) -> Vec<u8> {
    let framed = varint::encode_len_prefixed(payload);
    let sig = identity.user_sign(&framed);
    [framed, sig.to_vec()].concat()
}

pub fn build_session_signed_frame(payload: &[u8], ephemeral: &EphemeralKey) -> Vec<u8> {
    let framed = varint::encode_len_prefixed(payload);
    let sig = ephemeral.session_sign(&framed);
    [framed, sig.to_vec()].concat()
}

pub fn parse_receipt(body: &[u8]) -> Result<Receipt> {
    let r = varint::decode_len_prefixed(body)?;
    Ok(serde_json::from_slice(r)?)
}

/// Maps a decoded receipt to the narrow set of error kinds the adapter
/// raises, or `Ok(receipt)` for an outcome the caller should interpret
/// itself.
pub fn check_receipt(receipt: Receipt) -> Result<Receipt> {
    match &receipt {
        Receipt::SessionExpired => Err(ExchangeError::SessionExpired),
        Receipt::AuthFailure { reason } => Err(ExchangeError::AuthFailure(reason.clone())),
        Receipt::OrderNotFound => Err(ExchangeError::OrderNotFound),
        Receipt::PostOnlyWouldMatch => Err(ExchangeError::PostOnlyWouldMatch),
        _ => Ok(receipt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_frame_length_matches_formula() {
        let identity_bytes = [7u8; 32];
        let identity = IdentityKey::from_bytes(&identity_bytes).unwrap();
        let payload = vec![0u8; 17];
        let frame = build_user_signed_frame(&payload, &identity);
        assert_eq!(
            frame.len(),
            varint::encode(payload.len() as u64).len() + payload.len() + 64
        );
    }

    #[test]
    fn parse_receipt_round_trips_through_len_prefix() {
        let json = serde_json::to_vec(&serde_json::json!({
            "kind": "order_placed",
            "client_order_id": 42,
        }))
        .unwrap();
        let body = varint::encode_len_prefixed(&json);
        let receipt = parse_receipt(&body).unwrap();
        assert!(matches!(receipt, Receipt::OrderPlaced { client_order_id: 42 }));
    }

    #[test]
    fn parse_receipt_ignores_trailing_bytes() {
        let json = serde_json::to_vec(&serde_json::json!({ "kind": "order_not_found" })).unwrap();
        let mut body = varint::encode_len_prefixed(&json);
        body.extend_from_slice(b"garbage-after-receipt");
        let receipt = parse_receipt(&body).unwrap();
        assert!(matches!(receipt, Receipt::OrderNotFound));
    }
}
