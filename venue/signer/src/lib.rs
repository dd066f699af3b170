//! Two signature shapes over a framed wire message `M = varint(len(P)) ‖ P`:
//!
//! - **user-sign**: `raw_sign(hex(M))`, using the long-lived identity key.
//!   Used only to create a session.
//! - **session-sign**: `raw_sign(M)`, using the session's ephemeral key.
//!   Used for every action signed within a session's lifetime.
//!
//! The distinction is the entire contract: signing the hex string with the
//! session key, or signing the raw bytes with the identity key, produces a
//! signature the venue rejects. Callers should treat `user_sign` and
//! `session_sign` as the only two entry points and never hand-roll a third.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("base58 decode error: {0}")]
    Base58(#[from] bs58::decode::Error),
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
    #[error("identity key must decode to exactly 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("signature verification failed")]
    VerificationFailed,
}

pub type Result<T> = std::result::Result<T, SignerError>;

/// The long-lived asymmetric key pair used only for `create_session`.
pub struct IdentityKey {
    signing_key: SigningKey,
}

impl IdentityKey {
    /// Loads an identity key from its base58 private-key encoding (the
    /// `identity_key` configuration value).
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let bytes = bs58::decode(encoded).into_vec()?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SignerError::InvalidKeyLength(bytes.len()))?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// `user-sign(M) = raw_sign(hex(M))`.
    pub fn user_sign(&self, frame: &[u8]) -> [u8; 64] {
        let hex_message = hex::encode(frame);
        self.signing_key.sign(hex_message.as_bytes()).to_bytes()
    }
}

/// A session's ephemeral key pair, generated fresh on every `create_session`.
pub struct EphemeralKey {
    signing_key: SigningKey,
}

impl EphemeralKey {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// `session-sign(M) = raw_sign(M)`.
    pub fn session_sign(&self, frame: &[u8]) -> [u8; 64] {
        self.signing_key.sign(frame).to_bytes()
    }
}

/// Verifies a signature over a message against a public key. Not used by the
/// adapter itself (the venue is the verifier) but exercised by tests acting
/// as a conforming mock verifier for the wire contract.
pub fn verify(public_key_bytes: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> Result<()> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key_bytes).map_err(|_| SignerError::VerificationFailed)?;
    let signature = ed25519_dalek::Signature::from_bytes(signature);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| SignerError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identity() -> IdentityKey {
        let signing_key = SigningKey::generate(&mut OsRng);
        IdentityKey { signing_key }
    }

    fn test_session() -> EphemeralKey {
        EphemeralKey::generate()
    }

    #[test]
    fn user_sign_verifies_against_hex_of_frame() {
        let identity = test_identity();
        let frame = varint::encode_len_prefixed(b"payload-body");
        let sig = identity.user_sign(&frame);
        let hex_message = hex::encode(&frame);
        verify(&identity.public_key_bytes(), hex_message.as_bytes(), &sig).unwrap();
    }

    #[test]
    fn user_sign_does_not_verify_against_raw_frame() {
        let identity = test_identity();
        let frame = varint::encode_len_prefixed(b"payload-body");
        let sig = identity.user_sign(&frame);
        assert!(verify(&identity.public_key_bytes(), &frame, &sig).is_err());
    }

    #[test]
    fn session_sign_verifies_against_raw_frame() {
        let session = test_session();
        let frame = varint::encode_len_prefixed(b"payload-body");
        let sig = session.session_sign(&frame);
        verify(&session.public_key_bytes(), &frame, &sig).unwrap();
    }

    #[test]
    fn session_sign_does_not_verify_against_hex_of_frame() {
        let session = test_session();
        let frame = varint::encode_len_prefixed(b"payload-body");
        let sig = session.session_sign(&frame);
        let hex_message = hex::encode(&frame);
        assert!(verify(&session.public_key_bytes(), hex_message.as_bytes(), &sig).is_err());
    }

    #[test]
    fn tampering_with_leading_length_byte_is_rejected() {
        // Scenario 6: a 17-byte payload frames as 0x11 || P || sig; swapping
        // the leading length byte for 0x10 and resigning must not verify
        // against the original signature.
        let identity = test_identity();
        let payload = vec![7u8; 17];
        let frame = varint::encode_len_prefixed(&payload);
        assert_eq!(frame[0], 0x11);

        let sig = identity.user_sign(&frame);

        let mut tampered = frame.clone();
        tampered[0] = 0x10;
        let hex_tampered = hex::encode(&tampered);
        assert!(verify(&identity.public_key_bytes(), hex_tampered.as_bytes(), &sig).is_err());
    }

    #[test]
    fn wire_frame_length_matches_formula() {
        let payload = vec![0u8; 17];
        let identity = test_identity();
        let frame = varint::encode_len_prefixed(&payload);
        let sig = identity.user_sign(&frame);
        let wire = [frame.as_slice(), &sig].concat();
        assert_eq!(wire.len(), varint::encode(payload.len() as u64).len() + payload.len() + 64);
    }
}
