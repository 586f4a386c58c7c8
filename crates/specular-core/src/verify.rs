//! Detached-signature verification against the embedded release key.
//!
//! Signature files hold the base64 text of an Ed25519ph signature over the
//! SHA-512 prehash of the content. Hashing incrementally while the content
//! streams to disk keeps memory flat regardless of file size.

use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha512};

use crate::error::MirrorError;

/// Root of Trust: Ed25519 public key releases are signed with (base64).
/// Corresponds to the private key held by the release pipeline.
pub const TRUST_ANCHOR: &str = "GsMeITxgTXl3sA65DE7j/Q17osyjM4xZQUEJ9mdmxHU=";

/// Decode the embedded trust anchor.
pub(crate) fn trust_anchor() -> VerifyingKey {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(TRUST_ANCHOR)
        .expect("embedded trust anchor is valid base64");
    VerifyingKey::from_bytes(bytes.as_slice().try_into().expect("trust anchor is 32 bytes"))
        .expect("embedded trust anchor is a valid public key")
}

/// Accumulates the content prehash while it streams to a scratch file.
pub(crate) struct StreamVerifier {
    digest: Sha512,
}

impl StreamVerifier {
    pub(crate) fn new() -> Self {
        Self {
            digest: Sha512::new(),
        }
    }

    /// Feed one downloaded chunk into the prehash.
    pub(crate) fn update(&mut self, chunk: &[u8]) {
        self.digest.update(chunk);
    }

    /// Check the accumulated content against the detached signature.
    ///
    /// `signature` is the raw bytes of the downloaded `.sig` resource. Any
    /// defect -- not UTF-8, not base64, wrong length, or a failed check --
    /// collapses into `SignatureVerification` so callers discard the file
    /// without distinguishing why it was unacceptable.
    pub(crate) fn verify(
        self,
        key: &VerifyingKey,
        signature: &[u8],
        name: &str,
    ) -> Result<(), MirrorError> {
        let rejected = || MirrorError::SignatureVerification {
            name: name.to_string(),
        };
        let text = std::str::from_utf8(signature).map_err(|_| rejected())?;
        let raw = base64::engine::general_purpose::STANDARD
            .decode(text.trim())
            .map_err(|_| rejected())?;
        let raw: [u8; 64] = raw.as_slice().try_into().map_err(|_| rejected())?;
        let signature = Signature::from_bytes(&raw);
        key.verify_prehashed(self.digest, None, &signature)
            .map_err(|_| rejected())
    }
}
