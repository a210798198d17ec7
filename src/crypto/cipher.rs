// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Deterministic authenticated encryption of file payloads.
//!
//! AES-256-CTR with a nonce derived from HMAC-SHA1 of the plaintext. The
//! derived nonce doubles as the authentication tag: decryption recomputes it
//! from the recovered plaintext and rejects the blob on mismatch.

use aes::Aes256;
use base64ct::{Base64, Encoding};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::keyfile::parse_key_blob;

type Aes256Ctr = Ctr128BE<Aes256>;
type HmacSha1 = Hmac<Sha1>;

/// Magic bytes prefixed to every encrypted blob.
pub const PREAMBLE: &[u8; 10] = b"\x00GITCRYPT\x00";

/// Length of the nonce embedded after the preamble.
pub const NONCE_LEN: usize = 12;

pub const AES_KEY_LEN: usize = 32;
pub const HMAC_KEY_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key missing: {0}")]
    MissingKey(String),

    #[error("encryption key invalid: {0}")]
    InvalidKey(String),

    #[error("ciphertext malformed: {0}")]
    Format(String),

    #[error("integrity check failed: nonce does not match plaintext HMAC")]
    Integrity,
}

/// AES and HMAC halves of the shared key.
pub struct KeyMaterial {
    pub aes: [u8; AES_KEY_LEN],
    pub hmac: [u8; HMAC_KEY_LEN],
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes never reach logs.
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}

/// Payload cipher, resolved once per worker and shared read-only afterwards.
///
/// When encryption is administratively disabled both operations are the
/// identity function, so callers never branch on the flag themselves.
pub enum Cipher {
    Enabled(Box<KeyMaterial>),
    Disabled,
}

impl Cipher {
    pub fn new(key: KeyMaterial) -> Self {
        Self::Enabled(Box::new(key))
    }

    pub fn disabled() -> Self {
        Self::Disabled
    }

    /// Build a cipher from the process environment.
    ///
    /// `ENCRYPTION_ENABLED` gates the whole mechanism (unset means on);
    /// when enabled, `GIT_CRYPT_KEY` must hold the base64-encoded key-escrow
    /// blob.
    pub fn from_env() -> Result<Self, CryptoError> {
        let enabled = std::env::var(crate::config::ENCRYPTION_ENABLED_ENV)
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if matches!(enabled.as_str(), "false" | "0" | "no") {
            return Ok(Self::Disabled);
        }

        let b64_key = std::env::var(crate::config::CRYPT_KEY_ENV).map_err(|_| {
            CryptoError::MissingKey(format!(
                "{} environment variable not set",
                crate::config::CRYPT_KEY_ENV
            ))
        })?;
        let blob = Base64::decode_vec(b64_key.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("key is not valid base64: {e}")))?;
        Ok(Self::new(parse_key_blob(&blob)?))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    /// Encrypt a payload. Identity when encryption is disabled.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = match self {
            Self::Enabled(key) => key,
            Self::Disabled => return Ok(plaintext.to_vec()),
        };

        let nonce = derive_nonce(&key.hmac, plaintext);

        let mut out = Vec::with_capacity(PREAMBLE.len() + NONCE_LEN + plaintext.len());
        out.extend_from_slice(PREAMBLE);
        out.extend_from_slice(&nonce);

        let mut body = plaintext.to_vec();
        apply_ctr(&key.aes, &nonce, &mut body);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails with [`CryptoError::Integrity`] when the embedded nonce does not
    /// match the HMAC of the recovered plaintext, and with
    /// [`CryptoError::Format`] on a missing or wrong preamble.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = match self {
            Self::Enabled(key) => key,
            Self::Disabled => return Ok(blob.to_vec()),
        };

        if blob.len() < PREAMBLE.len() + NONCE_LEN {
            return Err(CryptoError::Format(format!(
                "blob too short ({} bytes)",
                blob.len()
            )));
        }
        if &blob[..PREAMBLE.len()] != PREAMBLE {
            return Err(CryptoError::Format("missing GITCRYPT preamble".to_string()));
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&blob[PREAMBLE.len()..PREAMBLE.len() + NONCE_LEN]);

        let mut plaintext = blob[PREAMBLE.len() + NONCE_LEN..].to_vec();
        apply_ctr(&key.aes, &nonce, &mut plaintext);

        if derive_nonce(&key.hmac, &plaintext) != nonce {
            return Err(CryptoError::Integrity);
        }

        Ok(plaintext)
    }
}

/// First 12 bytes of HMAC-SHA1 over the plaintext.
fn derive_nonce(hmac_key: &[u8], plaintext: &[u8]) -> [u8; NONCE_LEN] {
    let mut mac = HmacSha1::new_from_slice(hmac_key).expect("HMAC accepts keys of any length");
    mac.update(plaintext);
    let digest = mac.finalize().into_bytes();
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&digest[..NONCE_LEN]);
    nonce
}

/// AES-256-CTR keystream, IV = nonce extended with four zero bytes.
fn apply_ctr(aes_key: &[u8; AES_KEY_LEN], nonce: &[u8; NONCE_LEN], data: &mut [u8]) {
    let mut iv = [0u8; 16];
    iv[..NONCE_LEN].copy_from_slice(nonce);
    let mut cipher = Aes256Ctr::new(aes_key.into(), (&iv).into());
    cipher.apply_keystream(data);
}

#[cfg(test)]
pub(crate) fn test_key() -> KeyMaterial {
    KeyMaterial {
        aes: [7u8; AES_KEY_LEN],
        hmac: [42u8; HMAC_KEY_LEN],
    }
}
