// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! # Payload Encryption
//!
//! Symmetric authenticated encryption for file payloads before they leave the
//! process. The byte format is compatible with git-crypt working files, so the
//! backing repository can be inspected with stock tooling:
//!
//! ```text
//! \x00GITCRYPT\x00 | nonce (12 bytes) | AES-256-CTR ciphertext
//! ```
//!
//! The nonce is derived from an HMAC-SHA1 of the plaintext, which makes
//! encryption deterministic: re-encrypting identical content produces an
//! identical blob, and the version-control backend sees no spurious diffs.
//!
//! Key material comes from the `GIT_CRYPT_KEY` environment variable (base64 of a
//! git-crypt key-escrow blob, parsed by [`keyfile`]) and is resolved once at
//! startup.

pub mod cipher;
pub mod keyfile;

pub use cipher::{Cipher, CryptoError, KeyMaterial};
pub use keyfile::parse_key_blob;
