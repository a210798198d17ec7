// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Content store client: named-file access with transparent encryption.
//!
//! Every write encrypts through the configured [`Cipher`] before it reaches
//! the host; every read decrypts after retrieval. Callers above this layer
//! only ever see plaintext JSON strings plus the host's version tokens.

use tracing::error;

use super::error::{StoreError, StoreResult};
use super::host::{ContentHost, VersionToken};
use crate::crypto::Cipher;

/// Encrypting wrapper over a [`ContentHost`].
///
/// Shared read-only across requests; all coordination happens through the
/// host's version tokens, never through in-process locking.
pub struct ContentStore<H> {
    host: H,
    cipher: Cipher,
}

impl<H: ContentHost> ContentStore<H> {
    pub fn new(host: H, cipher: Cipher) -> Self {
        Self { host, cipher }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Read and decrypt a file.
    ///
    /// Decryption failures are logged here and surface as
    /// [`StoreError::Decryption`]; find-style callers treat them as absence
    /// (see [`StoreError::is_absence`]), which deliberately masks corruption
    /// as not-found.
    pub async fn get(&self, path: &str) -> StoreResult<(String, VersionToken)> {
        let (blob, token) = self.host.get_raw(path).await?;

        let plaintext = self.cipher.decrypt(&blob).map_err(|source| {
            error!(path, %source, "cannot decrypt stored content");
            StoreError::Decryption {
                path: path.to_string(),
                source,
            }
        })?;

        let content = String::from_utf8(plaintext).map_err(|e| StoreError::Decode {
            path: path.to_string(),
            source: serde_json::Error::io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e,
            )),
        })?;

        Ok((content, token))
    }

    /// Encrypt and create a file.
    pub async fn create(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> StoreResult<VersionToken> {
        let blob = self.encrypt(path, content)?;
        self.host.create_raw(path, &blob, message).await
    }

    /// Encrypt and overwrite a file under its current version token.
    pub async fn update(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected: &VersionToken,
    ) -> StoreResult<VersionToken> {
        let blob = self.encrypt(path, content)?;
        self.host.update_raw(path, &blob, message, expected).await
    }

    /// Remove a file. Reads the current version token first, so the delete
    /// itself is still conflict-checked by the host.
    pub async fn delete(&self, path: &str, message: &str) -> StoreResult<()> {
        let (_, token) = self.host.get_raw(path).await?;
        self.host.delete_raw(path, message, &token).await
    }

    fn encrypt(&self, path: &str, content: &str) -> StoreResult<Vec<u8>> {
        self.cipher
            .encrypt(content.as_bytes())
            .map_err(|source| {
                error!(path, %source, "cannot encrypt content");
                StoreError::Decryption {
                    path: path.to_string(),
                    source,
                }
            })
    }

    /// Field-level encryption for sensitive attribute values. Produces a
    /// base64 string safe to embed in JSON documents.
    pub fn seal_value(&self, value: &str) -> StoreResult<String> {
        use base64ct::{Base64, Encoding};
        if !self.cipher.is_enabled() {
            return Ok(value.to_string());
        }
        let blob = self.encrypt("<attribute>", value)?;
        Ok(Base64::encode_string(&blob))
    }

    /// Inverse of [`seal_value`](Self::seal_value). Values that do not parse
    /// as a sealed blob are passed through unchanged, so records written with
    /// encryption disabled stay readable after it is turned on.
    pub fn open_value(&self, value: &str) -> String {
        use base64ct::{Base64, Encoding};
        if !self.cipher.is_enabled() {
            return value.to_string();
        }
        let Ok(blob) = Base64::decode_vec(value) else {
            return value.to_string();
        };
        match self.cipher.decrypt(&blob) {
            Ok(plaintext) => match String::from_utf8(plaintext) {
                Ok(text) => text,
                Err(_) => value.to_string(),
            },
            Err(_) => value.to_string(),
        }
    }
}
