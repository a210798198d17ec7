// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Error taxonomy for remote store operations.
//!
//! Absence, duplication, and version conflicts are distinct variants so that
//! callers can never conflate "the path does not exist" with "the content is
//! corrupted" or "someone else wrote first".

use crate::crypto::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path does not exist in the repository.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create targeted a path that is already populated.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The stored version no longer matches the expected version token.
    #[error("version conflict on {path}: expected {expected}")]
    VersionConflict { path: String, expected: String },

    /// The payload could not be decrypted (wrong key, tampering, truncation).
    #[error("cannot decrypt {path}: {source}")]
    Decryption {
        path: String,
        #[source]
        source: CryptoError,
    },

    /// The payload decrypted but is not the JSON shape the caller expected.
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Transport-level failure talking to the hosting API.
    #[error("store request failed: {0}")]
    Transport(String),
}

impl StoreError {
    /// Whether this error means "the content is effectively absent".
    ///
    /// Find-style operations recover from these locally; everything else
    /// propagates.
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Decryption { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absence_covers_not_found_and_decryption() {
        assert!(StoreError::NotFound("clients/data.json".into()).is_absence());
        assert!(StoreError::Decryption {
            path: "clients/data.json".into(),
            source: CryptoError::Integrity,
        }
        .is_absence());

        assert!(!StoreError::VersionConflict {
            path: "clients/data.json".into(),
            expected: "abc".into(),
        }
        .is_absence());
        assert!(!StoreError::Transport("timeout".into()).is_absence());
    }
}
