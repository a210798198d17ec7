// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! # Remote Content Store
//!
//! File storage in a Git-hosted repository, one commit per write.
//!
//! The layering is: [`host`] speaks the raw contents API of the backing
//! service (or an in-memory stand-in), [`client`] adds transparent payload
//! encryption on top, and [`paths`] fixes the on-repo file layout used by the
//! repository adapter.
//!
//! The backing store offers no transactions and no locking; the only
//! concurrency primitive is the version token every read returns and every
//! write must present. Multi-file operations above this layer are therefore
//! not atomic, by contract.

pub mod client;
pub mod error;
pub mod host;
pub mod paths;

pub use client::ContentStore;
pub use error::{StoreError, StoreResult};
pub use host::{ContentHost, GithubHost, MemoryHost, VersionToken};
pub use paths::EntityPaths;
