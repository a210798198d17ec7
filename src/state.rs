// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

use std::sync::Arc;

use crate::store::{ContentHost, ContentStore, GithubHost};

/// Shared application state: the content store, read-only after startup.
///
/// All write coordination happens through the host's version tokens, so no
/// in-process locking is needed. Generic over the host so tests can run the
/// full API against an in-memory one.
pub struct AppState<H = GithubHost> {
    pub store: Arc<ContentStore<H>>,
}

impl<H> Clone for AppState<H> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<H: ContentHost> AppState<H> {
    pub fn new(store: ContentStore<H>) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}
