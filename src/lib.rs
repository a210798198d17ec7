// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Licdata Server - License Data CRUD Service
//!
//! This crate provides CRUD endpoints for license-management entities
//! (clients, licenses, incidents, orders, and so on) persisted as files in a
//! Git-hosted repository through the GitHub contents API. Every write is a
//! commit; blob SHAs provide optimistic concurrency, and sensitive content
//! is encrypted at rest in the git-crypt format.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `crypto` - git-crypt-compatible encryption
//! - `domain` - entities, kinds, and lifecycle events
//! - `repo` - CRUD-plus-events repository adapter
//! - `store` - content hosts and the encrypting store client

pub mod api;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod repo;
pub mod state;
pub mod store;
