// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! # Repository Layer
//!
//! The [`EntityAdapter`] implements the full CRUD-plus-events lifecycle for
//! one entity kind over the content store; [`kinds`] holds the static
//! metadata for every kind served, and [`EntityRepo`] is the named facade
//! the API layer uses.

pub mod adapter;
pub mod facade;
pub mod kinds;

pub use adapter::EntityAdapter;
pub use facade::EntityRepo;
