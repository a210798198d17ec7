// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! # Domain Model
//!
//! Entities are attribute maps with generated UUID identity, described by
//! static per-kind metadata ([`EntityKind`]): primary key, filter attributes,
//! the full attribute set, and the sensitive subset encrypted at rest. Every
//! lifecycle transition is captured as a [`DomainEvent`] whose
//! `previous_event_ids` chain records causality across the
//! requested/created/updated/deleted flow.

pub mod codec;
pub mod entity;
pub mod event;

pub use codec::EntityCodec;
pub use entity::{Attributes, Entity, EntityKind};
pub use event::{epoch_timestamp, DomainEvent, EventKind};
