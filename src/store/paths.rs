// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Path helpers for the per-entity file layout.
//!
//! Relative to the configured branch root:
//!
//! ```text
//! <kind>/data.json                              collection index
//! <kind>/<id>/data.json                         full entity record
//! <kind>/<id>/_events/<epoch-ts>-<event>.json   append-only event log
//! <kind>/<id>.deleted                           logical-deletion sentinel
//! ```

/// Path helpers for one entity kind (e.g. `clients`).
#[derive(Debug, Clone, Copy)]
pub struct EntityPaths {
    kind: &'static str,
}

impl EntityPaths {
    pub const fn new(kind: &'static str) -> Self {
        Self { kind }
    }

    /// Collection index holding one projection per live entity.
    pub fn index(&self) -> String {
        format!("{}/data.json", self.kind)
    }

    /// Full record for one entity.
    pub fn record(&self, id: &str) -> String {
        format!("{}/{id}/data.json", self.kind)
    }

    /// One event-log file. `timestamp` is the decimal epoch string; lexical
    /// order of file names is chronological order at equal precision.
    pub fn event(&self, id: &str, timestamp: &str, event_name: &str) -> String {
        format!("{}/{id}/_events/{timestamp}-{event_name}.json", self.kind)
    }

    /// Empty sentinel marking logical deletion.
    pub fn deleted_sentinel(&self, id: &str) -> String {
        format!("{}/{id}.deleted", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_path_is_kind_scoped() {
        let paths = EntityPaths::new("clients");
        assert_eq!(paths.index(), "clients/data.json");
    }

    #[test]
    fn record_path_nests_under_the_id() {
        let paths = EntityPaths::new("licenses");
        assert_eq!(paths.record("abc-123"), "licenses/abc-123/data.json");
    }

    #[test]
    fn event_path_carries_timestamp_and_name() {
        let paths = EntityPaths::new("clients");
        assert_eq!(
            paths.event("abc", "1706400000.000123", "new_client_requested"),
            "clients/abc/_events/1706400000.000123-new_client_requested.json"
        );
    }

    #[test]
    fn deleted_sentinel_sits_beside_the_record_dir() {
        let paths = EntityPaths::new("pcs");
        assert_eq!(paths.deleted_sentinel("abc"), "pcs/abc.deleted");
    }
}
