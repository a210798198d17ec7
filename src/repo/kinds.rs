// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Static metadata for every entity kind the service manages.
//!
//! Each constant describes one collection: its path segment, singular name
//! for event files, the business primary key, the extra index filter
//! attributes, the full attribute set, and which attributes are sealed
//! before persistence.

use crate::domain::EntityKind;

pub static CLIENTS: EntityKind = EntityKind {
    path: "clients",
    singular: "client",
    primary_key: &["email"],
    filter_attributes: &["email"],
    attributes: &["email", "address", "contact", "phone"],
    sensitive_attributes: &["email", "phone"],
};

pub static LICENSES: EntityKind = EntityKind {
    path: "licenses",
    singular: "license",
    primary_key: &["client_id", "product_id", "order_id"],
    filter_attributes: &["client_id", "product_id"],
    attributes: &[
        "client_id",
        "product_id",
        "order_id",
        "license_start_date",
        "license_end_date",
    ],
    sensitive_attributes: &[],
};

pub static INCIDENTS: EntityKind = EntityKind {
    path: "incidents",
    singular: "incident",
    primary_key: &["license_id", "summary"],
    filter_attributes: &["license_id"],
    attributes: &["license_id", "summary", "details", "status"],
    sensitive_attributes: &["details"],
};

pub static ORDERS: EntityKind = EntityKind {
    path: "orders",
    singular: "order",
    primary_key: &["client_id", "order_date"],
    filter_attributes: &["client_id"],
    attributes: &["client_id", "order_date", "total", "status"],
    sensitive_attributes: &[],
};

pub static USERS: EntityKind = EntityKind {
    path: "users",
    singular: "user",
    primary_key: &["email"],
    filter_attributes: &["email"],
    attributes: &["email", "name", "phone"],
    sensitive_attributes: &["email", "phone"],
};

pub static PRODUCTS: EntityKind = EntityKind {
    path: "products",
    singular: "product",
    primary_key: &["name", "version"],
    filter_attributes: &["name"],
    attributes: &["name", "version", "description"],
    sensitive_attributes: &[],
};

pub static PRODUCT_TYPES: EntityKind = EntityKind {
    path: "product_types",
    singular: "product_type",
    primary_key: &["name"],
    filter_attributes: &["name"],
    attributes: &["name", "description"],
    sensitive_attributes: &[],
};

pub static PCS: EntityKind = EntityKind {
    path: "pcs",
    singular: "pc",
    primary_key: &["hostname"],
    filter_attributes: &["hostname"],
    attributes: &["hostname", "mac_address", "description"],
    sensitive_attributes: &["mac_address"],
};

pub static PRELICENSES: EntityKind = EntityKind {
    path: "prelicenses",
    singular: "prelicense",
    primary_key: &["email", "product_id"],
    filter_attributes: &["email", "product_id"],
    attributes: &["email", "product_id", "requested_at"],
    sensitive_attributes: &["email"],
};

/// Every kind the service serves, in route-registration order.
pub static ALL: &[&EntityKind] = &[
    &CLIENTS,
    &LICENSES,
    &INCIDENTS,
    &ORDERS,
    &USERS,
    &PRODUCTS,
    &PRODUCT_TYPES,
    &PCS,
    &PRELICENSES,
];

/// Look a kind up by its collection path segment.
pub fn by_path(path: &str) -> Option<&'static EntityKind> {
    ALL.iter().copied().find(|kind| kind.path == path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_is_reachable_by_path() {
        for kind in ALL {
            assert_eq!(by_path(kind.path).map(|k| k.path), Some(kind.path));
        }
        assert!(by_path("nonexistent").is_none());
    }

    #[test]
    fn primary_key_and_filters_are_attribute_subsets() {
        for kind in ALL {
            for name in kind.primary_key {
                assert!(kind.attributes.contains(name), "{}: {name}", kind.path);
            }
            for name in kind.filter_attributes {
                assert!(kind.attributes.contains(name), "{}: {name}", kind.path);
            }
            for name in kind.sensitive_attributes {
                assert!(kind.attributes.contains(name), "{}: {name}", kind.path);
            }
        }
    }

    #[test]
    fn paths_and_singulars_are_unique() {
        for (i, a) in ALL.iter().enumerate() {
            for b in &ALL[i + 1..] {
                assert_ne!(a.path, b.path);
                assert_ne!(a.singular, b.singular);
            }
        }
    }
}
