// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Named entry points over the generic adapter, one per entity kind.

use super::adapter::EntityAdapter;
use super::kinds;
use crate::store::{ContentHost, ContentStore};

/// Repository facade: hands out kind-bound adapters over one store.
pub struct EntityRepo<'a, H> {
    store: &'a ContentStore<H>,
}

impl<'a, H: ContentHost> EntityRepo<'a, H> {
    pub fn new(store: &'a ContentStore<H>) -> Self {
        Self { store }
    }

    pub fn clients(&self) -> EntityAdapter<'a, H> {
        EntityAdapter::new(self.store, &kinds::CLIENTS)
    }

    pub fn licenses(&self) -> EntityAdapter<'a, H> {
        EntityAdapter::new(self.store, &kinds::LICENSES)
    }

    pub fn incidents(&self) -> EntityAdapter<'a, H> {
        EntityAdapter::new(self.store, &kinds::INCIDENTS)
    }

    pub fn orders(&self) -> EntityAdapter<'a, H> {
        EntityAdapter::new(self.store, &kinds::ORDERS)
    }

    pub fn users(&self) -> EntityAdapter<'a, H> {
        EntityAdapter::new(self.store, &kinds::USERS)
    }

    pub fn products(&self) -> EntityAdapter<'a, H> {
        EntityAdapter::new(self.store, &kinds::PRODUCTS)
    }

    pub fn product_types(&self) -> EntityAdapter<'a, H> {
        EntityAdapter::new(self.store, &kinds::PRODUCT_TYPES)
    }

    pub fn pcs(&self) -> EntityAdapter<'a, H> {
        EntityAdapter::new(self.store, &kinds::PCS)
    }

    pub fn prelicenses(&self) -> EntityAdapter<'a, H> {
        EntityAdapter::new(self.store, &kinds::PRELICENSES)
    }

    /// Adapter for a kind addressed by its collection path, as HTTP routes
    /// do.
    pub fn for_path(&self, path: &str) -> Option<EntityAdapter<'a, H>> {
        kinds::by_path(path).map(|kind| EntityAdapter::new(self.store, kind))
    }
}
