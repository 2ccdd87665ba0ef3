//! Variant lookup boundary.
//!
//! The order workflow fetches every variant an order references in one
//! org-scoped batch, then hands the map to the item resolver.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use openb2b_core::OrgId;
use openb2b_products::{Variant, VariantId};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("variant catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to product variants.
pub trait VariantCatalog: Send + Sync {
    /// Fetch the variants with the given ids that belong to `org_id`.
    ///
    /// Ids that do not exist, or that belong to another org, are simply absent
    /// from the returned map.
    fn variants_by_ids(
        &self,
        org_id: OrgId,
        ids: &[VariantId],
    ) -> Result<HashMap<VariantId, Variant>, CatalogError>;
}

impl<C> VariantCatalog for Arc<C>
where
    C: VariantCatalog + ?Sized,
{
    fn variants_by_ids(
        &self,
        org_id: OrgId,
        ids: &[VariantId],
    ) -> Result<HashMap<VariantId, Variant>, CatalogError> {
        (**self).variants_by_ids(org_id, ids)
    }
}

/// In-memory catalog for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryVariantCatalog {
    variants: RwLock<HashMap<VariantId, Variant>>,
    lookups: AtomicUsize,
}

impl InMemoryVariantCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variant.
    pub fn upsert(&self, variant: Variant) -> Result<(), CatalogError> {
        let mut variants = self
            .variants
            .write()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;
        variants.insert(variant.id, variant);
        Ok(())
    }

    pub fn remove(&self, id: VariantId) -> Result<Option<Variant>, CatalogError> {
        let mut variants = self
            .variants
            .write()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;
        Ok(variants.remove(&id))
    }

    /// Number of batch lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl VariantCatalog for InMemoryVariantCatalog {
    fn variants_by_ids(
        &self,
        org_id: OrgId,
        ids: &[VariantId],
    ) -> Result<HashMap<VariantId, Variant>, CatalogError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        let variants = self
            .variants
            .read()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;

        Ok(ids
            .iter()
            .filter_map(|id| variants.get(id))
            .filter(|v| v.org_id == org_id)
            .map(|v| (v.id, v.clone()))
            .collect())
    }
}
