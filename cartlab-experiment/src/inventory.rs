use std::collections::BTreeMap;

use cartlab_core::{ProductId, SceneProduct};
use tracing::{info, warn};

/// Owns every scene product for the session, keyed by product ID.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    products: BTreeMap<ProductId, SceneProduct>,
    duplicates: usize,
}

impl Inventory {
    /// Indexes the scene's products and hides all of them.
    ///
    /// When two products share an ID the first one seen is kept; the rest
    /// stay hidden and are dropped from the index.
    pub fn index(all: impl IntoIterator<Item = SceneProduct>) -> Self {
        let mut inventory = Self::default();
        for mut product in all {
            product.deactivate();
            if inventory.products.contains_key(&product.product_id) {
                warn!(
                    product_id = product.product_id,
                    entity = product.id.0,
                    "duplicate product in scene, keeping the first one"
                );
                inventory.duplicates += 1;
                continue;
            }
            inventory.products.insert(product.product_id, product);
        }
        info!(
            products = inventory.products.len(),
            duplicates = inventory.duplicates,
            "scene inventory indexed"
        );
        inventory
    }

    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&SceneProduct> {
        self.products.get(&product_id)
    }

    pub fn get_mut(&mut self, product_id: ProductId) -> Option<&mut SceneProduct> {
        self.products.get_mut(&product_id)
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.contains_key(&product_id)
    }

    /// Hides a product if it exists. Returns whether it was found.
    pub fn deactivate(&mut self, product_id: ProductId) -> bool {
        match self.products.get_mut(&product_id) {
            Some(product) => {
                product.deactivate();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneProduct> {
        self.products.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SceneProduct> {
        self.products.values_mut()
    }

    pub fn active(&self) -> impl Iterator<Item = &SceneProduct> {
        self.products.values().filter(|p| p.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartlab_core::EntityId;

    #[test]
    fn indexing_hides_everything_and_keeps_first_duplicate() {
        let inventory = Inventory::index([
            SceneProduct::new(EntityId(1), 10),
            SceneProduct::new(EntityId(2), 11),
            SceneProduct::new(EntityId(3), 10),
        ]);
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.duplicates(), 1);
        assert_eq!(inventory.get(10).map(|p| p.id), Some(EntityId(1)));
        assert_eq!(inventory.active().count(), 0);
    }

    #[test]
    fn deactivate_reports_misses() {
        let mut inventory = Inventory::index([SceneProduct::new(EntityId(1), 10)]);
        inventory.get_mut(10).unwrap().active = true;
        assert!(inventory.deactivate(10));
        assert!(!inventory.get(10).unwrap().active);
        assert!(!inventory.deactivate(99));
    }
}
