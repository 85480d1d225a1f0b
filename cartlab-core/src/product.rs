use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Numeric product identifier shared by the price list, the trial
/// schedule and scene products.
pub type ProductId = i32;

/// One row of the price list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub price: f32,
}

/// Product ID to price. The first record seen for an ID wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    prices: BTreeMap<ProductId, f32>,
}

impl PriceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record unless its ID is already known. Returns whether the
    /// record was kept.
    pub fn insert(&mut self, record: ProductRecord) -> bool {
        if self.prices.contains_key(&record.product_id) {
            return false;
        }
        self.prices.insert(record.product_id, record.price);
        true
    }

    #[must_use]
    pub fn price(&self, product_id: ProductId) -> Option<f32> {
        self.prices.get(&product_id).copied()
    }

    /// Shelf label text: two decimals, `0.00` for unpriced products.
    #[must_use]
    pub fn label(&self, product_id: ProductId) -> String {
        format!("{:.2}", self.price(product_id).unwrap_or(0.0))
    }

    /// Priced IDs in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.prices.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<ProductRecord> for PriceTable {
    fn from_iter<I: IntoIterator<Item = ProductRecord>>(iter: I) -> Self {
        let mut table = Self::new();
        for record in iter {
            table.insert(record);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_price_wins() {
        let table: PriceTable = [
            ProductRecord { product_id: 4, price: 1.5 },
            ProductRecord { product_id: 4, price: 9.0 },
        ]
        .into_iter()
        .collect();
        assert_eq!(table.len(), 1);
        assert_eq!(table.price(4), Some(1.5));
    }

    #[test]
    fn labels_use_two_decimals() {
        let table: PriceTable = [ProductRecord { product_id: 1, price: 3.0 }].into_iter().collect();
        assert_eq!(table.label(1), "3.00");
        assert_eq!(table.label(2), "0.00");
    }
}
