//! In-memory product store.
//!
//! Products live in a [`DashMap`] keyed by id; ids come from an atomic
//! sequence starting at 1 and are never reused.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::product::{Product, ProductCreate, ProductUpdate};

#[derive(Debug)]
pub struct ProductStore {
    products: DashMap<u64, Product>,
    next_id: AtomicU64,
}

impl Default for ProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore {
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn create(&self, item: ProductCreate) -> Product {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let product = Product {
            id,
            name: item.name,
            price: item.price,
            amount: item.amount,
        };
        self.products.insert(id, product.clone());
        product
    }

    /// All products ordered by id.
    pub fn list(&self) -> Vec<Product> {
        let mut out: Vec<Product> = self.products.iter().map(|e| e.value().clone()).collect();
        out.sort_by_key(|p| p.id);
        out
    }

    pub fn get(&self, id: u64) -> Option<Product> {
        self.products.get(&id).map(|e| e.value().clone())
    }

    pub fn update(&self, id: u64, update: ProductUpdate) -> Option<Product> {
        let mut entry = self.products.get_mut(&id)?;
        update.apply(entry.value_mut());
        Some(entry.value().clone())
    }

    pub fn delete(&self, id: u64) -> bool {
        self.products.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> ProductCreate {
        ProductCreate {
            name: name.into(),
            price: 1.0,
            amount: 1,
        }
    }

    #[test]
    fn test_crud_cycle() {
        let store = ProductStore::new();
        let a = store.create(item("a"));
        let b = store.create(item("b"));
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.list(), vec![a.clone(), b.clone()]);

        let updated = store
            .update(
                a.id,
                ProductUpdate {
                    name: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(store.get(a.id).unwrap().name, "renamed");

        assert!(store.delete(a.id));
        assert!(!store.delete(a.id));
        assert!(store.get(a.id).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let store = ProductStore::new();
        let a = store.create(item("a"));
        store.delete(a.id);
        assert_eq!(store.create(item("b")).id, 2);
    }

    #[test]
    fn test_update_missing_product() {
        let store = ProductStore::new();
        assert!(store.update(7, ProductUpdate::default()).is_none());
    }
}
