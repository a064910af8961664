//! Product resource types.

use serde::{Deserialize, Serialize};

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub amount: i64,
}

/// Fields required to create a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub price: f64,
    pub amount: i64,
}

impl ProductCreate {
    pub fn is_valid(&self) -> bool {
        self.price >= 0.0 && self.amount >= 0
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub amount: Option<i64>,
}

impl ProductUpdate {
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(amount) = self.amount {
            product.amount = amount;
        }
    }
}

/// Create request body: one product or a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductPayload {
    Single(ProductCreate),
    Batch(Vec<ProductCreate>),
}

impl ProductPayload {
    pub fn into_items(self) -> Vec<ProductCreate> {
        match self {
            ProductPayload::Single(p) => vec![p],
            ProductPayload::Batch(items) => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_single_or_batch() {
        let single: ProductPayload =
            serde_json::from_str(r#"{"name":"pen","price":1.5,"amount":3}"#).unwrap();
        assert!(matches!(single, ProductPayload::Single(_)));

        let batch: ProductPayload = serde_json::from_str(
            r#"[{"name":"pen","price":1.5,"amount":3},{"name":"ink","price":2,"amount":1}]"#,
        )
        .unwrap();
        assert_eq!(batch.into_items().len(), 2);
    }

    #[test]
    fn test_negative_values_are_invalid() {
        let mut p = ProductCreate {
            name: "pen".into(),
            price: 1.0,
            amount: 1,
        };
        assert!(p.is_valid());
        p.price = -0.5;
        assert!(!p.is_valid());
        p.price = 1.0;
        p.amount = -1;
        assert!(!p.is_valid());
    }

    #[test]
    fn test_partial_update() {
        let mut product = Product {
            id: 1,
            name: "pen".into(),
            price: 1.0,
            amount: 2,
        };
        let update: ProductUpdate = serde_json::from_str(r#"{"price": 2.5}"#).unwrap();
        update.apply(&mut product);

        assert_eq!(product.name, "pen");
        assert_eq!(product.price, 2.5);
        assert_eq!(product.amount, 2);
    }
}
