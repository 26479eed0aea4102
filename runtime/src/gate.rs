//! Change gate — persist an observation only when the price really moved.

use crate::error::StoreError;
use crate::price::{Price, PRICE_TOLERANCE_CENTS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamped price fact for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub product_name: String,
    pub price: Price,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(product_name: &str, price: Price, observed_at: DateTime<Utc>) -> Self {
        Self {
            product_name: product_name.to_string(),
            price,
            observed_at,
        }
    }
}

/// Read access to the latest stored price per product.
pub trait PriceHistory {
    fn latest_price(&self, product_name: &str) -> Result<Option<Price>, StoreError>;
}

/// In-memory history: the most recent observation for the name wins.
impl PriceHistory for [Observation] {
    fn latest_price(&self, product_name: &str) -> Result<Option<Price>, StoreError> {
        Ok(self
            .iter()
            .filter(|o| o.product_name == product_name)
            .max_by_key(|o| o.observed_at)
            .map(|o| o.price))
    }
}

/// Whether `new_price` should be stored for `product_name`.
///
/// True when there is no stored price, or when it differs from the latest one
/// by strictly more than one cent.
pub fn should_persist<H: PriceHistory + ?Sized>(
    history: &H,
    product_name: &str,
    new_price: Price,
) -> Result<bool, StoreError> {
    Ok(match history.latest_price(product_name)? {
        None => true,
        Some(stored) => stored.distance(new_price) > PRICE_TOLERANCE_CENTS,
    })
}

/// Split a batch into observations to persist and names left unchanged.
///
/// Every observation is judged on its own against `history`.
pub fn partition_changed<H: PriceHistory + ?Sized>(
    history: &H,
    batch: Vec<Observation>,
) -> Result<(Vec<Observation>, Vec<Observation>), StoreError> {
    let mut changed = Vec::new();
    let mut unchanged = Vec::new();
    for observation in batch {
        if should_persist(history, &observation.product_name, observation.price)? {
            changed.push(observation);
        } else {
            unchanged.push(observation);
        }
    }
    Ok((changed, unchanged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn p(cents: u64) -> Price {
        Price::from_cents(cents)
    }

    #[test]
    fn test_no_history_persists() {
        let history: Vec<Observation> = Vec::new();
        assert!(should_persist(history.as_slice(), "ProductA", p(1)).unwrap());
    }

    #[test]
    fn test_tolerance_boundary() {
        let t0 = Utc::now();
        let history = vec![Observation::new("ProductA", p(1_999), t0)];
        let h = history.as_slice();

        assert!(!should_persist(h, "ProductA", p(1_999)).unwrap());
        assert!(!should_persist(h, "ProductA", p(2_000)).unwrap());
        assert!(!should_persist(h, "ProductA", p(1_998)).unwrap());
        assert!(should_persist(h, "ProductA", p(2_001)).unwrap());
        assert!(should_persist(h, "ProductA", p(1_997)).unwrap());
    }

    #[test]
    fn test_latest_observation_is_the_reference() {
        let t0 = Utc::now();
        let history = vec![
            Observation::new("ProductA", p(5_000), t0 + Duration::hours(1)),
            Observation::new("ProductA", p(4_000), t0),
        ];
        // Compared against 50.00, the newer entry, not 40.00.
        assert!(!should_persist(history.as_slice(), "ProductA", p(5_000)).unwrap());
        assert!(should_persist(history.as_slice(), "ProductA", p(4_000)).unwrap());
    }

    #[test]
    fn test_other_products_do_not_interfere() {
        let history = vec![Observation::new("ProductB", p(1_000), Utc::now())];
        assert!(should_persist(history.as_slice(), "ProductA", p(1_000)).unwrap());
    }

    #[test]
    fn test_batch_is_judged_per_product() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(5);
        let history = vec![
            Observation::new("A", p(1_000), t0),
            Observation::new("B", p(2_000), t0),
            Observation::new("C", p(3_000), t0),
        ];
        // An unchanged product first must not hide later changes.
        let batch = vec![
            Observation::new("A", p(1_000), t1),
            Observation::new("B", p(2_500), t1),
            Observation::new("C", p(3_001), t1),
            Observation::new("D", p(999), t1),
        ];
        let (changed, unchanged) = partition_changed(history.as_slice(), batch).unwrap();
        let names: Vec<&str> = changed.iter().map(|o| o.product_name.as_str()).collect();
        assert_eq!(names, ["B", "D"]);
        assert_eq!(unchanged.len(), 2);
    }
}
