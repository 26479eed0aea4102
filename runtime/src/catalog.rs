//! Product catalog — the fixed list of pages to watch.
//!
//! A catalog is loaded once at startup and is read-only afterwards. Order matters:
//! products are visited, and observations reported, in catalog order.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One product page to watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable short code (e.g. "ram").
    pub key: String,
    /// Unique human-readable name; observations are recorded under it.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Product page address.
    pub url: String,
}

impl Product {
    pub fn new(key: &str, display_name: &str, url: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Validated, ordered product catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Build a catalog, rejecting empty lists, duplicate keys or names, and
    /// non-http(s) URLs.
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        if products.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut keys = HashSet::new();
        let mut names = HashSet::new();
        for product in &products {
            if !keys.insert(product.key.as_str()) {
                return Err(CatalogError::DuplicateKey(product.key.clone()));
            }
            if !names.insert(product.display_name.as_str()) {
                return Err(CatalogError::DuplicateName(product.display_name.clone()));
            }
            let invalid = |reason: String| CatalogError::InvalidUrl {
                key: product.key.clone(),
                url: product.url.clone(),
                reason,
            };
            let parsed = url::Url::parse(&product.url).map_err(|e| invalid(e.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
            }
        }

        Ok(Self { products })
    }

    /// Parse a JSON array of `{ "key", "name", "url" }` objects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Self::new(products)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The catalog shipped with the binary, used when no file is configured.
    pub fn builtin() -> Self {
        Self {
            products: vec![
                Product::new(
                    "manette",
                    "Manette Xbox Rouge Sans Fil",
                    "https://www.amazon.fr/Manette-Xbox-rouge-sans-Fil/dp/B08SRMPBRF/",
                ),
                Product::new(
                    "ram",
                    "RAM Timetec 32GB",
                    "https://www.amazon.fr/Timetec-PC4-25600-Unbuffered-Compatible-Notebook/dp/B098TYN671/",
                ),
                Product::new(
                    "housse",
                    "Housse eXtremeRate Grip",
                    "https://www.amazon.fr/eXtremeRate-Antid%C3%A9rapante-Protection-Ergonomique-Capuchons-Gris/dp/B08LZB4LKR/",
                ),
                Product::new(
                    "kit_charge",
                    "Kit charge Xbox Series",
                    "https://www.amazon.fr/Xbox-Play-Charge-Kit-voor/dp/B08FCXLB8Z/",
                ),
            ],
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Product;
    type IntoIter = std::slice::Iter<'a, Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.iter()
    }
}
