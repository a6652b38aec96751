use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, ProductVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ProductCategory {
    #[serde(rename = "anti-chute")]
    AntiChute,
    #[serde(rename = "camouflage")]
    Camouflage,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::AntiChute => "anti-chute",
            ProductCategory::Camouflage => "camouflage",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    /// Derived from the name when omitted.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub category: ProductCategory,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub how_to_use: Option<String>,
    pub expected_results: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub featured: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: Option<i64>,
    pub compare_at_price: Option<i64>,
    pub category: Option<ProductCategory>,
    pub ingredients: Option<Vec<String>>,
    pub benefits: Option<Vec<String>>,
    pub how_to_use: Option<String>,
    pub expected_results: Option<String>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVariantRequest {
    pub name: String,
    pub price: i64,
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct VariantList {
    #[schema(value_type = Vec<ProductVariant>)]
    pub items: Vec<ProductVariant>,
}

/// Lower-case ASCII slug: accents folded, runs of other characters become `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn fold_accent(c: char) -> Vec<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ä' | 'À' | 'Â' | 'Ä' => 'a',
        'ç' | 'Ç' => 'c',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'î' | 'ï' | 'Î' | 'Ï' => 'i',
        'ô' | 'ö' | 'Ô' | 'Ö' => 'o',
        'ù' | 'û' | 'ü' | 'Ù' | 'Û' | 'Ü' => 'u',
        'œ' | 'Œ' => return vec!['o', 'e'],
        other => other,
    };
    vec![folded]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_folds_accents_and_punctuation() {
        assert_eq!(slugify("Sérum Anti-Chute  Intense"), "serum-anti-chute-intense");
        assert_eq!(slugify("  Poudre «Densité» 12g "), "poudre-densite-12g");
        assert_eq!(slugify("Soin Cœur"), "soin-coeur");
    }

    #[test]
    fn category_wire_names() {
        let parsed: ProductCategory = serde_json::from_str("\"anti-chute\"").unwrap();
        assert_eq!(parsed, ProductCategory::AntiChute);
        assert_eq!(ProductCategory::Camouflage.as_str(), "camouflage");
    }
}
