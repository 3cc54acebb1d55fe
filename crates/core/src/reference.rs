//! Product references cited by an answer.

use serde::{Deserialize, Serialize};

/// A product the final answer cites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedItem {
    /// Product parent ASIN
    pub id: String,

    /// Short display text
    pub description: String,
}

/// A referenced item enriched with catalogue data for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsedContextItem {
    pub id: String,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub description: String,
}

impl UsedContextItem {
    /// An entry with no catalogue data attached.
    pub fn bare(item: &ReferencedItem) -> Self {
        Self {
            id: item.id.clone(),
            image_url: None,
            price: None,
            description: item.description.clone(),
        }
    }
}
