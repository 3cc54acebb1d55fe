//! Retrieved context and its text rendering for the agent.

use serde::{Deserialize, Serialize};

use crate::index::{ScoredPoint, payload_text};

/// A catalogue item returned by hybrid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedItem {
    /// Parent ASIN
    pub id: String,
    pub description: String,
    pub average_rating: Option<f64>,
    pub score: f32,
}

impl RetrievedItem {
    /// Read an item from a point payload. Points without `parent_asin` are skipped.
    pub fn from_point(point: &ScoredPoint) -> Option<Self> {
        Some(Self {
            id: point.payload_str("parent_asin")?.to_string(),
            description: payload_text(&point.payload, "description").unwrap_or_default(),
            average_rating: point.payload.get("average_rating").and_then(|v| v.as_f64()),
            score: point.score,
        })
    }
}

/// A customer review returned by review search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedReview {
    /// Parent ASIN of the reviewed item
    pub id: String,
    pub text: String,
    pub score: f32,
}

impl RetrievedReview {
    pub fn from_point(point: &ScoredPoint) -> Option<Self> {
        Some(Self {
            id: point.payload_str("parent_asin")?.to_string(),
            text: payload_text(&point.payload, "text").unwrap_or_default(),
            score: point.score,
        })
    }
}

fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(r) if r.fract() == 0.0 => format!("{r:.1}"),
        Some(r) => r.to_string(),
        None => "N/A".to_string(),
    }
}

/// One line per item: `- ID: {id}, rating: {rating}, description: {description}`.
pub fn format_items(items: &[RetrievedItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "- ID: {}, rating: {}, description: {}\n",
                item.id,
                format_rating(item.average_rating),
                item.description
            )
        })
        .collect()
}

/// One line per review: `- ID: {id}, review: {text}`.
pub fn format_reviews(reviews: &[RetrievedReview]) -> String {
    reviews
        .iter()
        .map(|review| format!("- ID: {}, review: {}\n", review.id, review.text))
        .collect()
}
