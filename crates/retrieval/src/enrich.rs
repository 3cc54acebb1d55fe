//! Reference enrichment: attach catalogue image and price to cited items.

use futures::future::join_all;
use shopagent_core::reference::{ReferencedItem, UsedContextItem};
use tracing::warn;

use crate::index::{Payload, VectorIndex};
use crate::retriever::Retriever;

fn from_payload(item: &ReferencedItem, payload: &Payload) -> UsedContextItem {
    UsedContextItem {
        id: item.id.clone(),
        image_url: payload
            .get("image")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from),
        price: payload.get("price").and_then(|v| v.as_f64()),
        description: item.description.clone(),
    }
}

/// Look up every reference by parent ASIN, in reference order.
///
/// A reference the index cannot resolve is kept without image and price.
pub async fn enrich_references(
    index: &dyn VectorIndex,
    collection: &str,
    references: &[ReferencedItem],
) -> Vec<UsedContextItem> {
    let lookups = references
        .iter()
        .map(|item| async move { (item, index.lookup_item(collection, &item.id).await) });

    join_all(lookups)
        .await
        .into_iter()
        .map(|(item, found)| match found {
            Ok(Some(payload)) => from_payload(item, &payload),
            Ok(None) => UsedContextItem::bare(item),
            Err(e) => {
                warn!(id = %item.id, error = %e, "Reference lookup failed");
                UsedContextItem::bare(item)
            }
        })
        .collect()
}

impl Retriever {
    /// Enrich references against the items collection.
    pub async fn used_context(&self, references: &[ReferencedItem]) -> Vec<UsedContextItem> {
        enrich_references(
            self.index().as_ref(),
            &self.config().items_collection,
            references,
        )
        .await
    }
}
