//! Request suggestions derived from catalog, availability and recent demand.

use std::collections::{BTreeMap, HashMap};

use bookkeeper_types::{
    Actor, Book, BookCategory, BookId, BookRequest, ClusterId, PublicationStatus,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::{InventoryEngine, ensure_permitted};
use crate::error::InventoryError;
use crate::store::InventoryStore;

/// Categories in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    HighDemand,
    SequenceGap,
    Discovery,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub book_id: BookId,
    pub label: String,
    pub title: String,
    pub category: RecommendationCategory,
    pub reason: String,
    /// Copies held across the cluster's locations.
    pub available: u32,
    /// Copies asked for in the recent window; set for `high_demand` only.
    pub requested_total: Option<u32>,
}

/// Suggestions for one cluster.
///
/// `recent_requests` must be newest first; only the first
/// `recommendation_window` of them count as demand. Inactive books are never
/// suggested.
pub fn recommend(
    catalog: &[Book],
    availability: &BTreeMap<BookId, u32>,
    recent_requests: &[BookRequest],
    config: &EngineConfig,
) -> Vec<Recommendation> {
    let mut books: Vec<&Book> = catalog.iter().filter(|b| b.is_active).collect();
    books.sort_by_key(|b| b.sort_order);
    let available = |id: &BookId| availability.get(id).copied().unwrap_or(0);

    let mut demand: HashMap<BookId, u32> = HashMap::new();
    for request in recent_requests.iter().take(config.get_recommendation_window()) {
        let total = demand.entry(request.book_id).or_default();
        *total = total.saturating_add(request.quantity_requested);
    }

    let mut picks = Vec::new();

    let mut hot: Vec<(&Book, u32)> = books
        .iter()
        .filter_map(|book| demand.get(&book.id).map(|total| (*book, *total)))
        .filter(|(book, _)| available(&book.id) <= config.get_high_demand_threshold())
        .collect();
    // Stable sort keeps catalog order among equal totals.
    hot.sort_by(|a, b| b.1.cmp(&a.1));
    for (book, total) in hot {
        let stock = available(&book.id);
        picks.push(suggestion(
            book,
            RecommendationCategory::HighDemand,
            format!("{total} copies requested recently, {stock} available"),
            stock,
            Some(total),
        ));
    }

    let gap = books
        .iter()
        .filter(|b| b.category == BookCategory::MainSequence && available(&b.id) == 0)
        .filter_map(|b| b.book_number.map(|n| (n, *b)))
        .min_by_key(|(n, _)| *n);
    if let Some((_, book)) = gap {
        picks.push(suggestion(
            book,
            RecommendationCategory::SequenceGap,
            "Lowest main sequence book with no copies in stock".to_string(),
            0,
            None,
        ));
    }

    let discoveries: Vec<Recommendation> = books
        .iter()
        .filter(|b| {
            b.publication_status == PublicationStatus::Published
                && !demand.contains_key(&b.id)
                && available(&b.id) == 0
                && !picks.iter().any(|p: &Recommendation| p.book_id == b.id)
        })
        .take(config.get_discovery_limit())
        .map(|book| {
            suggestion(
                book,
                RecommendationCategory::Discovery,
                "Published but not yet requested in this cluster".to_string(),
                0,
                None,
            )
        })
        .collect();
    picks.extend(discoveries);

    let mut seen = Vec::new();
    picks.retain(|r| {
        if seen.contains(&r.book_id) {
            false
        } else {
            seen.push(r.book_id);
            true
        }
    });
    picks.truncate(config.get_max_recommendations());
    picks
}

fn suggestion(
    book: &Book,
    category: RecommendationCategory,
    reason: String,
    available: u32,
    requested_total: Option<u32>,
) -> Recommendation {
    Recommendation {
        book_id: book.id,
        label: book.label(),
        title: book.title.clone(),
        category,
        reason,
        available,
        requested_total,
    }
}

impl<S: InventoryStore> InventoryEngine<S> {
    /// [`recommend`] over the cluster's current stock and request history.
    pub fn recommendations(
        &self,
        actor: &Actor,
        cluster_id: ClusterId,
        catalog: &[Book],
    ) -> Result<Vec<Recommendation>, InventoryError> {
        ensure_permitted(actor)?;
        let availability = self.availability(actor, cluster_id)?;
        let requests = self.cluster_requests(actor, cluster_id, None)?;
        let picks = recommend(catalog, &availability, &requests, self.config());
        debug!(cluster = %cluster_id, count = picks.len(), "recommendations computed");
        Ok(picks)
    }
}
