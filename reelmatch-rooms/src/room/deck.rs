use std::collections::HashSet;

use crate::catalog::{CatalogError, CatalogProvider};
use crate::room::filters::MergedQuery;

/// Upper bound on catalog pages fetched for one deck.
pub const MAX_PAGES: u32 = 3;

/// Builds a room deck of at most `target` movie ids, in catalog order.
///
/// Fails only when the first page cannot be fetched. A short deck (provider
/// ran out of pages, hit the page ceiling, or errored after the first page) is
/// returned as is; swiping simply ends sooner.
pub async fn build(
    catalog: &dyn CatalogProvider,
    query: &MergedQuery,
    target: usize,
) -> Result<Vec<i64>, CatalogError> {
    let mut deck = Vec::with_capacity(target);
    let mut seen = HashSet::new();
    let mut page = 1;

    while deck.len() < target && page <= MAX_PAGES {
        let result = match catalog.discover(query, page).await {
            Ok(result) => result,
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                tracing::warn!(page, error = %e, "catalog page failed, keeping partial deck");
                break;
            }
        };

        for movie in result.results {
            if deck.len() >= target {
                break;
            }
            if seen.insert(movie.id) {
                deck.push(movie.id);
            }
        }

        if page >= result.total_pages {
            break;
        }
        page += 1;
    }

    if deck.len() < target {
        tracing::debug!(size = deck.len(), target, "deck under-filled");
    }
    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCatalog;

    fn ids(range: std::ops::Range<i64>) -> Vec<i64> {
        range.collect()
    }

    #[tokio::test]
    async fn stops_at_target() {
        let catalog = MockCatalog::with_pages(vec![ids(1..21), ids(21..41)]);
        let deck = build(&catalog, &MergedQuery::default(), 10).await.unwrap();

        assert_eq!(deck, ids(1..11));
        assert_eq!(catalog.discover_pages(), vec![1]);
    }

    #[tokio::test]
    async fn pages_until_target_is_reached() {
        let catalog = MockCatalog::with_pages(vec![ids(1..21), ids(21..41)]);
        let deck = build(&catalog, &MergedQuery::default(), 30).await.unwrap();

        assert_eq!(deck, ids(1..31));
        assert_eq!(catalog.discover_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn never_reads_past_the_page_ceiling() {
        let pages = (0..5).map(|p| ids(p * 5 + 1..p * 5 + 6)).collect();
        let catalog = MockCatalog::with_pages(pages);
        let deck = build(&catalog, &MergedQuery::default(), 30).await.unwrap();

        assert_eq!(deck.len(), 15);
        assert_eq!(catalog.discover_pages(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stops_when_provider_runs_out() {
        let catalog = MockCatalog::with_pages(vec![ids(1..8)]);
        let deck = build(&catalog, &MergedQuery::default(), 20).await.unwrap();

        assert_eq!(deck, ids(1..8));
        assert_eq!(catalog.discover_pages(), vec![1]);
    }

    #[tokio::test]
    async fn provider_failure_keeps_partial_deck() {
        let catalog = MockCatalog::with_pages(vec![ids(1..6), ids(6..11)]).failing_from_page(2);
        let deck = build(&catalog, &MergedQuery::default(), 10).await.unwrap();

        assert_eq!(deck, ids(1..6));
    }

    #[tokio::test]
    async fn first_page_failure_is_an_error() {
        let catalog = MockCatalog::with_pages(vec![ids(1..6)]).failing_from_page(1);
        let result = build(&catalog, &MergedQuery::default(), 10).await;

        assert!(matches!(result, Err(CatalogError::Status { status: 500, .. })));
        assert_eq!(catalog.discover_pages(), vec![1]);
    }

    #[tokio::test]
    async fn empty_catalog_is_an_empty_deck() {
        let catalog = MockCatalog::with_pages(vec![]);
        let deck = build(&catalog, &MergedQuery::default(), 10).await.unwrap();

        assert!(deck.is_empty());
    }

    #[tokio::test]
    async fn same_query_same_deck() {
        let catalog = MockCatalog::with_pages(vec![vec![9, 3, 7], vec![1, 3, 8]]);
        let query = MergedQuery {
            genres: "18".into(),
            ..MergedQuery::default()
        };

        let first = build(&catalog, &query, 10).await.unwrap();
        let second = build(&catalog, &query, 10).await.unwrap();

        assert_eq!(first, vec![9, 3, 7, 1, 8]);
        assert_eq!(first, second);
        assert!(catalog.discover_queries().iter().all(|q| q == &query));
    }
}
