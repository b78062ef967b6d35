//! Film-style catalog verification. Requests may be issued in parallel
//! (spec §4.A, §5).

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::store::models::{Item, VerifiedItem};

use super::catalog::CatalogClient;
use super::{Verifier, best_match};

fn normalize(title: &str) -> String {
    title.trim().to_lowercase()
}

pub struct FilmVerifier {
    catalog: Arc<dyn CatalogClient>,
}

impl FilmVerifier {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Verifier for FilmVerifier {
    async fn verify_one(&self, title: &str, year: Option<i32>) -> VerifiedItem {
        let normalized = normalize(title);
        match self.catalog.search(title).await {
            Ok(candidates) => match best_match(&candidates, &normalized, year, normalize) {
                Some(candidate) => VerifiedItem {
                    title: title.to_string(),
                    year,
                    external_id: Some(candidate.external_id),
                    verified: true,
                },
                None => VerifiedItem {
                    title: title.to_string(),
                    year,
                    external_id: None,
                    verified: false,
                },
            },
            Err(_) => VerifiedItem {
                title: title.to_string(),
                year,
                external_id: None,
                verified: false,
            },
        }
    }

    async fn verify_many(&self, items: &[Item]) -> Vec<VerifiedItem> {
        join_all(items.iter().map(|item| self.verify_one(&item.title, item.year))).await
    }

    fn requires_external_id(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::catalog::{CatalogCandidate, MockCatalogClient};

    #[tokio::test]
    async fn verifies_a_title_and_year_match() {
        let catalog = MockCatalogClient {
            candidates: vec![CatalogCandidate {
                external_id: 42,
                title: "The Matrix".to_string(),
                year: Some(1999),
            }],
        };
        let verifier = FilmVerifier::new(Arc::new(catalog));
        let result = verifier.verify_one("the matrix", Some(1999)).await;
        assert!(result.verified);
        assert_eq!(result.external_id, Some(42));
    }

    #[tokio::test]
    async fn leaves_an_unmatched_title_unverified() {
        let catalog = MockCatalogClient { candidates: vec![] };
        let verifier = FilmVerifier::new(Arc::new(catalog));
        let result = verifier.verify_one("nonexistent film", None).await;
        assert!(!result.verified);
        assert!(result.external_id.is_none());
    }

    #[tokio::test]
    async fn verify_many_preserves_order_and_length() {
        let catalog = MockCatalogClient { candidates: vec![] };
        let verifier = FilmVerifier::new(Arc::new(catalog));
        let items = vec![
            Item { title: "A".to_string(), year: None },
            Item { title: "B".to_string(), year: None },
        ];
        let results = verifier.verify_many(&items).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "A");
        assert_eq!(results[1].title, "B");
    }
}
