//! Music-style catalog verification. Requests MUST serialize with a
//! ≥300 ms inter-request gap to respect upstream rate limits (spec §4.A,
//! §5) — batch throughput tops out around 3 req/s.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::store::models::{Item, VerifiedItem};

use super::catalog::CatalogClient;
use super::{Verifier, best_match};

/// The minimum gap enforced between sequential upstream requests.
pub const MIN_REQUEST_GAP: Duration = Duration::from_millis(300);

const LEADING_ARTICLES: [&str; 3] = ["the ", "a ", "an "];

fn normalize(title: &str) -> String {
    static PARENTHETICAL: once_cell::sync::Lazy<Regex> =
        once_cell::sync::Lazy::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());
    static PUNCTUATION: once_cell::sync::Lazy<Regex> =
        once_cell::sync::Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

    let without_parens = PARENTHETICAL.replace_all(title, "");
    let without_punctuation = PUNCTUATION.replace_all(&without_parens, "");
    let lowered = without_punctuation.trim().to_lowercase();

    for article in LEADING_ARTICLES {
        if let Some(stripped) = lowered.strip_prefix(article) {
            return stripped.to_string();
        }
    }
    lowered
}

pub struct MusicVerifier {
    catalog: Arc<dyn CatalogClient>,
}

impl MusicVerifier {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Verifier for MusicVerifier {
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
        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(MIN_REQUEST_GAP).await;
            }
            out.push(self.verify_one(&item.title, item.year).await);
        }
        out
    }

    fn requires_external_id(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_parentheticals_and_leading_articles() {
        assert_eq!(normalize("The Wall (Remastered)"), "wall");
        assert_eq!(normalize("A Night at the Opera"), "night at the opera");
        assert_eq!(normalize("(What's the Story) Morning Glory?"), "morning glory");
    }

    #[test]
    fn is_case_insensitive_and_trims_whitespace() {
        assert_eq!(normalize("  ABBEY ROAD  "), "abbey road");
    }
}
