//! Verifier polymorphism by genre (spec §4.A, §9): one interface, three
//! implementations selected by a factory keyed on `Genre`. Composition,
//! not inheritance.

pub mod catalog;
pub mod factory;
pub mod film;
pub mod music;
pub mod passthrough;

pub use catalog::{CatalogClient, HttpCatalogClient};
pub use factory::VerifierFactory;

use async_trait::async_trait;

use crate::store::models::{Item, VerifiedItem};

#[async_trait]
pub trait Verifier: Send + Sync {
    /// MUST NOT fail the caller: network/parse errors yield
    /// `verified=false, external_id=None`, never a propagated error.
    async fn verify_one(&self, title: &str, year: Option<i32>) -> VerifiedItem;

    /// Preserves input order and length.
    async fn verify_many(&self, items: &[Item]) -> Vec<VerifiedItem> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.verify_one(&item.title, item.year).await);
        }
        out
    }

    /// Resolves spec §9's first Open Question: whether `verified=true`
    /// with a null `external_id` (the pass-through verifier's behavior)
    /// qualifies for pipeline auto-approval. Verifying domains (film,
    /// music) answer `true` here, so `PipelineGenerator` additionally
    /// requires `external_id.is_some()`; the pass-through domain answers
    /// `false`, so `verified` alone is trusted for it.
    fn requires_external_id(&self) -> bool;
}

fn within_year_tolerance(candidate_year: Option<i32>, input_year: Option<i32>) -> bool {
    match (candidate_year, input_year) {
        (Some(c), Some(i)) => (c - i).abs() <= 1,
        _ => false,
    }
}

/// Shared matching policy (spec §4.A): exact normalized-title match within
/// a one-year tolerance wins; failing that, a year-only match within
/// tolerance is accepted when a year was supplied; otherwise unverified.
fn best_match<'a>(
    candidates: &'a [catalog::CatalogCandidate],
    normalized_title: &str,
    year: Option<i32>,
    normalize: impl Fn(&str) -> String,
) -> Option<&'a catalog::CatalogCandidate> {
    let title_match = candidates
        .iter()
        .find(|c| normalize(&c.title) == normalized_title && within_year_tolerance(c.year, year));
    if title_match.is_some() {
        return title_match;
    }
    if year.is_some() {
        return candidates.iter().find(|c| within_year_tolerance(c.year, year));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::CatalogCandidate;

    fn candidate(title: &str, year: Option<i32>) -> CatalogCandidate {
        CatalogCandidate {
            external_id: 1,
            title: title.to_string(),
            year,
        }
    }

    #[test]
    fn matches_title_within_a_year_of_tolerance() {
        let candidates = vec![candidate("the matrix", Some(1999))];
        let found = best_match(&candidates, "the matrix", Some(2000), |s| s.to_lowercase());
        assert!(found.is_some());
    }

    #[test]
    fn falls_back_to_year_only_match() {
        let candidates = vec![candidate("a different title", Some(1999))];
        let found = best_match(&candidates, "the matrix", Some(1999), |s| s.to_lowercase());
        assert!(found.is_some());
    }

    #[test]
    fn no_match_without_a_year_and_without_a_title_hit() {
        let candidates = vec![candidate("a different title", None)];
        let found = best_match(&candidates, "the matrix", None, |s| s.to_lowercase());
        assert!(found.is_none());
    }
}
