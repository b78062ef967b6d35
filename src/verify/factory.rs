//! Selects a `Verifier` implementation by `Genre` (spec §9: "composition
//! only, no inheritance").

use std::sync::Arc;

use crate::store::models::Genre;

use super::film::FilmVerifier;
use super::music::MusicVerifier;
use super::passthrough::PassthroughVerifier;
use super::{CatalogClient, Verifier};

pub struct VerifierFactory {
    film_catalog: Option<Arc<dyn CatalogClient>>,
    music_catalog: Option<Arc<dyn CatalogClient>>,
}

impl VerifierFactory {
    pub fn new(film_catalog: Option<Arc<dyn CatalogClient>>, music_catalog: Option<Arc<dyn CatalogClient>>) -> Self {
        Self {
            film_catalog,
            music_catalog,
        }
    }

    /// Falls back to the pass-through verifier for any genre without a
    /// configured catalog client (books, sports, and any genre added later
    /// via a `PipelineConfig` row with no matching catalog).
    pub fn for_genre(&self, genre: &Genre) -> Arc<dyn Verifier> {
        match genre.as_str() {
            "films" => match &self.film_catalog {
                Some(catalog) => Arc::new(FilmVerifier::new(catalog.clone())),
                None => Arc::new(PassthroughVerifier),
            },
            "music" => match &self.music_catalog {
                Some(catalog) => Arc::new(MusicVerifier::new(catalog.clone())),
                None => Arc::new(PassthroughVerifier),
            },
            _ => Arc::new(PassthroughVerifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_passthrough_without_a_catalog() {
        let factory = VerifierFactory::new(None, None);
        let verifier = factory.for_genre(&Genre::new("films").unwrap());
        assert!(!verifier.requires_external_id());
    }

    #[test]
    fn unknown_genres_get_passthrough() {
        let factory = VerifierFactory::new(None, None);
        let verifier = factory.for_genre(&Genre::new("sports").unwrap());
        assert!(!verifier.requires_external_id());
    }
}
