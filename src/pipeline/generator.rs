//! `PipelineGenerator` (spec §4.G): given colors needing more supply,
//! drives the LLM generator, then the verifier, then persists approved
//! groups.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use crate::llm::{LlmFilters, LlmGroupGenerator};
use crate::store::dao::traits::group::{GroupStore, SaveOutcome};
use crate::store::dao::traits::{ConnectionTypeStore, FeedbackStore};
use crate::store::models::{Color, Genre, GroupStatus, NewGroup, Source};
use crate::verify::VerifierFactory;

use super::error::PipelineErrorEntry;
use super::result::GroupsByColor;
use super::stage::{Stage, StageSink, emit};

#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    pub groups_generated: u32,
    pub groups_saved: u32,
    pub by_color: GroupsByColor,
    pub errors: Vec<PipelineErrorEntry>,
}

pub struct PipelineGenerator {
    llm: Arc<LlmGroupGenerator>,
    verifiers: Arc<VerifierFactory>,
    group_store: Arc<dyn GroupStore>,
    connection_types: Arc<dyn ConnectionTypeStore>,
    feedback: Arc<dyn FeedbackStore>,
    exemplar_limit: i64,
}

impl PipelineGenerator {
    pub fn new(
        llm: Arc<LlmGroupGenerator>,
        verifiers: Arc<VerifierFactory>,
        group_store: Arc<dyn GroupStore>,
        connection_types: Arc<dyn ConnectionTypeStore>,
        feedback: Arc<dyn FeedbackStore>,
        exemplar_limit: i64,
    ) -> Self {
        Self {
            llm,
            verifiers,
            group_store,
            connection_types,
            feedback,
            exemplar_limit,
        }
    }

    pub async fn generate(
        &self,
        api_key: &str,
        colors_needed: &HashSet<Color>,
        groups_per_color: usize,
        genre: &Genre,
        stage_sink: Option<&StageSink>,
    ) -> anyhow::Result<GenerationOutcome> {
        let active_types = self.connection_types.list_active(genre).await?;
        let good_examples = self.feedback.accepted_examples(self.exemplar_limit, genre).await?;
        let bad_examples = self.feedback.rejected_examples(self.exemplar_limit, genre).await?;

        let (existing, _) = self
            .group_store
            .list(crate::store::dao::traits::group::GroupFilter {
                status: Some(GroupStatus::Approved),
                genre: Some(genre.clone()),
                ..Default::default()
            })
            .await?;
        let mut exclude_connections: HashSet<String> = existing.into_iter().map(|g| g.connection).collect();

        let mut outcome = GenerationOutcome::default();
        let verifier = self.verifiers.for_genre(genre);

        for color in Color::ALL {
            if !colors_needed.contains(&color) {
                continue;
            }
            emit(stage_sink, Stage::generating(color));

            let filters = LlmFilters {
                genre: genre.clone(),
                year_range: None,
                exclude_connections: exclude_connections.iter().cloned().collect(),
                target_difficulty: Some(color.difficulty()),
            };

            let candidates = match self
                .llm
                .generate(api_key, &filters, &active_types, groups_per_color, &good_examples, &bad_examples)
                .await
            {
                Ok(candidates) => candidates,
                Err(err) => {
                    outcome
                        .errors
                        .push(PipelineErrorEntry::generation_failed(format!("{color:?}: {err}")));
                    continue;
                }
            };
            outcome.groups_generated += candidates.len() as u32;
            outcome.by_color.entry(color).generated += candidates.len() as u32;

            for candidate in candidates {
                let verified_items = verifier.verify_many(&candidate.items).await;
                let all_verified = verified_items
                    .iter()
                    .all(|v| v.verified && (!verifier.requires_external_id() || v.external_id.is_some()));

                if !all_verified || verified_items.len() != 4 {
                    outcome
                        .errors
                        .push(PipelineErrorEntry::unverified(format!(
                            "unverified items, skipping candidate for connection \"{}\"",
                            candidate.connection
                        )));
                    continue;
                }

                let items: [_; 4] = match verified_items.try_into() {
                    Ok(items) => items,
                    Err(_) => continue,
                };

                let new_group = NewGroup {
                    items,
                    connection: candidate.connection.clone(),
                    connection_type: candidate.connection_type.clone(),
                    color,
                    status: GroupStatus::Approved,
                    genre: genre.clone(),
                    metadata: json!({ "explanation": candidate.explanation }),
                    source: Source::System,
                };

                match self.group_store.save(new_group).await {
                    Ok(SaveOutcome::Saved(group)) => {
                        outcome.groups_saved += 1;
                        outcome.by_color.entry(color).saved += 1;
                        exclude_connections.insert(group.connection);
                    }
                    Ok(SaveOutcome::DuplicateConnection) => {
                        outcome
                            .errors
                            .push(PipelineErrorEntry::generation_failed(format!(
                                "duplicate connection \"{}\", skipping",
                                candidate.connection
                            )));
                    }
                    Err(err) => {
                        outcome.errors.push(PipelineErrorEntry::storage_error(None, &err));
                    }
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::MockLlmProvider;
    use crate::store::dao::mock::{MockConnectionTypeStore, MockFeedbackStore, MockGroupStore};

    fn sample_response() -> String {
        r#"{"groups": [{"items": [{"title":"A"},{"title":"B"},{"title":"C"},{"title":"D"}], "connection": "c1", "connectionType": "thematic", "explanation": "e"}]}"#
            .to_string()
    }

    #[tokio::test]
    async fn saves_verified_groups_under_the_requested_color() {
        let llm = Arc::new(LlmGroupGenerator::new(Arc::new(MockLlmProvider {
            response: sample_response(),
        })));
        let verifiers = Arc::new(VerifierFactory::new(None, None));
        let group_store: Arc<dyn GroupStore> = Arc::new(MockGroupStore::new());
        let connection_types: Arc<dyn ConnectionTypeStore> = Arc::new(MockConnectionTypeStore::new());
        let feedback: Arc<dyn FeedbackStore> = Arc::new(MockFeedbackStore::new());

        let generator = PipelineGenerator::new(llm, verifiers, group_store.clone(), connection_types, feedback, 5);
        let genre = Genre::new("sports").unwrap();
        let mut colors_needed = HashSet::new();
        colors_needed.insert(Color::Yellow);

        let outcome = generator
            .generate("key", &colors_needed, 5, &genre, None)
            .await
            .unwrap();

        assert_eq!(outcome.groups_generated, 1);
        assert_eq!(outcome.groups_saved, 1);
        assert_eq!(outcome.by_color.yellow.saved, 1);
    }
}
