//! `LLMGroupGenerator` (spec §4.F): one call to the provider returns up to
//! `count` candidate groups. Owns prompt construction and response parsing;
//! the provider itself is an injected abstract dependency.

use std::sync::Arc;

use anyhow::Result;

use crate::store::models::{ConnectionType, FeedbackRecord};

use super::parser::{GeneratedGroup, parse_groups_response};
use super::prompt::{LlmFilters, build_prompt};
use super::provider::LlmProvider;

pub struct LlmGroupGenerator {
    provider: Arc<dyn LlmProvider>,
}

impl LlmGroupGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// If the provider call fails, the error propagates unchanged — it is
    /// retried only at the `PipelineGenerator` level, per color, not here
    /// (spec §4.F "Failure semantics").
    pub async fn generate(
        &self,
        api_key: &str,
        filters: &LlmFilters,
        connection_types: &[ConnectionType],
        count: usize,
        good_examples: &[FeedbackRecord],
        bad_examples: &[FeedbackRecord],
    ) -> Result<Vec<GeneratedGroup>> {
        let prompt = build_prompt(filters, connection_types, count, good_examples, bad_examples);
        let raw = self.provider.generate(api_key, &prompt).await?;
        parse_groups_response(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::MockLlmProvider;
    use crate::store::models::Genre;

    #[tokio::test]
    async fn generates_candidate_groups_from_a_mocked_response() {
        let response = r#"{"groups": [{"items": [{"title":"A"},{"title":"B"},{"title":"C"},{"title":"D"}], "connection": "c", "connectionType": "thematic", "explanation": "e"}]}"#;
        let generator = LlmGroupGenerator::new(Arc::new(MockLlmProvider {
            response: response.to_string(),
        }));
        let filters = LlmFilters {
            genre: Genre::new("films").unwrap(),
            year_range: None,
            exclude_connections: Vec::new(),
            target_difficulty: None,
        };
        let groups = generator.generate("key", &filters, &[], 5, &[], &[]).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 4);
    }
}
