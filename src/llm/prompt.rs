//! Prompt assembly: a pure function from `(filters, types, exemplars,
//! count) -> prompt string` (spec §4.F, §9 "no hidden state").

use std::fmt::Write as _;

use crate::store::models::{ConnectionType, Difficulty, FeedbackRecord, Genre};

#[derive(Debug, Clone)]
pub struct LlmFilters {
    pub genre: Genre,
    pub year_range: Option<(i32, i32)>,
    pub exclude_connections: Vec<String>,
    pub target_difficulty: Option<Difficulty>,
}

/// The LLM-facing target-difficulty token; `Hardest` is spelled `expert`
/// here even though the storage layer calls it `hardest` (spec §4.G "the
/// sole vocabulary gap").
fn difficulty_token(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy",
        Difficulty::Medium => "medium",
        Difficulty::Hard => "hard",
        Difficulty::Hardest => "expert",
    }
}

fn role_clause(genre: &Genre) -> String {
    match genre.as_str() {
        "films" => "You are a film expert creating groups of 4 items for a puzzle game.".to_string(),
        "music" => "You are a music expert creating groups of 4 items for a puzzle game.".to_string(),
        "books" => "You are a literature expert creating groups of 4 items for a puzzle game.".to_string(),
        "sports" => "You are a sports expert creating groups of 4 items for a puzzle game.".to_string(),
        other => format!("You are a {other} expert creating groups of 4 items for a puzzle game."),
    }
}

pub fn build_prompt(
    filters: &LlmFilters,
    connection_types: &[ConnectionType],
    count: usize,
    good_examples: &[FeedbackRecord],
    bad_examples: &[FeedbackRecord],
) -> String {
    let mut prompt = String::new();

    writeln!(prompt, "{}", role_clause(&filters.genre)).unwrap();
    writeln!(prompt).unwrap();

    writeln!(prompt, "Hard requirements:").unwrap();
    writeln!(prompt, "- Each group has exactly 4 items.").unwrap();
    writeln!(prompt, "- Items must be real and well-known.").unwrap();
    writeln!(prompt, "- Connections must be novel and satisfying; avoid trivial patterns.").unwrap();
    writeln!(prompt, "- Include a year for each item when it is meaningful.").unwrap();
    writeln!(prompt, "- Produce up to {count} groups.").unwrap();
    writeln!(prompt).unwrap();

    if !connection_types.is_empty() {
        writeln!(prompt, "Active connection types:").unwrap();
        for ct in connection_types {
            write!(prompt, "- {} ({:?}): {}", ct.name, ct.category, ct.description).unwrap();
            if let Some(examples) = &ct.examples {
                if !examples.is_empty() {
                    write!(prompt, " Examples: {}", examples.join(", ")).unwrap();
                }
            }
            writeln!(prompt).unwrap();
        }
        writeln!(prompt).unwrap();
    }

    writeln!(prompt, "Filters:").unwrap();
    if let Some((from, to)) = filters.year_range {
        writeln!(prompt, "- Year range: {from}-{to}.").unwrap();
    }
    if let Some(difficulty) = filters.target_difficulty {
        writeln!(prompt, "- Target difficulty: {}.", difficulty_token(difficulty)).unwrap();
    }
    if !filters.exclude_connections.is_empty() {
        writeln!(
            prompt,
            "- Do not reuse any of these connections: {}.",
            filters.exclude_connections.join("; ")
        )
        .unwrap();
    }
    writeln!(prompt).unwrap();

    if !good_examples.is_empty() {
        writeln!(prompt, "Good examples to imitate (connection -> items):").unwrap();
        for example in good_examples {
            let items: Vec<String> = example.items.iter().map(|i| i.title.clone()).collect();
            writeln!(prompt, "- {} -> [{}]", example.connection, items.join(", ")).unwrap();
        }
        writeln!(prompt).unwrap();
    }

    if !bad_examples.is_empty() {
        writeln!(prompt, "Bad examples to avoid (connection: reason):").unwrap();
        for example in bad_examples {
            let reason = example.rejection_reason.as_deref().unwrap_or("rejected");
            writeln!(prompt, "- {}: {}", example.connection, reason).unwrap();
        }
        writeln!(prompt).unwrap();
    }

    writeln!(
        prompt,
        "Respond with strict JSON only, one top-level key \"groups\", each object having \
         items: [{{title, year}}], connection, connectionType, explanation. Do not include any \
         text outside the JSON object."
    )
    .unwrap();

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_exclusions_and_difficulty() {
        let filters = LlmFilters {
            genre: Genre::new("films").unwrap(),
            year_range: Some((1980, 2020)),
            exclude_connections: vec!["Directed by Spielberg".to_string()],
            target_difficulty: Some(Difficulty::Hardest),
        };
        let prompt = build_prompt(&filters, &[], 5, &[], &[]);
        assert!(prompt.contains("expert"));
        assert!(prompt.contains("Directed by Spielberg"));
        assert!(prompt.contains("1980-2020"));
    }

    #[test]
    fn is_a_pure_function_of_its_inputs() {
        let filters = LlmFilters {
            genre: Genre::new("books").unwrap(),
            year_range: None,
            exclude_connections: Vec::new(),
            target_difficulty: None,
        };
        let a = build_prompt(&filters, &[], 3, &[], &[]);
        let b = build_prompt(&filters, &[], 3, &[], &[]);
        assert_eq!(a, b);
    }
}
