//! Keyword search used directly when callers ask for it, and as the
//! forced fallback when the embedding backend is unavailable.

use forge_types::Artifact;
use std::collections::HashMap;

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Score `artifact` against a tokenized query by tf-weighted overlap
/// with its name, description, and tags. Name and tag matches count
/// double: they're a stronger relevance signal than the free-text
/// description.
pub fn score(artifact: &Artifact, query_tokens: &[String]) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let mut haystack: HashMap<String, u32> = HashMap::new();
    for tok in tokenize(&artifact.name) {
        *haystack.entry(tok).or_insert(0) += 2;
    }
    for tok in tokenize(&artifact.description) {
        *haystack.entry(tok).or_insert(0) += 1;
    }
    for tag in artifact.tags() {
        for tok in tokenize(tag) {
            *haystack.entry(tok).or_insert(0) += 2;
        }
    }
    let mut query_tf: HashMap<&str, u32> = HashMap::new();
    for tok in query_tokens {
        *query_tf.entry(tok.as_str()).or_insert(0) += 1;
    }
    let mut total = 0.0f32;
    for (tok, qf) in query_tf {
        if let Some(hf) = haystack.get(tok) {
            total += (*hf as f32) * (qf as f32);
        }
    }
    total
}

/// Tokenize a free-text query for [`score`].
pub fn tokenize_query(query: &str) -> Vec<String> {
    tokenize(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forge_core::ArtifactId;
    use forge_types::ArtifactKind;

    fn artifact(name: &str, description: &str, tags: &[&str]) -> Artifact {
        let mut a = Artifact::new(
            ArtifactId::from("a1"),
            ArtifactKind::Function,
            name,
            description,
            "content",
            Utc::now(),
        );
        a.set_tags(tags.iter().map(|s| s.to_string()));
        a
    }

    #[test]
    fn name_and_tag_matches_outweigh_description() {
        let a = artifact("parse json", "reads a file", &["json"]);
        let b = artifact("read file", "parses json text into a value", &[]);
        let q = tokenize_query("json");
        assert!(score(&a, &q) > score(&b, &q));
    }

    #[test]
    fn no_overlap_scores_zero() {
        let a = artifact("sort list", "sorts a list of numbers", &["sort"]);
        let q = tokenize_query("network request retry");
        assert_eq!(score(&a, &q), 0.0);
    }
}
