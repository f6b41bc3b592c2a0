//! Similarity/keyword search tie-breaking.

use crate::store::ScoredArtifact;
use std::cmp::Ordering;

/// Order two search hits highest-score-first; ties resolved by higher
/// `quality_score`, then higher `usage_count`, then lexicographic
/// `artifact_id`.
pub fn compare(a: &ScoredArtifact, b: &ScoredArtifact) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.artifact
                .quality_score()
                .partial_cmp(&a.artifact.quality_score())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.artifact.usage_count.cmp(&a.artifact.usage_count))
        .then_with(|| a.artifact.artifact_id.0.cmp(&b.artifact.artifact_id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forge_core::ArtifactId;
    use forge_types::{Artifact, ArtifactKind};

    fn hit(id: &str, score: f32, quality: f32, usage: u64) -> ScoredArtifact {
        let mut a = Artifact::new(
            ArtifactId::from(id),
            ArtifactKind::Function,
            id,
            "d",
            "c",
            Utc::now(),
        );
        a.set_quality_score(quality, Utc::now());
        a.usage_count = usage;
        ScoredArtifact { artifact: a, score }
    }

    #[test]
    fn ties_broken_by_quality_then_usage_then_id() {
        let mut hits = vec![
            hit("b", 0.9, 0.5, 1),
            hit("a", 0.9, 0.5, 1),
            hit("c", 0.9, 0.9, 0),
        ];
        hits.sort_by(compare);
        assert_eq!(hits[0].artifact.artifact_id.0, "c");
        assert_eq!(hits[1].artifact.artifact_id.0, "a");
        assert_eq!(hits[2].artifact.artifact_id.0, "b");
    }

    #[test]
    fn higher_score_wins_regardless_of_quality() {
        let mut hits = vec![hit("a", 0.5, 0.9, 5), hit("b", 0.9, 0.1, 0)];
        hits.sort_by(compare);
        assert_eq!(hits[0].artifact.artifact_id.0, "b");
    }
}
