//! Gallery matcher
//!
//! Per-embedding nearest-neighbour search. Each stored embedding is its own
//! candidate, so a person with several faces can appear several times.

use serde::Serialize;

use crate::config::RecognitionConfig;
use crate::engine::Embedding;
use crate::utils::math::confidence_from_distance;

/// A stored `(person, embedding)` pair
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub name: String,
    pub embedding: Embedding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub confidence: i32,
}

pub struct GalleryMatcher {
    distance_cutoff: f32,
    accept_confidence: i32,
}

impl GalleryMatcher {
    pub fn new(config: &RecognitionConfig) -> Self {
        Self {
            distance_cutoff: config.distance_cutoff,
            accept_confidence: config.accept_confidence,
        }
    }

    /// Candidates within the distance cutoff, best first.
    ///
    /// Equal confidences keep gallery order.
    pub fn rank(&self, query: &Embedding, gallery: &[GalleryEntry]) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = gallery
            .iter()
            .filter_map(|entry| {
                let distance = query.distance(&entry.embedding);
                (distance < self.distance_cutoff).then(|| Candidate {
                    name: entry.name.clone(),
                    confidence: confidence_from_distance(distance),
                })
            })
            .collect();

        // sort_by is stable
        candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        candidates
    }

    /// The top candidate, if it clears the acceptance threshold
    pub fn accept<'a>(&self, ranked: &'a [Candidate]) -> Option<&'a Candidate> {
        ranked.first().filter(|best| best.confidence > self.accept_confidence)
    }
}
