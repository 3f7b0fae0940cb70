//! Evidence strength and confidence for a grounded answer.
use std::sync::Arc;

use medcopilot_core::config::ScoringSettings;
use medcopilot_core::error::{Error, Result};
use medcopilot_core::traits::Embedder;
use medcopilot_core::types::EvidenceLevel;

const REGULATORY_TERMS: &[&str] = &["fda", "ema", "approved", "approval", "cleared", "guideline"];
const OUTCOME_TERMS: &[&str] = &["outcome", "mortality", "survival", "efficacy", "remission", "recovery"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvidenceScore {
    pub level: EvidenceLevel,
    /// Best cosine similarity between the answer and a supporting chunk.
    pub similarity: f32,
    /// `similarity` as a 0..=100 percentage, floored at 0.
    pub coverage: u8,
}

impl EvidenceScore {
    pub fn none() -> Self { Self { level: EvidenceLevel::None, similarity: 0.0, coverage: 0 } }
}

pub struct EvidenceScorer {
    embedder: Arc<dyn Embedder>,
    settings: ScoringSettings,
}

impl EvidenceScorer {
    pub fn new(embedder: Arc<dyn Embedder>, settings: ScoringSettings) -> Self { Self { embedder, settings } }

    /// `s >= strong` → STRONG, `s >= partial` → PARTIAL, otherwise NONE.
    pub fn classify(&self, similarity: f32) -> EvidenceLevel {
        if similarity >= self.settings.strong_threshold {
            EvidenceLevel::Strong
        } else if similarity >= self.settings.partial_threshold {
            EvidenceLevel::Partial
        } else {
            EvidenceLevel::None
        }
    }

    /// Score `answer` against the chunks it was generated from. The answer
    /// and chunks are embedded together and the best match counts.
    pub fn score(&self, answer: &str, chunks: &[String]) -> Result<EvidenceScore> {
        if chunks.is_empty() || answer.trim().is_empty() {
            return Ok(EvidenceScore::none());
        }
        let mut batch = Vec::with_capacity(chunks.len() + 1);
        batch.push(answer.to_string());
        batch.extend(chunks.iter().cloned());
        let vectors = self.embedder.embed_batch(&batch).map_err(|e| Error::Embedding(format!("{e:#}")))?;
        let Some((answer_vec, chunk_vecs)) = vectors.split_first() else {
            return Err(Error::Embedding("embedder returned no vectors".into()));
        };
        let similarity = chunk_vecs.iter().map(|v| cosine(answer_vec, v)).fold(f32::MIN, f32::max);
        let coverage = (similarity.max(0.0) * 100.0).round().min(100.0) as u8;
        Ok(EvidenceScore { level: self.classify(similarity), similarity, coverage })
    }
}

/// Cosine similarity; zero vectors score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

/// Coarse completeness heuristic, independent of the evidence level: base
/// 60, +15 with three or more supporting chunks, +10 each for regulatory and
/// outcome language, capped at 95.
pub fn confidence(answer: &str, supporting_chunks: usize) -> u8 {
    let words: Vec<String> = answer
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    let mentions = |terms: &[&str]| words.iter().any(|w| terms.iter().any(|t| keyword_match(w, t)));
    let mut score = 60u8;
    if supporting_chunks >= 3 { score += 15; }
    if mentions(REGULATORY_TERMS) { score += 10; }
    if mentions(OUTCOME_TERMS) { score += 10; }
    score.min(95)
}

/// Acronyms must match a whole word; longer keywords also match inflected
/// forms ("guidelines", "outcomes") by prefix.
fn keyword_match(word: &str, keyword: &str) -> bool {
    if keyword.len() <= 3 { word == keyword } else { word.starts_with(keyword) }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unused;
    impl Embedder for Unused {
        fn dim(&self) -> usize { 1 }
        fn max_len(&self) -> usize { 1 }
        fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("not expected")
        }
    }

    fn scorer() -> EvidenceScorer { EvidenceScorer::new(Arc::new(Unused), ScoringSettings::default()) }

    #[test]
    fn thresholds_are_inclusive() {
        let s = scorer();
        assert_eq!(s.classify(0.45), EvidenceLevel::Strong);
        assert_eq!(s.classify(0.449_999), EvidenceLevel::Partial);
        assert_eq!(s.classify(0.20), EvidenceLevel::Partial);
        assert_eq!(s.classify(0.199_999), EvidenceLevel::None);
        assert_eq!(s.classify(-0.3), EvidenceLevel::None);
    }

    #[test]
    fn nothing_to_compare_is_none_without_embedding() {
        let s = scorer();
        assert_eq!(s.score("answer", &[]).expect("score"), EvidenceScore::none());
        assert_eq!(s.score("  ", &["chunk".to_string()]).expect("score"), EvidenceScore::none());
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn confidence_is_keyword_driven_and_capped() {
        assert_eq!(confidence("Rest and fluids.", 0), 60);
        assert_eq!(confidence("Rest and fluids.", 3), 75);
        assert_eq!(confidence("FDA approved; mortality fell.", 2), 80);
        assert_eq!(confidence("Guideline: SURVIVAL improved.", 4), 95);
        assert_eq!(confidence("Approvals pending.", 0), 70);
    }

    #[test]
    fn confidence_counts_inflected_keywords() {
        assert_eq!(confidence("Patient outcomes improved under current guidelines.", 0), 80);
        assert_eq!(confidence("Only FDA-cleared devices.", 0), 70);
        assert_eq!(confidence("Severe anaemia and haematoma.", 0), 60);
    }
}
