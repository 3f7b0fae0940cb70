//! Deterministic token-hash embedder for tests and offline development.
//!
//! Each lowercase alphanumeric token (minus a few stop words) is hashed into
//! one bucket; the bag of buckets is L2-normalised. Similarity is therefore
//! lexical overlap, which is enough to exercise retrieval end to end.
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use medcopilot_core::traits::Embedder;

const STOP_WORDS: [&str; 14] = [
    "the", "and", "for", "with", "are", "was", "were", "this", "that", "from", "into", "its", "has", "have",
];

pub struct HashingEmbedder { dim: usize }

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lower = text.to_lowercase();
        for token in lower.split(|c: char| !c.is_alphanumeric()) {
            if token.chars().count() < 3 || STOP_WORDS.contains(&token) { continue; }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            // weight in [0.5, 1.0] so buckets are not all equal
            let weight = 0.5 + 0.5 * (((h >> 32) as u32) as f32 / u32::MAX as f32);
            v[idx] += weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let e = HashingEmbedder::new(256);
        let a = e.embed_one("Sepsis protocol: lactate!");
        let b = e.embed_one("sepsis PROTOCOL lactate");
        assert!((cosine(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn unrelated_texts_are_far_apart() {
        let e = HashingEmbedder::new(4096);
        let a = e.embed_one("sepsis bundle antibiotics lactate");
        let b = e.embed_one("orthopedic cast removal schedule");
        assert!(cosine(&a, &b) < 0.3);
    }

    #[test]
    fn text_without_tokens_embeds_to_zero() {
        let e = HashingEmbedder::new(8);
        assert!(e.embed_one("a an of").iter().all(|x| *x == 0.0));
    }
}
