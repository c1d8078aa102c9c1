//! Offline embedding provider built from character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use deepsearch_core::AppResult;
use std::collections::HashMap;

const MODEL_NAME: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "who", "how",
];

/// Deterministic, content-aware embeddings for local and offline use.
///
/// Words are hashed both whole and as character trigrams into a fixed
/// number of buckets, then the vector is scaled to unit length. Not
/// semantic, but texts sharing vocabulary land close together, which is
/// enough for development collections and tests.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = bucket(&trigram, 37, self.dimensions);
                embedding[idx] += (*freq as f32).sqrt();
            }

            embedding[bucket(word, 31, self.dimensions)] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

fn bucket(token: &str, multiplier: u64, dimensions: usize) -> usize {
    let hash = token
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(b as u64));
    (hash % dimensions as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cosine_similarity;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_embed_batch_unit_vectors() {
        let provider = TrigramProvider::new(384);
        let texts = vec![
            "Paris is the capital of France".to_string(),
            "Milvus is a vector database".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = TrigramProvider::new(128);
        let a = provider.embed("deterministic test").await.unwrap();
        let b = provider.embed("deterministic test").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = TrigramProvider::new(384);
        let query = provider.embed("What is the capital of France?").await.unwrap();
        let relevant = provider.embed("Paris is the capital of France.").await.unwrap();
        let unrelated = provider.embed("Pasta needs salted boiling water.").await.unwrap();

        assert!(cosine_similarity(&query, &relevant) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = TrigramProvider::new(64);
        let embedding = provider.embed("").await.unwrap();
        assert_eq!(embedding.len(), 64);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_multibyte_text() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("Gamedex é um aplicativo 🎮 brasileiro").await.unwrap();
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
