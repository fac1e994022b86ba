//! Sentence embedding backends
//!
//! The default backend is Harmonic Token Projection (HTP), a deterministic,
//! training-free embedding based on:
//! "Harmonic Token Projection: A Vocabulary-Free, Training-Free,
//!  Deterministic, and Reversible Embedding Methodology"
//! https://arxiv.org/html/2511.20665
//!
//! HTP needs no model files, so a corpus can be indexed out of the box.
//! With the `onnx` feature a local sentence-transformer can be used instead
//! (see `onnx.rs`); both produce 384-dimensional, L2-normalized vectors.

use std::f64::consts::PI;
use std::path::Path;

use crate::config::EmbedderKind;
use crate::error::Result;

/// Embedding dimension (2 * number of coprime moduli)
/// Using 192 moduli → 384 dimensions (matching common transformer dims)
pub const EMBEDDING_DIM: usize = 384;

/// Number of coprime moduli for harmonic projection
const NUM_MODULI: usize = EMBEDDING_DIM / 2;

/// Maximum token length (Unicode code points)
const MAX_TOKEN_LENGTH: usize = 64;
/// Coprime moduli for modular decomposition
/// Using first NUM_MODULI primes for guaranteed coprimality
static COPRIME_MODULI: &[u64] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71,
    73, 79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151,
    157, 163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223, 227, 229, 233,
    239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307, 311, 313, 317,
    331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419,
    421, 431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503,
    509, 521, 523, 541, 547, 557, 563, 569, 571, 577, 587, 593, 599, 601, 607,
    613, 617, 619, 631, 641, 643, 647, 653, 659, 661, 673, 677, 683, 691, 701,
    709, 719, 727, 733, 739, 743, 751, 757, 761, 769, 773, 787, 797, 809, 811,
    821, 823, 827, 829, 839, 853, 857, 859, 863, 877, 881, 883, 887, 907, 911,
    919, 929, 937, 941, 947, 953, 967, 971, 977, 983, 991, 997, 1009, 1013,
    1019, 1021, 1031, 1033, 1039, 1049, 1051, 1061, 1063, 1069, 1087, 1091,
    1093, 1097, 1103, 1109, 1117, 1123, 1129, 1151, 1153, 1163, 1171, 1181,
];

/// Turns sentences into fixed-size vectors.
///
/// An index remembers the `name` and `dimension` of the embedder that built
/// it; querying with a different embedder is refused.
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Load the embedder selected by configuration.
pub fn load_embedder(kind: EmbedderKind, model_dir: &Path) -> Result<Box<dyn Embedder>> {
    match kind {
        EmbedderKind::Htp => Ok(Box::new(HtpEmbedder::new())),
        #[cfg(feature = "onnx")]
        EmbedderKind::Onnx => Ok(Box::new(super::onnx::OnnxEmbedder::load(model_dir)?)),
        #[cfg(not(feature = "onnx"))]
        EmbedderKind::Onnx => Err(crate::error::SearchError::Embedding(format!(
            "onnx embedder requested (model dir {}) but this build lacks the `onnx` feature",
            model_dir.display()
        ))),
    }
}

/// HTP embedder
///
/// Mean-pools harmonic projections of each word token. Captures lexical
/// overlap rather than deep semantics, but is fast and fully reproducible.
pub struct HtpEmbedder {
    moduli: Vec<u64>,
}

impl HtpEmbedder {
    pub fn new() -> Self {
        Self {
            moduli: COPRIME_MODULI[..NUM_MODULI].to_vec(),
        }
    }

    /// Embed a single token using Harmonic Token Projection
    ///
    /// Steps:
    /// 1. Encode the token's code points as a base-2^16 integer N
    /// 2. For each modulus m_i, compute r_i = N mod m_i
    /// 3. Project to unit circle: E_i = [sin(2πr_i/m_i), cos(2πr_i/m_i)]
    fn embed_token(&self, token: &str) -> Vec<f64> {
        let n = token_to_integer(token);

        let mut embedding = Vec::with_capacity(EMBEDDING_DIM);
        for &m in &self.moduli {
            let r = n % m;
            let theta = 2.0 * PI * (r as f64) / (m as f64);
            embedding.push(theta.sin());
            embedding.push(theta.cos());
        }

        embedding
    }
}

impl Default for HtpEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HtpEmbedder {
    fn name(&self) -> &str {
        "htp"
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let tokens = tokenize(text);

        if tokens.is_empty() {
            return Ok(vec![0.0; EMBEDDING_DIM]);
        }

        let mut sum = vec![0.0f64; EMBEDDING_DIM];
        for token in &tokens {
            for (i, val) in self.embed_token(token).iter().enumerate() {
                sum[i] += val;
            }
        }

        let count = tokens.len() as f64;
        for val in &mut sum {
            *val /= count;
        }

        Ok(l2_normalize(&sum))
    }
}

/// N = Σ u_j * B^(L-j) where B = 2^16, wrapping on overflow
fn token_to_integer(token: &str) -> u64 {
    token
        .chars()
        .take(MAX_TOKEN_LENGTH)
        .fold(0u64, |n, c| n.wrapping_mul(65536).wrapping_add(c as u64))
}

/// L2 normalize and convert to f32. Zero vectors stay zero.
pub fn l2_normalize(values: &[f64]) -> Vec<f32> {
    let norm: f64 = values.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        values.iter().map(|x| (*x / norm) as f32).collect()
    } else {
        values.iter().map(|x| *x as f32).collect()
    }
}

/// Simple tokenization
///
/// Splits text into words, normalizes to lowercase
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_htp_shape_and_norm() {
        let embedder = HtpEmbedder::new();
        let emb = embedder.embed("Sentence embeddings map text to vectors").unwrap();

        assert_eq!(emb.len(), embedder.dimension());
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_htp_deterministic_across_instances() {
        let text = "Cosine similarity ranks candidate sentences";
        let a = HtpEmbedder::new().embed(text).unwrap();
        let b = HtpEmbedder::new().embed(text).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_htp_case_and_punctuation_insensitive() {
        let embedder = HtpEmbedder::new();
        let a = embedder.embed("Neural networks, explained!").unwrap();
        let b = embedder.embed("neural networks explained").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_htp_overlap_ranks_higher() {
        let embedder = HtpEmbedder::new();
        let query = embedder.embed("pdf text extraction").unwrap();
        let close = embedder.embed("extraction of text from a pdf file").unwrap();
        let far = embedder.embed("the weather was sunny yesterday").unwrap();

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let emb = HtpEmbedder::new().embed("  ...  ").unwrap();
        assert_eq!(emb.len(), EMBEDDING_DIM);
        assert!(emb.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_embed_batch_matches_single() {
        let embedder = HtpEmbedder::new();
        let batch = embedder.embed_batch(&["first sentence", "second one"]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], embedder.embed("second one").unwrap());
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_load_embedder_htp() {
        let embedder = load_embedder(EmbedderKind::Htp, Path::new("/unused")).unwrap();
        assert_eq!(embedder.name(), "htp");
        assert_eq!(embedder.dimension(), EMBEDDING_DIM);
    }
}
