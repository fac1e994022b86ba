//! Sentence-transformer embedder running locally through ONNX Runtime.
//!
//! Expects an all-MiniLM-L6-v2 style export: `model.onnx` (BERT encoder whose
//! first output is `last_hidden_state`) and `tokenizer.json` in one directory.
//! Token embeddings are mean-pooled with the attention mask and L2-normalized,
//! which is how sentence-transformers produces its sentence vectors.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::embedding::{l2_normalize, Embedder};
use crate::error::{Result, SearchError};

/// Hidden size of the MiniLM family
pub const ONNX_EMBEDDING_DIM: usize = 384;

/// Inputs longer than this are truncated (BERT position limit)
const MAX_SEQ_LEN: usize = 256;

/// Sentences per inference call
const BATCH_SIZE: usize = 32;

pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl OnnxEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(SearchError::ModelNotFound(model_path));
        }
        if !tokenizer_path.exists() {
            return Err(SearchError::ModelNotFound(tokenizer_path));
        }

        let session = Session::builder()
            .map_err(|e| SearchError::Embedding(format!("ONNX session builder: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                SearchError::Embedding(format!(
                    "Failed to load embedding model from {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| SearchError::Embedding(format!("Failed to load tokenizer: {}", e)))?;
        limit_sequence_length(&mut tokenizer)?;

        debug!("Loaded sentence embedding model from {}", model_dir.display());

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let encodings = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(*t, true)
                    .map_err(|e| SearchError::Embedding(format!("Tokenization failed: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        if max_len == 0 {
            return Ok(vec![vec![0.0; ONNX_EMBEDDING_DIM]; batch_size]);
        }

        let mut input_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let token_type_ids: Vec<i64> = vec![0; batch_size * max_len];

        for enc in &encodings {
            let ids = enc.get_ids();
            let mask = enc.get_attention_mask();

            input_ids.extend(ids.iter().map(|&id| id as i64));
            attention_mask.extend(mask.iter().map(|&m| m as i64));

            // BERT pad token id = 0
            let pad = max_len - ids.len();
            input_ids.extend(std::iter::repeat_n(0i64, pad));
            attention_mask.extend(std::iter::repeat_n(0i64, pad));
        }

        let shape = [batch_size as i64, max_len as i64];
        let tensor_err = |e: ort::Error| SearchError::Embedding(format!("Tensor creation: {}", e));

        let input_ids_tensor = Tensor::from_array((shape, input_ids)).map_err(tensor_err)?;
        let attention_mask_tensor =
            Tensor::from_array((shape, attention_mask.clone())).map_err(tensor_err)?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids)).map_err(tensor_err)?;

        // last_hidden_state: [batch, seq_len, hidden]
        let hidden_states = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| SearchError::Embedding(format!("Session lock poisoned: {}", e)))?;

            let outputs = session
                .run(ort::inputs! {
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor,
                    "token_type_ids" => token_type_ids_tensor
                })
                .map_err(|e| SearchError::Embedding(format!("ONNX inference failed: {}", e)))?;

            let (_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| SearchError::Embedding(format!("Output tensor: {}", e)))?;

            data.to_vec()
        };

        let mut embeddings = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mut sum = vec![0.0_f64; ONNX_EMBEDDING_DIM];
            let mut mask_sum = 0.0_f64;

            for j in 0..max_len {
                if attention_mask[i * max_len + j] == 0 {
                    continue;
                }
                mask_sum += 1.0;
                let offset = (i * max_len + j) * ONNX_EMBEDDING_DIM;
                for (k, val) in sum.iter_mut().enumerate() {
                    *val += hidden_states[offset + k] as f64;
                }
            }

            if mask_sum > 0.0 {
                for val in &mut sum {
                    *val /= mask_sum;
                }
            }
            embeddings.push(l2_normalize(&sum));
        }

        debug!(batch_size, "Computed sentence embeddings");
        Ok(embeddings)
    }
}

/// Truncate inside the tokenizer so `[CLS]`/`[SEP]` survive on long inputs
fn limit_sequence_length(tokenizer: &mut Tokenizer) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_SEQ_LEN,
            ..Default::default()
        }))
        .map_err(|e| SearchError::Embedding(format!("Tokenizer truncation: {}", e)))?;
    Ok(())
}

impl Embedder for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx-minilm"
    }

    fn dimension(&self) -> usize {
        ONNX_EMBEDDING_DIM
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_chunk(&[text])?
            .pop()
            .ok_or_else(|| SearchError::Embedding("empty model output".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            all.extend(self.embed_chunk(chunk)?);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 102],
            "cls": ["[CLS]", 101]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[UNK]": 0, "word": 7, "[CLS]": 101, "[SEP]": 102 },
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn test_long_input_keeps_special_tokens() {
        let mut tokenizer: Tokenizer = WORD_TOKENIZER.parse().unwrap();
        limit_sequence_length(&mut tokenizer).unwrap();

        let text = vec!["word"; MAX_SEQ_LEN * 2].join(" ");
        let encoding = tokenizer.encode(text.as_str(), true).unwrap();
        let ids = encoding.get_ids();

        assert_eq!(ids.len(), MAX_SEQ_LEN);
        assert_eq!(ids.first(), Some(&101));
        assert_eq!(ids.last(), Some(&102));
        assert_eq!(encoding.get_attention_mask().len(), MAX_SEQ_LEN);
    }

    #[test]
    fn test_missing_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxEmbedder::load(dir.path()).err().unwrap();
        assert!(matches!(err, SearchError::ModelNotFound(p) if p.ends_with("model.onnx")));
    }
}
