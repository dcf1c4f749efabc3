//! ONNX Runtime embedding provider: tokenize, run the encoder, mean-pool the
//! token embeddings under the attention mask, L2-normalize.

use std::sync::Mutex;

use anyhow::{Context, Result};
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// all-MiniLM-L6-v2 was trained at 256 tokens.
const MAX_SEQ_LEN: usize = 256;

pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        let model_path = cache_dir.join("model.onnx");
        let tokenizer_path = cache_dir.join("tokenizer.json");

        for path in [&model_path, &tokenizer_path] {
            anyhow::ensure!(
                path.exists(),
                "{} not found. Run `hippo model download` first.",
                path.display()
            );
        }

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;

        tracing::info!(
            model = %model_path.display(),
            model_name = %config.model,
            "local embedding model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let seq_len = encoding.get_ids().len();
        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        // single sentence: no segment B
        let token_types = vec![0i64; seq_len];

        let shape = vec![1i64, seq_len as i64];
        let inputs = ort::inputs! {
            "input_ids" => Tensor::from_array((shape.clone(), ids.into_boxed_slice()))?,
            "attention_mask" => Tensor::from_array((shape.clone(), mask.clone().into_boxed_slice()))?,
            "token_type_ids" => Tensor::from_array((shape, token_types.into_boxed_slice()))?,
        };

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(inputs)?;

        // Output naming differs between ONNX exports.
        let hidden = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);
        let (dims, data) = hidden
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings")?;

        let dims: &[i64] = dims;
        anyhow::ensure!(
            dims.len() == 3 && dims[1] as usize == seq_len && dims[2] as usize == EMBEDDING_DIM,
            "unexpected token embedding shape {dims:?}, expected [1, {seq_len}, {EMBEDDING_DIM}]"
        );

        let hidden = ArrayView3::from_shape((1, seq_len, EMBEDDING_DIM), data)?;
        let mask: Vec<f32> = mask.iter().map(|&m| m as f32).collect();
        let mask = ArrayView2::from_shape((1, seq_len), &mask)?;

        let pooled = mean_pool(hidden, mask);
        let mut vector = pooled.row(0).to_vec();
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

/// Average token vectors `[batch, seq, dim]` over positions where `mask` is set.
fn mean_pool(hidden: ArrayView3<f32>, mask: ArrayView2<f32>) -> Array2<f32> {
    let weights = mask.insert_axis(Axis(2));
    let summed = (&hidden * &weights).sum_axis(Axis(1));
    let counts = mask
        .sum_axis(Axis(1))
        .mapv(|c| c.max(f32::MIN_POSITIVE))
        .insert_axis(Axis(1));
    summed / &counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mean_pool_ignores_padding() {
        let hidden = ndarray::Array3::from_shape_vec(
            (1, 3, 2),
            vec![1.0, 2.0, 3.0, 4.0, 100.0, 100.0],
        )
        .unwrap();
        let mask = array![[1.0f32, 1.0, 0.0]];
        let pooled = mean_pool(hidden.view(), mask.view());
        assert_eq!(pooled, array![[2.0f32, 3.0]]);
    }

    #[test]
    fn mean_pool_all_masked_is_zero() {
        let hidden = ndarray::Array3::<f32>::ones((1, 2, 2));
        let mask = array![[0.0f32, 0.0]];
        let pooled = mean_pool(hidden.view(), mask.view());
        assert_eq!(pooled, array![[0.0f32, 0.0]]);
    }

    fn test_config() -> EmbeddingConfig {
        EmbeddingConfig::default()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    #[ignore] // Requires model files: hippo model download
    fn embeds_to_unit_vectors_of_model_width() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let embedding = provider.embed("User allergic to shellfish").unwrap();
        assert_eq!(embedding.len(), EMBEDDING_DIM);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm {norm}");
    }

    #[test]
    #[ignore]
    fn related_texts_are_closer() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let allergy = provider.embed("User allergic to shellfish").unwrap();
        let food = provider.embed("food allergies").unwrap();
        let pets = provider.embed("User has golden retriever named Max").unwrap();
        assert!(cosine(&allergy, &food) > cosine(&allergy, &pets));
    }
}
