//! Mini-batch assembly for encoded datasets.

use candle_core::{Device, Result, Tensor};
use sentinel_core::Dataset;

/// One mini-batch on the target device.
#[derive(Debug, Clone)]
pub struct Batch {
    /// `(rows, max_input_len)` codes as `f32`.
    pub inputs: Tensor,
    /// `(rows, max_label_len)` class targets as `u32`.
    pub targets: Tensor,
    pub rows: usize,
}

impl Batch {
    /// Gather the rows named by `indices` into tensors.
    pub fn gather(dataset: &Dataset, indices: &[usize], device: &Device) -> Result<Self> {
        let (inputs, labels) = dataset.gather(indices);
        let rows = indices.len();
        let (_, input_width) = dataset.input_shape();
        let (_, label_width) = dataset.label_shape();

        let inputs: Vec<f32> = inputs.into_iter().map(|c| c as f32).collect();
        Ok(Self {
            inputs: Tensor::from_vec(inputs, (rows, input_width), device)?,
            targets: Tensor::from_vec(labels, (rows, label_width), device)?,
            rows,
        })
    }
}

/// Encode raw texts into a model input tensor without labels.
pub fn encode_inputs(texts: &[&str], width: usize, max_code: u32, device: &Device) -> Result<Tensor> {
    let mut codes = Vec::with_capacity(texts.len() * width);
    for text in texts {
        sentinel_core::encoder::encode_into(text, width, max_code, &mut codes);
    }
    let codes: Vec<f32> = codes.into_iter().map(|c| c as f32).collect();
    Tensor::from_vec(codes, (texts.len(), width), device)
}

/// Row indices `0..n` in a random order (Fisher-Yates).
pub fn shuffled_indices(n: usize, rng: &mut oorandom::Rand32) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    for i in (1..indices.len()).rev() {
        let j = rng.rand_range(0..(i as u32 + 1)) as usize;
        indices.swap(i, j);
    }
    indices
}
