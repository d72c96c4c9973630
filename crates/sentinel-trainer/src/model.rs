//! Feed-forward contact-name model.
//! Dense stages over the encoded input, then one wide output layer reshaped
//! to a `(max_label_len, vocab_size)` grid of logits per example.

use std::fmt;

use candle_core::{D, Result, Tensor};
use candle_nn::{Dropout, Linear, Module, ModuleT, VarBuilder};
use sentinel_core::VariantConfig;
use serde::Serialize;

/// One hidden stage: linear map, ReLU, optional dropout.
struct DenseLayer {
    name: String,
    linear: Linear,
    dropout: Option<(String, Dropout)>,
    units: usize,
    in_features: usize,
}

pub struct ContactModel {
    name: String,
    hidden: Vec<DenseLayer>,
    output: Linear,
    input_width: usize,
    label_len: usize,
    vocab_size: usize,
}

impl ContactModel {
    /// Build the layer graph. Parameters are created (or looked up) through `vb`
    /// as `dense{i}.weight`, `dense{i}.bias`, `output.weight`, `output.bias`.
    pub fn new(vb: VarBuilder, config: &VariantConfig) -> Result<Self> {
        let mut hidden = Vec::with_capacity(config.hidden.len());
        let mut in_features = config.max_input_len;

        for (i, spec) in config.hidden.iter().enumerate() {
            let name = format!("dense{}", i + 1);
            let linear = candle_nn::linear(in_features, spec.units, vb.pp(&name))?;
            let dropout = spec
                .dropout
                .map(|p| (format!("dropout{}", i + 1), Dropout::new(p)));
            hidden.push(DenseLayer {
                name,
                linear,
                dropout,
                units: spec.units,
                in_features,
            });
            in_features = spec.units;
        }

        let output = candle_nn::linear(in_features, config.output_width(), vb.pp("output"))?;

        Ok(Self {
            name: config.model_name.clone(),
            hidden,
            output,
            input_width: config.max_input_len,
            label_len: config.max_label_len,
            vocab_size: config.vocab_size,
        })
    }

    /// Logits of shape `(batch, max_label_len, vocab_size)`.
    ///
    /// `xs` is `(batch, max_input_len)` `f32`. Dropout is only active when `train` is set.
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let batch = xs.dim(0)?;
        let mut h = xs.clone();
        for layer in &self.hidden {
            h = layer.linear.forward(&h)?.relu()?;
            if let Some((_, dropout)) = &layer.dropout {
                h = dropout.forward_t(&h, train)?;
            }
        }
        self.output
            .forward(&h)?
            .reshape((batch, self.label_len, self.vocab_size))
    }

    /// Per-position probability distribution over the vocabulary.
    pub fn probabilities(&self, xs: &Tensor) -> Result<Tensor> {
        candle_nn::ops::softmax_last_dim(&self.forward_t(xs, false)?)
    }

    /// Most likely code at every output position, shape `(batch, max_label_len)`.
    pub fn predict(&self, xs: &Tensor) -> Result<Tensor> {
        self.forward_t(xs, false)?.argmax(D::Minus1)
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn label_len(&self) -> usize {
        self.label_len
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Layer-by-layer description with parameter counts.
    pub fn summary(&self) -> ModelSummary {
        let mut layers = vec![LayerSummary::new(
            "input_text",
            "InputLayer",
            vec![self.input_width],
            0,
        )];

        for layer in &self.hidden {
            layers.push(LayerSummary::new(
                &layer.name,
                "Dense",
                vec![layer.units],
                layer.in_features * layer.units + layer.units,
            ));
            if let Some((name, _)) = &layer.dropout {
                layers.push(LayerSummary::new(name, "Dropout", vec![layer.units], 0));
            }
        }

        let last = self.hidden.last().map_or(self.input_width, |l| l.units);
        let out = self.label_len * self.vocab_size;
        layers.push(LayerSummary::new("output", "Dense", vec![out], last * out + out));
        layers.push(LayerSummary::new(
            "output_reshaped",
            "Reshape",
            vec![self.label_len, self.vocab_size],
            0,
        ));

        let total_params = layers.iter().map(|l| l.params).sum();
        ModelSummary {
            name: self.name.clone(),
            layers,
            total_params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub kind: String,
    /// Output shape without the batch dimension.
    pub output_shape: Vec<usize>,
    pub params: usize,
}

impl LayerSummary {
    fn new(name: &str, kind: &str, output_shape: Vec<usize>, params: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            output_shape,
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub layers: Vec<LayerSummary>,
    pub total_params: usize,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: \"{}\"", self.name)?;
        writeln!(f, "{:<32}{:<24}{:>12}", "Layer (type)", "Output Shape", "Param #")?;
        writeln!(f, "{}", "=".repeat(68))?;
        for layer in &self.layers {
            let label = format!("{} ({})", layer.name, layer.kind);
            let dims: Vec<String> = layer.output_shape.iter().map(|d| d.to_string()).collect();
            let shape = format!("(None, {})", dims.join(", "));
            writeln!(f, "{:<32}{:<24}{:>12}", label, shape, layer.params)?;
        }
        writeln!(f, "{}", "=".repeat(68))?;
        write!(f, "Total params: {}", self.total_params)
    }
}
