//! Training loop for the contact model.

use candle_core::{D, DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use sentinel_core::{Dataset, Variant, VariantConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::{Batch, encode_inputs, shuffled_indices};
use crate::error::{Result, TrainerError};
use crate::model::ContactModel;

/// Loss and accuracy over one pass of a split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub loss: f32,
    /// Fraction of label positions whose arg-max matches the target code.
    pub accuracy: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number.
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

/// Per-epoch metrics of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub variant: Variant,
    pub epochs: Vec<EpochMetrics>,
}

impl History {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

pub struct Trainer {
    config: VariantConfig,
    device: Device,
    varmap: VarMap,
    model: ContactModel,
    rng: oorandom::Rand32,
}

impl Trainer {
    /// Create a freshly initialized model for `config`. `seed` drives batch shuffling.
    pub fn new(config: VariantConfig, device: Device, seed: u64) -> Result<Self> {
        config.validate()?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = ContactModel::new(vb, &config)?;

        Ok(Self {
            config,
            device,
            varmap,
            model,
            rng: oorandom::Rand32::new(seed),
        })
    }

    pub fn model(&self) -> &ContactModel {
        &self.model
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn config(&self) -> &VariantConfig {
        &self.config
    }

    /// Fit on `train` for the configured number of epochs, evaluating on
    /// `validation` after each one when it has rows.
    pub fn fit(&mut self, train: &Dataset, validation: &Dataset) -> Result<History> {
        if train.is_empty() {
            return Err(TrainerError::NoTrainingRows {
                held_out: validation.len(),
            });
        }
        if validation.is_empty() {
            warn!("validation split is empty, only training metrics will be reported");
        }

        let params = ParamsAdamW {
            lr: self.config.learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-7,
            weight_decay: 0.0,
        };
        let mut optimizer = AdamW::new(self.varmap.all_vars(), params)?;

        let epochs = self.config.epochs;
        let batch_size = self.config.batch_size;
        let mut history = History {
            variant: self.config.variant,
            epochs: Vec::with_capacity(epochs),
        };

        for epoch in 1..=epochs {
            let order = shuffled_indices(train.len(), &mut self.rng);
            let mut loss_sum = 0.0f32;
            let mut accuracy_sum = 0.0f32;

            for (step, chunk) in order.chunks(batch_size).enumerate() {
                let batch = Batch::gather(train, chunk, &self.device)?;
                let logits = self.model.forward_t(&batch.inputs, true)?;
                let (loss, accuracy) = position_loss(&logits, &batch.targets)?;
                optimizer.backward_step(&loss)?;

                let loss = loss.to_scalar::<f32>()?;
                debug!(epoch, step = step + 1, loss, accuracy, "batch");
                loss_sum += loss * batch.rows as f32;
                accuracy_sum += accuracy * batch.rows as f32;
            }

            let rows = train.len() as f32;
            let val = if validation.is_empty() {
                None
            } else {
                Some(self.evaluate(validation)?)
            };
            let metrics = EpochMetrics {
                epoch,
                loss: loss_sum / rows,
                accuracy: accuracy_sum / rows,
                val_loss: val.map(|m| m.loss),
                val_accuracy: val.map(|m| m.accuracy),
            };

            match val {
                Some(v) => info!(
                    "Epoch {}/{} - loss: {:.4} - accuracy: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
                    epoch, epochs, metrics.loss, metrics.accuracy, v.loss, v.accuracy
                ),
                None => info!(
                    "Epoch {}/{} - loss: {:.4} - accuracy: {:.4}",
                    epoch, epochs, metrics.loss, metrics.accuracy
                ),
            }
            history.epochs.push(metrics);
        }

        Ok(history)
    }

    /// Loss and accuracy over `data` with dropout disabled.
    pub fn evaluate(&self, data: &Dataset) -> Result<Metrics> {
        let indices: Vec<usize> = (0..data.len()).collect();
        let mut loss_sum = 0.0f32;
        let mut accuracy_sum = 0.0f32;

        for chunk in indices.chunks(self.config.batch_size) {
            let batch = Batch::gather(data, chunk, &self.device)?;
            let logits = self.model.forward_t(&batch.inputs, false)?;
            let (loss, accuracy) = position_loss(&logits, &batch.targets)?;
            loss_sum += loss.to_scalar::<f32>()? * batch.rows as f32;
            accuracy_sum += accuracy * batch.rows as f32;
        }

        let rows = data.len().max(1) as f32;
        Ok(Metrics {
            loss: loss_sum / rows,
            accuracy: accuracy_sum / rows,
        })
    }

    /// Run the model on raw texts and decode each predicted code grid.
    pub fn predict_labels(&self, texts: &[&str]) -> Result<Vec<String>> {
        predict_labels(&self.model, self.config.max_code(), &self.device, texts)
    }
}

/// Decode the arg-max prediction of `model` for each text.
pub fn predict_labels(
    model: &ContactModel,
    max_code: u32,
    device: &Device,
    texts: &[&str],
) -> Result<Vec<String>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let xs = encode_inputs(texts, model.input_width(), max_code, device)?;
    let codes: Vec<Vec<u32>> = model.predict(&xs)?.to_vec2()?;
    Ok(codes.iter().map(|row| sentinel_core::decode(row)).collect())
}

/// Mean cross-entropy over every `(row, position)` pair plus the fraction of
/// positions predicted exactly.
fn position_loss(logits: &Tensor, targets: &Tensor) -> candle_core::Result<(Tensor, f32)> {
    let (batch, positions, vocab) = logits.dims3()?;
    let flat = logits.reshape((batch * positions, vocab))?;
    let targets = targets.reshape(batch * positions)?;

    let loss = candle_nn::loss::cross_entropy(&flat, &targets)?;
    let accuracy = flat
        .argmax(D::Minus1)?
        .eq(&targets)?
        .to_dtype(DType::F32)?
        .mean_all()?
        .to_scalar::<f32>()?;
    Ok((loss, accuracy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::{Example, ExampleGenerator};

    fn tiny_dataset(seed: u64) -> Dataset {
        let config = Variant::Tiny.config();
        let examples = ExampleGenerator::from_config(&config).generate(&mut oorandom::Rand32::new(seed));
        Dataset::build(&examples, &config).unwrap()
    }

    #[test]
    fn test_fit_records_every_epoch() {
        let dataset = tiny_dataset(1);
        let (train, validation) = dataset.split_validation(0.2).unwrap();
        assert_eq!((train.len(), validation.len()), (12, 3));

        let mut trainer = Trainer::new(Variant::Tiny.config(), Device::Cpu, 1).unwrap();
        let history = trainer.fit(&train, &validation).unwrap();

        assert_eq!(history.epochs.len(), 3);
        for (i, epoch) in history.epochs.iter().enumerate() {
            assert_eq!(epoch.epoch, i + 1);
            assert!(epoch.loss.is_finite());
            assert!((0.0..=1.0).contains(&epoch.accuracy));
            assert!(epoch.val_loss.is_some_and(f32::is_finite));
            assert!(epoch.val_accuracy.is_some());
        }
    }

    #[test]
    fn test_fit_small_variant_with_dropout() {
        let config = Variant::Small.config();
        let examples = ExampleGenerator::from_config(&config).generate(&mut oorandom::Rand32::new(5));
        let dataset = Dataset::build(&examples, &config).unwrap();
        let (train, validation) = dataset.split_validation(config.validation_split).unwrap();
        assert_eq!((train.len(), validation.len()), (24, 6));

        let mut trainer = Trainer::new(config, Device::Cpu, 5).unwrap();
        let history = trainer.fit(&train, &validation).unwrap();

        assert_eq!(history.variant, Variant::Small);
        assert_eq!(history.epochs.len(), 5);
        for epoch in &history.epochs {
            assert!(epoch.loss.is_finite());
            assert!(epoch.val_loss.is_some_and(f32::is_finite));
        }
    }

    #[test]
    fn test_fit_without_validation() {
        let dataset = tiny_dataset(2);
        let (train, validation) = dataset.split_validation(0.0).unwrap();
        let mut trainer = Trainer::new(Variant::Tiny.config(), Device::Cpu, 2).unwrap();
        let history = trainer.fit(&train, &validation).unwrap();
        assert!(history.epochs.iter().all(|e| e.val_loss.is_none()));
    }

    #[test]
    fn test_fit_rejects_empty_training_split() {
        let config = Variant::Tiny.config();
        let dataset = Dataset::build(&[Example::new("a", "b")], &config).unwrap();
        let (train, validation) = dataset.split_validation(0.5).unwrap();
        assert!(train.is_empty());

        let mut trainer = Trainer::new(config, Device::Cpu, 0).unwrap();
        assert!(matches!(
            trainer.fit(&train, &validation),
            Err(TrainerError::NoTrainingRows { held_out: 1 })
        ));
    }

    #[test]
    fn test_training_reduces_loss_on_fixed_batch() {
        let mut config = Variant::Tiny.config();
        config.epochs = 30;
        config.batch_size = 15;
        let dataset = tiny_dataset(3);
        let empty = Dataset::from_parts(Vec::new(), Vec::new(), 200, 50).unwrap();

        let mut trainer = Trainer::new(config, Device::Cpu, 3).unwrap();
        let before = trainer.evaluate(&dataset).unwrap();
        trainer.fit(&dataset, &empty).unwrap();
        let after = trainer.evaluate(&dataset).unwrap();
        assert!(after.loss < before.loss, "{} !< {}", after.loss, before.loss);
    }

    #[test]
    fn test_predict_labels_shape() {
        let trainer = Trainer::new(Variant::Tiny.config(), Device::Cpu, 4).unwrap();
        let labels = trainer.predict_labels(&["John Smith\nOnline", ""]).unwrap();
        assert_eq!(labels.len(), 2);
        assert!(labels.iter().all(|l| l.chars().count() <= 50));
        assert!(trainer.predict_labels(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_position_loss_perfect_prediction() {
        let logits = Tensor::new(&[[[10.0f32, -10.0], [-10.0, 10.0]]], &Device::Cpu).unwrap();
        let targets = Tensor::new(&[[0u32, 1]], &Device::Cpu).unwrap();
        let (loss, accuracy) = position_loss(&logits, &targets).unwrap();
        assert!(loss.to_scalar::<f32>().unwrap() < 1e-3);
        assert_eq!(accuracy, 1.0);
    }
}
