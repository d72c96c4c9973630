//! Encoded training arrays.

use crate::config::VariantConfig;
use crate::corpus::Example;
use crate::encoder::TextEncoder;
use crate::error::{Result, SentinelError};

/// Two index-aligned row-major arrays: encoded inputs and encoded labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    inputs: Vec<u32>,
    labels: Vec<u32>,
    input_width: usize,
    label_width: usize,
}

impl Dataset {
    /// Encode every example, preserving order.
    pub fn build(examples: &[Example], config: &VariantConfig) -> Result<Self> {
        if examples.is_empty() {
            return Err(SentinelError::EmptyDataset);
        }

        let input_encoder = TextEncoder::new(config.max_input_len, config.max_code());
        let label_encoder = TextEncoder::new(config.max_label_len, config.max_code());

        let mut inputs = Vec::with_capacity(examples.len() * config.max_input_len);
        let mut labels = Vec::with_capacity(examples.len() * config.max_label_len);
        for example in examples {
            input_encoder.encode_into(&example.text, &mut inputs);
            label_encoder.encode_into(&example.label, &mut labels);
        }

        Ok(Self {
            inputs,
            labels,
            input_width: config.max_input_len,
            label_width: config.max_label_len,
        })
    }

    /// Assemble a dataset from already-encoded flat arrays.
    pub fn from_parts(
        inputs: Vec<u32>,
        labels: Vec<u32>,
        input_width: usize,
        label_width: usize,
    ) -> Result<Self> {
        if input_width == 0 || label_width == 0 {
            return Err(SentinelError::InvalidConfig(
                "row widths must be non-zero".into(),
            ));
        }
        let rows = inputs.len() / input_width;
        if inputs.len() % input_width != 0 {
            return Err(SentinelError::ShapeMismatch {
                expected: vec![(rows + 1) * input_width],
                actual: vec![inputs.len()],
            });
        }
        if labels.len() != rows * label_width {
            return Err(SentinelError::ShapeMismatch {
                expected: vec![rows * label_width],
                actual: vec![labels.len()],
            });
        }
        Ok(Self {
            inputs,
            labels,
            input_width,
            label_width,
        })
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.inputs.len() / self.input_width
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(count, max_input_len)`
    pub fn input_shape(&self) -> (usize, usize) {
        (self.len(), self.input_width)
    }

    /// `(count, max_label_len)`
    pub fn label_shape(&self) -> (usize, usize) {
        (self.len(), self.label_width)
    }

    pub fn inputs(&self) -> &[u32] {
        &self.inputs
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn input_row(&self, index: usize) -> &[u32] {
        &self.inputs[index * self.input_width..(index + 1) * self.input_width]
    }

    pub fn label_row(&self, index: usize) -> &[u32] {
        &self.labels[index * self.label_width..(index + 1) * self.label_width]
    }

    /// Split off the trailing `fraction` of rows for validation.
    ///
    /// The training part keeps the first `floor(n * (1 - fraction))` rows.
    /// Either part may come back empty for very small datasets.
    pub fn split_validation(&self, fraction: f64) -> Result<(Dataset, Dataset)> {
        if !(0.0..1.0).contains(&fraction) {
            return Err(SentinelError::InvalidConfig(format!(
                "validation fraction must be in [0, 1), got {fraction}"
            )));
        }
        let n = self.len();
        let split_at = ((n as f64) * (1.0 - fraction)).floor() as usize;
        let split_at = split_at.min(n);

        let train = Dataset {
            inputs: self.inputs[..split_at * self.input_width].to_vec(),
            labels: self.labels[..split_at * self.label_width].to_vec(),
            input_width: self.input_width,
            label_width: self.label_width,
        };
        let validation = Dataset {
            inputs: self.inputs[split_at * self.input_width..].to_vec(),
            labels: self.labels[split_at * self.label_width..].to_vec(),
            input_width: self.input_width,
            label_width: self.label_width,
        };
        Ok((train, validation))
    }

    /// Gather the given rows into new flat input and label buffers.
    pub fn gather(&self, indices: &[usize]) -> (Vec<u32>, Vec<u32>) {
        let mut inputs = Vec::with_capacity(indices.len() * self.input_width);
        let mut labels = Vec::with_capacity(indices.len() * self.label_width);
        for &i in indices {
            inputs.extend_from_slice(self.input_row(i));
            labels.extend_from_slice(self.label_row(i));
        }
        (inputs, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variant;
    use crate::corpus::ExampleGenerator;

    #[test]
    fn test_shapes_for_every_variant() {
        for variant in Variant::ALL {
            let config = variant.config();
            let examples = ExampleGenerator::for_variant(variant).generate(&mut oorandom::Rand32::new(5));
            let dataset = Dataset::build(&examples, &config).unwrap();

            assert_eq!(dataset.input_shape(), (examples.len(), 200));
            assert_eq!(dataset.label_shape(), (examples.len(), 50));
            assert!(dataset.inputs().iter().all(|&c| c <= config.max_code()));
            assert!(dataset.labels().iter().all(|&c| c <= config.max_code()));
        }
    }

    #[test]
    fn test_rows_are_aligned() {
        let config = Variant::Tiny.config();
        let examples = vec![
            Example::new("AB\nOnline", "AB"),
            Example::new("Mike Chen\nOnline", "Mike Chen"),
        ];
        let dataset = Dataset::build(&examples, &config).unwrap();

        assert_eq!(&dataset.label_row(0)[..3], &[65, 66, 0]);
        assert_eq!(crate::encoder::decode(dataset.label_row(1)), "Mike Chen");
        assert_eq!(crate::encoder::decode(dataset.input_row(1)), "Mike Chen\nOnline");
    }

    #[test]
    fn test_empty_examples_rejected() {
        let config = Variant::Tiny.config();
        assert!(matches!(
            Dataset::build(&[], &config),
            Err(SentinelError::EmptyDataset)
        ));
    }

    #[test]
    fn test_split_keeps_tail_for_validation() {
        let config = Variant::Tiny.config();
        let examples: Vec<Example> = (0..15)
            .map(|i| Example::new(format!("row {i}"), format!("n{i}")))
            .collect();
        let dataset = Dataset::build(&examples, &config).unwrap();

        let (train, validation) = dataset.split_validation(0.2).unwrap();
        assert_eq!(train.len(), 12);
        assert_eq!(validation.len(), 3);
        assert_eq!(crate::encoder::decode(validation.label_row(0)), "n12");

        let (train, validation) = dataset.split_validation(0.0).unwrap();
        assert_eq!(train.len(), 15);
        assert!(validation.is_empty());

        assert!(dataset.split_validation(1.0).is_err());
    }

    #[test]
    fn test_gather() {
        let dataset = Dataset::from_parts(vec![1, 2, 3, 4, 5, 6], vec![7, 8, 9], 2, 1).unwrap();
        let (inputs, labels) = dataset.gather(&[2, 0]);
        assert_eq!(inputs, vec![5, 6, 1, 2]);
        assert_eq!(labels, vec![9, 7]);
    }

    #[test]
    fn test_from_parts_rejects_misaligned() {
        assert!(Dataset::from_parts(vec![1, 2, 3], vec![1], 2, 1).is_err());
        assert!(Dataset::from_parts(vec![1, 2], vec![1, 2], 2, 1).is_err());
    }

    #[test]
    fn test_from_parts_reports_flat_lengths() {
        match Dataset::from_parts(vec![1, 2, 3, 4], vec![1, 2, 3], 2, 1) {
            Err(SentinelError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, vec![2]);
                assert_eq!(actual, vec![3]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        match Dataset::from_parts(vec![1, 2, 3], Vec::new(), 2, 1) {
            Err(SentinelError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, vec![4]);
                assert_eq!(actual, vec![3]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
