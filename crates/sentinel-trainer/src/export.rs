//! # Quantized Export
//!
//! Writes trained parameters as a safetensors artifact. Int8 export stores
//! every weight matrix as symmetric per-tensor `i8` plus an `f32` scale under
//! `"{name}.scale"`, leaving biases in `f32`. Float16 export halves every
//! tensor. Header metadata records the variant and sequence geometry so the
//! artifact can be rebuilt into a [`ContactModel`] on the consuming side.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use safetensors::tensor::{Dtype, SafeTensors, View};
use sentinel_core::{Quantization, VariantConfig};
use serde::Serialize;
use tracing::info;

use crate::error::{Result, TrainerError};
use crate::model::ContactModel;

/// Value of the `format` metadata key.
pub const ARTIFACT_FORMAT: &str = "sentinel-contact-model";

const SCALE_SUFFIX: &str = ".scale";

/// A tensor ready for serialization.
#[derive(Debug, Clone)]
struct PackedTensor {
    name: String,
    dtype: Dtype,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl View for &PackedTensor {
    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.data)
    }

    fn data_len(&self) -> usize {
        self.data.len()
    }
}

/// Outcome of writing an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub bytes: usize,
    pub quantization: Quantization,
    pub tensors: usize,
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes as f64;
        if bytes >= 1024.0 * 1024.0 {
            write!(f, "{:.2} MB", bytes / 1024.0 / 1024.0)
        } else {
            write!(f, "{:.2} KB", bytes / 1024.0)
        }
    }
}

/// Quantize the parameters in `varmap` and serialize them.
pub fn to_bytes(varmap: &VarMap, config: &VariantConfig) -> Result<(Vec<u8>, usize)> {
    let packed = pack(varmap, config.quantization)?;

    let metadata: HashMap<String, String> = [
        ("format", ARTIFACT_FORMAT.to_string()),
        ("model_name", config.model_name.clone()),
        ("variant", config.variant.to_string()),
        ("quantization", config.quantization.to_string()),
        ("vocab_size", config.vocab_size.to_string()),
        ("max_input_len", config.max_input_len.to_string()),
        ("max_label_len", config.max_label_len.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let bytes = safetensors::serialize(
        packed.iter().map(|t| (t.name.as_str(), t)),
        &Some(metadata),
    )?;
    Ok((bytes, packed.len()))
}

/// Quantize, serialize and write the artifact to `path`, creating parent
/// directories and replacing any existing file.
pub fn export(varmap: &VarMap, config: &VariantConfig, path: &Path) -> Result<ExportReport> {
    info!(quantization = %config.quantization, "Converting model to quantized artifact...");
    let (bytes, tensors) = to_bytes(varmap, config)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, &bytes)?;

    let report = ExportReport {
        path: path.to_path_buf(),
        bytes: bytes.len(),
        quantization: config.quantization,
        tensors,
    };
    info!("Model saved to: {}", report.path.display());
    info!("Model size: {report}");
    Ok(report)
}

fn pack(varmap: &VarMap, quantization: Quantization) -> Result<Vec<PackedTensor>> {
    let vars = varmap
        .data()
        .lock()
        .map_err(|_| TrainerError::PoisonedParameters)?;

    let mut names: Vec<&String> = vars.keys().collect();
    names.sort();

    let mut packed = Vec::with_capacity(names.len() * 2);
    for name in names {
        let tensor = vars[name].as_tensor();
        let shape = tensor.dims().to_vec();

        match quantization {
            Quantization::Int8 if shape.len() >= 2 => {
                let values = tensor.flatten_all()?.to_vec1::<f32>()?;
                let (data, scale) = quantize_i8(&values);
                packed.push(PackedTensor {
                    name: name.clone(),
                    dtype: Dtype::I8,
                    shape,
                    data,
                });
                packed.push(PackedTensor {
                    name: format!("{name}{SCALE_SUFFIX}"),
                    dtype: Dtype::F32,
                    shape: vec![1],
                    data: scale.to_le_bytes().to_vec(),
                });
            }
            Quantization::Int8 => {
                let values = tensor.flatten_all()?.to_vec1::<f32>()?;
                packed.push(PackedTensor {
                    name: name.clone(),
                    dtype: Dtype::F32,
                    shape,
                    data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
                });
            }
            Quantization::Float16 => {
                let half = tensor.to_dtype(DType::F16)?;
                packed.push(PackedTensor {
                    name: name.clone(),
                    dtype: Dtype::F16,
                    shape,
                    data: View::data(&half).into_owned(),
                });
            }
        }
    }
    Ok(packed)
}

/// Symmetric per-tensor quantization to `[-127, 127]`. Returns raw bytes and the scale.
fn quantize_i8(values: &[f32]) -> (Vec<u8>, f32) {
    let max_abs = values.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    let scale = if max_abs > 0.0 { max_abs / 127.0 } else { 1.0 };
    let data = values
        .iter()
        .map(|v| (v / scale).round().clamp(-127.0, 127.0) as i8 as u8)
        .collect();
    (data, scale)
}

/// Description of one stored tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorInfo {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<usize>,
}

/// Header contents of an artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub bytes: usize,
    pub metadata: HashMap<String, String>,
    pub tensors: Vec<TensorInfo>,
}

/// Read the header and tensor table of an artifact.
pub fn inspect_artifact(path: &Path) -> Result<ArtifactInfo> {
    let bytes = std::fs::read(path)?;
    let (_, header) = SafeTensors::read_metadata(&bytes)?;
    let metadata = header.metadata().clone().unwrap_or_default();

    let st = SafeTensors::deserialize(&bytes)?;
    let mut tensors: Vec<TensorInfo> = st
        .tensors()
        .into_iter()
        .map(|(name, view)| TensorInfo {
            name,
            dtype: format!("{:?}", view.dtype()),
            shape: view.shape().to_vec(),
        })
        .collect();
    tensors.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(ArtifactInfo {
        bytes: bytes.len(),
        metadata,
        tensors,
    })
}

/// Read an artifact back as dequantized `f32` tensors keyed by parameter name.
pub fn load_artifact(path: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let bytes = std::fs::read(path)?;
    let st = SafeTensors::deserialize(&bytes)?;

    let mut weights = HashMap::new();
    for (name, view) in st.tensors() {
        if name.ends_with(SCALE_SUFFIX) {
            continue;
        }
        let shape = view.shape().to_vec();
        let tensor = match view.dtype() {
            Dtype::I8 => {
                let scale_view = st.tensor(&format!("{name}{SCALE_SUFFIX}"))?;
                let scale = Tensor::from_raw_buffer(scale_view.data(), DType::F32, &[1], device)?
                    .to_vec1::<f32>()?[0];
                let values: Vec<f32> = view
                    .data()
                    .iter()
                    .map(|&b| f32::from(b as i8) * scale)
                    .collect();
                Tensor::from_vec(values, shape, device)?
            }
            Dtype::F16 => {
                Tensor::from_raw_buffer(view.data(), DType::F16, &shape, device)?
                    .to_dtype(DType::F32)?
            }
            Dtype::F32 => Tensor::from_raw_buffer(view.data(), DType::F32, &shape, device)?,
            other => {
                return Err(TrainerError::Candle(candle_core::Error::Msg(format!(
                    "unsupported artifact dtype {other:?} for {name}"
                ))));
            }
        };
        weights.insert(name, tensor);
    }
    Ok(weights)
}

/// Rebuild a model from an exported artifact.
pub fn load_model(path: &Path, config: &VariantConfig, device: &Device) -> Result<ContactModel> {
    let weights = load_artifact(path, device)?;
    let vb = VarBuilder::from_tensors(weights, DType::F32, device);
    Ok(ContactModel::new(vb, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::Variant;

    fn tiny_varmap(config: &VariantConfig) -> VarMap {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        ContactModel::new(vb, config).unwrap();
        varmap
    }

    #[test]
    fn test_quantize_i8() {
        let (data, scale) = quantize_i8(&[0.0, 1.27, -1.27, 0.635]);
        assert!((scale - 0.01).abs() < 1e-6);
        let q: Vec<i8> = data.into_iter().map(|b| b as i8).collect();
        assert_eq!(q, vec![0, 127, -127, 64]);

        let (data, scale) = quantize_i8(&[0.0, 0.0]);
        assert_eq!(scale, 1.0);
        assert_eq!(data, vec![0, 0]);
    }

    #[test]
    fn test_float16_export_layout() {
        let config = Variant::Tiny.config();
        let varmap = tiny_varmap(&config);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/models/contact_detection_model.tflite");

        let report = export(&varmap, &config, &path).unwrap();
        assert_eq!(report.tensors, 6);
        assert_eq!(report.bytes, std::fs::metadata(&path).unwrap().len() as usize);

        let info = inspect_artifact(&path).unwrap();
        assert_eq!(info.metadata["format"], ARTIFACT_FORMAT);
        assert_eq!(info.metadata["variant"], "tiny");
        assert_eq!(info.metadata["quantization"], "float16");
        assert!(info.tensors.iter().all(|t| t.dtype == "F16"));
        let output = info.tensors.iter().find(|t| t.name == "output.weight").unwrap();
        assert_eq!(output.shape, vec![6400, 16]);
    }

    #[test]
    fn test_int8_export_layout() {
        let mut config = Variant::Tiny.config();
        config.quantization = Quantization::Int8;
        let varmap = tiny_varmap(&config);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");

        let report = export(&varmap, &config, &path).unwrap();
        // three weight matrices gain a scale each
        assert_eq!(report.tensors, 9);

        let info = inspect_artifact(&path).unwrap();
        let dtype = |name: &str| {
            info.tensors
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.dtype.clone())
                .unwrap()
        };
        assert_eq!(dtype("dense1.weight"), "I8");
        assert_eq!(dtype("dense1.weight.scale"), "F32");
        assert_eq!(dtype("dense1.bias"), "F32");
    }

    #[test]
    fn test_export_overwrites() {
        let config = Variant::Tiny.config();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.tflite");
        std::fs::write(&path, b"stale").unwrap();

        export(&tiny_varmap(&config), &config, &path).unwrap();
        assert!(inspect_artifact(&path).is_ok());
    }

    #[test]
    fn test_reload_matches_trained_predictions() {
        for quantization in [Quantization::Float16, Quantization::Int8] {
            let mut config = Variant::Tiny.config();
            config.quantization = quantization;
            let varmap = VarMap::new();
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
            let model = ContactModel::new(vb, &config).unwrap();

            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("model.tflite");
            export(&varmap, &config, &path).unwrap();

            let weights = load_artifact(&path, &Device::Cpu).unwrap();
            assert_eq!(weights.len(), 6);
            let original = varmap.data().lock().unwrap()["dense1.weight"]
                .as_tensor()
                .clone();
            let diff = (&weights["dense1.weight"] - &original)
                .unwrap()
                .abs()
                .unwrap()
                .max_all()
                .unwrap()
                .to_scalar::<f32>()
                .unwrap();
            assert!(diff < 0.01, "{quantization}: {diff}");

            let reloaded = load_model(&path, &config, &Device::Cpu).unwrap();
            let xs = Tensor::zeros((1, 200), DType::F32, &Device::Cpu).unwrap();
            assert_eq!(
                reloaded.forward_t(&xs, false).unwrap().dims(),
                model.forward_t(&xs, false).unwrap().dims()
            );
        }
    }

    #[test]
    fn test_report_display() {
        let report = ExportReport {
            path: PathBuf::from("m"),
            bytes: 2048,
            quantization: Quantization::Float16,
            tensors: 1,
        };
        assert_eq!(report.to_string(), "2.00 KB");

        let report = ExportReport {
            bytes: 3 * 1024 * 1024,
            ..report
        };
        assert_eq!(report.to_string(), "3.00 MB");
    }
}
