//! Loading model weights from safetensors or PyTorch `.pth` files.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::{debug, info};

/// Loads a weights file and builds a model from it.
///
/// Files ending in `.pth` or `.pt` are read as PyTorch state dicts; anything
/// else is treated as safetensors.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if `build`
/// rejects the weights (missing or misshapen tensors).
pub fn load_model<T>(
    path: impl AsRef<Path>,
    device: &Device,
    build: impl FnOnce(VarBuilder<'static>) -> Result<T>,
) -> Result<T> {
    let path = path.as_ref();
    let vb = if is_pytorch(path) {
        load_pth(path, device)?
    } else {
        load_safetensors(path, device)?
    };
    let model = build(vb).with_context(|| format!("Invalid weights in {}", path.display()))?;
    info!("Loaded model {}", path.display());
    Ok(model)
}

/// Reads every tensor of a safetensors file onto `device`.
///
/// # Errors
///
/// Returns an error if the file is missing, is not valid safetensors, or
/// holds a tensor of an unsupported dtype.
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Reading safetensors {}", path.display());

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;
    let file = SafeTensors::deserialize(&bytes)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let tensors = file
        .tensors()
        .into_iter()
        .map(|(name, view)| {
            let dtype = to_candle_dtype(view.dtype())
                .with_context(|| format!("Tensor '{name}'"))?;
            let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
                .with_context(|| format!("Failed to create tensor '{name}'"))?;
            Ok((name, tensor))
        })
        .collect::<Result<HashMap<String, Tensor>>>()?;

    debug!("{} tensor(s) in {}", tensors.len(), path.display());
    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}

/// Reads a PyTorch state dict onto `device`.
///
/// # Errors
///
/// Returns an error if the file is missing or is not a pickled state dict.
pub fn load_pth(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Reading PyTorch weights {}", path.display());
    VarBuilder::from_pth(path, DType::F32, device)
        .with_context(|| format!("Failed to read PyTorch weights: {}", path.display()))
}

fn is_pytorch(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pth") || e.eq_ignore_ascii_case("pt"))
}

fn to_candle_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    Ok(match dtype {
        S::F32 => DType::F32,
        S::F64 => DType::F64,
        S::F16 => DType::F16,
        S::BF16 => DType::BF16,
        S::I64 => DType::I64,
        S::U32 => DType::U32,
        S::U8 => DType::U8,
        other => bail!("Unsupported dtype: {other:?}"),
    })
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn weights_file(name: &str, values: &[f32], shape: Vec<usize>) -> NamedTempFile {
        use safetensors::tensor::TensorView;

        let view = TensorView::new(safetensors::Dtype::F32, shape, bytemuck::cast_slice(values))
            .expect("valid tensor view");
        let bytes = safetensors::serialize(HashMap::from([(name.to_string(), view)]), &None)
            .expect("serialize");

        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&bytes).expect("write");
        file
    }

    #[test]
    fn test_load_safetensors_reads_tensor() {
        let file = weights_file("fc.weight", &[1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let vb = load_safetensors(file.path(), &Device::Cpu).expect("load");

        let t = vb.get((2, 2), "fc.weight").expect("tensor");
        let values = t.flatten_all().and_then(|t| t.to_vec1::<f32>()).expect("values");
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_load_safetensors_missing_file() {
        assert!(load_safetensors("/nonexistent/model.safetensors", &Device::Cpu).is_err());
    }

    #[test]
    fn test_load_model_reports_bad_shape() {
        let file = weights_file("fc.weight", &[1.0, 2.0], vec![1, 2]);
        let result = load_model(file.path(), &Device::Cpu, |vb| {
            Ok(vb.get((4, 4), "fc.weight")?)
        });

        let err = result.expect_err("shape mismatch");
        assert!(format!("{err:#}").contains("Invalid weights"));
    }

    #[test]
    fn test_pth_extension_selects_pytorch_reader() {
        assert!(is_pytorch(Path::new("models/blazeface.pth")));
        assert!(is_pytorch(Path::new("model.PT")));
        assert!(!is_pytorch(Path::new("model.safetensors")));
        assert!(!is_pytorch(Path::new("lbfmodel.yaml")));

        let mut file = tempfile::Builder::new()
            .suffix(".pth")
            .tempfile()
            .expect("temp file");
        file.write_all(b"not a pickle").expect("write");

        let err = load_model(file.path(), &Device::Cpu, |_| Ok(()))
            .expect_err("garbage state dict");
        assert!(format!("{err:#}").contains("PyTorch weights"));
    }
}
