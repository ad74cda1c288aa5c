//! Model downloading and caching adapter.

use anyhow::{bail, Context, Result};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the face detector model.
pub const FACE_DETECTOR: &str = "blazeface";

/// Name of the landmark model.
pub const LANDMARK_PREDICTOR: &str = "lbf68";

static MODELS_DIR: OnceCell<PathBuf> = OnceCell::new();

/// Model metadata.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name/identifier.
    pub name: &'static str,
    /// Filename in the models directory and under a mirror.
    pub filename: &'static str,
    /// Upstream download URL.
    pub url: &'static str,
    /// Expected SHA-256 of the file, if pinned.
    pub sha256: Option<&'static str>,
    /// One-line description.
    pub description: &'static str,
}

/// Known models.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: FACE_DETECTOR,
        filename: "blazeface.pth",
        url: "https://github.com/hollance/BlazeFace-PyTorch/raw/master/blazeface.pth",
        sha256: None,
        description: "BlazeFace short-range face detector (128x128)",
    },
    ModelInfo {
        name: LANDMARK_PREDICTOR,
        filename: "lbfmodel.yaml",
        url: "https://raw.githubusercontent.com/kurnianggoro/GSOC2017/master/data/lbfmodel.yaml",
        sha256: None,
        description: "OpenCV LBF 68-point facial landmark model",
    },
];

/// Installation state of one model.
#[derive(Debug, Clone)]
pub struct ModelStatus {
    /// Model name.
    pub name: &'static str,
    /// Where the model is (or would be) stored.
    pub path: PathBuf,
    /// File size if installed.
    pub size: Option<u64>,
}

impl ModelStatus {
    /// Whether the model file exists.
    #[must_use]
    pub const fn installed(&self) -> bool {
        self.size.is_some()
    }
}

/// Download progress callback: `(model name, bytes so far, total bytes if known)`.
pub type ProgressCallback<'a> = &'a dyn Fn(&str, u64, Option<u64>);

/// Overrides the models directory for this process.
///
/// Returns `false` if a directory was already set.
pub fn set_models_dir(dir: impl Into<PathBuf>) -> bool {
    MODELS_DIR.set(dir.into()).is_ok()
}

/// Returns the models directory path.
///
/// Uses the override from [`set_models_dir`] if any, else
/// `XDG_DATA_HOME/drowsy/models` or `~/.local/share/drowsy/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    MODELS_DIR.get().cloned().unwrap_or_else(default_models_dir)
}

fn default_models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drowsy")
        .join("models")
}

/// Looks up a model by name.
#[must_use]
pub fn model_info(name: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.name == name)
}

/// Returns the path to a specific model file.
#[must_use]
pub fn model_path(name: &str) -> Option<PathBuf> {
    model_info(name).map(|m| models_dir().join(m.filename))
}

/// Returns the path of an installed model.
///
/// # Errors
///
/// Returns an error if the model is unknown or not downloaded yet.
pub fn require_model(dir: &Path, name: &str) -> Result<PathBuf> {
    let Some(info) = model_info(name) else {
        bail!("Unknown model: {name}");
    };
    let path = dir.join(info.filename);
    if !path.is_file() {
        bail!(
            "Model '{name}' not found at {}. Run `drowsy models fetch` to download it.",
            path.display()
        );
    }
    Ok(path)
}

/// Lists every known model with its installation state.
#[must_use]
pub fn list_models(dir: &Path) -> Vec<ModelStatus> {
    MODELS
        .iter()
        .map(|m| {
            let path = dir.join(m.filename);
            let size = fs::metadata(&path).ok().filter(|md| md.is_file()).map(|md| md.len());
            ModelStatus {
                name: m.name,
                path,
                size,
            }
        })
        .collect()
}

/// Downloads every model missing from `dir`.
///
/// Each model comes from its upstream URL, or from `{mirror}/{filename}`
/// when a mirror is given. Returns the names of the models that were fetched.
///
/// # Errors
///
/// Returns an error if:
/// - The models directory cannot be created
/// - A model download fails
/// - A model's checksum doesn't match
pub fn ensure_models_with_progress(
    dir: &Path,
    mirror: Option<&str>,
    force: bool,
    progress: Option<ProgressCallback<'_>>,
) -> Result<Vec<&'static str>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create models directory {}", dir.display()))?;

    let mut fetched = Vec::new();
    for model in MODELS {
        let path = dir.join(model.filename);
        if path.exists() && !force {
            debug!("Model {} already exists", model.name);
            continue;
        }
        let url = download_url(model, mirror);
        download_model(model, &url, &path, progress)?;
        fetched.push(model.name);
    }

    Ok(fetched)
}

/// Where a model is fetched from.
fn download_url(model: &ModelInfo, mirror: Option<&str>) -> String {
    mirror.map_or_else(
        || model.url.to_string(),
        |m| format!("{}/{}", m.trim_end_matches('/'), model.filename),
    )
}

/// Path a download is streamed to before it is verified.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Streams a model to a `.part` file, verifies it, then moves it in place.
fn download_model(
    model: &ModelInfo,
    url: &str,
    path: &Path,
    progress: Option<ProgressCallback<'_>>,
) -> Result<()> {
    info!("Downloading model: {} from {url}", model.name);

    let mut response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to download {}", model.name))?;
    if !response.status().is_success() {
        bail!(
            "Download of {} failed with status: {}",
            model.name,
            response.status()
        );
    }
    let total = response.content_length();

    let partial = partial_path(path);
    let mut file = fs::File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0_u8; 64 * 1024];
    let mut received: u64 = 0;
    loop {
        let n = response
            .read(&mut buf)
            .with_context(|| format!("Failed to read response for {}", model.name))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n])
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        received += n as u64;
        if let Some(cb) = progress {
            cb(model.name, received, total);
        }
    }
    file.flush()?;
    drop(file);

    let digest = format!("{:x}", hasher.finalize());
    if let Err(e) = verify_checksum(model, &digest) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    fs::rename(&partial, path).with_context(|| format!("Failed to install {}", path.display()))?;
    info!("Downloaded {} ({received} bytes)", model.name);
    Ok(())
}

/// Compares a downloaded file's digest with the pinned checksum.
fn verify_checksum(model: &ModelInfo, digest: &str) -> Result<()> {
    match model.sha256 {
        None => {
            warn!(
                "No checksum pinned for {}; downloaded file has sha256 {digest}",
                model.name
            );
            Ok(())
        }
        Some(expected) if expected.eq_ignore_ascii_case(digest) => Ok(()),
        Some(expected) => bail!(
            "Checksum mismatch for {}: expected {expected}, got {digest}",
            model.name
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models_dir() {
        assert!(default_models_dir().ends_with("drowsy/models"));
    }

    #[test]
    fn test_model_path() {
        let path = model_path(FACE_DETECTOR).unwrap();
        assert!(path.ends_with("blazeface.pth"));
        assert!(model_path(LANDMARK_PREDICTOR).is_some());
        assert!(model_path("unknown").is_none());
    }

    #[test]
    fn test_list_models_reports_installed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lbfmodel.yaml"), b"1234").unwrap();

        let models = list_models(dir.path());
        assert_eq!(models.len(), 2);
        assert!(!models[0].installed());
        assert!(models[1].installed());
        assert_eq!(models[1].size, Some(4));
    }

    #[test]
    fn test_require_model_missing_mentions_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let err = require_model(dir.path(), FACE_DETECTOR).unwrap_err();
        assert!(err.to_string().contains("drowsy models fetch"));

        assert!(require_model(dir.path(), "nope").is_err());

        fs::write(dir.path().join("blazeface.pth"), b"").unwrap();
        assert!(require_model(dir.path(), FACE_DETECTOR).is_ok());
    }

    #[test]
    fn test_verify_checksum() {
        let pinned = ModelInfo {
            name: "test",
            filename: "test.bin",
            url: "https://example.invalid/test.bin",
            sha256: Some("ABCDEF"),
            description: "",
        };
        assert!(verify_checksum(&pinned, "abcdef").is_ok());
        assert!(verify_checksum(&pinned, "000000").is_err());

        let unpinned = ModelInfo {
            sha256: None,
            ..pinned
        };
        assert!(verify_checksum(&unpinned, "anything").is_ok());
    }

    #[test]
    fn test_ensure_skips_installed_models() {
        let dir = tempfile::tempdir().unwrap();
        for m in MODELS {
            fs::write(dir.path().join(m.filename), b"x").unwrap();
        }
        // Nothing to fetch, so no network access happens.
        let fetched =
            ensure_models_with_progress(dir.path(), Some("http://invalid"), false, None).unwrap();
        assert!(fetched.is_empty());
    }

    #[test]
    fn test_models_come_from_upstream_unless_mirrored() {
        let detector = model_info(FACE_DETECTOR).unwrap();
        assert_eq!(download_url(detector, None), detector.url);
        assert!(detector.url.ends_with(detector.filename));
        assert_eq!(
            download_url(detector, Some("https://mirror.example/models/")),
            "https://mirror.example/models/blazeface.pth"
        );

        let landmarks = model_info(LANDMARK_PREDICTOR).unwrap();
        assert!(landmarks.url.ends_with("lbfmodel.yaml"));
    }

    #[test]
    fn test_partial_path_keeps_extension() {
        assert_eq!(
            partial_path(Path::new("/m/lbfmodel.yaml")),
            PathBuf::from("/m/lbfmodel.yaml.part")
        );
        assert_eq!(
            partial_path(Path::new("/m/blazeface.pth")),
            PathBuf::from("/m/blazeface.pth.part")
        );
    }
}
