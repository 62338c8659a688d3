use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use ort::execution_providers::*;

use crate::{app_config::AppConfig, embedding::{EmbeddingError, siglip2::Siglip2ImageEmbedder}};

#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error("Could not initialize ONNX Runtime from library: {}", library.as_ref().map_or("<system search path>", |p| p.as_str()))]
    Init { library: Option<Utf8PathBuf>, #[source] source: anyhow::Error },
}

#[cfg(windows)]
const ONNX_LIBRARY_NAME: &str = "onnxruntime.dll";
#[cfg(target_os = "macos")]
const ONNX_LIBRARY_NAME: &str = "libonnxruntime.dylib";
#[cfg(all(not(windows), not(target_os = "macos")))]
const ONNX_LIBRARY_NAME: &str = "libonnxruntime.so";

/// Initializes ONNX Runtime once per process, before any embedder is created.
///
/// With `lib_dir`, the platform library (eg. `libonnxruntime.so`) is loaded from that directory.
/// Otherwise `ORT_DYLIB_PATH` or the system search path decides. Execution providers follow the
/// enabled cargo features, with CPU always registered last as the fallback.
pub fn init_ort(lib_dir: Option<&Utf8Path>) -> Result<(), RuntimeError> {
    let mut execution_providers = vec![];

    #[cfg(feature = "qnn")]
    {
        let backend = lib_dir.map_or_else(|| "QnnHtp.dll".to_string(), |dir| dir.join("QnnHtp.dll").to_string());
        execution_providers.push(QNNExecutionProvider::default()
            .with_backend_path(backend)
            .build()
            .error_on_failure());
    }
    #[cfg(feature = "cuda")]
    execution_providers.push(CUDAExecutionProvider::default().build().error_on_failure());
    execution_providers.push(CPUExecutionProvider::default().build());

    let library = lib_dir.map(|dir| dir.join(ONNX_LIBRARY_NAME));
    debug!("Environment: Initializing ONNX Runtime, library: {:?}", library);
    let builder = match &library {
        Some(path) => ort::init_from(path.clone()),
        None => ort::init(),
    };

    builder.with_execution_providers(execution_providers)
        .commit()
        .map_err(|e| RuntimeError::Init { library: library.clone(), source: anyhow::anyhow!("{e}") })?;

    info!("Environment: ONNX Runtime initialized");
    Ok(())
}

/// Loads the configured image embedding model. [`init_ort`] must be called first.
pub fn init_image_embedder(config: &AppConfig) -> Result<Siglip2ImageEmbedder, EmbeddingError> {
    Siglip2ImageEmbedder::from_file(&config.image_model_path(), config.session_pool_size)
}
