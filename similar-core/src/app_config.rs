use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use log::debug;
use serde::Deserialize;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the local data directory for this platform")]
    NoDataDirectory,
    #[error("Local data directory is not a valid UTF-8 path: {path}")]
    NonUtf8DataDirectory { path: String },
    #[error("Error during filesystem operation: {operation} at path: {path}")]
    IO { path: String, operation: &'static str, #[source] source: std::io::Error },
    #[error("Error reading configuration")]
    Config(#[from] config::ConfigError),
}

/// Settings shared by every entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub cache_file: Utf8PathBuf,
    pub model_directory: Utf8PathBuf,
    /// Relative to `model_directory` unless absolute
    pub image_model: Utf8PathBuf,
    pub session_pool_size: u32,
    pub extensions: Vec<String>,
    pub default_top_k: usize,
}

impl AppConfig {
    /// Loads configuration from `similar.toml` in the application data folder, creating the file
    /// with default values if it does not exist yet.
    ///
    /// Layers, lowest precedence first: built in defaults, the config file, then `SIMILAR_*`
    /// environment variables (eg. `SIMILAR_CACHE_FILE`, `SIMILAR_EXTENSIONS=png,webp`).
    pub fn load() -> Result<AppConfig, ConfigError> {
        let app_folder = get_app_folder()?;
        let config_file_path = app_folder.join(CONFIG_FILE_NAME);
        if !config_file_path.exists() {
            debug!("Writing default configuration to {}", config_file_path);
            fs::write(&config_file_path, DEFAULT_CONFIG).map_err(|e| ConfigError::IO {
                path: config_file_path.to_string(),
                operation: "write default config",
                source: e,
            })?;
        }

        AppConfig::from_file(&config_file_path, &app_folder)
    }

    /// Loads configuration from an explicit file, expanding `%%AppDataDirectory%%` to
    /// `app_folder`. Keys missing from the file fall back to the built in defaults.
    pub fn from_file(config_file: &Utf8Path, app_folder: &Utf8Path) -> Result<AppConfig, ConfigError> {
        debug!("Loading configuration from {}", config_file);
        let raw: RawConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(config_file.as_std_path()))
            .add_source(Environment::with_prefix("SIMILAR")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("extensions"))
            .build()?
            .try_deserialize()?;

        let expand = |s: &str| Utf8PathBuf::from(s.replace(APP_DATA_PLACEHOLDER, app_folder.as_str()));
        Ok(AppConfig {
            cache_file: expand(&raw.cache_file),
            model_directory: expand(&raw.model_directory),
            image_model: expand(&raw.image_model),
            session_pool_size: raw.session_pool_size,
            extensions: raw.extensions,
            default_top_k: raw.default_top_k,
        })
    }

    /// Full path of the image embedding model
    pub fn image_model_path(&self) -> Utf8PathBuf {
        self.model_directory.join(&self.image_model)
    }
}

// Private constants and functions

const CONFIG_FILE_NAME: &str = "similar.toml";
const APP_DATA_PLACEHOLDER: &str = "%%AppDataDirectory%%";
const DEFAULT_CONFIG: &str = include_str!("../artifacts/defaults/similar.toml");

#[derive(Deserialize)]
struct RawConfig {
    cache_file: String,
    model_directory: String,
    image_model: String,
    session_pool_size: u32,
    extensions: Vec<String>,
    default_top_k: usize,
}

fn get_app_folder() -> Result<Utf8PathBuf, ConfigError> {
    let data_dir = dirs::data_local_dir().ok_or(ConfigError::NoDataDirectory)?;
    let folder = Utf8PathBuf::from_path_buf(data_dir)
        .map_err(|p| ConfigError::NonUtf8DataDirectory { path: p.display().to_string() })?
        .join("similar");
    // Create if it doesnt exist
    fs::create_dir_all(&folder).map_err(|e| ConfigError::IO {
        path: folder.to_string(),
        operation: "create app data directory",
        source: e,
    })?;

    Ok(folder)
}
