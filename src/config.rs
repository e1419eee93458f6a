use dotenv::dotenv;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::services::uploader::{
    LookupMode, UploaderConfig, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_PUBLIC_PREFIX,
};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Incoming temp files would be listed as stored files.
    #[error("UPLOAD_TMP_DIR must not be the upload directory ({})", .0.display())]
    TmpDirIsUploadDir(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_url: String,
    pub service_port: u16,
    pub workers: usize,
    pub cors_domains: Vec<String>,
    pub is_development: bool,

    pub upload_dir: PathBuf,
    pub upload_public_prefix: String,
    pub upload_tmp_dir: Option<PathBuf>,
    pub upload_max_bytes: usize,
    pub upload_allowed_extensions: Vec<String>,
    pub upload_lookup_mode: LookupMode,
}

impl Config {
    pub fn new() -> Self {
        dotenv().ok();

        Config {
            app_url: Self::get_env("APP_URL", "127.0.0.1"),
            service_port: Self::get_env_parsed("SERVICE_PORT", 8080),
            workers: Self::get_env_parsed("WORKERS", 2),
            cors_domains: Self::get_env_list("CORS_DOMAINS", ""),
            is_development: Self::get_env_parsed("IS_DEVELOPMENT", false),

            upload_dir: PathBuf::from(Self::get_env("UPLOAD_DIR", "public/uploads")),
            upload_public_prefix: Self::get_env("UPLOAD_PUBLIC_PREFIX", DEFAULT_PUBLIC_PREFIX),
            upload_tmp_dir: env::var("UPLOAD_TMP_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            upload_max_bytes: Self::get_env_parsed("UPLOAD_MAX_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            upload_allowed_extensions: Self::get_env_list(
                "UPLOAD_ALLOWED_EXTENSIONS",
                &DEFAULT_ALLOWED_EXTENSIONS.join(","),
            ),
            upload_lookup_mode: Self::get_env_parsed("UPLOAD_LOOKUP_MODE", LookupMode::Indexed),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.upload_tmp_dir {
            Some(tmp) if same_dir(tmp, &self.upload_dir) => {
                Err(ConfigError::TmpDirIsUploadDir(self.upload_dir.clone()))
            }
            _ => Ok(()),
        }
    }

    pub fn uploader_config(&self) -> UploaderConfig {
        UploaderConfig::new(&self.upload_dir)
            .public_prefix(&self.upload_public_prefix)
            .allowed_extensions(self.upload_allowed_extensions.iter().cloned())
            .lookup_mode(self.upload_lookup_mode)
    }

    fn get_env(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    fn get_env_list(key: &str, default: &str) -> Vec<String> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Unparseable values fall back to `default` with a warning.
    fn get_env_parsed<T>(key: &str, default: T) -> T
    where
        T: FromStr + std::fmt::Debug,
    {
        match env::var(key) {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, ?default, "Invalid value, using default");
                default
            }),
            Err(_) => default,
        }
    }
}

/// Compares resolved paths when both exist, the paths as written otherwise.
fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
