//! Upstream data acquisition with a local on-disk cache.
//!
//! Inputs are given as locations. A plain path is used as-is. An `http://` or
//! `https://` URL is downloaded once and stored under the cache directory
//! (`ODA_CACHE_DIR`, default `.cache/oda`); later runs read the cached copy
//! unless a refresh is requested. Failed downloads are not retried.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::AppError;

const DEFAULT_CACHE_DIR: &str = ".cache/oda";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct DataSource {
    client: Client,
    cache_dir: PathBuf,
    refresh: bool,
}

impl DataSource {
    /// Build a source from the environment (`.env` is honoured).
    pub fn from_env(refresh: bool) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let cache_dir = std::env::var("ODA_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR));
        Self::with_cache_dir(cache_dir, refresh)
    }

    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>, refresh: bool) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::compute(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            cache_dir: cache_dir.into(),
            refresh,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Turn a location into a readable local path, downloading if needed.
    pub fn resolve(&self, location: &str) -> Result<PathBuf, AppError> {
        if !is_remote(location) {
            let path = PathBuf::from(location);
            if !path.exists() {
                return Err(AppError::input(format!("Input file '{location}' does not exist.")));
            }
            return Ok(path);
        }

        let cached = self.cache_dir.join(cache_file_name(location));
        if cached.exists() && !self.refresh {
            debug!(url = location, path = %cached.display(), "using cached download");
            return Ok(cached);
        }

        fs::create_dir_all(&self.cache_dir).map_err(|e| {
            AppError::input(format!(
                "Failed to create cache dir '{}': {e}",
                self.cache_dir.display()
            ))
        })?;
        let body = self.download(location)?;
        fs::write(&cached, &body)
            .map_err(|e| AppError::input(format!("Failed to write cache file '{}': {e}", cached.display())))?;
        info!(url = location, bytes = body.len(), "downloaded");
        Ok(cached)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::compute(format!("Request to '{url}' failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::compute(format!(
                "Request to '{url}' failed with status {}.",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| AppError::compute(format!("Failed to read response from '{url}': {e}")))?;
        Ok(bytes.to_vec())
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// File name for a URL: SHA-256 prefix of the URL plus its extension.
fn cache_file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 5)
        .unwrap_or("csv");
    format!("{}.{ext}", hex::encode(&digest[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_names_are_stable_and_keep_extension() {
        let a = cache_file_name("https://example.org/data/oda.json?year=2023");
        let b = cache_file_name("https://example.org/data/oda.json?year=2023");
        let c = cache_file_name("https://example.org/data/oda.json?year=2022");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with(".json"));
        assert!(cache_file_name("https://example.org/export").ends_with(".csv"));
    }

    #[test]
    fn cache_name_is_fixed_across_builds() {
        // First 8 bytes of SHA-256("https://example.org/a.csv").
        assert_eq!(cache_file_name("https://example.org/a.csv"), "ea8b42c77522f8ed.csv");
    }

    #[test]
    fn local_paths_pass_through() {
        let path = std::env::temp_dir().join(format!("oda_source_{}.csv", std::process::id()));
        fs::write(&path, "entity,year,value\n").unwrap();
        let source = DataSource::with_cache_dir(std::env::temp_dir(), false).unwrap();
        let location = path.to_string_lossy().to_string();
        assert_eq!(source.resolve(&location).unwrap(), path);
        fs::remove_file(&path).ok();
        assert_eq!(source.resolve(&location).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn cached_download_is_reused() {
        let dir = std::env::temp_dir().join(format!("oda_cache_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let url = "https://example.invalid/cached.csv";
        let cached = dir.join(cache_file_name(url));
        fs::write(&cached, "entity,year,value\n1,2020,1\n").unwrap();

        let source = DataSource::with_cache_dir(&dir, false).unwrap();
        assert_eq!(source.resolve(url).unwrap(), cached);
        fs::remove_dir_all(&dir).ok();
    }
}
