// ============================================================
// Layer 6 — Cached Downloads
// ============================================================
// Fetches a file over HTTPS once and reuses the local copy on
// every later run, the way Keras caches its datasets under
// ~/.keras/datasets.
//
// The body is written to `<name>.part` first and renamed when
// complete, so an interrupted download never leaves a truncated
// file that would be mistaken for a cached one.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Return `dest` if it already exists, otherwise download `url` into it.
pub fn fetch_cached(url: &str, dest: &Path) -> Result<PathBuf> {
    if dest.exists() {
        tracing::debug!("Using cached '{}'", dest.display());
        return Ok(dest.to_path_buf());
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }

    tracing::info!("Downloading {} → '{}'", url, dest.display());

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Download of {url} failed"))?;

    if !response.status().is_success() {
        bail!("Download of {url} returned HTTP {}", response.status());
    }

    let bytes = response
        .bytes()
        .with_context(|| format!("Reading body of {url} failed"))?;

    let partial = dest.with_extension("part");
    fs::write(&partial, &bytes)
        .with_context(|| format!("Cannot write '{}'", partial.display()))?;
    fs::rename(&partial, dest)
        .with_context(|| format!("Cannot move download into '{}'", dest.display()))?;

    tracing::info!("Downloaded {} bytes", bytes.len());
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_file_is_not_downloaded() {
        let dir  = std::env::temp_dir().join("ai_demos_download_test");
        fs::create_dir_all(&dir).unwrap();
        let dest = dir.join("cached.bin");
        fs::write(&dest, b"already here").unwrap();

        // An unroutable URL proves no request is made
        let path = fetch_cached("http://127.0.0.1:9/never", &dest).unwrap();
        assert_eq!(path, dest);
        assert_eq!(fs::read(&dest).unwrap(), b"already here");
    }
}
