//! Input resolution: turn a user-supplied path or URL into document bytes.
//!
//! Extraction works on an in-memory buffer, so a URL is downloaded straight
//! into memory and never touches the file system. Format detection happens
//! later, in [`crate::pipeline::extract`].

use crate::error::CashflowError;
use std::path::PathBuf;
use tracing::{debug, info};

/// A document loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    /// Where the bytes came from, for logs and messages.
    pub source: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to document bytes.
///
/// If the input is a URL, download it. If the input is a local file,
/// read it, mapping missing files and permission problems to their own
/// errors.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, CashflowError> {
    if input.trim().is_empty() {
        return Err(CashflowError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, CashflowError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(CashflowError::FileNotFound { path });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(CashflowError::PermissionDenied { path });
        }
        Err(_) => return Err(CashflowError::FileNotFound { path }),
    };

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(ResolvedInput {
        source: path.display().to_string(),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, CashflowError> {
    info!("Downloading statement from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CashflowError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            CashflowError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CashflowError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_err)?;

    if !response.status().is_success() {
        return Err(CashflowError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_err)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(ResolvedInput {
        source: url.to_string(),
        bytes: bytes.to_vec(),
    })
}
