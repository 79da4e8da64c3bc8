//! Download utilities: resumable file transfer and filename helpers.
//!
//! The aggregation engine stops at resolved download URLs; the transfer
//! itself lives here. What the two layers share is the failure
//! classification: transfer errors come back as the same transient/permanent
//! [`FailureKind`](crate::FailureKind) scheme the adapters use, so
//! [`download_with_retry`] can reuse the crate's
//! [`RetryPolicy`](crate::retry::RetryPolicy) unchanged. And because
//! transfers resume from the bytes already on disk, a retried download does
//! not start over.

use std::path::Path;

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::types::Quality;

/// Downloads a file, resuming from a partial file when one exists.
///
/// If `output_path` already holds bytes, the request carries a `Range`
/// header and appends from where the previous attempt stopped; servers that
/// ignore the range (responding 200 instead of 206) cause a clean restart.
/// The body is streamed to disk in chunks rather than buffered whole.
///
/// # Returns
///
/// The total size of the file on disk after the transfer.
///
/// # Examples
///
/// ```rust,no_run
/// use hakken::download::download_file;
/// use std::path::Path;
///
/// # async fn example() -> hakken::Result<()> {
/// let bytes = download_file(
///     "https://cdn.example.com/ep-005-1080p.mp4",
///     Path::new("./downloads/ep-005.mp4"),
/// ).await?;
/// println!("{} bytes on disk", bytes);
/// # Ok(())
/// # }
/// ```
pub async fn download_file(url: &str, output_path: &Path) -> Result<u64> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let resume_from = match fs::metadata(output_path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
        _ => 0,
    };

    let client = reqwest::Client::new();
    let mut request = client.get(url);
    if resume_from > 0 {
        request = request.header("Range", format!("bytes={}-", resume_from));
    }

    let response = request.send().await?;
    let status = response.status();

    if !(status.is_success() || status == reqwest::StatusCode::PARTIAL_CONTENT) {
        return Err(if status.is_server_error() {
            Error::transient("download", format!("HTTP {} for {}", status, url))
        } else {
            Error::permanent("download", format!("HTTP {} for {}", status, url))
        });
    }

    let appending = status == reqwest::StatusCode::PARTIAL_CONTENT && resume_from > 0;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(appending)
        .truncate(!appending)
        .open(output_path)
        .await?;

    let mut written = if appending { resume_from } else { 0 };
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// Downloads a file through the shared retry policy.
///
/// Transient transfer failures (dropped connections, 5xx responses) are
/// retried with the policy's backoff; each retry resumes from the partial
/// file. `deadline` bounds the total transfer time, retries included.
///
/// # Examples
///
/// ```rust,no_run
/// use std::path::Path;
/// use std::time::Duration;
/// use hakken::download::download_with_retry;
/// use hakken::retry::RetryPolicy;
///
/// # async fn example() -> hakken::Result<()> {
/// let policy = RetryPolicy::new(5);
/// download_with_retry(
///     "https://cdn.example.com/ep-005-1080p.mp4",
///     Path::new("./downloads/ep-005.mp4"),
///     &policy,
///     Duration::from_secs(1800),
/// ).await?;
/// # Ok(())
/// # }
/// ```
pub async fn download_with_retry(
    url: &str,
    output_path: &Path,
    policy: &RetryPolicy,
    deadline: std::time::Duration,
) -> Result<u64> {
    policy
        .run(deadline, || download_file(url, output_path))
        .await
}

/// Sanitizes a filename by replacing characters invalid on common filesystems.
///
/// # Examples
///
/// ```rust
/// use hakken::download::sanitize_filename;
///
/// let clean = sanitize_filename("Episode 5: Ballad / of Fallen Angels?");
/// assert_eq!(clean, "Episode 5_ Ballad _ of Fallen Angels_");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    let mut sanitized = name.to_string();

    for &ch in &invalid_chars {
        sanitized = sanitized.replace(ch, "_");
    }

    sanitized = sanitized.trim().to_string();
    if sanitized.len() > 200 {
        sanitized.truncate(200);
    }

    if sanitized.is_empty() {
        sanitized = "untitled".to_string();
    }

    sanitized
}

/// Extracts a file extension from a URL, ignoring query and fragment parts.
///
/// # Examples
///
/// ```rust
/// use hakken::download::extract_extension;
///
/// assert_eq!(extract_extension("https://cdn.example.com/ep5.mp4"), Some("mp4".to_string()));
/// assert_eq!(extract_extension("https://cdn.example.com/ep5.m3u8?token=abc"), Some("m3u8".to_string()));
/// assert_eq!(extract_extension("https://cdn.example.com/stream"), None);
/// ```
pub fn extract_extension(url: &str) -> Option<String> {
    let clean_url = url.split('?').next()?.split('#').next()?;
    let path = clean_url.split('/').next_back()?;

    if let Some(dot_pos) = path.rfind('.') {
        let ext = &path[dot_pos + 1..];
        if !ext.is_empty() && ext.len() <= 10 {
            return Some(ext.to_lowercase());
        }
    }

    None
}

/// Builds a conventional output filename for one episode download.
///
/// # Examples
///
/// ```rust
/// use hakken::download::episode_filename;
/// use hakken::types::Quality;
///
/// let name = episode_filename("Cowboy Bebop", 5, Quality::Q1080, "mp4");
/// assert_eq!(name, "Cowboy Bebop - E005 [1080p].mp4");
/// ```
pub fn episode_filename(title: &str, number: u32, quality: Quality, extension: &str) -> String {
    sanitize_filename(&format!(
        "{} - E{:03} [{}].{}",
        title, number, quality, extension
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("normal_file.mp4"), "normal_file.mp4");
        assert_eq!(
            sanitize_filename("file/with\\bad:chars"),
            "file_with_bad_chars"
        );
        assert_eq!(sanitize_filename(""), "untitled");

        let long_name = "a".repeat(250);
        let sanitized = sanitize_filename(&long_name);
        assert!(sanitized.len() <= 200);
    }

    #[test]
    fn test_extract_extension() {
        assert_eq!(
            extract_extension("https://example.com/video.mp4"),
            Some("mp4".to_string())
        );
        assert_eq!(
            extract_extension("https://example.com/video.MKV"),
            Some("mkv".to_string())
        );
        assert_eq!(
            extract_extension("https://example.com/video.mp4?v=123"),
            Some("mp4".to_string())
        );
        assert_eq!(extract_extension("https://example.com/video"), None);
        assert_eq!(extract_extension("https://example.com/video."), None);
    }

    #[test]
    fn test_episode_filename() {
        assert_eq!(
            episode_filename("Trigun", 12, Quality::Q720, "mkv"),
            "Trigun - E012 [720p].mkv"
        );
        // Invalid characters in the title are sanitized away
        assert_eq!(
            episode_filename("Re:Zero", 1, Quality::Q1080, "mp4"),
            "Re_Zero - E001 [1080p].mp4"
        );
    }
}
