//! Content type detection.
//!
//! [`MagicDetector`] recognises files by their leading bytes and falls back
//! to the file name when the bytes are not conclusive.
//! [`detect_content_type`] wraps any [`ContentDetector`] with its own file
//! handle and never fails: every problem downgrades to
//! `application/octet-stream`.

use std::path::Path;
use std::str::FromStr;

use mime::Mime;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::contract::{ContentDetector, DetectError};

/// Number of leading bytes handed to the detector.
pub const HEAD_LEN: u64 = 8192;

/// Magic-number detector with a file-name fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicDetector;

impl ContentDetector for MagicDetector {
    fn detect(&self, head: &[u8], file_name: &str) -> Result<Mime, DetectError> {
        if let Some(kind) = infer::get(head) {
            return Mime::from_str(kind.mime_type())
                .map_err(|e| DetectError(format!("{}: {e}", kind.mime_type())));
        }
        if let Some(guess) = mime_guess::from_path(file_name).first() {
            return Ok(guess);
        }
        if !head.is_empty() && looks_like_text(head) {
            return Ok(mime::TEXT_PLAIN);
        }
        Ok(mime::APPLICATION_OCTET_STREAM)
    }
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte sequence cut at the end of the buffer is still text.
        Err(e) => e.error_len().is_none(),
    }
}

/// Detect the MIME type of the file at `path`.
///
/// Opens a dedicated handle, reads at most [`HEAD_LEN`] bytes and releases
/// the handle before returning, whatever the outcome.
pub async fn detect_content_type<D>(detector: &D, path: &Path, file_name: &str) -> Mime
where
    D: ContentDetector + ?Sized,
{
    let head = match read_head(path).await {
        Ok(head) => head,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "[SYNC][DETECT] Could not read file head, using unknown type");
            return mime::APPLICATION_OCTET_STREAM;
        }
    };
    match detector.detect(&head, file_name) {
        Ok(mime) => {
            debug!(path = %path.display(), mime = %mime, "[SYNC][DETECT] Detected content type");
            mime
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "[SYNC][DETECT] Detection failed, using unknown type");
            mime::APPLICATION_OCTET_STREAM
        }
    }
}

async fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut head = Vec::with_capacity(HEAD_LEN as usize);
    file.take(HEAD_LEN).read_to_end(&mut head).await?;
    Ok(head)
}
