//! Upload validation: reject anything that is obviously not a usable PDF
//! before any parser sees it.
//!
//! Checks run in a fixed order (content type, size, emptiness, magic bytes)
//! so the caller always gets the same error for the same upload.

use crate::error::StatementError;
use tracing::debug;

/// The only accepted upload content type.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Validate an uploaded statement.
///
/// `content_type` is whatever the transport declared; `None` skips that
/// check. Errors are all in the input-validation class and are never retried.
pub fn validate_upload(
    content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<(), StatementError> {
    if let Some(ct) = content_type {
        if !is_pdf_content_type(ct) {
            return Err(StatementError::UnsupportedContentType {
                content_type: ct.to_string(),
            });
        }
    }

    if bytes.len() > max_bytes {
        return Err(StatementError::FileTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    if bytes.is_empty() {
        return Err(StatementError::EmptyFile);
    }

    if !bytes.starts_with(b"%PDF") {
        // Shorter uploads report their bytes zero-padded.
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(StatementError::NotAPdf { magic });
    }

    debug!("Upload accepted: {} bytes", bytes.len());
    Ok(())
}

/// Accept `application/pdf`, ignoring parameters such as `; charset=binary`.
fn is_pdf_content_type(ct: &str) -> bool {
    ct.split(';')
        .next()
        .map(|base| base.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Best-effort content type for a local file name.
pub fn content_type_for_filename(filename: &str) -> Option<&'static str> {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        Some(PDF_CONTENT_TYPE)
    } else {
        None
    }
}
