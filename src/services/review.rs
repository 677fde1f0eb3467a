//! Content-type classification for auto review.
//!
//! A heuristic gate, not a security boundary: it exists to shrink the
//! moderation queue, not to replace human review of ambiguous content.

/// How many leading bytes to fetch for magic-byte detection.
pub const SNIFF_LEN: u64 = 1024;

/// Detect a MIME type from the leading bytes of an object.
pub fn detect_mime(head: &[u8]) -> Option<&'static str> {
    infer::get(head).map(|kind| kind.mime_type())
}

/// Whether a detected MIME type is low-risk enough to auto-approve.
/// Undetected content is always escalated.
pub fn is_mime_safe(mime: &str) -> bool {
    if mime.is_empty() {
        return false;
    }
    mime.contains("image")
        || mime.contains("pdf")
        || mime.contains("video")
        || mime.contains("audio")
        || mime.contains("text")
}
