//! Overlay stream loading. All-or-nothing: one bad segment fails the load.

use kni_core::prelude::*;
use metrics::counter;
use tracing::debug;

const DEFAULT_MAX_OVERLAY_BYTES: usize = 16 * 1024 * 1024;

fn max_overlay_bytes() -> usize {
    std::env::var("KNI_MAX_OVERLAY_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_OVERLAY_BYTES)
}

/// Split a multi-document stream on lines consisting of exactly `---`.
/// Always returns at least one (possibly empty) segment.
pub fn split_documents(stream: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    for line in stream.split_inclusive('\n') {
        let end = pos + line.len();
        if line.trim_end_matches(&['\n', '\r'][..]) == "---" {
            out.push(&stream[start..pos]);
            start = end;
        }
        pos = end;
    }
    out.push(&stream[start..]);
    out
}

/// Parse an overlay stream into a keyed set, expanding list-wrappers.
///
/// Empty segments (blank or comment-only) are ignored, but a stream with no
/// documents at all is an error, as is any segment that fails to parse.
pub fn load_overlay(stream: &str) -> Result<ManifestSet> {
    load_overlay_with_limit(stream, max_overlay_bytes())
}

/// [`load_overlay`] with an explicit size cap in bytes instead of
/// `KNI_MAX_OVERLAY_BYTES`.
pub fn load_overlay_with_limit(stream: &str, max: usize) -> Result<ManifestSet> {
    if stream.len() > max {
        return Err(Error::OverlayTooLarge { size: stream.len(), max });
    }
    if stream.trim().is_empty() {
        return Err(Error::EmptyOverlay);
    }
    let mut out = ManifestSet::new();
    let mut docs = 0usize;
    for (i, segment) in split_documents(stream).into_iter().enumerate() {
        let origin = format!("overlay document {}", i);
        let Some(doc) = parse_document(segment, &origin)? else { continue };
        docs += 1;
        for (key, doc) in keyed(doc, &origin)? {
            debug!(key = %key, segment = i, "overlay resource");
            out.insert(key, doc);
        }
    }
    if docs == 0 {
        return Err(Error::EmptyOverlay);
    }
    counter!("overlay_documents_total", docs as u64);
    Ok(out)
}
