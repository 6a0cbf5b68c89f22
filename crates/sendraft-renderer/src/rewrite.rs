/// The marker that replaces an uploaded image.
pub fn hosted_marker(alt: &str, url: &str) -> String {
    format!("![{alt}]({url})")
}

/// Replace the first occurrence of `raw_marker` in `working` with a marker pointing at
/// `url`. Returns `false` if the marker is no longer present.
///
/// Only one occurrence is replaced per call. When the same marker text appears several
/// times, each successful upload of it consumes the next remaining occurrence.
pub fn rewrite_marker(working: &mut String, raw_marker: &str, alt: &str, url: &str) -> bool {
    if raw_marker.is_empty() {
        return false;
    }
    match working.find(raw_marker) {
        Some(start) => {
            working.replace_range(start..start + raw_marker.len(), &hosted_marker(alt, url));
            true
        }
        None => false,
    }
}
