pub use url::Url;

/// Resolves a (possibly relative) reference against the page's base URL
pub fn resolve_url(from: &Url, to: &str) -> Result<Url, url::ParseError> {
    from.join(to.trim())
}

/// Returns the extension of the last path segment, dot included
///
/// Mirrors the behaviour of taking the extension of a URL's path: the
/// query string and fragment never contribute, a trailing slash yields
/// nothing, and a segment like `.hidden` is its own extension.
pub fn path_extension(url: &Url) -> String {
    let path = url.path();
    let last_segment = path.rsplit('/').next().unwrap_or("");

    match last_segment.rfind('.') {
        Some(i) => last_segment[i..].to_string(),
        None => String::new(),
    }
}

/// Infers the content type to store an image under, from its extension
///
/// Only the lowercase spellings are known; anything else is stored untyped.
pub fn image_content_type(extension: &str) -> Option<&'static str> {
    match extension {
        ".jpg" | ".jpeg" => Some("image/jpeg"),
        ".png" => Some("image/png"),
        ".gif" => Some("image/gif"),
        _ => None,
    }
}

/// Joins a reference base (e.g. a CDN prefix) and an identifier with exactly one slash
pub fn join_reference(base: &str, identifier: &str) -> String {
    if base.is_empty() {
        return identifier.to_string();
    }

    format!("{}/{}", base.trim_end_matches('/'), identifier)
}
