//! Content-type classification for cached media
//!
//! Only four media types are cached. Everything else is skipped by the
//! downloader before any bytes hit the disk.

/// Extensions of every file the cache can hold
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpeg", "png", "gif", "mp4"];

/// Map a MIME type to the file extension it is cached under
///
/// Matching is case-insensitive and exact: parameters such as `; charset=`
/// must be stripped first (see [`media_type_essence`]).
///
/// # Examples
///
/// ```
/// use feed_harvest::classifier::extension_for;
///
/// assert_eq!(extension_for("image/JPEG"), Some("jpeg"));
/// assert_eq!(extension_for("video/mp4"), Some("mp4"));
/// assert_eq!(extension_for("text/html"), None);
/// ```
#[must_use]
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    const TABLE: &[(&str, &str)] = &[
        ("image/jpeg", "jpeg"),
        ("image/png", "png"),
        ("image/gif", "gif"),
        ("video/mp4", "mp4"),
    ];

    TABLE
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(mime_type))
        .map(|(_, ext)| *ext)
}

/// Strip parameters and whitespace from a Content-Type header value
///
/// `"image/png; charset=binary"` becomes `"image/png"`.
#[must_use]
pub fn media_type_essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}

/// Whether a file extension belongs to a cacheable media type
#[must_use]
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(ext))
}
