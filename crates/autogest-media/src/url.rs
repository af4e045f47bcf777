//! # Delivery URL Helpers
//!
//! Building and taking apart Cloudinary delivery URLs.
//!
//! ```text
//! https://res.cloudinary.com/{cloud}/image/upload/{transform}/v{version}/{public_id}.{ext}
//!                                               ▲             ▲          ▲
//!                                    optional ──┘   optional ─┘          └── may contain '/'
//! ```

use crate::loader::ImageSize;

const DELIVERY_HOST: &str = "https://res.cloudinary.com";
const UPLOAD_SEGMENT: &str = "/upload/";

/// Builds the delivery URL of `public_id`, optionally transformed.
///
/// ## Example
/// ```rust
/// use autogest_media::url::delivery_url;
///
/// assert_eq!(
///     delivery_url("demo", "gestion-autos/autos/abc", Some("w_50,h_50,c_fill")),
///     "https://res.cloudinary.com/demo/image/upload/w_50,h_50,c_fill/gestion-autos/autos/abc"
/// );
/// ```
pub fn delivery_url(cloud_name: &str, public_id: &str, transformation: Option<&str>) -> String {
    match transformation.filter(|t| !t.is_empty()) {
        Some(t) => format!("{DELIVERY_HOST}/{cloud_name}/image/upload/{t}/{public_id}"),
        None => format!("{DELIVERY_HOST}/{cloud_name}/image/upload/{public_id}"),
    }
}

/// Recovers the public id from a delivery URL.
///
/// The version segment (`v1712345678`) and the file extension are
/// dropped; folders are kept.
///
/// ## Returns
/// `None` when the URL has no `upload` segment or nothing after it.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once(UPLOAD_SEGMENT)?;

    let mut segments: Vec<&str> = rest
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if segments.first().is_some_and(|s| is_version(s)) && segments.len() > 1 {
        segments.remove(0);
    }

    let last = segments.pop()?;
    let stem = match last.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => last,
    };
    segments.push(stem);

    Some(segments.join("/"))
}

/// Rewrites a Cloudinary URL so the provider serves a small thumbnail
/// (`w_{w},h_{h},c_fill,q_auto:low,f_auto`).
///
/// Other URLs, and URLs without exactly one `/upload/` segment, are
/// returned unchanged.
pub fn thumbnail_url(url: &str, size: ImageSize) -> String {
    if !url.contains("cloudinary.com") || url.matches(UPLOAD_SEGMENT).count() != 1 {
        return url.to_string();
    }

    match url.split_once(UPLOAD_SEGMENT) {
        Some((head, tail)) => format!(
            "{head}{UPLOAD_SEGMENT}w_{},h_{},c_fill,q_auto:low,f_auto/{tail}",
            size.width, size.height
        ),
        None => url.to_string(),
    }
}

fn is_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str =
        "https://res.cloudinary.com/demo/image/upload/v1712345678/gestion-autos/autos/abc123.jpg";

    #[test]
    fn test_public_id_from_versioned_url() {
        assert_eq!(
            public_id_from_url(URL).as_deref(),
            Some("gestion-autos/autos/abc123")
        );
    }

    #[test]
    fn test_public_id_without_version_or_extension() {
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/sample").as_deref(),
            Some("sample")
        );
    }

    #[test]
    fn test_folder_starting_with_v_is_kept() {
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/ventas/x.png")
                .as_deref(),
            Some("ventas/x")
        );
    }

    #[test]
    fn test_public_id_rejects_foreign_urls() {
        assert_eq!(public_id_from_url("https://example.com/a.jpg"), None);
        assert_eq!(public_id_from_url(""), None);
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/"),
            None
        );
    }

    #[test]
    fn test_thumbnail_url_inserts_transformation() {
        assert_eq!(
            thumbnail_url(URL, ImageSize::new(50, 50)),
            "https://res.cloudinary.com/demo/image/upload/w_50,h_50,c_fill,q_auto:low,f_auto/v1712345678/gestion-autos/autos/abc123.jpg"
        );
    }

    #[test]
    fn test_thumbnail_url_leaves_other_urls_alone() {
        let other = "http://127.0.0.1:8080/upload/a.png";
        assert_eq!(thumbnail_url(other, ImageSize::default()), other);
    }

    #[test]
    fn test_delivery_url_round_trips_public_id() {
        let url = delivery_url("demo", "gestion-autos/autos/abc", None);
        assert_eq!(
            public_id_from_url(&url).as_deref(),
            Some("gestion-autos/autos/abc")
        );
    }
}
