//! Video link detection.
//!
//! Recognizes `youtube.com/watch?v=` links (with optional `www.` / `m.`) and
//! `youtu.be/` short links. The scheme is optional, matching is case-insensitive.

// lazy_regex! uses once_cell internally and validates the pattern at compile time
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;

/// Video link: host variants, short-link variant, video id of at least 6 chars
static RE_VIDEO_LINK: lazy_regex::Lazy<regex::Regex> = lazy_regex!(
    r"(?i)(https?://)?(www\.)?(m\.)?(youtube\.com/watch\?v=|youtu\.be/)[A-Za-z0-9_\-]{6,}"
);

/// Returns the first recognized video link in `text`, if any.
///
/// # Examples
///
/// ```
/// use oxide_media_bot::media::link::detect_link;
/// let text = "check this out https://youtu.be/dQw4w9WgXcQ extra text";
/// assert_eq!(detect_link(text).as_deref(), Some("https://youtu.be/dQw4w9WgXcQ"));
/// assert_eq!(detect_link("no links here"), None);
/// ```
#[must_use]
pub fn detect_link(text: &str) -> Option<String> {
    RE_VIDEO_LINK.find(text).map(|m| m.as_str().to_string())
}

/// Adds `https://` to links written without a scheme.
#[must_use]
pub fn normalize_link(link: &str) -> String {
    let lower = link.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        link.to_string()
    } else {
        format!("https://{link}")
    }
}

/// True when the locator looks like a URL rather than a search query.
#[must_use]
pub fn is_url(locator: &str) -> bool {
    let lower = locator.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || detect_link(locator).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_detects_short_link_in_sentence() {
        let text = "check this out https://youtu.be/dQw4w9WgXcQ extra text";
        assert_eq!(
            detect_link(text).as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_host_variants() {
        for link in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "www.youtube.com/watch?v=dQw4w9WgXcQ",
            "youtu.be/dQw4w9WgXcQ",
            "HTTPS://WWW.YOUTUBE.COM/watch?v=dQw4w9WgXcQ",
        ] {
            let text = format!("look: {link} !");
            assert_eq!(detect_link(&text).as_deref(), Some(link), "variant {link}");
        }
    }

    #[test]
    fn test_stops_at_query_separator() {
        let text = "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s";
        assert_eq!(
            detect_link(text).as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_rejects_short_ids_and_other_hosts() {
        assert_eq!(detect_link("https://youtu.be/abc"), None);
        assert_eq!(detect_link("https://vimeo.com/123456789"), None);
        assert_eq!(detect_link("https://youtube.com/channel/UC123456"), None);
        assert_eq!(detect_link(""), None);
    }

    #[test]
    fn test_first_match_wins() {
        let text = "youtu.be/AAAAAAAA and youtu.be/BBBBBBBB";
        assert_eq!(detect_link(text).as_deref(), Some("youtu.be/AAAAAAAA"));
    }

    #[test]
    fn test_normalize_link() {
        assert_eq!(normalize_link("youtu.be/dQw4w9WgXcQ"), "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(
            normalize_link("http://youtu.be/dQw4w9WgXcQ"),
            "http://youtu.be/dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/video"));
        assert!(is_url("youtu.be/dQw4w9WgXcQ"));
        assert!(!is_url("shape of you"));
    }

    proptest! {
        /// Any embedded link is returned verbatim.
        #[test]
        fn finds_embedded_link(
            prefix in "[a-z ]{0,20}",
            suffix in "( [a-z ]{0,20})?",
            scheme in "(https?://)?",
            host in "(www\\.youtube\\.com/watch\\?v=|m\\.youtube\\.com/watch\\?v=|youtube\\.com/watch\\?v=|youtu\\.be/)",
            id in "[A-Za-z0-9_-]{6,16}",
        ) {
            let link = format!("{scheme}{host}{id}");
            let text = format!("{prefix} {link}{suffix}");
            prop_assert_eq!(detect_link(&text), Some(link));
        }

        /// Text without the link shape never matches.
        #[test]
        fn no_match_without_link(s in "[a-zA-Z0-9 .,!?]*") {
            prop_assume!(!s.to_ascii_lowercase().contains("youtu"));
            prop_assert_eq!(detect_link(&s), None);
        }
    }
}
