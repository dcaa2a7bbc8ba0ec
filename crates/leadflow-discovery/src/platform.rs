//! Platform detection from a lead's canonical URL.

/// Maps a profile URL to a known platform by domain pattern.
///
/// Returns `None` for URLs that match no known platform; callers store the
/// lead with a null platform rather than guessing.
#[must_use]
pub fn detect_platform(url: &str) -> Option<&'static str> {
    let url = url.to_lowercase();
    if url.contains("tiktok.com") {
        Some("tiktok")
    } else if url.contains("instagram.com") {
        Some("instagram")
    } else if url.contains("youtube.com") || url.contains("youtu.be") {
        Some("youtube")
    } else if url.contains("twitter.com") || url.contains("x.com") {
        Some("twitter")
    } else if url.contains("linkedin.com") {
        Some("linkedin")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_platforms() {
        assert_eq!(detect_platform("https://www.tiktok.com/@user"), Some("tiktok"));
        assert_eq!(
            detect_platform("https://instagram.com/someone"),
            Some("instagram")
        );
        assert_eq!(
            detect_platform("https://www.youtube.com/@channel"),
            Some("youtube")
        );
        assert_eq!(detect_platform("https://youtu.be/abc123"), Some("youtube"));
        assert_eq!(detect_platform("https://twitter.com/handle"), Some("twitter"));
        assert_eq!(detect_platform("https://x.com/handle"), Some("twitter"));
        assert_eq!(
            detect_platform("https://www.linkedin.com/in/person"),
            Some("linkedin")
        );
    }

    #[test]
    fn detection_is_case_insensitive() {
        assert_eq!(detect_platform("https://WWW.TikTok.COM/@User"), Some("tiktok"));
    }

    #[test]
    fn unknown_domains_return_none() {
        assert_eq!(detect_platform("https://myblog.example.com"), None);
        assert_eq!(detect_platform("https://podcasts.apple.com/show"), None);
    }
}
