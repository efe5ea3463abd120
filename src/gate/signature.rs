//! User-Agent signature extraction.
//!
//! Reduces a `User-Agent` header to the one fact the gate decides on: which
//! Chromium-family browser sent the request, and its major version. Matching
//! is kept separate from the HTTP layer so it can be tested on plain strings.

use std::fmt;
use std::sync::LazyLock;

use axum::http::{header, HeaderMap};
use regex::bytes::Regex;

/// `Chrom(e|ium)/<digits>.`, leftmost match, unanchored.
static CHROMIUM_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Chrom(e|ium)/([0-9]+)\.").expect("static pattern compiles")
});

/// Browser family token found in the User-Agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserFamily {
    Chrome,
    Chromium,
}

impl fmt::Display for BrowserFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserFamily::Chrome => f.write_str("Chrome"),
            BrowserFamily::Chromium => f.write_str("Chromium"),
        }
    }
}

/// Browser family and major version derived from a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserAgentSignature {
    pub family: BrowserFamily,
    pub major: u32,
}

impl UserAgentSignature {
    /// Extract a signature from a raw User-Agent value.
    ///
    /// Returns `None` when the pattern does not match or the digit run does
    /// not fit in a `u32`.
    pub fn parse(user_agent: &str) -> Option<Self> {
        Self::parse_bytes(user_agent.as_bytes())
    }

    /// Extract a signature from raw header bytes.
    ///
    /// Header values may carry obs-text (bytes >= 0x80); only the matched
    /// ASCII token has to be well-formed.
    pub fn parse_bytes(user_agent: &[u8]) -> Option<Self> {
        let caps = CHROMIUM_VERSION.captures(user_agent)?;

        let family = match caps.get(1)?.as_bytes() {
            b"e" => BrowserFamily::Chrome,
            _ => BrowserFamily::Chromium,
        };
        let major = std::str::from_utf8(caps.get(2)?.as_bytes())
            .ok()?
            .parse::<u32>()
            .ok()?;

        Some(Self { family, major })
    }

    /// Extract a signature from the `user-agent` request header.
    ///
    /// Only the first value is considered when the header is repeated.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(header::USER_AGENT)
            .and_then(|v| Self::parse_bytes(v.as_bytes()))
    }
}

impl fmt::Display for UserAgentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.family, self.major)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn sig(family: BrowserFamily, major: u32) -> Option<UserAgentSignature> {
        Some(UserAgentSignature { family, major })
    }

    #[test]
    fn test_parse_desktop_chrome() {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.6668.58 Safari/537.36";
        assert_eq!(UserAgentSignature::parse(ua), sig(BrowserFamily::Chrome, 129));
    }

    #[test]
    fn test_parse_chromium() {
        assert_eq!(
            UserAgentSignature::parse("Chromium/128.0.1"),
            sig(BrowserFamily::Chromium, 128)
        );
    }

    #[test]
    fn test_digits_followed_by_text() {
        assert_eq!(
            UserAgentSignature::parse("Chromium/129.abc"),
            sig(BrowserFamily::Chromium, 129)
        );
    }

    #[test]
    fn test_full_digit_run_is_the_version() {
        assert_eq!(
            UserAgentSignature::parse("Chrome/1290.0"),
            sig(BrowserFamily::Chrome, 1290)
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(UserAgentSignature::parse("Mozilla/5.0 (compatible)"), None);
        assert_eq!(UserAgentSignature::parse(""), None);
        // No dot after the digits.
        assert_eq!(UserAgentSignature::parse("Chrome/129"), None);
        assert_eq!(UserAgentSignature::parse("Chrome/.1"), None);
        assert_eq!(UserAgentSignature::parse("chrome/129.0"), None);
    }

    #[test]
    fn test_overflow_is_no_match() {
        assert_eq!(UserAgentSignature::parse("Chrome/99999999999999999999.0"), None);
    }

    #[test]
    fn test_leftmost_token_wins() {
        assert_eq!(
            UserAgentSignature::parse("Chromium/130.0 Chrome/129.0"),
            sig(BrowserFamily::Chromium, 130)
        );
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(UserAgentSignature::from_headers(&headers), None);

        headers.insert(header::USER_AGENT, HeaderValue::from_static("Chrome/129.0.1234.56"));
        assert_eq!(
            UserAgentSignature::from_headers(&headers),
            sig(BrowserFamily::Chrome, 129)
        );

        // Repeated header: first value is used.
        headers.append(header::USER_AGENT, HeaderValue::from_static("Chrome/128.0"));
        assert_eq!(
            UserAgentSignature::from_headers(&headers),
            sig(BrowserFamily::Chrome, 129)
        );
    }

    #[test]
    fn test_obs_text_header_value_still_matches() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_bytes(
                b"Mozilla/5.0 (Linux; Android 14; Caf\xc3\xa9Phone) Chrome/129.0.6668.58 Mobile",
            )
            .unwrap(),
        );
        assert_eq!(
            UserAgentSignature::from_headers(&headers),
            sig(BrowserFamily::Chrome, 129)
        );

        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_bytes(b"Chromium/128.0 \xff").unwrap(),
        );
        assert_eq!(
            UserAgentSignature::from_headers(&headers),
            sig(BrowserFamily::Chromium, 128)
        );
    }

    #[test]
    fn test_display() {
        let s = UserAgentSignature {
            family: BrowserFamily::Chromium,
            major: 129,
        };
        assert_eq!(s.to_string(), "Chromium/129");
    }
}
