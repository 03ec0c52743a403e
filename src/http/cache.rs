//! HTTP cache validation module
//!
//! Provides content-derived `ETag` generation and `If-None-Match` matching.
//!
//! An `ETag` here is the SHA-1 digest of the content, encoded as standard
//! base64 and wrapped in double quotes. Buffered and streamed content yield
//! the same tag for the same bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::fmt;
use std::io::{self, Read};

/// Read chunk size used when digesting a stream
const DIGEST_CHUNK_SIZE: usize = 8 * 1024;

/// Prefix marking a weak validator
const WEAK_PREFIX: &str = "W/";

/// Validator strength, chosen by the caller rather than derived from content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    #[default]
    Strong,
    Weak,
}

/// How the client's `If-None-Match` header is compared to a computed `ETag`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The whole header value must equal the tag byte for byte
    #[default]
    Exact,
    /// Comma-separated list of tags, or `*`
    List,
}

/// Opaque entity tag, e.g. `"2jmj7l5rSw0yVb/vlWAYkK/YBwk="` or `W/"..."`
///
/// Two tags are equal iff their encoded strings are identical,
/// weak prefix and quotes included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityTag(String);

impl EntityTag {
    /// Wrap a raw digest into a strong tag
    fn from_digest(digest: &[u8]) -> Self {
        Self(format!("\"{}\"", STANDARD.encode(digest)))
    }

    /// Apply the requested strength to this tag
    #[must_use]
    pub fn with_strength(self, strength: Strength) -> Self {
        match strength {
            Strength::Strong => self,
            Strength::Weak if self.is_weak() => self,
            Strength::Weak => Self(format!("{WEAK_PREFIX}{}", self.0)),
        }
    }

    pub fn is_weak(&self) -> bool {
        self.0.starts_with(WEAK_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a strong `ETag` for buffered content
///
/// # Examples
/// ```
/// use hare::http::cache::generate_etag;
/// assert_eq!(generate_etag(b"").as_str(), "\"2jmj7l5rSw0yVb/vlWAYkK/YBwk=\"");
/// ```
pub fn generate_etag(content: &[u8]) -> EntityTag {
    EntityTag::from_digest(&Sha1::digest(content))
}

/// Generate a strong `ETag` by streaming `reader` through the digest
///
/// The reader is consumed in fixed-size chunks until EOF; nothing beyond one
/// chunk is held in memory. A read error aborts the digest and is returned
/// as-is, so no partial tag ever escapes.
pub fn generate_etag_from_reader<R: Read>(mut reader: R) -> io::Result<EntityTag> {
    let mut hasher = Sha1::new();
    let mut chunk = [0u8; DIGEST_CHUNK_SIZE];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => hasher.update(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(EntityTag::from_digest(&hasher.finalize()))
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// In [`MatchMode::Exact`] the header value is a single literal token.
/// In [`MatchMode::List`] it may hold several comma-separated tags or `*`.
///
/// # Returns
/// Returns true if matched (should return 304), false otherwise
pub fn check_etag_match(if_none_match: Option<&str>, etag: &EntityTag, mode: MatchMode) -> bool {
    if_none_match.is_some_and(|client_etag| match mode {
        MatchMode::Exact => client_etag == etag.as_str(),
        MatchMode::List => client_etag
            .split(',')
            .any(|e| e.trim() == etag.as_str() || e.trim() == "*"),
    })
}

/// Weak comparison of `If-None-Match` against an already-set `ETag` header
///
/// Used by content delivery for its precondition check: strength prefixes
/// are ignored on both sides and the header may be a list.
pub fn check_weak_match(if_none_match: &str, etag: &str) -> bool {
    let opaque = |tag: &str| tag.trim().trim_start_matches(WEAK_PREFIX).to_string();
    let server = opaque(etag);

    if_none_match
        .split(',')
        .map(str::trim)
        .any(|e| e == "*" || opaque(e) == server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EMPTY_ETAG: &str = "\"2jmj7l5rSw0yVb/vlWAYkK/YBwk=\"";

    /// Reader that yields some bytes and then fails
    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::other("disk on fire"));
            }
            self.served = true;
            buf[0] = b'x';
            Ok(1)
        }
    }

    #[test]
    fn test_empty_content_etag() {
        assert_eq!(generate_etag(b"").as_str(), EMPTY_ETAG);
    }

    #[test]
    fn test_known_digest() {
        // sha1("hello world") = 2aae6c35c94fcfb415dbe95f408b9ce91ee846ed
        assert_eq!(
            generate_etag(b"hello world").as_str(),
            "\"Kq5sNclPz7QV2+lfQIuc6R7oRu0=\""
        );
    }

    #[test]
    fn test_etag_consistency() {
        let etag1 = generate_etag(b"same content");
        let etag2 = generate_etag(b"same content");
        assert_eq!(etag1, etag2);
    }

    #[test]
    fn test_etag_difference() {
        let etag1 = generate_etag(b"content a");
        let etag2 = generate_etag(b"content b");
        assert_ne!(etag1, etag2);
    }

    #[test]
    fn test_reader_matches_buffered() {
        for size in [0usize, 1, 100, DIGEST_CHUNK_SIZE, DIGEST_CHUNK_SIZE * 3 + 17] {
            let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let streamed = generate_etag_from_reader(Cursor::new(&data)).unwrap();
            assert_eq!(streamed, generate_etag(&data), "size {size}");
        }
    }

    #[test]
    fn test_reader_error_is_propagated() {
        let result = generate_etag_from_reader(FailingReader { served: false });
        assert!(result.is_err());
    }

    #[test]
    fn test_weak_strength() {
        let strong = generate_etag(b"").with_strength(Strength::Strong);
        let weak = generate_etag(b"").with_strength(Strength::Weak);
        assert_eq!(strong.as_str(), EMPTY_ETAG);
        assert_eq!(weak.as_str(), format!("W/{EMPTY_ETAG}"));
        assert!(weak.is_weak());
        assert!(!strong.is_weak());
        // Weakening twice is idempotent
        assert_eq!(weak.clone().with_strength(Strength::Weak), weak);
    }

    #[test]
    fn test_exact_match() {
        let etag = generate_etag(b"");
        assert!(check_etag_match(Some(EMPTY_ETAG), &etag, MatchMode::Exact));
        assert!(!check_etag_match(None, &etag, MatchMode::Exact));
        // Unquoted, weak-prefixed and list forms do not match exactly
        assert!(!check_etag_match(
            Some("2jmj7l5rSw0yVb/vlWAYkK/YBwk="),
            &etag,
            MatchMode::Exact
        ));
        assert!(!check_etag_match(
            Some(&format!("W/{EMPTY_ETAG}")),
            &etag,
            MatchMode::Exact
        ));
        assert!(!check_etag_match(
            Some(&format!("\"xyz\", {EMPTY_ETAG}")),
            &etag,
            MatchMode::Exact
        ));
        assert!(!check_etag_match(Some("*"), &etag, MatchMode::Exact));
    }

    #[test]
    fn test_list_match() {
        let etag = generate_etag(b"");
        assert!(check_etag_match(
            Some(&format!("\"xyz\", {EMPTY_ETAG}")),
            &etag,
            MatchMode::List
        ));
        assert!(check_etag_match(Some("*"), &etag, MatchMode::List));
        assert!(!check_etag_match(Some("\"different\""), &etag, MatchMode::List));
        assert!(!check_etag_match(None, &etag, MatchMode::List));
    }

    #[test]
    fn test_weak_comparison() {
        assert!(check_weak_match("\"abc\"", "\"abc\""));
        assert!(check_weak_match("W/\"abc\"", "\"abc\""));
        assert!(check_weak_match("\"abc\"", "W/\"abc\""));
        assert!(check_weak_match("\"x\", W/\"abc\"", "\"abc\""));
        assert!(check_weak_match("*", "\"abc\""));
        assert!(!check_weak_match("\"abd\"", "\"abc\""));
    }
}
