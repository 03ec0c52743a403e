//! HTTP Range request parsing module
//!
//! Single byte-range parsing for seekable content, compliant with RFC 7233.

/// Parsed Range request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset
    pub start: u64,
    /// Last byte offset, inclusive
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for this range
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Valid range request
    Valid(ByteRange),
    /// Range not satisfiable - should return 416
    NotSatisfiable,
    /// No Range header or malformed (ignore, return full content)
    None,
}

/// Parse HTTP Range header (single range only, bytes unit)
///
/// Supported formats:
/// - `bytes=start-end` - Specific range
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// # Examples
/// ```
/// use hare::http::range::{parse_range_header, ByteRange, RangeParseResult};
///
/// let result = parse_range_header(Some("bytes=0-99"), 1000);
/// assert_eq!(result, RangeParseResult::Valid(ByteRange { start: 0, end: 99 }));
///
/// let result = parse_range_header(None, 1000);
/// assert_eq!(result, RangeParseResult::None);
/// ```
pub fn parse_range_header(range_header: Option<&str>, size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };

    let Some(spec) = header.trim().strip_prefix("bytes=") else {
        return RangeParseResult::None;
    };

    // Multi-range responses are not produced
    if spec.contains(',') {
        return RangeParseResult::None;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeParseResult::None;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        return parse_suffix_range(end_str, size);
    }

    parse_standard_range(start_str, end_str, size)
}

/// Parse suffix range (e.g., "-500")
fn parse_suffix_range(suffix_str: &str, size: u64) -> RangeParseResult {
    let Ok(suffix) = suffix_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    if suffix == 0 || size == 0 {
        return RangeParseResult::NotSatisfiable;
    }

    // Suffix larger than the content selects all of it
    RangeParseResult::Valid(ByteRange {
        start: size.saturating_sub(suffix),
        end: size - 1,
    })
}

/// Parse standard range (e.g., "0-99" or "100-")
fn parse_standard_range(start_str: &str, end_str: &str, size: u64) -> RangeParseResult {
    let Ok(start) = start_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    if start >= size {
        return RangeParseResult::NotSatisfiable;
    }

    let end = if end_str.is_empty() {
        size - 1
    } else {
        let Ok(e) = end_str.parse::<u64>() else {
            return RangeParseResult::None;
        };
        e.min(size - 1)
    };

    if start > end {
        return RangeParseResult::NotSatisfiable;
    }

    RangeParseResult::Valid(ByteRange { start, end })
}
